use std::env;

use fieldkit_core::Locale;

use crate::DEFAULT_LANGUAGE_TAG;

const SYSTEM_LOCALE_ENV_KEYS: [&str; 3] = ["LC_ALL", "LC_MESSAGES", "LANG"];

/// The language tag the UI should render in: the stored explicit tag, or the
/// system locale when the user follows system preferences.
pub(crate) fn effective_language_tag(locale: &Locale) -> String {
    if let Some(tag) = locale.language_tag() {
        return tag.to_string();
    }
    resolve_system_language_tag(|key| env::var(key).ok())
}

fn resolve_system_language_tag(read_env: impl Fn(&str) -> Option<String>) -> String {
    SYSTEM_LOCALE_ENV_KEYS
        .iter()
        .filter_map(|key| read_env(*key))
        .find_map(|value| normalize_posix_locale(&value))
        .unwrap_or_else(|| DEFAULT_LANGUAGE_TAG.to_string())
}

/// `en_US.UTF-8` -> `en-US`. `C` and `POSIX` carry no language.
pub(crate) fn normalize_posix_locale(raw: &str) -> Option<String> {
    let raw = raw.trim();
    let without_modifier = raw.split('@').next().unwrap_or_default();
    let name = without_modifier.split('.').next().unwrap_or_default();
    if name.is_empty() || name == "C" || name == "POSIX" {
        return None;
    }

    let mut parts = name.split(['_', '-']);
    let language = parts.next().unwrap_or_default();
    if language.len() < 2 || !language.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }

    let mut tag = language.to_ascii_lowercase();
    if let Some(region) = parts.next().filter(|region| !region.is_empty()) {
        tag.push('-');
        tag.push_str(&region.to_ascii_uppercase());
    }
    Some(tag)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn normalize_posix_locale_strips_encoding_and_modifier() {
        assert_eq!(normalize_posix_locale("en_US.UTF-8").as_deref(), Some("en-US"));
        assert_eq!(normalize_posix_locale("pt_BR").as_deref(), Some("pt-BR"));
        assert_eq!(normalize_posix_locale("sr_RS@latin").as_deref(), Some("sr-RS"));
        assert_eq!(normalize_posix_locale(" es ").as_deref(), Some("es"));
    }

    #[test]
    fn normalize_posix_locale_ignores_c_and_posix() {
        assert_eq!(normalize_posix_locale("C"), None);
        assert_eq!(normalize_posix_locale("C.UTF-8"), None);
        assert_eq!(normalize_posix_locale("POSIX"), None);
        assert_eq!(normalize_posix_locale(""), None);
    }

    #[test]
    fn system_tag_follows_posix_precedence() {
        let env: HashMap<&str, &str> =
            HashMap::from([("LC_ALL", "C"), ("LC_MESSAGES", "fr_CA.UTF-8"), ("LANG", "de_DE")]);
        let tag = resolve_system_language_tag(|key| env.get(key).map(|value| value.to_string()));
        assert_eq!(tag, "fr-CA");
    }

    #[test]
    fn system_tag_defaults_to_english() {
        assert_eq!(resolve_system_language_tag(|_| None), DEFAULT_LANGUAGE_TAG);
    }

    #[test]
    fn explicit_locale_wins_over_system() {
        let locale = Locale::explicit("es").unwrap();
        assert_eq!(effective_language_tag(&locale), "es");
    }
}
