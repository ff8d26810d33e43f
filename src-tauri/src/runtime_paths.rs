use std::{
    env,
    path::{Path, PathBuf},
};

use crate::{
    APP_DIR_NAME, CONFIG_FILE, DESKTOP_LOG_FILE, HOME_FALLBACK_DIR_NAME, LOGS_DIR, ROOT_DIR_ENV,
    SERVICE_LOG_FILE, STORAGE_DIR,
};

/// Everything the shell keeps on disk lives under one data root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RuntimePaths {
    root: PathBuf,
}

impl RuntimePaths {
    pub(crate) fn resolve() -> Self {
        let override_root = env::var(ROOT_DIR_ENV).ok();
        Self::from_root(resolve_root_dir(
            override_root.as_deref(),
            dirs::data_dir(),
            dirs::home_dir(),
        ))
    }

    pub(crate) fn from_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub(crate) fn root(&self) -> &Path {
        &self.root
    }

    pub(crate) fn config_file(&self) -> PathBuf {
        self.root.join(CONFIG_FILE)
    }

    pub(crate) fn storage_dir(&self) -> PathBuf {
        self.root.join(STORAGE_DIR)
    }

    pub(crate) fn logs_dir(&self) -> PathBuf {
        self.root.join(LOGS_DIR)
    }

    pub(crate) fn desktop_log(&self) -> PathBuf {
        self.logs_dir().join(DESKTOP_LOG_FILE)
    }

    pub(crate) fn service_log(&self) -> PathBuf {
        self.logs_dir().join(SERVICE_LOG_FILE)
    }
}

fn resolve_root_dir(
    override_root: Option<&str>,
    data_dir: Option<PathBuf>,
    home_dir: Option<PathBuf>,
) -> PathBuf {
    if let Some(root) = override_root.map(str::trim).filter(|value| !value.is_empty()) {
        return PathBuf::from(root);
    }
    if let Some(data_dir) = data_dir {
        return data_dir.join(APP_DIR_NAME);
    }
    if let Some(home_dir) = home_dir {
        return home_dir.join(HOME_FALLBACK_DIR_NAME);
    }
    PathBuf::from(HOME_FALLBACK_DIR_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_root_dir_prefers_non_blank_override() {
        let root = resolve_root_dir(
            Some("  /srv/fieldkit  "),
            Some(PathBuf::from("/data")),
            Some(PathBuf::from("/home/user")),
        );
        assert_eq!(root, PathBuf::from("/srv/fieldkit"));
    }

    #[test]
    fn resolve_root_dir_ignores_blank_override() {
        let root = resolve_root_dir(Some("   "), Some(PathBuf::from("/data")), None);
        assert_eq!(root, PathBuf::from("/data").join(APP_DIR_NAME));
    }

    #[test]
    fn resolve_root_dir_falls_back_to_home_then_relative() {
        assert_eq!(
            resolve_root_dir(None, None, Some(PathBuf::from("/home/user"))),
            PathBuf::from("/home/user").join(HOME_FALLBACK_DIR_NAME)
        );
        assert_eq!(
            resolve_root_dir(None, None, None),
            PathBuf::from(HOME_FALLBACK_DIR_NAME)
        );
    }

    #[test]
    fn layout_is_rooted_at_data_root() {
        let paths = RuntimePaths::from_root("/srv/fieldkit");
        assert_eq!(paths.config_file(), PathBuf::from("/srv/fieldkit/config.json"));
        assert_eq!(paths.storage_dir(), PathBuf::from("/srv/fieldkit/storage"));
        assert_eq!(paths.desktop_log(), PathBuf::from("/srv/fieldkit/logs/desktop.log"));
        assert_eq!(paths.service_log(), PathBuf::from("/srv/fieldkit/logs/service.log"));
    }
}
