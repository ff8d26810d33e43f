use std::{
    env,
    path::{Path, PathBuf},
};

use fieldkit_core::ServiceLaunchPlan;

use crate::{runtime_paths::RuntimePaths, SERVICE_CMD_ENV, SERVICE_SIDECAR_NAME};

/// Work out how to launch the domain service: `FIELDKIT_SERVICE_CMD` when
/// set, otherwise the sidecar binary bundled next to the shell executable.
pub(crate) fn resolve_service_launch_plan(paths: &RuntimePaths) -> Result<ServiceLaunchPlan, String> {
    let mut plan = match env::var(SERVICE_CMD_ENV) {
        Ok(custom_cmd) if !custom_cmd.trim().is_empty() => resolve_custom_launch(&custom_cmd)?,
        _ => {
            let current_exe = env::current_exe()
                .map_err(|error| format!("Failed to locate the shell executable: {error}"))?;
            resolve_sidecar_launch(&current_exe)?
        }
    };
    plan.stderr_log = Some(paths.service_log());
    Ok(plan)
}

fn resolve_custom_launch(custom_cmd: &str) -> Result<ServiceLaunchPlan, String> {
    let mut pieces = shlex::split(custom_cmd)
        .ok_or_else(|| format!("Invalid {SERVICE_CMD_ENV} command line: {custom_cmd}"))?
        .into_iter();
    let program = pieces
        .next()
        .ok_or_else(|| format!("{SERVICE_CMD_ENV} does not name a program."))?;

    let mut plan = ServiceLaunchPlan::new(program);
    plan.args = pieces.collect();
    Ok(plan)
}

fn resolve_sidecar_launch(current_exe: &Path) -> Result<ServiceLaunchPlan, String> {
    let exe_dir = current_exe.parent().ok_or_else(|| {
        format!(
            "Shell executable {} has no parent directory.",
            current_exe.display()
        )
    })?;
    let sidecar = sidecar_path(exe_dir);

    let mut plan = ServiceLaunchPlan::new(sidecar.to_string_lossy().into_owned());
    plan.cwd = Some(exe_dir.to_path_buf());
    Ok(plan)
}

fn sidecar_path(exe_dir: &Path) -> PathBuf {
    exe_dir.join(format!("{SERVICE_SIDECAR_NAME}{}", env::consts::EXE_SUFFIX))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_custom_launch_splits_shell_quoting() {
        let plan = resolve_custom_launch(r#"node "/opt/field kit/service.js" --inspect"#).unwrap();

        assert_eq!(plan.program, "node");
        assert_eq!(plan.args, vec!["/opt/field kit/service.js", "--inspect"]);
        assert_eq!(plan.cwd, None);
    }

    #[test]
    fn resolve_custom_launch_rejects_unbalanced_quotes() {
        let error = resolve_custom_launch(r#"node "service.js"#).unwrap_err();
        assert!(error.contains(SERVICE_CMD_ENV));
    }

    #[test]
    fn resolve_custom_launch_rejects_empty_command() {
        assert!(resolve_custom_launch("   ").is_err());
    }

    #[test]
    fn resolve_sidecar_launch_uses_executable_directory() {
        let exe_dir = PathBuf::from("/opt/fieldkit");
        let plan = resolve_sidecar_launch(&exe_dir.join("fieldkit-desktop")).unwrap();

        assert_eq!(
            PathBuf::from(&plan.program),
            exe_dir.join(format!("{SERVICE_SIDECAR_NAME}{}", env::consts::EXE_SUFFIX))
        );
        assert!(plan.args.is_empty());
        assert_eq!(plan.cwd, Some(exe_dir));
    }
}
