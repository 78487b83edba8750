//! Shared plumbing for the `relaycheck` binary.

pub mod render;

use std::path::{Path, PathBuf};

/// Environment variable naming the configuration file.
pub const CONFIG_ENV: &str = "RELAYCHECK_CONFIG";

/// Find the configuration file using the following precedence:
/// 1. `explicit` (the `--config` flag)
/// 2. `RELAYCHECK_CONFIG` environment variable
/// 3. ./relaycheck.config.ron (current working directory)
/// 4. /etc/relaycheck/relaycheck.config.ron (system-wide config)
///
/// # Errors
///
/// Fails when an explicitly named file does not exist, or when none of the
/// default locations holds a file.
pub fn find_config_file(explicit: Option<PathBuf>) -> anyhow::Result<PathBuf> {
    locate(
        explicit,
        std::env::var_os(CONFIG_ENV).map(PathBuf::from),
        &default_paths(),
    )
}

fn default_paths() -> Vec<PathBuf> {
    vec![
        PathBuf::from("./relaycheck.config.ron"),
        PathBuf::from("/etc/relaycheck/relaycheck.config.ron"),
    ]
}

fn locate(
    explicit: Option<PathBuf>,
    from_env: Option<PathBuf>,
    defaults: &[PathBuf],
) -> anyhow::Result<PathBuf> {
    if let Some(path) = explicit {
        return existing(path, "--config");
    }

    if let Some(path) = from_env {
        return existing(path, CONFIG_ENV);
    }

    if let Some(path) = defaults.iter().find(|p| p.exists()) {
        return Ok(path.clone());
    }

    let paths_tried = defaults
        .iter()
        .map(|p| format!("  - {}", p.display()))
        .collect::<Vec<_>>()
        .join("\n");

    anyhow::bail!(
        "No configuration file found. Tried:\n  - {CONFIG_ENV} environment variable\n{paths_tried}"
    )
}

fn existing(path: PathBuf, source: &str) -> anyhow::Result<PathBuf> {
    if Path::new(&path).exists() {
        Ok(path)
    } else {
        anyhow::bail!("{source} points to non-existent file: {}", path.display())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_explicit_path_wins() {
        let dir = tempfile::tempdir().unwrap();
        let explicit = dir.path().join("explicit.ron");
        let fallback = dir.path().join("fallback.ron");
        std::fs::write(&explicit, "()").unwrap();
        std::fs::write(&fallback, "()").unwrap();

        let found = locate(
            Some(explicit.clone()),
            Some(fallback.clone()),
            &[fallback],
        )
        .unwrap();
        assert_eq!(found, explicit);
    }

    #[test]
    fn test_missing_env_path_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let present = dir.path().join("present.ron");
        std::fs::write(&present, "()").unwrap();

        let err = locate(None, Some(dir.path().join("absent.ron")), &[present]).unwrap_err();
        assert!(err.to_string().starts_with("RELAYCHECK_CONFIG points to non-existent file"));
    }

    #[test]
    fn test_first_existing_default() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("first.ron");
        let second = dir.path().join("second.ron");
        std::fs::write(&second, "()").unwrap();

        let found = locate(None, None, &[first, second.clone()]).unwrap();
        assert_eq!(found, second);
    }

    #[test]
    fn test_nothing_found_lists_locations() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.ron");

        let err = locate(None, None, std::slice::from_ref(&missing)).unwrap_err();
        let message = err.to_string();
        assert!(message.starts_with("No configuration file found."));
        assert!(message.contains(&missing.display().to_string()));
    }
}
