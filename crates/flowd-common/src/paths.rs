//! Data directory resolution (C1) and the process-wide override slot.
//!
//! The data directory is resolved once per job-load (see `flowd-core`'s
//! config loader) but the *installed* value is a single, atomically
//! replaceable slot any later component may read without re-resolving.

use std::path::{Path, PathBuf};
use std::sync::RwLock;

static DATA_DIR_OVERRIDE: RwLock<Option<PathBuf>> = RwLock::new(None);

/// Install (or replace) the process-wide data-dir override.
///
/// Read by any caller via [`installed_override`]; only the config loader
/// is expected to write it, but the slot itself enforces no such
/// restriction.
pub fn install_override(dir: PathBuf) {
    let mut slot = DATA_DIR_OVERRIDE.write().expect("data dir override lock poisoned");
    *slot = Some(dir);
}

/// Read the currently installed override, if any.
pub fn installed_override() -> Option<PathBuf> {
    DATA_DIR_OVERRIDE
        .read()
        .expect("data dir override lock poisoned")
        .clone()
}

/// Clear the override. Exposed for test isolation.
pub fn clear_override() {
    let mut slot = DATA_DIR_OVERRIDE.write().expect("data dir override lock poisoned");
    *slot = None;
}

/// Resolve the data directory given an explicit override (highest
/// precedence; typically a job config's `env.DATA_DIR`), falling back to
/// the process `DATA_DIR` env var, then the platform default.
pub fn resolve_data_dir(explicit: Option<&str>) -> PathBuf {
    if let Some(explicit) = explicit.filter(|s| !s.is_empty()) {
        return PathBuf::from(explicit);
    }
    if let Ok(env_dir) = std::env::var("DATA_DIR") {
        if !env_dir.is_empty() {
            return PathBuf::from(env_dir);
        }
    }
    platform_default()
}

#[cfg(target_os = "windows")]
fn platform_default() -> PathBuf {
    if let Ok(program_data) = std::env::var("PROGRAMDATA") {
        if !program_data.is_empty() {
            return Path::new(&program_data).join("Flowd").join("data");
        }
    }
    if let Some(home) = dirs::home_dir() {
        return home.join("AppData").join("Local").join("Flowd").join("data");
    }
    fallback_tempdir()
}

#[cfg(not(target_os = "windows"))]
fn platform_default() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_DATA_HOME") {
        if !xdg.is_empty() {
            return Path::new(&xdg).join("flowd");
        }
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".local").join("share").join("flowd");
    }
    fallback_tempdir()
}

fn fallback_tempdir() -> PathBuf {
    if let Ok(cwd) = std::env::current_dir() {
        let candidate = cwd.join("flowd");
        if candidate.parent().is_some() {
            return candidate;
        }
    }
    std::env::temp_dir().join("flowd")
}

/// `<dataDir>/runs`
pub fn runs_dir(data_dir: &Path) -> PathBuf {
    data_dir.join("runs")
}

/// `<dataDir>/runs/<runId>`
pub fn run_dir(data_dir: &Path, run_id: &str) -> PathBuf {
    runs_dir(data_dir).join(run_id)
}

/// `<dataDir>/sources` — the source-package fetch subsystem's cache root.
/// Out of scope to populate (spec.md §1) but its path is part of the
/// layout this crate owns.
pub fn sources_dir(data_dir: &Path) -> PathBuf {
    data_dir.join("sources")
}

/// `<dataDir>/cache`
pub fn cache_dir(data_dir: &Path) -> PathBuf {
    data_dir.join("cache")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn explicit_override_wins_over_env() {
        std::env::set_var("DATA_DIR", "/env/data");
        let resolved = resolve_data_dir(Some("/explicit/data"));
        assert_eq!(resolved, PathBuf::from("/explicit/data"));
        std::env::remove_var("DATA_DIR");
    }

    #[test]
    #[serial]
    fn env_wins_over_platform_default() {
        std::env::remove_var("DATA_DIR");
        std::env::set_var("DATA_DIR", "/env/data2");
        let resolved = resolve_data_dir(None);
        assert_eq!(resolved, PathBuf::from("/env/data2"));
        std::env::remove_var("DATA_DIR");
    }

    #[test]
    #[serial]
    fn install_and_read_override() {
        clear_override();
        assert_eq!(installed_override(), None);
        install_override(PathBuf::from("/tmp/flowd-test"));
        assert_eq!(installed_override(), Some(PathBuf::from("/tmp/flowd-test")));
        clear_override();
    }

    #[test]
    fn run_dir_nests_under_runs() {
        let data_dir = PathBuf::from("/data");
        assert_eq!(run_dir(&data_dir, "run-1"), PathBuf::from("/data/runs/run-1"));
    }
}
