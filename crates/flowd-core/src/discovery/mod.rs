//! Discovery (C8): walks the `scripts/` tree, enumerates job
//! directories, and registers aliases declared in `scripts/flwd.yaml`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiscoveredJob {
    pub id: String,
    pub dir: PathBuf,
}

#[derive(Debug, Deserialize)]
struct AliasesFile {
    #[serde(default)]
    aliases: Vec<AliasEntry>,
}

#[derive(Debug, Deserialize)]
struct AliasEntry {
    from: String,
    to: String,
    #[serde(default)]
    #[allow(dead_code)]
    description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DiscoveryResult {
    pub jobs: Vec<DiscoveredJob>,
    /// `to` → `from`, registered only when `to` resolves to a discovered job (I5).
    pub aliases: std::collections::BTreeMap<String, String>,
    pub warnings: Vec<String>,
}

/// Walks `root` (a `scripts/` directory) and returns every job directory
/// that contains a `config.d/config.yaml`.
pub fn discover(root: &Path) -> DiscoveryResult {
    let mut result = DiscoveryResult::default();

    walk(root, root, &mut result);

    let aliases_path = root.join("flwd.yaml");
    if let Ok(text) = std::fs::read_to_string(&aliases_path) {
        match serde_yaml::from_str::<AliasesFile>(&text) {
            Ok(parsed) => register_aliases(parsed.aliases, &mut result),
            Err(err) => result
                .warnings
                .push(format!("[warn] decode {}: {err}", aliases_path.display())),
        }
    }

    result
}

fn walk(root: &Path, dir: &Path, result: &mut DiscoveryResult) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    let is_job = dir.join("config.d").join("config.yaml").is_file();
    if is_job {
        if let Ok(relative) = dir.strip_prefix(root) {
            let id = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join("/");
            if !id.is_empty() {
                result.jobs.push(DiscoveredJob {
                    id,
                    dir: dir.to_path_buf(),
                });
            }
        }
        return;
    }
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            walk(root, &path, result);
        }
    }
}

fn register_aliases(entries: Vec<AliasEntry>, result: &mut DiscoveryResult) {
    let known: std::collections::BTreeSet<&str> =
        result.jobs.iter().map(|j| j.id.as_str()).collect();
    for entry in entries {
        let from = entry.from.trim().to_string();
        let to = entry.to.trim().to_string();
        if from.is_empty() || to.is_empty() || to.contains('/') {
            continue;
        }
        if known.contains(from.as_str()) {
            result.aliases.insert(to, from);
        } else {
            result
                .warnings
                .push(format!("[warn] alias {to:?} -> {from:?}: target not discovered"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn job_dir(root: &Path, segments: &[&str]) -> PathBuf {
        let mut dir = root.to_path_buf();
        for seg in segments {
            dir = dir.join(seg);
        }
        fs::create_dir_all(dir.join("config.d")).unwrap();
        fs::write(dir.join("config.d").join("config.yaml"), "interpreter: bash\n").unwrap();
        dir
    }

    #[test]
    fn discovers_nested_job_directories() {
        let tmp = tempfile::tempdir().unwrap();
        let scripts = tmp.path().join("scripts");
        job_dir(&scripts, &["build", "release"]);
        job_dir(&scripts, &["test"]);
        let result = discover(&scripts);
        let mut ids: Vec<&str> = result.jobs.iter().map(|j| j.id.as_str()).collect();
        ids.sort();
        assert_eq!(ids, vec!["build/release", "test"]);
    }

    #[test]
    fn alias_registers_only_when_target_discovered() {
        let tmp = tempfile::tempdir().unwrap();
        let scripts = tmp.path().join("scripts");
        job_dir(&scripts, &["build", "release"]);
        fs::write(
            scripts.join("flwd.yaml"),
            "aliases:\n  - from: build/release\n    to: release\n  - from: missing/job\n    to: ghost\n",
        )
        .unwrap();
        let result = discover(&scripts);
        assert_eq!(result.aliases.get("release").unwrap(), "build/release");
        assert!(!result.aliases.contains_key("ghost"));
        assert!(result.warnings.iter().any(|w| w.contains("ghost")));
    }
}
