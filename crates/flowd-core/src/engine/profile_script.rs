//! Profile script synthesis (process executor). Emits loaders for
//! `vars/`/`libs/` directories from the nearest `scripts` segment down
//! to the job directory, then per-arg bindings.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use flowd_common::Value;

fn shell_quote(value: &str) -> String {
    shlex::try_quote(value)
        .map(|c| c.into_owned())
        .unwrap_or_else(|_| format!("'{value}'"))
}

/// Ancestor directories from the nearest `scripts` segment down to
/// `job_dir`, inclusive, nearest-first.
fn loader_dirs(job_dir: &Path) -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    let mut current = Some(job_dir);
    while let Some(dir) = current {
        dirs.push(dir.to_path_buf());
        if dir.file_name().map(|n| n == "scripts").unwrap_or(false) {
            break;
        }
        current = dir.parent();
    }
    dirs.reverse();
    dirs
}

fn emit_loaders(job_dir: &Path, kind: &str, lines: &mut Vec<String>) {
    for dir in loader_dirs(job_dir) {
        let glob_dir = dir.join("config.d").join(kind);
        let Ok(entries) = std::fs::read_dir(&glob_dir) else {
            continue;
        };
        let mut paths: Vec<PathBuf> = entries.flatten().map(|e| e.path()).collect();
        paths.sort();
        for path in paths {
            let ext_ok = matches!(path.extension().and_then(|e| e.to_str()), Some("sh") | Some("ps1"));
            if ext_ok {
                lines.push(format!("source {}", shell_quote(&path.display().to_string())));
            }
        }
    }
}

/// Renders the profile script body (bash dialect) for one attempt.
pub fn render_profile_script(job_dir: &Path, values: &BTreeMap<String, Value>) -> String {
    let mut lines = Vec::new();
    emit_loaders(job_dir, "vars", &mut lines);
    emit_loaders(job_dir, "libs", &mut lines);

    for (name, value) in values {
        match value {
            Value::String(s) => {
                lines.push(format!("{name}={}", shell_quote(s)));
                lines.push(format!("export {name}"));
            }
            Value::Integer(i) => {
                lines.push(format!("{name}={i}"));
                lines.push(format!("export {name}"));
            }
            Value::Boolean(b) => {
                lines.push(format!("{name}={b}"));
                lines.push(format!("export {name}"));
            }
            Value::StringList(items) => {
                let rendered: Vec<String> = items.iter().map(|i| shell_quote(i)).collect();
                lines.push(format!("declare -a {name}=({})", rendered.join(" ")));
            }
            Value::StringMap(map) => {
                let rendered: Vec<String> = map
                    .iter()
                    .map(|(k, v)| format!("[{}]={}", shell_quote(k), shell_quote(v)))
                    .collect();
                lines.push(format!("declare -A {name}=({})", rendered.join(" ")));
            }
        }
    }

    lines.join("\n") + "\n"
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn scalar_bindings_are_exported() {
        let mut values = BTreeMap::new();
        values.insert("mode".to_string(), Value::String("quick".to_string()));
        let tmp = tempfile::tempdir().unwrap();
        let script = render_profile_script(tmp.path(), &values);
        assert!(script.contains("mode='quick'"));
        assert!(script.contains("export mode"));
    }

    #[test]
    fn array_bindings_declare_indexed_array() {
        let mut values = BTreeMap::new();
        values.insert(
            "tags".to_string(),
            Value::StringList(vec!["a".to_string(), "b".to_string()]),
        );
        let tmp = tempfile::tempdir().unwrap();
        let script = render_profile_script(tmp.path(), &values);
        assert!(script.contains("declare -a tags=('a' 'b')"));
    }

    #[test]
    fn vars_and_libs_are_sourced_nearest_scripts_down() {
        let tmp = tempfile::tempdir().unwrap();
        let scripts = tmp.path().join("scripts");
        let job = scripts.join("build");
        fs::create_dir_all(job.join("config.d").join("vars")).unwrap();
        fs::write(job.join("config.d").join("vars").join("a.sh"), "").unwrap();
        fs::create_dir_all(scripts.join("config.d").join("libs")).unwrap();
        fs::write(scripts.join("config.d").join("libs").join("common.sh"), "").unwrap();

        let script = render_profile_script(&job, &BTreeMap::new());
        let scripts_source_pos = script.find("common.sh").unwrap();
        let job_source_pos = script.find("a.sh").unwrap();
        assert!(scripts_source_pos < job_source_pos);
    }
}
