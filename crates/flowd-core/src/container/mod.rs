//! Container adapter (C9). Detects a podman-or-docker-style runtime
//! binary, builds argv with a secure-by-default posture, and tears
//! down containers on stop/kill/remove.

use std::process::Command;
use std::time::Duration;

use crate::errors::ExecutorError;

#[derive(Debug, Clone, Default)]
pub struct Mount {
    pub source: String,
    pub destination: String,
    pub read_only: bool,
}

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub image: String,
    pub command: Vec<String>,
    pub writable_rootfs: bool,
    pub network: Option<String>,
    pub capabilities: Vec<String>,
    pub workdir: Option<String>,
    pub env: Vec<(String, String)>,
    pub mounts: Vec<Mount>,
    pub remove: bool,
    pub name: Option<String>,
    pub extra_args: Vec<String>,
}

/// The runtime binary this adapter will invoke (`podman` preferred over `docker`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Runtime {
    pub binary: String,
}

/// Probes `PATH` for a podman-style binary first, falling back to a
/// docker-style one.
pub fn detect_runtime() -> Result<Runtime, ExecutorError> {
    for candidate in ["podman", "docker"] {
        if which(candidate) {
            return Ok(Runtime {
                binary: candidate.to_string(),
            });
        }
    }
    Err(ExecutorError::RuntimeMissing)
}

fn which(binary: &str) -> bool {
    std::env::var_os("PATH")
        .map(|paths| {
            std::env::split_paths(&paths).any(|dir| dir.join(binary).is_file())
        })
        .unwrap_or(false)
}

/// Constructs `run` argv enforcing the secure-by-default posture.
pub fn build_args(opts: &RunOptions) -> Result<Vec<String>, ExecutorError> {
    if opts.image.is_empty() {
        return Err(ExecutorError::InvalidRunOptions("image is required".to_string()));
    }

    let mut args = vec!["run".to_string()];
    args.push("--cap-drop=ALL".to_string());
    args.push("--security-opt=no-new-privileges".to_string());

    if !opts.writable_rootfs {
        args.push("--read-only".to_string());
    }

    match &opts.network {
        Some(mode) if !mode.is_empty() => args.push(format!("--network={mode}")),
        _ => args.push("--network=none".to_string()),
    }

    for cap in &opts.capabilities {
        let cap = cap.trim();
        if !cap.is_empty() {
            args.push(format!("--cap-add={cap}"));
        }
    }

    if let Some(workdir) = &opts.workdir {
        args.push("--workdir".to_string());
        args.push(workdir.clone());
    }

    for (key, value) in &opts.env {
        args.push("--env".to_string());
        args.push(format!("{key}={value}"));
    }

    for mount in &opts.mounts {
        if mount.source.is_empty() || mount.destination.is_empty() {
            return Err(ExecutorError::InvalidRunOptions(
                "volume source and destination must be non-empty".to_string(),
            ));
        }
        if !mount.destination.starts_with('/') {
            return Err(ExecutorError::InvalidRunOptions(format!(
                "volume destination {:?} must be absolute",
                mount.destination
            )));
        }
        let mode = if mount.read_only { "ro" } else { "rw" };
        args.push("--volume".to_string());
        args.push(format!("{}:{}:{}", mount.source, mount.destination, mode));
    }

    if opts.remove {
        args.push("--rm".to_string());
    }
    if let Some(name) = &opts.name {
        args.push("--name".to_string());
        args.push(name.clone());
    }

    args.extend(opts.extra_args.iter().cloned());
    args.push(opts.image.clone());
    args.extend(opts.command.iter().cloned());

    Ok(args)
}

const STOP_GRACE: Duration = Duration::from_secs(10);

fn is_benign_teardown_error(stderr: &str) -> bool {
    let lower = stderr.to_lowercase();
    lower.contains("no such container") || lower.contains("not found")
}

fn run_teardown(runtime: &Runtime, subcommand: &str, name: &str, extra: &[&str]) -> bool {
    let mut cmd = Command::new(&runtime.binary);
    cmd.arg(subcommand).args(extra).arg(name);
    match cmd.output() {
        Ok(output) => {
            output.status.success() || is_benign_teardown_error(&String::from_utf8_lossy(&output.stderr))
        }
        Err(_) => false,
    }
}

pub fn stop(runtime: &Runtime, name: &str) -> bool {
    run_teardown(runtime, "stop", name, &["--time", &STOP_GRACE.as_secs().to_string()])
}

pub fn kill(runtime: &Runtime, name: &str) -> bool {
    run_teardown(runtime, "kill", name, &[])
}

pub fn remove(runtime: &Runtime, name: &str) -> bool {
    run_teardown(runtime, "rm", name, &["-f"])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_enforce_secure_posture() {
        let opts = RunOptions {
            image: "alpine".to_string(),
            ..Default::default()
        };
        let args = build_args(&opts).unwrap();
        assert!(args.contains(&"--cap-drop=ALL".to_string()));
        assert!(args.contains(&"--security-opt=no-new-privileges".to_string()));
        assert!(args.contains(&"--read-only".to_string()));
        assert!(args.contains(&"--network=none".to_string()));
    }

    #[test]
    fn writable_rootfs_omits_read_only() {
        let opts = RunOptions {
            image: "alpine".to_string(),
            writable_rootfs: true,
            ..Default::default()
        };
        let args = build_args(&opts).unwrap();
        assert!(!args.contains(&"--read-only".to_string()));
    }

    #[test]
    fn custom_network_overrides_default() {
        let opts = RunOptions {
            image: "alpine".to_string(),
            network: Some("bridge".to_string()),
            ..Default::default()
        };
        let args = build_args(&opts).unwrap();
        assert!(args.contains(&"--network=bridge".to_string()));
        assert!(!args.iter().any(|a| a == "--network=none"));
    }

    #[test]
    fn capabilities_are_trimmed_and_empties_dropped() {
        let opts = RunOptions {
            image: "alpine".to_string(),
            capabilities: vec![" NET_BIND_SERVICE ".to_string(), "".to_string()],
            ..Default::default()
        };
        let args = build_args(&opts).unwrap();
        assert!(args.contains(&"--cap-add=NET_BIND_SERVICE".to_string()));
        assert_eq!(args.iter().filter(|a| a.starts_with("--cap-add")).count(), 1);
    }

    #[test]
    fn volume_destination_must_be_absolute() {
        let opts = RunOptions {
            image: "alpine".to_string(),
            mounts: vec![Mount {
                source: "/host".to_string(),
                destination: "relative".to_string(),
                read_only: true,
            }],
            ..Default::default()
        };
        let err = build_args(&opts).unwrap_err();
        assert!(matches!(err, ExecutorError::InvalidRunOptions(_)));
    }

    #[test]
    fn ordering_is_flags_then_extra_then_image_then_command() {
        let opts = RunOptions {
            image: "alpine".to_string(),
            command: vec!["echo".to_string(), "hi".to_string()],
            extra_args: vec!["--label=x".to_string()],
            remove: true,
            name: Some("job1".to_string()),
            ..Default::default()
        };
        let args = build_args(&opts).unwrap();
        let image_pos = args.iter().position(|a| a == "alpine").unwrap();
        let extra_pos = args.iter().position(|a| a == "--label=x").unwrap();
        let echo_pos = args.iter().position(|a| a == "echo").unwrap();
        assert!(extra_pos < image_pos);
        assert!(image_pos < echo_pos);
    }

    #[test]
    fn benign_teardown_errors_recognised() {
        assert!(is_benign_teardown_error("Error: no such container: foo"));
        assert!(is_benign_teardown_error("container foo not found"));
        assert!(!is_benign_teardown_error("permission denied"));
    }
}
