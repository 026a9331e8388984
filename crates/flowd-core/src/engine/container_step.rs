//! Per-step invocation (container executor).

use std::collections::BTreeMap;
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

use crate::container::{self, Mount, Runtime, RunOptions};
use crate::errors::ExecutorError;
use crate::event::{Channel, Sink, StepWriter};

pub struct ContainerStepOutcome {
    pub exit_code: i32,
}

fn container_name(run_id: &str, step_id: Option<&str>) -> String {
    match step_id {
        Some(id) if !id.is_empty() => format!("{run_id}-{id}"),
        _ => run_id.to_string(),
    }
}

#[allow(clippy::too_many_arguments)]
pub async fn run_container_step(
    cancel: &CancellationToken,
    runtime: &Runtime,
    run_id: &str,
    step_id: &str,
    image: &str,
    command: Vec<String>,
    script_dir: &Path,
    run_dir: &Path,
    data_dir: &Path,
    secrets_dir: Option<&Path>,
    env: BTreeMap<String, String>,
    writable_rootfs: bool,
    sink: Arc<dyn Sink>,
    secret_values: Vec<String>,
) -> Result<ContainerStepOutcome, ExecutorError> {
    let name = container_name(run_id, Some(step_id));

    container::remove(runtime, &name);

    let mut full_env: Vec<(String, String)> = env.into_iter().collect();
    for (key, value) in [
        ("DATA_DIR", data_dir.display().to_string()),
        ("FLOWD_DATA_DIR", data_dir.display().to_string()),
        ("FLOWD_RUN_DIR", run_dir.display().to_string()),
        ("RUN_DIR", run_dir.display().to_string()),
        ("FLWD_RUN_DIR", run_dir.display().to_string()),
    ] {
        full_env.push((key.to_string(), value));
    }

    let mut mounts = Vec::new();
    let script_dir_is_run_dir = script_dir == run_dir;
    mounts.push(Mount {
        source: script_dir.display().to_string(),
        destination: script_dir.display().to_string(),
        read_only: !script_dir_is_run_dir,
    });
    if !script_dir_is_run_dir {
        mounts.push(Mount {
            source: run_dir.display().to_string(),
            destination: run_dir.display().to_string(),
            read_only: false,
        });
    }
    if let Some(secrets) = secrets_dir {
        mounts.push(Mount {
            source: secrets.display().to_string(),
            destination: "/run/secrets".to_string(),
            read_only: true,
        });
    }

    let opts = RunOptions {
        image: image.to_string(),
        command,
        writable_rootfs,
        env: full_env,
        mounts,
        remove: true,
        name: Some(name.clone()),
        ..Default::default()
    };

    let args = container::build_args(&opts)?;

    let mut cmd = Command::new(&runtime.binary);
    cmd.args(&args);
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());

    let mut child = cmd.spawn()?;
    let mut stdout = child.stdout.take();
    let mut stderr = child.stderr.take();

    let stdout_task = tokio::spawn(drain_pipe(
        stdout.take(),
        run_id.to_string(),
        step_id.to_string(),
        Channel::Stdout,
        sink.clone(),
        secret_values.clone(),
    ));
    let stderr_task = tokio::spawn(drain_pipe(
        stderr.take(),
        run_id.to_string(),
        step_id.to_string(),
        Channel::Stderr,
        sink,
        secret_values,
    ));

    tokio::select! {
        status = child.wait() => {
            let status = status?;
            let _ = stdout_task.await;
            let _ = stderr_task.await;
            Ok(ContainerStepOutcome {
                exit_code: status.code().unwrap_or(-1),
            })
        }
        _ = cancel.cancelled() => {
            let _ = child.start_kill();
            stdout_task.abort();
            stderr_task.abort();
            Err(ExecutorError::Cancelled)
        }
    }
}

async fn drain_pipe(
    pipe: Option<impl tokio::io::AsyncRead + Unpin>,
    run_id: String,
    step_id: String,
    channel: Channel,
    sink: Arc<dyn Sink>,
    secret_values: Vec<String>,
) {
    if let Some(mut pipe) = pipe {
        let mirror: Vec<u8> = Vec::new();
        let mut writer = StepWriter::new(run_id, step_id, channel, sink, mirror, secret_values);
        let mut buf = [0u8; 4096];
        loop {
            let n = pipe.read(&mut buf).await.unwrap_or(0);
            if n == 0 {
                break;
            }
            use std::io::Write;
            let _ = writer.write_all(&buf[..n]);
        }
        writer.finish();
    }
}

/// Best-effort stop -> kill -> remove on a fresh, detached timeout
/// context (called when the caller's cancellation token fires).
pub fn teardown_detached(runtime: Runtime, run_id: String, step_id: Option<String>) {
    tokio::spawn(async move {
        let name = container_name(&run_id, step_id.as_deref());
        tokio::time::timeout(Duration::from_secs(30), async {
            tokio::task::spawn_blocking(move || {
                container::stop(&runtime, &name);
                container::kill(&runtime, &name);
                container::remove(&runtime, &name);
            })
            .await
        })
        .await
        .ok();
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn container_name_includes_step_when_present() {
        assert_eq!(container_name("run-1", Some("build")), "run-1-build");
        assert_eq!(container_name("run-1", None), "run-1");
    }
}
