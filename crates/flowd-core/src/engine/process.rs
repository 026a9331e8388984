//! Per-step invocation (process executor).

use std::collections::BTreeMap;
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;

use tokio::io::AsyncReadExt;
use tokio::process::Command;

use crate::errors::ExecutorError;
use crate::event::{Channel, Sink, StepWriter};

pub struct ProcessStepOutcome {
    pub exit_code: i32,
}

/// Splits the interpreter's first whitespace-separated word from its
/// tail args.
pub fn split_interpreter(interpreter: &str) -> (String, Vec<String>) {
    let mut parts = interpreter.split_whitespace();
    let program = parts.next().unwrap_or_default().to_string();
    let tail = parts.map(str::to_string).collect();
    (program, tail)
}

/// Renders a bound flag as `--name`, `--name=value`, or `--name=<int>`.
pub fn flag_args(values: &BTreeMap<String, flowd_common::Value>) -> Vec<String> {
    let mut args = Vec::new();
    for (name, value) in values {
        match value {
            flowd_common::Value::Boolean(true) => args.push(format!("--{name}")),
            flowd_common::Value::Boolean(false) => {}
            flowd_common::Value::String(s) if s.is_empty() => {}
            other => {
                if let Some(scalar) = other.as_scalar_string() {
                    args.push(format!("--{name}={scalar}"));
                }
            }
        }
    }
    args
}

#[allow(unsafe_code)]
fn install_secure_umask() -> u32 {
    #[cfg(unix)]
    unsafe {
        libc::umask(0o077)
    }
    #[cfg(not(unix))]
    0
}

#[allow(unsafe_code)]
fn restore_umask(previous: u32) {
    #[cfg(unix)]
    unsafe {
        libc::umask(previous);
    }
    #[cfg(not(unix))]
    let _ = previous;
}

#[allow(clippy::too_many_arguments)]
pub async fn execute_process_step(
    run_id: &str,
    step_id: &str,
    interpreter: &str,
    script_path: &Path,
    flag_values: &BTreeMap<String, flowd_common::Value>,
    env: &BTreeMap<String, String>,
    sink: Arc<dyn Sink>,
    secret_values: Vec<String>,
) -> Result<ProcessStepOutcome, ExecutorError> {
    let (program, tail_args) = split_interpreter(interpreter);
    if program.is_empty() {
        return Err(ExecutorError::InterpreterMissing {
            job_id: step_id.to_string(),
        });
    }

    let mut argv = tail_args;
    argv.push(script_path.display().to_string());
    argv.extend(flag_args(flag_values));

    let mut cmd = Command::new(&program);
    cmd.args(&argv);
    cmd.env_clear();
    cmd.envs(env);
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());

    let previous_umask = install_secure_umask();
    let spawn_result = cmd.spawn();
    restore_umask(previous_umask);

    let mut child = spawn_result?;

    let mut stdout = child.stdout.take();
    let mut stderr = child.stderr.take();

    let stdout_sink = sink.clone();
    let run_id_owned = run_id.to_string();
    let step_id_owned = step_id.to_string();
    let secrets_out = secret_values.clone();
    let stdout_task = tokio::spawn(async move {
        if let Some(mut pipe) = stdout.take() {
            let mirror: Vec<u8> = Vec::new();
            let mut writer = StepWriter::new(
                run_id_owned,
                step_id_owned,
                Channel::Stdout,
                stdout_sink,
                mirror,
                secrets_out,
            );
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
    });

    let stderr_sink = sink.clone();
    let run_id_owned = run_id.to_string();
    let step_id_owned = step_id.to_string();
    let secrets_err = secret_values;
    let stderr_task = tokio::spawn(async move {
        if let Some(mut pipe) = stderr.take() {
            let mirror: Vec<u8> = Vec::new();
            let mut writer = StepWriter::new(
                run_id_owned,
                step_id_owned,
                Channel::Stderr,
                stderr_sink,
                mirror,
                secrets_err,
            );
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
    });

    let status = child.wait().await?;
    let _ = stdout_task.await;
    let _ = stderr_task.await;

    let exit_code = status.code().unwrap_or(-1);
    Ok(ProcessStepOutcome { exit_code })
}
