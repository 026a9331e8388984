//! Execution engine (C10): mode selection, ordered/DAG execution,
//! retries, and the secure environment/profile-script machinery the
//! step invokers share.

pub mod container_step;
pub mod env;
pub mod process;
pub mod profile_script;
pub mod sanitize;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use regex::Regex;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::args::Binding;
use crate::config::{Config, ContainerBlock};
use crate::container::{self, Runtime};
use crate::errors::ExecutorError;
use crate::event::Sink;

use container_step::run_container_step;
use process::execute_process_step;
use sanitize::sanitize_step_id;

#[derive(Debug, Clone)]
pub struct StepResult {
    pub step_id: String,
    pub exit_code: i32,
    /// `completed` or `failed` (I4: failed iff exit code != 0 or an error is present).
    pub status: String,
    pub error: Option<String>,
}

impl StepResult {
    fn ok(step_id: impl Into<String>, exit_code: i32) -> Self {
        let status = if exit_code == 0 { "completed" } else { "failed" };
        Self {
            step_id: step_id.into(),
            exit_code,
            status: status.to_string(),
            error: None,
        }
    }

    fn errored(step_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            step_id: step_id.into(),
            exit_code: -1,
            status: "failed".to_string(),
            error: Some(message.into()),
        }
    }

    fn failed(&self) -> bool {
        self.status == "failed"
    }
}

#[derive(Debug, Error)]
#[error("{message}")]
pub struct EngineError {
    pub message: String,
    pub partial: Vec<StepResult>,
}

pub struct ExecConfig {
    pub run_id: String,
    pub data_dir: PathBuf,
    pub run_dir: PathBuf,
    pub binding: Binding,
    pub sink: Arc<dyn Sink>,
    pub strict: bool,
}

fn ordered_step_files(job_dir: &Path) -> Vec<PathBuf> {
    let prefix_re = Regex::new(r"^(000|100|999)_").expect("static regex is valid");
    let Ok(entries) = std::fs::read_dir(job_dir) else {
        return Vec::new();
    };
    let mut files: Vec<PathBuf> = entries
        .flatten()
        .map(|e| e.path())
        .filter(|p| p.is_file())
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .map(|n| prefix_re.is_match(n))
                .unwrap_or(false)
        })
        .collect();
    files.sort();
    files
}

pub async fn run_scripts(
    cancel: CancellationToken,
    job_dir: &Path,
    config: &Config,
    exec: ExecConfig,
) -> Result<Vec<StepResult>, EngineError> {
    if config.is_dag_mode() {
        run_dag_mode(cancel, job_dir, config, exec).await
    } else {
        run_ordered_mode(cancel, job_dir, config, exec).await
    }
}

async fn run_ordered_mode(
    cancel: CancellationToken,
    job_dir: &Path,
    config: &Config,
    exec: ExecConfig,
) -> Result<Vec<StepResult>, EngineError> {
    let mut results = Vec::new();
    for script_path in ordered_step_files(job_dir) {
        let name = script_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let step_id = sanitize_step_id(&name);

        exec.sink.emit_step_start(&exec.run_id, &step_id);
        let result = run_one_step(
            &cancel,
            &exec,
            config,
            job_dir,
            &step_id,
            &script_path,
            None,
            None,
        )
        .await;
        exec.sink.emit_step_finish(
            &exec.run_id,
            &step_id,
            Some(result.exit_code),
            result.error.as_deref(),
        );

        let failed = result.failed();
        results.push(result);
        if failed && exec.strict {
            return Err(EngineError {
                message: format!("script {name} failed: {}", results.last().unwrap().error.clone().unwrap_or_default()),
                partial: results,
            });
        }
    }
    Ok(results)
}

async fn run_dag_mode(
    cancel: CancellationToken,
    job_dir: &Path,
    config: &Config,
    exec: ExecConfig,
) -> Result<Vec<StepResult>, EngineError> {
    let mut results = Vec::new();
    for step in &config.steps {
        let step_id = sanitize_step_id(&step.id);
        exec.sink.emit_step_start(&exec.run_id, &step_id);

        let merged_container = merge_container(config.container.as_ref(), step.container.as_ref());
        let script_path = job_dir.join(&step.script);
        let result = run_one_step(
            &cancel,
            &exec,
            config,
            job_dir,
            &step_id,
            &script_path,
            merged_container.as_ref(),
            step.executor.as_deref(),
        )
        .await;
        exec.sink.emit_step_finish(
            &exec.run_id,
            &step_id,
            Some(result.exit_code),
            result.error.as_deref(),
        );

        let failed = result.failed();
        results.push(result);
        if failed && exec.strict {
            return Err(EngineError {
                message: format!("step {} failed: {}", step.id, results.last().unwrap().error.clone().unwrap_or_default()),
                partial: results,
            });
        }
    }
    Ok(results)
}

fn merge_container(job_level: Option<&ContainerBlock>, step_level: Option<&ContainerBlock>) -> Option<ContainerBlock> {
    match (job_level, step_level) {
        (_, Some(step)) => {
            let mut merged = job_level.cloned().unwrap_or_default();
            if step.image.is_some() {
                merged.image = step.image.clone();
            }
            if step.resources.cpu.is_some() || step.resources.memory.is_some() {
                merged.resources = step.resources.clone();
            }
            if step.network.is_some() {
                merged.network = step.network.clone();
            }
            merged.rootfs_writable = step.rootfs_writable;
            if !step.capabilities.is_empty() {
                merged.capabilities = step.capabilities.clone();
            }
            if !step.extra_args.is_empty() {
                merged.extra_args = step.extra_args.clone();
            }
            if step.entrypoint.is_some() {
                merged.entrypoint = step.entrypoint.clone();
            }
            Some(merged)
        }
        (Some(job), None) => Some(job.clone()),
        (None, None) => None,
    }
}

/// True when `interpreter`, a merged container block, or the step/job
/// `executor` hint (C2, whichever is more specific) calls for the
/// container executor rather than a host process.
fn wants_container(interpreter: &str, container_block: Option<&ContainerBlock>, step_executor: Option<&str>, config_executor: Option<&str>) -> bool {
    let executor_hint = step_executor.or(config_executor);
    interpreter.starts_with("container:")
        || container_block.is_some()
        || executor_hint.map(|e| e.eq_ignore_ascii_case("container")).unwrap_or(false)
}

#[allow(clippy::too_many_arguments)]
async fn run_one_step(
    cancel: &CancellationToken,
    exec: &ExecConfig,
    config: &Config,
    job_dir: &Path,
    step_id: &str,
    script_path: &Path,
    step_container: Option<&ContainerBlock>,
    step_executor: Option<&str>,
) -> StepResult {
    let container_block = step_container.or(config.container.as_ref());
    let is_container = wants_container(&config.interpreter, container_block, step_executor, config.executor.as_deref());

    let env = env::build_secure_env(config, &exec.binding.scalar_env, &exec.binding.args_json, false);

    if is_container {
        return run_container_attempt(cancel, exec, config, job_dir, step_id, script_path, container_block, env)
            .await;
    }

    run_process_with_retries(cancel, exec, config, job_dir, step_id, script_path, env).await
}

async fn run_process_with_retries(
    cancel: &CancellationToken,
    exec: &ExecConfig,
    config: &Config,
    job_dir: &Path,
    step_id: &str,
    script_path: &Path,
    env: BTreeMap<String, String>,
) -> StepResult {
    let retry_enabled = config.error_handling.policy == "retry";
    let max_attempts = if retry_enabled {
        config.error_handling.retries + 1
    } else {
        1
    };

    let mut last_result = StepResult::errored(step_id, "not attempted");
    for attempt in 0..max_attempts {
        if cancel.is_cancelled() {
            return StepResult::errored(step_id, "cancelled");
        }
        if attempt > 0 {
            tokio::time::sleep(std::time::Duration::from_secs(u64::from(
                config.error_handling.retry_backoff,
            )))
            .await;
        }

        let script_body = profile_script::render_profile_script(job_dir, &exec.binding.values);
        let profile_file = tempfile::NamedTempFile::new();
        let mut attempt_env = env.clone();
        if let Ok(ref file) = profile_file {
            if std::fs::write(file.path(), &script_body).is_ok() && config.interpreter.trim_start().starts_with("bash") {
                attempt_env.insert("BASH_ENV".to_string(), file.path().display().to_string());
            }
        }

        let outcome = execute_process_step(
            &exec.run_id,
            step_id,
            &config.interpreter,
            script_path,
            &exec.binding.values,
            &attempt_env,
            exec.sink.clone(),
            exec.binding.secret_values.clone(),
        )
        .await;
        drop(profile_file);

        last_result = match outcome {
            Ok(result) => StepResult::ok(step_id, result.exit_code),
            Err(err) => StepResult::errored(step_id, err.to_string()),
        };

        if !last_result.failed() {
            return last_result;
        }
    }
    last_result
}

async fn run_container_attempt(
    cancel: &CancellationToken,
    exec: &ExecConfig,
    config: &Config,
    job_dir: &Path,
    step_id: &str,
    script_path: &Path,
    container_block: Option<&ContainerBlock>,
    env: BTreeMap<String, String>,
) -> StepResult {
    let runtime = match container::detect_runtime() {
        Ok(runtime) => runtime,
        Err(err) => return StepResult::errored(step_id, err.to_string()),
    };

    let image = config
        .interpreter
        .strip_prefix("container:")
        .map(str::to_string)
        .or_else(|| container_block.and_then(|c| c.image.clone()));

    let Some(image) = image else {
        return StepResult::errored(step_id, "container image missing");
    };

    let writable_rootfs = container_block.map(|c| c.rootfs_writable).unwrap_or(false);
    let script_dir = script_path.parent().unwrap_or(job_dir);

    let outcome = run_container_step(
        cancel,
        &runtime,
        &exec.run_id,
        step_id,
        &image,
        vec![script_path.display().to_string()],
        script_dir,
        &exec.run_dir,
        &exec.data_dir,
        None,
        env,
        writable_rootfs,
        exec.sink.clone(),
        exec.binding.secret_values.clone(),
    )
    .await;

    match outcome {
        Ok(result) => StepResult::ok(step_id, result.exit_code),
        Err(ExecutorError::Cancelled) => {
            teardown_on_cancel(runtime, exec.run_id.clone(), Some(step_id.to_string()));
            StepResult::errored(step_id, "cancelled")
        }
        Err(err) => StepResult::errored(step_id, err.to_string()),
    }
}

pub fn teardown_on_cancel(runtime: Runtime, run_id: String, step_id: Option<String>) {
    container_step::teardown_detached(runtime, run_id, step_id);
}
