//! Route handlers. Each is a thin translator into `flowd_core`'s C1–C11
//! operations — no business logic lives here.

use std::collections::BTreeMap;
use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::{Path as AxPath, State};
use axum::http::StatusCode;
use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use axum::response::IntoResponse;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;
use tokio_util::sync::CancellationToken;

use flowd_core::{
    bind, build_plan, create_run_dir, create_secure_file, discover, load_config, run_scripts,
    write_secure_file, CompositeSink, ExecConfig, MapFlagBag, Plan, RawOutputSink,
};
use flowd_policy::resolve_profile;

use crate::broadcast_sink::BroadcastSink;
use crate::error::ApiError;
use crate::sources::Source;
use crate::state::SharedState;

pub fn build_app(state: SharedState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/metrics", get(metrics))
        .route("/jobs", get(list_jobs))
        .route("/plans", post(create_plan))
        .route("/runs", post(create_run).get(list_runs))
        .route("/runs/{id}", get(get_run))
        .route("/runs/{id}/events", get(run_events_sse))
        .route("/runs/{id}/events.ndjson", get(run_events_ndjson))
        .route("/runs/{id}:cancel", post(cancel_run))
        .route("/sources", get(list_sources).post(add_source))
        .route("/sources/{name}", delete(remove_source))
        .with_state(state)
}

async fn healthz() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn metrics(State(state): State<SharedState>) -> impl IntoResponse {
    let runs = state.registry.list().await;
    format!("flowd_runs_total {}\n", runs.len())
}

#[derive(Debug, Serialize)]
struct JobSummary {
    id: String,
}

async fn list_jobs(State(state): State<SharedState>) -> Json<Vec<JobSummary>> {
    let result = discover(&state.scripts_root);
    Json(result.jobs.into_iter().map(|j| JobSummary { id: j.id }).collect())
}

#[derive(Debug, Deserialize)]
pub struct PlanRequest {
    pub job_id: String,
    #[serde(default)]
    pub flags: BTreeMap<String, serde_json::Value>,
}

fn flags_to_bag(flags: &BTreeMap<String, serde_json::Value>) -> MapFlagBag {
    let mut bag = MapFlagBag::new();
    for (name, value) in flags {
        bag = match value {
            serde_json::Value::String(s) => bag.with_string(name, s.clone()),
            serde_json::Value::Bool(b) => bag.with_bool(name, *b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    bag.with_int(name, i)
                } else {
                    bag
                }
            }
            serde_json::Value::Array(items) => bag.with_array(
                name,
                items
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect(),
            ),
            _ => bag,
        };
    }
    bag
}

async fn create_plan(
    State(state): State<SharedState>,
    Json(req): Json<PlanRequest>,
) -> Result<Json<Plan>, ApiError> {
    let job_dir = state.scripts_root.join(&req.job_id);
    let config = load_config(&job_dir).map_err(|e| ApiError::bad_request(e.to_string()))?;
    let bag = flags_to_bag(&req.flags);
    let binding = bind(&bag, &config.argspec).map_err(|e| ApiError::bad_request(e.to_string()))?;
    let profile = resolve_profile(None);
    let plan = build_plan(&req.job_id, &config, &config.argspec, &binding, &profile, &state.policy);
    Ok(Json(plan))
}

#[derive(Debug, Deserialize)]
pub struct RunRequest {
    pub job_id: String,
    #[serde(default)]
    pub flags: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub strict: bool,
}

#[derive(Debug, Serialize)]
pub struct RunCreated {
    pub run_id: String,
}

async fn create_run(
    State(state): State<SharedState>,
    Json(req): Json<RunRequest>,
) -> Result<Json<RunCreated>, ApiError> {
    let job_dir = state.scripts_root.join(&req.job_id);
    let config = load_config(&job_dir).map_err(|e| ApiError::bad_request(e.to_string()))?;
    let bag = flags_to_bag(&req.flags);
    let binding = bind(&bag, &config.argspec).map_err(|e| ApiError::bad_request(e.to_string()))?;

    let run_id = format!("run-{}", chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default());
    let cancel = CancellationToken::new();
    state.registry.insert(run_id.clone(), req.job_id.clone(), cancel.clone()).await;

    let broadcast = Arc::new(BroadcastSink::new(256));
    {
        let mut sinks = RUN_SINKS.lock().expect("run sink registry poisoned");
        sinks.insert(run_id.clone(), broadcast.clone());
    }

    let run_dir = state.data_dir.join("runs").join(&run_id);
    create_run_dir(&run_dir).map_err(|e| ApiError::internal(e.to_string()))?;

    let profile = resolve_profile(None);
    let plan = build_plan(&req.job_id, &config, &config.argspec, &binding, &profile, &state.policy);
    write_secure_file(
        &run_dir.join("plan.json"),
        serde_json::to_string_pretty(&plan).unwrap_or_default().as_bytes(),
    )
    .map_err(|e| ApiError::internal(e.to_string()))?;

    let stdout_file = create_secure_file(&run_dir.join("stdout")).map_err(|e| ApiError::internal(e.to_string()))?;
    let stderr_file = create_secure_file(&run_dir.join("stderr")).map_err(|e| ApiError::internal(e.to_string()))?;
    let raw_sink: Box<dyn flowd_core::Sink> = Box::new(RawOutputSink::new(stdout_file, stderr_file));
    let broadcast_child: Box<dyn flowd_core::Sink> = Box::new(broadcast.clone());
    let sink: Arc<dyn flowd_core::Sink> = Arc::new(CompositeSink::new(vec![broadcast_child, raw_sink]));

    let data_dir = state.data_dir.clone();
    let registry = state.registry.clone();
    let run_id_task = run_id.clone();
    let job_dir_task = job_dir.clone();

    tokio::spawn(async move {
        registry.mark_running(&run_id_task).await;
        sink.emit_run_start(&run_id_task, &req.job_id);
        let exec = ExecConfig {
            run_id: run_id_task.clone(),
            data_dir,
            run_dir,
            binding,
            sink: sink.clone(),
            strict: req.strict,
        };
        let outcome = run_scripts(cancel, &job_dir_task, &config, exec).await;
        match &outcome {
            Ok(_) => sink.emit_run_finish(&run_id_task, "completed", None),
            Err(err) => sink.emit_run_finish(&run_id_task, "failed", Some(&err.message)),
        }
        registry
            .mark_finished(&run_id_task, outcome.as_ref().map(Vec::as_slice))
            .await;
    });

    Ok(Json(RunCreated { run_id }))
}

async fn list_runs(State(state): State<SharedState>) -> impl IntoResponse {
    Json(state.registry.list().await)
}

async fn get_run(State(state): State<SharedState>, AxPath(id): AxPath<String>) -> Result<impl IntoResponse, ApiError> {
    state
        .registry
        .get(&id)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::not_found("run_not_found"))
}

async fn cancel_run(State(state): State<SharedState>, AxPath(id): AxPath<String>) -> Result<impl IntoResponse, ApiError> {
    if state.registry.cancel(&id).await {
        state.registry.mark_cancelled(&id).await;
        Ok(StatusCode::ACCEPTED)
    } else {
        Err(ApiError::not_found("run_not_found"))
    }
}

use std::sync::LazyLock;
use std::sync::Mutex;

static RUN_SINKS: LazyLock<Mutex<BTreeMap<String, Arc<BroadcastSink>>>> =
    LazyLock::new(|| Mutex::new(BTreeMap::new()));

fn sink_for_run(run_id: &str) -> Option<Arc<BroadcastSink>> {
    RUN_SINKS.lock().expect("run sink registry poisoned").get(run_id).cloned()
}

async fn run_events_sse(
    State(state): State<SharedState>,
    AxPath(id): AxPath<String>,
) -> Result<Sse<impl tokio_stream::Stream<Item = Result<SseEvent, Infallible>>>, ApiError> {
    if state.registry.get(&id).await.is_none() {
        return Err(ApiError::not_found("run_not_found"));
    }
    let sink = sink_for_run(&id).ok_or_else(|| ApiError::not_found("run_not_found"))?;
    let stream = BroadcastStream::new(sink.subscribe()).filter_map(|event| {
        event.ok().map(|e| Ok(SseEvent::default().json_data(&e).unwrap_or_default()))
    });
    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

async fn run_events_ndjson(
    State(state): State<SharedState>,
    AxPath(id): AxPath<String>,
) -> Result<impl IntoResponse, ApiError> {
    if state.registry.get(&id).await.is_none() {
        return Err(ApiError::not_found("run_not_found"));
    }
    let sink = sink_for_run(&id).ok_or_else(|| ApiError::not_found("run_not_found"))?;
    let stream = BroadcastStream::new(sink.subscribe()).filter_map(|event| {
        event.ok().and_then(|e| serde_json::to_string(&e).ok()).map(|mut line| {
            line.push('\n');
            Ok::<_, std::io::Error>(line)
        })
    });
    let body = axum::body::Body::from_stream(stream);
    Ok(([("content-type", "application/x-ndjson")], body))
}

async fn list_sources(State(state): State<SharedState>) -> Json<Vec<Source>> {
    Json(state.sources.list().await)
}

async fn add_source(State(state): State<SharedState>, Json(source): Json<Source>) -> Result<impl IntoResponse, ApiError> {
    state.sources.add(source).await.map_err(ApiError::bad_request)?;
    Ok(StatusCode::CREATED)
}

async fn remove_source(State(state): State<SharedState>, AxPath(name): AxPath<String>) -> Result<impl IntoResponse, ApiError> {
    state.sources.remove(&name).await.map_err(|_| ApiError::not_found("source_not_found"))?;
    Ok(StatusCode::NO_CONTENT)
}
