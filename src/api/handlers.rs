use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        Html, IntoResponse,
    },
    Json,
};
use chrono::{DateTime, Utc};
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use tokio::sync::broadcast::error::RecvError;

use crate::api::error::ApiError;
use crate::api::page::INDEX_HTML;
use crate::api::server::AppState;
use crate::engine::NoopObserver;
use crate::types::{CrewEvent, Run, RunEvent, RunId, RunState, TaskOutput, Variant};

const EMPTY_TOPIC: &str = "Please enter a topic for the blog post.";

#[derive(Deserialize)]
pub struct TopicRequest {
    #[serde(default)]
    pub topic: String,
}

impl TopicRequest {
    fn validated(&self) -> Result<&str, ApiError> {
        let topic = self.topic.trim();
        if topic.is_empty() {
            return Err(ApiError::BadRequest(EMPTY_TOPIC.to_string()));
        }
        Ok(topic)
    }
}

#[derive(Serialize)]
pub struct RunResponse {
    pub id: String,
    pub topic: String,
    pub variant: Variant,
    pub state: String,
    pub task_outputs: Vec<TaskOutput>,
    pub markdown: Option<String>,
    pub error: Option<String>,
    pub filename: String,
    pub created_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl From<Run> for RunResponse {
    fn from(run: Run) -> Self {
        Self {
            id: run.id.to_string(),
            filename: run.download_filename(),
            state: run.state.as_str().to_string(),
            topic: run.topic,
            variant: run.variant,
            task_outputs: run.task_outputs,
            markdown: run.markdown,
            error: run.error,
            created_at: run.created_at,
            finished_at: run.finished_at,
        }
    }
}

#[derive(Serialize)]
pub struct GenerateResponse {
    pub markdown: String,
    pub filename: String,
}

pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub async fn get_config(State(state): State<AppState>) -> Json<serde_json::Value> {
    let factory = &state.factory;
    Json(serde_json::json!({
        "variant": factory.variant(),
        "crew": factory.definition().name,
        "model": factory.model(),
        "api_base": factory.api_base(),
        "mcp_endpoint": factory.mcp_endpoint(),
        "tools": factory.tool_names(),
    }))
}

/// Starts a run in the background and returns it while it is still running.
pub async fn create_run(
    State(state): State<AppState>,
    Json(request): Json<TopicRequest>,
) -> Result<(StatusCode, Json<RunResponse>), ApiError> {
    let topic = request.validated()?.to_string();
    let run = Run::new(topic.clone(), state.factory.variant());
    state.store.create_run(run.clone())?;

    log::info!("run {} started for '{}'", run.id, topic);
    tokio::spawn(execute_run(state.clone(), run.id, topic));

    Ok((StatusCode::ACCEPTED, Json(RunResponse::from(run))))
}

async fn execute_run(state: AppState, run_id: RunId, topic: String) {
    let observer = |event: CrewEvent| state.record(run_id, event);
    let result = state.factory.generate(&topic, &observer).await;

    let finished = match state.store.get_run(&run_id) {
        Ok(Some(mut run)) => {
            let event = match result {
                Ok(output) => {
                    run.complete(output.tasks, output.raw);
                    CrewEvent::Finished {
                        success: true,
                        message: None,
                    }
                }
                Err(e) => {
                    log::warn!("run {} failed: {}", run_id, e);
                    run.fail(e.to_string());
                    CrewEvent::Finished {
                        success: false,
                        message: Some(e.to_string()),
                    }
                }
            };
            state.store.update_run(run).map(|_| event)
        }
        Ok(None) => Err(anyhow::anyhow!("run {} vanished", run_id)),
        Err(e) => Err(e),
    };

    match finished {
        Ok(event) => state.record(run_id, event),
        Err(e) => log::error!("could not store outcome of run {}: {}", run_id, e),
    }
}

/// Runs the crew inline and answers with the finished post.
pub async fn generate(
    State(state): State<AppState>,
    Json(request): Json<TopicRequest>,
) -> Result<Json<GenerateResponse>, ApiError> {
    let topic = request.validated()?;
    let output = state
        .factory
        .generate(topic, &NoopObserver)
        .await
        .map_err(|e| ApiError::Generation(e.to_string()))?;

    Ok(Json(GenerateResponse {
        markdown: output.raw,
        filename: state.factory.variant().download_filename(topic),
    }))
}

pub async fn list_runs(State(state): State<AppState>) -> Result<Json<Vec<RunResponse>>, ApiError> {
    let runs = state.store.list_runs()?;
    Ok(Json(runs.into_iter().map(RunResponse::from).collect()))
}

fn find_run(state: &AppState, run_id: &RunId) -> Result<Run, ApiError> {
    state
        .store
        .get_run(run_id)?
        .ok_or_else(|| ApiError::NotFound(format!("Run {} not found", run_id)))
}

pub async fn get_run(
    State(state): State<AppState>,
    Path(run_id): Path<RunId>,
) -> Result<Json<RunResponse>, ApiError> {
    Ok(Json(RunResponse::from(find_run(&state, &run_id)?)))
}

pub async fn download_run(
    State(state): State<AppState>,
    Path(run_id): Path<RunId>,
) -> Result<impl IntoResponse, ApiError> {
    let run = find_run(&state, &run_id)?;
    let filename = run.download_filename();
    let markdown = match (run.state, run.markdown) {
        (RunState::Completed, Some(markdown)) => markdown,
        _ => {
            return Err(ApiError::Conflict(format!(
                "Run {} has no blog post to download",
                run_id
            )))
        }
    };

    Ok((
        [
            (header::CONTENT_TYPE, "text/markdown; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        markdown,
    ))
}

/// Replays what a run has recorded, then follows it live until it finishes.
///
/// A subscriber that lags behind the broadcast buffer catches up from the
/// store, so the terminal event is never lost.
pub async fn stream_run_events(
    State(state): State<AppState>,
    Path(run_id): Path<RunId>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    // Subscribe before the snapshot so nothing falls between the two.
    let mut receiver = state.events.subscribe();
    let mut sent = find_run(&state, &run_id)?.events;
    let finished = sent.iter().any(|e| e.event.is_terminal());

    let stream = async_stream::stream! {
        for event in &sent {
            yield Ok::<Event, Infallible>(to_sse(event));
        }
        if !finished {
            loop {
                match receiver.recv().await {
                    Ok(event) if event.run_id == run_id => {
                        if already_sent(&sent, &event) {
                            continue;
                        }
                        let terminal = event.event.is_terminal();
                        yield Ok(to_sse(&event));
                        if terminal {
                            break;
                        }
                        sent.push(event);
                    }
                    Ok(_) => continue,
                    Err(RecvError::Lagged(skipped)) => {
                        log::warn!(
                            "event stream for run {} skipped {} events, catching up from the store",
                            run_id,
                            skipped
                        );
                        let recorded = match state.store.get_run(&run_id) {
                            Ok(Some(run)) => run.events,
                            Ok(None) => break,
                            Err(e) => {
                                log::warn!("cannot reload run {}: {}", run_id, e);
                                break;
                            }
                        };
                        let mut terminal = false;
                        for event in recorded {
                            if already_sent(&sent, &event) {
                                continue;
                            }
                            terminal |= event.event.is_terminal();
                            yield Ok(to_sse(&event));
                            sent.push(event);
                        }
                        if terminal {
                            break;
                        }
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        }
    };

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

fn already_sent(sent: &[RunEvent], event: &RunEvent) -> bool {
    sent.iter().any(|s| s.at == event.at && s.event == event.event)
}

fn to_sse(event: &RunEvent) -> Event {
    let mut data = serde_json::to_value(event).unwrap_or_default();
    data["text"] = serde_json::Value::String(event.event.describe());
    Event::default().data(data.to_string())
}
