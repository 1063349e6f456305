// HTTP request handlers
use crate::application::error::WorkflowError;
use crate::domain::files::UploadedFile;
use crate::domain::params::ParamsUpdate;
use crate::domain::plot::{PlotKind, PlotRequest};
use crate::infrastructure::http_response::{bad_request, csv_download};
use crate::presentation::app_state::AppState;
use axum::{
    extract::{rejection::JsonRejection, Multipart, Path, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    Json,
};
use futures::stream::Stream;
use serde::Deserialize;
use serde_json::json;
use std::convert::Infallible;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;

#[derive(Deserialize)]
pub struct SelectBody {
    pub name: String,
}

#[derive(Deserialize)]
pub struct ModeBody {
    pub mode: String,
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

pub async fn session(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.workflow.snapshot())
}

/// Multi-file upload; every part with a file name is one file
pub async fn upload_files(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Response {
    let mut files = Vec::new();
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return bad_request(format!("malformed upload: {}", e)),
        };
        let Some(name) = field.file_name().map(str::to_string) else {
            continue;
        };
        match field.bytes().await {
            Ok(contents) => files.push(UploadedFile::new(name, contents)),
            Err(e) => return bad_request(format!("failed to read {}: {}", name, e)),
        }
    }

    if files.is_empty() {
        return bad_request("no files in upload");
    }

    let report = state.workflow.upload(files).await;
    let status = if report.accepted.is_empty() {
        StatusCode::BAD_GATEWAY
    } else {
        StatusCode::OK
    };
    (status, Json(report)).into_response()
}

pub async fn clear_all(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let cleared = state.workflow.clear();
    Json(json!({ "cleared": cleared }))
}

pub async fn select_file(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SelectBody>,
) -> Result<impl IntoResponse, WorkflowError> {
    let changed = state.workflow.select(&body.name)?;
    Ok(Json(json!({ "selected": body.name, "changed": changed })))
}

/// Partial parameter update. Out-of-range integers are clamped, so only a
/// body that is not a parameter object at all is rejected.
pub async fn update_params(
    State(state): State<Arc<AppState>>,
    update: Result<Json<ParamsUpdate>, JsonRejection>,
) -> Response {
    match update {
        Ok(Json(update)) => Json(state.workflow.update_params(&update)).into_response(),
        Err(e) => bad_request(e.body_text()),
    }
}

pub async fn process(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, WorkflowError> {
    let statistics = state.workflow.process().await?;
    Ok(Json(statistics))
}

pub async fn plot_slot(
    Path(kind): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Response {
    match kind.parse::<PlotKind>() {
        Ok(kind) => Json(state.workflow.plot(kind)).into_response(),
        Err(e) => (StatusCode::NOT_FOUND, Json(json!({ "error": e }))).into_response(),
    }
}

pub async fn set_mode(
    Path(kind): Path<String>,
    State(state): State<Arc<AppState>>,
    Json(body): Json<ModeBody>,
) -> Response {
    let kind = match kind.parse::<PlotKind>() {
        Ok(kind) => kind,
        Err(e) => return (StatusCode::NOT_FOUND, Json(json!({ "error": e }))).into_response(),
    };
    let request = match PlotRequest::parse(kind, &body.mode) {
        Ok(request) => request,
        Err(e) => return bad_request(e),
    };

    let refreshing = state.workflow.set_mode(request);
    Json(json!({ "plot": kind, "mode": request.mode(), "refreshing": refreshing })).into_response()
}

/// Stream slot snapshots as they change (progressive loading)
pub async fn plot_events(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let mut rx = state.workflow.orchestrator().subscribe();
    let initial = state.workflow.orchestrator().slots();

    let stream = async_stream::stream! {
        for slot in initial {
            if let Ok(event) = Event::default().event(slot.kind.as_str()).json_data(&slot) {
                yield Ok::<_, Infallible>(event);
            }
        }
        loop {
            match rx.recv().await {
                Ok(slot) => {
                    if let Ok(event) = Event::default().event(slot.kind.as_str()).json_data(&slot) {
                        yield Ok::<_, Infallible>(event);
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!("Plot event stream lagged by {} updates", skipped);
                }
                Err(RecvError::Closed) => break,
            }
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::default())
}

pub async fn statistics(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, WorkflowError> {
    Ok(Json(state.workflow.statistics()?))
}

pub async fn export_statistics(State(state): State<Arc<AppState>>) -> Response {
    match state.workflow.export_statistics() {
        Ok(file) => match csv_download(file) {
            Ok(response) => response,
            Err(status) => status.into_response(),
        },
        Err(e) => e.into_response(),
    }
}
