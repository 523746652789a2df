//! Axum router and all HTTP handlers for nexus-daemon.
//!
//! `build_router` is the single entry point; `main.rs` calls it and attaches
//! middleware layers. Handlers only validate request shape and translate
//! between JSON and [`TicketService`](nexus_lifecycle::TicketService) calls.
//!
//! Status mapping: NotFound 404, PreconditionFailed 409, Internal 500, every
//! other lifecycle error 400.

use std::{convert::Infallible, sync::Arc};

use axum::{
    extract::{Path, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use futures_util::{Stream, StreamExt};
use nexus_lifecycle::{state_machine, ErrorKind, LifecycleError};
use nexus_schemas::{MasterId, TicketId, TicketState, ToolId};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{error, info};

use crate::{
    api_types::{
        AllowedTransitionsResponse, CreateTicketRequest, CreateToolRequest, CriticalLockResponse,
        ErrorResponse, HealthResponse, JobRequestRequest, TransitionRequest,
    },
    state::{AppState, BusMsg},
};

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Build the complete application router wired to the given shared state.
///
/// Middleware layers (CORS, tracing) are **not** applied here; `main.rs`
/// attaches them after this call so tests can use the bare router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/masters", get(list_masters))
        .route("/api/masters/:id/critical", get(master_critical))
        .route("/api/tools", get(list_tools).post(create_tool))
        .route("/api/tickets", get(list_tickets).post(create_ticket))
        .route("/api/tickets/:id", get(get_ticket))
        .route("/api/tickets/:id/job-request", post(update_job_request))
        .route("/api/tickets/:id/transition", post(transition))
        .route("/api/tickets/:id/transitions", get(allowed_transitions))
        .route("/api/tickets/:id/logs", get(audit_logs))
        .route("/api/stream", get(stream))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Error translation
// ---------------------------------------------------------------------------

/// Lifecycle failure or request-shape failure, rendered as
/// `{ "error": .., "kind": .. }`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorResponse,
}

impl ApiError {
    fn bad_request(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            body: ErrorResponse {
                error: msg.into(),
                kind: ErrorKind::InvalidArgument.as_str().to_string(),
            },
        }
    }
}

impl From<LifecycleError> for ApiError {
    fn from(e: LifecycleError) -> Self {
        let kind = e.kind();
        let status = match kind {
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::PreconditionFailed => StatusCode::CONFLICT,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorKind::InvalidRelationship
            | ErrorKind::InvalidArgument
            | ErrorKind::InvalidState
            | ErrorKind::InvalidTransition => StatusCode::BAD_REQUEST,
        };
        if kind == ErrorKind::Internal {
            error!(error = %e, "lifecycle internal error");
        }
        Self {
            status,
            body: ErrorResponse {
                error: e.to_string(),
                kind: kind.as_str().to_string(),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

/// `None`, empty and whitespace-only strings all count as missing.
fn required(v: Option<String>) -> Option<String> {
    v.filter(|s| !s.trim().is_empty())
}

// ---------------------------------------------------------------------------
// GET /health
// ---------------------------------------------------------------------------

pub(crate) async fn health(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            ok: true,
            service: st.build.service.to_string(),
            version: st.build.version.to_string(),
            config_hash: st.config_hash.clone(),
        }),
    )
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

pub(crate) async fn list_masters(State(st): State<Arc<AppState>>) -> ApiResult<Response> {
    let masters = st.tickets.list_masters()?;
    Ok(Json(masters).into_response())
}

pub(crate) async fn master_critical(
    State(st): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    let ticket = st.tickets.critical_ticket(&MasterId::new(id.clone()))?;
    Ok(Json(CriticalLockResponse {
        master_id: id,
        locked: ticket.is_some(),
        ticket,
    })
    .into_response())
}

pub(crate) async fn list_tools(State(st): State<Arc<AppState>>) -> ApiResult<Response> {
    let tools = st.tickets.list_tools()?;
    Ok(Json(tools).into_response())
}

pub(crate) async fn create_tool(
    State(st): State<Arc<AppState>>,
    Json(req): Json<CreateToolRequest>,
) -> ApiResult<Response> {
    let (Some(master_id), Some(tool_name)) = (required(req.master_id), required(req.tool_name))
    else {
        return Err(ApiError::bad_request("masterId and toolName are required"));
    };

    let tool = st.tickets.create_tool(&MasterId::new(master_id), &tool_name)?;
    Ok((StatusCode::CREATED, Json(tool)).into_response())
}

// ---------------------------------------------------------------------------
// Tickets
// ---------------------------------------------------------------------------

pub(crate) async fn list_tickets(State(st): State<Arc<AppState>>) -> ApiResult<Response> {
    let views = st.tickets.list_ticket_views()?;
    Ok(Json(views).into_response())
}

pub(crate) async fn get_ticket(
    State(st): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    let view = st.tickets.ticket_view(&TicketId::new(id))?;
    Ok(Json(view).into_response())
}

pub(crate) async fn create_ticket(
    State(st): State<Arc<AppState>>,
    Json(req): Json<CreateTicketRequest>,
) -> ApiResult<Response> {
    let (Some(master_id), Some(tool_id)) = (required(req.master_id), required(req.tool_id)) else {
        return Err(ApiError::bad_request("masterId and toolId are required"));
    };

    let view = st
        .tickets
        .create_ticket_view(&MasterId::new(master_id), &ToolId::new(tool_id))?;

    info!(ticket_number = %view.ticket.ticket_number, "tickets/create");
    st.publish("created", view.clone());
    Ok((StatusCode::CREATED, Json(view)).into_response())
}

pub(crate) async fn update_job_request(
    State(st): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<JobRequestRequest>,
) -> ApiResult<Response> {
    // Blank text is the service's call; it checks the ticket first.
    let Some(job_request) = req.job_request else {
        return Err(ApiError::bad_request("jobRequest is required"));
    };

    let view = st
        .tickets
        .update_job_request_view(&TicketId::new(id), &job_request)?;

    st.publish("job_request_updated", view.clone());
    Ok(Json(view).into_response())
}

pub(crate) async fn transition(
    State(st): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<TransitionRequest>,
) -> ApiResult<Response> {
    let Some(raw) = required(req.to_state) else {
        return Err(ApiError::bad_request("toState is required"));
    };
    let to: TicketState = raw
        .parse()
        .map_err(|e: nexus_schemas::UnknownState| ApiError::bad_request(e.to_string()))?;

    let view = st.tickets.transition_state_view(&TicketId::new(id), to)?;

    st.publish("state_changed", view.clone());
    Ok(Json(view).into_response())
}

pub(crate) async fn allowed_transitions(
    State(st): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    // One snapshot so `state` and `allowed` always agree.
    let ticket = st.tickets.get_ticket(&TicketId::new(id))?;
    Ok(Json(AllowedTransitionsResponse {
        allowed: state_machine::allowed_next(ticket.state).to_vec(),
        ticket_id: ticket.id.to_string(),
        state: ticket.state,
    })
    .into_response())
}

/// Unknown tickets yield `[]`, matching the service contract.
pub(crate) async fn audit_logs(
    State(st): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    let logs = st.tickets.get_audit_logs(&TicketId::new(id))?;
    Ok(Json(logs).into_response())
}

// ---------------------------------------------------------------------------
// GET /api/stream  (SSE)
// ---------------------------------------------------------------------------

pub(crate) async fn stream(State(st): State<Arc<AppState>>) -> Response {
    let mut headers = HeaderMap::new();
    headers.insert("Cache-Control", HeaderValue::from_static("no-cache"));
    headers.insert("Connection", HeaderValue::from_static("keep-alive"));

    let rx = st.bus.subscribe();
    let events = broadcast_to_sse(rx);

    (headers, Sse::new(events).keep_alive(KeepAlive::new())).into_response()
}

fn broadcast_to_sse(
    rx: broadcast::Receiver<BusMsg>,
) -> impl Stream<Item = Result<Event, Infallible>> {
    BroadcastStream::new(rx).filter_map(|msg| async move {
        match msg {
            Ok(m) => {
                let event_name = match &m {
                    BusMsg::Heartbeat { .. } => "heartbeat",
                    BusMsg::Ticket(_) => "ticket",
                };
                let data = serde_json::to_string(&m).ok()?;
                Some(Ok(Event::default().event(event_name).data(data)))
            }
            Err(_) => None, // lagged / closed
        }
    })
}
