use std::collections::BTreeSet;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::header;
use axum::{
    extract::{DefaultBodyLimit, Path, Query, State},
    http::{HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{delete, get, post, put},
    Router,
};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tower::limit::ConcurrencyLimitLayer;
use tower::ServiceBuilder;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::timeout::TimeoutLayer;
use tracing::{debug, info};

use crate::cli::{open_session, ServeArgs};
use crate::core::modification::Modification;
use crate::engine::frame::FrameError;
use crate::engine::modification::ContigOrder;
use crate::export::session::{SessionDocument, SessionError};
use crate::session::CurationSession;
use crate::view::interaction::{Camera, Mode, Point};
use crate::view::settings::ViewSettings;
use crate::workspace::manager::{SwitchDecision, WorkspaceError};

/// Session documents carry full undo histories, so allow generous bodies
pub const MAX_BODY_SIZE: usize = 64 * 1024 * 1024;
pub const MAX_CONCURRENT_REQUESTS: usize = 100;
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Shared application state
pub struct AppState {
    /// Every handler holds this lock for its whole operation
    pub session: Mutex<CurationSession>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub error_type: String,
    pub details: Option<String>,
}

type ApiError = (StatusCode, Json<ErrorResponse>);
type ApiResult<T> = Result<Json<T>, ApiError>;

fn error_response(status: StatusCode, error_type: &str, message: impl Into<String>) -> ApiError {
    let message = message.into();
    if status.is_server_error() {
        tracing::error!("Internal error ({error_type}): {message}");
    } else {
        debug!("Rejected request ({error_type}): {message}");
    }
    (
        status,
        Json(ErrorResponse {
            error: message,
            error_type: error_type.to_string(),
            details: None,
        }),
    )
}

fn workspace_error(err: &WorkspaceError) -> ApiError {
    let (status, error_type) = match err {
        WorkspaceError::UnknownReference(_) => (StatusCode::NOT_FOUND, "unknown_reference"),
        WorkspaceError::GroupNotFound(_) => (StatusCode::NOT_FOUND, "group_not_found"),
        WorkspaceError::ModificationIndexOutOfRange { .. } => {
            (StatusCode::NOT_FOUND, "modification_not_found")
        }
        WorkspaceError::NoPendingSwitch => (StatusCode::CONFLICT, "no_pending_switch"),
        WorkspaceError::DuplicateGroupName(_)
        | WorkspaceError::ContigAlreadyGrouped { .. }
        | WorkspaceError::GroupConflict { .. } => (StatusCode::CONFLICT, "group_conflict"),
        WorkspaceError::Modification { .. } => (StatusCode::BAD_REQUEST, "modification_rejected"),
        WorkspaceError::EmptyBatch
        | WorkspaceError::InvalidGroupName(_)
        | WorkspaceError::EmptyGroup
        | WorkspaceError::UnknownContig(_) => (StatusCode::BAD_REQUEST, "invalid_request"),
    };
    error_response(status, error_type, err.to_string())
}

/// The renderer shows a placeholder for any frame error
fn frame_error(err: &FrameError) -> ApiError {
    error_response(StatusCode::UNPROCESSABLE_ENTITY, "frame_unavailable", err.to_string())
}

fn session_error(err: &SessionError) -> ApiError {
    match err {
        SessionError::Workspace(inner) => workspace_error(inner),
        SessionError::ReadError(_) => {
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "io_error", "Failed to read session")
        }
        SessionError::ParseError(_) | SessionError::UnsupportedVersion(_) => {
            error_response(StatusCode::BAD_REQUEST, "invalid_session", err.to_string())
        }
    }
}

/// Run the web server
///
/// # Errors
///
/// Returns an error if the dataset or session cannot be loaded, the tokio
/// runtime cannot be created, or the server fails to start.
pub fn run(args: ServeArgs) -> anyhow::Result<()> {
    let session = open_session(&args.input, args.session.as_deref())?;
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async move { run_server(args, session).await })
}

/// Create the application router around one curation session.
pub fn create_router(session: CurationSession) -> Router {
    let state = Arc::new(AppState {
        session: Mutex::new(session),
    });

    Router::new()
        .route("/", get(index_handler))
        .route("/api/references", get(references_handler))
        .route("/api/frame", get(frame_handler))
        .route("/api/settings", get(get_settings_handler).put(put_settings_handler))
        .route("/api/select", post(select_handler))
        .route("/api/select/resolve", post(resolve_handler))
        .route("/api/reset", post(reset_handler))
        .route("/api/camera", post(camera_handler))
        .route("/api/session", get(get_session_handler).post(post_session_handler))
        .route("/api/export/scaffold", get(scaffold_handler))
        .route("/api/export/changelog", get(changelog_handler))
        .route("/api/workspace/{reference}", get(workspace_handler))
        .route(
            "/api/workspace/{reference}/modifications",
            post(add_modifications_handler),
        )
        .route(
            "/api/workspace/{reference}/modifications/{index}",
            delete(remove_modification_handler),
        )
        .route("/api/workspace/{reference}/groups", post(create_group_handler))
        .route(
            "/api/workspace/{reference}/groups/{name}",
            delete(delete_group_handler).put(group_visibility_handler),
        )
        .route("/api/workspace/{reference}/order", put(order_handler))
        .route("/api/workspace/{reference}/selection", put(selection_handler))
        .route(
            "/api/workspace/{reference}/uninformative",
            put(uninformative_handler),
        )
        .route("/api/workspace/{reference}/undo", post(undo_handler))
        .route("/api/workspace/{reference}/save", post(save_handler))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(SetResponseHeaderLayer::if_not_present(
                    HeaderName::from_static("x-content-type-options"),
                    HeaderValue::from_static("nosniff"),
                ))
                .layer(SetResponseHeaderLayer::if_not_present(
                    HeaderName::from_static("x-frame-options"),
                    HeaderValue::from_static("DENY"),
                ))
                .layer(SetResponseHeaderLayer::if_not_present(
                    HeaderName::from_static("referrer-policy"),
                    HeaderValue::from_static("strict-origin-when-cross-origin"),
                ))
                .layer(SetResponseHeaderLayer::if_not_present(
                    header::CACHE_CONTROL,
                    HeaderValue::from_static("no-store"),
                ))
                .layer(TimeoutLayer::with_status_code(
                    StatusCode::REQUEST_TIMEOUT,
                    REQUEST_TIMEOUT,
                ))
                .layer(ConcurrencyLimitLayer::new(MAX_CONCURRENT_REQUESTS))
                .layer(DefaultBodyLimit::max(MAX_BODY_SIZE)),
        )
}

async fn run_server(args: ServeArgs, session: CurationSession) -> anyhow::Result<()> {
    let app = create_router(session);

    let addr = format!("{}:{}", args.address, args.port);
    println!("Starting contig-scaffolder API at http://{addr}");

    if args.open {
        let _ = open::that(format!("http://{addr}"));
    }

    let listener = TcpListener::bind(&addr).await?;
    info!("Listening on {addr}");
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

async fn index_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "frame": "/api/frame",
        "references": "/api/references",
    }))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReferenceEntry {
    pub name: String,
    pub length: u64,
    pub contig_count: usize,
    pub active: bool,
    pub has_workspace: bool,
    pub saved: bool,
}

async fn references_handler(State(state): State<Arc<AppState>>) -> Json<Vec<ReferenceEntry>> {
    let session = state.session.lock().await;
    let active = session.active_reference();
    let store = session.store();
    let entries = store
        .references()
        .iter()
        .map(|r| {
            let workspace = session.manager().get(&r.name);
            ReferenceEntry {
                name: r.name.clone(),
                length: r.length,
                contig_count: store.queries_for_reference(&r.name).len(),
                active: active.as_deref() == Some(r.name.as_str()),
                has_workspace: workspace.is_some(),
                saved: workspace.map_or(true, |ws| ws.saved),
            }
        })
        .collect();
    Json(entries)
}

#[derive(Debug, Deserialize)]
struct FrameParams {
    reference: Option<String>,
}

async fn frame_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<FrameParams>,
) -> Response {
    let mut session = state.session.lock().await;
    match session.frame(params.reference.as_deref()) {
        Ok(frame) => Json(frame).into_response(),
        Err(err) => frame_error(&err).into_response(),
    }
}

async fn get_settings_handler(State(state): State<Arc<AppState>>) -> Json<ViewSettings> {
    Json(state.session.lock().await.view_settings())
}

async fn put_settings_handler(
    State(state): State<Arc<AppState>>,
    Json(settings): Json<ViewSettings>,
) -> Json<ViewSettings> {
    let mut session = state.session.lock().await;
    session.apply_settings(settings);
    Json(session.view_settings())
}

#[derive(Debug, Deserialize)]
struct SelectRequest {
    reference: String,
}

async fn select_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SelectRequest>,
) -> Response {
    let mut session = state.session.lock().await;
    match session.select(&request.reference) {
        Ok(outcome) => Json(outcome).into_response(),
        Err(err) => workspace_error(&err).into_response(),
    }
}

#[derive(Debug, Deserialize)]
struct ResolveRequest {
    decision: SwitchDecision,
}

async fn resolve_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ResolveRequest>,
) -> Response {
    let mut session = state.session.lock().await;
    match session.resolve_switch(request.decision) {
        Ok(outcome) => Json(outcome).into_response(),
        Err(err) => workspace_error(&err).into_response(),
    }
}

async fn reset_handler(State(state): State<Arc<AppState>>) -> StatusCode {
    state.session.lock().await.reset_all();
    info!("All workspaces reset");
    StatusCode::NO_CONTENT
}

/// A single gesture from the renderer
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum CameraAction {
    Zoom { delta: f64, cursor: Point },
    ZoomTo { zoom: f64, cursor: Point },
    Pan { dx: f64, dy: f64 },
    BeginDrag { at: Point },
    Drag { to: Point },
    EndDrag,
    Reset,
    SetMode { mode: Mode },
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CameraResponse {
    pub camera: Camera,
    pub mode: Mode,

    /// Whether the gesture moved the camera
    pub changed: bool,
}

async fn camera_handler(
    State(state): State<Arc<AppState>>,
    Json(action): Json<CameraAction>,
) -> Json<CameraResponse> {
    let mut session = state.session.lock().await;
    let controller = session.controller_mut();
    let changed = match action {
        CameraAction::Zoom { delta, cursor } => controller.zoom_by(delta, cursor),
        CameraAction::ZoomTo { zoom, cursor } => controller.zoom_to(zoom, cursor),
        CameraAction::Pan { dx, dy } => controller.pan_by(dx, dy),
        CameraAction::BeginDrag { at } => {
            controller.begin_drag(at);
            None
        }
        CameraAction::Drag { to } => controller.drag_to(to),
        CameraAction::EndDrag => {
            controller.end_drag();
            None
        }
        CameraAction::Reset => controller.reset_camera(),
        CameraAction::SetMode { mode } => {
            controller.set_mode(mode);
            None
        }
    }
    .is_some();

    Json(CameraResponse {
        camera: controller.camera(),
        mode: controller.mode(),
        changed,
    })
}

async fn get_session_handler(State(state): State<Arc<AppState>>) -> Json<SessionDocument> {
    Json(state.session.lock().await.export_session())
}

async fn post_session_handler(
    State(state): State<Arc<AppState>>,
    Json(document): Json<SessionDocument>,
) -> ApiResult<ViewSettings> {
    let mut session = state.session.lock().await;
    session
        .restore_session(document)
        .map_err(|e| session_error(&e))?;
    Ok(Json(session.view_settings()))
}

async fn scaffold_handler(State(state): State<Arc<AppState>>) -> Response {
    let document = state.session.lock().await.scaffold();
    Json(document).into_response()
}

async fn changelog_handler(State(state): State<Arc<AppState>>) -> Response {
    let log = state.session.lock().await.changelog();
    match log.to_csv() {
        Ok(csv) => ([(header::CONTENT_TYPE, "text/csv; charset=utf-8")], csv).into_response(),
        Err(err) => error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "export_failed",
            err.to_string(),
        )
        .into_response(),
    }
}

async fn workspace_handler(
    State(state): State<Arc<AppState>>,
    Path(reference): Path<String>,
) -> Response {
    let mut session = state.session.lock().await;
    match session.manager_mut().workspace(&reference) {
        Ok(workspace) => Json(workspace.clone()).into_response(),
        Err(err) => workspace_error(&err).into_response(),
    }
}

/// Either one modification or a batch committed as a single update
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ModificationInput {
    Batch { modifications: Vec<Modification> },
    Single(Modification),
}

impl ModificationInput {
    fn into_vec(self) -> Vec<Modification> {
        match self {
            Self::Batch { modifications } => modifications,
            Self::Single(modification) => vec![modification],
        }
    }
}

/// Run one manager update under the lock and answer with the resulting workspace
async fn update_workspace<F>(state: &AppState, reference: &str, op: F) -> Response
where
    F: FnOnce(&mut CurationSession) -> Result<(), WorkspaceError>,
{
    let mut session = state.session.lock().await;
    let result = op(&mut *session).and_then(|()| {
        session
            .manager_mut()
            .workspace(reference)
            .map(Clone::clone)
    });
    match result {
        Ok(workspace) => Json(workspace).into_response(),
        Err(err) => workspace_error(&err).into_response(),
    }
}

async fn add_modifications_handler(
    State(state): State<Arc<AppState>>,
    Path(reference): Path<String>,
    Json(input): Json<ModificationInput>,
) -> Response {
    update_workspace(&state, &reference, |s| {
        s.manager_mut().add_modifications(&reference, input.into_vec())
    })
    .await
}

async fn remove_modification_handler(
    State(state): State<Arc<AppState>>,
    Path((reference, index)): Path<(String, usize)>,
) -> Response {
    update_workspace(&state, &reference, |s| {
        s.manager_mut().remove_modification(&reference, index)
    })
    .await
}

#[derive(Debug, Deserialize)]
struct CreateGroupRequest {
    name: String,
    contigs: Vec<String>,
}

async fn create_group_handler(
    State(state): State<Arc<AppState>>,
    Path(reference): Path<String>,
    Json(request): Json<CreateGroupRequest>,
) -> Response {
    update_workspace(&state, &reference, |s| {
        s.manager_mut()
            .create_group(&reference, &request.name, request.contigs)
    })
    .await
}

async fn delete_group_handler(
    State(state): State<Arc<AppState>>,
    Path((reference, name)): Path<(String, String)>,
) -> Response {
    update_workspace(&state, &reference, |s| {
        s.manager_mut().delete_group(&reference, &name)
    })
    .await
}

#[derive(Debug, Deserialize)]
struct GroupVisibilityRequest {
    visible: bool,
}

async fn group_visibility_handler(
    State(state): State<Arc<AppState>>,
    Path((reference, name)): Path<(String, String)>,
    Json(request): Json<GroupVisibilityRequest>,
) -> Response {
    update_workspace(&state, &reference, |s| {
        s.manager_mut()
            .set_group_visible(&reference, &name, request.visible)
    })
    .await
}

async fn order_handler(
    State(state): State<Arc<AppState>>,
    Path(reference): Path<String>,
    Json(order): Json<ContigOrder>,
) -> Response {
    update_workspace(&state, &reference, |s| {
        s.manager_mut().set_contig_order(&reference, order)
    })
    .await
}

async fn selection_handler(
    State(state): State<Arc<AppState>>,
    Path(reference): Path<String>,
    Json(selection): Json<Vec<String>>,
) -> Response {
    update_workspace(&state, &reference, |s| {
        s.manager_mut().set_selection(&reference, selection)
    })
    .await
}

async fn uninformative_handler(
    State(state): State<Arc<AppState>>,
    Path(reference): Path<String>,
    Json(contigs): Json<BTreeSet<String>>,
) -> Response {
    update_workspace(&state, &reference, |s| {
        s.manager_mut().set_uninformative(&reference, contigs)
    })
    .await
}

async fn undo_handler(
    State(state): State<Arc<AppState>>,
    Path(reference): Path<String>,
) -> Response {
    let mut session = state.session.lock().await;
    match session.manager_mut().undo(&reference) {
        Ok(undone) => Json(serde_json::json!({ "undone": undone })).into_response(),
        Err(err) => workspace_error(&err).into_response(),
    }
}

async fn save_handler(
    State(state): State<Arc<AppState>>,
    Path(reference): Path<String>,
) -> Response {
    update_workspace(&state, &reference, |s| s.manager_mut().mark_saved(&reference)).await
}
