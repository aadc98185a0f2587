//! api-server — Local development HTTP API for the URL resource module.
//!
//! Provides the instance CRUD endpoints and the student-facing view endpoint
//! and supports local dev with:
//! - Storage: In-memory or SQLite (file) when the `sqlite` feature is enabled.
//! - Session: the host normally supplies the viewing user; locally the
//!   X-Debug-User header stands in for it.
//! - CORS: Configurable via CORS_ALLOW_ORIGIN (origin string).
//!
//! Run:
//! ```bash
//! # pretty logs (default); PORT optional
//! cargo run -p api-server
//! ```
//!
//! Configuration: See `config.rs` for all environment variables.

mod config;
mod view;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::SystemTime;

use axum::http::HeaderValue;
use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
    Json, Router,
};
use domain::adapters::memory_repo::InMemoryRepo;
use domain::context::{CourseContext, SiteContext, UserContext};
use domain::render::{full_url, raw_url};
use domain::service::{view_plan, ResourceService, ViewPlan};
use domain::{
    unix_secs, Clock, CoreError, DisplayMode, ExtensionMimeGuesser, NewResource, RenderContext,
    ResourceRepository, UrlResource,
};
use serde::Deserialize;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

// Local repo abstraction supporting memory or sqlite (feature-gated).
enum RepoKind {
    Memory(InMemoryRepo),
    #[cfg(feature = "sqlite")]
    Sqlite(sqlite_adapter::SqliteRepo),
}

#[derive(Clone)]
struct AnyRepo {
    kind: Arc<RepoKind>,
}

impl AnyRepo {
    fn memory() -> Self {
        Self {
            kind: Arc::new(RepoKind::Memory(InMemoryRepo::new())),
        }
    }

    #[cfg(feature = "sqlite")]
    fn sqlite(path: &std::path::Path) -> Result<Self, CoreError> {
        Ok(Self {
            kind: Arc::new(RepoKind::Sqlite(sqlite_adapter::SqliteRepo::new(path)?)),
        })
    }
}

impl ResourceRepository for AnyRepo {
    fn get(&self, id: u64) -> Result<Option<UrlResource>, CoreError> {
        match &*self.kind {
            RepoKind::Memory(r) => r.get(id),
            #[cfg(feature = "sqlite")]
            RepoKind::Sqlite(r) => r.get(id),
        }
    }

    fn insert(&self, resource: UrlResource) -> Result<u64, CoreError> {
        match &*self.kind {
            RepoKind::Memory(r) => r.insert(resource),
            #[cfg(feature = "sqlite")]
            RepoKind::Sqlite(r) => r.insert(resource),
        }
    }

    fn update(&self, resource: &UrlResource) -> Result<(), CoreError> {
        match &*self.kind {
            RepoKind::Memory(r) => r.update(resource),
            #[cfg(feature = "sqlite")]
            RepoKind::Sqlite(r) => r.update(resource),
        }
    }

    fn delete(&self, id: u64) -> Result<(), CoreError> {
        match &*self.kind {
            RepoKind::Memory(r) => r.delete(id),
            #[cfg(feature = "sqlite")]
            RepoKind::Sqlite(r) => r.delete(id),
        }
    }

    fn list_by_course(&self, course: u64) -> Result<Vec<UrlResource>, CoreError> {
        match &*self.kind {
            RepoKind::Memory(r) => r.list_by_course(course),
            #[cfg(feature = "sqlite")]
            RepoKind::Sqlite(r) => r.list_by_course(course),
        }
    }
}

#[derive(Clone)]
struct StdClock;
impl Clock for StdClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

#[derive(Clone)]
struct AppState {
    svc: Arc<ResourceService<AnyRepo, StdClock>>,
    cfg: Arc<config::Config>,
}

#[tokio::main]
async fn main() {
    // Load and validate config first (fail fast on misconfiguration)
    let cfg = match config::Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    init_tracing(&cfg);

    let repo = build_repo_from_env(&cfg);
    let state = AppState {
        svc: Arc::new(ResourceService::new(repo, StdClock)),
        cfg: Arc::new(cfg.clone()),
    };

    // Request ID header name
    let x_request_id = axum::http::HeaderName::from_static("x-request-id");

    let mut app = Router::new()
        .route(
            "/api/resources",
            axum::routing::post(create_resource).get(list_resources),
        )
        .route(
            "/api/resources/:id",
            get(get_resource).put(update_resource).delete(delete_resource),
        )
        .route("/resources/:id/view", get(view_resource))
        .route("/resources/:id/frame", get(frame_top))
        .layer(PropagateRequestIdLayer::new(x_request_id.clone()))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("-");
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = %request_id,
                )
            }),
        )
        .layer(SetRequestIdLayer::new(x_request_id, MakeRequestUuid))
        .with_state(state);

    // CORS - already validated in Config::from_env()
    let cors = if cfg.cors_allow_origin == HeaderValue::from_static("*") {
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
            .allow_origin(AllowOrigin::list([cfg.cors_allow_origin.clone()]))
            .allow_methods([
                axum::http::Method::GET,
                axum::http::Method::POST,
                axum::http::Method::PUT,
                axum::http::Method::DELETE,
                axum::http::Method::OPTIONS,
            ])
            .allow_headers([
                axum::http::header::CONTENT_TYPE,
                axum::http::HeaderName::from_static("x-debug-user"),
            ])
    };
    app = app.layer(cors);

    let addr: SocketAddr = ([0, 0, 0, 0], cfg.port).into();
    info!(%addr, "api-server listening");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("bind port");
    axum::serve(listener, app).await.expect("server error");
}

fn init_tracing(cfg: &config::Config) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);
    match cfg.log_format {
        config::LogFormat::Json => {
            registry
                .with(
                    fmt::layer()
                        .json()
                        .with_target(true)
                        .with_timer(fmt::time::SystemTime)
                        .with_writer(std::io::stdout),
                )
                .init();
        }
        config::LogFormat::Pretty => {
            registry
                .with(
                    fmt::layer()
                        .pretty()
                        .with_target(true)
                        .with_writer(std::io::stdout),
                )
                .init();
        }
    }
}

// Construct a repository instance based on config and feature flags.
fn build_repo_from_env(cfg: &config::Config) -> AnyRepo {
    match cfg.storage_provider {
        #[cfg(feature = "sqlite")]
        config::StorageProvider::Sqlite => match AnyRepo::sqlite(&cfg.db_path) {
            Ok(r) => r,
            Err(e) => {
                eprintln!(
                    "failed to open sqlite store at {}: {e}",
                    cfg.db_path.display()
                );
                AnyRepo::memory()
            }
        },
        _ => AnyRepo::memory(),
    }
}

#[derive(Deserialize)]
struct ResourceReq {
    course: u64,
    name: String,
    #[serde(default)]
    intro: String,
    external_url: String,
    #[serde(default)]
    display: DisplayMode,
    #[serde(default)]
    popup_width: Option<u32>,
    #[serde(default)]
    popup_height: Option<u32>,
    #[serde(default)]
    print_heading: bool,
    #[serde(default)]
    print_intro: bool,
    /// Outgoing query-parameter name -> contextual variable name.
    #[serde(default)]
    parameters: Vec<(String, String)>,
    #[serde(default)]
    time_restrict: bool,
    #[serde(default)]
    time_open: u64,
    #[serde(default)]
    time_close: u64,
}

impl From<ResourceReq> for NewResource {
    fn from(req: ResourceReq) -> Self {
        NewResource {
            course: req.course,
            name: req.name,
            intro: req.intro,
            external_url: req.external_url,
            display: req.display,
            popup_width: req.popup_width,
            popup_height: req.popup_height,
            print_heading: req.print_heading,
            print_intro: req.print_intro,
            parameters: req.parameters,
            time_restrict: req.time_restrict,
            time_open: req.time_open,
            time_close: req.time_close,
        }
    }
}

#[derive(Deserialize)]
struct ListQuery {
    course: u64,
}

#[derive(Deserialize)]
struct ViewQuery {
    /// `?redirect=1` forces a redirect regardless of display mode.
    #[serde(default)]
    redirect: u8,
}

#[derive(Deserialize)]
struct FrameQuery {
    /// Which frame of the frameset to render; only `top` exists.
    #[serde(default)]
    frameset: String,
}

fn error_response(err: CoreError) -> (StatusCode, Json<serde_json::Value>) {
    match err {
        CoreError::InvalidUrl(ref msg) => (
            StatusCode::BAD_REQUEST,
            Json(http_common::json_error_with_message(
                "invalid_url",
                &format!("invalid url: {msg}"),
            )),
        ),
        CoreError::NotFound => (
            StatusCode::NOT_FOUND,
            Json(http_common::json_err("not_found")),
        ),
        other => {
            error!(error = %other, "request failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(http_common::json_err("internal")),
            )
        }
    }
}

/// Serialize a resource for API payloads, adding a human-readable RFC3339
/// companion next to the raw `time_modified` seconds.
fn json_resource(resource: &UrlResource) -> Json<serde_json::Value> {
    let mut value = serde_json::to_value(resource).unwrap_or_default();
    if let Some(obj) = value.as_object_mut() {
        obj.insert(
            "time_modified_rfc3339".into(),
            serde_json::Value::String(http_common::unix_secs_to_rfc3339(resource.time_modified)),
        );
    }
    Json(value)
}

async fn create_resource(
    State(state): State<AppState>,
    Json(req): Json<ResourceReq>,
) -> impl IntoResponse {
    match state.svc.add_instance(req.into()) {
        Ok(resource) => {
            info!(id = resource.id, course = resource.course, "resource created");
            (StatusCode::CREATED, json_resource(&resource))
        }
        Err(e) => error_response(e),
    }
}

async fn list_resources(
    State(state): State<AppState>,
    Query(q): Query<ListQuery>,
) -> impl IntoResponse {
    match state.svc.list_by_course(q.course) {
        Ok(resources) => {
            let body: Vec<_> = resources.iter().map(|r| json_resource(r).0).collect();
            (StatusCode::OK, Json(serde_json::Value::Array(body)))
        }
        Err(e) => error_response(e),
    }
}

async fn get_resource(State(state): State<AppState>, Path(id): Path<u64>) -> impl IntoResponse {
    match state.svc.get(id) {
        Ok(Some(resource)) => (StatusCode::OK, json_resource(&resource)),
        Ok(None) => error_response(CoreError::NotFound),
        Err(e) => error_response(e),
    }
}

async fn update_resource(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(req): Json<ResourceReq>,
) -> impl IntoResponse {
    match state.svc.update_instance(id, req.into()) {
        Ok(resource) => {
            info!(id = resource.id, "resource updated");
            (StatusCode::OK, json_resource(&resource))
        }
        Err(e) => error_response(e),
    }
}

async fn delete_resource(State(state): State<AppState>, Path(id): Path<u64>) -> impl IntoResponse {
    match state.svc.delete_instance(id) {
        Ok(()) => {
            info!(id, "resource deleted");
            StatusCode::NO_CONTENT.into_response()
        }
        Err(e) => error_response(e).into_response(),
    }
}

/// Assemble the explicit render context for one request. The host platform
/// would fill this from the session and course records; locally the
/// X-Debug-User header stands in for the logged-in user.
fn render_context(state: &AppState, headers: &HeaderMap, course: u64, now: u64) -> RenderContext {
    let user = headers
        .get("x-debug-user")
        .and_then(|v| v.to_str().ok())
        .map(|email| UserContext {
            id: 0,
            username: email.split('@').next().unwrap_or(email).to_string(),
            email: email.to_string(),
            ..Default::default()
        });

    RenderContext {
        site: SiteContext {
            name: state.cfg.site_name.clone(),
            server_url: state.cfg.site_root.clone(),
            lang: state.cfg.lang.clone(),
        },
        course: CourseContext {
            id: course,
            ..Default::default()
        },
        user,
        roles: Default::default(),
        now,
    }
}

async fn view_resource(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Query(q): Query<ViewQuery>,
    headers: HeaderMap,
) -> Response {
    let resource = match state.svc.get(id) {
        Ok(Some(r)) => r,
        Ok(None) => return error_response(CoreError::NotFound).into_response(),
        Err(e) => return error_response(e).into_response(),
    };

    let now = unix_secs(SystemTime::now());
    match view_plan(&resource, &state.cfg.site_root, &ExtensionMimeGuesser, now) {
        ViewPlan::InvalidStored => {
            Html(view::notice_page(&resource, "The stored URL of this resource is invalid.")).into_response()
        }
        ViewPlan::Closed => {
            Html(view::notice_page(&resource, "This resource is not available right now.")).into_response()
        }
        ViewPlan::Display(mode) => {
            let ctx = render_context(&state, &headers, resource.course, now);
            let values = ctx.values(&resource);
            let full = full_url(&resource, &values);

            // 'open' always redirects to the content; a redirect can also be
            // forced for completion tracking from the course page
            if q.redirect != 0 || mode == DisplayMode::Open {
                return Redirect::temporary(&raw_url(&full)).into_response();
            }

            match mode {
                DisplayMode::Embed => {
                    Html(view::embed_page(&resource, &full, &ExtensionMimeGuesser)).into_response()
                }
                DisplayMode::Frame => Html(view::frameset_page(
                    &resource,
                    &full,
                    &state.cfg.site_root,
                    state.cfg.frame_height,
                ))
                .into_response(),
                _ => Html(view::workaround_page(&resource, &full, mode)).into_response(),
            }
        }
    }
}

async fn frame_top(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Query(q): Query<FrameQuery>,
) -> Response {
    if q.frameset != "top" {
        return (
            StatusCode::BAD_REQUEST,
            Json(http_common::json_err("bad_request")),
        )
            .into_response();
    }
    match state.svc.get(id) {
        Ok(Some(resource)) => Html(view::frame_top_page(&resource)).into_response(),
        Ok(None) => error_response(CoreError::NotFound).into_response(),
        Err(e) => error_response(e).into_response(),
    }
}
