//! REST API layer using Axum (exposed on port 11111 by default)
//!
//! - `POST /login` issues a session token; `GET /health` is open.
//! - Everything else requires `Authorization: Bearer <token>` and is scoped to
//!   the tenant (`companyId`) carried in the token.
//! - Each request loads its own `Portfolio` from Sled; no store is shared
//!   between requests.

use axum::{
    extract::{Query, Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info};

use crate::auth::SessionAuthority;
use crate::collection::{Entity, ListFilter, StatusFilter};
use crate::display::{quality_band, ProgressBand, QualityBand};
use crate::error::{AuthError, StoreError};
use crate::models::{Claims, Percent, Project, ProjectDraft, Status, Work, WorkDraft};
use crate::portfolio::{Portfolio, PortfolioSummary};
use crate::storage::SledStorage;

/// Shared app state for REST handlers (Arc-wrapped for concurrency)
#[derive(Clone)]
pub struct AppState {
    storage: Arc<SledStorage>,
    authority: Arc<SessionAuthority>,
}

/// Raw bearer token of the current request, kept for `/session/refresh`.
#[derive(Clone)]
struct BearerToken(String);

/// Missing fields are reported as a malformed request, not a JSON error.
#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub expires_at: i64,
    pub name: String,
    pub company_id: u64,
}

#[derive(Deserialize, Default)]
pub struct ListQuery {
    pub q: Option<String>,
    pub status: Option<String>,
}

impl ListQuery {
    fn into_filter<S: Status>(self) -> Result<ListFilter<S>, ApiError> {
        let status = match self.status {
            Some(raw) => raw
                .parse::<StatusFilter<S>>()
                .map_err(|e| ApiError::BadRequest(e.to_string()))?,
            None => StatusFilter::All,
        };
        Ok(ListFilter {
            text: self.q,
            status,
        })
    }
}

/// A project plus the fields derived for display.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectView {
    #[serde(flatten)]
    pub project: Project,
    pub status_label: &'static str,
    pub display_progress: Percent,
    pub progress_band: ProgressBand,
}

impl From<&Project> for ProjectView {
    fn from(project: &Project) -> Self {
        Self {
            status_label: project.status.label(),
            display_progress: project.display_progress(),
            progress_band: project.progress_band(),
            project: project.clone(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkView {
    #[serde(flatten)]
    pub work: Work,
    pub status_label: &'static str,
    pub display_progress: Percent,
    pub progress_band: ProgressBand,
    pub quality_band: QualityBand,
}

impl From<&Work> for WorkView {
    fn from(work: &Work) -> Self {
        Self {
            status_label: work.status.label(),
            display_progress: work.display_progress(),
            progress_band: work.progress_band(),
            quality_band: quality_band(work.quality_score),
            work: work.clone(),
        }
    }
}

#[derive(Serialize)]
pub struct BoardColumn {
    pub status: &'static str,
    pub label: &'static str,
    pub works: Vec<WorkView>,
}

/// Handler errors mapped onto HTTP status codes with a JSON body
#[derive(Debug)]
pub enum ApiError {
    Auth(AuthError),
    Store(StoreError),
    BadRequest(String),
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        ApiError::Auth(err)
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Store(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Auth(err @ (AuthError::InvalidCredentials
            | AuthError::ExpiredSession
            | AuthError::InvalidSession)) => {
                (StatusCode::UNAUTHORIZED, json!({ "error": err.to_string() }))
            }
            ApiError::Auth(err @ AuthError::MalformedRequest) => {
                (StatusCode::BAD_REQUEST, json!({ "error": err.to_string() }))
            }
            ApiError::Auth(err) => {
                error!("auth failure: {}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": "internal error" }))
            }
            ApiError::Store(StoreError::Validation(err)) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                json!({ "error": "validation failed", "fields": err.fields }),
            ),
            ApiError::Store(err @ StoreError::UnknownEntity { .. }) => {
                (StatusCode::NOT_FOUND, json!({ "error": err.to_string() }))
            }
            ApiError::Store(err) => {
                error!("storage failure: {}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": "internal error" }))
            }
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, json!({ "error": message })),
        };
        (status, Json(body)).into_response()
    }
}

async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or(AuthError::InvalidSession)?
        .to_string();

    let claims = state.authority.validate(&token)?;

    req.extensions_mut().insert(claims);
    req.extensions_mut().insert(BearerToken(token));
    Ok(next.run(req).await)
}

/// Create Axum router with session and portfolio endpoints
pub fn create_router(storage: SledStorage, authority: Arc<SessionAuthority>) -> Router {
    let state = Arc::new(AppState {
        storage: Arc::new(storage),
        authority,
    });

    let auth_routes = Router::new()
        .route("/session", get(session_handler))
        .route("/session/refresh", post(refresh_handler))
        .route("/projects", get(list_projects_handler).post(create_project_handler))
        .route("/projects/summary", get(summary_handler))
        .route("/works", get(list_works_handler).post(create_work_handler))
        .route("/works/board", get(board_handler))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .route("/login", post(login_handler))
        .route("/health", get(health_handler))
        .merge(auth_routes)
        .with_state(state)
}

fn today() -> NaiveDate {
    chrono::Utc::now().date_naive()
}

async fn login_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let session = state
        .authority
        .authenticate(payload.email.as_deref(), payload.password.as_deref())?;
    Ok(Json(LoginResponse {
        expires_at: session.expires_at(),
        name: session.claims.name,
        company_id: session.claims.tenant_id,
        token: session.token,
    }))
}

async fn session_handler(Extension(claims): Extension<Claims>) -> Json<Claims> {
    Json(claims)
}

async fn refresh_handler(
    State(state): State<Arc<AppState>>,
    Extension(BearerToken(token)): Extension<BearerToken>,
) -> Result<Json<LoginResponse>, ApiError> {
    let session = state.authority.refresh(&token)?;
    Ok(Json(LoginResponse {
        expires_at: session.expires_at(),
        name: session.claims.name,
        company_id: session.claims.tenant_id,
        token: session.token,
    }))
}

async fn list_projects_handler(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<ProjectView>>, ApiError> {
    let filter = query.into_filter()?;
    let portfolio = Portfolio::load(state.storage.as_ref(), claims.tenant_id)?;
    let views = portfolio
        .projects()
        .list(&filter)
        .into_iter()
        .map(ProjectView::from)
        .collect();
    Ok(Json(views))
}

async fn create_project_handler(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Json(draft): Json<ProjectDraft>,
) -> Result<(StatusCode, Json<ProjectView>), ApiError> {
    let mut portfolio = Portfolio::load(state.storage.as_ref(), claims.tenant_id)?;
    let project = portfolio.create_project(draft, today())?;
    info!(subject = %claims.sub, id = project.id, "project created via REST");
    Ok((StatusCode::CREATED, Json(ProjectView::from(&project))))
}

async fn summary_handler(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<PortfolioSummary>, ApiError> {
    let portfolio = Portfolio::load(state.storage.as_ref(), claims.tenant_id)?;
    Ok(Json(portfolio.summary()))
}

async fn list_works_handler(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<WorkView>>, ApiError> {
    let filter = query.into_filter()?;
    let portfolio = Portfolio::load(state.storage.as_ref(), claims.tenant_id)?;
    let views = portfolio
        .works()
        .list(&filter)
        .into_iter()
        .map(WorkView::from)
        .collect();
    Ok(Json(views))
}

async fn create_work_handler(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Json(draft): Json<WorkDraft>,
) -> Result<(StatusCode, Json<WorkView>), ApiError> {
    let mut portfolio = Portfolio::load(state.storage.as_ref(), claims.tenant_id)?;
    let work = portfolio.create_work(draft, today())?;
    info!(subject = %claims.sub, id = work.id, "work created via REST");
    Ok((StatusCode::CREATED, Json(WorkView::from(&work))))
}

/// Works grouped into status columns (Kanban view)
async fn board_handler(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<BoardColumn>>, ApiError> {
    let filter = query.into_filter()?;
    let portfolio = Portfolio::load(state.storage.as_ref(), claims.tenant_id)?;
    let columns = portfolio
        .works()
        .board(&filter)
        .into_iter()
        .map(|(status, works)| BoardColumn {
            status: status.wire_name(),
            label: status.label(),
            works: works.into_iter().map(WorkView::from).collect(),
        })
        .collect();
    Ok(Json(columns))
}

async fn health_handler() -> Json<serde_json::Value> {
    Json(json!({ "success": true, "message": "obras_hub REST API healthy" }))
}
