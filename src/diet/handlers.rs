use axum::{
    extract::{DefaultBodyLimit, Path, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    routing::{delete, get, post, put},
    Json, Router,
};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use super::{
    dto::{SessionView, SubmitRequest, TemplateRequest, ToggleResponse},
    model::Template,
    payload::DietPayload,
    selection::SelectionError,
    services::{submit_selection, SubmitError},
    sessions::SessionError,
};
use crate::state::AppState;

type ApiError = (StatusCode, String);

pub fn read_routes() -> Router<AppState> {
    Router::new().route("/diet/sessions/:id", get(get_session))
}

pub fn write_routes(max_body_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/diet/sessions", post(create_session))
        .route("/diet/sessions/:id", delete(delete_session))
        .route("/diet/sessions/:id/template", put(replace_template))
        .route(
            "/diet/sessions/:id/categories/:category_id/toggle",
            post(toggle_category),
        )
        .route(
            "/diet/sessions/:id/categories/:category_id/meals/:meal_id/toggle",
            post(toggle_meal),
        )
        .route("/diet/sessions/:id/clear", post(clear_selection))
        .route("/diet/sessions/:id/submit", post(submit))
        .layer(DefaultBodyLimit::max(max_body_bytes))
}

fn session_not_found(id: Uuid) -> ApiError {
    warn!(session_id = %id, "session not found");
    (StatusCode::NOT_FOUND, "Session not found".into())
}

fn selection_error(e: SelectionError) -> ApiError {
    (StatusCode::NOT_FOUND, e.to_string())
}

/// POST /diet/sessions { categories: [...] }
#[instrument(skip(state, body))]
pub async fn create_session(
    State(state): State<AppState>,
    Json(body): Json<TemplateRequest>,
) -> Result<(StatusCode, HeaderMap, Json<SessionView>), ApiError> {
    let (id, _) = state
        .sessions
        .create(Template::new(body.categories))
        .await
        .map_err(|e| match e {
            SessionError::Full(_) => (StatusCode::SERVICE_UNAVAILABLE, e.to_string()),
        })?;

    let view = state
        .sessions
        .read_session(id, |s| SessionView::from(s))
        .await
        .ok_or_else(|| {
            error!(session_id = %id, "session vanished right after creation");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "session not stored".to_string(),
            )
        })?;

    let mut headers = HeaderMap::new();
    let location = HeaderValue::from_str(&format!("/api/v1/diet/sessions/{id}"))
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    headers.insert(header::LOCATION, location);

    Ok((StatusCode::CREATED, headers, Json(view)))
}

#[instrument(skip(state))]
pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, ApiError> {
    state
        .sessions
        .read_session(id, |s| SessionView::from(s))
        .await
        .map(Json)
        .ok_or_else(|| session_not_found(id))
}

#[instrument(skip(state))]
pub async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    if state.sessions.remove(id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(session_not_found(id))
    }
}

/// PUT /diet/sessions/:id/template: the re-fetched template replaces the old one.
#[instrument(skip(state, body))]
pub async fn replace_template(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<TemplateRequest>,
) -> Result<Json<SessionView>, ApiError> {
    state
        .sessions
        .with_session(id, |s| {
            s.engine.replace_template(Template::new(body.categories));
            SessionView::from(&*s)
        })
        .await
        .map(Json)
        .ok_or_else(|| session_not_found(id))
}

#[instrument(skip(state))]
pub async fn toggle_category(
    State(state): State<AppState>,
    Path((id, category_id)): Path<(Uuid, String)>,
) -> Result<Json<ToggleResponse>, ApiError> {
    let outcome = state
        .sessions
        .with_session(id, |s| -> Result<ToggleResponse, SelectionError> {
            let selected = s.engine.toggle_category(&category_id)?;
            Ok(ToggleResponse {
                category_id: category_id.clone(),
                meal_id: None,
                selected,
                category_selected: selected,
                selected_count: s.engine.selected_count(),
            })
        })
        .await
        .ok_or_else(|| session_not_found(id))?;

    outcome.map(Json).map_err(selection_error)
}

#[instrument(skip(state))]
pub async fn toggle_meal(
    State(state): State<AppState>,
    Path((id, category_id, meal_id)): Path<(Uuid, String, String)>,
) -> Result<Json<ToggleResponse>, ApiError> {
    let outcome = state
        .sessions
        .with_session(id, |s| -> Result<ToggleResponse, SelectionError> {
            let selected = s.engine.toggle_meal(&category_id, &meal_id)?;
            let category_selected = s
                .engine
                .template()
                .category(&category_id)
                .map(|c| c.selected)
                .unwrap_or(false);
            Ok(ToggleResponse {
                category_id: category_id.clone(),
                meal_id: Some(meal_id.clone()),
                selected,
                category_selected,
                selected_count: s.engine.selected_count(),
            })
        })
        .await
        .ok_or_else(|| session_not_found(id))?;

    outcome.map(Json).map_err(selection_error)
}

#[instrument(skip(state))]
pub async fn clear_selection(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, ApiError> {
    state
        .sessions
        .with_session(id, |s| {
            s.engine.clear();
            SessionView::from(&*s)
        })
        .await
        .map(Json)
        .ok_or_else(|| session_not_found(id))
}

/// POST /diet/sessions/:id/submit { client_id, date, gym_id? }
///
/// Returns the body to send to the diet-logging API; the session is kept so the
/// caller can retry if that call fails.
#[instrument(skip(state, body))]
pub async fn submit(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<SubmitRequest>,
) -> Result<Json<DietPayload>, ApiError> {
    let outcome = state
        .sessions
        .with_session(id, |s| submit_selection(&s.engine, &body))
        .await
        .ok_or_else(|| session_not_found(id))?;

    let payload = outcome.map_err(|e: SubmitError| (StatusCode::BAD_REQUEST, e.to_string()))?;
    info!(session_id = %id, categories = payload.diet_data.len(), "submission ready");
    Ok(Json(payload))
}
