// HTTP request handlers
use crate::application::card_generator::Generation;
use crate::application::dashboard_service::NewCard;
use crate::application::drag_controller::{DragRefusal, DragSession};
use crate::application::explore_service::ExploreCard;
use crate::application::refresh_scheduler::{CardKey, RefreshState};
use crate::domain::card::{CardPatch, ConversationHistory, IntervalSettings};
use crate::domain::geometry::{Position, ScreenDelta, Size};
use crate::domain::ids::{CardId, DashboardId};
use crate::presentation::app_state::AppState;
use crate::presentation::error::ApiError;
use crate::presentation::views::{
    card_view, dashboard_summary, dashboard_view, CardView, DashboardSummary, DashboardView,
    ZoomView,
};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures::stream::Stream;
use serde::Deserialize;
use std::convert::Infallible;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;

type ApiResult<T> = Result<Json<T>, ApiError>;

#[derive(Deserialize)]
pub struct CreateDashboardRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Deserialize)]
pub struct SelectRequest {
    pub id: Option<DashboardId>,
}

#[derive(Deserialize)]
pub struct ZoomRequest {
    pub zoom: f64,
}

#[derive(Deserialize)]
pub struct EditModeRequest {
    pub enabled: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveEditRequest {
    pub html: String,
    #[serde(default)]
    pub conversation_history: ConversationHistory,
    #[serde(default)]
    pub interval_settings: IntervalSettings,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloneRequest {
    pub target_dashboard_id: DashboardId,
}

#[derive(Deserialize)]
pub struct DeleteConfirmRequest {
    pub confirming: bool,
}

#[derive(Deserialize)]
pub struct DropRequest {
    #[serde(default)]
    pub delta: Option<ScreenDelta>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub prompt: String,
    #[serde(default)]
    pub conversation_history: ConversationHistory,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransplantRequest {
    pub dashboard_id: DashboardId,
}

fn card_key(dashboard_id: String, card_id: String) -> CardKey {
    CardKey::new(DashboardId::from(dashboard_id), CardId::from(card_id))
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// List dashboards with the selection flag
pub async fn list_dashboards(State(state): State<Arc<AppState>>) -> Json<Vec<DashboardSummary>> {
    let selected = state.dashboards.selected().map(|d| d.id);
    let summaries = state
        .dashboards
        .dashboards()
        .iter()
        .map(|d| dashboard_summary(d, selected.as_ref()))
        .collect();
    Json(summaries)
}

pub async fn create_dashboard(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateDashboardRequest>,
) -> Result<(StatusCode, Json<DashboardView>), ApiError> {
    let dashboard = state
        .dashboards
        .create_dashboard(&request.title, &request.description)
        .ok_or(ApiError::Rejected("dashboard title is required"))?;
    Ok((StatusCode::CREATED, Json(dashboard_view(&state, dashboard))))
}

pub async fn get_dashboard(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<DashboardView> {
    let dashboard = state
        .dashboards
        .dashboard(&DashboardId::from(id))
        .ok_or(ApiError::NotFound("dashboard"))?;
    Ok(Json(dashboard_view(&state, dashboard)))
}

pub async fn delete_dashboard(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<StatusCode, ApiError> {
    let id = DashboardId::from(id);
    state
        .dashboards
        .delete_dashboard(&id)
        .ok_or(ApiError::NotFound("dashboard"))?;
    state.drag.set_edit_mode(&id, false);
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_selected(State(state): State<Arc<AppState>>) -> Json<Option<DashboardView>> {
    Json(state.dashboards.selected().map(|d| dashboard_view(&state, d)))
}

pub async fn select_dashboard(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SelectRequest>,
) -> Result<Json<Option<DashboardView>>, ApiError> {
    if !state.dashboards.select_dashboard(request.id.as_ref()) {
        return Err(ApiError::NotFound("dashboard"));
    }
    Ok(Json(state.dashboards.selected().map(|d| dashboard_view(&state, d))))
}

pub async fn get_zoom(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Json<ZoomView> {
    Json(ZoomView::new(state.dashboards.zoom(&DashboardId::from(id))))
}

pub async fn set_zoom(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
    Json(request): Json<ZoomRequest>,
) -> ApiResult<ZoomView> {
    let zoom = state
        .dashboards
        .set_zoom(&DashboardId::from(id), request.zoom)
        .ok_or(ApiError::NotFound("dashboard"))?;
    Ok(Json(ZoomView::new(zoom)))
}

pub async fn zoom_in(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<ZoomView> {
    let zoom = state
        .dashboards
        .zoom_in(&DashboardId::from(id))
        .ok_or(ApiError::NotFound("dashboard"))?;
    Ok(Json(ZoomView::new(zoom)))
}

pub async fn zoom_out(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<ZoomView> {
    let zoom = state
        .dashboards
        .zoom_out(&DashboardId::from(id))
        .ok_or(ApiError::NotFound("dashboard"))?;
    Ok(Json(ZoomView::new(zoom)))
}

pub async fn set_edit_mode(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
    Json(request): Json<EditModeRequest>,
) -> ApiResult<DashboardView> {
    let id = DashboardId::from(id);
    let dashboard = state
        .dashboards
        .dashboard(&id)
        .ok_or(ApiError::NotFound("dashboard"))?;
    state.drag.set_edit_mode(&id, request.enabled);
    Ok(Json(dashboard_view(&state, dashboard)))
}

pub async fn add_card(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
    Json(request): Json<NewCard>,
) -> Result<(StatusCode, Json<CardView>), ApiError> {
    let id = DashboardId::from(id);
    if state.dashboards.dashboard(&id).is_none() {
        return Err(ApiError::NotFound("dashboard"));
    }
    let card = state
        .dashboards
        .add_generated_card(&id, request)
        .ok_or(ApiError::Rejected("card needs html and the dashboard must have room"))?;
    Ok((StatusCode::CREATED, Json(card_view(&state, &id, card))))
}

pub async fn update_card(
    Path((id, card_id)): Path<(String, String)>,
    State(state): State<Arc<AppState>>,
    Json(patch): Json<CardPatch>,
) -> ApiResult<CardView> {
    let key = card_key(id, card_id);
    let card = state
        .dashboards
        .update_card(&key.dashboard_id, &key.card_id, patch)
        .ok_or(ApiError::NotFound("card"))?;
    Ok(Json(card_view(&state, &key.dashboard_id, card)))
}

pub async fn save_card_edit(
    Path((id, card_id)): Path<(String, String)>,
    State(state): State<Arc<AppState>>,
    Json(request): Json<SaveEditRequest>,
) -> ApiResult<CardView> {
    let key = card_key(id, card_id);
    let card = state
        .dashboards
        .save_edit(
            &key.dashboard_id,
            &key.card_id,
            request.html,
            request.conversation_history,
            request.interval_settings,
        )
        .ok_or(ApiError::NotFound("card"))?;
    Ok(Json(card_view(&state, &key.dashboard_id, card)))
}

pub async fn delete_card(
    Path((id, card_id)): Path<(String, String)>,
    State(state): State<Arc<AppState>>,
) -> Result<StatusCode, ApiError> {
    let key = card_key(id, card_id);
    state
        .dashboards
        .delete_card(&key.dashboard_id, &key.card_id)
        .ok_or(ApiError::NotFound("card"))?;
    state.drag.set_confirming_delete(&key, false);
    Ok(StatusCode::NO_CONTENT)
}

pub async fn clone_card(
    Path((id, card_id)): Path<(String, String)>,
    State(state): State<Arc<AppState>>,
    Json(request): Json<CloneRequest>,
) -> Result<(StatusCode, Json<CardView>), ApiError> {
    let key = card_key(id, card_id);
    let copy = state
        .dashboards
        .clone_card(&key.dashboard_id, &request.target_dashboard_id, &key.card_id)
        .ok_or(ApiError::Rejected("card or target dashboard unavailable"))?;
    Ok((
        StatusCode::CREATED,
        Json(card_view(&state, &request.target_dashboard_id, copy)),
    ))
}

pub async fn focus_card(
    Path((id, card_id)): Path<(String, String)>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<CardView> {
    let key = card_key(id, card_id);
    state.drag.focus(&key).ok_or(ApiError::NotFound("card"))?;
    let card = state
        .dashboards
        .store()
        .card(&key.dashboard_id, &key.card_id)
        .ok_or(ApiError::NotFound("card"))?;
    Ok(Json(card_view(&state, &key.dashboard_id, card)))
}

pub async fn confirm_delete(
    Path((id, card_id)): Path<(String, String)>,
    State(state): State<Arc<AppState>>,
    Json(request): Json<DeleteConfirmRequest>,
) -> StatusCode {
    let key = card_key(id, card_id);
    state.drag.set_confirming_delete(&key, request.confirming);
    StatusCode::NO_CONTENT
}

pub async fn begin_drag(
    Path((id, card_id)): Path<(String, String)>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<DragSession> {
    let session = state.drag.begin_drag(&card_key(id, card_id))?;
    Ok(Json(session))
}

pub async fn preview_drag(
    State(state): State<Arc<AppState>>,
    Json(delta): Json<ScreenDelta>,
) -> ApiResult<Position> {
    let position = state
        .drag
        .preview(delta)
        .ok_or(ApiError::NotFound("drag session"))?;
    Ok(Json(position))
}

/// Commits the active drag. A drop without delta answers 204 and changes nothing.
pub async fn drop_card(
    State(state): State<Arc<AppState>>,
    Json(request): Json<DropRequest>,
) -> Result<Response, ApiError> {
    let session = state.drag.active().ok_or(ApiError::NotFound("drag session"))?;
    match state.drag.drop_active(request.delta) {
        Some(card) => Ok(Json(card_view(&state, &session.dashboard_id, card)).into_response()),
        None => Ok(StatusCode::NO_CONTENT.into_response()),
    }
}

pub async fn cancel_drag(State(state): State<Arc<AppState>>) -> StatusCode {
    state.drag.cancel_drag();
    StatusCode::NO_CONTENT
}

pub async fn resize_card(
    Path((id, card_id)): Path<(String, String)>,
    State(state): State<Arc<AppState>>,
    Json(size): Json<Size>,
) -> ApiResult<CardView> {
    let key = card_key(id, card_id);
    if !state.drag.is_edit_mode(&key.dashboard_id) {
        return Err(ApiError::Drag(DragRefusal::NotEditing));
    }
    let card = state
        .drag
        .resize(&key, size)
        .ok_or(ApiError::NotFound("card"))?;
    Ok(Json(card_view(&state, &key.dashboard_id, card)))
}

pub async fn card_status(
    Path((id, card_id)): Path<(String, String)>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<CardView> {
    let key = card_key(id, card_id);
    let card = state
        .dashboards
        .store()
        .card(&key.dashboard_id, &key.card_id)
        .ok_or(ApiError::NotFound("card"))?;
    Ok(Json(card_view(&state, &key.dashboard_id, card)))
}

/// Manual build for the card editor; refusals come back as content-less results
pub async fn generate_card(
    State(state): State<Arc<AppState>>,
    Json(request): Json<GenerateRequest>,
) -> ApiResult<Generation> {
    if request.prompt.trim().is_empty() {
        return Err(ApiError::Rejected("prompt is required"));
    }
    let generation = state
        .dashboards
        .build(&request.prompt, &request.conversation_history)
        .await
        .map_err(|e| ApiError::Generation(e.user_message()))?;
    Ok(Json(generation))
}

pub async fn list_explore_cards(State(state): State<Arc<AppState>>) -> Json<Vec<ExploreCard>> {
    Json(state.explore.cards().to_vec())
}

pub async fn transplant_explore_card(
    Path(card_id): Path<String>,
    State(state): State<Arc<AppState>>,
    Json(request): Json<TransplantRequest>,
) -> Result<(StatusCode, Json<CardView>), ApiError> {
    if state.explore.card(&card_id).is_none() {
        return Err(ApiError::NotFound("explore card"));
    }
    let card = state
        .explore
        .transplant(&card_id, &request.dashboard_id)
        .ok_or(ApiError::Rejected("target dashboard unavailable or full"))?;
    Ok((
        StatusCode::CREATED,
        Json(card_view(&state, &request.dashboard_id, card)),
    ))
}

/// Server-sent stream of canvas changes
pub async fn stream_events(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let mut rx = state.dashboards.store().events().subscribe();

    let stream = async_stream::stream! {
        loop {
            match rx.recv().await {
                Ok(event) => match Event::default().event(event.name()).json_data(&event) {
                    Ok(sse_event) => yield Ok::<Event, Infallible>(sse_event),
                    Err(e) => tracing::warn!(error = %e, "Failed to encode canvas event"),
                },
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Event stream subscriber lagged");
                }
                Err(RecvError::Closed) => break,
            }
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// Server-sent stream of one card's refresh state, starting with the current value.
/// Ends when the card is deleted.
pub async fn stream_card_loading(
    Path((id, card_id)): Path<(String, String)>,
    State(state): State<Arc<AppState>>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let key = card_key(id, card_id);
    if state
        .dashboards
        .store()
        .card(&key.dashboard_id, &key.card_id)
        .is_none()
    {
        return Err(ApiError::NotFound("card"));
    }
    let mut rx = state.dashboards.scheduler().watch(&key);

    let stream = async_stream::stream! {
        loop {
            let current: RefreshState = *rx.borrow_and_update();
            let payload = serde_json::json!({
                "state": current,
                "isLoading": current.is_loading(),
            });
            match Event::default().event("refresh_state").json_data(&payload) {
                Ok(sse_event) => yield Ok::<Event, Infallible>(sse_event),
                Err(e) => tracing::warn!(error = %e, "Failed to encode refresh state"),
            }
            if rx.changed().await.is_err() {
                break;
            }
        }
    };

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
