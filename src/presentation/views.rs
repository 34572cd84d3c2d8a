// Response shapes handed to the rendering layer
use crate::application::refresh_scheduler::{CardKey, RefreshState};
use crate::domain::card::Card;
use crate::domain::dashboard::{Dashboard, MAX_CARDS_PER_DASHBOARD};
use crate::domain::geometry::zoom_to_display_percent;
use crate::domain::ids::DashboardId;
use crate::presentation::app_state::AppState;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Everything a card needs to render: stored fields plus live stacking and loading state.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CardView {
    #[serde(flatten)]
    pub card: Card,
    pub stacking_order: u64,
    pub refresh_state: RefreshState,
    pub is_loading: bool,
    pub is_confirming_delete: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardView {
    pub id: DashboardId,
    pub title: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub zoom: f64,
    pub display_percent: i32,
    pub is_edit_mode: bool,
    pub can_add_card: bool,
    pub cards: Vec<CardView>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub id: DashboardId,
    pub title: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub card_count: usize,
    pub is_selected: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoomView {
    pub zoom: f64,
    pub display_percent: i32,
}

impl ZoomView {
    pub fn new(zoom: f64) -> Self {
        Self {
            zoom,
            display_percent: zoom_to_display_percent(zoom),
        }
    }
}

pub fn card_view(state: &AppState, dashboard_id: &DashboardId, card: Card) -> CardView {
    let key = CardKey::new(dashboard_id.clone(), card.id.clone());
    let refresh_state = state.dashboards.refresh_state(dashboard_id, &card.id);
    CardView {
        stacking_order: state.drag.stacking_order(&key, card.z_index),
        refresh_state,
        is_loading: refresh_state.is_loading(),
        is_confirming_delete: state.drag.is_confirming_delete(&key),
        card,
    }
}

pub fn dashboard_view(state: &AppState, dashboard: Dashboard) -> DashboardView {
    let can_add_card = dashboard.cards.len() < MAX_CARDS_PER_DASHBOARD;
    let is_edit_mode = state.drag.is_edit_mode(&dashboard.id);
    let cards = dashboard
        .cards
        .into_iter()
        .map(|card| card_view(state, &dashboard.id, card))
        .collect();

    DashboardView {
        display_percent: zoom_to_display_percent(dashboard.zoom),
        zoom: dashboard.zoom,
        id: dashboard.id,
        title: dashboard.title,
        description: dashboard.description,
        created_at: dashboard.created_at,
        is_edit_mode,
        can_add_card,
        cards,
    }
}

pub fn dashboard_summary(dashboard: &Dashboard, selected: Option<&DashboardId>) -> DashboardSummary {
    DashboardSummary {
        id: dashboard.id.clone(),
        title: dashboard.title.clone(),
        description: dashboard.description.clone(),
        created_at: dashboard.created_at,
        card_count: dashboard.cards.len(),
        is_selected: selected == Some(&dashboard.id),
    }
}
