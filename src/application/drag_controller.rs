// Drag/drop, resize and stacking for cards on the canvas
use crate::application::dashboard_store::DashboardStore;
use crate::application::refresh_scheduler::CardKey;
use crate::domain::card::{Card, CardPatch};
use crate::domain::geometry::{Position, ScreenDelta, Size};
use crate::domain::ids::{CardId, DashboardId};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;

/// Lowest stacking value reported for the card being dragged.
pub const DRAG_LAYER_Z: u64 = 1000;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DragSession {
    pub dashboard_id: DashboardId,
    pub card_id: CardId,
    pub origin: Position,
    pub z_index: u64,
}

impl DragSession {
    fn key(&self) -> CardKey {
        CardKey::new(self.dashboard_id.clone(), self.card_id.clone())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DragRefusal {
    #[error("dashboard is not in edit mode")]
    NotEditing,
    #[error("card is awaiting delete confirmation")]
    ConfirmingDelete,
    #[error("card not found")]
    UnknownCard,
}

#[derive(Debug, Default)]
struct ControllerState {
    editing: HashSet<DashboardId>,
    confirming_delete: HashSet<CardKey>,
    active: Option<DragSession>,
}

#[derive(Clone)]
pub struct DragController {
    store: DashboardStore,
    state: Arc<Mutex<ControllerState>>,
}

impl DragController {
    pub fn new(store: DashboardStore) -> Self {
        Self {
            store,
            state: Arc::new(Mutex::new(ControllerState::default())),
        }
    }

    /// Leaving edit mode abandons any drag and delete confirmation on that dashboard.
    pub fn set_edit_mode(&self, dashboard_id: &DashboardId, enabled: bool) {
        let mut state = self.state.lock();
        if enabled {
            state.editing.insert(dashboard_id.clone());
            return;
        }

        state.editing.remove(dashboard_id);
        state
            .confirming_delete
            .retain(|key| &key.dashboard_id != dashboard_id);
        if state
            .active
            .as_ref()
            .is_some_and(|s| &s.dashboard_id == dashboard_id)
        {
            state.active = None;
        }
    }

    pub fn is_edit_mode(&self, dashboard_id: &DashboardId) -> bool {
        self.state.lock().editing.contains(dashboard_id)
    }

    /// Marks a card as showing its delete confirmation, which blocks dragging it.
    pub fn set_confirming_delete(&self, key: &CardKey, confirming: bool) -> bool {
        let mut state = self.state.lock();
        if !confirming {
            return state.confirming_delete.remove(key);
        }
        if !state.editing.contains(&key.dashboard_id) {
            return false;
        }
        state.confirming_delete.insert(key.clone())
    }

    pub fn is_confirming_delete(&self, key: &CardKey) -> bool {
        self.state.lock().confirming_delete.contains(key)
    }

    /// Starts dragging a card and brings it to the front.
    pub fn begin_drag(&self, key: &CardKey) -> Result<DragSession, DragRefusal> {
        {
            let state = self.state.lock();
            if !state.editing.contains(&key.dashboard_id) {
                return Err(DragRefusal::NotEditing);
            }
            if state.confirming_delete.contains(key) {
                return Err(DragRefusal::ConfirmingDelete);
            }
        }

        let card = self
            .store
            .card(&key.dashboard_id, &key.card_id)
            .ok_or(DragRefusal::UnknownCard)?;
        let z_index = self
            .store
            .bring_to_front(&key.dashboard_id, &key.card_id)
            .ok_or(DragRefusal::UnknownCard)?;

        let session = DragSession {
            dashboard_id: key.dashboard_id.clone(),
            card_id: key.card_id.clone(),
            origin: card.position(),
            z_index,
        };
        self.state.lock().active = Some(session.clone());
        tracing::debug!(card_id = %key.card_id, "Drag started");
        Ok(session)
    }

    pub fn active(&self) -> Option<DragSession> {
        self.state.lock().active.clone()
    }

    /// Where the dragged card would land for the given pointer delta.
    pub fn preview(&self, delta: ScreenDelta) -> Option<Position> {
        let session = self.active()?;
        let zoom = self.store.zoom(&session.dashboard_id);
        Some(session.origin.offset_by(delta, zoom))
    }

    /// Ends the drag. A drop without a measurable delta leaves the card where it was.
    pub fn drop_active(&self, delta: Option<ScreenDelta>) -> Option<Card> {
        let session = self.state.lock().active.take()?;
        let Some(delta) = delta else {
            tracing::debug!(card_id = %session.card_id, "Drop without delta ignored");
            return None;
        };

        // Measured from the stored position in case it moved since the drag began.
        let current = self.store.card(&session.dashboard_id, &session.card_id)?;
        let zoom = self.store.zoom(&session.dashboard_id);
        let target = current.position().offset_by(delta, zoom);

        self.store.update_card(
            &session.dashboard_id,
            &session.card_id,
            CardPatch::position(target),
        )
    }

    pub fn cancel_drag(&self) -> Option<DragSession> {
        self.state.lock().active.take()
    }

    /// Stacking value to render with. The dragged card reports a value past the
    /// dashboard's focus clock, so no stored `z_index` can reach it.
    pub fn stacking_order(&self, key: &CardKey, stored_z_index: u64) -> u64 {
        let dragging = matches!(&self.state.lock().active, Some(session) if &session.key() == key);
        if !dragging {
            return stored_z_index;
        }
        self.store.focus_clock(&key.dashboard_id).max(DRAG_LAYER_Z)
    }

    pub fn focus(&self, key: &CardKey) -> Option<u64> {
        self.store.bring_to_front(&key.dashboard_id, &key.card_id)
    }

    /// Commits a resize. Handles only exist in edit mode, so other calls are ignored.
    /// A resize that lands on the current size changes nothing.
    pub fn resize(&self, key: &CardKey, size: Size) -> Option<Card> {
        if !self.is_edit_mode(&key.dashboard_id) {
            return None;
        }
        let current = self.store.card(&key.dashboard_id, &key.card_id)?;
        if current.size() == size.clamped() {
            return Some(current);
        }
        self.store
            .update_card(&key.dashboard_id, &key.card_id, CardPatch::size(size))
    }
}
