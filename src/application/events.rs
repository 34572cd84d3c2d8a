// Change notifications published by the store and the refresh scheduler
use crate::application::refresh_scheduler::RefreshState;
use crate::domain::ids::{CardId, DashboardId};
use serde::Serialize;
use tokio::sync::broadcast;

const EVENT_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum CanvasEvent {
    DashboardCreated {
        dashboard_id: DashboardId,
    },
    DashboardDeleted {
        dashboard_id: DashboardId,
    },
    SelectionChanged {
        dashboard_id: Option<DashboardId>,
    },
    CardAdded {
        dashboard_id: DashboardId,
        card_id: CardId,
    },
    CardUpdated {
        dashboard_id: DashboardId,
        card_id: CardId,
    },
    CardDeleted {
        dashboard_id: DashboardId,
        card_id: CardId,
    },
    ZoomChanged {
        dashboard_id: DashboardId,
        zoom: f64,
    },
    RefreshStateChanged {
        dashboard_id: DashboardId,
        card_id: CardId,
        state: RefreshState,
        is_loading: bool,
    },
}

impl CanvasEvent {
    pub fn name(&self) -> &'static str {
        match self {
            CanvasEvent::DashboardCreated { .. } => "dashboard_created",
            CanvasEvent::DashboardDeleted { .. } => "dashboard_deleted",
            CanvasEvent::SelectionChanged { .. } => "selection_changed",
            CanvasEvent::CardAdded { .. } => "card_added",
            CanvasEvent::CardUpdated { .. } => "card_updated",
            CanvasEvent::CardDeleted { .. } => "card_deleted",
            CanvasEvent::ZoomChanged { .. } => "zoom_changed",
            CanvasEvent::RefreshStateChanged { .. } => "refresh_state_changed",
        }
    }
}

/// Fan-out of canvas events; publishing with no subscribers is not an error.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<CanvasEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CAPACITY);
        Self { tx }
    }

    pub fn publish(&self, event: CanvasEvent) {
        tracing::trace!(event = event.name(), "publishing canvas event");
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CanvasEvent> {
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
