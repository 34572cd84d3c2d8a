// Dashboard store - single source of truth for dashboards, cards, zoom and selection
use crate::application::events::{CanvasEvent, EventBus};
use crate::domain::card::{Card, CardPatch};
use crate::domain::dashboard::Dashboard;
use crate::domain::geometry::DEFAULT_ZOOM;
use crate::domain::ids::{CardId, DashboardId};
use parking_lot::RwLock;
use std::sync::Arc;

#[derive(Debug, Default)]
struct StoreState {
    dashboards: Vec<Dashboard>,
    /// Selection is stored as an id and resolved on every read.
    selected: Option<DashboardId>,
}

impl StoreState {
    fn dashboard(&self, id: &DashboardId) -> Option<&Dashboard> {
        self.dashboards.iter().find(|d| &d.id == id)
    }

    fn dashboard_mut(&mut self, id: &DashboardId) -> Option<&mut Dashboard> {
        self.dashboards.iter_mut().find(|d| &d.id == id)
    }
}

/// Result of applying an interval refresh against a baseline revision.
#[derive(Debug, Clone, PartialEq)]
pub enum RefreshOutcome {
    Applied(Card),
    /// The card's content changed after the refresh started; the newer content is kept.
    Stale { baseline: u64, current: u64 },
    NotFound,
}

/// Every mutation goes through these methods and is applied under one write lock.
/// Reads hand out snapshots, never references into the store.
#[derive(Clone)]
pub struct DashboardStore {
    state: Arc<RwLock<StoreState>>,
    events: EventBus,
}

impl DashboardStore {
    pub fn new(events: EventBus) -> Self {
        Self {
            state: Arc::new(RwLock::new(StoreState::default())),
            events,
        }
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn dashboards(&self) -> Vec<Dashboard> {
        self.state.read().dashboards.clone()
    }

    pub fn dashboard(&self, id: &DashboardId) -> Option<Dashboard> {
        self.state.read().dashboard(id).cloned()
    }

    pub fn selected(&self) -> Option<Dashboard> {
        let state = self.state.read();
        state
            .selected
            .as_ref()
            .and_then(|id| state.dashboard(id))
            .cloned()
    }

    pub fn card(&self, dashboard_id: &DashboardId, card_id: &CardId) -> Option<Card> {
        self.state
            .read()
            .dashboard(dashboard_id)
            .and_then(|d| d.card(card_id))
            .cloned()
    }

    /// Creates and selects a new dashboard. Blank titles are ignored.
    pub fn create_dashboard(&self, title: &str, description: &str) -> Option<Dashboard> {
        if title.trim().is_empty() {
            tracing::debug!("Ignoring dashboard with blank title");
            return None;
        }

        let dashboard = Dashboard::new(title.trim().to_string(), description.to_string());
        {
            let mut state = self.state.write();
            state.dashboards.push(dashboard.clone());
            state.selected = Some(dashboard.id.clone());
        }

        tracing::info!(dashboard_id = %dashboard.id, title = %dashboard.title, "Created dashboard");
        self.events.publish(CanvasEvent::DashboardCreated {
            dashboard_id: dashboard.id.clone(),
        });
        self.events.publish(CanvasEvent::SelectionChanged {
            dashboard_id: Some(dashboard.id.clone()),
        });
        Some(dashboard)
    }

    /// Removes a dashboard. Deleting the selected one leaves nothing selected.
    pub fn delete_dashboard(&self, id: &DashboardId) -> Option<Dashboard> {
        let (removed, cleared_selection) = {
            let mut state = self.state.write();
            let index = state.dashboards.iter().position(|d| &d.id == id)?;
            let removed = state.dashboards.remove(index);
            let cleared = state.selected.as_ref() == Some(id);
            if cleared {
                state.selected = None;
            }
            (removed, cleared)
        };

        tracing::info!(dashboard_id = %id, cards = removed.cards.len(), "Deleted dashboard");
        self.events.publish(CanvasEvent::DashboardDeleted {
            dashboard_id: id.clone(),
        });
        if cleared_selection {
            self.events
                .publish(CanvasEvent::SelectionChanged { dashboard_id: None });
        }
        Some(removed)
    }

    /// Selects a dashboard, or clears the selection with `None`.
    /// Unknown ids leave the current selection in place.
    pub fn select_dashboard(&self, id: Option<&DashboardId>) -> bool {
        {
            let mut state = self.state.write();
            match id {
                Some(id) if state.dashboard(id).is_none() => return false,
                Some(id) => state.selected = Some(id.clone()),
                None => state.selected = None,
            }
        }

        self.events.publish(CanvasEvent::SelectionChanged {
            dashboard_id: id.cloned(),
        });
        true
    }

    /// Appends a card. Unknown dashboards and full dashboards are ignored.
    pub fn add_card(&self, dashboard_id: &DashboardId, card: Card) -> Option<Card> {
        let card_id = card.id.clone();
        {
            let mut state = self.state.write();
            let dashboard = state.dashboard_mut(dashboard_id)?;
            if !dashboard.push_card(card.clone()) {
                tracing::debug!(dashboard_id = %dashboard_id, "Dashboard is full, card not added");
                return None;
            }
        }

        self.events.publish(CanvasEvent::CardAdded {
            dashboard_id: dashboard_id.clone(),
            card_id,
        });
        Some(card)
    }

    pub fn update_card(
        &self,
        dashboard_id: &DashboardId,
        card_id: &CardId,
        patch: CardPatch,
    ) -> Option<Card> {
        let updated = {
            let mut state = self.state.write();
            let card = state.dashboard_mut(dashboard_id)?.card_mut(card_id)?;
            card.apply(patch);
            card.clone()
        };

        self.events.publish(CanvasEvent::CardUpdated {
            dashboard_id: dashboard_id.clone(),
            card_id: card_id.clone(),
        });
        Some(updated)
    }

    /// Removes a card. Its refresh timer must already be stopped.
    pub fn delete_card(&self, dashboard_id: &DashboardId, card_id: &CardId) -> Option<Card> {
        let removed = {
            let mut state = self.state.write();
            state.dashboard_mut(dashboard_id)?.remove_card(card_id)?
        };

        self.events.publish(CanvasEvent::CardDeleted {
            dashboard_id: dashboard_id.clone(),
            card_id: card_id.clone(),
        });
        Some(removed)
    }

    /// Copies a card into `target_id` with a new id at the spawn position.
    /// The source card is left untouched.
    pub fn clone_card(
        &self,
        source_id: &DashboardId,
        target_id: &DashboardId,
        card_id: &CardId,
    ) -> Option<Card> {
        let copy = {
            let mut state = self.state.write();
            let copy = state.dashboard(source_id)?.card(card_id)?.duplicate();
            let target = state.dashboard_mut(target_id)?;
            if !target.push_card(copy.clone()) {
                tracing::debug!(dashboard_id = %target_id, "Clone target is full");
                return None;
            }
            copy
        };

        tracing::info!(
            source = %source_id,
            target = %target_id,
            card_id = %card_id,
            clone_id = %copy.id,
            "Cloned card"
        );
        self.events.publish(CanvasEvent::CardAdded {
            dashboard_id: target_id.clone(),
            card_id: copy.id.clone(),
        });
        Some(copy)
    }

    /// Stores a clamped zoom factor, returning the value actually kept.
    pub fn set_zoom(&self, dashboard_id: &DashboardId, zoom: f64) -> Option<f64> {
        let zoom = {
            let mut state = self.state.write();
            let dashboard = state.dashboard_mut(dashboard_id)?;
            dashboard.set_zoom(zoom);
            dashboard.zoom
        };

        self.events.publish(CanvasEvent::ZoomChanged {
            dashboard_id: dashboard_id.clone(),
            zoom,
        });
        Some(zoom)
    }

    pub fn zoom(&self, dashboard_id: &DashboardId) -> f64 {
        self.state
            .read()
            .dashboard(dashboard_id)
            .map(|d| d.zoom)
            .unwrap_or(DEFAULT_ZOOM)
    }

    /// Next stacking value the dashboard will hand out; 0 for unknown dashboards.
    pub fn focus_clock(&self, dashboard_id: &DashboardId) -> u64 {
        self.state
            .read()
            .dashboard(dashboard_id)
            .map(|d| d.focus_clock)
            .unwrap_or(0)
    }

    /// Advances the dashboard's focus clock and stamps the card with it.
    pub fn bring_to_front(&self, dashboard_id: &DashboardId, card_id: &CardId) -> Option<u64> {
        let z_index = self
            .state
            .write()
            .dashboard_mut(dashboard_id)?
            .bring_to_front(card_id)?;

        self.events.publish(CanvasEvent::CardUpdated {
            dashboard_id: dashboard_id.clone(),
            card_id: card_id.clone(),
        });
        Some(z_index)
    }

    /// Applies an interval refresh result only if the card's content revision
    /// still matches `baseline`; interval settings are preserved.
    pub fn apply_refresh(
        &self,
        dashboard_id: &DashboardId,
        card_id: &CardId,
        baseline: u64,
        prompt: &str,
        html: String,
    ) -> RefreshOutcome {
        let updated = {
            let mut state = self.state.write();
            let Some(card) = state
                .dashboard_mut(dashboard_id)
                .and_then(|d| d.card_mut(card_id))
            else {
                return RefreshOutcome::NotFound;
            };
            if card.revision != baseline {
                return RefreshOutcome::Stale {
                    baseline,
                    current: card.revision,
                };
            }

            let history = card.conversation_history.followed_by(prompt, &html);
            card.apply(CardPatch {
                html: Some(html),
                conversation_history: Some(history),
                ..CardPatch::default()
            });
            card.clone()
        };

        self.events.publish(CanvasEvent::CardUpdated {
            dashboard_id: dashboard_id.clone(),
            card_id: card_id.clone(),
        });
        RefreshOutcome::Applied(updated)
    }
}
