// Dashboard service - Use cases that keep card timers in step with the store
use crate::application::card_generator::{CardGenerator, Generation, GenerationError};
use crate::application::dashboard_store::DashboardStore;
use crate::application::refresh_scheduler::{CardKey, RefreshScheduler, RefreshState};
use crate::domain::card::{Card, CardPatch, ConversationHistory, IntervalSettings};
use crate::domain::dashboard::Dashboard;
use crate::domain::geometry::{self, Position, Size};
use crate::domain::ids::{CardId, DashboardId};
use serde::Deserialize;
use std::sync::Arc;

pub const DEFAULT_CARD_SIZE: Size = Size {
    width: 600.0,
    height: 380.0,
};

/// A freshly built card on its way onto a dashboard.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCard {
    pub html: String,
    #[serde(default)]
    pub conversation_history: ConversationHistory,
    #[serde(default)]
    pub interval_settings: IntervalSettings,
    pub position: Option<Position>,
    pub size: Option<Size>,
}

#[derive(Clone)]
pub struct DashboardService {
    store: DashboardStore,
    scheduler: RefreshScheduler,
    generator: Arc<dyn CardGenerator>,
}

impl DashboardService {
    pub fn new(
        store: DashboardStore,
        scheduler: RefreshScheduler,
        generator: Arc<dyn CardGenerator>,
    ) -> Self {
        Self {
            store,
            scheduler,
            generator,
        }
    }

    pub fn store(&self) -> &DashboardStore {
        &self.store
    }

    pub fn scheduler(&self) -> &RefreshScheduler {
        &self.scheduler
    }

    pub fn dashboards(&self) -> Vec<Dashboard> {
        self.store.dashboards()
    }

    pub fn dashboard(&self, id: &DashboardId) -> Option<Dashboard> {
        self.store.dashboard(id)
    }

    pub fn selected(&self) -> Option<Dashboard> {
        self.store.selected()
    }

    pub fn create_dashboard(&self, title: &str, description: &str) -> Option<Dashboard> {
        self.store.create_dashboard(title, description)
    }

    pub fn select_dashboard(&self, id: Option<&DashboardId>) -> bool {
        self.store.select_dashboard(id)
    }

    /// Stops every card timer on the dashboard before removing it.
    pub fn delete_dashboard(&self, id: &DashboardId) -> Option<Dashboard> {
        self.scheduler.stop_dashboard(id);
        self.store.delete_dashboard(id)
    }

    /// Adds a card produced by a successful build. Empty html is rejected.
    pub fn add_generated_card(&self, dashboard_id: &DashboardId, new_card: NewCard) -> Option<Card> {
        if new_card.html.trim().is_empty() {
            tracing::debug!(dashboard_id = %dashboard_id, "Ignoring card without html");
            return None;
        }

        let card = Card::new(
            new_card.position.unwrap_or(geometry::SPAWN_POSITION),
            new_card.size.unwrap_or(DEFAULT_CARD_SIZE),
            new_card.html,
            new_card.conversation_history,
            new_card.interval_settings,
        );
        self.add_card(dashboard_id, card)
    }

    /// Adds a card and arms its timer when its interval settings ask for one.
    pub fn add_card(&self, dashboard_id: &DashboardId, card: Card) -> Option<Card> {
        let added = self.store.add_card(dashboard_id, card)?;
        self.scheduler
            .sync(&CardKey::new(dashboard_id.clone(), added.id.clone()));
        Some(added)
    }

    pub fn update_card(
        &self,
        dashboard_id: &DashboardId,
        card_id: &CardId,
        patch: CardPatch,
    ) -> Option<Card> {
        let resync = patch.touches_interval();
        let updated = self.store.update_card(dashboard_id, card_id, patch)?;
        if resync {
            self.scheduler
                .sync(&CardKey::new(dashboard_id.clone(), card_id.clone()));
        }
        Some(updated)
    }

    /// Saves an edit made in the card editor; the history's html follows the saved html.
    pub fn save_edit(
        &self,
        dashboard_id: &DashboardId,
        card_id: &CardId,
        html: String,
        history: ConversationHistory,
        interval_settings: IntervalSettings,
    ) -> Option<Card> {
        let history = ConversationHistory {
            html: html.clone(),
            ..history
        };
        self.update_card(
            dashboard_id,
            card_id,
            CardPatch {
                html: Some(html),
                conversation_history: Some(history),
                interval_settings: Some(interval_settings),
                ..CardPatch::default()
            },
        )
    }

    /// Stops the card's timer, then removes the card.
    pub fn delete_card(&self, dashboard_id: &DashboardId, card_id: &CardId) -> Option<Card> {
        self.scheduler
            .forget(&CardKey::new(dashboard_id.clone(), card_id.clone()));
        self.store.delete_card(dashboard_id, card_id)
    }

    /// Copies a card to another dashboard; the copy runs its own timer.
    pub fn clone_card(
        &self,
        source_id: &DashboardId,
        target_id: &DashboardId,
        card_id: &CardId,
    ) -> Option<Card> {
        let copy = self.store.clone_card(source_id, target_id, card_id)?;
        self.scheduler
            .sync(&CardKey::new(target_id.clone(), copy.id.clone()));
        Some(copy)
    }

    pub fn zoom(&self, dashboard_id: &DashboardId) -> f64 {
        self.store.zoom(dashboard_id)
    }

    pub fn set_zoom(&self, dashboard_id: &DashboardId, zoom: f64) -> Option<f64> {
        self.store.set_zoom(dashboard_id, zoom)
    }

    pub fn zoom_in(&self, dashboard_id: &DashboardId) -> Option<f64> {
        let current = self.store.dashboard(dashboard_id)?.zoom;
        self.store.set_zoom(dashboard_id, geometry::zoom_in(current))
    }

    pub fn zoom_out(&self, dashboard_id: &DashboardId) -> Option<f64> {
        let current = self.store.dashboard(dashboard_id)?.zoom;
        self.store.set_zoom(dashboard_id, geometry::zoom_out(current))
    }

    pub fn refresh_state(&self, dashboard_id: &DashboardId, card_id: &CardId) -> RefreshState {
        self.scheduler
            .state(&CardKey::new(dashboard_id.clone(), card_id.clone()))
    }

    /// Manual build for the card editor. Failures are returned for display.
    pub async fn build(
        &self,
        prompt: &str,
        history: &ConversationHistory,
    ) -> Result<Generation, GenerationError> {
        let result = self.generator.generate(prompt, history).await;
        match &result {
            Ok(Generation::Content { questions, .. }) => {
                tracing::info!(questions = questions.len(), "Built card preview");
            }
            Ok(Generation::Refused { message }) => {
                tracing::info!(%message, "Card build refused");
            }
            Err(e) => {
                tracing::error!(error = %e, "Error building card");
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::events::EventBus;
    use crate::application::refresh_scheduler::tests::{settle, ScriptedGenerator};
    use crate::domain::geometry::zoom_to_display_percent;
    use std::time::Duration;

    fn service(generator: Arc<ScriptedGenerator>) -> DashboardService {
        let store = DashboardStore::new(EventBus::new());
        let scheduler = RefreshScheduler::new(store.clone(), generator.clone());
        DashboardService::new(store, scheduler, generator)
    }

    fn new_card(interval_settings: IntervalSettings) -> NewCard {
        NewCard {
            html: "<div>old</div>".to_string(),
            conversation_history: ConversationHistory::new("p1", "<div>old</div>"),
            interval_settings,
            position: None,
            size: None,
        }
    }

    #[tokio::test]
    async fn test_add_generated_card_requires_html() {
        let service = service(ScriptedGenerator::html("<p/>"));
        let dashboard = service.create_dashboard("Demo", "").unwrap();

        let mut empty = new_card(IntervalSettings::default());
        empty.html = "  ".to_string();
        assert!(service.add_generated_card(&dashboard.id, empty).is_none());

        let card = service
            .add_generated_card(&dashboard.id, new_card(IntervalSettings::default()))
            .unwrap();
        assert_eq!(card.size(), DEFAULT_CARD_SIZE);
        assert_eq!(card.position(), geometry::SPAWN_POSITION);
    }

    #[tokio::test(start_paused = true)]
    async fn test_enable_interval_through_edit_save() {
        let generator = ScriptedGenerator::html("<div>new</div>");
        let service = service(generator.clone());
        let dashboard = service.create_dashboard("Demo", "").unwrap();
        let card = service
            .add_generated_card(&dashboard.id, new_card(IntervalSettings::default()))
            .unwrap();
        settle().await;
        assert_eq!(generator.calls(), 0);

        service.save_edit(
            &dashboard.id,
            &card.id,
            card.html.clone(),
            card.conversation_history.clone(),
            IntervalSettings::enabled(1, "refresh"),
        );
        settle().await;

        let stored = service.store().card(&dashboard.id, &card.id).unwrap();
        assert_eq!(generator.calls(), 1);
        assert_eq!(stored.html, "<div>new</div>");
        assert_eq!(stored.conversation_history.prompts, "p1\nrefresh");
    }

    #[tokio::test(start_paused = true)]
    async fn test_delete_card_stops_timer() {
        let generator = ScriptedGenerator::html("<div>new</div>");
        let service = service(generator.clone());
        let dashboard = service.create_dashboard("Demo", "").unwrap();
        let card = service
            .add_generated_card(&dashboard.id, new_card(IntervalSettings::enabled(1, "refresh")))
            .unwrap();
        settle().await;
        assert_eq!(service.scheduler().active_timers(), 1);

        service.delete_card(&dashboard.id, &card.id).unwrap();
        assert_eq!(service.scheduler().active_timers(), 0);

        tokio::time::sleep(Duration::from_secs(180)).await;
        settle().await;
        assert_eq!(generator.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delete_dashboard_stops_all_timers() {
        let generator = ScriptedGenerator::html("<div>new</div>");
        let service = service(generator.clone());
        let dashboard = service.create_dashboard("Demo", "").unwrap();
        for _ in 0..3 {
            service.add_generated_card(&dashboard.id, new_card(IntervalSettings::enabled(1, "tick")));
        }
        settle().await;
        assert_eq!(service.scheduler().active_timers(), 3);

        service.delete_dashboard(&dashboard.id).unwrap();
        assert_eq!(service.scheduler().active_timers(), 0);
        assert!(service.selected().is_none());

        tokio::time::sleep(Duration::from_secs(180)).await;
        settle().await;
        assert_eq!(generator.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_clone_runs_independent_timer() {
        let generator = ScriptedGenerator::html("<div>new</div>");
        let service = service(generator.clone());
        let source = service.create_dashboard("Source", "").unwrap();
        let target = service.create_dashboard("Target", "").unwrap();
        let card = service
            .add_generated_card(&source.id, new_card(IntervalSettings::enabled(1, "tick")))
            .unwrap();
        settle().await;

        let copy = service.clone_card(&source.id, &target.id, &card.id).unwrap();
        settle().await;
        assert_eq!(service.scheduler().active_timers(), 2);

        service.delete_card(&source.id, &card.id);
        assert_eq!(service.scheduler().active_timers(), 1);
        assert_eq!(
            service.refresh_state(&target.id, &copy.id),
            RefreshState::Running
        );
    }

    #[tokio::test]
    async fn test_zoom_steps_from_default() {
        let service = service(ScriptedGenerator::html("<p/>"));
        let dashboard = service.create_dashboard("Demo", "").unwrap();

        for _ in 0..3 {
            service.zoom_out(&dashboard.id);
        }
        assert_eq!(zoom_to_display_percent(service.zoom(&dashboard.id)), 70);

        for _ in 0..10 {
            service.zoom_out(&dashboard.id);
        }
        assert_eq!(service.zoom(&dashboard.id), 0.5);

        service.zoom_in(&dashboard.id);
        let zoom = service.zoom(&dashboard.id);
        assert!((0.5..=1.0).contains(&zoom));
        assert_eq!(zoom_to_display_percent(zoom), 20);
        assert!(service.zoom_in(&DashboardId::from("missing")).is_none());
    }

    #[tokio::test]
    async fn test_build_returns_refusal_and_errors() {
        let generator = ScriptedGenerator::new(vec![
            Ok(Generation::Refused {
                message: "I specialize in view creation.".to_string(),
            }),
            Err("offline".to_string()),
        ]);
        let service = service(generator);
        let history = ConversationHistory::default();

        assert_eq!(
            service.build("weather", &history).await.unwrap(),
            Generation::Refused {
                message: "I specialize in view creation.".to_string()
            }
        );
        let err = service.build("weather", &history).await.unwrap_err();
        assert_eq!(err.user_message(), "Failed to generate card");
    }
}
