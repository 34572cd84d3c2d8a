// Dashboard domain model
use super::card::Card;
use super::geometry::{snap_zoom, DEFAULT_ZOOM};
use super::ids::{CardId, DashboardId};
use chrono::{DateTime, Utc};
use serde::Serialize;

pub const MAX_CARDS_PER_DASHBOARD: usize = 20;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub id: DashboardId,
    pub title: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    /// Insertion order is the rendering order.
    pub cards: Vec<Card>,
    pub zoom: f64,
    /// Next stacking value handed out by `bring_to_front`.
    pub focus_clock: u64,
}

impl Dashboard {
    pub fn new(title: String, description: String) -> Self {
        Self {
            id: DashboardId::generate(),
            title,
            description,
            created_at: Utc::now(),
            cards: Vec::new(),
            zoom: DEFAULT_ZOOM,
            focus_clock: 1,
        }
    }

    pub fn card(&self, card_id: &CardId) -> Option<&Card> {
        self.cards.iter().find(|c| &c.id == card_id)
    }

    pub fn card_mut(&mut self, card_id: &CardId) -> Option<&mut Card> {
        self.cards.iter_mut().find(|c| &c.id == card_id)
    }

    pub fn is_full(&self) -> bool {
        self.cards.len() >= MAX_CARDS_PER_DASHBOARD
    }

    /// Appends unless the dashboard already holds the maximum number of cards.
    pub fn push_card(&mut self, card: Card) -> bool {
        if self.is_full() {
            return false;
        }
        self.cards.push(card);
        true
    }

    pub fn remove_card(&mut self, card_id: &CardId) -> Option<Card> {
        let index = self.cards.iter().position(|c| &c.id == card_id)?;
        Some(self.cards.remove(index))
    }

    /// Stored zoom always sits on a display step.
    pub fn set_zoom(&mut self, zoom: f64) {
        self.zoom = snap_zoom(zoom);
    }

    pub fn bring_to_front(&mut self, card_id: &CardId) -> Option<u64> {
        let tick = self.focus_clock;
        let card = self.card_mut(card_id)?;
        card.z_index = tick;
        self.focus_clock += 1;
        Some(tick)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::card::{ConversationHistory, IntervalSettings};
    use crate::domain::geometry::{zoom_to_display_percent, Position, Size};

    fn card() -> Card {
        Card::new(
            Position::new(0.0, 0.0),
            Size::new(400.0, 300.0),
            "<p>x</p>".to_string(),
            ConversationHistory::default(),
            IntervalSettings::default(),
        )
    }

    #[test]
    fn test_card_cap() {
        let mut dashboard = Dashboard::new("Demo".to_string(), String::new());
        for _ in 0..MAX_CARDS_PER_DASHBOARD {
            assert!(dashboard.push_card(card()));
        }
        assert!(!dashboard.push_card(card()));
        assert_eq!(dashboard.cards.len(), MAX_CARDS_PER_DASHBOARD);
    }

    #[test]
    fn test_bring_to_front_is_monotonic() {
        let mut dashboard = Dashboard::new("Demo".to_string(), String::new());
        let a = card();
        let b = card();
        let (a_id, b_id) = (a.id.clone(), b.id.clone());
        dashboard.push_card(a);
        dashboard.push_card(b);

        assert_eq!(dashboard.bring_to_front(&a_id), Some(1));
        assert_eq!(dashboard.bring_to_front(&b_id), Some(2));
        assert_eq!(dashboard.bring_to_front(&a_id), Some(3));
        assert_eq!(dashboard.card(&a_id).map(|c| c.z_index), Some(3));
        assert_eq!(dashboard.bring_to_front(&CardId::from("missing")), None);
        assert_eq!(dashboard.focus_clock, 4);
    }

    #[test]
    fn test_zoom_is_clamped() {
        let mut dashboard = Dashboard::new("Demo".to_string(), String::new());
        assert_eq!(dashboard.zoom, 1.0);
        dashboard.set_zoom(0.2);
        assert_eq!(dashboard.zoom, 0.5);
        dashboard.set_zoom(4.0);
        assert_eq!(dashboard.zoom, 1.0);
        dashboard.set_zoom(0.73);
        assert_eq!(zoom_to_display_percent(dashboard.zoom), 50);
    }
}
