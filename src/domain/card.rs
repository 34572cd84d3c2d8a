// Card domain model - a generated HTML widget placed on a dashboard
use super::geometry::{Position, Size, SPAWN_POSITION};
use super::ids::CardId;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Prompt log and latest html, resent as context on every generation call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationHistory {
    #[serde(default)]
    pub prompts: String,
    #[serde(default)]
    pub html: String,
}

impl ConversationHistory {
    pub fn new(prompts: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            prompts: prompts.into(),
            html: html.into(),
        }
    }

    /// Appends `prompt` to the newline-joined log and records `html` as the latest result.
    pub fn followed_by(&self, prompt: &str, html: &str) -> Self {
        let prompts = if self.prompts.is_empty() {
            prompt.to_string()
        } else {
            format!("{}\n{}", self.prompts, prompt)
        };
        Self {
            prompts,
            html: html.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntervalSettings {
    pub is_enabled: bool,
    /// Minutes between refreshes, at least 1.
    pub interval: u32,
    pub prompt: String,
}

impl Default for IntervalSettings {
    fn default() -> Self {
        Self {
            is_enabled: false,
            interval: 1,
            prompt: String::new(),
        }
    }
}

impl IntervalSettings {
    pub fn enabled(interval: u32, prompt: impl Into<String>) -> Self {
        Self {
            is_enabled: true,
            interval,
            prompt: prompt.into(),
        }
        .normalized()
    }

    pub fn normalized(mut self) -> Self {
        self.interval = self.interval.max(1);
        self
    }

    /// A refresh loop only runs when enabled with a non-blank prompt.
    pub fn should_run(&self) -> bool {
        self.is_enabled && !self.prompt.trim().is_empty()
    }

    pub fn period(&self) -> Duration {
        Duration::from_secs(u64::from(self.interval.max(1)) * 60)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub id: CardId,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub html: String,
    pub conversation_history: ConversationHistory,
    pub interval_settings: IntervalSettings,
    /// Stacking value assigned by the owning dashboard's focus clock.
    pub z_index: u64,
    /// Bumped on every content change; geometry and focus leave it alone.
    pub revision: u64,
}

impl Card {
    pub fn new(
        position: Position,
        size: Size,
        html: String,
        conversation_history: ConversationHistory,
        interval_settings: IntervalSettings,
    ) -> Self {
        let size = size.clamped();
        Self {
            id: CardId::generate(),
            x: position.x,
            y: position.y,
            width: size.width,
            height: size.height,
            html,
            conversation_history,
            interval_settings: interval_settings.normalized(),
            z_index: 0,
            revision: 0,
        }
    }

    pub fn position(&self) -> Position {
        Position::new(self.x, self.y)
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    /// Independent copy for another dashboard: new id, spawn position, fresh clocks.
    pub fn duplicate(&self) -> Self {
        Self {
            id: CardId::generate(),
            x: SPAWN_POSITION.x,
            y: SPAWN_POSITION.y,
            z_index: 0,
            revision: 0,
            ..self.clone()
        }
    }

    pub fn apply(&mut self, patch: CardPatch) {
        if let Some(x) = patch.x {
            self.x = x;
        }
        if let Some(y) = patch.y {
            self.y = y;
        }
        if patch.width.is_some() || patch.height.is_some() {
            let size = Size::new(
                patch.width.unwrap_or(self.width),
                patch.height.unwrap_or(self.height),
            )
            .clamped();
            self.width = size.width;
            self.height = size.height;
        }

        let mut content_changed = false;
        if let Some(html) = patch.html {
            self.html = html;
            content_changed = true;
        }
        if let Some(history) = patch.conversation_history {
            self.conversation_history = history;
            content_changed = true;
        }
        if let Some(settings) = patch.interval_settings {
            self.interval_settings = settings.normalized();
            content_changed = true;
        }
        if content_changed {
            self.revision += 1;
        }
    }
}

/// Partial update merged into a card; absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardPatch {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub html: Option<String>,
    pub conversation_history: Option<ConversationHistory>,
    pub interval_settings: Option<IntervalSettings>,
}

impl CardPatch {
    pub fn position(position: Position) -> Self {
        Self {
            x: Some(position.x),
            y: Some(position.y),
            ..Self::default()
        }
    }

    pub fn size(size: Size) -> Self {
        Self {
            width: Some(size.width),
            height: Some(size.height),
            ..Self::default()
        }
    }

    pub fn touches_interval(&self) -> bool {
        self.interval_settings.is_some()
    }
}
