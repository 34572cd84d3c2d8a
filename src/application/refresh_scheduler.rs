// Card refresh scheduler - per-card timers that regenerate content on an interval
use crate::application::card_generator::{CardGenerator, Generation};
use crate::application::dashboard_store::{DashboardStore, RefreshOutcome};
use crate::application::events::CanvasEvent;
use crate::domain::card::IntervalSettings;
use crate::domain::ids::{CardId, DashboardId};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshState {
    Idle,
    ArmedWaitingFirstFire,
    Running,
    GenerationInFlight,
}

impl RefreshState {
    pub fn is_loading(self) -> bool {
        self == RefreshState::GenerationInFlight
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CardKey {
    pub dashboard_id: DashboardId,
    pub card_id: CardId,
}

impl CardKey {
    pub fn new(dashboard_id: DashboardId, card_id: CardId) -> Self {
        Self {
            dashboard_id,
            card_id,
        }
    }
}

struct ArmedTimer {
    settings: IntervalSettings,
    handle: JoinHandle<()>,
}

struct TimerSlot {
    state: watch::Sender<RefreshState>,
    /// Bumped whenever the slot's timer is replaced; stale tasks stop reporting.
    epoch: u64,
    armed: Option<ArmedTimer>,
}

impl TimerSlot {
    fn new() -> Self {
        let (state, _) = watch::channel(RefreshState::Idle);
        Self {
            state,
            epoch: 0,
            armed: None,
        }
    }
}

/// Owns one refresh loop per card with enabled interval settings.
///
/// Each loop fires once immediately, then every `interval` minutes. Fires never
/// overlap because a loop awaits each generation call before taking the next
/// tick. Generation failures are logged and the loop keeps going.
#[derive(Clone)]
pub struct RefreshScheduler {
    store: DashboardStore,
    generator: Arc<dyn CardGenerator>,
    slots: Arc<Mutex<HashMap<CardKey, TimerSlot>>>,
}

impl RefreshScheduler {
    pub fn new(store: DashboardStore, generator: Arc<dyn CardGenerator>) -> Self {
        Self {
            store,
            generator,
            slots: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Brings the card's timer in line with its stored interval settings.
    ///
    /// A running timer whose settings are unchanged is left alone. Otherwise the
    /// old timer is cancelled before deciding whether to arm a new one.
    pub fn sync(&self, key: &CardKey) {
        let Some(card) = self.store.card(&key.dashboard_id, &key.card_id) else {
            self.stop(key);
            return;
        };
        let settings = card.interval_settings;

        let mut slots = self.slots.lock();
        let slot = slots.entry(key.clone()).or_insert_with(TimerSlot::new);

        if let Some(armed) = &slot.armed {
            if armed.settings == settings && !armed.handle.is_finished() {
                return;
            }
        }
        Self::cancel(slot);

        if !settings.should_run() {
            self.report(key, slot, RefreshState::Idle);
            return;
        }

        slot.epoch += 1;
        let epoch = slot.epoch;
        self.report(key, slot, RefreshState::ArmedWaitingFirstFire);

        tracing::info!(
            dashboard_id = %key.dashboard_id,
            card_id = %key.card_id,
            interval_minutes = settings.interval,
            "Arming card refresh"
        );
        let handle = tokio::spawn(self.clone().run(key.clone(), epoch, settings.clone()));
        slot.armed = Some(ArmedTimer { settings, handle });
    }

    /// Cancels the card's timer, if any, and reports it idle.
    pub fn stop(&self, key: &CardKey) {
        let mut slots = self.slots.lock();
        if let Some(slot) = slots.get_mut(key) {
            if Self::cancel(slot) {
                tracing::info!(
                    dashboard_id = %key.dashboard_id,
                    card_id = %key.card_id,
                    "Stopped card refresh"
                );
            }
            self.report(key, slot, RefreshState::Idle);
        }
    }

    /// Stops the card's timer and drops its observable state.
    pub fn forget(&self, key: &CardKey) {
        self.stop(key);
        self.slots.lock().remove(key);
    }

    pub fn stop_dashboard(&self, dashboard_id: &DashboardId) {
        let keys: Vec<CardKey> = self
            .slots
            .lock()
            .keys()
            .filter(|k| &k.dashboard_id == dashboard_id)
            .cloned()
            .collect();
        for key in keys {
            self.forget(&key);
        }
    }

    pub fn state(&self, key: &CardKey) -> RefreshState {
        self.slots
            .lock()
            .get(key)
            .map(|slot| *slot.state.borrow())
            .unwrap_or(RefreshState::Idle)
    }

    /// Observable refresh state for one card, for busy indicators.
    pub fn watch(&self, key: &CardKey) -> watch::Receiver<RefreshState> {
        self.slots
            .lock()
            .entry(key.clone())
            .or_insert_with(TimerSlot::new)
            .state
            .subscribe()
    }

    #[cfg(test)]
    pub fn active_timers(&self) -> usize {
        self.slots
            .lock()
            .values()
            .filter(|slot| slot.armed.as_ref().is_some_and(|a| !a.handle.is_finished()))
            .count()
    }

    fn cancel(slot: &mut TimerSlot) -> bool {
        slot.epoch += 1;
        match slot.armed.take() {
            Some(armed) => {
                armed.handle.abort();
                true
            }
            None => false,
        }
    }

    fn report(&self, key: &CardKey, slot: &TimerSlot, state: RefreshState) {
        let previous = slot.state.send_replace(state);
        if previous != state {
            self.store.events().publish(CanvasEvent::RefreshStateChanged {
                dashboard_id: key.dashboard_id.clone(),
                card_id: key.card_id.clone(),
                state,
                is_loading: state.is_loading(),
            });
        }
    }

    /// Reports a state change from a loop, unless the loop has been superseded.
    fn transition(&self, key: &CardKey, epoch: u64, state: RefreshState) -> bool {
        let slots = self.slots.lock();
        match slots.get(key) {
            Some(slot) if slot.epoch == epoch => {
                self.report(key, slot, state);
                true
            }
            _ => false,
        }
    }

    async fn run(self, key: CardKey, epoch: u64, settings: IntervalSettings) {
        let period = settings.period();
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        // First fire happens right away, later ones on the ticker.
        loop {
            if !self.fire(&key, epoch, &settings).await {
                break;
            }
            if !self.transition(&key, epoch, RefreshState::Running) {
                break;
            }
            ticker.tick().await;
        }

        tracing::debug!(
            dashboard_id = %key.dashboard_id,
            card_id = %key.card_id,
            "Card refresh loop exited"
        );
    }

    /// One generation round. Returns false when the loop should end.
    async fn fire(&self, key: &CardKey, epoch: u64, settings: &IntervalSettings) -> bool {
        let Some(card) = self.store.card(&key.dashboard_id, &key.card_id) else {
            tracing::debug!(card_id = %key.card_id, "Card is gone, ending refresh loop");
            return false;
        };
        if !self.transition(key, epoch, RefreshState::GenerationInFlight) {
            return false;
        }

        let baseline = card.revision;
        let result = self
            .generator
            .generate(&settings.prompt, &card.conversation_history)
            .await;

        match result {
            Ok(Generation::Content { html, .. }) if !html.trim().is_empty() => {
                match self.store.apply_refresh(
                    &key.dashboard_id,
                    &key.card_id,
                    baseline,
                    &settings.prompt,
                    html,
                ) {
                    RefreshOutcome::Applied(_) => {
                        tracing::debug!(card_id = %key.card_id, "Applied interval refresh");
                    }
                    RefreshOutcome::Stale { baseline, current } => {
                        tracing::warn!(
                            card_id = %key.card_id,
                            baseline,
                            current,
                            "Card changed during refresh, discarding generated content"
                        );
                    }
                    RefreshOutcome::NotFound => return false,
                }
            }
            Ok(Generation::Content { .. }) => {
                tracing::debug!(card_id = %key.card_id, "Interval refresh returned empty html");
            }
            Ok(Generation::Refused { message }) => {
                tracing::warn!(card_id = %key.card_id, %message, "Interval refresh was refused");
            }
            Err(e) => {
                tracing::error!(card_id = %key.card_id, error = %e, "Error executing interval prompt");
            }
        }

        true
    }
}
