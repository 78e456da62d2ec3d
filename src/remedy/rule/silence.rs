// SPDX-License-Identifier: MIT

//! Per-rule silence windows
//!
//! The check and the update of a rule's last trigger time happen under that
//! rule's own lock, so two concurrent matches cannot both fire inside one
//! window. Unrelated rules never contend.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

use super::model::SilenceWindow;

type Slot = Arc<Mutex<Option<DateTime<Utc>>>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SilenceDecision {
    /// Trigger accepted; the window restarts at this instant
    Fire,
    /// Inside the window of an earlier trigger
    Silenced { until: DateTime<Utc> },
}

#[derive(Clone, Default)]
pub struct SilenceController {
    slots: Arc<RwLock<HashMap<String, Slot>>>,
}

impl SilenceController {
    pub fn new() -> Self {
        Self::default()
    }

    async fn slot(&self, rule_id: &str) -> Slot {
        if let Some(slot) = self.slots.read().await.get(rule_id) {
            return slot.clone();
        }
        let mut slots = self.slots.write().await;
        slots.entry(rule_id.to_string()).or_default().clone()
    }

    /// Atomically decide whether `rule_id` may fire at `now`, recording the
    /// trigger when it may
    pub async fn try_fire(
        &self,
        rule_id: &str,
        window: &SilenceWindow,
        now: DateTime<Utc>,
    ) -> SilenceDecision {
        let slot = self.slot(rule_id).await;
        let mut last = slot.lock().await;

        if let (Some(length), Some(previous)) = (window.length(), *last) {
            let until = previous
                .checked_add_signed(length)
                .unwrap_or(DateTime::<Utc>::MAX_UTC);
            if now < until {
                return SilenceDecision::Silenced { until };
            }
        }

        *last = Some(now);
        SilenceDecision::Fire
    }

    pub async fn last_triggered(&self, rule_id: &str) -> Option<DateTime<Utc>> {
        let slot = self.slots.read().await.get(rule_id).cloned()?;
        let last = *slot.lock().await;
        last
    }

    /// Forget a rule's window, e.g. when the rule is deleted
    pub async fn clear(&self, rule_id: &str) {
        self.slots.write().await.remove(rule_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[tokio::test]
    async fn test_second_trigger_inside_window_is_silenced() {
        let controller = SilenceController::new();
        let window = SilenceWindow::minutes(30);
        let t0 = Utc::now();

        assert_eq!(controller.try_fire("r1", &window, t0).await, SilenceDecision::Fire);
        assert_eq!(
            controller
                .try_fire("r1", &window, t0 + Duration::minutes(10))
                .await,
            SilenceDecision::Silenced {
                until: t0 + Duration::minutes(30)
            }
        );
        assert_eq!(controller.last_triggered("r1").await, Some(t0));
    }

    #[tokio::test]
    async fn test_trigger_after_window_fires_and_resets() {
        let controller = SilenceController::new();
        let window = SilenceWindow::minutes(30);
        let t0 = Utc::now();
        let t1 = t0 + Duration::minutes(30);

        controller.try_fire("r1", &window, t0).await;
        assert_eq!(controller.try_fire("r1", &window, t1).await, SilenceDecision::Fire);
        assert_eq!(controller.last_triggered("r1").await, Some(t1));
    }

    #[tokio::test]
    async fn test_silenced_attempt_does_not_extend_window() {
        let controller = SilenceController::new();
        let window = SilenceWindow::minutes(30);
        let t0 = Utc::now();

        controller.try_fire("r1", &window, t0).await;
        controller
            .try_fire("r1", &window, t0 + Duration::minutes(20))
            .await;
        assert_eq!(
            controller
                .try_fire("r1", &window, t0 + Duration::minutes(31))
                .await,
            SilenceDecision::Fire
        );
    }

    #[tokio::test]
    async fn test_rules_are_independent() {
        let controller = SilenceController::new();
        let window = SilenceWindow::minutes(30);
        let now = Utc::now();

        assert_eq!(controller.try_fire("r1", &window, now).await, SilenceDecision::Fire);
        assert_eq!(controller.try_fire("r2", &window, now).await, SilenceDecision::Fire);
    }

    #[tokio::test]
    async fn test_disabled_window_never_silences() {
        let controller = SilenceController::new();
        let window = SilenceWindow::disabled();
        let now = Utc::now();

        assert_eq!(controller.try_fire("r1", &window, now).await, SilenceDecision::Fire);
        assert_eq!(controller.try_fire("r1", &window, now).await, SilenceDecision::Fire);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_matches_fire_once() {
        let controller = SilenceController::new();
        let window = SilenceWindow::minutes(5);
        let now = Utc::now();

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let controller = controller.clone();
                tokio::spawn(async move { controller.try_fire("r1", &window, now).await })
            })
            .collect();

        let mut fired = 0;
        for handle in handles {
            if handle.await.unwrap() == SilenceDecision::Fire {
                fired += 1;
            }
        }
        assert_eq!(fired, 1);
    }

    #[tokio::test]
    async fn test_clear_forgets_window() {
        let controller = SilenceController::new();
        let window = SilenceWindow::minutes(30);
        let now = Utc::now();

        controller.try_fire("r1", &window, now).await;
        controller.clear("r1").await;
        assert_eq!(controller.last_triggered("r1").await, None);
        assert_eq!(controller.try_fire("r1", &window, now).await, SilenceDecision::Fire);
    }
}
