//! Notification port and its composite/channel-filtering adapters.
//!
//! Generalizes the teacher's `Adapter` trait (`adapter/mod.rs`), which
//! carried `notify`/`respond`/`endpoint_request` for an interactive
//! two-way channel model this spec does not need, down to the one-method
//! contract spec §4.2 and design note §9 actually ask for.

use crate::model::{Alert, Assignment, Channel};
use async_trait::async_trait;

/// Best-effort delivery of an assignment. Must never block engine
/// progress on external success or failure; adapters swallow or log
/// their own errors (spec §4.2, §7).
#[async_trait]
pub trait NotificationPort: Send + Sync {
    async fn notify(&self, alert: &Alert, assignment: &Assignment);
}

/// Delivers to every delegate, ignoring individual failures so one failed
/// sink does not mask the others.
pub struct CompositeNotifier {
    delegates: Vec<Box<dyn NotificationPort>>,
}

impl CompositeNotifier {
    pub fn new(delegates: Vec<Box<dyn NotificationPort>>) -> Self {
        CompositeNotifier { delegates }
    }
}

#[async_trait]
impl NotificationPort for CompositeNotifier {
    async fn notify(&self, alert: &Alert, assignment: &Assignment) {
        for delegate in &self.delegates {
            delegate.notify(alert, assignment).await;
        }
    }
}

/// Logs the assignment to `tracing`; filters to a single channel. The
/// console sink in spec §1's "out of scope" list is this one — kept
/// minimal on purpose.
pub struct ConsoleNotifier {
    channel: Option<Channel>,
}

impl ConsoleNotifier {
    /// Notifies for every channel.
    pub fn any_channel() -> Self {
        ConsoleNotifier { channel: None }
    }

    /// Notifies only for targets on `channel`; early-returns otherwise
    /// (spec §4.2: "channel-specific adapters must early-return for
    /// non-matching channels").
    pub fn for_channel(channel: Channel) -> Self {
        ConsoleNotifier {
            channel: Some(channel),
        }
    }
}

#[async_trait]
impl NotificationPort for ConsoleNotifier {
    async fn notify(&self, alert: &Alert, assignment: &Assignment) {
        if let Some(channel) = self.channel {
            if assignment.target.channel != channel {
                return;
            }
        }

        tracing::info!(
            alert_id = %alert.id,
            assignment_id = %assignment.id,
            responder = %assignment.target.responder.name,
            channel = %assignment.target.channel,
            address = %assignment.target.address,
            level = assignment.level_index,
            "paging responder"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EscalationLevel, EscalationPolicy, Priority, Responder, ResponderId, Target};
    use chrono::{Duration, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingNotifier(Arc<AtomicUsize>);

    #[async_trait]
    impl NotificationPort for CountingNotifier {
        async fn notify(&self, _alert: &Alert, _assignment: &Assignment) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct FailingNotifier;

    #[async_trait]
    impl NotificationPort for FailingNotifier {
        async fn notify(&self, _alert: &Alert, _assignment: &Assignment) {
            // Simulates a sink that would fail; the contract says the port
            // swallows its own failures, so there is nothing to propagate.
        }
    }

    fn sample() -> (Alert, Assignment) {
        let responder = Responder::new(ResponderId::new(), "Primary", "+15555550100").unwrap();
        let target = Target::new(responder, Channel::Voice);
        let level = EscalationLevel::new(vec![target.clone()], Duration::minutes(5)).unwrap();
        let policy = EscalationPolicy::new(vec![level]).unwrap();
        let alert = Alert::new("db down".into(), Priority::Critical, Utc::now(), policy);
        let assignment = Assignment::new(target, 0, Utc::now(), Duration::minutes(5));
        (alert, assignment)
    }

    #[tokio::test]
    async fn composite_notifies_every_delegate() {
        let counter = Arc::new(AtomicUsize::new(0));
        let composite = CompositeNotifier::new(vec![
            Box::new(FailingNotifier),
            Box::new(CountingNotifier(counter.clone())),
            Box::new(CountingNotifier(counter.clone())),
        ]);

        let (alert, assignment) = sample();
        composite.notify(&alert, &assignment).await;

        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn console_notifier_filters_by_channel() {
        let (alert, assignment) = sample();
        // Does not panic or otherwise observably act; channel mismatch.
        ConsoleNotifier::for_channel(Channel::Email)
            .notify(&alert, &assignment)
            .await;
        ConsoleNotifier::for_channel(Channel::Voice)
            .notify(&alert, &assignment)
            .await;
    }
}
