//! Alert repository: store-by-identifier with filtered enumeration.
//!
//! The teacher crate's `Database` wrapped a single on-disk handle
//! (`rocksdb::DB`). Persistent backends are out of scope here (spec §1);
//! this module instead defines the trait boundary a persistent backend
//! would implement, plus the in-memory default every test and the example
//! wiring use.

use crate::model::{Alert, AlertId, AlertStatus};
use std::collections::HashMap;
use std::sync::Mutex;

/// Store-by-identifier abstraction with filtered enumeration.
///
/// Implementations must provide thread-safe get/put/enumerate (spec §5);
/// the service relies on that to guard the atomic
/// read-inspect-mutate-persist sequence per alert.
pub trait AlertRepository: Send + Sync {
    fn put(&self, alert: Alert);
    fn get(&self, id: AlertId) -> Option<Alert>;
    /// Runs `f` against the stored alert under the repository's lock so
    /// that read-inspect-mutate-persist happens atomically per alert
    /// without the caller needing to know the locking strategy. Returns
    /// whether an alert was found for `id`; `f` is not called otherwise.
    ///
    /// Takes a `dyn FnMut` rather than a generic closure so the trait
    /// stays object-safe (the service holds `Arc<dyn AlertRepository>`).
    /// Callers that need a value out of `f` capture it into a local.
    fn with_alert_mut(&self, id: AlertId, f: &mut dyn FnMut(&mut Alert)) -> bool;
    fn list(&self, status: Option<AlertStatus>) -> Vec<Alert>;
}

/// Default in-memory repository: one mutex guarding a hash map, the
/// "single engine-wide mutex" option spec §5 names as acceptable.
#[derive(Default)]
pub struct InMemoryAlertRepository {
    alerts: Mutex<HashMap<AlertId, Alert>>,
}

impl InMemoryAlertRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AlertRepository for InMemoryAlertRepository {
    fn put(&self, alert: Alert) {
        let mut guard = self.alerts.lock().expect("alert repository mutex poisoned");
        guard.insert(alert.id, alert);
    }

    fn get(&self, id: AlertId) -> Option<Alert> {
        let guard = self.alerts.lock().expect("alert repository mutex poisoned");
        guard.get(&id).cloned()
    }

    fn with_alert_mut(&self, id: AlertId, f: &mut dyn FnMut(&mut Alert)) -> bool {
        let mut guard = self.alerts.lock().expect("alert repository mutex poisoned");
        match guard.get_mut(&id) {
            Some(alert) => {
                f(alert);
                true
            }
            None => false,
        }
    }

    fn list(&self, status: Option<AlertStatus>) -> Vec<Alert> {
        let guard = self.alerts.lock().expect("alert repository mutex poisoned");
        let mut alerts: Vec<Alert> = guard
            .values()
            .filter(|a| status.map(|s| a.status == s).unwrap_or(true))
            .cloned()
            .collect();
        alerts.sort_by_key(|a| a.created_at);
        alerts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Channel, EscalationLevel, EscalationPolicy, Priority, Responder, ResponderId, Target};
    use chrono::{Duration, Utc};

    fn sample_alert() -> Alert {
        let responder = Responder::new(ResponderId::new(), "Primary", "+15555550100").unwrap();
        let target = Target::new(responder, Channel::Voice);
        let level = EscalationLevel::new(vec![target], Duration::minutes(5)).unwrap();
        let policy = EscalationPolicy::new(vec![level]).unwrap();
        Alert::new("db down".into(), Priority::Critical, Utc::now(), policy)
    }

    #[test]
    fn put_then_get_round_trips() {
        let repo = InMemoryAlertRepository::new();
        let alert = sample_alert();
        let id = alert.id;
        repo.put(alert.clone());
        assert_eq!(repo.get(id), Some(alert));
    }

    #[test]
    fn list_filters_by_status_and_sorts_by_creation() {
        let repo = InMemoryAlertRepository::new();
        let mut first = sample_alert();
        first.created_at = Utc::now() - Duration::minutes(10);
        let mut second = sample_alert();
        second.created_at = Utc::now();
        second.status = AlertStatus::Acknowledged;

        repo.put(second.clone());
        repo.put(first.clone());

        let pending = repo.list(Some(AlertStatus::Pending));
        assert_eq!(pending, vec![first.clone()]);

        let all = repo.list(None);
        assert_eq!(all, vec![first, second]);
    }

    #[test]
    fn with_alert_mut_persists_mutation() {
        let repo = InMemoryAlertRepository::new();
        let alert = sample_alert();
        let id = alert.id;
        repo.put(alert);

        let found = repo.with_alert_mut(id, &mut |a| a.status = AlertStatus::Exhausted);

        assert!(found);
        assert_eq!(repo.get(id).unwrap().status, AlertStatus::Exhausted);
    }
}
