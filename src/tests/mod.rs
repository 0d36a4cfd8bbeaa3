//! Crate-level integration tests that exercise the public API end to end,
//! mirroring the split the teacher crate used between `tests/mod.rs`
//! (shared fixtures) and a scenario file (`tests/escalation.rs`).


use crate::database::InMemoryAlertRepository;
use crate::model::{Channel, EscalationLevel, EscalationPolicy, Priority, Responder, ResponderId, Target};
use crate::notification::{ConsoleNotifier, NotificationPort};
use crate::service::OnCallService;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

pub(crate) struct Collector {
    pub(crate) seen: Mutex<Vec<(crate::model::AlertId, usize)>>,
}

impl Collector {
    pub(crate) fn new() -> Self {
        Collector {
            seen: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl NotificationPort for Collector {
    async fn notify(&self, alert: &crate::model::Alert, assignment: &crate::model::Assignment) {
        self.seen.lock().unwrap().push((alert.id, assignment.level_index));
    }
}

pub(crate) fn responder(name: &str) -> Responder {
    Responder::new(ResponderId::new(), name, "+15555550100").unwrap()
}

/// The "high" policy from spec §8: three 5-minute levels.
pub(crate) fn high_policy_service(
    notifier: Arc<dyn NotificationPort>,
) -> (OnCallService, ResponderId, ResponderId, ResponderId) {
    let primary = responder("Primary");
    let secondary = responder("Secondary");
    let manager = responder("Manager");
    let primary_id = primary.id;
    let secondary_id = secondary.id;
    let manager_id = manager.id;

    let levels = vec![
        EscalationLevel::new(vec![Target::new(primary, Channel::Voice)], Duration::minutes(5)).unwrap(),
        EscalationLevel::new(vec![Target::new(secondary, Channel::Voice)], Duration::minutes(5)).unwrap(),
        EscalationLevel::new(vec![Target::new(manager, Channel::Voice)], Duration::minutes(5)).unwrap(),
    ];
    let policy = EscalationPolicy::new(levels).unwrap();

    let mut policies = HashMap::new();
    policies.insert(Priority::Critical, policy);

    let repo = Arc::new(InMemoryAlertRepository::new());
    let service = OnCallService::new(repo, notifier, policies);

    (service, primary_id, secondary_id, manager_id)
}

pub(crate) fn t0() -> DateTime<Utc> {
    "2024-01-01T00:00:00Z".parse().unwrap()
}

#[tokio::test]
async fn raise_and_list_round_trip_through_the_public_api() {
    let notifier: Arc<dyn NotificationPort> = Arc::new(ConsoleNotifier::any_channel());
    let (service, ..) = high_policy_service(notifier);

    let alert = service.raise("db down", Priority::Critical, t0()).await.unwrap();
    let fetched = service.get(alert.id).expect("just-raised alert must be retrievable");

    assert_eq!(fetched.id, alert.id);
    assert_eq!(fetched.message, "db down");
    assert_eq!(service.list(None).len(), 1);
}
