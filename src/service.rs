//! The on-call service: the core routing and escalation state machine
//! (spec §4.1). Owns policy lookup, alert creation, time advancement, and
//! the two acknowledgement paths.
//!
//! Generalizes the teacher's `escalation.rs`/`processor.rs` sketch of an
//! actix actor owning this responsibility; both are `unimplemented!()`
//! stubs there. This implementation is a plain struct guarding the
//! repository behind the concurrency contract of spec §5 instead, since
//! the engine is specified to perform no background threading of its own.

use crate::database::AlertRepository;
use crate::error::ServiceError;
use crate::model::{
    AckStatus, AcknowledgementOutcome, Alert, AlertId, AlertStatus, Assignment,
    AcknowledgementToken, EscalationPolicy, Priority, ResponderId,
};
use crate::notification::NotificationPort;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;

/// The core escalation engine. Cheaply cloneable: the repository and
/// notifier are held behind `Arc`, matching the "inject a configured
/// client" shape the rest of the crate uses rather than a singleton.
#[derive(Clone)]
pub struct OnCallService {
    repository: Arc<dyn AlertRepository>,
    notifier: Arc<dyn NotificationPort>,
    policies: Arc<HashMap<Priority, EscalationPolicy>>,
}

impl OnCallService {
    pub fn new(
        repository: Arc<dyn AlertRepository>,
        notifier: Arc<dyn NotificationPort>,
        policies: HashMap<Priority, EscalationPolicy>,
    ) -> Self {
        OnCallService {
            repository,
            notifier,
            policies: Arc::new(policies),
        }
    }

    /// Fails if no policy exists for the priority, or if the message is
    /// blank. Persists a new alert with status pending and current level
    /// 0, dispatches level 0, and returns the alert (spec §4.1).
    pub async fn raise(
        &self,
        message: impl Into<String>,
        priority: Priority,
        created_at: DateTime<Utc>,
    ) -> Result<Alert, ServiceError> {
        let message = message.into();
        if message.trim().is_empty() {
            return Err(ServiceError::BlankMessage);
        }

        let policy = self
            .policies
            .get(&priority)
            .cloned()
            .ok_or(ServiceError::NoPolicyForPriority(priority))?;

        let mut alert = Alert::new(message, priority, created_at, policy);
        let dispatched = self.dispatch_level(&mut alert, 0, created_at);
        self.repository.put(alert.clone());

        self.deliver(&alert, &dispatched).await;

        Ok(alert)
    }

    /// Sorted by creation time ascending; filter applies when present.
    pub fn list(&self, status: Option<AlertStatus>) -> Vec<Alert> {
        self.repository.list(status)
    }

    pub fn get(&self, id: AlertId) -> Option<Alert> {
        self.repository.get(id)
    }

    /// Locates any assignment whose target responder equals `responder_id`.
    pub async fn acknowledge_by_responder(
        &self,
        alert_id: AlertId,
        responder_id: ResponderId,
        at: DateTime<Utc>,
    ) -> AcknowledgementOutcome {
        let mut outcome = None;
        self.repository.with_alert_mut(alert_id, &mut |alert| {
            outcome = Some(complete_acknowledgement_by_responder(alert, responder_id, at));
        });
        outcome.unwrap_or_else(|| AcknowledgementOutcome::not_found(AckStatus::AlertNotFound))
    }

    /// As above but locates by `token`; missing token → `TokenNotFound`.
    pub async fn acknowledge_by_token(
        &self,
        alert_id: AlertId,
        token: AcknowledgementToken,
        at: DateTime<Utc>,
    ) -> AcknowledgementOutcome {
        let mut outcome = None;
        self.repository.with_alert_mut(alert_id, &mut |alert| {
            outcome = Some(complete_acknowledgement_by_token(alert, token, at));
        });
        outcome.unwrap_or_else(|| AcknowledgementOutcome::not_found(AckStatus::AlertNotFound))
    }

    /// Evaluates every pending alert; returns those that changed state on
    /// this tick (spec §4.1.3). Notification delivery happens outside the
    /// repository lock (spec §5): the dispatch set is computed under the
    /// lock, then delivered after release.
    pub async fn advance(&self, now: DateTime<Utc>) -> Vec<Alert> {
        let pending = self.repository.list(Some(AlertStatus::Pending));
        let mut changed = Vec::new();
        let mut to_deliver: Vec<(Alert, Vec<Assignment>)> = Vec::new();

        for candidate in pending {
            let id = candidate.id;
            let mut dispatched_this_tick = None;
            self.repository.with_alert_mut(id, &mut |alert| {
                dispatched_this_tick = advance_one(alert, now);
            });

            if let Some(dispatched) = dispatched_this_tick {
                let alert = self.repository.get(id).expect("alert just mutated must exist");
                changed.push(alert.clone());
                to_deliver.push((alert, dispatched));
            }
        }

        for (alert, dispatched) in &to_deliver {
            self.deliver(alert, dispatched).await;
        }

        changed
    }

    fn dispatch_level(
        &self,
        alert: &mut Alert,
        level_index: usize,
        dispatched_at: DateTime<Utc>,
    ) -> Vec<Assignment> {
        let level = alert.policy.levels[level_index].clone();
        let mut dispatched = Vec::with_capacity(level.targets.len());

        for target in level.targets {
            let assignment = Assignment::new(
                target,
                level_index,
                dispatched_at,
                level.acknowledgement_timeout,
            );
            alert.assignments.push(assignment.clone());
            dispatched.push(assignment);
        }

        tracing::info!(
            alert_id = %alert.id,
            level = level_index,
            targets = dispatched.len(),
            "dispatched escalation level"
        );

        dispatched
    }

    async fn deliver(&self, alert: &Alert, assignments: &[Assignment]) {
        for assignment in assignments {
            self.notifier.notify(alert, assignment).await;
        }
    }
}

/// §4.1.2 acknowledgement completion, entered by responder identity.
fn complete_acknowledgement_by_responder(
    alert: &mut Alert,
    responder_id: ResponderId,
    at: DateTime<Utc>,
) -> AcknowledgementOutcome {
    if alert.status == AlertStatus::Acknowledged {
        return AcknowledgementOutcome::resolved(
            AckStatus::AlreadyAcknowledged,
            alert.acknowledged_by.expect("acknowledged alert has a responder"),
            alert.acknowledged_at.expect("acknowledged alert has a timestamp"),
        );
    }

    let Some(index) = alert
        .assignments
        .iter()
        .position(|a| a.target.responder.id == responder_id)
    else {
        return AcknowledgementOutcome::not_found(AckStatus::AssignmentNotFound);
    };

    complete_acknowledgement(alert, responder_id, at, index)
}

/// §4.1.2 acknowledgement completion, entered by single-use token.
fn complete_acknowledgement_by_token(
    alert: &mut Alert,
    token: AcknowledgementToken,
    at: DateTime<Utc>,
) -> AcknowledgementOutcome {
    if alert.status == AlertStatus::Acknowledged {
        return AcknowledgementOutcome::resolved(
            AckStatus::AlreadyAcknowledged,
            alert.acknowledged_by.expect("acknowledged alert has a responder"),
            alert.acknowledged_at.expect("acknowledged alert has a timestamp"),
        );
    }

    let Some(assignment) = alert.find_assignment_by_token(token) else {
        return AcknowledgementOutcome::not_found(AckStatus::TokenNotFound);
    };

    let responder_id = assignment.target.responder.id;

    if let Some(acked_at) = assignment.acknowledged_at {
        return AcknowledgementOutcome::resolved(AckStatus::AlreadyAcknowledged, responder_id, acked_at);
    }

    let index = alert
        .assignments
        .iter()
        .position(|a| a.token == token)
        .expect("assignment located by token must have an index");

    complete_acknowledgement(alert, responder_id, at, index)
}

/// Shared tail of §4.1.2: checks the specific assignment for an existing
/// acknowledgement, then performs the sole transition into `Acknowledged`.
fn complete_acknowledgement(
    alert: &mut Alert,
    responder_id: ResponderId,
    at: DateTime<Utc>,
    assignment_index: usize,
) -> AcknowledgementOutcome {
    let assignment = &mut alert.assignments[assignment_index];

    if let Some(acked_at) = assignment.acknowledged_at {
        return AcknowledgementOutcome::resolved(AckStatus::AlreadyAcknowledged, responder_id, acked_at);
    }

    assignment.acknowledged_at = Some(at);
    alert.status = AlertStatus::Acknowledged;
    alert.acknowledged_by = Some(responder_id);
    alert.acknowledged_at = Some(at);

    tracing::info!(
        alert_id = %alert.id,
        responder = %responder_id,
        "alert acknowledged"
    );

    AcknowledgementOutcome::resolved(AckStatus::Acknowledged, responder_id, at)
}

/// §4.1.3 advance algorithm for a single alert. Returns `Some(dispatched)`
/// (possibly empty, for an exhaustion transition) if the alert changed
/// state on this tick, `None` otherwise. Mutation only; dispatch happens
/// outside the lock by the caller using the returned assignments.
fn advance_one(alert: &mut Alert, now: DateTime<Utc>) -> Option<Vec<Assignment>> {
    // §4.1.3 only evaluates pending alerts. Without this check, an
    // acknowledgement landing in the gap between `advance`'s snapshot read
    // and its per-alert lock (§5) — one that resolves the alert via an
    // assignment below the current level — would leave
    // `current_level_index` unchanged and slip past the step-2 guard
    // below, letting this function mutate an already-resolved alert.
    if alert.status != AlertStatus::Pending {
        return None;
    }

    let current_level = alert.current_level_index;
    let at_level: Vec<&Assignment> = alert.assignments_at_level(current_level).collect();

    // Defensive: the acknowledgement path is the sole writer of the
    // `Acknowledged` transition (spec §9 open question). This guard never
    // fires through the public API, which always routes acknowledgement
    // through `complete_acknowledgement`, but is kept to document the
    // invariant rather than silently relying on it.
    if at_level.iter().any(|a| a.is_acknowledged()) {
        return None;
    }

    if at_level.is_empty() {
        return None;
    }

    let level_deadline = at_level.iter().map(|a| a.deadline).max().expect("non-empty");

    if now < level_deadline {
        return None;
    }

    let next_index = current_level + 1;

    if next_index >= alert.policy.levels.len() {
        alert.status = AlertStatus::Exhausted;
        tracing::info!(alert_id = %alert.id, "alert exhausted escalation policy");
        return Some(Vec::new());
    }

    alert.current_level_index = next_index;
    let level = alert.policy.levels[next_index].clone();
    let mut dispatched = Vec::with_capacity(level.targets.len());

    for target in level.targets {
        let assignment = Assignment::new(target, next_index, now, level.acknowledgement_timeout);
        alert.assignments.push(assignment.clone());
        dispatched.push(assignment);
    }

    tracing::info!(
        alert_id = %alert.id,
        level = next_index,
        targets = dispatched.len(),
        "escalated to next level"
    );

    Some(dispatched)
}
