//! Domain model: responders, targets, escalation policies, alerts and
//! assignments, and the acknowledgement outcome returned by the service.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! uuid_id {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, Eq, Hash, PartialEq, Serialize, Deserialize)]
        pub struct $name(Uuid);

        impl $name {
            pub fn new() -> Self {
                $name(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok($name(Uuid::parse_str(s)?))
            }
        }
    };
}

uuid_id!(AlertId);
uuid_id!(AssignmentId);
uuid_id!(ResponderId);
uuid_id!(AcknowledgementToken);

/// Priority of an incoming alert; keys the escalation policy lookup.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Critical,
    High,
    Low,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Priority::Critical => "critical",
            Priority::High => "high",
            Priority::Low => "low",
        };
        write!(f, "{s}")
    }
}

/// Delivery channel of a target inside an escalation level.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Email,
    Sms,
    Push,
    Chat,
    Voice,
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Channel::Email => "email",
            Channel::Sms => "sms",
            Channel::Push => "push",
            Channel::Chat => "chat",
            Channel::Voice => "voice",
        };
        write!(f, "{s}")
    }
}

/// An on-call person. Created externally, immutable once constructed.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Responder {
    pub id: ResponderId,
    pub name: String,
    pub contact: String,
}

impl Responder {
    pub fn new(
        id: ResponderId,
        name: impl Into<String>,
        contact: impl Into<String>,
    ) -> Result<Self, crate::error::ServiceError> {
        let name = name.into();
        let contact = contact.into();
        if name.trim().is_empty() {
            return Err(crate::error::ServiceError::BlankResponderField("name"));
        }
        if contact.trim().is_empty() {
            return Err(crate::error::ServiceError::BlankResponderField("contact"));
        }
        Ok(Responder { id, name, contact })
    }
}

/// A (responder, channel, address) triple embedded in an escalation level.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Target {
    pub responder: Responder,
    pub channel: Channel,
    pub address: String,
}

impl Target {
    /// Builds a target whose address defaults to the responder's contact.
    pub fn new(responder: Responder, channel: Channel) -> Self {
        let address = responder.contact.clone();
        Target {
            responder,
            channel,
            address,
        }
    }

    pub fn with_address(responder: Responder, channel: Channel, address: impl Into<String>) -> Self {
        Target {
            responder,
            channel,
            address: address.into(),
        }
    }
}

/// One step of a policy: a set of targets paged together, and the
/// timeout after which the engine escalates to the next level.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct EscalationLevel {
    pub targets: Vec<Target>,
    #[serde(with = "duration_seconds")]
    pub acknowledgement_timeout: Duration,
}

impl EscalationLevel {
    pub fn new(
        targets: Vec<Target>,
        acknowledgement_timeout: Duration,
    ) -> Result<Self, crate::error::ServiceError> {
        if targets.is_empty() {
            return Err(crate::error::ServiceError::EmptyTargetList);
        }
        if acknowledgement_timeout <= Duration::zero() {
            return Err(crate::error::ServiceError::NonPositiveTimeout);
        }
        Ok(EscalationLevel {
            targets,
            acknowledgement_timeout,
        })
    }
}

/// An ordered sequence of levels used for alerts of a given priority.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct EscalationPolicy {
    pub levels: Vec<EscalationLevel>,
}

impl EscalationPolicy {
    pub fn new(levels: Vec<EscalationLevel>) -> Result<Self, crate::error::ServiceError> {
        if levels.is_empty() {
            return Err(crate::error::ServiceError::EmptyPolicy);
        }
        Ok(EscalationPolicy { levels })
    }
}

/// Records that a particular target was paged at a particular level.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub id: AssignmentId,
    pub target: Target,
    pub level_index: usize,
    pub dispatched_at: DateTime<Utc>,
    pub deadline: DateTime<Utc>,
    pub token: AcknowledgementToken,
    pub acknowledged_at: Option<DateTime<Utc>>,
}

impl Assignment {
    pub fn new(
        target: Target,
        level_index: usize,
        dispatched_at: DateTime<Utc>,
        timeout: Duration,
    ) -> Self {
        Assignment {
            id: AssignmentId::new(),
            target,
            level_index,
            dispatched_at,
            deadline: dispatched_at + timeout,
            token: AcknowledgementToken::new(),
            acknowledged_at: None,
        }
    }

    pub fn is_acknowledged(&self) -> bool {
        self.acknowledged_at.is_some()
    }
}

/// Lifecycle status of an alert.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertStatus {
    Pending,
    Acknowledged,
    Exhausted,
}

/// A single incident record tracked by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: AlertId,
    pub message: String,
    pub priority: Priority,
    pub created_at: DateTime<Utc>,
    pub policy: EscalationPolicy,
    pub assignments: Vec<Assignment>,
    pub status: AlertStatus,
    pub current_level_index: usize,
    pub acknowledged_by: Option<ResponderId>,
    pub acknowledged_at: Option<DateTime<Utc>>,
}

impl Alert {
    pub fn new(
        message: String,
        priority: Priority,
        created_at: DateTime<Utc>,
        policy: EscalationPolicy,
    ) -> Self {
        Alert {
            id: AlertId::new(),
            message,
            priority,
            created_at,
            policy,
            assignments: Vec::new(),
            status: AlertStatus::Pending,
            current_level_index: 0,
            acknowledged_by: None,
            acknowledged_at: None,
        }
    }

    pub fn assignments_at_level(&self, level_index: usize) -> impl Iterator<Item = &Assignment> {
        self.assignments
            .iter()
            .filter(move |a| a.level_index == level_index)
    }

    pub fn find_assignment_by_token(&self, token: AcknowledgementToken) -> Option<&Assignment> {
        self.assignments.iter().find(|a| a.token == token)
    }
}

/// The status of an acknowledgement attempt.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AckStatus {
    Acknowledged,
    AlreadyAcknowledged,
    AlertNotFound,
    AssignmentNotFound,
    TokenNotFound,
}

/// Returned by the two acknowledgement entry points.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct AcknowledgementOutcome {
    pub status: AckStatus,
    pub responder: Option<ResponderId>,
    pub at: Option<DateTime<Utc>>,
}

impl AcknowledgementOutcome {
    pub fn not_found(status: AckStatus) -> Self {
        AcknowledgementOutcome {
            status,
            responder: None,
            at: None,
        }
    }

    pub fn resolved(status: AckStatus, responder: ResponderId, at: DateTime<Utc>) -> Self {
        AcknowledgementOutcome {
            status,
            responder: Some(responder),
            at: Some(at),
        }
    }
}

/// `chrono::Duration` has no built-in serde support; store as whole seconds.
mod duration_seconds {
    use chrono::Duration;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, s: S) -> Result<S::Ok, S::Error> {
        duration.num_seconds().serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = i64::deserialize(d)?;
        Ok(Duration::seconds(secs))
    }
}
