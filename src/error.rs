//! Configuration-error class from spec §7. Lookup misses and late
//! acknowledgement are never errors — see [`crate::model::AcknowledgementOutcome`].

use crate::model::Priority;
use thiserror::Error;

#[derive(Debug, Error, Eq, PartialEq)]
pub enum ServiceError {
    #[error("no escalation policy configured for priority {0}")]
    NoPolicyForPriority(Priority),

    #[error("alert message must not be blank")]
    BlankMessage,

    #[error("responder {0} must not be blank")]
    BlankResponderField(&'static str),

    #[error("escalation level must have at least one target")]
    EmptyTargetList,

    #[error("escalation level acknowledgement timeout must be positive")]
    NonPositiveTimeout,

    #[error("escalation policy must have at least one level")]
    EmptyPolicy,
}
