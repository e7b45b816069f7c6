//! Approval lifecycle shared by bank change and profile change requests.

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Status of a change request awaiting review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
}

/// Reviewer decision on a change request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestAction {
    Approve,
    Reject,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "PENDING",
            RequestStatus::Approved => "APPROVED",
            RequestStatus::Rejected => "REJECTED",
        }
    }

    /// Approved and rejected requests are never reviewed again
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RequestStatus::Pending)
    }

    /// Transition table for requests
    pub fn apply(self, action: RequestAction) -> CoreResult<RequestStatus> {
        match (self, action) {
            (RequestStatus::Pending, RequestAction::Approve) => Ok(RequestStatus::Approved),
            (RequestStatus::Pending, RequestAction::Reject) => Ok(RequestStatus::Rejected),
            (from, action) => Err(CoreError::invalid_transition("request", from, action)),
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for RequestStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "PENDING" => Ok(RequestStatus::Pending),
            "APPROVED" => Ok(RequestStatus::Approved),
            "REJECTED" => Ok(RequestStatus::Rejected),
            _ => Err(CoreError::UnknownStatus {
                entity: "request",
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for RequestAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestAction::Approve => write!(f, "approve"),
            RequestAction::Reject => write!(f, "reject"),
        }
    }
}
