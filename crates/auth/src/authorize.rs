//! Access decisions with an explanation attached.
//!
//! The navigation guard only needs a yes/no, but a denied route is silently
//! downgraded to the home page, so the reason has to be recoverable from the
//! logs. [`explain_access`] produces that record.

use serde::Serialize;

use crate::permissions::{Permission, PermissionSet};

/// How a set of required tags is combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Requirement {
    /// At least one tag must be held.
    Any,
    /// Every tag must be held.
    All,
}

/// Detailed explanation of an access decision.
#[derive(Debug, Clone, Serialize)]
pub struct AccessExplanation {
    pub requirement: Requirement,
    pub required: Vec<String>,
    pub granted: bool,
    /// Human-readable reason for the decision.
    pub reason: String,
    /// Required tags the holder does not have (empty when granted).
    pub missing: Vec<String>,
}

/// Decide whether `held` satisfies `required` and say why.
pub fn explain_access(
    held: &PermissionSet,
    required: &[Permission],
    requirement: Requirement,
) -> AccessExplanation {
    let required_strs: Vec<String> = required.iter().map(|p| p.as_str().to_string()).collect();

    let granted = match requirement {
        Requirement::Any => held.has_any(&required_strs),
        Requirement::All => held.has_all(&required_strs),
    };

    let missing: Vec<String> = if granted {
        Vec::new()
    } else {
        required_strs.iter().filter(|t| !held.has(t)).cloned().collect()
    };

    let reason = if required_strs.is_empty() {
        "no permissions required".to_string()
    } else if granted {
        match requirement {
            Requirement::Any => "holder has at least one required permission".to_string(),
            Requirement::All => "holder has every required permission".to_string(),
        }
    } else {
        format!("missing required permission(s): {}", missing.join(", "))
    };

    AccessExplanation {
        requirement,
        required: required_strs,
        granted,
        reason,
        missing,
    }
}
