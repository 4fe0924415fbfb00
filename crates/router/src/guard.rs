//! The navigation guard: run before every route transition.

use serde::Serialize;
use tims_auth::{PermissionSet, Requirement, explain_access};

use crate::route::{ResolvedRoute, RouteTable};

/// Query parameter carrying the originally requested path.
pub const REDIRECT_PARAM: &str = "redirect";

/// Exactly one of these per evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum GuardDecision {
    Allow,
    /// `redirect` is the full path to come back to after login.
    RedirectToLogin { redirect: String },
    RedirectToHome,
}

impl GuardDecision {
    /// Where the transition should go instead, if anywhere.
    pub fn target(&self, table: &RouteTable) -> Option<String> {
        match self {
            GuardDecision::Allow => None,
            GuardDecision::RedirectToLogin { redirect } => Some(login_url(table, redirect)),
            GuardDecision::RedirectToHome => Some(table.home_path().to_string()),
        }
    }
}

/// The login path with the return path attached as a query parameter.
pub fn login_url(table: &RouteTable, redirect: &str) -> String {
    format!(
        "{}?{}={}",
        table.login_path(),
        REDIRECT_PARAM,
        urlencoding::encode(redirect)
    )
}

/// Read the return path back out of a login URL.
pub fn redirect_target(full_path: &str) -> Option<String> {
    let (_, query) = full_path.split_once('?')?;
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(k, _)| *k == REDIRECT_PARAM)
        .and_then(|(_, v)| urlencoding::decode(v).ok())
        .map(|v| v.into_owned())
}

/// Pure guard over route metadata and a snapshot of the session.
#[derive(Debug, Clone, Copy)]
pub struct NavigationGuard<'a> {
    table: &'a RouteTable,
}

impl<'a> NavigationGuard<'a> {
    pub fn new(table: &'a RouteTable) -> Self {
        Self { table }
    }

    pub fn evaluate(&self, target: &ResolvedRoute, logged_in: bool, permissions: &PermissionSet) -> GuardDecision {
        if target.requires_auth && !logged_in {
            tracing::debug!(path = %target.full_path, "guard: login required");
            return GuardDecision::RedirectToLogin {
                redirect: target.full_path.clone(),
            };
        }

        if self.table.is_login(target) && logged_in {
            tracing::debug!("guard: already logged in, leaving login page");
            return GuardDecision::RedirectToHome;
        }

        if target.requires_auth && !target.required_permissions.is_empty() {
            let explanation = explain_access(permissions, &target.required_permissions, Requirement::Any);
            if !explanation.granted {
                tracing::info!(
                    route = %target.name,
                    reason = %explanation.reason,
                    "guard: access downgraded to home"
                );
                return GuardDecision::RedirectToHome;
            }
        }

        GuardDecision::Allow
    }
}
