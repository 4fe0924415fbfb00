//! `tims-router`: route table, navigation guard and navigator.
//!
//! Decides whether a transition may happen given the session; rendering the
//! destination is someone else's job.

pub mod error;
pub mod guard;
pub mod menu;
pub mod navigator;
pub mod route;

pub use error::NavigationError;
pub use guard::{GuardDecision, NavigationGuard, REDIRECT_PARAM, login_url, redirect_target};
pub use menu::{BackendRoute, MenuItem, RouteMeta, transform_routes_to_menu};
pub use navigator::{Arrival, Location, MAX_REDIRECTS, Navigator};
pub use route::{ResolvedRoute, RouteDescriptor, RouteTable};
