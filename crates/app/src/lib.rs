//! `tims-app`: the boundary between the client core and a user.
//!
//! Wires the session, navigator and pipeline together, presents signals as
//! notifications and exposes the command set used by the `tims` binary.

pub mod commands;
pub mod notify;
pub mod state;

pub use commands::{Command, USAGE, run};
pub use notify::{Level, Notification, Notifier, notification_for};
pub use state::AppState;
