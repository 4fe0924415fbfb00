//! `tims-auth`: client-side authentication state and permission checks.
//!
//! This crate is intentionally decoupled from HTTP and navigation: it owns
//! the session and answers permission questions, nothing more.

pub mod authorize;
pub mod permissions;
pub mod session;
pub mod storage;

pub use authorize::{AccessExplanation, Requirement, explain_access};
pub use permissions::{Permission, PermissionSet, tags};
pub use session::{Identity, RestoreOutcome, Session, SessionError, SessionPatch, SessionStore};
pub use storage::{FileStorage, MemoryStorage, SESSION_KEY, SessionStorage, StorageError, TOKEN_KEY};
