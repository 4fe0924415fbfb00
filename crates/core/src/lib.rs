//! `tims-core`: shared client primitives.
//!
//! Identifiers, the domain error model and client-side input validation.
//! Nothing in here performs IO.

pub mod error;
pub mod id;
pub mod validate;

pub use error::{DomainError, DomainResult};
pub use id::{AttachmentId, DataId, RoleId, TableId, WorkId};
pub use validate::{validate_email, validate_password, validate_required, validate_work_id};
