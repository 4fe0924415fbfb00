//! `tims-client`: the request pipeline and typed API wrappers.
//!
//! Responses are classified by a pure function ([`classify`]); the pipeline
//! applies the side effects (session teardown, signals, login redirect).

pub mod api;
pub mod classify;
pub mod config;
pub mod envelope;
pub mod error;
pub mod pipeline;

pub use api::{Ack, Upload};
pub use classify::{Classified, RawOutcome, classify, classify_status};
pub use config::ClientConfig;
pub use envelope::{Envelope, SUCCESS_CODE};
pub use error::RequestError;
pub use pipeline::{RequestPipeline, TRACE_HEADER};
