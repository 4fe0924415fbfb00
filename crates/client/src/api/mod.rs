//! Thin typed wrappers over the backend endpoints.
//!
//! Each function validates obvious input locally, calls the pipeline and
//! decodes `data`. Failures are already classified and signalled by the time
//! they reach the caller.

pub mod attachment;
pub mod avatar;
pub mod my_data;
pub mod table;
pub mod table_data;
pub mod user;
pub mod user_management;

use reqwest::multipart::Part;

/// Endpoints that answer with a bare confirmation message (or nothing).
pub type Ack = Option<String>;

/// A file picked for upload.
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl Upload {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }

    pub(crate) fn into_part(self) -> Part {
        Part::bytes(self.bytes).file_name(self.file_name)
    }
}
