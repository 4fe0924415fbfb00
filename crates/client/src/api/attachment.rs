//! Review material attachments.

use reqwest::multipart::Form;
use serde::{Deserialize, Serialize};

use tims_core::{AttachmentId, validate_required};

use super::{Ack, Upload};
use crate::error::RequestError;
use crate::pipeline::RequestPipeline;

/// Category used for files attached to table rows.
pub const TABLE_DATA_CATEGORY: &str = "table-data";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub attachment_id: AttachmentId,
    pub file_name: String,
    #[serde(default)]
    pub file_size: u64,
    #[serde(default)]
    pub file_path: Option<String>,
    #[serde(default)]
    pub file_url: Option<String>,
    #[serde(default)]
    pub upload_time: Option<String>,
}

/// `related_id` links the file to, e.g., a table row.
pub async fn upload(
    pipeline: &RequestPipeline,
    file: Upload,
    category: &str,
    related_id: Option<&str>,
) -> Result<Attachment, RequestError> {
    validate_required("file name", &file.file_name)?;
    validate_required("category", category)?;

    let mut form = Form::new()
        .part("file", file.into_part())
        .text("category", category.to_string());
    if let Some(related_id) = related_id.filter(|r| !r.trim().is_empty()) {
        form = form.text("relatedId", related_id.to_string());
    }

    pipeline.post_multipart("/table/attachment/upload", form).await
}

pub async fn get(pipeline: &RequestPipeline, id: &AttachmentId) -> Result<Attachment, RequestError> {
    pipeline
        .get(&format!("/table/attachment/{}", urlencoding::encode(id.as_str())))
        .await
}

pub async fn delete(pipeline: &RequestPipeline, id: &AttachmentId) -> Result<Ack, RequestError> {
    pipeline
        .delete(&format!("/table/attachment/{}", urlencoding::encode(id.as_str())))
        .await
}
