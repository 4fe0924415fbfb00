//! User administration (requires `user:manage`).

use serde::{Deserialize, Serialize};

use tims_core::{RoleId, WorkId, validate_email, validate_password, validate_required, validate_work_id};

use super::Ack;
use crate::error::RequestError;
use crate::pipeline::RequestPipeline;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserManagement {
    pub id: WorkId,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role_ids: Vec<RoleId>,
    #[serde(default)]
    pub role_names: Vec<String>,
    #[serde(default)]
    pub create_time: Option<String>,
    #[serde(default)]
    pub update_time: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    pub id: String,
    pub username: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    pub role_ids: Vec<RoleId>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    pub id: String,
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub role_ids: Vec<RoleId>,
    /// Only sent when the administrator resets the password.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_password: Option<String>,
}

fn validate_optional_email(email: Option<&str>) -> Result<(), RequestError> {
    match email.filter(|e| !e.trim().is_empty()) {
        Some(email) => Ok(validate_email(email)?),
        None => Ok(()),
    }
}

pub async fn list_users(pipeline: &RequestPipeline) -> Result<Vec<UserManagement>, RequestError> {
    pipeline.get("/user/management/list").await
}

pub async fn create_user(pipeline: &RequestPipeline, request: &CreateUserRequest) -> Result<Ack, RequestError> {
    validate_work_id(&request.id)?;
    validate_required("username", &request.username)?;
    validate_password(&request.password)?;
    validate_optional_email(request.email.as_deref())?;
    pipeline.post("/user/management/create", request).await
}

pub async fn update_user(pipeline: &RequestPipeline, request: &UpdateUserRequest) -> Result<Ack, RequestError> {
    validate_work_id(&request.id)?;
    validate_required("username", &request.username)?;
    validate_optional_email(request.email.as_deref())?;
    if let Some(password) = request.new_password.as_deref() {
        validate_password(password)?;
    }
    pipeline.post("/user/management/update", request).await
}

pub async fn delete_user(pipeline: &RequestPipeline, id: &WorkId) -> Result<Ack, RequestError> {
    pipeline
        .delete(&format!("/user/management/delete/{}", urlencoding::encode(id.as_str())))
        .await
}
