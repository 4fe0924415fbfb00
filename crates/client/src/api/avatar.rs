//! Avatars. Changing your own avatar also updates the session identity.

use reqwest::multipart::Form;
use serde::{Deserialize, Serialize};

use tims_auth::SessionPatch;
use tims_core::{WorkId, validate_required};

use super::{Ack, Upload};
use crate::error::RequestError;
use crate::pipeline::RequestPipeline;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAvatar {
    pub user_id: WorkId,
    #[serde(default)]
    pub avatar_path: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AvatarUrlRequest<'a> {
    avatar_url: &'a str,
}

pub async fn my_avatar(pipeline: &RequestPipeline) -> Result<UserAvatar, RequestError> {
    pipeline.get("/user/avatar").await
}

pub async fn user_avatar(pipeline: &RequestPipeline, user_id: &WorkId) -> Result<UserAvatar, RequestError> {
    pipeline
        .get(&format!("/user/avatar/{}", urlencoding::encode(user_id.as_str())))
        .await
}

pub async fn upload_avatar(pipeline: &RequestPipeline, file: Upload) -> Result<UserAvatar, RequestError> {
    validate_required("file name", &file.file_name)?;
    let form = Form::new().part("file", file.into_part());
    let avatar: UserAvatar = pipeline.post_multipart("/user/avatar/upload", form).await?;
    remember_avatar(pipeline, avatar.avatar_url.clone());
    Ok(avatar)
}

pub async fn set_avatar_url(pipeline: &RequestPipeline, avatar_url: &str) -> Result<UserAvatar, RequestError> {
    validate_required("avatar url", avatar_url)?;
    let avatar: UserAvatar = pipeline
        .post("/user/avatar/url", &AvatarUrlRequest { avatar_url })
        .await?;
    remember_avatar(pipeline, avatar.avatar_url.clone());
    Ok(avatar)
}

pub async fn delete_avatar(pipeline: &RequestPipeline) -> Result<Ack, RequestError> {
    let ack = pipeline.delete("/user/avatar").await?;
    remember_avatar(pipeline, None);
    Ok(ack)
}

fn remember_avatar(pipeline: &RequestPipeline, avatar: Option<String>) {
    let patch = SessionPatch {
        avatar: Some(avatar),
        ..SessionPatch::default()
    };
    if let Err(e) = pipeline.session().update_session(patch) {
        tracing::warn!(error = %e, "avatar changed but session not persisted");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn avatar_url_request_uses_camel_case() {
        let body = serde_json::to_value(AvatarUrlRequest {
            avatar_url: "https://cdn.example/a.png",
        })
        .unwrap();
        assert_eq!(body, json!({"avatarUrl": "https://cdn.example/a.png"}));
    }

    #[test]
    fn avatar_without_image_decodes() {
        let avatar: UserAvatar =
            serde_json::from_value(json!({"userId": "T1001", "avatarPath": null, "avatarUrl": null})).unwrap();
        assert_eq!(avatar.user_id.as_str(), "T1001");
        assert!(avatar.avatar_url.is_none());
    }
}
