//! Table rows and the draft → submitted → scored/rejected workflow.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use tims_core::{DataId, DomainError, TableId, validate_required};

use super::Ack;
use crate::error::RequestError;
use crate::pipeline::RequestPipeline;

/// Review state of a row (`0..=3` on the wire).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub enum DataStatus {
    Draft,
    Submitted,
    Scored,
    Rejected,
}

impl DataStatus {
    /// Whether the owner may still edit the row.
    pub fn is_editable(self) -> bool {
        matches!(self, DataStatus::Draft | DataStatus::Rejected)
    }
}

impl TryFrom<i32> for DataStatus {
    type Error = DomainError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(DataStatus::Draft),
            1 => Ok(DataStatus::Submitted),
            2 => Ok(DataStatus::Scored),
            3 => Ok(DataStatus::Rejected),
            other => Err(DomainError::validation(format!("unknown data status {other}"))),
        }
    }
}

impl From<DataStatus> for i32 {
    fn from(status: DataStatus) -> Self {
        match status {
            DataStatus::Draft => 0,
            DataStatus::Submitted => 1,
            DataStatus::Scored => 2,
            DataStatus::Rejected => 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableDataItem {
    pub id: DataId,
    pub table_id: TableId,
    /// Field name → value, shaped by the table's fields.
    #[serde(default)]
    pub data_content: Map<String, Value>,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub review_material: Option<String>,
    #[serde(default)]
    pub status: Option<DataStatus>,
    #[serde(default)]
    pub created_by: Option<String>,
    #[serde(default)]
    pub updated_by: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// Insert (no `id`) or update (with `id`).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveTableDataRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<DataId>,
    pub table_id: TableId,
    pub data_content: Map<String, Value>,
    /// Only honoured for administrators.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review_material: Option<String>,
}

impl SaveTableDataRequest {
    pub fn new(table_id: TableId, data_content: Map<String, Value>) -> Self {
        Self {
            id: None,
            table_id,
            data_content,
            score: None,
            review_material: None,
        }
    }

    pub fn updating(mut self, id: DataId) -> Self {
        self.id = Some(id);
        self
    }

    fn validate(&self) -> Result<(), DomainError> {
        if let Some(score) = self.score {
            if !score.is_finite() || score < 0.0 {
                return Err(DomainError::validation("score must be a non-negative number"));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectDataRequest {
    pub id: DataId,
    pub reject_reason: String,
}

pub async fn table_data(pipeline: &RequestPipeline, table_id: TableId) -> Result<Vec<TableDataItem>, RequestError> {
    pipeline.get(&format!("/table/{table_id}/data")).await
}

/// Save a row; the backend decides its status.
pub async fn save(pipeline: &RequestPipeline, request: &SaveTableDataRequest) -> Result<DataId, RequestError> {
    request.validate()?;
    pipeline.post("/table/data/save", request).await
}

pub async fn save_draft(pipeline: &RequestPipeline, request: &SaveTableDataRequest) -> Result<DataId, RequestError> {
    request.validate()?;
    pipeline.post("/table/data/draft", request).await
}

pub async fn submit(pipeline: &RequestPipeline, request: &SaveTableDataRequest) -> Result<DataId, RequestError> {
    request.validate()?;
    pipeline.post("/table/data/submit", request).await
}

pub async fn delete(pipeline: &RequestPipeline, id: DataId) -> Result<Ack, RequestError> {
    pipeline.delete(&format!("/table/data/{id}")).await
}

pub async fn batch_delete(pipeline: &RequestPipeline, ids: &[DataId]) -> Result<Ack, RequestError> {
    if ids.is_empty() {
        return Err(DomainError::validation("nothing selected to delete").into());
    }
    pipeline.post("/table/data/batch-delete", ids).await
}

/// Send a submitted row back to its owner.
pub async fn reject(pipeline: &RequestPipeline, request: &RejectDataRequest) -> Result<Ack, RequestError> {
    validate_required("reject reason", &request.reject_reason)?;
    pipeline.post("/table/data/reject", request).await
}

/// Row counts keyed by status name, across all users.
pub async fn global_statistics(pipeline: &RequestPipeline) -> Result<BTreeMap<String, i64>, RequestError> {
    pipeline.get("/table/data/global-statistics").await
}

/// Row counts keyed by status name, for the current user.
pub async fn my_status_statistics(pipeline: &RequestPipeline) -> Result<BTreeMap<String, i64>, RequestError> {
    pipeline.get("/table/data/my-status-statistics").await
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn status_uses_wire_integers() {
        assert_eq!(serde_json::to_value(DataStatus::Scored).unwrap(), json!(2));
        assert_eq!(serde_json::from_value::<DataStatus>(json!(3)).unwrap(), DataStatus::Rejected);
        assert!(serde_json::from_value::<DataStatus>(json!(9)).is_err());
    }

    #[test]
    fn only_drafts_and_rejections_are_editable() {
        assert!(DataStatus::Draft.is_editable());
        assert!(DataStatus::Rejected.is_editable());
        assert!(!DataStatus::Submitted.is_editable());
        assert!(!DataStatus::Scored.is_editable());
    }

    #[test]
    fn new_rows_omit_id() {
        let mut content = Map::new();
        content.insert("course".to_string(), json!("Compilers"));
        let request = SaveTableDataRequest::new(TableId::new(7), content.clone());
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({"tableId": 7, "dataContent": {"course": "Compilers"}})
        );

        let update = SaveTableDataRequest::new(TableId::new(7), content).updating(DataId::new(42));
        assert_eq!(serde_json::to_value(&update).unwrap()["id"], json!(42));
    }

    #[test]
    fn negative_scores_are_rejected_locally() {
        let mut request = SaveTableDataRequest::new(TableId::new(1), Map::new());
        request.score = Some(-1.0);
        assert!(request.validate().is_err());
        request.score = Some(8.5);
        assert!(request.validate().is_ok());
    }

    #[test]
    fn row_decodes_with_decimal_score() {
        let row: TableDataItem = serde_json::from_value(json!({
            "id": 42,
            "tableId": 7,
            "dataContent": {"course": "Compilers", "hours": 32},
            "score": 8.5,
            "reviewMaterial": null,
            "status": 2,
            "createdBy": "T1001"
        }))
        .unwrap();
        assert_eq!(row.status, Some(DataStatus::Scored));
        assert_eq!(row.score, Some(8.5));
        assert_eq!(row.data_content["hours"], json!(32));
    }
}
