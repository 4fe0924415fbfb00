//! Table definitions (the dynamic table builder).

use serde::{Deserialize, Serialize};

use tims_core::{DomainError, TableId, validate_required};

use super::Ack;
use super::table_data::TableDataItem;
use crate::error::RequestError;
use crate::pipeline::RequestPipeline;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableField {
    /// Only administrators may fill this column (e.g. the score).
    #[serde(default)]
    pub root: bool,
    pub field_name: String,
    /// Computed by the backend rather than entered.
    #[serde(default)]
    pub calc: bool,
}

impl TableField {
    pub fn new(field_name: impl Into<String>) -> Self {
        Self {
            root: false,
            field_name: field_name.into(),
            calc: false,
        }
    }

    pub fn admin_only(mut self) -> Self {
        self.root = true;
        self
    }
}

/// Create/update payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableDto {
    pub table_full_name: String,
    pub table_alias_name: String,
    pub table_fields: Vec<TableField>,
}

impl TableDto {
    /// Names must be present, and field names present and unique.
    pub fn validate(&self) -> Result<(), DomainError> {
        validate_required("table full name", &self.table_full_name)?;
        validate_required("table alias name", &self.table_alias_name)?;
        if self.table_fields.is_empty() {
            return Err(DomainError::validation("a table needs at least one field"));
        }

        let mut seen = std::collections::BTreeSet::new();
        for field in &self.table_fields {
            validate_required("field name", &field.field_name)?;
            if !seen.insert(field.field_name.trim()) {
                return Err(DomainError::validation(format!(
                    "duplicate field name: {}",
                    field.field_name.trim()
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableListItem {
    pub table_id: TableId,
    pub table_full_name: String,
    #[serde(default)]
    pub table_alias_name: String,
    #[serde(default)]
    pub field_count: u32,
    #[serde(default)]
    pub create_time: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableScoreStatistics {
    pub table_id: TableId,
    pub table_name: String,
    #[serde(default)]
    pub total_users: u32,
    #[serde(default)]
    pub total_data_count: u32,
    #[serde(default)]
    pub total_score: Option<f64>,
    #[serde(default)]
    pub user_scores: Vec<TableUserScore>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableUserScore {
    pub user_id: String,
    pub username: String,
    #[serde(default)]
    pub data_count: u32,
    #[serde(default)]
    pub total_score: Option<f64>,
    #[serde(default)]
    pub avg_score: Option<f64>,
    #[serde(default)]
    pub data_list: Vec<TableDataItem>,
}

pub async fn create_table(pipeline: &RequestPipeline, table: &TableDto) -> Result<Ack, RequestError> {
    table.validate()?;
    pipeline.post("/table/create-table", table).await
}

pub async fn list_tables(pipeline: &RequestPipeline) -> Result<Vec<TableListItem>, RequestError> {
    pipeline.get("/table/list").await
}

pub async fn table_fields(pipeline: &RequestPipeline, table_id: TableId) -> Result<Vec<TableField>, RequestError> {
    pipeline.get(&format!("/table/{table_id}/fields")).await
}

pub async fn update_table(pipeline: &RequestPipeline, table_id: TableId, table: &TableDto) -> Result<Ack, RequestError> {
    table.validate()?;
    pipeline.put(&format!("/table/update-table/{table_id}"), table).await
}

pub async fn delete_table(pipeline: &RequestPipeline, table_id: TableId) -> Result<Ack, RequestError> {
    pipeline.delete(&format!("/table/delete-table/{table_id}")).await
}

pub async fn score_statistics(
    pipeline: &RequestPipeline,
    table_id: TableId,
) -> Result<TableScoreStatistics, RequestError> {
    pipeline.get(&format!("/table/{table_id}/score-statistics")).await
}
