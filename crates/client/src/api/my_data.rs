//! The current user's rows across all tables.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use tims_core::{DataId, TableId};

use super::table_data::DataStatus;
use crate::error::RequestError;
use crate::pipeline::RequestPipeline;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDataItem {
    pub id: DataId,
    pub table_id: TableId,
    #[serde(default)]
    pub table_name: String,
    #[serde(default)]
    pub data_content: Map<String, Value>,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub review_material: Option<String>,
    #[serde(default)]
    pub status: Option<DataStatus>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataByTable {
    pub table_id: TableId,
    #[serde(default)]
    pub table_name: String,
    #[serde(default)]
    pub data_list: Vec<UserDataItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDataStatistics {
    #[serde(default)]
    pub total_count: u32,
    #[serde(default)]
    pub table_count: u32,
    #[serde(default)]
    pub total_score: Option<f64>,
    #[serde(default)]
    pub avg_score: Option<f64>,
    #[serde(default)]
    pub data_by_table: Vec<DataByTable>,
}

impl UserDataStatistics {
    /// Rows still waiting for a score.
    pub fn pending(&self) -> impl Iterator<Item = &UserDataItem> {
        self.data_by_table
            .iter()
            .flat_map(|t| t.data_list.iter())
            .filter(|item| item.status == Some(DataStatus::Submitted))
    }
}

pub async fn my_statistics(pipeline: &RequestPipeline) -> Result<UserDataStatistics, RequestError> {
    pipeline.get("/table/data/my-statistics").await
}
