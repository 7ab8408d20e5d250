use serde::Serialize;

use crate::domain::entity::Product;
use crate::usecase::list_products::ListProductsOutput;

#[derive(Debug, Serialize)]
pub struct PaginatedResponse<T: Serialize> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u64,
}

impl From<ListProductsOutput> for PaginatedResponse<Product> {
    fn from(output: ListProductsOutput) -> Self {
        Self {
            items: output.items,
            total: output.total,
            page: output.page,
            page_size: output.page_size,
            total_pages: output.total_pages,
        }
    }
}

/// UploadResponse はアップロード受付時に返す本文。
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub job_id: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    pub request_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}
