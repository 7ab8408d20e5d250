use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use validator::ValidationErrors;

use crate::adapter::presenter::response::{ErrorDetail, ErrorResponse};
use crate::usecase::create_product::CreateProductError;
use crate::usecase::delete_product::DeleteProductError;
use crate::usecase::get_import_progress::GetImportProgressError;
use crate::usecase::get_product::GetProductError;
use crate::usecase::list_products::ListProductsError;
use crate::usecase::manage_webhooks::WebhookError;
use crate::usecase::submit_import::SubmitImportError;
use crate::usecase::update_product::UpdateProductError;

#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub code: String,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

impl AppError {
    fn new(status: StatusCode, code: &str, message: &str) -> Self {
        Self {
            status,
            code: code.to_string(),
            message: message.to_string(),
            details: None,
        }
    }

    pub fn not_found(code: &str, message: &str) -> Self {
        Self::new(StatusCode::NOT_FOUND, code, message)
    }

    pub fn bad_request(code: &str, message: &str) -> Self {
        Self::new(StatusCode::BAD_REQUEST, code, message)
    }

    pub fn conflict(code: &str, message: &str) -> Self {
        Self::new(StatusCode::CONFLICT, code, message)
    }

    pub fn internal(code: &str, message: &str) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, code, message)
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(code = %self.code, message = %self.message, "request failed");
        }
        let body = ErrorResponse {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
                request_id: None,
                details: self.details,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::internal("SVC_CATALOG_INTERNAL_ERROR", &err.to_string())
    }
}

impl From<ValidationErrors> for AppError {
    fn from(err: ValidationErrors) -> Self {
        let fields: Vec<String> = err
            .field_errors()
            .keys()
            .map(|field| field.to_string())
            .collect();
        Self::bad_request("SVC_CATALOG_VALIDATION_ERROR", &err.to_string())
            .with_details(serde_json::json!({ "fields": fields }))
    }
}

fn internal(message: &str) -> AppError {
    AppError::internal("SVC_CATALOG_INTERNAL_ERROR", message)
}

fn product_not_found(id: i64) -> AppError {
    AppError::not_found(
        "SVC_CATALOG_PRODUCT_NOT_FOUND",
        &format!("Product {id} not found"),
    )
}

impl From<ListProductsError> for AppError {
    fn from(err: ListProductsError) -> Self {
        match err {
            ListProductsError::InvalidPagination(msg) => {
                AppError::bad_request("SVC_CATALOG_INVALID_PAGINATION", &msg)
            }
            ListProductsError::Internal(msg) => internal(&msg),
        }
    }
}

impl From<GetProductError> for AppError {
    fn from(err: GetProductError) -> Self {
        match err {
            GetProductError::NotFound(id) => product_not_found(id),
            GetProductError::Internal(msg) => internal(&msg),
        }
    }
}

impl From<CreateProductError> for AppError {
    fn from(err: CreateProductError) -> Self {
        match err {
            CreateProductError::Validation(msg) => {
                AppError::bad_request("SVC_CATALOG_VALIDATION_ERROR", &msg)
            }
            CreateProductError::Conflict(_) => {
                AppError::conflict("SVC_CATALOG_SKU_CONFLICT", &err.to_string())
            }
            CreateProductError::Internal(msg) => internal(&msg),
        }
    }
}

impl From<UpdateProductError> for AppError {
    fn from(err: UpdateProductError) -> Self {
        match err {
            UpdateProductError::NotFound(id) => product_not_found(id),
            UpdateProductError::Validation(msg) => {
                AppError::bad_request("SVC_CATALOG_VALIDATION_ERROR", &msg)
            }
            UpdateProductError::Conflict(_) => {
                AppError::conflict("SVC_CATALOG_SKU_CONFLICT", &err.to_string())
            }
            UpdateProductError::Internal(msg) => internal(&msg),
        }
    }
}

impl From<DeleteProductError> for AppError {
    fn from(err: DeleteProductError) -> Self {
        match err {
            DeleteProductError::NotFound(id) => product_not_found(id),
            DeleteProductError::Internal(msg) => internal(&msg),
        }
    }
}

impl From<WebhookError> for AppError {
    fn from(err: WebhookError) -> Self {
        match err {
            WebhookError::NotFound(id) => AppError::not_found(
                "SVC_CATALOG_WEBHOOK_NOT_FOUND",
                &format!("Webhook {id} not found"),
            ),
            WebhookError::Validation(msg) => {
                AppError::bad_request("SVC_CATALOG_VALIDATION_ERROR", &msg)
            }
            WebhookError::Internal(msg) => internal(&msg),
        }
    }
}

impl From<SubmitImportError> for AppError {
    fn from(err: SubmitImportError) -> Self {
        match err {
            SubmitImportError::InvalidFile(msg) => {
                AppError::bad_request("SVC_CATALOG_INVALID_FILE", &msg)
            }
        }
    }
}

impl From<GetImportProgressError> for AppError {
    fn from(err: GetImportProgressError) -> Self {
        AppError::not_found("SVC_CATALOG_JOB_NOT_FOUND", &err.to_string())
    }
}
