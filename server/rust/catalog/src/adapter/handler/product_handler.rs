use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Deserializer};
use validator::Validate;

use crate::adapter::handler::error::AppError;
use crate::adapter::handler::AppState;
use crate::adapter::presenter::response::PaginatedResponse;
use crate::domain::entity::{Product, ProductFilter};
use crate::usecase::create_product::CreateProductInput;
use crate::usecase::list_products::{ListProductsInput, DEFAULT_PAGE_SIZE};
use crate::usecase::update_product::UpdateProductInput;

fn default_active() -> bool {
    true
}

/// 未指定と null を区別する。未指定は None、null は Some(None) になる。
fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Deserialize, Validate)]
pub struct ListProductsQuery {
    #[validate(range(min = 1, message = "page must be >= 1"))]
    pub page: Option<u32>,
    #[validate(range(min = 1, max = 1000, message = "page_size must be between 1 and 1000"))]
    pub page_size: Option<u32>,
    pub sku: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub active: Option<bool>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateProductRequest {
    #[validate(length(min = 1, max = 255, message = "sku must not be empty"))]
    pub sku: String,
    #[validate(length(min = 1, max = 255, message = "name must not be empty"))]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_active")]
    pub active: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProductRequest {
    #[validate(length(min = 1, max = 255, message = "sku must not be empty"))]
    pub sku: Option<String>,
    #[validate(length(min = 1, max = 255, message = "name must not be empty"))]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    pub active: Option<bool>,
}

pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ListProductsQuery>,
) -> Result<Json<PaginatedResponse<Product>>, AppError> {
    query.validate()?;
    let input = ListProductsInput {
        filter: ProductFilter {
            sku: query.sku,
            name: query.name,
            description: query.description,
            active: query.active,
        },
        page: query.page.unwrap_or(1),
        page_size: query.page_size.unwrap_or(DEFAULT_PAGE_SIZE),
    };
    let output = state.list_products_uc.execute(&input).await?;
    Ok(Json(output.into()))
}

pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Product>, AppError> {
    let product = state.get_product_uc.execute(id).await?;
    Ok(Json(product))
}

pub async fn create_product(
    State(state): State<AppState>,
    Json(req): Json<CreateProductRequest>,
) -> Result<(StatusCode, Json<Product>), AppError> {
    req.validate()?;
    let input = CreateProductInput {
        sku: req.sku,
        name: req.name,
        description: req.description,
        active: req.active,
    };
    let product = state.create_product_uc.execute(&input).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

pub async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateProductRequest>,
) -> Result<Json<Product>, AppError> {
    req.validate()?;
    let input = UpdateProductInput {
        sku: req.sku,
        name: req.name,
        description: req.description,
        active: req.active,
    };
    let product = state.update_product_uc.execute(id, &input).await?;
    Ok(Json(product))
}

pub async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    state.delete_product_uc.execute(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_all_products(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    state.delete_all_products_uc.execute().await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_request_distinguishes_null_from_missing() {
        let missing: UpdateProductRequest = serde_json::from_str(r#"{"name":"x"}"#).unwrap();
        assert_eq!(missing.description, None);

        let null: UpdateProductRequest = serde_json::from_str(r#"{"description":null}"#).unwrap();
        assert_eq!(null.description, Some(None));

        let set: UpdateProductRequest =
            serde_json::from_str(r#"{"description":"blue"}"#).unwrap();
        assert_eq!(set.description, Some(Some("blue".to_string())));
    }

    #[test]
    fn create_request_rejects_empty_sku() {
        let req: CreateProductRequest =
            serde_json::from_str(r#"{"sku":"","name":"Widget"}"#).unwrap();
        let err = req.validate().unwrap_err();
        assert!(err.field_errors().contains_key("sku"));
    }

    #[test]
    fn create_request_defaults_to_active() {
        let req: CreateProductRequest =
            serde_json::from_str(r#"{"sku":"A1","name":"Widget"}"#).unwrap();
        assert!(req.active);
        assert!(req.validate().is_ok());
    }

    #[test]
    fn list_query_rejects_oversized_page() {
        let query = ListProductsQuery {
            page: Some(1),
            page_size: Some(1001),
            sku: None,
            name: None,
            description: None,
            active: None,
        };
        assert!(query.validate().is_err());
    }
}
