use serde::Serialize;
use utoipa::ToSchema;

use crate::models::Product;

/// Fields collected from the multipart product form. Create requires
/// name/price/stock/brand; update overwrites the row with the same set.
#[derive(Debug, Default)]
pub struct ProductForm {
    pub name: Option<String>,
    pub description: Option<String>,
    pub brand: Option<String>,
    pub price: Option<i64>,
    pub stock: Option<i32>,
    pub image: Option<UploadedImage>,
}

#[derive(Debug)]
pub struct UploadedImage {
    pub filename: String,
    pub data: Vec<u8>,
}

#[derive(Serialize, ToSchema)]
#[serde(transparent)]
pub struct ProductList {
    #[schema(value_type = Vec<Product>)]
    pub items: Vec<Product>,
}
