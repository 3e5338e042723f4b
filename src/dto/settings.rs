use serde::Deserialize;
use utoipa::ToSchema;

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateSettingsRequest {
    pub store_name: String,
    pub store_email: Option<String>,
    pub contact_number: Option<String>,
    pub address: Option<String>,
}
