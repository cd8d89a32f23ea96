use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

#[cfg(not(target_arch = "wasm32"))]
use sqlx::FromRow;

pub mod utils;

/// Largest page a client may request from the item list.
pub const MAX_PER_PAGE: u32 = 100;

// --- Auth payloads ---

#[derive(Serialize, Deserialize, Clone, Debug, Validate, ToSchema)]
pub struct Credentials {
    #[validate(length(
        min = 1,
        max = 150,
        message = "Ensure this field has between 1 and 150 characters."
    ))]
    pub username: String,
    #[validate(length(
        min = 1,
        max = 128,
        message = "Ensure this field has between 1 and 128 characters."
    ))]
    pub password: String,
}

/// The public representation of a registered user. The password hash never
/// leaves the server.
#[cfg_attr(not(target_arch = "wasm32"), derive(FromRow))]
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, ToSchema)]
pub struct UserDto {
    pub id: i64,
    pub username: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, ToSchema)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, Validate, ToSchema)]
pub struct RefreshRequest {
    #[validate(length(min = 1, message = "This field may not be blank."))]
    pub refresh: String,
}

// --- Items ---

#[cfg_attr(not(target_arch = "wasm32"), derive(FromRow))]
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, ToSchema)]
pub struct Item {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub quantity: i64,
}

/// Body for creating an item or replacing one wholesale.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Validate, ToSchema)]
pub struct ItemPayload {
    #[validate(length(
        min = 1,
        max = 255,
        message = "Ensure this field has between 1 and 255 characters."
    ))]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[validate(range(min = 0, message = "Ensure this value is greater than or equal to 0."))]
    pub quantity: i64,
}

/// Body for a partial update; absent fields keep their stored value.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Validate, ToSchema)]
pub struct ItemPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(
        min = 1,
        max = 255,
        message = "Ensure this field has between 1 and 255 characters."
    ))]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 0, message = "Ensure this value is greater than or equal to 0."))]
    pub quantity: Option<i64>,
}

impl ItemPatch {
    pub fn apply(self, item: Item) -> Item {
        Item {
            id: item.id,
            name: self.name.unwrap_or(item.name),
            description: self.description.unwrap_or(item.description),
            quantity: self.quantity.unwrap_or(item.quantity),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, Validate, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct Pagination {
    /// 1-based page number.
    #[validate(range(min = 1, message = "Invalid page."))]
    pub page: Option<u32>,
    #[validate(range(min = 1, max = 100, message = "Ensure this value is between 1 and 100."))]
    pub per_page: Option<u32>,
}

impl Pagination {
    /// Returns `(limit, offset)` when paging was requested at all.
    pub fn limit_offset(&self) -> Option<(i64, i64)> {
        if self.page.is_none() && self.per_page.is_none() {
            return None;
        }
        let per_page = self.per_page.unwrap_or(MAX_PER_PAGE).min(MAX_PER_PAGE) as i64;
        let page = self.page.unwrap_or(1).max(1) as i64;
        Some((per_page, (page - 1) * per_page))
    }
}
