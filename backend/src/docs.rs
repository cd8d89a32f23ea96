use axum::Json;
use common::{Credentials, Item, ItemPatch, ItemPayload, RefreshRequest, TokenPair, UserDto};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};

use crate::web_server::HealthResponse;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Inventory API",
        version = env!("CARGO_PKG_VERSION"),
        description = "Items CRUD behind bearer tokens, plus user registration.\n\nItem endpoints need `Authorization: Bearer <access>` from `POST /api/auth/token/`."
    ),
    paths(
        crate::web_server::health,
        crate::auth::register,
        crate::auth::login,
        crate::auth::refresh,
        crate::auth::logout,
        crate::items::list_items,
        crate::items::create_item,
        crate::items::get_item,
        crate::items::update_item,
        crate::items::patch_item,
        crate::items::delete_item,
    ),
    components(schemas(
        Credentials,
        UserDto,
        TokenPair,
        RefreshRequest,
        Item,
        ItemPayload,
        ItemPatch,
        HealthResponse,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "health", description = "Liveness"),
        (name = "auth", description = "Registration and tokens"),
        (name = "items", description = "Inventory items"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
