use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use common::{Item, ItemPatch, ItemPayload, Pagination};

use crate::error::AppError;
use crate::extractors::{AuthUser, ValidatedJson, ValidatedPath, ValidatedQuery};
use crate::web_server::AppState;

/// List items ordered by id. Without `page`/`per_page` the full list is returned.
#[utoipa::path(
    get,
    path = "/api/items/",
    tag = "items",
    params(Pagination),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "All items, or the requested page", body = [Item]),
        (status = 400, description = "Invalid paging parameters"),
        (status = 401, description = "Authentication required"),
    )
)]
pub async fn list_items(
    State(state): State<AppState>,
    user: AuthUser,
    ValidatedQuery(pagination): ValidatedQuery<Pagination>,
) -> Result<Json<Vec<Item>>, AppError> {
    tracing::info!("User {} listing items ({:?})", user.username, pagination);

    let items: Vec<Item> = match pagination.limit_offset() {
        Some((limit, offset)) => {
            sqlx::query_as(
                "SELECT id, name, description, quantity FROM items ORDER BY id LIMIT $1 OFFSET $2",
            )
            .bind(limit)
            .bind(offset)
            .fetch_all(&state.db_pool)
            .await?
        }
        None => {
            sqlx::query_as("SELECT id, name, description, quantity FROM items ORDER BY id")
                .fetch_all(&state.db_pool)
                .await?
        }
    };

    Ok(Json(items))
}

#[utoipa::path(
    post,
    path = "/api/items/",
    tag = "items",
    request_body = ItemPayload,
    security(("bearer_auth" = [])),
    responses(
        (status = 201, description = "Item created", body = Item),
        (status = 400, description = "Field errors"),
        (status = 401, description = "Authentication required"),
    )
)]
pub async fn create_item(
    State(state): State<AppState>,
    user: AuthUser,
    ValidatedJson(payload): ValidatedJson<ItemPayload>,
) -> Result<(StatusCode, Json<Item>), AppError> {
    tracing::info!("User {} creating item: {:?}", user.username, payload);

    let created: Item = sqlx::query_as(
        r#"
        INSERT INTO items (name, description, quantity)
        VALUES ($1, $2, $3)
        RETURNING id, name, description, quantity
        "#,
    )
    .bind(&payload.name)
    .bind(&payload.description)
    .bind(payload.quantity)
    .fetch_one(&state.db_pool)
    .await?;

    Ok((StatusCode::CREATED, Json(created)))
}

#[utoipa::path(
    get,
    path = "/api/items/{id}/",
    tag = "items",
    params(("id" = i64, Path, description = "Item id")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "The item", body = Item),
        (status = 404, description = "No such item"),
    )
)]
pub async fn get_item(
    State(state): State<AppState>,
    ValidatedPath(id): ValidatedPath<i64>,
) -> Result<Json<Item>, AppError> {
    tracing::info!("Fetching item {}", id);

    let item: Item =
        sqlx::query_as("SELECT id, name, description, quantity FROM items WHERE id = $1")
            .bind(id)
            .fetch_optional(&state.db_pool)
            .await?
            .ok_or(AppError::NotFound)?;

    Ok(Json(item))
}

/// Replace every field of an item.
#[utoipa::path(
    put,
    path = "/api/items/{id}/",
    tag = "items",
    params(("id" = i64, Path, description = "Item id")),
    request_body = ItemPayload,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "The updated item", body = Item),
        (status = 400, description = "Field errors"),
        (status = 404, description = "No such item"),
    )
)]
pub async fn update_item(
    State(state): State<AppState>,
    ValidatedPath(id): ValidatedPath<i64>,
    ValidatedJson(payload): ValidatedJson<ItemPayload>,
) -> Result<Json<Item>, AppError> {
    tracing::info!("Replacing item {}", id);

    let updated: Item = sqlx::query_as(
        r#"
        UPDATE items
        SET name = $1, description = $2, quantity = $3
        WHERE id = $4
        RETURNING id, name, description, quantity
        "#,
    )
    .bind(&payload.name)
    .bind(&payload.description)
    .bind(payload.quantity)
    .bind(id)
    .fetch_optional(&state.db_pool)
    .await?
    .ok_or(AppError::NotFound)?;

    Ok(Json(updated))
}

/// Change only the fields present in the body.
#[utoipa::path(
    patch,
    path = "/api/items/{id}/",
    tag = "items",
    params(("id" = i64, Path, description = "Item id")),
    request_body = ItemPatch,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "The updated item", body = Item),
        (status = 400, description = "Field errors"),
        (status = 404, description = "No such item"),
    )
)]
pub async fn patch_item(
    State(state): State<AppState>,
    ValidatedPath(id): ValidatedPath<i64>,
    ValidatedJson(patch): ValidatedJson<ItemPatch>,
) -> Result<Json<Item>, AppError> {
    tracing::info!("Patching item {}: {:?}", id, patch);

    let mut tx = state.db_pool.begin().await?;

    let current: Item =
        sqlx::query_as("SELECT id, name, description, quantity FROM items WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(AppError::NotFound)?;

    let merged = patch.apply(current);
    let updated: Item = sqlx::query_as(
        r#"
        UPDATE items
        SET name = $1, description = $2, quantity = $3
        WHERE id = $4
        RETURNING id, name, description, quantity
        "#,
    )
    .bind(&merged.name)
    .bind(&merged.description)
    .bind(merged.quantity)
    .bind(id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(Json(updated))
}

#[utoipa::path(
    delete,
    path = "/api/items/{id}/",
    tag = "items",
    params(("id" = i64, Path, description = "Item id")),
    security(("bearer_auth" = [])),
    responses(
        (status = 204, description = "Item deleted"),
        (status = 404, description = "No such item"),
    )
)]
pub async fn delete_item(
    State(state): State<AppState>,
    user: AuthUser,
    ValidatedPath(id): ValidatedPath<i64>,
) -> Result<StatusCode, AppError> {
    tracing::info!("User {} deleting item {}", user.username, id);

    let result = sqlx::query("DELETE FROM items WHERE id = $1")
        .bind(id)
        .execute(&state.db_pool)
        .await?;

    if result.rows_affected() > 0 {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound)
    }
}
