//! Record endpoint routes.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::Value;
use std::collections::HashMap;
use tidewater_engine::{config::DEFAULT_BULK_SUFFIX, Record};

use crate::error::Result;
use crate::handlers::{
    handle_bulk, handle_create, handle_delete, handle_find, handle_list, handle_patch,
    handle_replace, BulkRequest,
};
use crate::AppState;

/// Create record routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/{collection}", get(list_handler).post(create_handler))
        // Takes precedence over `/{collection}/{id}`, so the bulk suffix is
        // refused as a record identifier on insert.
        .route(
            &format!("/{{collection}}/{DEFAULT_BULK_SUFFIX}"),
            post(bulk_handler),
        )
        .route(
            "/{collection}/{id}",
            get(find_handler)
                .put(replace_handler)
                .patch(patch_handler)
                .delete(delete_handler),
        )
}

/// GET /{collection} - List records, filtered by query parameters.
async fn list_handler(
    State(state): State<AppState>,
    Path(collection): Path<String>,
    Query(filter): Query<HashMap<String, String>>,
) -> Json<Vec<Record>> {
    Json(handle_list(&state.store, &collection, &filter))
}

/// POST /{collection} - Create a record.
async fn create_handler(
    State(state): State<AppState>,
    Path(collection): Path<String>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<Record>)> {
    let created = handle_create(&state.store, &collection, body)?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// POST /{collection}/collection - Insert or overwrite many records.
async fn bulk_handler(
    State(state): State<AppState>,
    Path(collection): Path<String>,
    Json(request): Json<BulkRequest>,
) -> Result<Json<Vec<Record>>> {
    let answered = handle_bulk(&state.store, &collection, request)?;
    Ok(Json(answered))
}

/// GET /{collection}/{id} - Fetch a record.
async fn find_handler(
    State(state): State<AppState>,
    Path((collection, id)): Path<(String, String)>,
) -> Result<Json<Record>> {
    Ok(Json(handle_find(&state.store, &collection, &id)?))
}

/// PUT /{collection}/{id} - Replace a record.
async fn replace_handler(
    State(state): State<AppState>,
    Path((collection, id)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> Result<Json<Record>> {
    Ok(Json(handle_replace(&state.store, &collection, &id, body)?))
}

/// PATCH /{collection}/{id} - Partially update a record.
async fn patch_handler(
    State(state): State<AppState>,
    Path((collection, id)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> Result<Json<Record>> {
    Ok(Json(handle_patch(&state.store, &collection, &id, body)?))
}

/// DELETE /{collection}/{id} - Delete a record.
async fn delete_handler(
    State(state): State<AppState>,
    Path((collection, id)): Path<(String, String)>,
) -> Result<StatusCode> {
    handle_delete(&state.store, &collection, &id)?;
    Ok(StatusCode::NO_CONTENT)
}
