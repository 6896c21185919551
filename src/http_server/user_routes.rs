//! User HTTP Routes
//!
//! - `GET /users?offset&pageSize&includeTotal`
//! - `GET /users/:id`
//! - `POST /users`
//! - `PATCH /users/:id`
//! - `GET /users/:id/orders`
//! - `POST /users/:id/orders`

use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Extension, Json, Router};

use crate::observability::MetricsRegistry;
use crate::orders::{Order, OrderCreateInput};
use crate::pagination::{Page, PaginationParams};
use crate::store::{RecordId, Store};
use crate::txn::RequestContext;
use crate::users::{User, UserCreateInput, UserError, UserService, UserUpdateInput, UserWithOrders};

use super::errors::{ApiError, ApiResult};

/// Shared state for user routes
pub struct UserState<S> {
    pub service: UserService<S>,
    pub metrics: Arc<MetricsRegistry>,
}

impl<S: Clone> Clone for UserState<S> {
    fn clone(&self) -> Self {
        Self {
            service: self.service.clone(),
            metrics: Arc::clone(&self.metrics),
        }
    }
}

/// Create user routes
pub fn user_routes<S>(state: UserState<S>) -> Router
where
    S: Store + Clone + 'static,
{
    Router::new()
        .route("/users", get(list_users::<S>).post(create_user::<S>))
        .route("/users/:id", get(get_user::<S>).patch(update_user::<S>))
        .route(
            "/users/:id/orders",
            get(get_user_orders::<S>).post(create_order::<S>),
        )
        .with_state(state)
}

async fn list_users<S: Store + Clone + 'static>(
    State(state): State<UserState<S>>,
    Extension(ctx): Extension<RequestContext>,
    params: Result<Query<PaginationParams>, QueryRejection>,
) -> ApiResult<Json<Page<User>>> {
    let Query(params) = params.map_err(|e| ApiError::InvalidQuery(e.body_text()))?;
    let page = state.service.list_users(&ctx, params.window()).await?;
    Ok(Json(page))
}

async fn get_user<S: Store + Clone + 'static>(
    State(state): State<UserState<S>>,
    Extension(ctx): Extension<RequestContext>,
    id: Result<Path<RecordId>, PathRejection>,
) -> ApiResult<Json<User>> {
    let Path(id) = id.map_err(|e| ApiError::InvalidPath(e.body_text()))?;
    let user = state.service.get_user(&ctx, id).await?;
    Ok(Json(user))
}

async fn create_user<S: Store + Clone + 'static>(
    State(state): State<UserState<S>>,
    Extension(ctx): Extension<RequestContext>,
    body: Result<Json<UserCreateInput>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<User>)> {
    let Json(input) = body.map_err(|e| ApiError::InvalidBody(e.body_text()))?;
    let user = state.service.create_user(&ctx, input).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

async fn update_user<S: Store + Clone + 'static>(
    State(state): State<UserState<S>>,
    Extension(ctx): Extension<RequestContext>,
    id: Result<Path<RecordId>, PathRejection>,
    body: Result<Json<UserUpdateInput>, JsonRejection>,
) -> ApiResult<Json<User>> {
    let Path(id) = id.map_err(|e| ApiError::InvalidPath(e.body_text()))?;
    let Json(input) = body.map_err(|e| ApiError::InvalidBody(e.body_text()))?;

    match state.service.update_user(&ctx, id, input).await {
        Ok(user) => Ok(Json(user)),
        Err(err) => {
            if matches!(err, UserError::Conflict { .. }) {
                state.metrics.increment_optimistic_conflicts();
            }
            Err(err.into())
        }
    }
}

async fn get_user_orders<S: Store + Clone + 'static>(
    State(state): State<UserState<S>>,
    Extension(ctx): Extension<RequestContext>,
    id: Result<Path<RecordId>, PathRejection>,
) -> ApiResult<Json<UserWithOrders>> {
    let Path(id) = id.map_err(|e| ApiError::InvalidPath(e.body_text()))?;
    let user = state.service.get_user_with_orders(&ctx, id).await?;
    Ok(Json(user))
}

async fn create_order<S: Store + Clone + 'static>(
    State(state): State<UserState<S>>,
    Extension(ctx): Extension<RequestContext>,
    id: Result<Path<RecordId>, PathRejection>,
    body: Result<Json<OrderCreateInput>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Order>)> {
    let Path(id) = id.map_err(|e| ApiError::InvalidPath(e.body_text()))?;
    let Json(input) = body.map_err(|e| ApiError::InvalidBody(e.body_text()))?;
    let order = state.service.create_order(&ctx, id, input).await?;
    Ok((StatusCode::CREATED, Json(order)))
}
