//! User endpoints.
//!
//! - `POST /api/users`: register an admin, doctor or patient account
//! - `GET /api/users`: list, optionally by `role`

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::db;
use crate::models::{NewUser, User, UserFilter, UserRole};

#[derive(Deserialize)]
pub struct UserListQuery {
    pub role: Option<String>,
}

/// `POST /api/users`
pub async fn create(
    State(ctx): State<ApiContext>,
    Json(body): Json<NewUser>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    body.validate()?;
    let now = ctx.now();
    let user = ctx.with_db(move |conn| Ok(db::insert_user(conn, &body, now)?)).await?;
    tracing::info!(user_id = user.id, role = user.role.as_str(), "User registered");
    Ok((StatusCode::CREATED, Json(user)))
}

/// `GET /api/users`
pub async fn list(
    State(ctx): State<ApiContext>,
    Query(query): Query<UserListQuery>,
) -> Result<Json<Vec<User>>, ApiError> {
    let role = query
        .role
        .as_deref()
        .filter(|r| !r.is_empty())
        .map(str::parse::<UserRole>)
        .transpose()?;
    let users = ctx
        .with_db(move |conn| Ok(db::list_users(conn, &UserFilter { role })?))
        .await?;
    Ok(Json(users))
}
