use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tracing::instrument;
use uuid::Uuid;

use super::dto::{
    ChangePasswordRequest, CreateUserRequest, PageParams, PatchUserRequest, UpdateUserRequest,
};
use super::extractors::{AppQuery, JsonBody};
use super::repo_types::User;
use super::services;
use crate::{
    error::{ApiError, UserError},
    state::AppState,
};

const LIST_FAILED: &str = "An error occurred while fetching users";
const CREATE_FAILED: &str = "An error occurred while creating a new user";
const READ_FAILED: &str = "An error occurred while retrieving the user";
const UPDATE_FAILED: &str = "An error occurred while uploading the user";
const RESTRICT_FAILED: &str = "An error occurred restricted user";
const PASSWORD_FAILED: &str = "An error occurred while change the password";

type Reply = Result<(StatusCode, Json<Value>), ApiError>;

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route(
            "/users/:id",
            get(show_user)
                .put(update_user)
                .patch(update_user_partial)
                .delete(delete_user),
        )
        .route(
            "/users/:id/restrict",
            post(restrict_user).patch(restrict_user),
        )
        .route("/users/:id/password", post(change_password))
}

#[instrument(skip(state))]
pub async fn list_users(
    State(state): State<AppState>,
    AppQuery(params): AppQuery<PageParams>,
) -> Reply {
    let page = services::list_users(state.users.as_ref(), &state.config.pagination, params)
        .await
        .map_err(|e| e.during(LIST_FAILED))?;

    if page.data.is_empty() {
        return Ok(ok(json!({ "message": "No users were found", "status": 200 })));
    }
    Ok(ok(json!({
        "data": page.data,
        "pagination": page.pagination,
        "status": 200,
    })))
}

#[instrument(skip(state, body))]
pub async fn create_user(
    State(state): State<AppState>,
    body: JsonBody<CreateUserRequest>,
) -> Result<(StatusCode, HeaderMap, Json<Value>), ApiError> {
    let payload = body.parse().map_err(|e| e.during(CREATE_FAILED))?;
    let user = services::create_user(state.users.as_ref(), state.hasher.as_ref(), payload)
        .await
        .map_err(|e| e.during(CREATE_FAILED))?;

    let mut headers = HeaderMap::new();
    if let Ok(location) = HeaderValue::from_str(&format!("/users/{}", user.id)) {
        headers.insert(header::LOCATION, location);
    }
    Ok((
        StatusCode::CREATED,
        headers,
        Json(json!({
            "message": "User created successfully",
            "user": user,
            "status": 201,
        })),
    ))
}

#[instrument(skip(state))]
pub async fn show_user(State(state): State<AppState>, Path(id): Path<String>) -> Reply {
    let id = user_id(&id).map_err(|e| e.during(READ_FAILED))?;
    let user = services::get_user(state.users.as_ref(), id)
        .await
        .map_err(|e| e.during(READ_FAILED))?;
    Ok(ok(json!(user)))
}

#[instrument(skip(state, body))]
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: JsonBody<UpdateUserRequest>,
) -> Reply {
    let fail = |e: UserError| e.during(UPDATE_FAILED);
    let user = load_user(&state, &id).await.map_err(fail)?;
    let payload = body.parse().map_err(fail)?;
    let user = services::replace_user(state.users.as_ref(), state.hasher.as_ref(), user, payload)
        .await
        .map_err(fail)?;
    Ok(updated(user))
}

#[instrument(skip(state, body))]
pub async fn update_user_partial(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: JsonBody<PatchUserRequest>,
) -> Reply {
    let fail = |e: UserError| e.during(UPDATE_FAILED);
    let user = load_user(&state, &id).await.map_err(fail)?;
    let payload = body.parse().map_err(fail)?;
    let user = services::patch_user(state.users.as_ref(), state.hasher.as_ref(), user, payload)
        .await
        .map_err(fail)?;
    Ok(updated(user))
}

#[instrument(skip(state))]
pub async fn restrict_user(State(state): State<AppState>, Path(id): Path<String>) -> Reply {
    let id = user_id(&id).map_err(|e| e.during(RESTRICT_FAILED))?;
    services::restrict_user(state.users.as_ref(), id)
        .await
        .map_err(|e| e.during(RESTRICT_FAILED))?;
    Ok(ok(json!({ "message": "User restricted successfully", "status": 200 })))
}

#[instrument(skip(state))]
pub async fn delete_user(State(state): State<AppState>, Path(id): Path<String>) -> Reply {
    let id = user_id(&id).map_err(|e| e.during(READ_FAILED))?;
    services::delete_user(state.users.as_ref(), id)
        .await
        .map_err(|e| e.during(READ_FAILED))?;
    Ok(ok(json!({ "message": "User deleted successfully", "status": 200 })))
}

#[instrument(skip(state, body))]
pub async fn change_password(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: JsonBody<ChangePasswordRequest>,
) -> Reply {
    let fail = |e: UserError| e.during(PASSWORD_FAILED);
    let user = load_user(&state, &id).await.map_err(fail)?;
    let payload = body.parse().map_err(fail)?;
    services::change_password(state.users.as_ref(), state.hasher.as_ref(), user, payload)
        .await
        .map_err(fail)?;
    Ok(ok(json!({
        "message": "Password is valid!",
        "correct": true,
        "status": 200,
    })))
}

/// A malformed id cannot name a stored user.
fn user_id(raw: &str) -> Result<Uuid, UserError> {
    Uuid::parse_str(raw).map_err(|_| UserError::NotFound)
}

async fn load_user(state: &AppState, raw_id: &str) -> Result<User, UserError> {
    services::get_user(state.users.as_ref(), user_id(raw_id)?).await
}

fn ok(body: Value) -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(body))
}

fn updated(user: User) -> (StatusCode, Json<Value>) {
    ok(json!({
        "message": "User uploaded successfully",
        "User": user,
        "status": 200,
    }))
}
