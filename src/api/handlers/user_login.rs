use crate::{
    auth::{self, AuthError, LoginRequest, UserKind},
    store::UserStore,
};
use axum::{
    Json,
    extract::{Extension, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, instrument};
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize)]
pub struct UserLogin {
    /// Email for teachers, username for students.
    user_id: String,
    #[schema(format = Password)]
    password: String,
    user_type: UserKind,
}

impl std::fmt::Debug for UserLogin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserLogin")
            .field("user_id", &self.user_id)
            .field("password", &"***")
            .field("user_type", &self.user_type)
            .finish()
    }
}

impl From<UserLogin> for LoginRequest {
    fn from(payload: UserLogin) -> Self {
        Self::new(
            payload.user_id,
            SecretString::from(payload.password),
            payload.user_type,
        )
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LoginSuccess {
    /// Opaque bearer token.
    message: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LoginFailure {
    msg: String,
}

fn failure(status: StatusCode, msg: impl Into<String>) -> Response {
    (status, Json(LoginFailure { msg: msg.into() })).into_response()
}

#[utoipa::path(
    post,
    path= "/user/login",
    request_body = UserLogin,
    responses (
        (status = 200, description = "Login successful, returns a bearer token", body = LoginSuccess, content_type = "application/json"),
        (status = 400, description = "Malformed body or invalid teacher email address", body = LoginFailure),
        (status = 401, description = "Unknown user or wrong password", body = LoginFailure),
        (status = 422, description = "Unknown user_type or missing fields", body = LoginFailure),
        (status = 500, description = "User store unavailable", body = LoginFailure),
    ),
    tag= "login"
)]
// axum handler for login
#[instrument(skip_all)]
pub async fn login(
    store: Extension<Arc<dyn UserStore>>,
    payload: Result<Json<UserLogin>, JsonRejection>,
) -> Response {
    let user: UserLogin = match payload {
        Ok(Json(payload)) => payload,
        Err(rejection) => {
            debug!("Rejected login payload: {}", rejection.body_text());

            return failure(rejection.status(), rejection.body_text());
        }
    };

    debug!("user: {:?}", user);

    match auth::authenticate(store.0.as_ref(), user.into()).await {
        Ok(session) => (
            StatusCode::OK,
            Json(LoginSuccess {
                message: session.token,
            }),
        )
            .into_response(),

        Err(err @ AuthError::InvalidIdentifierFormat(_)) => {
            failure(StatusCode::BAD_REQUEST, err.to_string())
        }

        Err(err @ AuthError::InvalidCredentials) => {
            failure(StatusCode::UNAUTHORIZED, err.to_string())
        }

        Err(AuthError::Store(e)) => {
            error!("Error authenticating user: {:?}", e);

            failure(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
        }
    }
}
