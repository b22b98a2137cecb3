use super::error::*;
use crate::application_port::*;
use crate::domain_model::{PrincipalId, PrincipalSummary, SessionId, TokenPair};
use crate::logger::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use warp::{self, reject};

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<ApiError>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        ApiResponse {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(code: ApiErrorCode, message: impl Into<String>) -> Self {
        ApiResponse {
            success: false,
            data: None,
            error: Some(ApiError {
                code,
                message: message.into(),
            }),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub shop: PrincipalSummary,
    pub session_id: SessionId,
    pub tokens: TokenPair,
}

impl From<AuthOutcome> for SessionResponse {
    fn from(outcome: AuthOutcome) -> Self {
        SessionResponse {
            shop: outcome.principal,
            session_id: outcome.session_id,
            tokens: outcome.tokens,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

pub async fn signup(
    body: SignupRequest,
    auth_service: Arc<dyn AuthService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let input = RegisterInput {
        handle: body.email,
        name: body.name,
        password: body.password,
    };
    let outcome = auth_service
        .register(input)
        .await
        .map_err(ApiRejection::from)
        .map_err(reject::custom)?;

    let reply = warp::reply::json(&ApiResponse::ok(SessionResponse::from(outcome)));
    Ok(warp::reply::with_status(reply, warp::http::StatusCode::CREATED))
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

pub async fn login(
    body: LoginRequest,
    auth_service: Arc<dyn AuthService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let input = LoginInput {
        handle: body.email,
        password: body.password,
    };
    let outcome = auth_service
        .login(input)
        .await
        .map_err(ApiRejection::from)
        .map_err(reject::custom)?;

    Ok(warp::reply::json(&ApiResponse::ok(SessionResponse::from(
        outcome,
    ))))
}

#[derive(Debug, Serialize)]
pub struct LogoutResponse {
    pub session_id: SessionId,
}

pub async fn logout(
    ctx: AuthContext,
    auth_service: Arc<dyn AuthService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    auth_service
        .logout(ctx.session_id)
        .await
        .map_err(ApiRejection::from)
        .map_err(reject::custom)?;

    debug!(principal_id = %ctx.claims.principal_id, "logged out");
    Ok(warp::reply::json(&ApiResponse::ok(LogoutResponse {
        session_id: ctx.session_id,
    })))
}

pub async fn refresh_token(
    principal_id: PrincipalId,
    refresh_token: Option<String>,
    auth_service: Arc<dyn AuthService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let refresh_token = refresh_token
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| reject::custom(ApiRejection::new(ApiErrorCode::Unauthenticated)))?;

    let outcome = auth_service
        .refresh(refresh_token.trim(), principal_id)
        .await
        .map_err(ApiRejection::from)
        .map_err(reject::custom)?;

    Ok(warp::reply::json(&ApiResponse::ok(SessionResponse::from(
        outcome,
    ))))
}
