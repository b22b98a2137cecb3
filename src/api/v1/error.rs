use crate::api::v1::handler::ApiResponse;
use crate::application_port::*;
use serde::Serialize;
use std::convert::Infallible;
use thiserror::Error;
use tracing::{error, warn};
use warp::http::StatusCode;
use warp::{Rejection, reject};

pub async fn recover_error(err: Rejection) -> Result<impl warp::Reply, Infallible> {
    let (code, message) = if let Some(rejection) = err.find::<ApiRejection>() {
        (rejection.code.clone(), rejection.message.clone())
    } else if err.is_not_found() {
        (ApiErrorCode::NotFound, ApiErrorCode::NotFound.to_string())
    } else if let Some(e) = err.find::<warp::filters::body::BodyDeserializeError>() {
        (ApiErrorCode::InvalidInput, e.to_string())
    } else if err.find::<reject::MethodNotAllowed>().is_some() {
        (
            ApiErrorCode::MethodNotAllowed,
            ApiErrorCode::MethodNotAllowed.to_string(),
        )
    } else {
        error!("Unhandled rejection: {:?}", err);
        (
            ApiErrorCode::InternalError,
            ApiErrorCode::InternalError.to_string(),
        )
    };

    let status = code.status();
    let json = warp::reply::json(&ApiResponse::<()>::err(code, message));
    Ok(warp::reply::with_status(json, status))
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: ApiErrorCode,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
pub enum ApiErrorCode {
    #[error("Invalid input")]
    InvalidInput,
    #[error("Email already registered")]
    HandleTaken,
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("Authentication required")]
    Unauthenticated,
    #[error("Something went wrong, please review your account activity and log in again")]
    SessionCompromised,
    #[error("Forbidden")]
    Forbidden,
    #[error("Not found")]
    NotFound,
    #[error("Method not allowed")]
    MethodNotAllowed,
    #[error("Internal error")]
    InternalError,
}

impl ApiErrorCode {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiErrorCode::InvalidInput => StatusCode::BAD_REQUEST,
            ApiErrorCode::HandleTaken => StatusCode::CONFLICT,
            ApiErrorCode::InvalidCredentials | ApiErrorCode::Unauthenticated => {
                StatusCode::UNAUTHORIZED
            }
            ApiErrorCode::SessionCompromised | ApiErrorCode::Forbidden => StatusCode::FORBIDDEN,
            ApiErrorCode::NotFound => StatusCode::NOT_FOUND,
            ApiErrorCode::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ApiErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// A rejection carrying the public error code and a client-safe message.
#[derive(Debug, Clone)]
pub struct ApiRejection {
    pub code: ApiErrorCode,
    pub message: String,
}

impl ApiRejection {
    pub fn new(code: ApiErrorCode) -> Self {
        let message = code.to_string();
        ApiRejection { code, message }
    }

    pub fn internal<E: std::fmt::Display>(error: E) -> Self {
        error!("Internal error: {}", error);
        ApiRejection::new(ApiErrorCode::InternalError)
    }
}

impl reject::Reject for ApiRejection {}

impl From<AuthError> for ApiRejection {
    fn from(error: AuthError) -> Self {
        match error {
            AuthError::InvalidInput(message) => ApiRejection {
                code: ApiErrorCode::InvalidInput,
                message,
            },
            AuthError::HandleTaken => ApiRejection::new(ApiErrorCode::HandleTaken),
            AuthError::InvalidCredentials => ApiRejection::new(ApiErrorCode::InvalidCredentials),
            AuthError::Unauthenticated => ApiRejection::new(ApiErrorCode::Unauthenticated),
            AuthError::SessionCompromised => ApiRejection::new(ApiErrorCode::SessionCompromised),
            AuthError::Signing(e)
            | AuthError::Verification(e)
            | AuthError::Store(e)
            | AuthError::InternalError(e) => ApiRejection::internal(e),
        }
    }
}

impl From<ApiKeyError> for ApiRejection {
    fn from(error: ApiKeyError) -> Self {
        match error {
            ApiKeyError::Store(e) => error!("api key lookup failed: {}", e),
            other => warn!("api key rejected: {}", other),
        }
        ApiRejection::new(ApiErrorCode::Forbidden)
    }
}
