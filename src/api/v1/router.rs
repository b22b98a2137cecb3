use super::error::*;
use super::handler;
use crate::application_port::*;
use crate::domain_model::{Permission, PrincipalId};
use crate::server::*;
use std::convert::Infallible;
use std::sync::Arc;
use warp::{Filter, http, reject};

pub const HEADER_API_KEY: &str = "x-api-key";
pub const HEADER_CLIENT_ID: &str = "x-client-id";
pub const HEADER_REFRESH_TOKEN: &str = "x-rtoken-id";

/// Everything below `/shop`, each route gated by an `x-api-key` check.
pub fn routes(
    server: Arc<Server>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    let signup = warp::post()
        .and(warp::path("signup"))
        .and(warp::path::end())
        .and(warp::body::json())
        .and(with(server.auth_service.clone()))
        .and_then(handler::signup);

    let login = warp::post()
        .and(warp::path("login"))
        .and(warp::path::end())
        .and(warp::body::json())
        .and(with(server.auth_service.clone()))
        .and_then(handler::login);

    let logout = warp::post()
        .and(warp::path("logout"))
        .and(warp::path::end())
        .and(with_authentication(server.auth_service.clone()))
        .and(with(server.auth_service.clone()))
        .and_then(handler::logout);

    let refresh_token = warp::post()
        .and(warp::path("refresh_token"))
        .and(warp::path::end())
        .and(with_client_id())
        .and(warp::header::optional::<String>(HEADER_REFRESH_TOKEN))
        .and(with(server.auth_service.clone()))
        .and_then(handler::refresh_token);

    warp::path("shop")
        .and(with_api_key(server.api_key_service.clone()))
        .and(signup.or(login).or(logout).or(refresh_token))
}

fn with<ServiceType>(
    service: Arc<ServiceType>,
) -> impl Filter<Extract = (Arc<ServiceType>,), Error = Infallible> + Clone
where
    ServiceType: Send + Sync + ?Sized,
{
    warp::any().map(move || service.clone())
}

fn with_api_key(
    api_key_service: Arc<dyn ApiKeyService>,
) -> impl Filter<Extract = (), Error = warp::Rejection> + Clone {
    warp::header::optional::<String>(HEADER_API_KEY)
        .and_then(move |raw: Option<String>| {
            let api_key_service = api_key_service.clone();
            async move {
                let raw = raw.ok_or_else(|| reject::custom(ApiRejection::from(ApiKeyError::Missing)))?;
                api_key_service
                    .check(&raw, Permission::Basic)
                    .await
                    .map_err(ApiRejection::from)
                    .map_err(reject::custom)?;
                Ok::<(), warp::Rejection>(())
            }
        })
        .untuple_one()
}

fn with_client_id() -> impl Filter<Extract = (PrincipalId,), Error = warp::Rejection> + Clone {
    warp::header::optional::<String>(HEADER_CLIENT_ID).and_then(|raw: Option<String>| async move {
        raw.and_then(|raw| raw.trim().parse::<PrincipalId>().ok())
            .ok_or_else(|| reject::custom(ApiRejection::new(ApiErrorCode::Unauthenticated)))
    })
}

fn with_authentication(
    auth_service: Arc<dyn AuthService>,
) -> impl Filter<Extract = (AuthContext,), Error = warp::Rejection> + Clone {
    with_client_id()
        .and(warp::header::optional::<String>(
            http::header::AUTHORIZATION.as_ref(),
        ))
        .and_then(move |principal_id: PrincipalId, header: Option<String>| {
            let auth_service = auth_service.clone();
            async move {
                let Some(token) = header.as_deref().and_then(|h| h.strip_prefix("Bearer ")) else {
                    return Err(reject::custom(ApiRejection::new(
                        ApiErrorCode::Unauthenticated,
                    )));
                };
                auth_service
                    .authenticate(token.trim(), principal_id)
                    .await
                    .map_err(ApiRejection::from)
                    .map_err(reject::custom)
            }
        })
}
