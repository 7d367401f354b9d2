use super::handler::ApiResponse;
use crate::application_port::*;
use crate::logger::*;
use serde::Serialize;
use std::convert::Infallible;
use thiserror::Error;
use warp::http::StatusCode;
use warp::{Rejection, reject};

pub async fn recover_error(err: Rejection) -> Result<impl warp::Reply, Infallible> {
    let error = if let Some(error) = err.find::<ApiError>() {
        error.clone()
    } else if let Some(e) = err.find::<warp::filters::body::BodyDeserializeError>() {
        ApiError::new(ApiErrorCode::InvalidInput, e.to_string())
    } else if err.find::<reject::UnsupportedMediaType>().is_some()
        || err.find::<reject::PayloadTooLarge>().is_some()
        || err.find::<reject::LengthRequired>().is_some()
    {
        ApiError::new(ApiErrorCode::InvalidInput, "Malformed request body")
    } else if err.is_not_found() {
        ApiError::from_code(ApiErrorCode::RouteNotFound)
    } else if err.find::<reject::MethodNotAllowed>().is_some() {
        ApiError::from_code(ApiErrorCode::MethodNotAllowed)
    } else {
        warn!("Unhandled rejection: {:?}", err);
        ApiError::from_code(ApiErrorCode::InternalError)
    };

    let status = error.code.status();
    let json = warp::reply::json(&ApiResponse::<()>::err(error));
    Ok(warp::reply::with_status(json, status))
}

#[derive(Debug, Clone, Serialize)]
pub struct ApiError {
    pub code: ApiErrorCode,
    pub message: String,
}

impl ApiError {
    pub fn new(code: ApiErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }

    pub fn from_code(code: ApiErrorCode) -> Self {
        let message = code.to_string();
        ApiError { code, message }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ApiErrorCode::InvalidInput, message)
    }
}

impl reject::Reject for ApiError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize)]
pub enum ApiErrorCode {
    #[error("Invalid input")]
    InvalidInput,
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("User not found")]
    UserNotFound,
    #[error("User already exists")]
    UserExists,
    #[error("Token is not valid")]
    InvalidToken,
    #[error("Token has expired")]
    TokenExpired,
    #[error("Service temporarily unavailable")]
    Unavailable,
    #[error("No such route")]
    RouteNotFound,
    #[error("Method not allowed")]
    MethodNotAllowed,
    #[error("Internal error")]
    InternalError,
}

impl ApiErrorCode {
    pub fn status(self) -> StatusCode {
        match self {
            ApiErrorCode::InvalidInput => StatusCode::BAD_REQUEST,
            ApiErrorCode::InvalidCredentials
            | ApiErrorCode::InvalidToken
            | ApiErrorCode::TokenExpired => StatusCode::UNAUTHORIZED,
            ApiErrorCode::UserNotFound | ApiErrorCode::RouteNotFound => StatusCode::NOT_FOUND,
            ApiErrorCode::UserExists => StatusCode::CONFLICT,
            ApiErrorCode::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
            ApiErrorCode::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ApiErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(error: AuthError) -> Self {
        match error {
            AuthError::InvalidInput(message) => ApiError::invalid_input(message),
            AuthError::InvalidCredentials => ApiError::from_code(ApiErrorCode::InvalidCredentials),
            AuthError::UserNotFound => ApiError::from_code(ApiErrorCode::UserNotFound),
            AuthError::UserExists => ApiError::from_code(ApiErrorCode::UserExists),
            AuthError::TokenInvalid => ApiError::from_code(ApiErrorCode::InvalidToken),
            AuthError::TokenExpired => ApiError::from_code(ApiErrorCode::TokenExpired),
            AuthError::Unavailable(e) => {
                warn!("Backend unavailable: {}", e);
                ApiError::from_code(ApiErrorCode::Unavailable)
            }
            AuthError::InternalError(e) => {
                warn!("Internal error: {}", e);
                ApiError::from_code(ApiErrorCode::InternalError)
            }
        }
    }
}
