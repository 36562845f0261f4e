use rocket::http::Status;
use rocket::response::{self, Responder};
use rocket::serde::json::Json;
use rocket::Request;
use thiserror::Error;

use crate::types::ErrorResponse;

/// Failures raised inside the generation engine. Invalid parameter values
/// are kept apart from runtime faults so callers can tell a bad request
/// from a broken backend.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid generation parameters: {0}")]
    InvalidParams(String),
    #[error(transparent)]
    Model(#[from] candle_core::Error),
    #[error("{0}")]
    Runtime(String),
}

/// Everything a handler can answer with besides a success body.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Model not available")]
    ModelUnavailable,
    #[error("Please provide a 'prompt' in the JSON body")]
    InvalidRequest,
    #[error("{0}")]
    Generation(#[from] EngineError),
}

impl ApiError {
    fn status(&self) -> Status {
        match self {
            ApiError::InvalidRequest => Status::BadRequest,
            ApiError::ModelUnavailable | ApiError::Generation(_) => Status::InternalServerError,
        }
    }
}

impl<'r> Responder<'r, 'static> for ApiError {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'static> {
        let body = Json(ErrorResponse {
            error: self.to_string(),
        });
        (self.status(), body).respond_to(req)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_failure_message_passes_through() {
        let err = ApiError::Generation(EngineError::Runtime("out of memory".to_string()));
        assert_eq!(err.to_string(), "out of memory");
    }

    #[test]
    fn fixed_messages_match_the_contract() {
        assert_eq!(ApiError::ModelUnavailable.to_string(), "Model not available");
        assert_eq!(
            ApiError::InvalidRequest.to_string(),
            "Please provide a 'prompt' in the JSON body"
        );
    }
}
