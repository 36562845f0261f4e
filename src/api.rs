use std::sync::Arc;

use rocket::serde::json::Json;
use rocket::{get, post, State};
use tracing::info;

use crate::error::ApiError;
use crate::model_host::{ModelHost, MODEL_NAME};
use crate::types::{GenerateRequest, GenerateResponse, HealthResponse};

// The body is taken as a raw string and parsed by hand so that a missing or
// malformed body maps to the contract's 400 response instead of the
// framework's default catcher.
#[post("/generate", data = "<body>")]
pub async fn generate(
    host: &State<Arc<ModelHost>>,
    body: String,
) -> Result<Json<GenerateResponse>, ApiError> {
    // An unavailable model wins over request validation
    if !host.is_ready() {
        return Err(ApiError::ModelUnavailable);
    }

    let req: GenerateRequest =
        serde_json::from_str(&body).map_err(|_| ApiError::InvalidRequest)?;
    let prompt = req
        .prompt
        .as_deref()
        .filter(|p| !p.is_empty())
        .ok_or(ApiError::InvalidRequest)?;
    let params = req.params();

    let preview: String = prompt.chars().take(100).collect();
    info!("generating code for prompt: {preview}...");

    let generated_code = host.generate(prompt, &params).await?;
    info!("generation completed successfully");

    Ok(Json(GenerateResponse {
        prompt: prompt.to_string(),
        generated_code,
        status: "success".to_string(),
    }))
}

#[get("/health")]
pub async fn health(host: &State<Arc<ModelHost>>) -> Json<HealthResponse> {
    let status = if host.is_ready() { "ready" } else { "not ready" };
    Json(HealthResponse {
        status: status.to_string(),
        model: MODEL_NAME.to_string(),
    })
}
