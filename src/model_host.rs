use std::sync::Arc;

use tracing::{error, info};

use crate::engine::{CandleEngine, TextGenerator};
use crate::error::ApiError;
use crate::types::GenerationParams;

pub const MODEL_ID: &str = "bigcode/starcoder2-3b";
pub const MODEL_NAME: &str = "starcoder2-3b";

/// Holds the generation capability for the lifetime of the process.
/// Built exactly once at startup and never mutated afterwards: either the
/// engine loaded (ready) or it did not (unavailable), with no retry path.
pub struct ModelHost {
    engine: Option<Arc<dyn TextGenerator>>,
}

impl ModelHost {
    /// Loads the engine once. A failure leaves the host unavailable instead
    /// of aborting, so the process keeps running and /health stays reachable.
    pub fn initialize() -> Self {
        info!("loading {MODEL_ID}, this may take a few minutes");
        match CandleEngine::load(MODEL_ID) {
            Ok(engine) => {
                info!("model loaded successfully");
                Self {
                    engine: Some(engine),
                }
            }
            Err(e) => {
                error!("failed to load model: {e:#}");
                Self { engine: None }
            }
        }
    }

    #[cfg(test)]
    pub fn with_engine(engine: Arc<dyn TextGenerator>) -> Self {
        Self {
            engine: Some(engine),
        }
    }

    #[cfg(test)]
    pub fn unavailable() -> Self {
        Self { engine: None }
    }

    pub fn is_ready(&self) -> bool {
        self.engine.is_some()
    }

    pub async fn generate(
        &self,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<String, ApiError> {
        let engine = self.engine.as_ref().ok_or(ApiError::ModelUnavailable)?;
        Ok(engine.generate(prompt, params).await?)
    }
}
