use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_LENGTH: usize = 100;
pub const DEFAULT_TEMPERATURE: f64 = 0.7;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub prompt: Option<String>,
    pub max_length: Option<usize>,
    pub temperature: Option<f64>,
    pub do_sample: Option<bool>,
}

impl GenerateRequest {
    /// Missing or null optional fields fall back to the documented defaults.
    pub fn params(&self) -> GenerationParams {
        GenerationParams {
            max_length: self.max_length.unwrap_or(DEFAULT_MAX_LENGTH),
            temperature: self.temperature.unwrap_or(DEFAULT_TEMPERATURE),
            do_sample: self.do_sample.unwrap_or(true),
        }
    }
}

/// Resolved generation parameters handed to the engine.
/// `max_length` counts prompt tokens plus continuation.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationParams {
    pub max_length: usize,
    pub temperature: f64,
    pub do_sample: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub prompt: String,
    pub generated_code: String,
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub model: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_resolves_to_defaults() {
        let req: GenerateRequest = serde_json::from_str("{}").unwrap();
        assert!(req.prompt.is_none());
        assert_eq!(
            req.params(),
            GenerationParams {
                max_length: 100,
                temperature: 0.7,
                do_sample: true,
            }
        );
    }

    #[test]
    fn null_fields_resolve_to_defaults() {
        let req: GenerateRequest = serde_json::from_str(
            r#"{"prompt": "x", "max_length": null, "temperature": null, "do_sample": null}"#,
        )
        .unwrap();
        assert_eq!(req.prompt.as_deref(), Some("x"));
        assert_eq!(
            req.params(),
            GenerationParams {
                max_length: 100,
                temperature: 0.7,
                do_sample: true,
            }
        );
    }

    #[test]
    fn explicit_fields_override_defaults() {
        let req: GenerateRequest = serde_json::from_str(
            r#"{"prompt": "x", "max_length": 50, "temperature": 0.2, "do_sample": false}"#,
        )
        .unwrap();
        assert_eq!(
            req.params(),
            GenerationParams {
                max_length: 50,
                temperature: 0.2,
                do_sample: false,
            }
        );
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let req: GenerateRequest =
            serde_json::from_str(r#"{"prompt": "x", "top_k": 40}"#).unwrap();
        assert_eq!(req.prompt.as_deref(), Some("x"));
    }
}
