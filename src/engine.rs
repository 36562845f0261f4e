use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::generation::LogitsProcessor;
use candle_transformers::models::starcoder2;
use hf_hub::api::sync::Api;
use parking_lot::Mutex;
use tokenizers::Tokenizer;
use tracing::info;

use crate::error::EngineError;
use crate::types::GenerationParams;

/// Upper bound on prompt plus sampled tokens fed through the model.
const MAX_SEQ_LEN: usize = 16384;
/// Fixed sampling seed; the request contract carries no seed parameter.
const SEED: u64 = 42;
const EOS_TOKEN: &str = "<|endoftext|>";

/// Text-generation capability behind the HTTP handlers. Production uses the
/// candle-backed engine; tests substitute their own implementations.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(
        &self,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<String, EngineError>;
}

pub struct CandleEngine {
    // forward() mutates the KV cache, so every generation holds this lock
    model: Mutex<starcoder2::Model>,
    tokenizer: Tokenizer,
    device: Device,
    eos_token: u32,
}

impl CandleEngine {
    pub fn load(model_id: &str) -> Result<Arc<Self>> {
        let device = Device::cuda_if_available(0)?;
        let dtype = if device.is_cuda() {
            DType::BF16
        } else {
            DType::F32
        };

        let api = Api::new()?;
        let repo = api.model(model_id.to_string());
        let tokenizer_path = repo.get("tokenizer.json")?;
        let config_path = repo.get("config.json")?;
        let weights_paths = fetch_weights(&repo)?;

        let start = std::time::Instant::now();
        let config: starcoder2::Config =
            serde_json::from_reader(std::fs::File::open(&config_path)?)?;
        let vb = unsafe { VarBuilder::from_mmaped_safetensors(&weights_paths, dtype, &device)? };
        let model = starcoder2::Model::new(&config, vb)?;
        info!(
            "model built for {model_id} on {device:?} in {:.2}s",
            start.elapsed().as_secs_f32()
        );

        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow::anyhow!("error loading tokenizer: {e}"))?;
        let eos_token = *tokenizer.get_vocab(true).get(EOS_TOKEN).unwrap_or(&0);

        Ok(Arc::new(Self {
            model: Mutex::new(model),
            tokenizer,
            device,
            eos_token,
        }))
    }

    fn generate_inner(
        &self,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<String, EngineError> {
        check_params(params)?;

        let encoding = self
            .tokenizer
            .encode(prompt, true)
            .map_err(|e| EngineError::Runtime(format!("error encoding prompt: {e}")))?;
        let mut prompt_tokens = encoding.get_ids().to_vec();

        // max_length counts the prompt, matching the upstream pipeline semantics
        let to_sample = params.max_length.saturating_sub(prompt_tokens.len());
        if to_sample == 0 {
            return Ok(prompt.to_string());
        }

        if prompt_tokens.len() + to_sample > MAX_SEQ_LEN - 10 {
            let to_remove = prompt_tokens.len() + to_sample + 10 - MAX_SEQ_LEN;
            prompt_tokens = prompt_tokens[prompt_tokens.len().saturating_sub(to_remove)..].to_vec();
        }

        // do_sample=false or a zero temperature means greedy decoding
        let temperature = if params.do_sample && params.temperature > 0.0 {
            Some(params.temperature)
        } else {
            None
        };
        let mut logits_processor = LogitsProcessor::new(SEED, temperature, None);

        let mut model = self.model.lock();
        model.clear_kv_cache();

        let input = Tensor::new(prompt_tokens.as_slice(), &self.device)?.unsqueeze(0)?;
        let logits = model.forward(&input, 0)?;
        let logits = logits.squeeze(0)?.squeeze(0)?.to_dtype(DType::F32)?;
        let mut next_token = logits_processor.sample(&logits)?;

        let mut generated = Vec::with_capacity(to_sample);
        while next_token != self.eos_token && generated.len() < to_sample {
            generated.push(next_token);
            if generated.len() == to_sample {
                break;
            }
            let input = Tensor::new(&[next_token], &self.device)?.unsqueeze(0)?;
            let logits = model.forward(&input, prompt_tokens.len() + generated.len() - 1)?;
            let logits = logits.squeeze(0)?.squeeze(0)?.to_dtype(DType::F32)?;
            next_token = logits_processor.sample(&logits)?;
        }
        drop(model);

        let continuation = self
            .tokenizer
            .decode(&generated, true)
            .map_err(|e| EngineError::Runtime(format!("error decoding output: {e}")))?;

        // the full candidate text: prompt prefix plus continuation
        Ok(format!("{prompt}{continuation}"))
    }
}

/// Single-file checkpoints ship as `model.safetensors`; larger ones are
/// sharded behind a `model.safetensors.index.json` mapping tensor names to
/// shard files.
fn fetch_weights(repo: &hf_hub::api::sync::ApiRepo) -> Result<Vec<std::path::PathBuf>> {
    if let Ok(single) = repo.get("model.safetensors") {
        return Ok(vec![single]);
    }
    let index_path = repo.get("model.safetensors.index.json")?;
    let index: serde_json::Value = serde_json::from_reader(std::fs::File::open(&index_path)?)?;
    let weight_map = index
        .get("weight_map")
        .and_then(|v| v.as_object())
        .ok_or_else(|| anyhow::anyhow!("no weight_map in model.safetensors.index.json"))?;
    let mut shards: Vec<&str> = weight_map.values().filter_map(|v| v.as_str()).collect();
    shards.sort_unstable();
    shards.dedup();
    shards.into_iter().map(|f| Ok(repo.get(f)?)).collect()
}

fn check_params(params: &GenerationParams) -> Result<(), EngineError> {
    if params.max_length == 0 {
        return Err(EngineError::InvalidParams(
            "max_length must be at least 1".to_string(),
        ));
    }
    if !params.temperature.is_finite() || params.temperature < 0.0 {
        return Err(EngineError::InvalidParams(
            "temperature must be a finite non-negative number".to_string(),
        ));
    }
    Ok(())
}

#[async_trait]
impl TextGenerator for CandleEngine {
    async fn generate(
        &self,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<String, EngineError> {
        self.generate_inner(prompt, params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(max_length: usize, temperature: f64, do_sample: bool) -> GenerationParams {
        GenerationParams {
            max_length,
            temperature,
            do_sample,
        }
    }

    #[test]
    fn default_params_are_accepted() {
        assert!(check_params(&params(100, 0.7, true)).is_ok());
    }

    #[test]
    fn zero_max_length_is_rejected() {
        let err = check_params(&params(0, 0.7, true)).unwrap_err();
        assert!(matches!(err, EngineError::InvalidParams(_)));
    }

    #[test]
    fn bad_temperatures_are_rejected() {
        for t in [f64::NAN, f64::INFINITY, -0.5] {
            let err = check_params(&params(100, t, true)).unwrap_err();
            assert!(matches!(err, EngineError::InvalidParams(_)), "temp {t}");
        }
    }

    #[test]
    fn zero_temperature_means_greedy_and_is_valid() {
        assert!(check_params(&params(100, 0.0, false)).is_ok());
    }
}
