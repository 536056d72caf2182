use crate::generation::{GenerationError, SpecialTokens, beam_search};
use crate::model::{GenerationParams, Seq2SeqModel};
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::t5;
use std::path::{Path, PathBuf};
use tokenizers::{Tokenizer, TruncationParams};

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid model config: {0}")]
    Config(#[from] serde_json::Error),
    #[error("tokenizer error: {0}")]
    Tokenizer(String),
    #[error(transparent)]
    Candle(#[from] candle_core::Error),
    #[error(transparent)]
    Generation(#[from] GenerationError<candle_core::Error>),
}

impl ModelError {
    fn tokenizer(e: tokenizers::Error) -> Self {
        ModelError::Tokenizer(e.to_string())
    }
}

/// Where and how to load a T5-family summarization model.
#[derive(Clone, Debug)]
pub struct T5Options {
    /// Directory holding `config.json`, `tokenizer.json` and `model.safetensors`.
    pub model_dir: PathBuf,
    /// Task prefix prepended to every input, e.g. `"summarize: "`.
    pub prefix: String,
    /// Run on the CPU even when a GPU is available.
    pub cpu: bool,
}

/// A T5 encoder-decoder with its tokenizer, loaded once.
pub struct T5Summarizer {
    model: t5::T5ForConditionalGeneration,
    tokenizer: Tokenizer,
    device: Device,
    special: SpecialTokens,
    prefix: String,
}

impl T5Summarizer {
    pub fn load(options: &T5Options) -> Result<Self, ModelError> {
        let device = if options.cpu {
            Device::Cpu
        } else {
            Device::cuda_if_available(0)?
        };
        log::debug!("Using device {:?}", device);

        let config_path = options.model_dir.join("config.json");
        let config: t5::Config = serde_json::from_str(&read_to_string(&config_path)?)?;

        let tokenizer_path = options.model_dir.join("tokenizer.json");
        let tokenizer = Tokenizer::from_file(&tokenizer_path).map_err(ModelError::tokenizer)?;

        let weights_path = options.model_dir.join("model.safetensors");
        if !weights_path.exists() {
            return Err(ModelError::Io {
                path: weights_path,
                source: std::io::ErrorKind::NotFound.into(),
            });
        }
        // SAFETY: the weights file is not modified while the model is alive
        let vb =
            unsafe { VarBuilder::from_mmaped_safetensors(&[weights_path], DType::F32, &device)? };
        let model = t5::T5ForConditionalGeneration::load(vb, &config)?;

        let special = SpecialTokens {
            decoder_start: config.decoder_start_token_id.unwrap_or(config.pad_token_id) as u32,
            eos: config.eos_token_id as u32,
        };

        Ok(Self {
            model,
            tokenizer,
            device,
            special,
            prefix: options.prefix.clone(),
        })
    }
}

fn read_to_string(path: &Path) -> Result<String, ModelError> {
    std::fs::read_to_string(path).map_err(|source| ModelError::Io {
        path: path.to_path_buf(),
        source,
    })
}

impl Seq2SeqModel for T5Summarizer {
    type Error = ModelError;

    fn encode(&mut self, text: &str, truncation_limit: usize) -> Result<Vec<u32>, Self::Error> {
        self.tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: truncation_limit,
                ..Default::default()
            }))
            .map_err(ModelError::tokenizer)?;

        let input = format!("{}{}", self.prefix, text);
        let encoding = self
            .tokenizer
            .encode(input, true)
            .map_err(ModelError::tokenizer)?;
        Ok(encoding.get_ids().to_vec())
    }

    fn generate(
        &mut self,
        tokens: &[u32],
        params: &GenerationParams,
    ) -> Result<Vec<u32>, Self::Error> {
        self.model.clear_kv_cache();
        let input_ids = Tensor::new(tokens, &self.device)?.unsqueeze(0)?;
        let encoder_output = self.model.encode(&input_ids)?;

        let model = &mut self.model;
        let device = &self.device;
        let output = beam_search(params, self.special, |prefix| {
            // the decoder cache holds a single beam, so every step replays the prefix
            model.clear_kv_cache();
            let decoder_ids = Tensor::new(prefix, device)?.unsqueeze(0)?;
            model
                .decode(&decoder_ids, &encoder_output)?
                .squeeze(0)?
                .to_dtype(DType::F32)?
                .to_vec1::<f32>()
        })?;
        self.model.clear_kv_cache();

        Ok(output)
    }

    fn decode(&mut self, tokens: &[u32]) -> Result<String, Self::Error> {
        let text = self
            .tokenizer
            .decode(tokens, true)
            .map_err(ModelError::tokenizer)?;
        Ok(text.trim().to_string())
    }
}
