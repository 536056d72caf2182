use crate::error::ApiError;
use crate::profile::LengthOverrides;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A validated `/summarize` body.
#[derive(Debug, Clone, PartialEq)]
pub struct SummarizeRequest {
    pub text: String,
    pub overrides: LengthOverrides,
}

/// A validated `/batch_summarize` body.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchSummarizeRequest {
    pub texts: Vec<String>,
    pub overrides: LengthOverrides,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SummarizeResponse {
    pub summary: String,
    pub original_length: usize,
    pub summary_length: usize,
}

impl SummarizeResponse {
    /// Lengths are character counts, not byte or token counts.
    pub fn new(original: &str, summary: String) -> Self {
        Self {
            original_length: original.chars().count(),
            summary_length: summary.chars().count(),
            summary,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BatchSummarizeResponse {
    pub summaries: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
    pub engine: String,
    pub profile: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl SummarizeRequest {
    pub fn from_body(body: &[u8]) -> Result<Self, ApiError> {
        let fields = parse_object(body, "No text provided")?;

        let text = match fields.get("text") {
            None => return Err(ApiError::invalid("No text provided")),
            Some(Value::String(text)) => text,
            Some(_) => return Err(ApiError::invalid("text must be a string")),
        };
        if text.trim().is_empty() {
            return Err(ApiError::invalid("Empty text provided"));
        }

        Ok(Self {
            text: text.clone(),
            overrides: length_overrides(&fields)?,
        })
    }
}

impl BatchSummarizeRequest {
    pub fn from_body(body: &[u8]) -> Result<Self, ApiError> {
        let fields = parse_object(body, "No texts provided")?;

        let items = match fields.get("texts") {
            None => return Err(ApiError::invalid("No texts provided")),
            Some(Value::Array(items)) => items,
            Some(_) => return Err(ApiError::invalid("texts must be a list")),
        };

        let mut texts = Vec::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            let Value::String(text) = item else {
                return Err(ApiError::invalid(format!("texts[{}] must be a string", i)));
            };
            if text.trim().is_empty() {
                return Err(ApiError::invalid(format!(
                    "Empty text provided at index {}",
                    i
                )));
            }
            texts.push(text.clone());
        }

        Ok(Self {
            texts,
            overrides: length_overrides(&fields)?,
        })
    }
}

/// Parses the body as a JSON object. An empty body or a non-object value is
/// reported with `missing`, the same as an object without the required key.
fn parse_object(body: &[u8], missing: &str) -> Result<Map<String, Value>, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(ApiError::invalid(missing));
    }
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(fields)) => Ok(fields),
        Ok(_) => Err(ApiError::invalid(missing)),
        Err(e) => {
            log::debug!("Unparsable request body: {}", e);
            Err(ApiError::invalid("Invalid JSON body"))
        }
    }
}

fn length_overrides(fields: &Map<String, Value>) -> Result<LengthOverrides, ApiError> {
    Ok(LengthOverrides {
        max_length: length_field(fields, "max_length")?,
        min_length: length_field(fields, "min_length")?,
    })
}

fn length_field(fields: &Map<String, Value>, name: &str) -> Result<Option<usize>, ApiError> {
    match fields.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value
            .as_u64()
            .and_then(|n| usize::try_from(n).ok())
            .map(Some)
            .ok_or_else(|| ApiError::invalid(format!("{} must be a non-negative integer", name))),
    }
}
