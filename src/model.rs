/// Parameters handed to [`Seq2SeqModel::generate`].
///
/// Lengths count decoder tokens, including the decoder start token.
#[derive(Clone, Debug, PartialEq)]
pub struct GenerationParams {
    /// Upper bound on the decoder sequence length.
    pub max_length: usize,
    /// The end-of-sequence token is suppressed below this length.
    pub min_length: usize,
    /// Number of hypotheses tracked at every step.
    pub num_beams: usize,
    /// Exponent applied to the hypothesis length when ranking finished beams.
    pub length_penalty: f32,
    /// Stop once `num_beams` finished hypotheses are collected.
    pub early_stopping: bool,
    /// Pick tokens by score only, never by random sampling.
    pub deterministic: bool,
}

/// Trait for pretrained encoder-decoder models used by the summarizer.
///
/// Implementors wrap a tokenizer and a sequence generator. The three
/// operations are expected to be deterministic for a fixed input and
/// `deterministic = true`.
pub trait Seq2SeqModel {
    /// The error type that can be returned by any of the operations.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Encodes `text` into token ids, silently dropping everything past
    /// `truncation_limit` tokens.
    fn encode(&mut self, text: &str, truncation_limit: usize) -> Result<Vec<u32>, Self::Error>;

    /// Generates an output token sequence for the encoded input.
    fn generate(
        &mut self,
        tokens: &[u32],
        params: &GenerationParams,
    ) -> Result<Vec<u32>, Self::Error>;

    /// Decodes generated token ids back to text, skipping control tokens.
    fn decode(&mut self, tokens: &[u32]) -> Result<String, Self::Error>;
}
