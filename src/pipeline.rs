use crate::model::Seq2SeqModel;
use crate::profile::SummarizeConfig;

/// Error from one item of a batch, remembering which item failed.
#[derive(Debug, thiserror::Error)]
#[error("{source}")]
pub struct BatchItemError<E> {
    pub index: usize,
    pub source: E,
}

/// Encodes, generates and decodes a single text.
pub fn summarize_text<M: Seq2SeqModel>(
    model: &mut M,
    text: &str,
    config: &SummarizeConfig,
) -> Result<String, M::Error> {
    let tokens = model.encode(text, config.truncation_limit)?;
    log::debug!(
        "Encoded {} chars into {} tokens",
        text.chars().count(),
        tokens.len()
    );

    let output = model.generate(&tokens, &config.generation)?;
    model.decode(&output)
}

/// Summarizes every text in order with the same configuration.
///
/// The first failing item aborts the whole batch; summaries produced before
/// it are discarded.
pub fn summarize_batch<M: Seq2SeqModel>(
    model: &mut M,
    texts: &[String],
    config: &SummarizeConfig,
) -> Result<Vec<String>, BatchItemError<M::Error>> {
    let mut summaries = Vec::with_capacity(texts.len());
    for (index, text) in texts.iter().enumerate() {
        log::info!("Processing text {}/{}", index + 1, texts.len());
        let summary =
            summarize_text(model, text, config).map_err(|source| BatchItemError { index, source })?;
        summaries.push(summary);
    }
    Ok(summaries)
}
