//! Deterministic beam search over a next-token scoring function.
//!
//! The search is independent of any tensor library: a backend supplies a
//! closure that maps a decoder prefix to logits over its vocabulary, and the
//! search handles length limits, beam bookkeeping and hypothesis ranking.

use crate::model::GenerationParams;
use std::cmp::Ordering;

/// Token ids that drive the decoder loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SpecialTokens {
    pub decoder_start: u32,
    pub eos: u32,
}

#[derive(Debug, thiserror::Error)]
pub enum GenerationError<E> {
    #[error("random sampling is not supported, generation must be deterministic")]
    Sampling,
    #[error("num_beams must be at least 1")]
    NoBeams,
    #[error(transparent)]
    Step(E),
}

struct Hypothesis {
    tokens: Vec<u32>,
    score: f32,
}

/// Bounded set of finished hypotheses, best first.
struct Hypotheses {
    items: Vec<Hypothesis>,
    capacity: usize,
    length_penalty: f32,
}

impl Hypotheses {
    fn new(capacity: usize, length_penalty: f32) -> Self {
        Self {
            items: Vec::with_capacity(capacity + 1),
            capacity,
            length_penalty,
        }
    }

    fn normalize(&self, sum_log_probs: f32, generated_len: usize) -> f32 {
        sum_log_probs / (generated_len.max(1) as f32).powf(self.length_penalty)
    }

    fn add(&mut self, tokens: Vec<u32>, sum_log_probs: f32, generated_len: usize) {
        let score = self.normalize(sum_log_probs, generated_len);
        // stable insertion keeps the earlier hypothesis ahead on ties
        let at = self
            .items
            .iter()
            .position(|h| h.score < score)
            .unwrap_or(self.items.len());
        self.items.insert(at, Hypothesis { tokens, score });
        self.items.truncate(self.capacity);
    }

    fn is_full(&self) -> bool {
        self.items.len() >= self.capacity
    }

    fn worst_score(&self) -> f32 {
        self.items.last().map_or(f32::NEG_INFINITY, |h| h.score)
    }

    /// Whether the search can end after a step at `cur_len`.
    fn is_done(&self, early_stopping: bool, best_live: f32, cur_len: usize) -> bool {
        if !self.is_full() {
            return false;
        }
        if early_stopping {
            return true;
        }
        self.normalize(best_live, cur_len) <= self.worst_score()
    }

    fn into_best(self) -> Vec<u32> {
        self.items
            .into_iter()
            .next()
            .map(|h| h.tokens)
            .unwrap_or_default()
    }
}

struct Candidate {
    beam: usize,
    token: u32,
    score: f32,
}

/// Runs beam search and returns the best sequence without the start and
/// end-of-sequence tokens.
///
/// `next_logits` receives the full decoder prefix (start token included) and
/// returns unnormalized scores over the vocabulary.
pub fn beam_search<E, F>(
    params: &GenerationParams,
    special: SpecialTokens,
    mut next_logits: F,
) -> Result<Vec<u32>, GenerationError<E>>
where
    F: FnMut(&[u32]) -> Result<Vec<f32>, E>,
{
    if !params.deterministic {
        return Err(GenerationError::Sampling);
    }
    if params.num_beams == 0 {
        return Err(GenerationError::NoBeams);
    }

    let num_beams = params.num_beams;
    let mut hypotheses = Hypotheses::new(num_beams, params.length_penalty);
    let mut beams: Vec<(Vec<u32>, f32)> = vec![(vec![special.decoder_start], 0.0)];
    let mut done = false;

    loop {
        let cur_len = beams[0].0.len();
        if cur_len >= params.max_length {
            break;
        }

        let mut candidates = Vec::with_capacity(beams.len() * 2 * num_beams);
        for (beam, (prefix, score)) in beams.iter().enumerate() {
            let logits = next_logits(prefix.as_slice()).map_err(GenerationError::Step)?;
            let mut log_probs = log_softmax(&logits);
            if cur_len < params.min_length {
                if let Some(p) = log_probs.get_mut(special.eos as usize) {
                    *p = f32::NEG_INFINITY;
                }
            }
            for (token, log_prob) in top_k(&log_probs, 2 * num_beams) {
                candidates.push(Candidate {
                    beam,
                    token,
                    score: score + log_prob,
                });
            }
        }
        candidates.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then(a.token.cmp(&b.token))
                .then(a.beam.cmp(&b.beam))
        });

        let mut next = Vec::with_capacity(num_beams);
        for (rank, candidate) in candidates.into_iter().enumerate() {
            if candidate.score == f32::NEG_INFINITY {
                break;
            }
            let prefix = &beams[candidate.beam].0;
            if candidate.token == special.eos {
                if rank < num_beams {
                    hypotheses.add(prefix[1..].to_vec(), candidate.score, cur_len);
                }
            } else {
                let mut tokens = prefix.clone();
                tokens.push(candidate.token);
                next.push((tokens, candidate.score));
            }
            if next.len() == num_beams {
                break;
            }
        }

        if next.is_empty() {
            done = true;
            break;
        }
        beams = next;

        if hypotheses.is_done(params.early_stopping, beams[0].1, cur_len) {
            done = true;
            break;
        }
    }

    if !done {
        for (tokens, score) in beams {
            let generated_len = tokens.len() - 1;
            hypotheses.add(tokens[1..].to_vec(), score, generated_len);
        }
    }

    Ok(hypotheses.into_best())
}

fn log_softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let sum: f32 = logits.iter().map(|x| (x - max).exp()).sum();
    let log_sum = sum.ln();
    logits.iter().map(|x| x - max - log_sum).collect()
}

/// Top `k` entries by value, ties broken by lower index.
fn top_k(values: &[f32], k: usize) -> Vec<(u32, f32)> {
    let by_score = |a: &(u32, f32), b: &(u32, f32)| -> Ordering {
        b.1.total_cmp(&a.1).then(a.0.cmp(&b.0))
    };
    let mut indexed: Vec<(u32, f32)> = values
        .iter()
        .enumerate()
        .map(|(i, v)| (i as u32, *v))
        .collect();
    if k < indexed.len() {
        indexed.select_nth_unstable_by(k, by_score);
        indexed.truncate(k);
    }
    indexed.sort_by(by_score);
    indexed
}
