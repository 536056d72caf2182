use crate::error::SummarizeError;
use crate::model::Seq2SeqModel;
use crate::pipeline;
use crate::profile::{LengthOverrides, Profile, ProfileSettings, SummarizeConfig};
use std::{
    any::Any,
    panic::{self, AssertUnwindSafe},
    sync::{
        Arc, Mutex, PoisonError,
        atomic::{AtomicU64, Ordering},
        mpsc,
    },
    thread::JoinHandle,
    time::Instant,
};
use tokio::sync::oneshot;

/// Represents the current state of the inference thread.
#[derive(Clone, Debug, PartialEq)]
pub enum EngineState {
    /// Waiting for the next request.
    Idle,
    /// Currently running the model.
    Processing,
}

impl EngineState {
    pub fn as_str(&self) -> &'static str {
        match self {
            EngineState::Idle => "idle",
            EngineState::Processing => "processing",
        }
    }
}

enum Job {
    Single {
        text: String,
        reply: oneshot::Sender<Result<String, SummarizeError>>,
    },
    Batch {
        texts: Vec<String>,
        reply: oneshot::Sender<Result<Vec<String>, SummarizeError>>,
    },
}

struct EngineRequest {
    id: u64,
    config: SummarizeConfig,
    job: Job,
}

/// Owns the loaded model on a dedicated inference thread.
///
/// The model is moved onto the thread once and never leaves it, so requests
/// from any number of handlers reach it through a channel and run one at a
/// time. A batch is a single job: its items are never interleaved with other
/// requests.
pub struct SummarizerEngine {
    profile: Profile,
    settings: ProfileSettings,
    state: Arc<Mutex<EngineState>>,
    req_tx: Option<mpsc::Sender<EngineRequest>>,
    inference_handle: Option<JoinHandle<()>>,
    id_counter: AtomicU64,
}

impl SummarizerEngine {
    /// Spawns the inference thread and hands it the model.
    pub fn new<M>(mut model: M, profile: Profile) -> Self
    where
        M: Seq2SeqModel + Send + 'static,
    {
        let (req_tx, req_rx) = mpsc::channel::<EngineRequest>();
        let state = Arc::new(Mutex::new(EngineState::Idle));

        let inference_handle = std::thread::spawn({
            let state = state.clone();
            move || {
                while let Ok(req) = req_rx.recv() {
                    log::debug!("Running request {}", req.id);
                    set_state(&state, EngineState::Processing);
                    let start_time = Instant::now();

                    match req.job {
                        Job::Single { text, reply } => {
                            log::info!("Summarizing text of length: {}", text.chars().count());
                            let result = run_guarded(|| {
                                pipeline::summarize_text(&mut model, &text, &req.config)
                                    .map_err(|e| SummarizeError::Generation(e.to_string()))
                            });
                            if result.is_ok() {
                                log::info!("Summary generated successfully");
                            }
                            let _ = reply.send(result);
                        }
                        Job::Batch { texts, reply } => {
                            let result = run_guarded(|| {
                                pipeline::summarize_batch(&mut model, &texts, &req.config).map_err(
                                    |e| {
                                        log::error!(
                                            "Batch item {}/{} failed, discarding the batch",
                                            e.index + 1,
                                            texts.len()
                                        );
                                        SummarizeError::Generation(e.source.to_string())
                                    },
                                )
                            });
                            let _ = reply.send(result);
                        }
                    }

                    log::debug!(
                        "Request {} completed in {:?}",
                        req.id,
                        start_time.elapsed()
                    );
                    set_state(&state, EngineState::Idle);
                }
            }
        });

        Self {
            profile,
            settings: profile.settings(),
            state,
            req_tx: Some(req_tx),
            inference_handle: Some(inference_handle),
            id_counter: AtomicU64::new(0),
        }
    }

    pub fn profile(&self) -> Profile {
        self.profile
    }

    pub fn state(&self) -> EngineState {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Summarizes one text with the active profile and `overrides`.
    pub async fn summarize(
        &self,
        text: String,
        overrides: LengthOverrides,
    ) -> Result<String, SummarizeError> {
        let (reply, rx) = oneshot::channel();
        self.schedule(Job::Single { text, reply }, overrides)?;
        rx.await.map_err(|_| SummarizeError::EngineStopped)?
    }

    /// Summarizes every text in order; any failure fails the whole batch.
    pub async fn batch_summarize(
        &self,
        texts: Vec<String>,
        overrides: LengthOverrides,
    ) -> Result<Vec<String>, SummarizeError> {
        let (reply, rx) = oneshot::channel();
        self.schedule(Job::Batch { texts, reply }, overrides)?;
        rx.await.map_err(|_| SummarizeError::EngineStopped)?
    }

    fn schedule(&self, job: Job, overrides: LengthOverrides) -> Result<(), SummarizeError> {
        let tx = self.req_tx.as_ref().ok_or(SummarizeError::EngineStopped)?;
        let id = self.id_counter.fetch_add(1, Ordering::Relaxed);
        log::debug!("Scheduling request {}", id);

        tx.send(EngineRequest {
            id,
            config: self.settings.resolve(overrides),
            job,
        })
        .map_err(|_| SummarizeError::EngineStopped)
    }

    /// Closes the request channel and waits for the inference thread to
    /// finish the requests already queued.
    pub fn stop(&mut self) {
        self.req_tx.take();
        if let Some(handle) = self.inference_handle.take() {
            if handle.join().is_err() {
                log::error!("Inference thread panicked");
            }
        }
    }
}

impl Drop for SummarizerEngine {
    fn drop(&mut self) {
        self.stop();
    }
}

fn set_state(state: &Mutex<EngineState>, next: EngineState) {
    *state.lock().unwrap_or_else(PoisonError::into_inner) = next;
}

/// Runs one job, turning a panic inside the model into a failed request so
/// the inference thread keeps serving.
fn run_guarded<T>(
    job: impl FnOnce() -> Result<T, SummarizeError>,
) -> Result<T, SummarizeError> {
    panic::catch_unwind(AssertUnwindSafe(job)).unwrap_or_else(|payload| {
        let message = panic_message(payload.as_ref());
        log::error!("Model panicked: {}", message);
        Err(SummarizeError::Generation(format!("model panicked: {}", message)))
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::GenerationParams;

    #[derive(Debug, thiserror::Error)]
    #[error("model exploded")]
    struct Exploded;

    /// Echoes the input reversed, fails on empty input, panics on "panic".
    struct ReverseModel;

    impl Seq2SeqModel for ReverseModel {
        type Error = Exploded;

        fn encode(&mut self, text: &str, limit: usize) -> Result<Vec<u32>, Exploded> {
            if text.contains("panic") {
                panic!("model crashed");
            }
            Ok(text.chars().take(limit).map(u32::from).collect())
        }

        fn generate(&mut self, tokens: &[u32], _: &GenerationParams) -> Result<Vec<u32>, Exploded> {
            if tokens.is_empty() {
                return Err(Exploded);
            }
            Ok(tokens.iter().rev().copied().collect())
        }

        fn decode(&mut self, tokens: &[u32]) -> Result<String, Exploded> {
            Ok(tokens.iter().filter_map(|t| char::from_u32(*t)).collect())
        }
    }

    #[tokio::test]
    async fn summarize_runs_on_the_inference_thread() {
        let engine = SummarizerEngine::new(ReverseModel, Profile::Fast);

        let summary = engine
            .summarize("abc".to_string(), LengthOverrides::default())
            .await
            .unwrap();

        assert_eq!(summary, "cba");
        assert_eq!(engine.state(), EngineState::Idle);
        assert_eq!(engine.profile(), Profile::Fast);
    }

    #[tokio::test]
    async fn batch_failure_discards_earlier_summaries() {
        let engine = SummarizerEngine::new(ReverseModel, Profile::Quality);

        let err = engine
            .batch_summarize(
                vec!["ok".to_string(), String::new(), "later".to_string()],
                LengthOverrides::default(),
            )
            .await
            .unwrap_err();

        assert_eq!(err, SummarizeError::Generation("model exploded".to_string()));
    }

    #[tokio::test]
    async fn engine_recovers_after_a_model_panic() {
        let engine = SummarizerEngine::new(ReverseModel, Profile::Quality);

        let err = engine
            .summarize("panic".to_string(), LengthOverrides::default())
            .await
            .unwrap_err();
        assert_eq!(
            err,
            SummarizeError::Generation("model panicked: model crashed".to_string())
        );
        assert_eq!(engine.state(), EngineState::Idle);

        let summary = engine
            .summarize("good text".to_string(), LengthOverrides::default())
            .await
            .unwrap();
        assert_eq!(summary, "txet doog");
    }

    #[tokio::test]
    async fn panic_inside_a_batch_fails_only_that_batch() {
        let engine = SummarizerEngine::new(ReverseModel, Profile::Quality);

        let err = engine
            .batch_summarize(
                vec!["fine".to_string(), "panic now".to_string()],
                LengthOverrides::default(),
            )
            .await
            .unwrap_err();
        assert_eq!(
            err,
            SummarizeError::Generation("model panicked: model crashed".to_string())
        );

        let summaries = engine
            .batch_summarize(vec!["ab".to_string()], LengthOverrides::default())
            .await
            .unwrap();
        assert_eq!(summaries, vec!["ba"]);
    }

    #[test]
    fn panic_messages_are_extracted() {
        let owned: Box<dyn Any + Send> = Box::new(String::from("index out of bounds"));
        assert_eq!(panic_message(owned.as_ref()), "index out of bounds");
        let other: Box<dyn Any + Send> = Box::new(7_u8);
        assert_eq!(panic_message(other.as_ref()), "unknown panic");
    }

    #[tokio::test]
    async fn stopped_engine_rejects_new_work() {
        let mut engine = SummarizerEngine::new(ReverseModel, Profile::Quality);
        engine.stop();

        let err = engine
            .batch_summarize(vec!["x".to_string()], LengthOverrides::default())
            .await
            .unwrap_err();
        assert_eq!(err, SummarizeError::EngineStopped);
    }
}
