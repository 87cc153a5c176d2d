use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::{broadcast, watch};

use crate::assets::source::ImageRef;
use crate::compose::compositor::compose;
use crate::foundation::cancel::CancelToken;
use crate::foundation::core::RasterImage;
use crate::foundation::error::{LuminaError, LuminaResult};
use crate::history::record::HistoryRecord;
use crate::history::store::HistoryStore;
use crate::persist::persistor::Persistor;
use crate::pipeline::state::{PipelineEvent, PipelineState, PipelineStatus};
use crate::pipeline::task::TaskHandle;

/// Options for [`PipelineCoordinator`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PipelineOpts {
    /// Minimum time a composition takes, for a perceptible "processing" phase. Zero disables it.
    pub min_latency: Duration,
    /// Template label recorded with every saved creation.
    pub template_label: String,
    /// Capacity of the event broadcast channel.
    pub event_capacity: usize,
}

impl Default for PipelineOpts {
    fn default() -> Self {
        Self {
            min_latency: Duration::from_millis(1500),
            template_label: "Custom Template".to_string(),
            event_capacity: 64,
        }
    }
}

/// Orchestrates compose -> persist -> record for one creation session.
///
/// All session state is owned here and changed only through these methods; at most one
/// composition is ever in flight. Background work runs on the tokio runtime the operation was
/// started from.
#[derive(Debug)]
pub struct PipelineCoordinator {
    shared: Arc<Shared>,
}

#[derive(Debug)]
struct Shared {
    persistor: Arc<Persistor>,
    history: Arc<HistoryStore>,
    opts: PipelineOpts,
    session: Mutex<Session>,
    status: watch::Sender<PipelineStatus>,
    events: broadcast::Sender<PipelineEvent>,
}

#[derive(Debug, Default)]
struct Session {
    state: PipelineState,
    busy: bool,
    photo: Option<ImageRef>,
    template: Option<ImageRef>,
    result: Option<RasterImage>,
    // Bumped whenever an operation starts or the session resets; completions carrying an older
    // generation are ignored.
    generation: u64,
    in_flight: Option<CancelToken>,
}

impl Session {
    fn selection_state(&self) -> PipelineState {
        if self.photo.is_some() && self.template.is_some() {
            PipelineState::Selecting
        } else {
            PipelineState::Idle
        }
    }

    fn status(&self) -> PipelineStatus {
        PipelineStatus {
            state: self.state,
            busy: self.busy,
            has_photo: self.photo.is_some(),
            has_template: self.template.is_some(),
            result_size: self.result.as_ref().map(RasterImage::dimensions),
        }
    }
}

impl PipelineCoordinator {
    /// Create an idle coordinator.
    pub fn new(persistor: Arc<Persistor>, history: Arc<HistoryStore>, opts: PipelineOpts) -> Self {
        let (status, _) = watch::channel(PipelineStatus::default());
        let (events, _) = broadcast::channel(opts.event_capacity.max(1));
        Self {
            shared: Arc::new(Shared {
                persistor,
                history,
                opts,
                session: Mutex::new(Session::default()),
                status,
                events,
            }),
        }
    }

    /// Shared history store.
    pub fn history(&self) -> &Arc<HistoryStore> {
        &self.shared.history
    }

    /// Options in effect.
    pub fn opts(&self) -> &PipelineOpts {
        &self.shared.opts
    }

    /// Current status.
    pub fn status(&self) -> PipelineStatus {
        self.shared.lock_session().status()
    }

    /// Current state.
    pub fn state(&self) -> PipelineState {
        self.shared.lock_session().state
    }

    /// Live status updates.
    pub fn watch_status(&self) -> watch::Receiver<PipelineStatus> {
        self.shared.status.subscribe()
    }

    /// Subscribe to coordinator events.
    pub fn subscribe_events(&self) -> broadcast::Receiver<PipelineEvent> {
        self.shared.events.subscribe()
    }

    /// The composed result, while one is held.
    pub fn result(&self) -> Option<RasterImage> {
        self.shared.lock_session().result.clone()
    }

    /// Choose the user photo. Valid while idle or selecting.
    pub fn select_photo(&self, photo: impl Into<ImageRef>) -> LuminaResult<()> {
        let photo = photo.into();
        self.shared.select("photo", |s| s.photo = Some(photo))
    }

    /// Choose the template. Valid while idle or selecting.
    pub fn select_template(&self, template: impl Into<ImageRef>) -> LuminaResult<()> {
        let template = template.into();
        self.shared.select("template", |s| s.template = Some(template))
    }

    /// Start composing the selected photo onto the selected template.
    ///
    /// Requires a selected photo and no composition in flight; a missing template composes
    /// through the pass-through fallback.
    pub fn process_image(&self) -> LuminaResult<TaskHandle<()>> {
        let mut s = self.shared.lock_session();
        if s.state == PipelineState::Processing {
            return Err(LuminaError::invalid_state("a composition is already in flight"));
        }
        if !s.state.accepts_selection() {
            return Err(LuminaError::invalid_state(format!(
                "cannot process while {}",
                s.state
            )));
        }
        let Some(photo) = s.photo.clone() else {
            return Err(LuminaError::invalid_state("no photo selected"));
        };
        let template = s.template.clone();

        let prior = s.state;
        let cancel = CancelToken::new();
        s.state = PipelineState::Processing;
        s.busy = true;
        s.generation += 1;
        s.in_flight = Some(cancel.clone());
        let generation = s.generation;
        self.shared.publish(&s);
        drop(s);

        tracing::info!(photo = %photo.describe(), generation, "processing started");
        let shared = Arc::clone(&self.shared);
        let token = cancel.clone();
        // Built before spawning so an abort ahead of the first poll still reverts.
        let guard = RevertGuard::new(
            Arc::clone(&shared),
            generation,
            PipelineState::Processing,
            prior,
        );
        let join = tokio::spawn(async move {
            let outcome = run_compose(&shared.opts, photo, template, &token).await;
            shared.finish_process(guard, prior, outcome)
        });
        Ok(TaskHandle::new(join, cancel))
    }

    /// Persist the held result and record it in the history.
    ///
    /// Valid only while `Ready`; on failure the coordinator stays `Ready` with the result kept.
    pub fn save_result(&self) -> LuminaResult<TaskHandle<HistoryRecord>> {
        let mut s = self.shared.lock_session();
        if s.state != PipelineState::Ready {
            return Err(LuminaError::invalid_state(format!(
                "save requires a ready result, state is {}",
                s.state
            )));
        }
        let Some(image) = s.result.clone() else {
            return Err(LuminaError::invalid_state("no composed result to save"));
        };

        let cancel = CancelToken::new();
        s.state = PipelineState::Saving;
        s.generation += 1;
        s.in_flight = Some(cancel.clone());
        let generation = s.generation;
        self.shared.publish(&s);
        drop(s);

        tracing::info!(generation, "saving started");
        let shared = Arc::clone(&self.shared);
        let token = cancel.clone();
        // Reverts if the worker panics or the pool drops the job before it starts.
        let guard = RevertGuard::new(
            Arc::clone(&shared),
            generation,
            PipelineState::Saving,
            PipelineState::Ready,
        );
        // The worker settles the session itself: `Saving` ends only once the artifact is
        // committed and recorded, or abandoned.
        let join = tokio::task::spawn_blocking(move || {
            let outcome = persist_and_record(
                &shared.persistor,
                &shared.history,
                &image,
                &shared.opts.template_label,
                &token,
            );
            shared.finish_save(guard, outcome)
        });
        Ok(TaskHandle::new(join, cancel))
    }

    /// Return to `Idle`, dropping the selection and any result and cancelling in-flight work.
    pub fn reset(&self) {
        let mut s = self.shared.lock_session();
        if let Some(token) = s.in_flight.take() {
            token.cancel();
        }
        let generation = s.generation + 1;
        *s = Session {
            generation,
            ..Session::default()
        };
        self.shared.publish(&s);
        drop(s);

        tracing::debug!(generation, "session reset");
        self.shared.emit(PipelineEvent::Reset);
    }
}

impl Shared {
    fn lock_session(&self) -> MutexGuard<'_, Session> {
        // Every mutation leaves the session coherent before releasing the lock.
        self.session.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn publish(&self, s: &Session) {
        self.status.send_replace(s.status());
    }

    fn emit(&self, event: PipelineEvent) {
        // No receivers is fine.
        let _ = self.events.send(event);
    }

    fn select(&self, what: &str, apply: impl FnOnce(&mut Session)) -> LuminaResult<()> {
        let mut s = self.lock_session();
        if !s.state.accepts_selection() {
            return Err(LuminaError::invalid_state(format!(
                "cannot select {what} while {}",
                s.state
            )));
        }
        apply(&mut s);
        s.state = s.selection_state();
        self.publish(&s);
        tracing::debug!(what, state = %s.state, "selection updated");
        Ok(())
    }

    fn finish_process(
        &self,
        guard: RevertGuard,
        prior: PipelineState,
        outcome: LuminaResult<RasterImage>,
    ) -> LuminaResult<()> {
        let generation = guard.disarm();
        let mut s = self.lock_session();
        if s.generation != generation {
            tracing::debug!(generation, "discarding composition from a reset session");
            return Err(LuminaError::cancelled("session was reset during processing"));
        }
        s.busy = false;
        s.in_flight = None;

        match outcome {
            Ok(img) => {
                let (width, height) = img.dimensions();
                s.result = Some(img);
                s.state = PipelineState::Ready;
                self.publish(&s);
                drop(s);
                tracing::info!(width, height, "composition ready");
                self.emit(PipelineEvent::Processed { width, height });
                Ok(())
            }
            Err(e) => {
                s.state = prior;
                self.publish(&s);
                drop(s);
                if e.is_cancelled() {
                    tracing::info!("processing cancelled");
                    self.emit(PipelineEvent::Cancelled {
                        stage: PipelineState::Processing,
                    });
                } else {
                    tracing::error!(error = %e, "processing failed");
                    self.emit(PipelineEvent::ProcessFailed {
                        error: e.to_string(),
                    });
                }
                Err(e)
            }
        }
    }

    fn finish_save(
        &self,
        guard: RevertGuard,
        outcome: LuminaResult<HistoryRecord>,
    ) -> LuminaResult<HistoryRecord> {
        let generation = guard.disarm();
        let mut s = self.lock_session();
        let current = s.generation == generation;
        if current {
            s.in_flight = None;
        }

        match outcome {
            Ok(record) => {
                if current {
                    s.result = None;
                    s.state = PipelineState::Saved;
                    self.publish(&s);
                }
                drop(s);
                self.emit(PipelineEvent::Saved(record.clone()));
                Ok(record)
            }
            Err(e) => {
                if current {
                    s.state = PipelineState::Ready;
                    self.publish(&s);
                }
                drop(s);
                if e.is_cancelled() {
                    tracing::info!("saving cancelled");
                    self.emit(PipelineEvent::Cancelled {
                        stage: PipelineState::Saving,
                    });
                } else {
                    tracing::error!(error = %e, "saving failed");
                    self.emit(PipelineEvent::SaveFailed {
                        error: e.to_string(),
                    });
                }
                Err(e)
            }
        }
    }
}

async fn run_compose(
    opts: &PipelineOpts,
    photo: ImageRef,
    template: Option<ImageRef>,
    cancel: &CancelToken,
) -> LuminaResult<RasterImage> {
    if !opts.min_latency.is_zero() {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(LuminaError::cancelled("cancelled while waiting")),
            _ = tokio::time::sleep(opts.min_latency) => {}
        }
    }
    cancel.check("processing")?;

    let composed = tokio::task::spawn_blocking(move || {
        let photo = photo.materialize()?;
        let template = template.and_then(|t| match t.materialize() {
            Ok(img) => Some(img),
            Err(e) => {
                tracing::warn!(error = %e, "template unavailable, passing photo through");
                None
            }
        });
        compose(template.as_ref(), &photo)
    })
    .await
    .map_err(|e| LuminaError::Other(anyhow::anyhow!("compose worker failed: {e}")))??;

    cancel.check("processing")?;
    Ok(composed)
}

/// Persist then append; the artifact commit is the point of no return.
fn persist_and_record(
    persistor: &Persistor,
    history: &HistoryStore,
    image: &RasterImage,
    label: &str,
    cancel: &CancelToken,
) -> LuminaResult<HistoryRecord> {
    let locator = persistor.persist_with_cancel(image, cancel)?;
    history.append(locator.clone(), label).map_err(|e| {
        if let Err(de) = persistor.discard(&locator) {
            tracing::warn!(%locator, error = %de, "failed to discard unrecorded artifact");
        }
        match e {
            LuminaError::Persist(_) => e,
            other => LuminaError::persist(other.to_string()),
        }
    })
}

/// Restores the prior stable state if an operation's task is dropped before settling
/// (abort or panic).
struct RevertGuard {
    shared: Arc<Shared>,
    generation: u64,
    expected: PipelineState,
    revert_to: PipelineState,
    armed: bool,
}

impl RevertGuard {
    fn new(
        shared: Arc<Shared>,
        generation: u64,
        expected: PipelineState,
        revert_to: PipelineState,
    ) -> Self {
        Self {
            shared,
            generation,
            expected,
            revert_to,
            armed: true,
        }
    }

    fn disarm(mut self) -> u64 {
        self.armed = false;
        self.generation
    }
}

impl Drop for RevertGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut s = self.shared.lock_session();
        if s.generation != self.generation || s.state != self.expected {
            return;
        }
        s.state = self.revert_to;
        s.busy = false;
        s.in_flight = None;
        self.shared.publish(&s);
        drop(s);
        tracing::warn!(stage = %self.expected, "pipeline task dropped, state reverted");
        self.shared.emit(PipelineEvent::Cancelled {
            stage: self.expected,
        });
    }
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/coordinator.rs"]
mod tests;
