//! Event wiring between the drawing surface, the provisioner and the classifier.

pub mod script;

use crate::canvas::{Canvas, Point};
use crate::classifier::{DigitRecognizer, ModelHandle};
use crate::config::schema::CanvasConfig;
use crate::error::{Result, ScrawlError};
use crate::models::{ModelProvisioner, ModelSource};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

/// Text shown before anything has been recognized
pub const PLACEHOLDER: &str = "Please draw a digit.";

/// Pointer input from the drawing surface
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerInput {
    Down(Point),
    Move(Point),
    Up,
}

/// Events consumed by the pad's event loop
#[derive(Debug)]
pub enum PadEvent {
    Provisioned(Result<ModelHandle>),
    Pointer(PointerInput),
    Clear,
    Shutdown,
}

/// Everything the user can see
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayState {
    pub prediction: String,
    /// Persistent notification, set on provisioning failure
    pub toast: Option<String>,
    pub ready: bool,
}

impl Default for DisplayState {
    fn default() -> Self {
        Self {
            prediction: PLACEHOLDER.to_string(),
            toast: None,
            ready: false,
        }
    }
}

/// Results of work spawned off the event loop
enum Completion {
    Initialized {
        model: String,
        result: Result<()>,
    },
    Classified {
        generation: u64,
        result: Result<String>,
    },
}

/// The digit pad controller
pub struct DigitPad<R: DigitRecognizer + 'static> {
    recognizer: Arc<R>,
    canvas: Canvas,
    display: watch::Sender<DisplayState>,
    initialized: bool,
    in_flight: usize,
    /// Bumped on clear so results for erased drawings are dropped
    generation: u64,
}

impl<R: DigitRecognizer + 'static> DigitPad<R> {
    #[must_use]
    pub fn new(recognizer: Arc<R>, canvas: &CanvasConfig) -> Self {
        let (display, _) = watch::channel(DisplayState::default());
        Self {
            recognizer,
            canvas: Canvas::new(canvas),
            display,
            initialized: false,
            in_flight: 0,
            generation: 0,
        }
    }

    /// Watch display updates
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<DisplayState> {
        self.display.subscribe()
    }

    /// Run until `Shutdown` or the event channel closes, then close the recognizer
    pub async fn run(mut self, mut events: mpsc::Receiver<PadEvent>) -> Result<()> {
        let (done_tx, mut done_rx) = mpsc::channel::<Completion>(32);

        tracing::info!("Pad started, waiting for model");

        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(PadEvent::Shutdown) | None => break,
                    Some(event) => self.handle_event(event, &done_tx),
                },
                Some(done) = done_rx.recv() => self.handle_completion(done),
            }
        }

        tracing::info!("Pad shutting down");

        // Let spawned work land before releasing the model
        while self.in_flight > 0 {
            match done_rx.recv().await {
                Some(done) => self.handle_completion(done),
                None => break,
            }
        }

        self.recognizer.close().await;
        Ok(())
    }

    fn handle_event(&mut self, event: PadEvent, done_tx: &mpsc::Sender<Completion>) {
        match event {
            PadEvent::Provisioned(Ok(handle)) => self.spawn_initialize(handle, done_tx),
            PadEvent::Provisioned(Err(e)) => {
                tracing::error!("Model provisioning failed: {e}");
                self.display.send_modify(|d| d.toast = Some(e.to_string()));
            }
            PadEvent::Pointer(PointerInput::Down(p)) => self.canvas.pointer_down(p),
            PadEvent::Pointer(PointerInput::Move(p)) => self.canvas.pointer_move(p),
            PadEvent::Pointer(PointerInput::Up) => {
                if self.canvas.pointer_up() {
                    self.on_gesture_complete(done_tx);
                }
            }
            PadEvent::Clear => {
                self.canvas.clear();
                self.generation += 1;
                self.display
                    .send_modify(|d| d.prediction = PLACEHOLDER.to_string());
            }
            PadEvent::Shutdown => {}
        }
    }

    fn spawn_initialize(&mut self, handle: ModelHandle, done_tx: &mpsc::Sender<Completion>) {
        let recognizer = Arc::clone(&self.recognizer);
        let done_tx = done_tx.clone();
        let model = handle.name().to_string();

        tracing::info!("Model {model} provisioned at {}", handle.path().display());
        self.in_flight += 1;

        tokio::spawn(async move {
            let result = recognizer.initialize(handle).await;
            done_tx
                .send(Completion::Initialized { model, result })
                .await
                .ok();
        });
    }

    fn on_gesture_complete(&mut self, done_tx: &mpsc::Sender<Completion>) {
        if !self.initialized {
            tracing::debug!("Gesture ignored, classifier not initialized");
            return;
        }

        let snapshot = self.canvas.snapshot();
        let recognizer = Arc::clone(&self.recognizer);
        let done_tx = done_tx.clone();
        let generation = self.generation;
        self.in_flight += 1;

        // Overlapping requests are neither serialized nor cancelled
        tokio::spawn(async move {
            let result = recognizer.classify(snapshot).await;
            done_tx
                .send(Completion::Classified { generation, result })
                .await
                .ok();
        });
    }

    fn handle_completion(&mut self, done: Completion) {
        self.in_flight = self.in_flight.saturating_sub(1);
        match done {
            Completion::Initialized {
                model,
                result: Ok(()),
            } => {
                tracing::info!("Classifier initialized with {model}");
                self.initialized = true;
                self.display.send_modify(|d| d.ready = true);
            }
            Completion::Initialized {
                model,
                result: Err(e),
            } => {
                tracing::error!("Failed to initialize classifier with {model}: {e}");
                self.display.send_modify(|d| d.toast = Some(e.to_string()));
            }
            Completion::Classified { generation, .. } if generation != self.generation => {
                tracing::debug!("Dropping result for a cleared drawing");
            }
            Completion::Classified {
                result: Ok(text), ..
            } => {
                tracing::info!("Prediction: {text}");
                self.display.send_modify(|d| d.prediction = text);
            }
            Completion::Classified {
                result: Err(e), ..
            } => {
                tracing::warn!("Classification failed: {e}");
                let message = failure_message(&e);
                self.display
                    .send_modify(|d| d.prediction = format!("Error classifying drawing: {message}"));
            }
        }
    }
}

fn failure_message(error: &ScrawlError) -> String {
    match error {
        ScrawlError::Classification(inner) => inner.to_string(),
        other => other.to_string(),
    }
}

/// Provision in the background and report the outcome as a `Provisioned` event
pub fn spawn_provisioning<S: ModelSource + 'static>(
    provisioner: Arc<ModelProvisioner<S>>,
    events: mpsc::Sender<PadEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let result = provisioner.provision().await;
        if events.send(PadEvent::Provisioned(result)).await.is_err() {
            tracing::debug!("Pad exited before provisioning finished");
        }
    })
}
