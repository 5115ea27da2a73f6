pub mod engine;
pub mod handle;
pub mod prediction;
pub mod preprocess;

use crate::canvas::DrawingBitmap;
use crate::config::schema::ClassifierConfig;
use crate::error::{ClassificationError, Result, ScrawlError};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

pub use engine::{InferenceEngine, TractEngine};
pub use handle::ModelHandle;
pub use prediction::Prediction;
pub use preprocess::{InputLayout, PixelScale};

/// Unified interface for turning a drawing into a prediction string
#[async_trait]
pub trait DigitRecognizer: Send + Sync {
    /// Bind a provisioned model for all future classifications
    async fn initialize(&self, handle: ModelHandle) -> Result<()>;

    async fn is_initialized(&self) -> bool;

    /// Classify a snapshot without blocking the caller's thread
    async fn classify(&self, bitmap: DrawingBitmap) -> Result<String>;

    /// Release the bound model; later calls fail with `Closed`
    async fn close(&self);
}

enum State {
    Uninitialized,
    Ready {
        engine: Arc<dyn InferenceEngine>,
        // Keeps the mapping alive for the session
        _handle: Option<ModelHandle>,
    },
    Closed,
}

impl State {
    const fn name(&self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Ready { .. } => "ready",
            Self::Closed => "closed",
        }
    }
}

/// On-device digit classifier: `Uninitialized -> Ready -> Closed`
pub struct Classifier {
    config: ClassifierConfig,
    layout: InputLayout,
    state: RwLock<State>,
}

impl Classifier {
    #[must_use]
    pub fn new(config: ClassifierConfig) -> Self {
        let layout = InputLayout::from_config(&config);
        Self {
            config,
            layout,
            state: RwLock::new(State::Uninitialized),
        }
    }

    /// Bind an already-built engine
    pub async fn initialize_with(
        &self,
        engine: Arc<dyn InferenceEngine>,
        handle: Option<ModelHandle>,
    ) -> Result<()> {
        let mut state = self.state.write().await;
        match *state {
            State::Closed => return Err(ClassificationError::Closed.into()),
            State::Ready { .. } => tracing::info!("Replacing loaded model"),
            State::Uninitialized => {}
        }

        tracing::info!("Classifier ready ({})", engine.engine_name());
        *state = State::Ready {
            engine,
            _handle: handle,
        };
        Ok(())
    }

    /// Classify and return the structured prediction
    pub async fn predict(&self, bitmap: DrawingBitmap) -> Result<Prediction> {
        let engine = match &*self.state.read().await {
            State::Ready { engine, .. } => Arc::clone(engine),
            State::Uninitialized => return Err(ClassificationError::NotInitialized.into()),
            State::Closed => return Err(ClassificationError::Closed.into()),
        };

        let layout = self.layout;
        let labels = self.config.labels.clone();

        // Run inference in blocking task to avoid blocking async runtime
        tokio::task::spawn_blocking(move || {
            let input = preprocess::to_input(&bitmap, &layout)?;
            let scores = engine.run(&input)?;
            let prediction = Prediction::from_scores(&scores, &labels)?;
            tracing::debug!(
                "Predicted {} ({:.3}) from {} scores",
                prediction.label,
                prediction.confidence,
                scores.len()
            );
            Ok(prediction)
        })
        .await
        .map_err(|e| {
            ScrawlError::Classification(ClassificationError::Inference(format!(
                "Classification task panicked: {e}"
            )))
        })?
    }

    /// Get current lifecycle state name
    pub async fn state_name(&self) -> &'static str {
        self.state.read().await.name()
    }
}

#[async_trait]
impl DigitRecognizer for Classifier {
    async fn initialize(&self, handle: ModelHandle) -> Result<()> {
        if matches!(*self.state.read().await, State::Closed) {
            return Err(ClassificationError::Closed.into());
        }

        let config = self.config.clone();
        let loaded = handle.clone();

        // Graph optimization is CPU-bound
        let engine = tokio::task::spawn_blocking(move || TractEngine::load(&loaded, &config))
            .await
            .map_err(|e| {
                ScrawlError::Classification(ClassificationError::ModelLoad(format!(
                    "Model load task panicked: {e}"
                )))
            })??;

        self.initialize_with(Arc::new(engine), Some(handle)).await
    }

    async fn is_initialized(&self) -> bool {
        matches!(*self.state.read().await, State::Ready { .. })
    }

    async fn classify(&self, bitmap: DrawingBitmap) -> Result<String> {
        let prediction = self.predict(bitmap).await?;
        Ok(prediction.render(self.config.show_confidence))
    }

    async fn close(&self) {
        let mut state = self.state.write().await;
        if !matches!(*state, State::Closed) {
            tracing::info!("Closing classifier (was {})", state.name());
        }
        *state = State::Closed;
    }
}
