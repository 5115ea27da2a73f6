use crate::classifier::handle::ModelHandle;
use crate::config::schema::ClassifierConfig;
use crate::error::{ClassificationError, Result};
use anyhow::Context;
use std::io::Cursor;
use tract_onnx::prelude::*;

/// Opaque inference backend: flat input tensor in, flat scores out
pub trait InferenceEngine: Send + Sync {
    fn run(&self, input: &[f32]) -> Result<Vec<f32>>;

    /// Get engine name for logging/debugging
    fn engine_name(&self) -> &str;
}

/// ONNX inference through tract
pub struct TractEngine {
    plan: TypedRunnableModel<TypedModel>,
    shape: [usize; 4],
}

impl TractEngine {
    /// Build an optimized plan from the mapped model bytes
    pub fn load(handle: &ModelHandle, config: &ClassifierConfig) -> Result<Self> {
        let shape = input_shape(config);

        let plan = build_plan(handle.bytes(), shape).map_err(|e| {
            ClassificationError::ModelLoad(format!("{}: {e:#}", handle.path().display()))
        })?;

        tracing::info!(
            "Loaded model {} with input shape {:?}",
            handle.name(),
            shape
        );

        Ok(Self { plan, shape })
    }
}

fn build_plan(bytes: &[u8], shape: [usize; 4]) -> anyhow::Result<TypedRunnableModel<TypedModel>> {
    let mut reader = Cursor::new(bytes);
    tract_onnx::onnx()
        .model_for_read(&mut reader)
        .context("parsing ONNX graph")?
        .with_input_fact(0, f32::fact(shape).into())
        .context("setting input shape")?
        .into_optimized()
        .context("optimizing graph")?
        .into_runnable()
        .context("building execution plan")
}

/// Input tensor shape for a single grayscale image
#[must_use]
pub fn input_shape(config: &ClassifierConfig) -> [usize; 4] {
    let size = config.input_size as usize;
    if config.channels_last {
        [1, size, size, 1]
    } else {
        [1, 1, size, size]
    }
}

impl InferenceEngine for TractEngine {
    fn run(&self, input: &[f32]) -> Result<Vec<f32>> {
        let expected: usize = self.shape.iter().product();
        if input.len() != expected {
            return Err(ClassificationError::InvalidInput(format!(
                "expected {expected} values, got {}",
                input.len()
            ))
            .into());
        }

        let inference = || -> anyhow::Result<Vec<f32>> {
            let tensor = Tensor::from_shape(&self.shape, input)?;
            let outputs = self.plan.run(tvec!(tensor.into()))?;
            let first = outputs.first().context("model returned no outputs")?;
            let scores = first.cast_to::<f32>()?;
            Ok(scores.as_slice::<f32>()?.to_vec())
        };

        inference().map_err(|e| ClassificationError::Inference(format!("{e:#}")).into())
    }

    fn engine_name(&self) -> &'static str {
        "tract-onnx"
    }
}
