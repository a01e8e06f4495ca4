//! The boundary to the model-execution engine.
//!
//! Pre- and post-processing only ever see the [`InferenceEngine`] trait, so
//! they can be driven by an in-memory fake as easily as by ONNX Runtime.

mod onnx;

pub use onnx::OrtEngine;

use ndarray::ArrayD;

use crate::error::{Error, Result};

/// A tensor paired with the graph name it binds to.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedTensor {
    pub name: String,
    pub data: ArrayD<f32>,
}

impl NamedTensor {
    pub fn new(name: impl Into<String>, data: ArrayD<f32>) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }
}

/// Runs a model: named inputs in, named outputs out.
///
/// A call is one atomic step. Any failure is reported as an error and no
/// partial outputs are returned.
pub trait InferenceEngine {
    /// Execute the model once.
    ///
    /// Implementations return exactly one tensor per entry of `outputs`, in
    /// the same order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Inference`] for engine failures and
    /// [`Error::MissingOutput`] when a requested output is not produced.
    fn run(&mut self, inputs: Vec<NamedTensor>, outputs: &[&str]) -> Result<Vec<NamedTensor>>;
}

impl<E: InferenceEngine + ?Sized> InferenceEngine for Box<E> {
    fn run(&mut self, inputs: Vec<NamedTensor>, outputs: &[&str]) -> Result<Vec<NamedTensor>> {
        (**self).run(inputs, outputs)
    }
}

/// Remove the tensor called `name` from an output list.
///
/// # Errors
///
/// Returns [`Error::MissingOutput`] if no tensor has that name.
pub fn take_output(outputs: &mut Vec<NamedTensor>, name: &str) -> Result<NamedTensor> {
    let pos = outputs
        .iter()
        .position(|t| t.name == name)
        .ok_or_else(|| Error::MissingOutput {
            name: name.to_string(),
        })?;
    Ok(outputs.swap_remove(pos))
}
