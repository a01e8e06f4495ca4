//! ONNX Runtime implementation of [`InferenceEngine`].

use std::borrow::Cow;
use std::path::{Path, PathBuf};

use ndarray::{ArrayD, IxDyn};
use ort::session::{Session, SessionInputValue, SessionInputs};
use ort::value::Tensor;

use crate::error::{Error, Result};

use super::{InferenceEngine, NamedTensor};

/// An [`InferenceEngine`] backed by a single ONNX Runtime session.
pub struct OrtEngine {
    session: Session,
    model_path: PathBuf,
}

impl OrtEngine {
    /// Wrap an already-built session.
    pub fn new(session: Session, model_path: impl Into<PathBuf>) -> Self {
        Self {
            session,
            model_path: model_path.into(),
        }
    }

    /// Path of the model file the session was built from.
    #[must_use]
    pub fn model_path(&self) -> &Path {
        &self.model_path
    }
}

impl InferenceEngine for OrtEngine {
    fn run(&mut self, inputs: Vec<NamedTensor>, outputs: &[&str]) -> Result<Vec<NamedTensor>> {
        let mut session_inputs: Vec<(Cow<'_, str>, SessionInputValue<'_>)> =
            Vec::with_capacity(inputs.len());

        for input in inputs {
            tracing::debug!("Binding input {:?} {:?}", input.name, input.data.shape());
            let value =
                Tensor::from_array(input.data).map_err(|source| Error::Inference { source })?;
            session_inputs.push((Cow::Owned(input.name), value.into()));
        }

        let results = self
            .session
            .run(SessionInputs::<'_, '_, 0>::ValueMap(session_inputs))
            .map_err(|source| Error::Inference { source })?;

        outputs
            .iter()
            .map(|&name| -> Result<NamedTensor> {
                let value = results.get(name).ok_or_else(|| Error::MissingOutput {
                    name: name.to_string(),
                })?;
                let (shape, data) = value
                    .try_extract_tensor::<f32>()
                    .map_err(|source| Error::Inference { source })?;
                let shape: Vec<i64> = shape.iter().copied().collect();
                Ok(NamedTensor::new(name, to_array(&shape, data)?))
            })
            .collect()
    }
}

/// Copy raw output data into an owned dynamic-rank array.
fn to_array(shape: &[i64], data: &[f32]) -> Result<ArrayD<f32>> {
    let dims = shape
        .iter()
        .map(|&d| usize::try_from(d))
        .collect::<std::result::Result<Vec<usize>, _>>()
        .map_err(|_| Error::ShapeMismatch {
            expected: "non-negative dimensions".to_string(),
            actual: format!("{shape:?}"),
        })?;

    ArrayD::from_shape_vec(IxDyn(&dims), data.to_vec()).map_err(|_| Error::ShapeMismatch {
        expected: format!("{dims:?}"),
        actual: format!("{} elements", data.len()),
    })
}
