//! # `onnx-classify`
//!
//! Classify images with ImageNet-style ONNX models such as ResNet50-v2.
//!
//! The pipeline is strictly linear: decode the image, check it against the
//! model's fixed input size, normalize it into a planar `1x3xHxW` tensor,
//! run the model once, softmax the scores and pick the arg-max class.
//!
//! Model execution sits behind the [`engine::InferenceEngine`] trait, so
//! everything around it can be exercised without a model file.
//!
//! ## Example
//!
//! ```no_run
//! use onnx_classify::{Classifier, Config, LabelTable, ModelSource};
//!
//! # fn main() -> onnx_classify::Result<()> {
//! let source = ModelSource::Path("resnet50-v2-7.onnx".into());
//! let mut classifier = Classifier::open(Config::default(), &source)?
//!     .with_labels(LabelTable::load("imagenet_classes.txt")?);
//!
//! let result = classifier.classify("dog.jpg")?;
//! println!("{} ({:.1}%)", result.class_id, result.confidence * 100.0);
//! # Ok(())
//! # }
//! ```

pub mod engine;
pub mod error;
pub mod image;
pub mod labels;
pub mod model;
pub mod pipeline;
pub mod postprocess;

pub use error::{Error, Result};
pub use labels::LabelTable;
pub use model::{ModelKind, ModelSource};
pub use pipeline::{Classification, Classifier, Config, Prediction};
