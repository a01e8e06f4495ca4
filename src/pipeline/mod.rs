//! Image classification pipeline: load, preprocess, infer, rank, label.

mod classifier;

pub use classifier::{Classification, Classifier, Config, Prediction};
