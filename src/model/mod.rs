//! Model resolution and ONNX session construction.

mod loader;

pub use loader::{load_engine, ModelCache, ModelKind, ModelSource, OptimizationLevel, SessionOptions};
