//! Model downloading and loading utilities.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use indicatif::{ProgressBar, ProgressStyle};
use ort::logging::LogLevel;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;

use crate::engine::OrtEngine;
use crate::error::{Error, Result};

/// Models that can be fetched on demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
    /// ResNet50-v2, opset 7, from the ONNX model zoo.
    ResNet50V2,
}

impl ModelKind {
    /// Get the filename for this model.
    #[must_use]
    pub const fn filename(&self) -> &'static str {
        match self {
            Self::ResNet50V2 => "resnet50-v2-7.onnx",
        }
    }

    /// Get the download URL for this model.
    #[must_use]
    pub const fn url(&self) -> &'static str {
        match self {
            Self::ResNet50V2 => {
                "https://github.com/onnx/models/raw/main/validated/vision/classification/resnet/model/resnet50-v2-7.onnx"
            }
        }
    }

    /// Get the approximate size in bytes for progress indication.
    #[must_use]
    pub const fn approx_size(&self) -> u64 {
        match self {
            Self::ResNet50V2 => 102_000_000, // ~98 MiB
        }
    }
}

/// Where the model file comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelSource {
    /// A model file already on disk.
    Path(PathBuf),
    /// A known model, downloaded into the cache when missing.
    Zoo(ModelKind),
}

/// Graph optimization applied by ONNX Runtime when the session is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OptimizationLevel {
    Disable,
    #[default]
    Basic,
    Extended,
    All,
}

impl From<OptimizationLevel> for GraphOptimizationLevel {
    fn from(level: OptimizationLevel) -> Self {
        match level {
            OptimizationLevel::Disable => Self::Disable,
            OptimizationLevel::Basic => Self::Level1,
            OptimizationLevel::Extended => Self::Level2,
            OptimizationLevel::All => Self::Level3,
        }
    }
}

/// ONNX Runtime session settings.
///
/// ORT may use its own thread pool inside a run; `intra_threads` only sizes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOptions {
    pub intra_threads: usize,
    pub optimization_level: OptimizationLevel,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            intra_threads: 1,
            optimization_level: OptimizationLevel::Basic,
        }
    }
}

impl SessionOptions {
    /// Build an ONNX session for the model at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ModelLoad`] if the runtime rejects the options or the
    /// model file cannot be loaded.
    pub fn build_session(&self, path: &Path) -> Result<Session> {
        Session::builder()
            .and_then(|b| b.with_log_level(LogLevel::Error))
            .and_then(|b| b.with_optimization_level(self.optimization_level.into()))
            .and_then(|b| b.with_intra_threads(self.intra_threads))
            .and_then(|b| b.commit_from_file(path))
            .map_err(|source| Error::ModelLoad {
                path: path.to_path_buf(),
                source,
            })
    }
}

/// Manages the model cache directory and downloads.
pub struct ModelCache {
    cache_dir: PathBuf,
}

impl ModelCache {
    /// Create a model cache in the platform cache directory.
    ///
    /// - Windows: `%LOCALAPPDATA%\onnx-classify\models`
    /// - Linux: `~/.cache/onnx-classify/models`
    /// - macOS: `~/Library/Caches/onnx-classify/models`
    ///
    /// # Errors
    ///
    /// Returns an error if the cache directory cannot be created.
    pub fn new() -> Result<Self> {
        let base = dirs::cache_dir().unwrap_or_else(|| PathBuf::from("."));
        Self::with_dir(base.join("onnx-classify").join("models"))
    }

    /// Create a model cache rooted at `cache_dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn with_dir(cache_dir: impl Into<PathBuf>) -> Result<Self> {
        let cache_dir = cache_dir.into();

        fs::create_dir_all(&cache_dir).map_err(|source| Error::CacheDir {
            path: cache_dir.clone(),
            source,
        })?;

        Ok(Self { cache_dir })
    }

    /// Get the path to a model file, downloading if necessary.
    ///
    /// # Errors
    ///
    /// Returns an error if the model cannot be downloaded or accessed.
    pub fn get_model_path(&self, kind: ModelKind) -> Result<PathBuf> {
        let path = self.cache_dir.join(kind.filename());

        if !path.exists() {
            download_file(kind.url(), &path, kind.filename(), kind.approx_size())?;
        }

        Ok(path)
    }
}

/// Resolve a model source and open an [`OrtEngine`] on it.
///
/// # Errors
///
/// Returns an error if the model cannot be resolved, downloaded, or loaded.
pub fn load_engine(source: &ModelSource, options: &SessionOptions) -> Result<OrtEngine> {
    let path = match source {
        ModelSource::Path(path) => path.clone(),
        ModelSource::Zoo(kind) => ModelCache::new()?.get_model_path(*kind)?,
    };

    tracing::info!("Loading model {}", path.display());
    let session = options.build_session(&path)?;
    tracing::debug!("Session ready with {options:?}");

    Ok(OrtEngine::new(session, path))
}

/// Download a file from a URL to a path with progress indication.
fn download_file(url: &str, path: &Path, name: &str, approx_size: u64) -> Result<()> {
    tracing::info!("Downloading {name} from {url}");

    let client = reqwest::blocking::Client::new();
    let response = client
        .get(url)
        .send()
        .and_then(reqwest::blocking::Response::error_for_status)
        .map_err(|source| Error::ModelDownload {
            name: name.to_string(),
            source,
        })?;

    let total_size = response.content_length().unwrap_or(approx_size);

    let pb = ProgressBar::new(total_size);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")
            .expect("valid template")
            .progress_chars("#>-"),
    );
    pb.set_message(format!("Downloading {name}"));

    // Write to a temporary file first, then rename
    let temp_path = path.with_extension("tmp");
    let mut file = fs::File::create(&temp_path)?;

    let mut downloaded = 0u64;
    let mut reader = response;

    loop {
        let mut buffer = [0u8; 8192];
        let bytes_read = std::io::Read::read(&mut reader, &mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        file.write_all(&buffer[..bytes_read])?;
        downloaded += bytes_read as u64;
        pb.set_position(downloaded);
    }

    file.flush()?;
    pb.finish_with_message(format!("Downloaded {name}"));

    fs::rename(&temp_path, path)?;

    Ok(())
}
