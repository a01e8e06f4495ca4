//! Single-image classification pipeline.

use std::path::Path;

use ::image::RgbImage;
use ndarray::Array4;

use crate::engine::{take_output, InferenceEngine, NamedTensor, OrtEngine};
use crate::error::{Error, Result};
use crate::image::{self, ImageTensor, Normalization, RESNET_IMAGE_SIZE, RGB_CHANNELS};
use crate::labels::LabelTable;
use crate::model::{load_engine, ModelSource, SessionOptions};
use crate::postprocess::{argmax, softmax, top_k};

/// Configuration for the classification pipeline.
///
/// Defaults describe ResNet50-v2 from the ONNX model zoo.
#[derive(Debug, Clone)]
pub struct Config {
    /// Graph input the image tensor is bound to.
    pub input_name: String,

    /// Graph output holding the class scores.
    pub output_name: String,

    /// Expected input width in pixels.
    pub input_width: u32,

    /// Expected input height in pixels.
    pub input_height: u32,

    /// Per-channel mean/std applied after scaling to [0, 1].
    pub normalization: Normalization,

    /// Resize mismatched images instead of rejecting them.
    pub resize: bool,

    /// Number of ranked predictions to report.
    pub top_k: usize,

    /// ONNX Runtime session settings.
    pub session: SessionOptions,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input_name: "data".to_string(),
            output_name: "resnetv24_dense0_fwd".to_string(),
            input_width: RESNET_IMAGE_SIZE,
            input_height: RESNET_IMAGE_SIZE,
            normalization: Normalization::IMAGENET,
            resize: false,
            top_k: 5,
            session: SessionOptions::default(),
        }
    }
}

impl Config {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any parameter is out of valid range.
    pub fn validate(&self) -> Result<()> {
        if self.input_name.is_empty() {
            return Err(Error::invalid_parameter("input_name", "must not be empty"));
        }

        if self.output_name.is_empty() {
            return Err(Error::invalid_parameter("output_name", "must not be empty"));
        }

        if self.input_width == 0 || self.input_height == 0 {
            return Err(Error::invalid_parameter(
                "input_size",
                "width and height must be greater than 0",
            ));
        }

        if self.top_k == 0 {
            return Err(Error::invalid_parameter("top_k", "must be greater than 0"));
        }

        if self.session.intra_threads == 0 {
            return Err(Error::invalid_parameter(
                "intra_threads",
                "must be greater than 0",
            ));
        }

        if !self.normalization.mean.iter().all(|m| m.is_finite()) {
            return Err(Error::invalid_parameter("mean", "values must be finite"));
        }

        if !self
            .normalization
            .std
            .iter()
            .all(|s| s.is_finite() && *s > 0.0)
        {
            return Err(Error::invalid_parameter(
                "std",
                "values must be finite and greater than 0",
            ));
        }

        Ok(())
    }

    fn input_shape(&self) -> (usize, usize, usize, usize) {
        (
            1,
            RGB_CHANNELS,
            self.input_height as usize,
            self.input_width as usize,
        )
    }
}

/// One ranked class.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub class_id: usize,
    pub label: Option<String>,
    pub probability: f32,
}

/// Result of classifying one image.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    /// Arg-max class index.
    pub class_id: usize,
    /// Label of `class_id`, when a label table is attached.
    pub label: Option<String>,
    /// Softmax probability of `class_id`.
    pub confidence: f32,
    /// Highest-probability classes, best first.
    pub top_k: Vec<Prediction>,
}

/// Image classifier over an injected [`InferenceEngine`].
pub struct Classifier<E = OrtEngine> {
    config: Config,
    engine: E,
    labels: Option<LabelTable>,
}

impl Classifier<OrtEngine> {
    /// Build a classifier backed by ONNX Runtime.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the model cannot
    /// be loaded.
    pub fn open(config: Config, source: &ModelSource) -> Result<Self> {
        config.validate()?;
        let engine = load_engine(source, &config.session)?;
        tracing::info!("Model ready: {}", engine.model_path().display());
        Self::new(config, engine)
    }
}

impl<E: InferenceEngine> Classifier<E> {
    /// Create a classifier with the given configuration and engine.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(config: Config, engine: E) -> Result<Self> {
        config.validate()?;

        tracing::debug!("Classifier config: {config:?}");

        Ok(Self {
            config,
            engine,
            labels: None,
        })
    }

    /// Attach a label table used to name predicted classes.
    #[must_use]
    pub fn with_labels(mut self, labels: LabelTable) -> Self {
        self.labels = Some(labels);
        self
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[must_use]
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Classify the image at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the image cannot be loaded, has the wrong size,
    /// inference fails, or the predicted class has no label.
    pub fn classify<P: AsRef<Path>>(&mut self, path: P) -> Result<Classification> {
        let path = path.as_ref();
        tracing::info!("Classifying image: {}", path.display());

        let img = image::load_image(path)?;
        self.classify_image(img)
    }

    /// Classify an already-decoded image.
    ///
    /// # Errors
    ///
    /// See [`Classifier::classify`].
    pub fn classify_image(&mut self, img: RgbImage) -> Result<Classification> {
        let img = image::fit_to_input(
            img,
            self.config.input_width,
            self.config.input_height,
            self.config.resize,
        )?;
        let tensor = image::preprocess(img, &self.config.normalization);

        let scores = self.scores(tensor)?;
        self.rank(&scores)
    }

    /// Run the engine on a constant-filled input and return its first
    /// `count` raw outputs.
    ///
    /// # Errors
    ///
    /// Returns an error if inference fails.
    pub fn probe(&mut self, fill: f32, count: usize) -> Result<Vec<f32>> {
        tracing::info!("Probing model with constant input {fill}");

        let tensor = Array4::from_elem(self.config.input_shape(), fill);
        let mut scores = self.scores(tensor)?;
        scores.truncate(count);
        Ok(scores)
    }

    /// Run the engine once and flatten the score output.
    fn scores(&mut self, tensor: ImageTensor) -> Result<Vec<f32>> {
        let expected = self.config.input_shape();
        if tensor.dim() != expected {
            return Err(Error::ShapeMismatch {
                expected: format!("{expected:?}"),
                actual: format!("{:?}", tensor.dim()),
            });
        }

        let input = NamedTensor::new(self.config.input_name.clone(), tensor.into_dyn());
        let output_name = self.config.output_name.as_str();

        tracing::debug!("Running inference...");
        let mut outputs = self.engine.run(vec![input], &[output_name])?;
        let output = take_output(&mut outputs, output_name)?;

        Ok(output.data.iter().copied().collect())
    }

    fn rank(&self, scores: &[f32]) -> Result<Classification> {
        let probs = softmax(scores)?;
        let (class_id, confidence) = argmax(&probs)?;

        let label = self.label_for(class_id)?;
        let top_k = top_k(&probs, self.config.top_k)
            .into_iter()
            .map(|(class_id, probability)| -> Result<Prediction> {
                Ok(Prediction {
                    class_id,
                    label: self.label_for(class_id)?,
                    probability,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        tracing::info!(
            "Predicted class {class_id} ({}) with confidence {:.2}%",
            label.as_deref().unwrap_or("unlabeled"),
            confidence * 100.0
        );

        Ok(Classification {
            class_id,
            label,
            confidence,
            top_k,
        })
    }

    fn label_for(&self, class_id: usize) -> Result<Option<String>> {
        self.labels
            .as_ref()
            .map(|labels| labels.get(class_id).map(str::to_string))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ::image::{ImageBuffer, Rgb};
    use ndarray::{ArrayD, IxDyn};

    /// Returns fixed scores and records what it was asked to run.
    struct FakeEngine {
        scores: Vec<f32>,
        output_name: &'static str,
        calls: usize,
        last_input: Option<NamedTensor>,
    }

    impl FakeEngine {
        fn new(scores: Vec<f32>) -> Self {
            Self {
                scores,
                output_name: "resnetv24_dense0_fwd",
                calls: 0,
                last_input: None,
            }
        }
    }

    impl InferenceEngine for FakeEngine {
        fn run(
            &mut self,
            mut inputs: Vec<NamedTensor>,
            outputs: &[&str],
        ) -> Result<Vec<NamedTensor>> {
            self.calls += 1;
            self.last_input = inputs.pop();

            outputs
                .iter()
                .map(|&name| {
                    if name != self.output_name {
                        return Err(Error::MissingOutput {
                            name: name.to_string(),
                        });
                    }
                    let data =
                        ArrayD::from_shape_vec(IxDyn(&[1, self.scores.len()]), self.scores.clone())
                            .unwrap();
                    Ok(NamedTensor::new(name, data))
                })
                .collect()
        }
    }

    struct FailingEngine;

    impl InferenceEngine for FailingEngine {
        fn run(&mut self, _: Vec<NamedTensor>, outputs: &[&str]) -> Result<Vec<NamedTensor>> {
            Err(Error::MissingOutput {
                name: outputs[0].to_string(),
            })
        }
    }

    fn small_config() -> Config {
        Config {
            input_width: 4,
            input_height: 3,
            ..Config::default()
        }
    }

    fn labels() -> LabelTable {
        LabelTable::parse("cat\ndog\nbird")
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        config.validate().unwrap();
        assert_eq!(config.input_shape(), (1, 3, 224, 224));
    }

    #[test]
    fn test_invalid_config() {
        let bad = [
            Config {
                top_k: 0,
                ..Config::default()
            },
            Config {
                input_width: 0,
                ..Config::default()
            },
            Config {
                input_name: String::new(),
                ..Config::default()
            },
            Config {
                normalization: Normalization {
                    mean: [0.0; 3],
                    std: [0.2, 0.0, 0.2],
                },
                ..Config::default()
            },
            Config {
                session: SessionOptions {
                    intra_threads: 0,
                    ..SessionOptions::default()
                },
                ..Config::default()
            },
        ];

        for config in bad {
            let err = Classifier::new(config, FakeEngine::new(vec![1.0])).err().unwrap();
            assert!(matches!(err, Error::InvalidParameter { .. }));
        }
    }

    #[test]
    fn test_classify_image_with_labels() {
        let engine = FakeEngine::new(vec![1.0, 5.0, 2.0]);
        let mut classifier = Classifier::new(small_config(), engine)
            .unwrap()
            .with_labels(labels());

        let result = classifier.classify_image(RgbImage::new(4, 3)).unwrap();

        assert_eq!(result.class_id, 1);
        assert_eq!(result.label.as_deref(), Some("dog"));
        assert!((result.confidence - 0.9362).abs() < 1e-4);
        assert_eq!(result.top_k.len(), 3);
        assert_eq!(result.top_k[0].class_id, 1);
        assert_eq!(result.top_k[1].label.as_deref(), Some("bird"));
        assert_eq!(result.top_k[2].label.as_deref(), Some("cat"));
    }

    #[test]
    fn test_engine_receives_planar_input() {
        let engine = FakeEngine::new(vec![0.0, 1.0]);
        let mut classifier = Classifier::new(small_config(), engine).unwrap();

        let img = ImageBuffer::from_fn(4, 3, |x, _| {
            if x == 2 {
                Rgb([255, 0, 0])
            } else {
                Rgb([0, 0, 0])
            }
        });
        classifier.classify_image(img).unwrap();

        let input = classifier.engine().last_input.clone().unwrap();
        assert_eq!(input.name, "data");
        assert_eq!(input.data.shape(), &[1, 3, 3, 4]);

        let norm = Normalization::IMAGENET;
        let flat = input.data.as_slice().unwrap();
        // channel 0, row 1, col 2
        assert_eq!(flat[4 + 2], norm.apply(0, 255));
        // channel 1, row 1, col 2
        assert_eq!(flat[12 + 4 + 2], norm.apply(1, 0));
    }

    #[test]
    fn test_wrong_size_fails_before_inference() {
        let mut classifier =
            Classifier::new(Config::default(), FakeEngine::new(vec![1.0])).unwrap();

        let err = classifier.classify_image(RgbImage::new(300, 300)).unwrap_err();

        assert!(matches!(
            err,
            Error::DimensionMismatch {
                width: 300,
                height: 300,
                ..
            }
        ));
        assert_eq!(classifier.engine().calls, 0);
    }

    #[test]
    fn test_resize_allows_other_sizes() {
        let config = Config {
            resize: true,
            ..small_config()
        };
        let mut classifier = Classifier::new(config, FakeEngine::new(vec![3.0, 1.0])).unwrap();

        let result = classifier.classify_image(RgbImage::new(10, 10)).unwrap();
        assert_eq!(result.class_id, 0);
        assert_eq!(result.label, None);
    }

    #[test]
    fn test_unlabeled_class_is_out_of_range() {
        let scores = vec![0.0, 0.0, 0.0, 0.0, 0.0, 9.0];
        let mut classifier = Classifier::new(small_config(), FakeEngine::new(scores))
            .unwrap()
            .with_labels(labels());

        let err = classifier.classify_image(RgbImage::new(4, 3)).unwrap_err();
        assert!(matches!(err, Error::IndexOutOfRange { index: 5, len: 3 }));
    }

    #[test]
    fn test_missing_output_name() {
        let config = Config {
            output_name: "logits".to_string(),
            ..small_config()
        };
        let mut classifier = Classifier::new(config, FakeEngine::new(vec![1.0])).unwrap();

        let err = classifier.classify_image(RgbImage::new(4, 3)).unwrap_err();
        assert!(matches!(err, Error::MissingOutput { ref name } if name == "logits"));
    }

    #[test]
    fn test_engine_failure_is_propagated() {
        let mut classifier = Classifier::new(small_config(), FailingEngine).unwrap();
        assert!(classifier.classify_image(RgbImage::new(4, 3)).is_err());
        assert!(classifier.probe(0.2, 5).is_err());
    }

    #[test]
    fn test_empty_scores() {
        let mut classifier = Classifier::new(small_config(), FakeEngine::new(vec![])).unwrap();
        let err = classifier.classify_image(RgbImage::new(4, 3)).unwrap_err();
        assert!(matches!(err, Error::EmptyScores));
    }

    #[test]
    fn test_probe_returns_raw_prefix() {
        let scores: Vec<f32> = (0..10u8).map(f32::from).collect();
        let mut classifier = Classifier::new(small_config(), FakeEngine::new(scores)).unwrap();

        let raw = classifier.probe(0.2, 5).unwrap();
        assert_eq!(raw, vec![0.0, 1.0, 2.0, 3.0, 4.0]);

        let input = classifier.engine().last_input.clone().unwrap();
        assert!(input.data.iter().all(|&v| (v - 0.2).abs() < f32::EPSILON));
    }

    #[test]
    fn test_classify_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.png");
        let big = dir.path().join("big.png");
        RgbImage::new(4, 3).save(&good).unwrap();
        RgbImage::new(8, 8).save(&big).unwrap();

        let mut classifier = Classifier::new(small_config(), FakeEngine::new(vec![0.1, 0.9]))
            .unwrap();

        assert_eq!(classifier.classify(&good).unwrap().class_id, 1);
        assert!(matches!(
            classifier.classify(&big),
            Err(Error::DimensionMismatch { .. })
        ));
        assert!(matches!(
            classifier.classify(dir.path().join("missing.png")),
            Err(Error::ImageLoad { .. })
        ));
        assert_eq!(classifier.engine().calls, 1);
    }
}
