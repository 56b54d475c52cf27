//! actigrafo: reconocimiento de actividad humana en streaming a partir de
//! acelerómetro y giroscopio.

pub mod config;
pub mod csv_loader;
pub mod error;
pub mod feature_composer;
pub mod gesture_classifier;
pub mod gravity_filter;
pub mod model;
pub mod normalizer;
pub mod pipeline;
pub mod sample_buffer;
pub mod scheduler;
pub mod sensor_source;
pub mod types;

pub use config::{Cadence, PipelineConfig};
pub use error::{ModelError, NotReadyReason, PipelineError, SensorKind};
pub use gesture_classifier::{Classification, Classifier, GestureDecoder};
pub use model::{DeferredModel, Model, ModelInput};
#[cfg(feature = "onnx")]
pub use model::OnnxModel;
pub use pipeline::{Diagnostic, Pipeline};
pub use sensor_source::SensorEvent;
pub use types::{FeatureFrame, FeatureVector, GestureLabel, Sample3, Window};
