use std::fmt;

use thiserror::Error;

use crate::types::Sample3;

/// Motivo por el que un ciclo de inferencia se omite. Es normal durante el arranque.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotReadyReason {
    /// El buffer todavía no tiene WINDOW_SIZE muestras
    BufferFilling { len: usize },
    /// El modelo sigue cargándose
    ModelLoading,
}

impl fmt::Display for NotReadyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotReadyReason::BufferFilling { len } => write!(f, "buffer con {} muestras", len),
            NotReadyReason::ModelLoading => f.write_str("modelo cargando"),
        }
    }
}

/// Sensor del que proviene una muestra
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorKind {
    Accelerometer,
    Gyroscope,
}

impl fmt::Display for SensorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SensorKind::Accelerometer => f.write_str("acelerómetro"),
            SensorKind::Gyroscope => f.write_str("giroscopio"),
        }
    }
}

#[derive(Error, Debug)]
pub enum ModelError {
    #[cfg(feature = "onnx")]
    #[error("ONNX Runtime error: {0}")]
    OnnxError(#[from] ort::Error),

    #[error("Modelo no cargado")]
    NotLoaded,

    #[error("Invalid input size: expected {expected}, got {actual}")]
    InvalidInputSize { expected: usize, actual: usize },

    #[error("Invalid score vector: expected {expected} classes, got {actual}")]
    InvalidOutputSize { expected: usize, actual: usize },

    #[error("No output tensor found")]
    NoOutputTensor,

    #[error("Missing ONNX {kind}")]
    MissingIo { kind: &'static str },

    #[error("{0}")]
    Backend(String),
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Inferencia omitida: {0}")]
    NotReady(NotReadyReason),

    #[error("Error ejecutando el modelo: {0}")]
    ModelExecution(#[from] ModelError),

    #[error("Configuración inválida: {0}")]
    Configuration(String),

    #[error("Muestra no finita del {sensor} descartada: {sample:?}")]
    NumericAnomaly { sensor: SensorKind, sample: Sample3 },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl PipelineError {
    pub fn config(message: impl Into<String>) -> Self {
        PipelineError::Configuration(message.into())
    }

    /// Solo los errores de configuración impiden arrancar el pipeline
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            PipelineError::Configuration(_)
                | PipelineError::IoError(_)
                | PipelineError::JsonError(_)
        )
    }
}

pub type Result<T, E = PipelineError> = std::result::Result<T, E>;
