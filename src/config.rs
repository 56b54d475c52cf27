use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{PipelineError, Result};
use crate::gesture_classifier::{Classifier, GestureDecoder};
use crate::model::Model;
use crate::normalizer::{NormalizationStats, Normalizer};
use crate::pipeline::Pipeline;
use crate::types::{INFERENCE_INTERVAL, LEGACY_INFERENCE_INTERVAL};

/// Ritmo de inferencia
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cadence {
    /// (WINDOW_SIZE - RETAIN_COUNT) * 20 ms: la ventana avanza exactamente media longitud
    #[default]
    Derived,
    /// 1 s fijo, como la aplicación móvil
    Legacy,
}

impl Cadence {
    pub fn interval(self) -> Duration {
        match self {
            Cadence::Derived => INFERENCE_INTERVAL,
            Cadence::Legacy => LEGACY_INFERENCE_INTERVAL,
        }
    }
}

/// Configuración de arranque, leída de JSON. Todos los campos son opcionales.
///
/// ```json
/// { "model_path": "har_lstm.onnx", "stats_path": "stats.json", "cadence": "legacy" }
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    pub model_path: PathBuf,
    pub classes_path: Option<PathBuf>,
    pub stats_path: Option<PathBuf>,
    pub cadence: Cadence,
    pub diagnostics_capacity: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("har_lstm.onnx"),
            classes_path: None,
            stats_path: None,
            cadence: Cadence::Derived,
            diagnostics_capacity: 256,
        }
    }
}

impl PipelineConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: PipelineConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.diagnostics_capacity == 0 {
            return Err(PipelineError::config("diagnostics_capacity debe ser mayor que 0"));
        }
        Ok(())
    }

    pub fn inference_interval(&self) -> Duration {
        self.cadence.interval()
    }

    /// Estadísticas del fichero indicado o las de entrenamiento por defecto
    pub fn normalizer(&self) -> Result<Normalizer> {
        let stats = match &self.stats_path {
            Some(path) => NormalizationStats::load(path)?,
            None => NormalizationStats::training(),
        };
        Ok(Normalizer::new(stats))
    }

    pub fn decoder(&self) -> Result<GestureDecoder> {
        match &self.classes_path {
            Some(path) => GestureDecoder::from_classes_file(path),
            None => Ok(GestureDecoder::new()),
        }
    }

    /// Construye el pipeline sin arrancar planificador ni fuente
    pub fn build_pipeline(&self, model: impl Model + 'static) -> Result<Pipeline> {
        self.validate()?;
        let classifier = Classifier::new(model, self.normalizer()?, self.decoder()?);
        Ok(Pipeline::new(classifier, self.diagnostics_capacity))
    }
}
