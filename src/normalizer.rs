use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::{PipelineError, Result};
use crate::types::{FeatureVector, Window, NUM_FEATURES};

/// Media y desviación estándar del entrenamiento (mismo orden que FeatureVector)
const TRAINING_MEAN: [f64; NUM_FEATURES] = [
    0.804749279,
    0.0287554865,
    0.0864980163,
    -0.000636303058,
    -0.000292296856,
    -0.000275299412,
    0.000506464674,
    -0.000823780831,
    0.000112948439,
];
const TRAINING_STD: [f64; NUM_FEATURES] = [
    0.41411195, 0.39099543, 0.35776881, 0.19484634, 0.12242748, 0.10687881, 0.40681506,
    0.38185432, 0.25574314,
];

const MIN_STD: f64 = 1e-12;

/// Formato del JSON exportado junto al modelo
#[derive(Debug, Deserialize)]
struct StatsJson {
    mean: Vec<f64>,
    std: Vec<f64>,
}

/// Estadísticas de normalización. Inmutables una vez validadas.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizationStats {
    mean: FeatureVector,
    std: FeatureVector,
}

impl NormalizationStats {
    pub fn new(mean: FeatureVector, std: FeatureVector) -> Result<Self> {
        for i in 0..NUM_FEATURES {
            if !mean[i].is_finite() {
                return Err(PipelineError::config(format!(
                    "media no finita en la característica {}",
                    i
                )));
            }
            if !std[i].is_finite() || std[i].abs() < MIN_STD {
                return Err(PipelineError::config(format!(
                    "desviación estándar inválida en la característica {}: {}",
                    i, std[i]
                )));
            }
        }
        Ok(Self { mean, std })
    }

    /// Valores horneados del entrenamiento offline
    pub fn training() -> Self {
        Self {
            mean: TRAINING_MEAN,
            std: TRAINING_STD,
        }
    }

    pub fn from_slices(mean: &[f64], std: &[f64]) -> Result<Self> {
        let mean: FeatureVector = mean.try_into().map_err(|_| {
            PipelineError::config(format!(
                "se esperaban {} medias, llegaron {}",
                NUM_FEATURES,
                mean.len()
            ))
        })?;
        let std: FeatureVector = std.try_into().map_err(|_| {
            PipelineError::config(format!(
                "se esperaban {} desviaciones, llegaron {}",
                NUM_FEATURES,
                std.len()
            ))
        })?;
        Self::new(mean, std)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let data: StatsJson = serde_json::from_str(&content)?;
        Self::from_slices(&data.mean, &data.std)
    }

    pub fn mean(&self) -> &FeatureVector {
        &self.mean
    }

    pub fn std(&self) -> &FeatureVector {
        &self.std
    }
}

impl Default for NormalizationStats {
    fn default() -> Self {
        Self::training()
    }
}

/// (x - media) / std para cada característica de cada instante
pub fn normalize(window: &[FeatureVector], stats: &NormalizationStats) -> Window {
    window
        .iter()
        .map(|fv| -> FeatureVector {
            std::array::from_fn(|i| (fv[i] - stats.mean[i]) / stats.std[i])
        })
        .collect()
}

/// Inversa de `normalize`
pub fn denormalize(window: &[FeatureVector], stats: &NormalizationStats) -> Window {
    window
        .iter()
        .map(|fv| -> FeatureVector {
            std::array::from_fn(|i| fv[i] * stats.std[i] + stats.mean[i])
        })
        .collect()
}

#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    stats: NormalizationStats,
}

impl Normalizer {
    pub fn new(stats: NormalizationStats) -> Self {
        Self { stats }
    }

    pub fn normalize(&self, window: &[FeatureVector]) -> Window {
        normalize(window, &self.stats)
    }

    pub fn denormalize(&self, window: &[FeatureVector]) -> Window {
        denormalize(window, &self.stats)
    }

    pub fn stats(&self) -> &NormalizationStats {
        &self.stats
    }
}
