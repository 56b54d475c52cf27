use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::{ModelError, NotReadyReason, PipelineError, Result};
use crate::model::{Model, ModelInput};
use crate::normalizer::Normalizer;
use crate::types::{FeatureVector, GestureLabel, ScoreVector, NUM_CLASSES, WINDOW_SIZE};

#[derive(Debug, Deserialize)]
struct ClassesJson {
    index_to_class: HashMap<String, String>,
}

/// Resultado de un ciclo de clasificación
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub label: GestureLabel,
    pub index: usize,
    pub score: f32,
    pub scores: ScoreVector,
}

/// Convierte el vector de puntuaciones en una etiqueta por arg-max
#[derive(Debug, Clone)]
pub struct GestureDecoder {
    labels: [GestureLabel; NUM_CLASSES],
}

impl GestureDecoder {
    pub fn new() -> Self {
        Self {
            labels: GestureLabel::ALL,
        }
    }

    /// Carga el orden de clases desde classes.json: {"index_to_class": {"0": "WALKING", ...}}
    pub fn from_classes_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let data: ClassesJson = serde_json::from_str(&content)?;

        // Convertir HashMap a Vec ordenado por índice
        let mut pairs: Vec<(usize, GestureLabel)> = Vec::with_capacity(data.index_to_class.len());
        for (k, v) in data.index_to_class {
            let idx = k
                .parse::<usize>()
                .map_err(|_| PipelineError::config(format!("índice de clase inválido: {:?}", k)))?;
            let label = v.parse::<GestureLabel>().map_err(PipelineError::Configuration)?;
            pairs.push((idx, label));
        }
        pairs.sort_by_key(|(idx, _)| *idx);

        if pairs.len() != NUM_CLASSES || pairs.iter().enumerate().any(|(i, (idx, _))| i != *idx) {
            return Err(PipelineError::config(format!(
                "classes.json debe definir los índices 0..{} exactamente una vez",
                NUM_CLASSES
            )));
        }

        let labels: [GestureLabel; NUM_CLASSES] = std::array::from_fn(|i| pairs[i].1);
        for (i, label) in labels.iter().enumerate() {
            if labels[..i].contains(label) {
                return Err(PipelineError::config(format!("clase repetida: {}", label)));
            }
        }

        Ok(Self { labels })
    }

    /// Índice del máximo; en caso de empate gana el primero. Los NaN nunca ganan.
    pub fn argmax(scores: &[f32]) -> Option<usize> {
        let mut best: Option<(usize, f32)> = None;
        for (idx, &score) in scores.iter().enumerate() {
            if score.is_nan() {
                continue;
            }
            match best {
                Some((_, best_score)) if score <= best_score => {}
                _ => best = Some((idx, score)),
            }
        }
        best.map(|(idx, _)| idx)
    }

    pub fn decode(&self, scores: &[f32]) -> Result<Classification, ModelError> {
        if scores.len() != NUM_CLASSES {
            return Err(ModelError::InvalidOutputSize {
                expected: NUM_CLASSES,
                actual: scores.len(),
            });
        }

        let index = Self::argmax(scores).ok_or(ModelError::NoOutputTensor)?;
        Ok(Classification {
            label: self.labels[index],
            index,
            score: scores[index],
            scores: scores.to_vec(),
        })
    }

    pub fn labels(&self) -> &[GestureLabel] {
        &self.labels
    }
}

impl Default for GestureDecoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Normalizer -> Model -> GestureDecoder
pub struct Classifier {
    model: Box<dyn Model>,
    normalizer: Normalizer,
    decoder: GestureDecoder,
}

impl Classifier {
    pub fn new(model: impl Model + 'static, normalizer: Normalizer, decoder: GestureDecoder) -> Self {
        Self {
            model: Box::new(model),
            normalizer,
            decoder,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.model.is_ready()
    }

    /// Puntuaciones crudas para una ventana sin normalizar
    pub fn predict_scores(&mut self, window: &[FeatureVector]) -> Result<ScoreVector> {
        if window.len() != WINDOW_SIZE {
            return Err(PipelineError::NotReady(NotReadyReason::BufferFilling {
                len: window.len(),
            }));
        }

        // Los buffers intermedios viven solo dentro de esta llamada
        let normalized = self.normalizer.normalize(window);
        let input = ModelInput::from_window(&normalized)?;
        let scores = self.model.predict(&input)?;
        Ok(scores)
    }

    pub fn classify(&mut self, window: &[FeatureVector]) -> Result<Classification> {
        let scores = self.predict_scores(window)?;
        Ok(self.decoder.decode(&scores)?)
    }

    pub fn decoder(&self) -> &GestureDecoder {
        &self.decoder
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalizer::NormalizationStats;
    use std::sync::{Arc, Mutex};

    /// Modelo de prueba que guarda la entrada recibida
    struct Recording {
        scores: std::result::Result<ScoreVector, String>,
        seen: Arc<Mutex<Vec<Vec<f32>>>>,
    }

    impl Model for Recording {
        fn is_ready(&self) -> bool {
            true
        }

        fn predict(&mut self, input: &ModelInput) -> std::result::Result<ScoreVector, ModelError> {
            self.seen.lock().unwrap().push(input.as_slice().to_vec());
            self.scores.clone().map_err(ModelError::Backend)
        }
    }

    fn window_of(value: f64) -> Vec<FeatureVector> {
        vec![[value; 9]; WINDOW_SIZE]
    }

    #[test]
    fn test_argmax_picks_maximum() {
        assert_eq!(GestureDecoder::argmax(&[0.1, 0.9, 0.05, 0.0, 0.0, 0.0]), Some(1));
    }

    #[test]
    fn test_argmax_ties_resolve_to_lowest_index() {
        assert_eq!(GestureDecoder::argmax(&[0.2, 0.2, 0.2, 0.2, 0.2, 0.2]), Some(0));
        assert_eq!(GestureDecoder::argmax(&[0.0, 0.7, 0.1, 0.7, 0.0, 0.0]), Some(1));
    }

    #[test]
    fn test_argmax_ignores_nan() {
        assert_eq!(GestureDecoder::argmax(&[f32::NAN, 0.1, 0.3]), Some(2));
        assert_eq!(GestureDecoder::argmax(&[f32::NAN, f32::NAN]), None);
        assert_eq!(GestureDecoder::argmax(&[]), None);
    }

    #[test]
    fn test_decode_maps_to_label() {
        let decoder = GestureDecoder::new();
        let result = decoder.decode(&[0.1, 0.9, 0.05, 0.0, 0.0, 0.0]).unwrap();
        assert_eq!(result.index, 1);
        assert_eq!(result.label, GestureLabel::WalkingUpstairs);
        assert_eq!(result.score, 0.9);

        let result = decoder.decode(&[0.2; 6]).unwrap();
        assert_eq!(result.label, GestureLabel::Walking);
    }

    #[test]
    fn test_decode_rejects_wrong_length() {
        let decoder = GestureDecoder::new();
        assert!(matches!(
            decoder.decode(&[0.5, 0.5]),
            Err(ModelError::InvalidOutputSize { expected: 6, actual: 2 })
        ));
    }

    #[test]
    fn test_classify_normalizes_before_model() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let stats = NormalizationStats::new([1.0; 9], [2.0; 9]).unwrap();
        let mut classifier = Classifier::new(
            Recording {
                scores: Ok(vec![0.0, 0.0, 0.0, 0.0, 0.0, 1.0]),
                seen: Arc::clone(&seen),
            },
            Normalizer::new(stats),
            GestureDecoder::new(),
        );

        let result = classifier.classify(&window_of(5.0)).unwrap();
        assert_eq!(result.label, GestureLabel::Laying);

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].len(), WINDOW_SIZE * 9);
        assert!(seen[0].iter().all(|&v| v == 2.0));
    }

    #[test]
    fn test_classify_partial_window_is_not_ready() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut classifier = Classifier::new(
            Recording {
                scores: Ok(vec![1.0; 6]),
                seen: Arc::clone(&seen),
            },
            Normalizer::default(),
            GestureDecoder::new(),
        );

        let err = classifier.classify(&window_of(0.0)[..100]).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::NotReady(NotReadyReason::BufferFilling { len: 100 })
        ));
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_model_failure_is_model_execution_error() {
        let mut classifier = Classifier::new(
            Recording {
                scores: Err("sesión rota".into()),
                seen: Arc::new(Mutex::new(Vec::new())),
            },
            Normalizer::default(),
            GestureDecoder::new(),
        );
        let err = classifier.classify(&window_of(0.0)).unwrap_err();
        assert!(matches!(err, PipelineError::ModelExecution(ModelError::Backend(_))));
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_load_classes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("classes.json");
        fs::write(
            &path,
            r#"{"index_to_class": {"1": "WALKING", "0": "LAYING", "2": "SITTING",
                "3": "STANDING", "4": "WALKING_UPSTAIRS", "5": "WALKING_DOWNSTAIRS"}}"#,
        )
        .unwrap();

        let decoder = GestureDecoder::from_classes_file(&path).unwrap();
        assert_eq!(decoder.labels()[0], GestureLabel::Laying);
        assert_eq!(decoder.labels()[1], GestureLabel::Walking);
        let result = decoder.decode(&[0.9, 0.1, 0.0, 0.0, 0.0, 0.0]).unwrap();
        assert_eq!(result.label, GestureLabel::Laying);
    }

    #[test]
    fn test_load_classes_rejects_bad_files() {
        let dir = tempfile::tempdir().unwrap();

        let missing = dir.path().join("missing.json");
        fs::write(&missing, r#"{"index_to_class": {"0": "WALKING"}}"#).unwrap();
        assert!(GestureDecoder::from_classes_file(&missing).is_err());

        let unknown = dir.path().join("unknown.json");
        fs::write(
            &unknown,
            r#"{"index_to_class": {"0": "WALKING", "1": "JUMPING", "2": "SITTING",
                "3": "STANDING", "4": "WALKING_UPSTAIRS", "5": "WALKING_DOWNSTAIRS"}}"#,
        )
        .unwrap();
        assert!(GestureDecoder::from_classes_file(&unknown).is_err());

        let repeated = dir.path().join("repeated.json");
        fs::write(
            &repeated,
            r#"{"index_to_class": {"0": "WALKING", "1": "WALKING", "2": "SITTING",
                "3": "STANDING", "4": "WALKING_UPSTAIRS", "5": "WALKING_DOWNSTAIRS"}}"#,
        )
        .unwrap();
        let err = GestureDecoder::from_classes_file(&repeated).unwrap_err();
        assert!(matches!(err, PipelineError::Configuration(_)));
    }
}
