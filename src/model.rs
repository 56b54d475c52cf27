//! Capacidad opaca de inferencia.
//!
//! El núcleo solo conoce el trait [`Model`]: entrada `[1, WINDOW_SIZE, NUM_FEATURES]`
//! en f32 y un vector de puntuaciones por clase. El backend (ONNX Runtime, un
//! servicio remoto, un modelo compilado) queda detrás del trait.

use std::io;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;

use crate::error::ModelError;
use crate::types::{FeatureVector, ScoreVector, MODEL_INPUT_LEN, NUM_FEATURES, WINDOW_SIZE};

/// Tensor de entrada [batch=1, time=WINDOW_SIZE, features=NUM_FEATURES], row-major
#[derive(Debug, Clone, PartialEq)]
pub struct ModelInput {
    data: Vec<f32>,
}

impl ModelInput {
    pub const SHAPE: [usize; 3] = [1, WINDOW_SIZE, NUM_FEATURES];

    /// Aplana una ventana ya normalizada. Layout: [t * 9 + característica]
    pub fn from_window(window: &[FeatureVector]) -> Result<Self, ModelError> {
        if window.len() != WINDOW_SIZE {
            return Err(ModelError::InvalidInputSize {
                expected: MODEL_INPUT_LEN,
                actual: window.len() * NUM_FEATURES,
            });
        }

        let mut data = Vec::with_capacity(MODEL_INPUT_LEN);
        for fv in window {
            data.extend(fv.iter().map(|&v| v as f32));
        }
        Ok(Self { data })
    }

    pub fn shape(&self) -> [usize; 3] {
        Self::SHAPE
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }
}

pub trait Model: Send {
    /// `false` mientras el modelo se inicializa; el planificador omite el ciclo
    fn is_ready(&self) -> bool;

    /// Puede bloquear (decenas o cientos de ms). Nunca se llama con el buffer bloqueado.
    fn predict(&mut self, input: &ModelInput) -> Result<ScoreVector, ModelError>;
}

impl<M: Model + ?Sized> Model for Box<M> {
    fn is_ready(&self) -> bool {
        (**self).is_ready()
    }

    fn predict(&mut self, input: &ModelInput) -> Result<ScoreVector, ModelError> {
        (**self).predict(input)
    }
}

/// Carga un modelo en segundo plano. Hasta que termina, `is_ready()` devuelve `false`
/// y `predict` falla con `ModelError::NotLoaded`.
pub struct DeferredModel {
    slot: Arc<Mutex<Option<Box<dyn Model>>>>,
}

impl DeferredModel {
    pub fn spawn<F, M>(loader: F) -> io::Result<Self>
    where
        F: FnOnce() -> Result<M, ModelError> + Send + 'static,
        M: Model + 'static,
    {
        let slot: Arc<Mutex<Option<Box<dyn Model>>>> = Arc::new(Mutex::new(None));
        let slot_clone = Arc::clone(&slot);

        thread::Builder::new()
            .name("carga-modelo".to_string())
            .spawn(move || match loader() {
                Ok(model) => {
                    let model: Box<dyn Model> = Box::new(model);
                    *slot_clone.lock().unwrap_or_else(PoisonError::into_inner) = Some(model);
                    log::info!("Modelo cargado con éxito");
                }
                Err(e) => {
                    log::error!("Error cargando el modelo: {}", e);
                }
            })?;

        Ok(Self { slot })
    }

    /// Envuelve un modelo ya cargado
    pub fn ready(model: impl Model + 'static) -> Self {
        let model: Box<dyn Model> = Box::new(model);
        Self {
            slot: Arc::new(Mutex::new(Some(model))),
        }
    }
}

impl Model for DeferredModel {
    fn is_ready(&self) -> bool {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map_or(false, |model| model.is_ready())
    }

    fn predict(&mut self, input: &ModelInput) -> Result<ScoreVector, ModelError> {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        match slot.as_mut() {
            Some(model) => model.predict(input),
            None => Err(ModelError::NotLoaded),
        }
    }
}

#[cfg(feature = "onnx")]
pub use onnx::OnnxModel;

#[cfg(feature = "onnx")]
mod onnx {
    use std::path::Path;

    use ort::session::Session;
    use ort::tensor::TensorElementType;
    use ort::value::ValueType;

    use super::{Model, ModelInput};
    use crate::error::ModelError;
    use crate::types::ScoreVector;

    /// Modelo exportado a ONNX (LSTM o CNN), ejecutado con ONNX Runtime
    pub struct OnnxModel {
        session: Session,
        input_name: String,
        prob_output_name: String,
    }

    impl OnnxModel {
        pub fn load(model_path: impl AsRef<Path>) -> Result<Self, ModelError> {
            let model_path = model_path.as_ref();
            let session = Session::builder()?.commit_from_file(model_path)?;

            let input_name = session
                .inputs
                .first()
                .map(|input| input.name.clone())
                .ok_or(ModelError::MissingIo { kind: "input" })?;

            let prob_output_name = session
                .outputs
                .iter()
                .find(|output| {
                    matches!(
                        output.output_type,
                        ValueType::Tensor {
                            ty: TensorElementType::Float32,
                            ..
                        }
                    )
                })
                .or_else(|| session.outputs.first())
                .map(|output| output.name.clone())
                .ok_or(ModelError::MissingIo { kind: "output" })?;

            log::info!("[ONNX] Modelo cargado: {}", model_path.display());
            log::info!("[ONNX] Input: {}", input_name);
            log::info!("[ONNX] Output: {}", prob_output_name);

            Ok(Self {
                session,
                input_name,
                prob_output_name,
            })
        }
    }

    impl Model for OnnxModel {
        fn is_ready(&self) -> bool {
            true
        }

        fn predict(&mut self, input: &ModelInput) -> Result<ScoreVector, ModelError> {
            // Tensor [1, 128, 9] a partir de la tupla (shape, datos)
            let shape_vec = input.shape().to_vec();
            let input_value =
                ort::value::Tensor::from_array((shape_vec, input.as_slice().to_vec()))?;

            let outputs = self.session.run(ort::inputs![
                self.input_name.as_str() => &input_value,
            ])?;

            let (_, prob_data) =
                outputs[self.prob_output_name.as_str()].try_extract_tensor::<f32>()?;

            if prob_data.is_empty() {
                return Err(ModelError::NoOutputTensor);
            }
            Ok(prob_data.to_vec())
        }
    }
}
