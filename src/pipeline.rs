//! Orquestación en tiempo real.
//!
//! Dos caminos comparten un único [`SampleBuffer`]:
//! - ingesta: cada evento del acelerómetro compone un vector con el último giro
//!   conocido y lo añade al buffer;
//! - inferencia: en cada tick del planificador se toma la ventana completa, se
//!   clasifica y se conservan las `RETAIN_COUNT` muestras más recientes.
//!
//! El modelo nunca se ejecuta con el buffer bloqueado.

use std::io;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, select, Receiver, Sender, TrySendError};

use crate::error::{NotReadyReason, PipelineError, Result, SensorKind};
use crate::feature_composer::FeatureComposer;
use crate::gesture_classifier::{Classification, Classifier};
use crate::sample_buffer::SampleBuffer;
use crate::scheduler::InferenceScheduler;
use crate::sensor_source::SensorEvent;
use crate::types::{FeatureFrame, GestureLabel, Sample3, RETAIN_COUNT};

/// Eventos observables del pipeline. Se publican en un canal acotado; si nadie
/// los consume, se descartan los más antiguos.
/// Los ciclos omitidos en el arranque no generan evento, solo log de depuración.
#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    Classified { label: GestureLabel, score: f32 },
    ModelFailed(String),
    SampleDiscarded { sensor: SensorKind, sample: Sample3 },
    SourceClosed,
}

struct IngestState {
    composer: FeatureComposer,
    latest_gyro: Sample3,
}

impl Default for IngestState {
    fn default() -> Self {
        Self {
            composer: FeatureComposer::new(),
            // Hasta el primer evento del giroscopio se usa (0, 0, 0)
            latest_gyro: Sample3::ZERO,
        }
    }
}

struct Shared {
    buffer: SampleBuffer,
    ingest: Mutex<IngestState>,
    classifier: Mutex<Classifier>,
    latest_label: Mutex<Option<GestureLabel>>,
    latest_features: Mutex<Option<FeatureFrame>>,
    diag_tx: Sender<Diagnostic>,
    diag_rx: Receiver<Diagnostic>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Shared {
    fn emit(&self, diagnostic: Diagnostic) {
        let mut pending = diagnostic;
        loop {
            match self.diag_tx.try_send(pending) {
                Ok(()) => return,
                Err(TrySendError::Full(back)) => {
                    // Canal lleno: se sacrifica el evento más antiguo
                    if let Ok(dropped) = self.diag_rx.try_recv() {
                        log::trace!("Canal de diagnóstico lleno, descartado: {:?}", dropped);
                    }
                    pending = back;
                }
                Err(TrySendError::Disconnected(_)) => return,
            }
        }
    }

    fn discard(&self, err: PipelineError) -> PipelineError {
        if let PipelineError::NumericAnomaly { sensor, sample } = &err {
            log::warn!("{}", err);
            self.emit(Diagnostic::SampleDiscarded {
                sensor: *sensor,
                sample: *sample,
            });
        }
        err
    }

    fn on_gyroscope(&self, sample: Sample3) -> Result<()> {
        if !sample.is_finite() {
            return Err(self.discard(PipelineError::NumericAnomaly {
                sensor: SensorKind::Gyroscope,
                sample,
            }));
        }
        lock(&self.ingest).latest_gyro = sample;
        Ok(())
    }

    fn on_accelerometer(&self, sample: Sample3) -> Result<()> {
        // El lock de ingesta se mantiene durante el append para que los vectores
        // entren al buffer en el mismo orden en que pasaron por los filtros
        let mut ingest = lock(&self.ingest);
        let gyro = ingest.latest_gyro;
        let frame = ingest
            .composer
            .compose(sample, gyro)
            .map_err(|e| self.discard(e))?;
        self.buffer.append(frame.to_vector());
        drop(ingest);

        *lock(&self.latest_features) = Some(frame);
        Ok(())
    }

    fn tick(&self) -> Result<Classification> {
        let mut classifier = lock(&self.classifier);

        if !classifier.is_ready() {
            log::debug!("Inferencia omitida: {}", NotReadyReason::ModelLoading);
            return Err(PipelineError::NotReady(NotReadyReason::ModelLoading));
        }

        let Some(window) = self.buffer.take_window_and_retain(RETAIN_COUNT) else {
            let reason = NotReadyReason::BufferFilling {
                len: self.buffer.len(),
            };
            log::debug!("Inferencia omitida: {}", reason);
            return Err(PipelineError::NotReady(reason));
        };

        match classifier.classify(&window) {
            Ok(result) => {
                *lock(&self.latest_label) = Some(result.label);
                log::debug!(
                    "[ACTIVIDAD] {} (score: {:.3})",
                    result.label,
                    result.score
                );
                self.emit(Diagnostic::Classified {
                    label: result.label,
                    score: result.score,
                });
                Ok(result)
            }
            Err(e) => {
                // La etiqueta anterior se mantiene
                log::warn!("Error clasificando: {}", e);
                self.emit(Diagnostic::ModelFailed(e.to_string()));
                Err(e)
            }
        }
    }

    fn reset(&self) {
        // Con el clasificador bloqueado ningún ciclo en curso puede publicar
        // una etiqueta después del reinicio
        let _classifier = lock(&self.classifier);
        let mut ingest = lock(&self.ingest);
        *ingest = IngestState::default();
        self.buffer.clear();
        drop(ingest);
        *lock(&self.latest_label) = None;
        *lock(&self.latest_features) = None;
    }
}

struct IngestWorker {
    cancel_tx: Sender<()>,
    handle: JoinHandle<()>,
}

/// Pipeline de reconocimiento de actividad
pub struct Pipeline {
    shared: Arc<Shared>,
    scheduler: Option<InferenceScheduler>,
    ingest: Option<IngestWorker>,
}

impl Pipeline {
    pub fn new(classifier: Classifier, diagnostics_capacity: usize) -> Self {
        let (diag_tx, diag_rx) = bounded(diagnostics_capacity.max(1));
        Self {
            shared: Arc::new(Shared {
                buffer: SampleBuffer::new(),
                ingest: Mutex::new(IngestState::default()),
                classifier: Mutex::new(classifier),
                latest_label: Mutex::new(None),
                latest_features: Mutex::new(None),
                diag_tx,
                diag_rx,
            }),
            scheduler: None,
            ingest: None,
        }
    }

    /// Registra el último giro. No produce vector por sí solo.
    pub fn on_gyroscope(&self, sample: Sample3) -> Result<()> {
        self.shared.on_gyroscope(sample)
    }

    /// Compone un vector con el último giro y lo añade al buffer
    pub fn on_accelerometer(&self, sample: Sample3) -> Result<()> {
        self.shared.on_accelerometer(sample)
    }

    pub fn handle_event(&self, event: SensorEvent) -> Result<()> {
        match event {
            SensorEvent::Accelerometer(s) => self.on_accelerometer(s),
            SensorEvent::Gyroscope(s) => self.on_gyroscope(s),
        }
    }

    /// Un ciclo de inferencia. Lo normal es que lo llame el planificador.
    pub fn tick(&self) -> Result<Classification> {
        self.shared.tick()
    }

    /// Arranca (o reemplaza) el disparador periódico de inferencia
    pub fn start_scheduler(&mut self, interval: Duration) -> io::Result<()> {
        if let Some(mut previous) = self.scheduler.take() {
            previous.cancel();
        }
        let shared = Arc::clone(&self.shared);
        let scheduler = InferenceScheduler::start(interval, move |_| {
            // Los errores ya se han publicado como diagnóstico
            let _ = shared.tick();
        })?;
        self.scheduler = Some(scheduler);
        Ok(())
    }

    /// Consume eventos de una fuente en un hilo propio hasta que la fuente se cierre
    pub fn attach_source(&mut self, rx: Receiver<SensorEvent>) -> io::Result<()> {
        self.detach_source();

        let (cancel_tx, cancel_rx) = bounded::<()>(1);
        let shared = Arc::clone(&self.shared);

        let handle = thread::Builder::new()
            .name("ingesta".to_string())
            .spawn(move || loop {
                select! {
                    recv(rx) -> msg => match msg {
                        Ok(SensorEvent::Accelerometer(s)) => {
                            let _ = shared.on_accelerometer(s);
                        }
                        Ok(SensorEvent::Gyroscope(s)) => {
                            let _ = shared.on_gyroscope(s);
                        }
                        Err(_) => {
                            log::info!("Fuente de sensores cerrada");
                            shared.emit(Diagnostic::SourceClosed);
                            break;
                        }
                    },
                    recv(cancel_rx) -> _ => break,
                }
            })?;

        self.ingest = Some(IngestWorker { cancel_tx, handle });
        Ok(())
    }

    fn detach_source(&mut self) {
        if let Some(worker) = self.ingest.take() {
            let _ = worker.cancel_tx.try_send(());
            if worker.handle.join().is_err() {
                log::error!("El hilo de ingesta terminó con pánico");
            }
        }
    }

    /// Última actividad clasificada con éxito
    pub fn latest_label(&self) -> Option<GestureLabel> {
        *lock(&self.shared.latest_label)
    }

    /// Último frame compuesto, para mostrar en pantalla
    pub fn latest_features(&self) -> Option<FeatureFrame> {
        *lock(&self.shared.latest_features)
    }

    pub fn diagnostics(&self) -> Receiver<Diagnostic> {
        self.shared.diag_rx.clone()
    }

    pub fn buffered_len(&self) -> usize {
        self.shared.buffer.len()
    }

    pub fn is_running(&self) -> bool {
        self.scheduler.as_ref().map_or(false, InferenceScheduler::is_running)
    }

    /// Vacía el buffer y reinicia los filtros. Útil tras un hueco en la señal.
    pub fn reset(&self) {
        self.shared.reset();
    }

    /// Detiene planificador e ingesta. Tras volver no se disparan más ciclos.
    pub fn shutdown(&mut self) {
        if let Some(mut scheduler) = self.scheduler.take() {
            scheduler.cancel();
        }
        self.detach_source();
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        self.shutdown();
    }
}
