use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, select, tick, Sender};

/// Disparador periódico cancelable. Cada tick llama a `on_tick` desde un hilo propio,
/// independiente del ritmo de llegada de muestras.
pub struct InferenceScheduler {
    interval: Duration,
    cancel_tx: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
    ticks: Arc<AtomicU64>,
}

impl InferenceScheduler {
    pub fn start<F>(interval: Duration, mut on_tick: F) -> io::Result<Self>
    where
        F: FnMut(Instant) + Send + 'static,
    {
        let (cancel_tx, cancel_rx) = bounded::<()>(1);
        let ticks = Arc::new(AtomicU64::new(0));
        let ticks_clone = Arc::clone(&ticks);
        let ticker = tick(interval);

        let handle = thread::Builder::new()
            .name("inferencia".to_string())
            .spawn(move || loop {
                select! {
                    recv(ticker) -> at => {
                        let Ok(at) = at else { break };
                        ticks_clone.fetch_add(1, Ordering::Relaxed);
                        on_tick(at);
                    }
                    // Mensaje explícito o sender soltado: en ambos casos se termina
                    recv(cancel_rx) -> _ => break,
                }
            })?;

        log::debug!("Planificador de inferencia iniciado cada {:?}", interval);

        Ok(Self {
            interval,
            cancel_tx: Some(cancel_tx),
            handle: Some(handle),
            ticks,
        })
    }

    /// Detiene el disparador y espera a que termine el tick en curso
    pub fn cancel(&mut self) {
        if let Some(cancel_tx) = self.cancel_tx.take() {
            let _ = cancel_tx.try_send(());
        }
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("El hilo de inferencia terminó con pánico");
            }
            log::debug!("Planificador de inferencia detenido");
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Número de ticks disparados desde el arranque
    pub fn tick_count(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }
}

impl Drop for InferenceScheduler {
    fn drop(&mut self) {
        self.cancel();
    }
}
