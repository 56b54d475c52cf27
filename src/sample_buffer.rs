use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::types::{FeatureVector, Window, WINDOW_SIZE};

/// Buffer deslizante de capacidad fija (WINDOW_SIZE) con retención de solapamiento.
///
/// Todas las operaciones toman el mismo mutex: `append` desde el hilo de sensores
/// y `snapshot`/`retain_tail` desde el hilo de inferencia nunca se entrelazan.
/// Ninguna operación hace E/S ni llama al modelo mientras tiene el lock.
pub struct SampleBuffer {
    buffer: Mutex<VecDeque<FeatureVector>>,
    window_size: usize,
}

impl SampleBuffer {
    pub fn new() -> Self {
        Self {
            buffer: Mutex::new(VecDeque::with_capacity(WINDOW_SIZE)),
            window_size: WINDOW_SIZE,
        }
    }

    // Ninguna sección crítica deja el deque a medias, así que un lock envenenado sigue siendo válido
    fn lock(&self) -> MutexGuard<'_, VecDeque<FeatureVector>> {
        self.buffer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Añade un vector; si el buffer está lleno descarta el más antiguo
    pub fn append(&self, fv: FeatureVector) {
        let mut buffer = self.lock();
        if buffer.len() >= self.window_size {
            buffer.pop_front();
        }
        buffer.push_back(fv);
    }

    /// Copia del contenido solo si hay exactamente una ventana completa
    pub fn snapshot(&self) -> Option<Window> {
        let buffer = self.lock();
        Self::copy_window(&buffer, self.window_size)
    }

    /// Conserva solo los `n` vectores más recientes, en su orden original
    pub fn retain_tail(&self, n: usize) {
        let mut buffer = self.lock();
        Self::trim_front(&mut buffer, n);
    }

    /// `snapshot` + `retain_tail` en una única sección crítica, para que ninguna
    /// muestra que llegue entre ambos pasos se pierda
    pub fn take_window_and_retain(&self, n: usize) -> Option<Window> {
        let mut buffer = self.lock();
        let window = Self::copy_window(&buffer, self.window_size)?;
        Self::trim_front(&mut buffer, n);
        Some(window)
    }

    fn copy_window(buffer: &VecDeque<FeatureVector>, window_size: usize) -> Option<Window> {
        if buffer.len() != window_size {
            return None;
        }
        Some(buffer.iter().copied().collect())
    }

    fn trim_front(buffer: &mut VecDeque<FeatureVector>, n: usize) {
        let excess = buffer.len().saturating_sub(n);
        buffer.drain(..excess);
    }

    pub fn is_ready(&self) -> bool {
        self.len() == self.window_size
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    pub fn clear(&self) {
        self.lock().clear();
    }
}

impl Default for SampleBuffer {
    fn default() -> Self {
        Self::new()
    }
}
