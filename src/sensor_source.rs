use std::io;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{tick, Sender};

use crate::csv_loader::RecordedSample;
use crate::error::SensorKind;
use crate::types::Sample3;

/// Evento de un sensor, tal como llega de la plataforma
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SensorEvent {
    Accelerometer(Sample3),
    Gyroscope(Sample3),
}

impl SensorEvent {
    pub fn kind(&self) -> SensorKind {
        match self {
            SensorEvent::Accelerometer(_) => SensorKind::Accelerometer,
            SensorEvent::Gyroscope(_) => SensorKind::Gyroscope,
        }
    }

    pub fn sample(&self) -> Sample3 {
        match *self {
            SensorEvent::Accelerometer(s) | SensorEvent::Gyroscope(s) => s,
        }
    }
}

/// Reproduce una sesión grabada a ritmo real. Por cada fila se envía primero el
/// giroscopio y después el acelerómetro, de modo que cada vector use el giro de su fila.
/// El hilo termina al agotar las filas o cuando el receptor se suelta.
pub fn start_csv_replay(
    samples: Vec<RecordedSample>,
    interval: Duration,
    tx: Sender<SensorEvent>,
) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("reproductor-csv".to_string())
        .spawn(move || {
            let ticker = tick(interval);
            let total = samples.len();
            log::info!("Reproduciendo {} muestras cada {:?}", total, interval);

            for (sent, sample) in samples.into_iter().enumerate() {
                if ticker.recv().is_err() {
                    break;
                }
                let events = [
                    SensorEvent::Gyroscope(sample.gyro),
                    SensorEvent::Accelerometer(sample.accel),
                ];
                if events.into_iter().any(|event| tx.send(event).is_err()) {
                    log::debug!("Receptor cerrado tras {} de {} muestras", sent, total);
                    return;
                }
            }

            log::info!("Reproducción terminada");
        })
}
