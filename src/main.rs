/*
Reconocimiento de actividad en tiempo real - Rust + ONNX

1. Reproduce una sesión grabada (CSV) al ritmo del sensor (20 ms)
2. Separa gravedad y aceleración corporal con un Butterworth de 2º orden
3. Cada 1.28 s clasifica la última ventana de 128 muestras con ONNX Runtime
4. Conserva la mitad de la ventana para el siguiente ciclo

Uso:
     RUST_LOG=debug ./target/release/actigrafo sesion.csv [config.json]
*/

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use crossbeam_channel::bounded;

use actigrafo::csv_loader::load_samples_from_csv;
use actigrafo::model::DeferredModel;
use actigrafo::sensor_source::{start_csv_replay, SensorEvent};
use actigrafo::types::SAMPLING_INTERVAL;
use actigrafo::{Diagnostic, PipelineConfig};

fn parse_args() -> Result<(PathBuf, Option<PathBuf>)> {
    let mut args = env::args().skip(1);
    let csv_path = args
        .next()
        .map(PathBuf::from)
        .ok_or_else(|| anyhow!("Uso: actigrafo <muestras.csv> [config.json]"))?;
    let config_path = args.next().map(PathBuf::from);
    if args.next().is_some() {
        bail!("Uso: actigrafo <muestras.csv> [config.json]");
    }
    Ok((csv_path, config_path))
}

#[cfg(feature = "onnx")]
fn load_model(config: &PipelineConfig) -> Result<DeferredModel> {
    use actigrafo::model::OnnxModel;

    let model_path = config.model_path.clone();
    log::info!("Cargando modelo {:?} en segundo plano...", model_path);
    Ok(DeferredModel::spawn(move || OnnxModel::load(model_path))?)
}

#[cfg(not(feature = "onnx"))]
fn load_model(_config: &PipelineConfig) -> Result<DeferredModel> {
    bail!("actigrafo se compiló sin la feature \"onnx\"")
}

fn report(diagnostic: Diagnostic) {
    match diagnostic {
        Diagnostic::Classified { label, score } => {
            log::info!("[ACTIVIDAD] {} (score: {:.3})", label, score);
        }
        Diagnostic::ModelFailed(e) => log::warn!("Ciclo abandonado: {}", e),
        Diagnostic::SampleDiscarded { sensor, .. } => {
            log::warn!("Muestra del {} descartada", sensor);
        }
        Diagnostic::SourceClosed => log::info!("Fuente de sensores cerrada"),
    }
}

fn main() -> Result<()> {
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let (csv_path, config_path) = parse_args()?;
    let config = match &config_path {
        Some(path) => PipelineConfig::load(path)
            .with_context(|| format!("Configuración inválida en {:?}", path))?,
        None => PipelineConfig::default(),
    };
    log::info!("Cadencia de inferencia: {:?}", config.inference_interval());

    let samples = load_samples_from_csv(&csv_path)?;
    log::info!("{} muestras cargadas desde {:?}", samples.len(), csv_path);

    let model = load_model(&config)?;
    let mut pipeline = config.build_pipeline(model)?;
    let diagnostics = pipeline.diagnostics();

    let (tx, rx) = bounded::<SensorEvent>(100);
    pipeline.attach_source(rx)?;
    pipeline.start_scheduler(config.inference_interval())?;
    let replay = start_csv_replay(samples, SAMPLING_INTERVAL, tx)?;

    for diagnostic in diagnostics.iter() {
        if diagnostic == Diagnostic::SourceClosed {
            break;
        }
        report(diagnostic);
    }

    // Un último ciclo para la cola de muestras que quedó en el buffer
    if let Ok(diagnostic) =
        diagnostics.recv_timeout(config.inference_interval() + Duration::from_millis(50))
    {
        report(diagnostic);
    }
    pipeline.shutdown();
    if replay.join().is_err() {
        log::error!("El hilo de reproducción terminó con pánico");
    }

    match pipeline.latest_label() {
        Some(label) => log::info!("Última actividad: {}", label),
        None => log::info!("No se llegó a clasificar ninguna ventana"),
    }
    Ok(())
}
