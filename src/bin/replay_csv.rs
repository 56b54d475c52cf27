use std::env;
use std::path::PathBuf;

use anyhow::{anyhow, bail, Result};

use actigrafo::csv_loader::load_samples_from_csv;
use actigrafo::types::{GestureLabel, WINDOW_SIZE};
use actigrafo::{PipelineConfig, PipelineError};

struct ReplayOptions {
    dump_features: bool,
    config_path: Option<PathBuf>,
}

fn parse_args() -> Result<(PathBuf, ReplayOptions)> {
    let mut dump_features = false;
    let mut positional: Vec<PathBuf> = Vec::new();

    for arg in env::args().skip(1) {
        match arg.as_str() {
            "--dump-features" => dump_features = true,
            _ => positional.push(PathBuf::from(arg)),
        }
    }

    if positional.len() > 2 {
        bail!("Uso: replay_csv [--dump-features] <muestras.csv> [config.json]");
    }
    let mut positional = positional.into_iter();
    let csv_path = positional
        .next()
        .ok_or_else(|| anyhow!("Debes especificar un archivo CSV"))?;
    Ok((
        csv_path,
        ReplayOptions {
            dump_features,
            config_path: positional.next(),
        },
    ))
}

#[cfg(feature = "onnx")]
fn load_model(config: &PipelineConfig) -> Result<actigrafo::OnnxModel> {
    Ok(actigrafo::OnnxModel::load(&config.model_path)?)
}

#[cfg(not(feature = "onnx"))]
fn load_model(_config: &PipelineConfig) -> Result<actigrafo::DeferredModel> {
    bail!("replay_csv se compiló sin la feature \"onnx\"")
}

fn main() -> Result<()> {
    env_logger::builder()
        .filter_level(log::LevelFilter::Warn)
        .parse_default_env()
        .init();

    let (csv_path, opts) = parse_args()?;
    println!("🎞️  Reproduciendo sesión desde {:?}", csv_path);

    let config = match &opts.config_path {
        Some(path) => PipelineConfig::load(path)?,
        None => PipelineConfig::default(),
    };
    let samples = load_samples_from_csv(&csv_path)?;
    println!("ℹ️  {} muestras, ventana de {}", samples.len(), WINDOW_SIZE);

    let decoder = config.decoder()?;
    let pipeline = config.build_pipeline(load_model(&config)?)?;
    let mut cycles = 0usize;

    for sample in &samples {
        // Sin reloj: se clasifica en cuanto el buffer se llena, es decir cada media ventana
        if let Err(e) = pipeline
            .on_gyroscope(sample.gyro)
            .and_then(|_| pipeline.on_accelerometer(sample.accel))
        {
            println!("⚠️  t={} ms: {}", sample.t_ms, e);
            continue;
        }

        if opts.dump_features {
            if let Some(frame) = pipeline.latest_features() {
                let fv = frame.to_vector();
                let row: Vec<String> = fv.iter().map(|v| format!("{:>10.5}", v)).collect();
                println!("  {:>7} ms: {}", sample.t_ms, row.join(" "));
            }
        }

        if pipeline.buffered_len() < WINDOW_SIZE {
            continue;
        }

        match pipeline.tick() {
            Ok(result) => {
                cycles += 1;
                println!(
                    "\n🥇 Ventana {} (t={} ms): {}",
                    cycles, sample.t_ms, result.label
                );

                let mut scores: Vec<(GestureLabel, f32)> = result
                    .scores
                    .iter()
                    .enumerate()
                    .filter_map(|(idx, &s)| decoder.labels().get(idx).map(|&label| (label, s)))
                    .collect();
                scores.sort_by(|a, b| b.1.total_cmp(&a.1));
                for (idx, (label, score)) in scores.iter().take(3).enumerate() {
                    println!("  {:>2}. {:<20} {:>8.4}", idx + 1, label, score);
                }
            }
            Err(PipelineError::NotReady(reason)) => println!("⏳ {}", reason),
            Err(e) => println!("❌ Error clasificando: {}", e),
        }
    }

    if cycles == 0 {
        println!("\nℹ️  La sesión no llegó a llenar una ventana");
    }
    Ok(())
}
