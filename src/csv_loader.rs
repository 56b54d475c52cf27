use std::path::Path;

use anyhow::{bail, ensure, Context, Result};
use csv::ReaderBuilder;

use crate::types::Sample3;

/// Una fila grabada: instante en ms, acelerómetro y giroscopio
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecordedSample {
    pub t_ms: u64,
    pub accel: Sample3,
    pub gyro: Sample3,
}

/// Carga una sesión grabada desde un CSV con el formato
/// t_ms,ax,ay,az,gx,gy,gz ordenado por t_ms.
pub fn load_samples_from_csv(path: impl AsRef<Path>) -> Result<Vec<RecordedSample>> {
    let path = path.as_ref();
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("No se pudo abrir el CSV {:?}", path))?;

    let mut samples = Vec::new();
    let mut last_t: Option<u64> = None;

    for (row_idx, result) in reader.records().enumerate() {
        let record =
            result.with_context(|| format!("Fila {} inválida en {:?}", row_idx + 1, path))?;
        if record.len() < 7 {
            bail!("La fila {} no tiene 7 columnas", row_idx + 1);
        }

        let t_ms: u64 = record[0]
            .parse()
            .with_context(|| format!("t_ms inválido en fila {}", row_idx + 1))?;

        let mut values = [0.0f64; 6];
        for (i, value) in values.iter_mut().enumerate() {
            *value = record[i + 1]
                .parse()
                .with_context(|| format!("columna {} inválida en fila {}", i + 1, row_idx + 1))?;
        }

        if let Some(prev) = last_t {
            ensure!(
                t_ms >= prev,
                "t_ms no monótono en fila {} ({} < {})",
                row_idx + 1,
                t_ms,
                prev
            );
        }
        last_t = Some(t_ms);

        samples.push(RecordedSample {
            t_ms,
            accel: Sample3::new(values[0], values[1], values[2]),
            gyro: Sample3::new(values[3], values[4], values[5]),
        });
    }

    ensure!(!samples.is_empty(), "El CSV {:?} no contiene datos", path);
    Ok(samples)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_load_samples() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sesion.csv");
        fs::write(
            &path,
            "t_ms,ax,ay,az,gx,gy,gz\n0, 1.0,0,0, 0,0,0\n20,0.9,0.1,-0.2,0.01,0.02,0.03\n",
        )
        .unwrap();

        let samples = load_samples_from_csv(&path).unwrap();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].accel, Sample3::new(1.0, 0.0, 0.0));
        assert_eq!(samples[1].t_ms, 20);
        assert_eq!(samples[1].gyro, Sample3::new(0.01, 0.02, 0.03));
    }

    #[test]
    fn test_rejects_malformed_rows() {
        let dir = tempfile::tempdir().unwrap();

        let short = dir.path().join("short.csv");
        fs::write(&short, "t_ms,ax,ay,az,gx,gy,gz\n0,1,2,3\n").unwrap();
        assert!(load_samples_from_csv(&short).is_err());

        let text = dir.path().join("text.csv");
        fs::write(&text, "t_ms,ax,ay,az,gx,gy,gz\n0,1,dos,3,0,0,0\n").unwrap();
        assert!(load_samples_from_csv(&text).is_err());

        let backwards = dir.path().join("backwards.csv");
        fs::write(&backwards, "t_ms,ax,ay,az,gx,gy,gz\n40,0,0,0,0,0,0\n20,0,0,0,0,0,0\n").unwrap();
        assert!(load_samples_from_csv(&backwards).is_err());

        let empty = dir.path().join("empty.csv");
        fs::write(&empty, "t_ms,ax,ay,az,gx,gy,gz\n").unwrap();
        assert!(load_samples_from_csv(&empty).is_err());

        assert!(load_samples_from_csv(dir.path().join("no-existe.csv")).is_err());
    }
}
