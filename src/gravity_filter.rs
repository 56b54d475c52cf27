//! Filtro pasa-bajos Butterworth de 2º orden para estimar la gravedad.
//!
//! Cada eje lleva su propia instancia: el estado (x[n-1], x[n-2], y[n-1], y[n-2])
//! nunca se comparte entre ejes.

use std::f64::consts::{PI, SQRT_2};

use crate::error::{PipelineError, Result};
use crate::types::{Sample3, GRAVITY_CUTOFF, NUM_AXES, SAMPLING_RATE};

/// Coeficientes de la ecuación en diferencias, normalizados con a0 = 1
#[derive(Debug, Clone, Copy, PartialEq)]
struct Coefficients {
    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,
}

impl Coefficients {
    /// Diseño por transformada bilineal con pre-warping de la frecuencia de corte
    fn lowpass(cutoff: f64, sample_rate: f64) -> Self {
        let k = (PI * cutoff / sample_rate).tan();
        let k2 = k * k;
        let norm = 1.0 / (1.0 + SQRT_2 * k + k2);

        let b0 = k2 * norm;
        Self {
            b0,
            b1: 2.0 * b0,
            b2: b0,
            a1: 2.0 * (k2 - 1.0) * norm,
            a2: (1.0 - SQRT_2 * k + k2) * norm,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GravityFilter {
    coeffs: Coefficients,
    cutoff: f64,
    sample_rate: f64,
    x1: f64,
    x2: f64,
    y1: f64,
    y2: f64,
}

impl GravityFilter {
    pub fn new(cutoff: f64, sample_rate: f64) -> Result<Self> {
        if !(cutoff.is_finite() && sample_rate.is_finite()) || cutoff <= 0.0 || sample_rate <= 0.0 {
            return Err(PipelineError::config(format!(
                "parámetros de filtro inválidos: corte={} fs={}",
                cutoff, sample_rate
            )));
        }
        if cutoff >= sample_rate / 2.0 {
            return Err(PipelineError::config(format!(
                "la frecuencia de corte {} debe ser menor que Nyquist ({})",
                cutoff,
                sample_rate / 2.0
            )));
        }

        Ok(Self::design(cutoff, sample_rate))
    }

    /// Filtro de gravedad con los parámetros de entrenamiento (0.3 Hz @ 50 Hz).
    /// Mismos coeficientes que `new(GRAVITY_CUTOFF, SAMPLING_RATE)`.
    pub fn gravity() -> Self {
        Self::design(GRAVITY_CUTOFF, SAMPLING_RATE)
    }

    fn design(cutoff: f64, sample_rate: f64) -> Self {
        Self {
            coeffs: Coefficients::lowpass(cutoff, sample_rate),
            cutoff,
            sample_rate,
            x1: 0.0,
            x2: 0.0,
            y1: 0.0,
            y2: 0.0,
        }
    }

    /// Procesa una muestra. Debe llamarse en estricto orden temporal.
    /// No valida la entrada: NaN/Inf se propagan y se filtran una capa más arriba.
    pub fn process(&mut self, x: f64) -> f64 {
        let c = &self.coeffs;
        let y = c.b0 * x + c.b1 * self.x1 + c.b2 * self.x2 - c.a1 * self.y1 - c.a2 * self.y2;

        self.x2 = self.x1;
        self.x1 = x;
        self.y2 = self.y1;
        self.y1 = y;
        y
    }

    pub fn reset(&mut self) {
        self.x1 = 0.0;
        self.x2 = 0.0;
        self.y1 = 0.0;
        self.y2 = 0.0;
    }

    pub fn cutoff(&self) -> f64 {
        self.cutoff
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }
}

/// Tres filtros independientes, uno por eje
#[derive(Debug, Clone)]
pub struct AxisFilters {
    axes: [GravityFilter; NUM_AXES],
}

impl AxisFilters {
    /// Estimación de la gravedad para una muestra del acelerómetro
    pub fn process(&mut self, accel: Sample3) -> Sample3 {
        Sample3::new(
            self.axes[0].process(accel.x),
            self.axes[1].process(accel.y),
            self.axes[2].process(accel.z),
        )
    }

    pub fn reset(&mut self) {
        for axis in self.axes.iter_mut() {
            axis.reset();
        }
    }
}

impl Default for AxisFilters {
    fn default() -> Self {
        Self {
            axes: [
                GravityFilter::gravity(),
                GravityFilter::gravity(),
                GravityFilter::gravity(),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn run(filter: &mut GravityFilter, input: &[f64]) -> Vec<f64> {
        input.iter().map(|&x| filter.process(x)).collect()
    }

    #[test]
    fn test_deterministic_output() {
        let input: Vec<f64> = (0..500).map(|i| (i as f64 * 0.37).sin() * 9.81 + 0.1).collect();

        let a = run(&mut GravityFilter::gravity(), &input);
        let b = run(&mut GravityFilter::gravity(), &input);

        let a_bits: Vec<u64> = a.iter().map(|v| v.to_bits()).collect();
        let b_bits: Vec<u64> = b.iter().map(|v| v.to_bits()).collect();
        assert_eq!(a_bits, b_bits);
    }

    #[test]
    fn test_reset_restores_fresh_state() {
        let input: Vec<f64> = (0..50).map(|i| i as f64 * 0.1).collect();
        let mut filter = GravityFilter::gravity();
        let first = run(&mut filter, &input);
        filter.reset();
        let second = run(&mut filter, &input);
        assert_eq!(first, second);
    }

    #[test]
    fn test_unity_dc_gain() {
        let mut filter = GravityFilter::gravity();
        let mut y = 0.0;
        // A 0.3 Hz la constante de tiempo es ~0.5 s; 3000 muestras = 60 s
        for _ in 0..3000 {
            y = filter.process(1.0);
        }
        assert_abs_diff_eq!(y, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_attenuates_high_frequency() {
        let mut filter = GravityFilter::gravity();
        // Alternancia +1/-1 = frecuencia de Nyquist
        let out: Vec<f64> = (0..1000)
            .map(|i| filter.process(if i % 2 == 0 { 1.0 } else { -1.0 }))
            .collect();
        let tail_max = out[900..].iter().fold(0.0f64, |m, v| m.max(v.abs()));
        assert!(tail_max < 1e-3, "tail_max = {}", tail_max);
    }

    #[test]
    fn test_first_output_is_b0() {
        let mut filter = GravityFilter::gravity();
        let k = (PI * 0.3 / 50.0).tan();
        let expected = k * k / (1.0 + SQRT_2 * k + k * k);
        assert_abs_diff_eq!(filter.process(1.0), expected, epsilon = 1e-15);
    }

    #[test]
    fn test_nan_propagates() {
        let mut filter = GravityFilter::gravity();
        assert!(filter.process(f64::NAN).is_nan());
    }

    #[test]
    fn test_gravity_matches_validated_constructor() {
        let input: Vec<f64> = (0..200).map(|i| (i as f64 * 0.11).cos()).collect();
        let mut validated = GravityFilter::new(GRAVITY_CUTOFF, SAMPLING_RATE).unwrap();
        let mut preset = GravityFilter::gravity();
        assert_eq!(preset.cutoff(), validated.cutoff());
        assert_eq!(preset.sample_rate(), validated.sample_rate());
        assert_eq!(run(&mut preset, &input), run(&mut validated, &input));
    }

    #[test]
    fn test_rejects_invalid_parameters() {
        assert!(GravityFilter::new(0.3, 50.0).is_ok());
        assert!(GravityFilter::new(25.0, 50.0).is_err());
        assert!(GravityFilter::new(0.0, 50.0).is_err());
        assert!(GravityFilter::new(0.3, -1.0).is_err());
        assert!(GravityFilter::new(f64::NAN, 50.0).is_err());
    }

    #[test]
    fn test_axes_are_independent() {
        let mut filters = AxisFilters::default();
        let mut x_only = GravityFilter::gravity();
        for i in 0..20 {
            let g = filters.process(Sample3::new(i as f64, 100.0, -3.0));
            assert_eq!(g.x, x_only.process(i as f64));
        }
    }
}
