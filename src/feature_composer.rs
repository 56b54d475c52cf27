use crate::error::{PipelineError, Result, SensorKind};
use crate::gravity_filter::AxisFilters;
use crate::types::{FeatureFrame, Sample3};

/// Separa gravedad y aceleración corporal y construye el vector de 9 características.
/// El único estado es el de los filtros de gravedad.
#[derive(Debug, Clone, Default)]
pub struct FeatureComposer {
    gravity: AxisFilters,
}

impl FeatureComposer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compone el frame para el par (acc, gyro) del instante actual.
    /// Las muestras no finitas se rechazan sin tocar el estado de los filtros.
    pub fn compose(&mut self, accel: Sample3, gyro: Sample3) -> Result<FeatureFrame> {
        if !accel.is_finite() {
            return Err(PipelineError::NumericAnomaly {
                sensor: SensorKind::Accelerometer,
                sample: accel,
            });
        }
        if !gyro.is_finite() {
            return Err(PipelineError::NumericAnomaly {
                sensor: SensorKind::Gyroscope,
                sample: gyro,
            });
        }

        let g = self.gravity.process(accel);
        let body_accel = Sample3::new(accel.x - g.x, accel.y - g.y, accel.z - g.z);

        Ok(FeatureFrame {
            accel,
            body_accel,
            gyro,
        })
    }

    pub fn reset(&mut self) {
        self.gravity.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gravity_filter::GravityFilter;

    #[test]
    fn test_body_is_accel_minus_gravity() {
        let mut composer = FeatureComposer::new();
        let mut gx = GravityFilter::gravity();
        let mut gz = GravityFilter::gravity();

        for i in 0..10 {
            let accel = Sample3::new(1.0 + i as f64, 0.0, -9.81);
            let gyro = Sample3::new(0.1, 0.2, 0.3);
            let frame = composer.compose(accel, gyro).unwrap();

            assert_eq!(frame.accel, accel);
            assert_eq!(frame.gyro, gyro);
            assert_eq!(frame.body_accel.x, accel.x - gx.process(accel.x));
            assert_eq!(frame.body_accel.y, 0.0);
            assert_eq!(frame.body_accel.z, accel.z - gz.process(accel.z));
        }
    }

    #[test]
    fn test_non_finite_sample_leaves_filters_untouched() {
        let mut clean = FeatureComposer::new();
        let mut dirty = FeatureComposer::new();

        let accel = Sample3::new(0.5, 0.2, 9.7);
        clean.compose(accel, Sample3::ZERO).unwrap();
        dirty.compose(accel, Sample3::ZERO).unwrap();

        let err = dirty
            .compose(Sample3::new(f64::NAN, 0.0, 0.0), Sample3::ZERO)
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::NumericAnomaly { sensor: SensorKind::Accelerometer, .. }
        ));
        let err = dirty
            .compose(accel, Sample3::new(0.0, f64::INFINITY, 0.0))
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::NumericAnomaly { sensor: SensorKind::Gyroscope, .. }
        ));

        let a = clean.compose(accel, Sample3::ZERO).unwrap();
        let b = dirty.compose(accel, Sample3::ZERO).unwrap();
        assert_eq!(a, b);
    }
}
