use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Constantes del sistema
pub const WINDOW_SIZE: usize = 128; // time_steps del modelo
pub const RETAIN_COUNT: usize = WINDOW_SIZE / 2; // solapamiento del 50%
pub const NUM_AXES: usize = 3;
pub const NUM_FEATURES: usize = 9; // acc(3) + body_acc(3) + gyro(3)
pub const NUM_CLASSES: usize = 6;
pub const MODEL_INPUT_LEN: usize = WINDOW_SIZE * NUM_FEATURES; // 1152

pub const SAMPLING_INTERVAL_MS: u64 = 20;
pub const SAMPLING_RATE: f64 = 50.0; // Hz
pub const GRAVITY_CUTOFF: f64 = 0.3; // Hz

pub const SAMPLING_INTERVAL: Duration = Duration::from_millis(SAMPLING_INTERVAL_MS);

/// Intervalo entre inferencias: el tiempo que tardan en llegar las muestras
/// nuevas que reemplazan a las descartadas por `retain_tail` (64 * 20 ms).
pub const INFERENCE_INTERVAL: Duration =
    Duration::from_millis((WINDOW_SIZE - RETAIN_COUNT) as u64 * SAMPLING_INTERVAL_MS);

/// Cadencia fija de 1 s de la primera versión de la app.
pub const LEGACY_INFERENCE_INTERVAL: Duration = Duration::from_millis(1000);

/// Muestra de un sensor de 3 ejes (acelerómetro o giroscopio)
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Sample3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Sample3 {
    pub const ZERO: Sample3 = Sample3 {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

/// Vector de características de un instante: [ax, ay, az, bx, by, bz, gx, gy, gz]
pub type FeatureVector = [f64; NUM_FEATURES];

/// Ventana de WINDOW_SIZE vectores consecutivos (copia, no comparte memoria con el buffer)
pub type Window = Vec<FeatureVector>;

/// Salida cruda del modelo, un valor por clase
pub type ScoreVector = Vec<f32>;

/// Desglose de un FeatureVector tal y como se expone a la capa de presentación
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FeatureFrame {
    pub accel: Sample3,
    pub body_accel: Sample3,
    pub gyro: Sample3,
}

impl FeatureFrame {
    /// Orden fijo: debe coincidir con las estadísticas de normalización y con el modelo
    pub fn to_vector(&self) -> FeatureVector {
        [
            self.accel.x,
            self.accel.y,
            self.accel.z,
            self.body_accel.x,
            self.body_accel.y,
            self.body_accel.z,
            self.gyro.x,
            self.gyro.y,
            self.gyro.z,
        ]
    }

    pub fn from_vector(fv: &FeatureVector) -> Self {
        Self {
            accel: Sample3::new(fv[0], fv[1], fv[2]),
            body_accel: Sample3::new(fv[3], fv[4], fv[5]),
            gyro: Sample3::new(fv[6], fv[7], fv[8]),
        }
    }
}

/// Actividades reconocidas. El orden es el de las salidas del modelo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GestureLabel {
    Walking,
    WalkingUpstairs,
    WalkingDownstairs,
    Sitting,
    Standing,
    Laying,
}

impl GestureLabel {
    pub const ALL: [GestureLabel; NUM_CLASSES] = [
        GestureLabel::Walking,
        GestureLabel::WalkingUpstairs,
        GestureLabel::WalkingDownstairs,
        GestureLabel::Sitting,
        GestureLabel::Standing,
        GestureLabel::Laying,
    ];

    pub fn from_index(idx: usize) -> Option<Self> {
        Self::ALL.get(idx).copied()
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            GestureLabel::Walking => "WALKING",
            GestureLabel::WalkingUpstairs => "WALKING_UPSTAIRS",
            GestureLabel::WalkingDownstairs => "WALKING_DOWNSTAIRS",
            GestureLabel::Sitting => "SITTING",
            GestureLabel::Standing => "STANDING",
            GestureLabel::Laying => "LAYING",
        }
    }
}

impl fmt::Display for GestureLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for GestureLabel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|label| label.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| format!("actividad desconocida: {:?}", s))
    }
}
