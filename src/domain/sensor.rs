use chrono::{DateTime, Utc};
use serde::Deserialize;

const DISTANCE_TOLERANCE_CM: f64 = 10.0;

/// Latest sensor readings, replaced wholesale on every update. A reading that is `None` is unknown,
/// which is not the same as a reading of zero.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct SensorSnapshot {
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub distance: Option<f64>,
    pub distance_expected: Option<f64>,
    #[serde(default)]
    pub movement_detected: bool,
    #[serde(default)]
    pub alarm_active: bool,
    /// Every reading is simulated.
    #[serde(default)]
    pub simulated: bool,
    #[serde(default)]
    pub simulated_temp_humidity: bool,
    #[serde(default)]
    pub simulated_distance: bool,
    #[serde(default)]
    pub simulated_movement: bool,
    pub hardware_available: Option<bool>,
    #[serde(default)]
    pub timestamp: f64,
}

impl SensorSnapshot {
    pub fn temp_humidity_simulated(&self) -> bool {
        self.simulated || self.simulated_temp_humidity
    }

    pub fn distance_simulated(&self) -> bool {
        self.simulated || self.simulated_distance
    }

    pub fn movement_simulated(&self) -> bool {
        self.simulated || self.simulated_movement
    }

    pub fn distance_status(&self) -> Option<DistanceStatus> {
        let (distance, expected) = (self.distance?, self.distance_expected?);

        if (distance - expected).abs() <= DISTANCE_TOLERANCE_CM {
            Some(DistanceStatus::Good)
        } else if distance < expected {
            Some(DistanceStatus::TooClose)
        } else {
            Some(DistanceStatus::TooFar)
        }
    }

    pub fn observed_at(&self) -> Option<DateTime<Utc>> {
        if self.timestamp <= 0.0 {
            return None;
        }

        let seconds = self.timestamp.trunc() as i64;
        let nanos = (self.timestamp.fract() * 1_000_000_000.0) as u32;
        DateTime::from_timestamp(seconds, nanos)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistanceStatus {
    Good,
    TooClose,
    TooFar,
}

impl DistanceStatus {
    pub fn describe(&self) -> &'static str {
        match self {
            DistanceStatus::Good => "Good distance!",
            DistanceStatus::TooClose => "Too close!",
            DistanceStatus::TooFar => "Too far!",
        }
    }
}
