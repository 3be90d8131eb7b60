use serde::{Serialize, Deserialize};

use crate::error::ProbeError;
use crate::position::Position;

#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum CoordinateMode {
    #[default]
    ZeroOffset,
    OffsetTable,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct ProbeParams {
    pub start_position: Position,
    pub xy_clearance: f64,
    pub offset: f64,
    pub depth: f64,
    pub probe_feed_rate: f64,
    pub probe_diameter: f64,
    pub latch_distance: f64,
    pub probe_distance: f64,
    pub fast_probe: String,
    pub slow_probe: String,
    pub rapid_command: String,
    pub touch_plate_height: f64,
    pub workpiece_height: f64,
    // Work coordinate system number for G10 L2 P<n> (1 = G54).
    pub coordinate_system: u32,
    pub coordinate_mode: CoordinateMode,
    pub probe_z: bool,
}

impl Default for ProbeParams {
    fn default() -> Self {
        Self {
            start_position: Position::default(),
            xy_clearance: 5.0,
            offset: 5.0,
            depth: 5.0,
            probe_feed_rate: 100.0,
            probe_diameter: 2.0,
            latch_distance: 1.0,
            probe_distance: 10.0,
            fast_probe: "G91G38.2F200".to_string(),
            slow_probe: "G91G38.2F25".to_string(),
            rapid_command: "G91G0".to_string(),
            touch_plate_height: 0.0,
            workpiece_height: 0.0,
            coordinate_system: 1,
            coordinate_mode: CoordinateMode::ZeroOffset,
            probe_z: false,
        }
    }
}

impl ProbeParams {
    pub fn tip_radius(&self) -> f64 {
        self.probe_diameter / 2.0
    }

    pub fn validate(&self) -> Result<(), ProbeError> {
        let non_negative = [
            ("xy_clearance", self.xy_clearance),
            ("offset", self.offset),
            ("latch_distance", self.latch_distance),
            ("touch_plate_height", self.touch_plate_height),
            ("workpiece_height", self.workpiece_height),
        ];
        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(ProbeError::InvalidParameter(format!("{} must be >= 0, got {}", name, value)));
            }
        }

        let positive = [
            ("depth", self.depth),
            ("probe_feed_rate", self.probe_feed_rate),
            ("probe_diameter", self.probe_diameter),
            ("probe_distance", self.probe_distance),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(ProbeError::InvalidParameter(format!("{} must be > 0, got {}", name, value)));
            }
        }

        if !(1..=9).contains(&self.coordinate_system) {
            return Err(ProbeError::InvalidParameter(format!(
                "coordinate_system must be 1..=9, got {}",
                self.coordinate_system
            )));
        }
        if self.fast_probe.is_empty() || self.slow_probe.is_empty() || self.rapid_command.is_empty() {
            return Err(ProbeError::InvalidParameter("command prefixes must not be empty".to_string()));
        }
        Ok(())
    }
}
