//! Telemetry record: attitude and position of the vehicle
//!
//! One record is carried per datagram, in the fixed field order
//! `phi theta psi latitude longitude altitude`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Attitude (degrees) and position (degrees, meters) of the vehicle
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TelemetryRecord {
    /// Roll angle, degrees
    pub phi_deg: f64,
    /// Pitch angle, degrees
    pub theta_deg: f64,
    /// Heading angle, degrees
    pub psi_deg: f64,
    /// Latitude, degrees
    pub latitude_deg: f64,
    /// Longitude, degrees
    pub longitude_deg: f64,
    /// Altitude above the reference datum, meters
    pub altitude_m: f64,
}

/// Field identifiers, in wire order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Phi,
    Theta,
    Psi,
    Latitude,
    Longitude,
    Altitude,
}

impl Field {
    /// All fields in wire order
    pub const ALL: [Field; 6] = [
        Field::Phi,
        Field::Theta,
        Field::Psi,
        Field::Latitude,
        Field::Longitude,
        Field::Altitude,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Field::Phi => "phi",
            Field::Theta => "theta",
            Field::Psi => "psi",
            Field::Latitude => "latitude",
            Field::Longitude => "longitude",
            Field::Altitude => "altitude",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Attitude narrowed to the precision of the simulator's orientation references
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Attitude {
    pub theta: f32,
    pub phi: f32,
    pub psi: f32,
}

/// Coordinate outside its conventional range
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RangeViolation {
    pub field: Field,
    pub value: f64,
}

impl fmt::Display for RangeViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} out of range: {}", self.field, self.value)
    }
}

impl TelemetryRecord {
    pub fn new(
        phi_deg: f64,
        theta_deg: f64,
        psi_deg: f64,
        latitude_deg: f64,
        longitude_deg: f64,
        altitude_m: f64,
    ) -> Self {
        Self {
            phi_deg,
            theta_deg,
            psi_deg,
            latitude_deg,
            longitude_deg,
            altitude_m,
        }
    }

    /// Build a record from values in wire order
    pub fn from_fields(values: [f64; 6]) -> Self {
        let [phi, theta, psi, lat, lon, alt] = values;
        Self::new(phi, theta, psi, lat, lon, alt)
    }

    /// Values in wire order
    pub fn fields(&self) -> [f64; 6] {
        [
            self.phi_deg,
            self.theta_deg,
            self.psi_deg,
            self.latitude_deg,
            self.longitude_deg,
            self.altitude_m,
        ]
    }

    pub fn get(&self, field: Field) -> f64 {
        match field {
            Field::Phi => self.phi_deg,
            Field::Theta => self.theta_deg,
            Field::Psi => self.psi_deg,
            Field::Latitude => self.latitude_deg,
            Field::Longitude => self.longitude_deg,
            Field::Altitude => self.altitude_m,
        }
    }

    /// Angles as `f32`, the width the simulator stores orientation in
    pub fn attitude_f32(&self) -> Attitude {
        Attitude {
            theta: self.theta_deg as f32,
            phi: self.phi_deg as f32,
            psi: self.psi_deg as f32,
        }
    }

    /// Check latitude/longitude against their conventional bounds
    ///
    /// The codec never calls this; ranges are not part of the wire contract.
    pub fn validate_ranges(&self) -> std::result::Result<(), RangeViolation> {
        if !(-90.0..=90.0).contains(&self.latitude_deg) {
            return Err(RangeViolation {
                field: Field::Latitude,
                value: self.latitude_deg,
            });
        }
        if !(-180.0..=180.0).contains(&self.longitude_deg) {
            return Err(RangeViolation {
                field: Field::Longitude,
                value: self.longitude_deg,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fields_in_wire_order() {
        let r = TelemetryRecord::new(1.0, 2.0, 3.0, 4.0, 5.0, 6.0);
        assert_eq!(r.fields(), [1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(TelemetryRecord::from_fields(r.fields()), r);

        for (field, value) in Field::ALL.iter().zip(r.fields()) {
            assert_eq!(r.get(*field), value);
        }
    }

    #[test]
    fn test_attitude_f32_swaps_to_simulator_order() {
        let r = TelemetryRecord::new(11.5, -10.25, 90.125, 0.0, 0.0, 0.0);
        let a = r.attitude_f32();
        assert_eq!(a.theta, -10.25);
        assert_eq!(a.phi, 11.5);
        assert_eq!(a.psi, 90.125);
    }

    #[test]
    fn test_validate_ranges() {
        let ok = TelemetryRecord::new(0.0, 0.0, 0.0, 47.26, 11.34, -10.0);
        assert!(ok.validate_ranges().is_ok());

        let bad_lat = TelemetryRecord::new(0.0, 0.0, 0.0, 91.0, 0.0, 0.0);
        assert_eq!(bad_lat.validate_ranges().unwrap_err().field, Field::Latitude);

        let bad_lon = TelemetryRecord::new(0.0, 0.0, 0.0, 0.0, -180.5, 0.0);
        assert_eq!(bad_lon.validate_ranges().unwrap_err().field, Field::Longitude);
    }

    #[test]
    fn test_field_display() {
        assert_eq!(Field::Altitude.to_string(), "altitude");
    }
}
