//! Position/orientation sinks
//!
//! A sink is whatever applies a decoded record to vehicle state. Inside the
//! simulator that means writing data references; here it is a trait so the
//! host, a console printer or a test can stand behind it.

use crate::record::{Attitude, TelemetryRecord};
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

/// Capability to apply attitude and position to a vehicle
pub trait PositionSink: Send {
    /// Apply Euler angles, in degrees
    fn apply_orientation(&mut self, theta: f32, phi: f32, psi: f32);

    /// Apply geodetic position: degrees, degrees, meters
    fn apply_position(&mut self, latitude_deg: f64, longitude_deg: f64, altitude_m: f64);

    /// Apply a whole record: orientation first, then position
    fn apply(&mut self, record: &TelemetryRecord) {
        let Attitude { theta, phi, psi } = record.attitude_f32();
        self.apply_orientation(theta, phi, psi);
        self.apply_position(record.latitude_deg, record.longitude_deg, record.altitude_m);
    }
}

// =============================================================================
// Shared state sink
// =============================================================================

/// Last values written through a [`SharedStateSink`]
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct AppliedState {
    pub theta: f32,
    pub phi: f32,
    pub psi: f32,
    pub latitude_deg: f64,
    pub longitude_deg: f64,
    pub altitude_m: f64,
    /// Number of records applied so far
    pub updates: u64,
}

/// Sink that keeps the latest applied state behind a shared lock
///
/// Clones share the same state, so one clone can be handed to a listener
/// while another is read elsewhere.
#[derive(Debug, Clone, Default)]
pub struct SharedStateSink {
    state: Arc<RwLock<AppliedState>>,
}

impl SharedStateSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> AppliedState {
        *self.state.read()
    }
}

impl PositionSink for SharedStateSink {
    fn apply_orientation(&mut self, theta: f32, phi: f32, psi: f32) {
        let mut state = self.state.write();
        state.theta = theta;
        state.phi = phi;
        state.psi = psi;
    }

    fn apply_position(&mut self, latitude_deg: f64, longitude_deg: f64, altitude_m: f64) {
        let mut state = self.state.write();
        state.latitude_deg = latitude_deg;
        state.longitude_deg = longitude_deg;
        state.altitude_m = altitude_m;
        state.updates += 1;
    }

    /// Apply both halves under one write guard so readers never see a mix
    /// of old and new values
    fn apply(&mut self, record: &TelemetryRecord) {
        let Attitude { theta, phi, psi } = record.attitude_f32();
        let mut state = self.state.write();
        state.theta = theta;
        state.phi = phi;
        state.psi = psi;
        state.latitude_deg = record.latitude_deg;
        state.longitude_deg = record.longitude_deg;
        state.altitude_m = record.altitude_m;
        state.updates += 1;
    }
}

// =============================================================================
// Log sink
// =============================================================================

/// Sink that reports every applied record through `tracing`
#[derive(Debug, Default)]
pub struct LogSink;

impl PositionSink for LogSink {
    fn apply_orientation(&mut self, theta: f32, phi: f32, psi: f32) {
        info!(theta, phi, psi, "orientation");
    }

    fn apply_position(&mut self, latitude_deg: f64, longitude_deg: f64, altitude_m: f64) {
        info!(latitude_deg, longitude_deg, altitude_m, "position");
    }
}
