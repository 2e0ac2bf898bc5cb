use std::sync::{Arc, PoisonError, RwLock};

use crate::state::{Attitude, TelloState, Vector3};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Connection {
    #[default]
    Disconnected,
    Connected,
}

/// The Tello EDU understands the SDK 2.0 extras (mission pads, station mode,
/// serial number...), the basic Tello does not.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum TelloModel {
    #[default]
    Basic,
    Edu,
}

/// Everything last known about the drone.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct DroneState {
    /// %
    pub battery: u8,
    /// cm/s
    pub speed: i32,
    /// motor time, s
    pub flight_time: i32,
    /// cm
    pub height: i32,
    /// °C
    pub temperature_low: i32,
    /// °C
    pub temperature_high: i32,
    pub barometer: f64,
    /// cm
    pub time_of_flight: f64,
    pub serial_number: String,
    pub sdk_version: String,
    pub attitude: Attitude,
    pub acceleration: Vector3<f64>,
    pub velocity: Vector3<f64>,
    pub mission_pad_id: i32,
    pub mission_pad_position: Vector3<i32>,
    pub mission_pad_attitude: Attitude,
    pub mission_mode: bool,
    /// 0..360, relative to the yaw at the first attitude reading
    pub heading: i32,
    pub connection: Connection,
    pub flying: bool,
    pub model: TelloModel,
    heading_zero: Option<i32>,
    yaw_zero: Option<i32>,
}

impl DroneState {
    pub fn is_connected(&self) -> bool {
        self.connection == Connection::Connected
    }

    pub fn set_attitude(&mut self, attitude: Attitude) {
        self.attitude = attitude;
        let zero = *self.heading_zero.get_or_insert(attitude.yaw);
        self.yaw_zero.get_or_insert(attitude.yaw);
        self.heading = heading(attitude.yaw, zero);
    }

    /// Yaw relative to the last yaw zero.
    pub fn yaw(&self) -> i32 {
        self.attitude.yaw - self.yaw_zero.unwrap_or(0)
    }

    /// The current heading becomes 0.
    pub fn reset_heading_zero(&mut self) {
        self.heading_zero = Some(self.attitude.yaw);
        self.heading = 0;
    }

    pub fn reset_yaw_zero(&mut self) {
        self.yaw_zero = Some(self.attitude.yaw);
    }

    /// The next attitude reading sets the heading zero.
    pub(crate) fn forget_heading_zero(&mut self) {
        self.heading_zero = None;
    }

    /// Merges a telemetry record, keeping the previous value of anything the
    /// record lacks.
    pub fn apply(&mut self, t: &TelloState) {
        if let Some(v) = t.battery {
            self.battery = v;
        }
        if let Some(v) = t.flight_time {
            self.flight_time = v;
        }
        if let Some(v) = t.temperature_low {
            self.temperature_low = v;
        }
        if let Some(v) = t.temperature_high {
            self.temperature_high = v;
        }
        if let Some(v) = t.time_of_flight {
            self.time_of_flight = v as f64;
        }
        if let Some(v) = t.height {
            self.height = v;
        }
        if let Some(v) = t.barometer {
            self.barometer = v;
        }
        if let Some(v) = t.mission_pad_id {
            self.mission_pad_id = v;
        }
        if let Some(v) = t.mission_pad_attitude {
            self.mission_pad_attitude = v;
        }

        if let Some(v) = t.attitude() {
            self.set_attitude(v);
        }
        if let Some(v) = t.acceleration.complete() {
            self.acceleration = v;
        }
        if let Some(v) = t.velocity.complete() {
            self.velocity = v;
        }
        if let Some(v) = t.mission_pad_position.complete() {
            self.mission_pad_position = v;
        }
    }
}

fn heading(yaw: i32, zero: i32) -> i32 {
    (yaw - zero).rem_euclid(360)
}

/// Lock guarded drone state, shared between the caller and the background
/// tasks. Cheap to clone.
#[derive(Debug, Clone, Default)]
pub struct SharedDroneState {
    inner: Arc<RwLock<DroneState>>,
}

impl SharedDroneState {
    pub fn new() -> Self {
        Self::default()
    }

    /// A copy of the whole record.
    pub fn snapshot(&self) -> DroneState {
        self.read(|s| s.clone())
    }

    pub fn read<R>(&self, f: impl FnOnce(&DroneState) -> R) -> R {
        let state = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        f(&state)
    }

    pub fn update<R>(&self, f: impl FnOnce(&mut DroneState) -> R) -> R {
        let mut state = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut state)
    }

    pub fn connection(&self) -> Connection {
        self.read(|s| s.connection)
    }

    pub fn is_connected(&self) -> bool {
        self.read(|s| s.is_connected())
    }

    pub fn is_flying(&self) -> bool {
        self.read(|s| s.flying)
    }

    pub fn model(&self) -> TelloModel {
        self.read(|s| s.model)
    }

    pub fn heading(&self) -> i32 {
        self.read(|s| s.heading)
    }

    pub(crate) fn set_connection(&self, connection: Connection) {
        self.update(|s| s.connection = connection);
    }

    pub(crate) fn set_flying(&self, flying: bool) {
        self.update(|s| s.flying = flying);
    }
}
