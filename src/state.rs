use log::warn;
use tokio::sync::mpsc;

use crate::errors::{Result, TelloError};

pub type TelloStateSender = mpsc::UnboundedSender<TelloState>;
pub type TelloStateReceiver = mpsc::UnboundedReceiver<TelloState>;

pub fn make_tello_state_channel() -> (TelloStateSender, TelloStateReceiver) {
    mpsc::unbounded_channel()
}

/// One telemetry record as pushed by the drone. Fields missing from the
/// message, or that failed to parse, are `None`.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct TelloState {
    pub battery: Option<u8>,
    pub flight_time: Option<i32>,
    pub temperature_low: Option<i32>,
    pub temperature_high: Option<i32>,
    pub time_of_flight: Option<i32>,
    pub height: Option<i32>,
    pub barometer: Option<f64>,
    pub pitch: Option<i32>,
    pub roll: Option<i32>,
    pub yaw: Option<i32>,
    pub acceleration: Vector3<Option<f64>>,
    pub velocity: Vector3<Option<f64>>,
    pub mission_pad_id: Option<i32>,
    pub mission_pad_position: Vector3<Option<i32>>,
    pub mission_pad_attitude: Option<Attitude>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Vector3<T> {
    pub x: T,
    pub y: T,
    pub z: T
}

impl<T> Vector3<Option<T>> {
    /// All three axes, if all were present.
    pub fn complete(&self) -> Option<Vector3<T>>
    where
        T: Copy,
    {
        Some(Vector3 { x: self.x?, y: self.y?, z: self.z? })
    }
}

/// Pitch, roll and yaw in degrees.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Attitude {
    pub pitch: i32,
    pub roll: i32,
    pub yaw: i32,
}

/// Every telemetry key this crate understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TelemetryField {
    Battery,
    FlightTime,
    TemperatureLow,
    TemperatureHigh,
    TimeOfFlight,
    Height,
    Barometer,
    Pitch,
    Roll,
    Yaw,
    AccelerationX,
    AccelerationY,
    AccelerationZ,
    VelocityX,
    VelocityY,
    VelocityZ,
    MissionPadId,
    MissionPadX,
    MissionPadY,
    MissionPadZ,
    MissionPadAttitude,
}

impl TelemetryField {
    pub fn from_key(key: &str) -> Option<Self> {
        use TelemetryField::*;
        let field = match key {
            "bat" => Battery,
            "time" => FlightTime,
            "templ" => TemperatureLow,
            "temph" => TemperatureHigh,
            "tof" => TimeOfFlight,
            "h" => Height,
            "baro" => Barometer,
            "pitch" => Pitch,
            "roll" => Roll,
            "yaw" => Yaw,
            "agx" => AccelerationX,
            "agy" => AccelerationY,
            "agz" => AccelerationZ,
            "vgx" => VelocityX,
            "vgy" => VelocityY,
            "vgz" => VelocityZ,
            "mid" => MissionPadId,
            "x" => MissionPadX,
            "y" => MissionPadY,
            "z" => MissionPadZ,
            "mpry" => MissionPadAttitude,
            _ => return None,
        };
        Some(field)
    }
}

impl TelloState {
    /// Parses a state string received from the drone.
    ///
    /// Example message:
    /// "mid:-1;x:-100;y:-100;z:-100;mpry:-1,-1,-1;pitch:0;roll:0;yaw:-3;vgx:0;vgy:0;vgz:1;templ:58;temph:60;tof:71;h:50;bat:82;baro:-57.14;time:14;agx:17.00;agy:-4.00;agz:-956.00;"
    ///
    /// Unknown keys are ignored. A malformed entry is logged and skipped,
    /// the rest of the message is still used.
    pub fn from_message(s: &str) -> TelloState {
        let mut state = TelloState::default();

        for f in s.trim().split(';') {
            let f = f.trim();
            if f.is_empty() {
                continue;
            }

            let Some((k, v)) = f.split_once(':') else {
                warn!("[State] skipping malformed entry {f:?}");
                continue;
            };

            let Some(field) = TelemetryField::from_key(k.trim()) else { continue };

            if let Err(err) = state.set(field, v.trim()) {
                warn!("[State] skipping {k}: {err}");
            }
        }

        state
    }

    fn set(&mut self, field: TelemetryField, v: &str) -> Result<()> {
        use TelemetryField::*;
        match field {
            Battery => self.battery = Some(value_as(v)?),
            FlightTime => self.flight_time = Some(value_as(v)?),
            TemperatureLow => self.temperature_low = Some(value_as(v)?),
            TemperatureHigh => self.temperature_high = Some(value_as(v)?),
            TimeOfFlight => self.time_of_flight = Some(value_as(v)?),
            Height => self.height = Some(value_as(v)?),
            Barometer => self.barometer = Some(value_as(v)?),
            Pitch => self.pitch = Some(value_as(v)?),
            Roll => self.roll = Some(value_as(v)?),
            Yaw => self.yaw = Some(value_as(v)?),
            AccelerationX => self.acceleration.x = Some(value_as(v)?),
            AccelerationY => self.acceleration.y = Some(value_as(v)?),
            AccelerationZ => self.acceleration.z = Some(value_as(v)?),
            VelocityX => self.velocity.x = Some(value_as(v)?),
            VelocityY => self.velocity.y = Some(value_as(v)?),
            VelocityZ => self.velocity.z = Some(value_as(v)?),
            MissionPadId => self.mission_pad_id = Some(value_as(v)?),
            MissionPadX => self.mission_pad_position.x = Some(value_as(v)?),
            MissionPadY => self.mission_pad_position.y = Some(value_as(v)?),
            MissionPadZ => self.mission_pad_position.z = Some(value_as(v)?),
            MissionPadAttitude => self.mission_pad_attitude = Some(attitude_triple(v)?),
        }
        Ok(())
    }

    /// Pitch, roll and yaw, if all three were present.
    pub fn attitude(&self) -> Option<Attitude> {
        Some(Attitude { pitch: self.pitch?, roll: self.roll?, yaw: self.yaw? })
    }
}

fn value_as<T: std::str::FromStr>(s: &str) -> Result<T> {
    s.parse::<T>().map_err(|_| TelloError::parse(format!("bad value {s:?}")))
}

fn attitude_triple(s: &str) -> Result<Attitude> {
    let mut i = s.split(',').map(str::trim);
    let mut next = || -> Result<i32> {
        value_as(i.next().ok_or_else(|| TelloError::parse(format!("expected 3 values in {s:?}")))?)
    };
    Ok(Attitude { pitch: next()?, roll: next()?, yaw: next()? })
}
