use std::fmt;
use std::fmt::Display;
use std::ops::RangeInclusive;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use log::{debug, info, warn};

use crate::command::*;
use crate::drone::{Connection, DroneState, SharedDroneState, TelloModel};
use crate::errors::{Result, TelloError};
use crate::executor::CommandExecutor;
use crate::keep_alive::KeepAlive;
use crate::monitor::StatusMonitor;
use crate::options::TelloOptions;
use crate::query;
use crate::state::{Attitude, TelloStateSender, Vector3};
use crate::transport::{Transport, UdpTransport};
use crate::wifi::{wait_for_wifi, TELLO_SSID_PREFIX};

const DISTANCE_RANGE: RangeInclusive<u32> = 20..=500;
const ANGLE_RANGE: RangeInclusive<u32> = 1..=3600;
const SPEED_RANGE: RangeInclusive<u32> = 10..=100;
const CURVE_SPEED_RANGE: RangeInclusive<u32> = 10..=60;
const COORDINATE_RANGE: RangeInclusive<i32> = -500..=500;
const MISSION_PAD_RANGE: RangeInclusive<u8> = 1..=8;
const RC_RANGE: RangeInclusive<i8> = -100..=100;

// states
#[derive(Debug)]
pub struct NoWifi;

#[derive(Debug)]
pub struct Disconnected;

pub struct Connected {
    transport: Arc<dyn Transport>,
    executor: Arc<CommandExecutor>,
    keep_alive_interval: Duration,
    crash_threshold: Duration,
    stop_grace: Duration,
    state_sender: Option<TelloStateSender>,
    command_receiver: Mutex<Option<TelloCommandReceiver>>,
    monitor: Mutex<Option<StatusMonitor>>,
    keep_alive: Mutex<Option<KeepAlive>>,
}

impl fmt::Debug for Connected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connected")
            .field("timeout", &self.transport.timeout())
            .field("keep_alive_interval", &self.keep_alive_interval)
            .field("crash_threshold", &self.crash_threshold)
            .finish_non_exhaustive()
    }
}

/// A Tello drone. The type parameter tracks how far along the connection is,
/// the drone state is shared by all of them.
#[derive(Debug)]
pub struct Tello<S = NoWifi> {
    state: S,
    drone: SharedDroneState,
}

impl Default for Tello<NoWifi> {
    fn default() -> Self {
        Self::new()
    }
}

impl Tello<NoWifi> {
    pub fn new() -> Self {
        Self { state: NoWifi, drone: SharedDroneState::new() }
    }

    /// Waits until this machine has joined the drone's own WiFi network.
    pub async fn wait_for_wifi(&self) -> Result<Tello<Disconnected>>  {
        info!("[Tello] waiting for WiFi...");
        wait_for_wifi(TELLO_SSID_PREFIX).await?;
        Ok(Tello { state: Disconnected, drone: self.drone.clone() })
    }

    /// Skips the WiFi check, eg when the drone is in station mode.
    pub fn assume_wifi(&self) -> Tello<Disconnected> {
        Tello { state: Disconnected, drone: self.drone.clone() }
    }
}

impl Tello<Disconnected> {
    pub async fn connect(&self) -> Result<Tello<Connected>> {
        self.connect_with(TelloOptions::default()).await
    }

    /// Opens the sockets and puts the drone in command mode.
    pub async fn connect_with(&self, options: TelloOptions) -> Result<Tello<Connected>> {
        let transport = UdpTransport::connect(&options).await?;
        let drone = self.attach(Arc::new(transport), options);

        info!("[Tello] putting drone in command mode...");
        if let Err(err) = drone.enter_command_mode().await {
            drone.disconnect().await;
            return Err(err);
        }

        Ok(drone)
    }

    /// Uses an already connected transport, eg one talking to a simulator.
    pub fn attach(&self, transport: Arc<dyn Transport>, options: TelloOptions) -> Tello<Connected> {
        self.drone.set_connection(Connection::Connected);

        let executor = Arc::new(CommandExecutor::new(transport.clone()));
        let state = Connected {
            transport,
            executor,
            keep_alive_interval: options.keep_alive_interval,
            crash_threshold: options.crash_threshold,
            stop_grace: options.stop_grace,
            state_sender: options.state_sender,
            command_receiver: Mutex::new(options.command_receiver),
            monitor: Mutex::new(None),
            keep_alive: Mutex::new(None),
        };

        Tello { state, drone: self.drone.clone() }
    }
}

impl<S> Tello<S> {
    /// The live drone state, shared with the background tasks.
    pub fn state(&self) -> &SharedDroneState {
        &self.drone
    }

    pub fn drone_state(&self) -> DroneState {
        self.drone.snapshot()
    }

    pub fn connection(&self) -> Connection {
        self.drone.connection()
    }
}

impl Tello<Connected> {
    async fn send(&self, command: Command) -> Result<()> {
        self.state.executor.execute(&command).await
    }

    async fn read(&self, mnemonic: &'static str) -> Result<String> {
        self.state.executor.execute_read(&Command::basic(mnemonic)).await
    }

    /// Logs and returns false when the drone is a basic Tello.
    fn requires_edu(&self, what: &str) -> bool {
        if self.drone.model() == TelloModel::Edu {
            true
        } else {
            warn!("[Tello] {what} needs a Tello EDU, skipping");
            false
        }
    }

    pub fn set_timeout(&self, timeout: Duration) {
        self.state.transport.set_timeout(timeout);
    }

    pub fn timeout(&self) -> Duration {
        self.state.transport.timeout()
    }

    //////////////////////////////////////////////////////////////////////////
    // modes

    /// Enters SDK command mode and works out which model the drone is.
    pub async fn enter_command_mode(&self) -> Result<()> {
        self.send(Command::basic(mnemonic::COMMAND_MODE)).await?;

        // only the EDU firmware knows sdk?
        let model = match self.read(mnemonic::READ_SDK).await {
            Ok(sdk) => {
                let sdk = sdk.trim().to_string();
                debug!("[Tello] SDK {sdk}");
                self.drone.update(|s| s.sdk_version = sdk);
                TelloModel::Edu
            }
            Err(err) => {
                debug!("[Tello] sdk? failed ({err}), assuming a basic Tello");
                TelloModel::Basic
            }
        };
        info!("[Tello] model {model:?}");
        self.drone.update(|s| s.model = model);

        Ok(())
    }

    /// Turns mission pad detection on or off. EDU only.
    pub async fn set_mission_mode(&self, enabled: bool, camera: MissionPadCamera) -> Result<()> {
        if !self.requires_edu("mission pad detection") {
            return Ok(());
        }

        if enabled {
            self.send(Command::basic(mnemonic::MISSION_PADS_ON)).await?;
            self.send(Command::complex(mnemonic::MISSION_PAD_DIRECTION, [camera.code()])).await?;
        } else {
            self.send(Command::basic(mnemonic::MISSION_PADS_OFF)).await?;
        }
        self.drone.update(|s| s.mission_mode = enabled);
        Ok(())
    }

    /// Makes the drone join the given network instead of running its own
    /// access point. Takes effect after a restart. EDU only.
    pub async fn set_station_mode(&self, ssid: &str, password: &str) -> Result<()> {
        if !self.requires_edu("station mode") {
            return Ok(());
        }
        if ssid.is_empty() || ssid.contains(char::is_whitespace) || password.contains(char::is_whitespace) {
            return Err(TelloError::InvalidParameter { msg: "ssid and password must be non-empty words".to_string() });
        }
        self.send(Command::complex(mnemonic::STATION_MODE, [ssid, password])).await
    }

    pub async fn stream_on(&self) -> Result<()> {
        self.send(Command::basic(mnemonic::STREAM_ON)).await
    }

    pub async fn stream_off(&self) -> Result<()> {
        self.send(Command::basic(mnemonic::STREAM_OFF)).await
    }

    //////////////////////////////////////////////////////////////////////////
    // flight

    pub async fn take_off(&self) -> Result<()> {
        self.send(Command::basic(mnemonic::TAKE_OFF)).await?;
        self.drone.set_flying(true);
        Ok(())
    }

    pub async fn land(&self) -> Result<()> {
        // cleared first so the crash check does not fire while descending
        self.drone.set_flying(false);
        self.send(Command::basic(mnemonic::LAND)).await
    }

    /// Hover in place.
    pub async fn stop(&self) -> Result<()> {
        self.send(Command::basic(mnemonic::STOP)).await
    }

    /// Stops the motors immediately, the drone will drop like a brick.
    pub async fn emergency_stop(&self) -> Result<()> {
        self.drone.set_flying(false);
        self.send(Command::basic(mnemonic::EMERGENCY)).await
    }

    async fn move_by(&self, direction: &'static str, distance: u32) -> Result<()> {
        check_range(direction, distance, DISTANCE_RANGE)?;
        self.send(Command::complex(direction, [distance])).await
    }

    /// 20-500cm
    pub async fn move_up(&self, distance: u32) -> Result<()> {
        self.move_by(mnemonic::UP, distance).await
    }

    pub async fn move_down(&self, distance: u32) -> Result<()> {
        self.move_by(mnemonic::DOWN, distance).await
    }

    pub async fn move_left(&self, distance: u32) -> Result<()> {
        self.move_by(mnemonic::LEFT, distance).await
    }

    pub async fn move_right(&self, distance: u32) -> Result<()> {
        self.move_by(mnemonic::RIGHT, distance).await
    }

    pub async fn move_forward(&self, distance: u32) -> Result<()> {
        self.move_by(mnemonic::FORWARD, distance).await
    }

    pub async fn move_back(&self, distance: u32) -> Result<()> {
        self.move_by(mnemonic::BACK, distance).await
    }

    /// 1-3600°
    pub async fn turn_clockwise(&self, angle: u32) -> Result<()> {
        check_range("angle", angle, ANGLE_RANGE)?;
        self.send(Command::complex(mnemonic::CLOCKWISE, [angle])).await
    }

    pub async fn turn_counterclockwise(&self, angle: u32) -> Result<()> {
        check_range("angle", angle, ANGLE_RANGE)?;
        self.send(Command::complex(mnemonic::COUNTER_CLOCKWISE, [angle])).await
    }

    pub async fn flip(&self, direction: FlipDirection) -> Result<()> {
        self.send(Command::complex(mnemonic::FLIP, [direction.code()])).await
    }

    pub async fn flip_left(&self) -> Result<()> {
        self.flip(FlipDirection::Left).await
    }

    pub async fn flip_right(&self) -> Result<()> {
        self.flip(FlipDirection::Right).await
    }

    pub async fn flip_forward(&self) -> Result<()> {
        self.flip(FlipDirection::Forward).await
    }

    pub async fn flip_back(&self) -> Result<()> {
        self.flip(FlipDirection::Back).await
    }

    /// 10-100cm/s
    pub async fn set_speed(&self, speed: u32) -> Result<()> {
        check_range("speed", speed, SPEED_RANGE)?;
        self.send(Command::complex(mnemonic::SPEED, [speed])).await
    }

    /// Flies to an offset from the current position.
    pub async fn go_to(&self, x: i32, y: i32, z: i32, speed: u32) -> Result<()> {
        check_coordinates(&[x, y, z])?;
        check_range("speed", speed, SPEED_RANGE)?;
        self.send(Command::complex(mnemonic::GO, [x, y, z, speed as i32])).await
    }

    /// Flies an arc through the first offset to the second.
    #[allow(clippy::too_many_arguments)]
    pub async fn curve(&self, x1: i32, y1: i32, z1: i32, x2: i32, y2: i32, z2: i32, speed: u32) -> Result<()> {
        check_coordinates(&[x1, y1, z1, x2, y2, z2])?;
        check_range("curve speed", speed, CURVE_SPEED_RANGE)?;
        self.send(Command::complex(mnemonic::CURVE, [x1, y1, z1, x2, y2, z2, speed as i32])).await
    }

    /// Flies to a position relative to mission pad `pad` (1-8). EDU only.
    pub async fn go_to_mission_pad(&self, x: i32, y: i32, z: i32, speed: u32, pad: u8) -> Result<()> {
        if !self.requires_edu("go to mission pad") {
            return Ok(());
        }
        check_coordinates(&[x, y, z])?;
        check_range("speed", speed, SPEED_RANGE)?;
        check_range("mission pad", pad, MISSION_PAD_RANGE)?;
        let params = [x.to_string(), y.to_string(), z.to_string(), speed.to_string(), format!("m{pad}")];
        self.send(Command::complex(mnemonic::GO, params)).await
    }

    /// Flies an arc in the coordinates of mission pad `pad`. EDU only.
    #[allow(clippy::too_many_arguments)]
    pub async fn curve_mission_pad(
        &self, x1: i32, y1: i32, z1: i32, x2: i32, y2: i32, z2: i32, speed: u32, pad: u8,
    ) -> Result<()> {
        if !self.requires_edu("curve over mission pad") {
            return Ok(());
        }
        check_coordinates(&[x1, y1, z1, x2, y2, z2])?;
        check_range("curve speed", speed, CURVE_SPEED_RANGE)?;
        check_range("mission pad", pad, MISSION_PAD_RANGE)?;
        let mut params: Vec<String> = [x1, y1, z1, x2, y2, z2].iter().map(|c| c.to_string()).collect();
        params.push(speed.to_string());
        params.push(format!("m{pad}"));
        self.send(Command::complex(mnemonic::CURVE, params)).await
    }

    /// Flies to a position relative to mission pad `from`, then finds pad
    /// `to` and turns to `yaw`. EDU only.
    #[allow(clippy::too_many_arguments)]
    pub async fn jump(&self, x: i32, y: i32, z: i32, speed: u32, yaw: i32, from: u8, to: u8) -> Result<()> {
        if !self.requires_edu("jump") {
            return Ok(());
        }
        check_coordinates(&[x, y, z])?;
        check_range("speed", speed, SPEED_RANGE)?;
        check_range("mission pad", from, MISSION_PAD_RANGE)?;
        check_range("mission pad", to, MISSION_PAD_RANGE)?;
        let params = [
            x.to_string(), y.to_string(), z.to_string(), speed.to_string(), yaw.to_string(),
            format!("m{from}"), format!("m{to}"),
        ];
        self.send(Command::complex(mnemonic::JUMP, params)).await
    }

    /// Sets the four remote control channels, each -100 to 100.
    ///
    /// Does not wait for a response so it can be called from a control loop
    /// at ~10Hz.
    pub async fn remote_control(&self, left_right: i8, forwards_backwards: i8, up_down: i8, yaw: i8) -> Result<()> {
        let clamp = |v: i8| v.clamp(*RC_RANGE.start(), *RC_RANGE.end());
        let command = Command::complex(
            mnemonic::REMOTE_CONTROL,
            [clamp(left_right), clamp(forwards_backwards), clamp(up_down), clamp(yaw)],
        );
        self.state.executor.execute_no_wait(&command).await
    }

    //////////////////////////////////////////////////////////////////////////
    // reads, each asks the drone and updates the drone state

    /// %
    pub async fn read_battery(&self) -> Result<u8> {
        let battery = query::battery(&self.read(mnemonic::READ_BATTERY).await?)?;
        self.drone.update(|s| s.battery = battery);
        Ok(battery)
    }

    /// cm/s
    pub async fn read_speed(&self) -> Result<i32> {
        let speed = query::speed(&self.read(mnemonic::READ_SPEED).await?)?;
        self.drone.update(|s| s.speed = speed);
        Ok(speed)
    }

    /// Motor time, s
    pub async fn read_flight_time(&self) -> Result<i32> {
        let time = query::flight_time(&self.read(mnemonic::READ_TIME).await?)?;
        self.drone.update(|s| s.flight_time = time);
        Ok(time)
    }

    /// cm
    pub async fn read_height(&self) -> Result<i32> {
        let height = query::height(&self.read(mnemonic::READ_HEIGHT).await?)?;
        self.drone.update(|s| s.height = height);
        Ok(height)
    }

    /// °C
    pub async fn read_temperature(&self) -> Result<i32> {
        let temperature = query::temperature(&self.read(mnemonic::READ_TEMPERATURE).await?)?;
        self.drone.update(|s| s.temperature_low = temperature);
        Ok(temperature)
    }

    pub async fn read_barometer(&self) -> Result<f64> {
        let barometer = query::barometer(&self.read(mnemonic::READ_BAROMETER).await?)?;
        self.drone.update(|s| s.barometer = barometer);
        Ok(barometer)
    }

    /// Distance to the ground from the time of flight sensor, cm
    pub async fn read_time_of_flight(&self) -> Result<f64> {
        let tof = query::time_of_flight(&self.read(mnemonic::READ_TOF).await?)?;
        self.drone.update(|s| s.time_of_flight = tof);
        Ok(tof)
    }

    pub async fn read_attitude(&self) -> Result<Attitude> {
        let attitude = query::attitude(&self.read(mnemonic::READ_ATTITUDE).await?)?;
        self.drone.update(|s| s.set_attitude(attitude));
        Ok(attitude)
    }

    pub async fn read_acceleration(&self) -> Result<Vector3<f64>> {
        let acceleration = query::acceleration(&self.read(mnemonic::READ_ACCELERATION).await?)?;
        self.drone.update(|s| s.acceleration = acceleration);
        Ok(acceleration)
    }

    /// EDU only, empty for a basic Tello.
    pub async fn read_serial_number(&self) -> Result<String> {
        if !self.requires_edu("serial number") {
            return Ok(String::new());
        }
        let sn = self.read(mnemonic::READ_SERIAL_NUMBER).await?.trim().to_string();
        self.drone.update(|s| s.serial_number = sn.clone());
        Ok(sn)
    }

    /// EDU only, empty for a basic Tello.
    pub async fn read_sdk_version(&self) -> Result<String> {
        if !self.requires_edu("SDK version") {
            return Ok(String::new());
        }
        let sdk = self.read(mnemonic::READ_SDK).await?.trim().to_string();
        self.drone.update(|s| s.sdk_version = sdk.clone());
        Ok(sdk)
    }

    //////////////////////////////////////////////////////////////////////////
    // background tasks

    /// Starts merging the drone's telemetry into the drone state. Does nothing
    /// if already running.
    pub fn start_status_monitor(&self) {
        let mut monitor = self.state.monitor.lock().unwrap_or_else(PoisonError::into_inner);
        if monitor.as_ref().is_some_and(|m| m.is_running()) {
            debug!("[State] monitor already running");
            return;
        }
        *monitor = Some(StatusMonitor::start(
            self.state.transport.clone(),
            self.drone.clone(),
            self.state.crash_threshold,
            self.state.state_sender.clone(),
        ));
    }

    pub async fn stop_status_monitor(&self) {
        let monitor = self.state.monitor.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(monitor) = monitor {
            monitor.stop(self.state.stop_grace).await;
        }
    }

    pub fn is_status_monitor_running(&self) -> bool {
        let monitor = self.state.monitor.lock().unwrap_or_else(PoisonError::into_inner);
        monitor.as_ref().is_some_and(|m| m.is_running())
    }

    /// Stops the drone landing itself after 15s without a command.
    pub fn start_keep_alive(&self) {
        let mut keep_alive = self.state.keep_alive.lock().unwrap_or_else(PoisonError::into_inner);
        if keep_alive.as_ref().is_some_and(|k| k.is_running()) {
            debug!("[KeepAlive] already running");
            return;
        }
        *keep_alive = Some(KeepAlive::start(
            self.state.executor.clone(),
            self.drone.clone(),
            self.state.keep_alive_interval,
        ));
    }

    pub async fn stop_keep_alive(&self) {
        let keep_alive = self.state.keep_alive.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(keep_alive) = keep_alive {
            keep_alive.stop(self.state.stop_grace).await;
        }
    }

    pub fn is_keep_alive_running(&self) -> bool {
        let keep_alive = self.state.keep_alive.lock().unwrap_or_else(PoisonError::into_inner);
        keep_alive.as_ref().is_some_and(|k| k.is_running())
    }

    //////////////////////////////////////////////////////////////////////////

    /// Runs commands arriving on the channel from
    /// [`TelloOptions::with_command`] until every sender is dropped.
    ///
    /// Rejected commands are logged and skipped, losing the connection ends
    /// the loop with an error.
    pub async fn handle_commands(&self) -> Result<()> {
        let receiver = self.state.command_receiver.lock().unwrap_or_else(PoisonError::into_inner).take();
        let Some(mut receiver) = receiver else {
            return Err(TelloError::Generic { msg: "no command channel, see TelloOptions::with_command".to_string() });
        };

        while let Some(command) = receiver.recv().await {
            use TelloCommand::*;
            let result = match command {
                TakeOff => self.take_off().await,
                Land => self.land().await,
                StopAndHover => self.stop().await,
                EmergencyStop => self.emergency_stop().await,
                RemoteControl { left_right, forwards_backwards, up_down, yaw } => {
                    self.remote_control(left_right, forwards_backwards, up_down, yaw).await
                }
                FlipLeft => self.flip_left().await,
                FlipRight => self.flip_right().await,
                FlipForward => self.flip_forward().await,
                FlipBack => self.flip_back().await,
            };

            match result {
                Err(err) if err.is_connection_lost() => return Err(err),
                Err(err) => warn!("[Tello] {err}"),
                Ok(()) => {}
            }
        }

        Ok(())
    }

    /// Stops the background tasks, lands if flying and closes the sockets.
    /// Never fails and can be called any number of times.
    pub async fn disconnect(&self) {
        self.stop_status_monitor().await;
        self.stop_keep_alive().await;

        if self.drone.is_flying() {
            info!("[Tello] landing before disconnecting...");
            if let Err(err) = self.land().await {
                warn!("[Tello] land failed: {err}");
            }
        }

        self.state.transport.disconnect();
        self.drone.set_connection(Connection::Disconnected);
    }
}

fn check_range<T: PartialOrd + Display>(what: &str, value: T, range: RangeInclusive<T>) -> Result<()> {
    if range.contains(&value) {
        Ok(())
    } else {
        Err(TelloError::InvalidParameter {
            msg: format!("{what} {value} not in {}..={}", range.start(), range.end()),
        })
    }
}

fn check_coordinates(coordinates: &[i32]) -> Result<()> {
    coordinates
        .iter()
        .try_for_each(|c| check_range("coordinate", *c, COORDINATE_RANGE))
}
