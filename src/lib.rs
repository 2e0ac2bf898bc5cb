//! Control a DJI Tello or Tello EDU drone over its UDP text SDK.
//!
//! ```no_run
//! use tello_control::{Tello, Result};
//!
//! async fn fly() -> Result<()> {
//!     let drone = Tello::new()
//!         .wait_for_wifi().await?
//!         .connect().await?;
//!
//!     drone.start_status_monitor();
//!     drone.start_keep_alive();
//!
//!     drone.take_off().await?;
//!     drone.turn_clockwise(360).await?;
//!     drone.land().await?;
//!
//!     drone.disconnect().await;
//!     Ok(())
//! }
//! ```

mod errors;
mod wifi;
mod tello;
mod command;
mod drone;
mod executor;
mod keep_alive;
mod monitor;
mod options;
mod query;
mod state;
mod transport;

pub use errors::{TelloError, Result};
pub use tello::{Tello, NoWifi, Disconnected, Connected};
pub use command::{
    mnemonic, Command, FlipDirection, MissionPadCamera, TelloCommand, TelloCommandSender,
    TelloCommandReceiver, make_tello_command_channel,
};
pub use drone::{Connection, DroneState, SharedDroneState, TelloModel};
pub use executor::{CommandExecutor, Response};
pub use monitor::CrashDetector;
pub use options::{TelloOptions, DEFAULT_DRONE_HOST, CONTROL_UDP_PORT, STATE_UDP_PORT, VIDEO_UDP_PORT};
pub use state::{
    Attitude, TelemetryField, TelloState, TelloStateReceiver, TelloStateSender, Vector3,
    make_tello_state_channel,
};
pub use transport::{Transport, UdpTransport};
