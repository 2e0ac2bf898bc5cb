//////////////////////////////////////////////////////////////////////////////
//
// Hover with the status monitor and keep-alive running, and cut the motors
// as soon as the connection is lost
//
// Catch the drone, or pick it up, to see the crash detection kick in.
//
//////////////////////////////////////////////////////////////////////////////

extern crate tello_control;

use std::time::Duration;

use log::{info, warn};
use tokio::time::sleep;
use tello_control::{Connection, Tello, TelloOptions, Result};

const HOVER_FOR: Duration = Duration::from_secs(30);
const POLL: Duration = Duration::from_millis(200);

#[tokio::main]
async fn main() {
    env_logger::init();
    fly().await.unwrap();
}

async fn fly() -> Result<()> {
    let drone = Tello::new()
        .wait_for_wifi().await?;

    let options = TelloOptions::default()
        .with_crash_threshold(Duration::from_millis(500));
    let drone = drone.connect_with(options).await?;

    drone.start_status_monitor();
    drone.start_keep_alive();
    drone.take_off().await?;

    let mut hovered = Duration::ZERO;
    while hovered < HOVER_FOR {
        if drone.connection() == Connection::Disconnected {
            warn!("connection lost after {hovered:?}, stopping the motors");
            // warning! this will make the drone drop like a brick
            if let Err(err) = drone.emergency_stop().await {
                warn!("emergency stop not acknowledged: {err}");
            }
            drone.disconnect().await;
            return Ok(());
        }
        sleep(POLL).await;
        hovered += POLL;
    }

    info!("battery at {}%", drone.drone_state().battery);
    drone.land().await?;
    drone.disconnect().await;

    Ok(())
}
