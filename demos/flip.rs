extern crate tello_control;

use log::warn;
use tello_control::{FlipDirection, Tello, TelloError, Result};

// the drone refuses to flip below this
const MIN_BATTERY: u8 = 50;

#[tokio::main]
async fn main() {
    env_logger::init();
    fly().await.unwrap();
}

async fn fly() -> Result<()> {
    let drone = Tello::new()
        .wait_for_wifi().await?;

    let drone = drone.connect().await?;

    let battery = drone.read_battery().await?;
    if battery < MIN_BATTERY {
        println!("battery at {battery}%, flips need at least {MIN_BATTERY}%");
        drone.disconnect().await;
        return Ok(());
    }

    drone.take_off().await?;

    for direction in [FlipDirection::Left, FlipDirection::Right, FlipDirection::Forward, FlipDirection::Back] {
        match drone.flip(direction).await {
            Ok(()) => {}
            // eg "error: No valid imu" when too low, keep going
            Err(TelloError::CommandFailed { response, .. }) => warn!("flip {direction:?} refused: {response}"),
            Err(err) => {
                drone.disconnect().await;
                return Err(err);
            }
        }
    }

    drone.land().await?;
    drone.disconnect().await;

    Ok(())
}
