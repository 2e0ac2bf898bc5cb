//////////////////////////////////////////////////////////////////////////////
//
// Take off, hover for longer than the drone's 15s command watchdog and land
//
// Without the keep-alive the drone would land by itself while hovering.
//
//////////////////////////////////////////////////////////////////////////////

extern crate tello_control;

use std::time::Duration;

use tokio::time::sleep;
use tello_control::{Tello, Result};

#[tokio::main]
async fn main() {
    env_logger::init();
    take_off_and_land().await.unwrap();
}

async fn take_off_and_land() -> Result<()> {
    let drone = Tello::new()
        .wait_for_wifi().await?;

    let drone = drone.connect().await?;
    println!("connected to a {:?} Tello", drone.state().model());

    drone.start_keep_alive();

    drone.take_off().await?;
    sleep(Duration::from_secs(20)).await;

    if drone.state().is_connected() {
        drone.land().await?;
    } else {
        println!("keep-alive lost the drone, it lands by itself");
    }

    drone.disconnect().await;

    Ok(())
}
