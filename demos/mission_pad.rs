//////////////////////////////////////////////////////////////////////////////
//
// Hop between mission pads 1 and 2 (Tello EDU only)
//
// Put pad 1 under the drone and pad 2 about a metre in front of it.
//
//////////////////////////////////////////////////////////////////////////////

extern crate tello_control;

use tello_control::{Connection, MissionPadCamera, TelloModel, TelloOptions, Tello, Result};

#[tokio::main]
async fn main() {
    env_logger::init();
    fly().await.unwrap();
}

async fn fly() -> Result<()> {
    let drone = Tello::new()
        .wait_for_wifi().await?;

    let drone = drone.connect_with(TelloOptions::default()).await?;

    if drone.state().model() != TelloModel::Edu {
        println!("mission pads need a Tello EDU");
        drone.disconnect().await;
        return Ok(());
    }

    drone.start_status_monitor();
    drone.set_mission_mode(true, MissionPadCamera::Downward).await?;

    drone.take_off().await?;
    drone.go_to_mission_pad(0, 0, 80, 30, 1).await?;
    drone.jump(0, 0, 80, 30, 0, 1, 2).await?;

    let state = drone.drone_state();
    println!("over pad {} at {:?}", state.mission_pad_id, state.mission_pad_position);

    if drone.connection() == Connection::Connected {
        drone.land().await?;
    }

    drone.set_mission_mode(false, MissionPadCamera::Downward).await?;
    drone.disconnect().await;

    Ok(())
}
