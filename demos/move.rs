extern crate tello_control;

use tello_control::{Tello, Result};

#[tokio::main]
async fn main() {
    env_logger::init();
    fly().await.unwrap();
}

async fn fly() -> Result<()> {
    let drone = Tello::new()
        .wait_for_wifi().await?;

    let drone = drone.connect().await?;

    let result = square(&drone).await;

    // lands if still flying
    drone.disconnect().await;

    result
}

async fn square(drone: &Tello<tello_control::Connected>) -> Result<()> {
    drone.take_off().await?;
    drone.move_up(50).await?;
    drone.move_down(50).await?;
    drone.move_left(50).await?;
    drone.move_right(50).await?;
    drone.move_forward(50).await?;
    drone.move_back(50).await?;
    drone.curve(20, 20, 0, 40, 60, 0, 30).await?;
    drone.go_to(-40, -60, 0, 30).await?;
    drone.land().await?;

    Ok(())
}
