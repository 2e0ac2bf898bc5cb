extern crate tello_control;

use tello_control::{Tello, TelloError, Result};

#[tokio::main]
async fn main() {
    env_logger::init();
    fly().await.unwrap();
}

async fn fly() -> Result<()> {
    let drone = Tello::new()
        .wait_for_wifi().await?;

    let drone = drone.connect().await?;

    // checked locally, nothing is sent
    match drone.set_speed(500).await {
        Err(TelloError::InvalidParameter { msg }) => println!("rejected: {msg}"),
        other => println!("unexpected {other:?}"),
    }

    drone.take_off().await?;

    for speed in [25, 100] {
        drone.set_speed(speed).await?;
        println!("speed {}cm/s", drone.read_speed().await?);
        drone.move_forward(300).await?;
        drone.turn_clockwise(180).await?;
    }

    drone.land().await?;
    drone.disconnect().await;

    Ok(())
}
