extern crate tello_control;

use tello_control::{TelloOptions, Tello, Result};

#[tokio::main]
async fn main() {
    env_logger::init();
    fly().await.unwrap();
}

async fn fly() -> Result<()> {
    let drone = Tello::new()
        .wait_for_wifi().await?;

    let mut options = TelloOptions::default();
    let mut state_rx = options.with_state();

    tokio::spawn(async move {
        while let Some(state) = state_rx.recv().await {
            println!("STATE {state:#?}");
        }
    });

    let drone = drone.connect_with(options).await?;
    drone.start_status_monitor();
    drone.start_keep_alive();

    println!("battery {}%", drone.read_battery().await?);
    println!("temperature {}°C", drone.read_temperature().await?);
    println!("serial number {:?}", drone.read_serial_number().await?);

    drone.take_off().await?;
    drone.turn_clockwise(360).await?;
    println!("heading {}°", drone.state().heading());
    drone.land().await?;

    println!("{:#?}", drone.drone_state());

    drone.disconnect().await;

    Ok(())
}
