extern crate tello_control;

use tello_control::Tello;

#[tokio::main]
async fn main() {
    env_logger::init();
	println!("Waiting for the drone's WiFi...");
    Tello::new().wait_for_wifi().await.unwrap();
    println!("Joined");
}
