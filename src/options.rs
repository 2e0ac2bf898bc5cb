use std::time::Duration;

use crate::state::*;
use crate::command::*;

pub const DEFAULT_DRONE_HOST: &str = "192.168.10.1";

pub const CONTROL_UDP_PORT: u16 = 8889;
pub const STATE_UDP_PORT: u16 = 8890;
/// Raw h264 video arrives here after `streamon`. Only consumed by external
/// video code, listed so the port allocation is complete.
pub const VIDEO_UDP_PORT: u16 = 11111;

/// Tello drone connection and other usage options.
#[derive(Debug)]
pub struct TelloOptions {
    pub(crate) drone_host: String,
    pub(crate) control_port: u16,
    pub(crate) local_control_port: u16,
    pub(crate) state_port: u16,
    pub(crate) response_timeout: Duration,
    pub(crate) connect_attempts: u32,
    pub(crate) connect_retry_delay: Duration,
    pub(crate) keep_alive_interval: Duration,
    pub(crate) crash_threshold: Duration,
    pub(crate) stop_grace: Duration,
    pub(crate) state_sender: Option<TelloStateSender>,
    pub(crate) command_receiver: Option<TelloCommandReceiver>
}

impl Default for TelloOptions {
    fn default() -> Self {
        Self {
            drone_host: DEFAULT_DRONE_HOST.to_string(),
            control_port: CONTROL_UDP_PORT,
            local_control_port: CONTROL_UDP_PORT,
            state_port: STATE_UDP_PORT,
            response_timeout: Duration::from_secs(10),
            connect_attempts: 10,
            connect_retry_delay: Duration::from_millis(100),
            keep_alive_interval: Duration::from_secs(10),
            crash_threshold: Duration::from_millis(1000),
            stop_grace: Duration::from_secs(2),
            state_sender: None,
            command_receiver: None,
        }
    }
}

impl TelloOptions {
    /// Request state updates from the drone.
    ///
    /// *nb* As messages are sent to the UDP broadcast address 0.0.0.0 this
    /// only works in AP mode, ie using the drone's own WiFi network
    ///
    /// Returns the receiver end of the channel used to pass on every parsed
    /// telemetry record, once the status monitor is started.
    ///
    pub fn with_state(&mut self) -> TelloStateReceiver  {
        let (tx, rx) = make_tello_state_channel();
        self.state_sender = Some(tx);
        rx
    }

    /// Returns the sender end of a channel for issuing commands to the
    /// drone, eg for a remote control application.
    ///
    pub fn with_command(&mut self) -> TelloCommandSender {
        let (tx, rx) = make_tello_command_channel();
        self.command_receiver = Some(rx);
        tx
    }

    /// Drone address, eg when it has joined another network in station mode.
    pub fn with_host(mut self, host: &str) -> Self {
        self.drone_host = host.to_string();
        self
    }

    /// The drone's command port.
    pub fn with_control_port(mut self, port: u16) -> Self {
        self.control_port = port;
        self
    }

    /// Local ports the command and state sockets bind to, 0 for any free port.
    /// The drone pushes its state to 8890 so only change that when talking to
    /// a simulator.
    pub fn with_local_ports(mut self, control_port: u16, state_port: u16) -> Self {
        self.local_control_port = control_port;
        self.state_port = state_port;
        self
    }

    /// How long to wait for a command response or a telemetry datagram.
    pub fn with_response_timeout(mut self, timeout: Duration) -> Self {
        self.response_timeout = timeout;
        self
    }

    /// The drone lands by itself after 15s without a command, so keep this
    /// comfortably below that.
    pub fn with_keep_alive_interval(mut self, interval: Duration) -> Self {
        self.keep_alive_interval = interval;
        self
    }

    /// How long a zero height reading must persist while flying before it is
    /// treated as a crash.
    pub fn with_crash_threshold(mut self, threshold: Duration) -> Self {
        self.crash_threshold = threshold;
        self
    }

    pub fn with_stop_grace(mut self, grace: Duration) -> Self {
        self.stop_grace = grace;
        self
    }

    pub(crate) fn drone_address(&self) -> String {
        format!("{}:{}", self.drone_host, self.control_port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_drone_firmware() {
        let options = TelloOptions::default();
        assert_eq!(options.drone_address(), "192.168.10.1:8889");
        assert_eq!(options.state_port, 8890);
        assert_eq!(options.crash_threshold, Duration::from_millis(1000));
        assert!(options.keep_alive_interval < Duration::from_secs(15));
    }

    #[test]
    fn builders_override_defaults() {
        let mut options = TelloOptions::default()
            .with_host("10.0.0.7")
            .with_control_port(9000)
            .with_local_ports(0, 9001)
            .with_crash_threshold(Duration::from_millis(250));
        let _rx = options.with_state();

        assert_eq!(options.drone_address(), "10.0.0.7:9000");
        assert_eq!(options.local_control_port, 0);
        assert_eq!(options.state_port, 9001);
        assert_eq!(options.crash_threshold, Duration::from_millis(250));
        assert!(options.state_sender.is_some());
        assert!(options.command_receiver.is_none());
    }
}
