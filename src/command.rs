use std::fmt;

use tokio::sync::mpsc;

/// Command mnemonics understood by the drone firmware (SDK 1.3 / 2.0).
pub mod mnemonic {
    pub const COMMAND_MODE: &str = "command";
    pub const TAKE_OFF: &str = "takeoff";
    pub const LAND: &str = "land";
    pub const STREAM_ON: &str = "streamon";
    pub const STREAM_OFF: &str = "streamoff";
    /// Stops the motors immediately.
    pub const EMERGENCY: &str = "emergency";
    /// Hover in place, works at any time.
    pub const STOP: &str = "stop";

    pub const UP: &str = "up";
    pub const DOWN: &str = "down";
    pub const LEFT: &str = "left";
    pub const RIGHT: &str = "right";
    pub const FORWARD: &str = "forward";
    pub const BACK: &str = "back";
    pub const CLOCKWISE: &str = "cw";
    pub const COUNTER_CLOCKWISE: &str = "ccw";
    pub const FLIP: &str = "flip";
    pub const GO: &str = "go";
    pub const CURVE: &str = "curve";
    pub const JUMP: &str = "jump";
    pub const SPEED: &str = "speed";
    pub const REMOTE_CONTROL: &str = "rc";

    pub const MISSION_PADS_ON: &str = "mon";
    pub const MISSION_PADS_OFF: &str = "moff";
    pub const MISSION_PAD_DIRECTION: &str = "mdirection";
    pub const STATION_MODE: &str = "ap";

    pub const READ_SPEED: &str = "speed?";
    pub const READ_BATTERY: &str = "battery?";
    pub const READ_TIME: &str = "time?";
    pub const READ_HEIGHT: &str = "height?";
    pub const READ_TEMPERATURE: &str = "temp?";
    pub const READ_ATTITUDE: &str = "attitude?";
    pub const READ_BAROMETER: &str = "baro?";
    pub const READ_ACCELERATION: &str = "acceleration?";
    pub const READ_TOF: &str = "tof?";
    /// EDU only
    pub const READ_SDK: &str = "sdk?";
    /// EDU only
    pub const READ_SERIAL_NUMBER: &str = "sn?";
}

/// A single wire command, composed to the exact text sent in one datagram.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Basic(&'static str),
    Complex { mnemonic: &'static str, parameters: String },
}

impl Command {
    pub fn basic(mnemonic: &'static str) -> Self {
        Command::Basic(mnemonic)
    }

    /// A command with its parameters joined by single spaces.
    pub fn complex<I, P>(mnemonic: &'static str, parameters: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: ToString,
    {
        let parameters = parameters
            .into_iter()
            .map(|p| p.to_string())
            .collect::<Vec<_>>()
            .join(" ");
        Command::Complex { mnemonic, parameters }
    }

    pub fn mnemonic(&self) -> &'static str {
        match self {
            Command::Basic(m) => m,
            Command::Complex { mnemonic, .. } => mnemonic,
        }
    }

    pub fn compose(&self) -> String {
        match self {
            Command::Basic(m) => m.to_string(),
            Command::Complex { mnemonic, parameters } => format!("{mnemonic} {parameters}"),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.compose())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlipDirection {
    Left,
    Right,
    Forward,
    Back,
}

impl FlipDirection {
    pub(crate) fn code(self) -> &'static str {
        match self {
            FlipDirection::Left => "l",
            FlipDirection::Right => "r",
            FlipDirection::Forward => "f",
            FlipDirection::Back => "b",
        }
    }
}

/// Which camera(s) look for mission pads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissionPadCamera {
    Downward,
    Forward,
    Both,
}

impl MissionPadCamera {
    pub(crate) fn code(self) -> u8 {
        match self {
            MissionPadCamera::Downward => 0,
            MissionPadCamera::Forward => 1,
            MissionPadCamera::Both => 2,
        }
    }
}

/// Commands that can be streamed to a connected drone from another task or
/// thread, eg a game controller loop or a web control panel.
#[derive(Debug)]
pub enum TelloCommand {
    TakeOff,
    Land,
    StopAndHover,
    EmergencyStop,
    RemoteControl { left_right: i8, forwards_backwards: i8, up_down: i8, yaw: i8 },
    FlipLeft,
    FlipRight,
    FlipForward,
    FlipBack
}

pub type TelloCommandSender = mpsc::UnboundedSender<TelloCommand>;
pub type TelloCommandReceiver = mpsc::UnboundedReceiver<TelloCommand>;

pub fn make_tello_command_channel() -> (TelloCommandSender, TelloCommandReceiver) {
    mpsc::unbounded_channel()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_commands_are_just_the_mnemonic() {
        for m in [mnemonic::LAND, mnemonic::TAKE_OFF, mnemonic::READ_BATTERY, mnemonic::COMMAND_MODE] {
            let c = Command::basic(m);
            assert_eq!(c.compose(), m);
            assert!(!c.compose().ends_with(' '));
        }
    }

    #[test]
    fn complex_commands_join_parameters_with_spaces() {
        assert_eq!(Command::complex(mnemonic::FORWARD, [50]).compose(), "forward 50");
        assert_eq!(Command::complex(mnemonic::REMOTE_CONTROL, [0, -20, 100, 5]).compose(), "rc 0 -20 100 5");
        assert_eq!(Command::complex(mnemonic::STATION_MODE, ["home", "secret"]).compose(), "ap home secret");
        assert_eq!(Command::complex(mnemonic::FLIP, [FlipDirection::Back.code()]).to_string(), "flip b");
    }

    #[test]
    fn mnemonic_is_preserved() {
        let c = Command::complex(mnemonic::CURVE, [20, 20, 0, 40, 60, 0, 30]);
        assert_eq!(c.mnemonic(), "curve");
        assert_eq!(c.compose(), "curve 20 20 0 40 60 0 30");
    }
}
