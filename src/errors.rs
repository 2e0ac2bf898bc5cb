use std::time::Duration;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, TelloError>;

#[derive(Error, Debug)]
pub enum TelloError {
    #[error("connection error: {msg}")]
    ConnectionError { msg: String },

    #[error("I/O error")]
    IOError(#[from] std::io::Error),

    #[error("no response within {0:?}")]
    Timeout(Duration),

    #[error("unknown command: {command}")]
    UnknownCommand { command: String },

    #[error("invalid parameter: {msg}")]
    InvalidParameter { msg: String },

    #[error("command failed: {command} → {response}")]
    CommandFailed { command: String, response: String },

    #[error("parse error: {msg}")]
    ParseError { msg: String },

    #[error("invalid UTF-8")]
    FromUtf8Error(#[from] std::string::FromUtf8Error),

    #[error("WiFi not connected")]
    WiFiNotConnected,

    #[error("{msg}")]
    Generic { msg: String },
}

impl TelloError {
    /// True when contact with the drone was lost, as opposed to the drone
    /// answering and rejecting the command.
    pub fn is_connection_lost(&self) -> bool {
        matches!(
            self,
            TelloError::ConnectionError { .. } | TelloError::IOError(_) | TelloError::Timeout(_)
        )
    }

    pub(crate) fn connection(msg: impl Into<String>) -> Self {
        TelloError::ConnectionError { msg: msg.into() }
    }

    pub(crate) fn parse(msg: impl Into<String>) -> Self {
        TelloError::ParseError { msg: msg.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lost_contact_is_distinguished_from_rejection() {
        assert!(TelloError::connection("gone").is_connection_lost());
        assert!(TelloError::Timeout(Duration::from_secs(10)).is_connection_lost());
        assert!(TelloError::IOError(std::io::ErrorKind::BrokenPipe.into()).is_connection_lost());

        assert!(!TelloError::UnknownCommand { command: "foo".into() }.is_connection_lost());
        assert!(!TelloError::CommandFailed { command: "takeoff".into(), response: "error".into() }.is_connection_lost());
    }
}
