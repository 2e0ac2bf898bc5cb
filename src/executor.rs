use std::sync::Arc;

use log::{debug, trace};
use tokio::sync::Mutex;

use crate::command::{mnemonic, Command};
use crate::errors::{Result, TelloError};
use crate::transport::Transport;

/// What a command response means.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    Ok,
    ForcedStop,
    UnknownCommand,
    OutOfRange,
    Error,
    /// Anything else, eg the value returned by a read command.
    Other,
}

impl Response {
    /// Classifies a raw response by its case-insensitive prefix.
    pub fn classify(raw: &str) -> Self {
        let r = raw.trim_start().to_lowercase();
        if r.starts_with("forced stop") {
            Response::ForcedStop
        } else if r.starts_with("unknown command") || r.starts_with("unkown command") {
            // the basic Tello firmware misspells it
            Response::UnknownCommand
        } else if r.starts_with("out of range") {
            Response::OutOfRange
        } else if r.starts_with("error") {
            Response::Error
        } else if r.starts_with("ok") {
            Response::Ok
        } else {
            Response::Other
        }
    }
}

/// Runs commands one at a time over a transport.
pub struct CommandExecutor {
    transport: Arc<dyn Transport>,
    lock: Mutex<()>,
}

impl CommandExecutor {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport, lock: Mutex::new(()) }
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// Sends a command and waits for it to be acknowledged.
    pub async fn execute(&self, command: &Command) -> Result<()> {
        let response = self.exchange(command).await?;

        match Response::classify(&response) {
            Response::Ok | Response::ForcedStop => Ok(()),
            r => Err(rejection(command, r, response)),
        }
    }

    /// Sends a command without waiting for the response, for streams of
    /// `rc` commands where waiting would throttle the control loop.
    pub async fn execute_no_wait(&self, command: &Command) -> Result<()> {
        let msg = command.compose();
        let _guard = self.lock.lock().await;

        trace!("[Tello] SEND {msg}");
        self.transport
            .send(msg.as_bytes())
            .await
            .map_err(|e| connection_lost(command, e))
    }

    /// Sends a read command, eg `battery?`, and returns the raw value.
    pub async fn execute_read(&self, command: &Command) -> Result<String> {
        let response = self.exchange(command).await?;

        match Response::classify(&response) {
            r @ (Response::UnknownCommand | Response::OutOfRange | Response::Error) => {
                Err(rejection(command, r, response))
            }
            _ => Ok(response),
        }
    }

    async fn exchange(&self, command: &Command) -> Result<String> {
        let msg = command.compose();
        let _guard = self.lock.lock().await;

        // the keep-alive polls the battery every few seconds
        if command.mnemonic() == mnemonic::READ_BATTERY {
            trace!("[Tello] SEND {msg}");
        } else {
            debug!("[Tello] SEND {msg}");
        }

        // a late answer to an earlier command would be taken for this one
        self.transport.discard_pending();

        self.transport
            .send(msg.as_bytes())
            .await
            .map_err(|e| connection_lost(command, e))?;

        let response = self
            .transport
            .receive_response()
            .await
            .map_err(|e| connection_lost(command, e))?;

        trace!("[Tello] RECEIVED {}", response.trim());

        Ok(response)
    }
}

fn connection_lost(command: &Command, err: TelloError) -> TelloError {
    match err {
        TelloError::Timeout(_) | TelloError::ConnectionError { .. } => err,
        e => TelloError::connection(format!("{command}: {e}")),
    }
}

fn rejection(command: &Command, response: Response, raw: String) -> TelloError {
    match response {
        Response::UnknownCommand => TelloError::UnknownCommand { command: command.compose() },
        Response::OutOfRange => TelloError::InvalidParameter { msg: format!("{command} is out of range") },
        _ => TelloError::CommandFailed { command: command.compose(), response: raw.trim().to_string() },
    }
}
