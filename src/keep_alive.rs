use std::sync::Arc;
use std::time::Duration;

use log::{info, trace, warn};
use tokio::sync::oneshot;
use tokio::time::sleep;
use tokio::{spawn, task};

use crate::command::{mnemonic, Command};
use crate::drone::{Connection, SharedDroneState};
use crate::executor::CommandExecutor;
use crate::monitor::join;
use crate::query;

/// Polls the battery level so the drone never goes 15s without a command,
/// after which it lands by itself.
#[derive(Debug)]
pub(crate) struct KeepAlive {
    stop: oneshot::Sender<()>,
    task: task::JoinHandle<()>,
}

impl KeepAlive {
    pub(crate) fn start(executor: Arc<CommandExecutor>, drone: SharedDroneState, interval: Duration) -> Self {
        info!("[KeepAlive] START every {interval:?}");

        let (stop, mut stopped) = oneshot::channel::<()>();
        let task = spawn(async move {
            let battery = Command::basic(mnemonic::READ_BATTERY);
            loop {
                tokio::select! {
                    _ = &mut stopped => return,
                    _ = sleep(interval) => {}
                }

                // a stop while the command is in flight waits for the response
                let level = executor
                    .execute_read(&battery)
                    .await
                    .and_then(|r| query::battery(&r));

                match level {
                    Ok(level) => {
                        trace!("[KeepAlive] battery {level}%");
                        drone.update(|s| s.battery = level);
                    }
                    Err(err) => {
                        warn!("[KeepAlive] keepalive failed: {err}");
                        drone.set_connection(Connection::Disconnected);
                        return;
                    }
                }
            }
        });

        Self { stop, task }
    }

    pub(crate) fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    pub(crate) async fn stop(self, grace: Duration) {
        info!("[KeepAlive] STOP");
        let _ = self.stop.send(());
        join(self.task, grace, "[KeepAlive]").await;
    }
}
