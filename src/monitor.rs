use std::sync::Arc;
use std::time::Duration;

use log::{info, trace, warn};
use tokio::sync::oneshot;
use tokio::time::Instant;
use tokio::{spawn, task};

use crate::drone::{Connection, SharedDroneState};
use crate::state::{TelloState, TelloStateSender};
use crate::transport::Transport;

/// Flags a crash when the drone reports zero height for too long while it is
/// supposed to be flying.
#[derive(Debug)]
pub struct CrashDetector {
    threshold: Duration,
    grounded_since: Option<Instant>,
}

impl CrashDetector {
    pub fn new(threshold: Duration) -> Self {
        Self { threshold, grounded_since: None }
    }

    /// Returns true once `height <= 0` has held continuously, while flying,
    /// for longer than the threshold.
    pub fn observe(&mut self, flying: bool, height: i32, now: Instant) -> bool {
        if flying && height <= 0 {
            let since = *self.grounded_since.get_or_insert(now);
            now.duration_since(since) > self.threshold
        } else {
            self.grounded_since = None;
            false
        }
    }
}

/// Background task merging telemetry into the shared drone state.
#[derive(Debug)]
pub(crate) struct StatusMonitor {
    stop: oneshot::Sender<()>,
    task: task::JoinHandle<()>,
}

impl StatusMonitor {
    pub(crate) fn start(
        transport: Arc<dyn Transport>,
        drone: SharedDroneState,
        crash_threshold: Duration,
        sender: Option<TelloStateSender>,
    ) -> Self {
        info!("[State] START MONITOR");

        drone.update(|s| s.forget_heading_zero());

        let (stop, stopped) = oneshot::channel();
        let task = spawn(run(transport, drone, CrashDetector::new(crash_threshold), sender, stopped));

        Self { stop, task }
    }

    pub(crate) fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Signals the task and waits up to `grace` for it to end.
    pub(crate) async fn stop(self, grace: Duration) {
        info!("[State] STOP MONITOR");
        let _ = self.stop.send(());
        join(self.task, grace, "[State]").await;
    }
}

async fn run(
    transport: Arc<dyn Transport>,
    drone: SharedDroneState,
    mut crash: CrashDetector,
    sender: Option<TelloStateSender>,
    mut stopped: oneshot::Receiver<()>,
) {
    loop {
        let raw = tokio::select! {
            _ = &mut stopped => return,
            r = transport.receive_telemetry() => r,
        };

        let raw = match raw {
            Ok(raw) => raw,
            Err(err) => {
                warn!("[State] status monitor failed: {err}");
                drone.set_connection(Connection::Disconnected);
                return;
            }
        };
        trace!("[State] {}", raw.trim());

        let telemetry = TelloState::from_message(&raw);
        let now = Instant::now();

        let crashed = drone.update(|s| {
            let crashed = match telemetry.height {
                Some(h) => crash.observe(s.flying, h, now),
                None => false,
            };
            if crashed {
                s.connection = Connection::Disconnected;
            } else {
                s.apply(&telemetry);
            }
            crashed
        });

        if crashed {
            warn!("[State] zero height for more than {:?} while flying, assuming a crash", crash.threshold);
            return;
        }

        if let Some(sender) = &sender {
            // nobody listening any more is fine
            let _ = sender.send(telemetry);
        }
    }
}

pub(crate) async fn join(mut task: task::JoinHandle<()>, grace: Duration, prefix: &str) {
    if tokio::time::timeout(grace, &mut task).await.is_err() {
        warn!("{prefix} task did not stop within {grace:?}, aborting");
        task.abort();
    }
}

#[cfg(test)]
mod tests {
    use tokio::time::sleep;

    use super::*;
    use crate::state::make_tello_state_channel;
    use crate::transport::mock::MockTransport;

    const TICK: Duration = Duration::from_millis(100);

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn connected_and_flying() -> SharedDroneState {
        let drone = SharedDroneState::new();
        drone.set_connection(Connection::Connected);
        drone.set_flying(true);
        drone
    }

    #[test]
    fn crash_needs_sustained_zero_height() {
        let t0 = Instant::now();
        let mut crash = CrashDetector::new(ms(1000));

        assert!(!crash.observe(true, 0, t0));
        assert!(!crash.observe(true, 0, t0 + ms(900)));
        assert!(!crash.observe(true, 0, t0 + ms(1000)));
        assert!(crash.observe(true, -1, t0 + ms(1001)));
    }

    #[test]
    fn height_or_landing_resets_the_crash_timer() {
        let t0 = Instant::now();
        let mut crash = CrashDetector::new(ms(1000));

        crash.observe(true, 0, t0);
        assert!(!crash.observe(true, 10, t0 + ms(800)));
        assert!(!crash.observe(true, 0, t0 + ms(900)));
        assert!(!crash.observe(true, 0, t0 + ms(1500)));

        assert!(!crash.observe(false, 0, t0 + ms(1600)));
        assert!(!crash.observe(true, 0, t0 + ms(1700)));
        assert!(!crash.observe(true, 0, t0 + ms(2600)));
        assert!(crash.observe(true, 0, t0 + ms(2800)));
    }

    #[tokio::test(start_paused = true)]
    async fn merges_telemetry_into_the_drone_state() {
        let transport = MockTransport::new();
        transport.push_telemetry(TICK, "bat:86;time:12;h:50;pitch:1;roll:-2;yaw:45;agx:0.1;agy:0.2;agz:9.8;mid:-1;");
        transport.push_telemetry(TICK, "bat:85;h:60;pitch:1;roll:-2;yaw:135;");

        let drone = connected_and_flying();
        let (tx, mut rx) = make_tello_state_channel();
        let monitor = StatusMonitor::start(transport, drone.clone(), ms(1000), Some(tx));

        sleep(ms(500)).await;
        let state = drone.snapshot();
        assert_eq!(state.battery, 85);
        assert_eq!(state.flight_time, 12);
        assert_eq!(state.height, 60);
        assert_eq!(state.attitude.yaw, 135);
        assert_eq!(state.heading, 90);
        assert_eq!(state.acceleration.z, 9.8);
        assert_eq!(state.mission_pad_id, -1);
        assert!(state.is_connected());

        assert_eq!(rx.recv().await.unwrap().battery, Some(86));
        assert_eq!(rx.recv().await.unwrap().battery, Some(85));

        assert!(monitor.is_running());
        monitor.stop(ms(100)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn sustained_zero_height_while_flying_disconnects() {
        let transport = MockTransport::new();
        for _ in 0..15 {
            transport.push_telemetry(TICK, "h:0;bat:50;");
        }
        let drone = connected_and_flying();
        let monitor = StatusMonitor::start(transport, drone.clone(), ms(1000), None);

        sleep(ms(2000)).await;
        assert_eq!(drone.connection(), Connection::Disconnected);
        assert!(!monitor.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn brief_zero_height_is_not_a_crash() {
        let transport = MockTransport::new();
        for _ in 0..8 {
            transport.push_telemetry(TICK, "h:0;");
        }
        transport.push_telemetry(TICK, "h:30;");
        for _ in 0..8 {
            transport.push_telemetry(TICK, "h:0;");
        }
        let drone = connected_and_flying();
        let monitor = StatusMonitor::start(transport, drone.clone(), ms(1000), None);

        sleep(ms(3000)).await;
        assert_eq!(drone.connection(), Connection::Connected);
        assert!(monitor.is_running());
        monitor.stop(ms(100)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn zero_height_on_the_ground_is_fine() {
        let transport = MockTransport::new();
        for _ in 0..30 {
            transport.push_telemetry(TICK, "h:0;");
        }
        let drone = SharedDroneState::new();
        drone.set_connection(Connection::Connected);
        let monitor = StatusMonitor::start(transport, drone.clone(), ms(1000), None);

        sleep(ms(4000)).await;
        assert!(drone.is_connected());
        monitor.stop(ms(100)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn lost_telemetry_disconnects() {
        let transport = MockTransport::new();
        transport.push_telemetry(TICK, "bat:70;");
        transport.push_telemetry_failure(ms(10_000));

        let drone = connected_and_flying();
        let monitor = StatusMonitor::start(transport, drone.clone(), ms(1000), None);

        sleep(ms(500)).await;
        assert!(drone.is_connected());
        assert_eq!(drone.snapshot().battery, 70);

        sleep(ms(10_000)).await;
        assert_eq!(drone.connection(), Connection::Disconnected);
        assert!(!monitor.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn stop_interrupts_a_pending_receive() {
        // no telemetry queued, the receive never completes
        let transport = MockTransport::new();
        let drone = connected_and_flying();
        let monitor = StatusMonitor::start(transport, drone.clone(), ms(1000), None);

        sleep(ms(100)).await;
        let started = Instant::now();
        monitor.stop(ms(2000)).await;
        assert!(started.elapsed() < ms(2000));
        assert!(drone.is_connected());
    }
}
