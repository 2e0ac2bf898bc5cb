//! Datagram exchange with the drone over two independent channels: the
//! command socket (request/response) and the state socket (telemetry pushed
//! by the drone).

use std::io::ErrorKind;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info, warn};
use tokio::net::UdpSocket;
use tokio::time::{sleep, timeout};

use crate::errors::{Result, TelloError};
use crate::options::TelloOptions;

const MAX_DATAGRAM_SIZE: usize = 1024;

#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends one datagram to the drone's command port.
    async fn send(&self, data: &[u8]) -> Result<()>;

    /// Waits up to the configured timeout for one datagram on the command socket.
    async fn receive_response(&self) -> Result<String>;

    /// Drops responses already queued on the command socket, eg the late
    /// answer to a command that timed out. Returns how many were dropped.
    fn discard_pending(&self) -> usize;

    /// Waits up to the configured timeout for one telemetry datagram.
    async fn receive_telemetry(&self) -> Result<String>;

    /// Closes both sockets. Safe to call repeatedly.
    fn disconnect(&self);

    fn set_timeout(&self, timeout: Duration);

    fn timeout(&self) -> Duration;
}

#[derive(Debug, Default)]
struct Sockets {
    control: Option<Arc<UdpSocket>>,
    state: Option<Arc<UdpSocket>>,
}

#[derive(Debug)]
pub struct UdpTransport {
    sockets: Mutex<Sockets>,
    timeout_ms: AtomicU64,
}

impl UdpTransport {
    pub async fn connect(options: &TelloOptions) -> Result<Self> {
        let local_address = format!("0.0.0.0:{}", options.local_control_port);
        let drone_address = options.drone_address();

        info!("[Tello] CONNECT {local_address} → {drone_address}");

        debug!("[Tello] binding local {local_address}...");
        let control = UdpSocket::bind(&local_address)
            .await
            .map_err(|e| TelloError::connection(format!("failed to bind {local_address}: {e}")))?;

        // route check: UDP connect only fails if there is no route to the
        // drone, which is the case until the WiFi link is fully up. Whether
        // the drone itself answers is only known after `command`.
        debug!("[Tello] checking route to {drone_address}...");
        let mut attempt = 0;
        loop {
            attempt += 1;
            match control.connect(&drone_address).await {
                Ok(_) => break,
                Err(err) if attempt < options.connect_attempts => {
                    debug!("[Tello] route check #{attempt} failed ({err}), retrying...");
                    sleep(options.connect_retry_delay).await;
                }
                Err(err) => {
                    return Err(TelloError::connection(format!(
                        "no route to drone at {drone_address} after {attempt} attempts: {err}"
                    )));
                }
            }
        }

        let state_address = format!("0.0.0.0:{}", options.state_port);
        debug!("[State] binding local {state_address}...");
        // on failure `control` is dropped here, closing it again
        let state = UdpSocket::bind(&state_address)
            .await
            .map_err(|e| TelloError::connection(format!("failed to bind {state_address}: {e}")))?;

        info!("[Tello] CONNECTED");

        Ok(Self {
            sockets: Mutex::new(Sockets {
                control: Some(Arc::new(control)),
                state: Some(Arc::new(state)),
            }),
            timeout_ms: AtomicU64::new(options.response_timeout.as_millis() as u64),
        })
    }

    fn control_socket(&self) -> Result<Arc<UdpSocket>> {
        let sockets = self.sockets.lock().unwrap_or_else(PoisonError::into_inner);
        sockets.control.clone().ok_or_else(|| TelloError::connection("not connected"))
    }

    fn state_socket(&self) -> Result<Arc<UdpSocket>> {
        let sockets = self.sockets.lock().unwrap_or_else(PoisonError::into_inner);
        sockets.state.clone().ok_or_else(|| TelloError::connection("not connected"))
    }

    async fn receive_from(&self, sock: &UdpSocket) -> Result<String> {
        let limit = self.timeout();
        let mut buf = vec![0; MAX_DATAGRAM_SIZE];
        let n = timeout(limit, sock.recv(&mut buf))
            .await
            .map_err(|_| TelloError::Timeout(limit))??;

        buf.truncate(n);
        Ok(String::from_utf8(buf)?)
    }
}

#[async_trait]
impl Transport for UdpTransport {
    async fn send(&self, data: &[u8]) -> Result<()> {
        let sock = self.control_socket()?;
        sock.send(data).await?;
        Ok(())
    }

    async fn receive_response(&self) -> Result<String> {
        let sock = self.control_socket()?;
        self.receive_from(&sock).await
    }

    async fn receive_telemetry(&self) -> Result<String> {
        let sock = self.state_socket()?;
        self.receive_from(&sock).await
    }

    fn discard_pending(&self) -> usize {
        let Ok(sock) = self.control_socket() else {
            return 0;
        };

        let mut buf = [0u8; MAX_DATAGRAM_SIZE];
        let mut dropped = 0;
        loop {
            match sock.try_recv(&mut buf) {
                Ok(n) => {
                    dropped += 1;
                    debug!("[Tello] discarding stale response {:?}", String::from_utf8_lossy(&buf[..n]).trim());
                }
                Err(err) if err.kind() == ErrorKind::WouldBlock => break,
                Err(err) => {
                    // eg ICMP port unreachable reported for an earlier send
                    debug!("[Tello] discarding pending error {err}");
                    dropped += 1;
                }
            }
        }
        dropped
    }

    fn disconnect(&self) {
        let mut sockets = self.sockets.lock().unwrap_or_else(PoisonError::into_inner);
        let was_open = sockets.control.is_some() || sockets.state.is_some();
        sockets.control = None;
        sockets.state = None;
        if was_open {
            info!("[Tello] DISCONNECTED");
        }
    }

    fn set_timeout(&self, timeout: Duration) {
        if timeout.is_zero() {
            warn!("[Tello] ignoring zero response timeout");
            return;
        }
        self.timeout_ms.store(timeout.as_millis() as u64, Ordering::Relaxed);
    }

    fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms.load(Ordering::Relaxed))
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{mnemonic, Command};
    use crate::executor::CommandExecutor;

    // a stand-in drone on loopback plus a transport addressing it
    async fn drone_and_transport() -> (UdpSocket, UdpTransport) {
        let drone = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let drone_port = drone.local_addr().unwrap().port();

        let options = TelloOptions::default()
            .with_host("127.0.0.1")
            .with_control_port(drone_port)
            .with_local_ports(0, 0)
            .with_response_timeout(Duration::from_millis(200));
        let transport = UdpTransport::connect(&options).await.unwrap();

        (drone, transport)
    }

    #[tokio::test]
    async fn exchanges_datagrams_with_the_drone() {
        let (drone, transport) = drone_and_transport().await;

        transport.send(b"battery?").await.unwrap();
        let mut buf = [0u8; 64];
        let (n, from) = drone.recv_from(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"battery?");

        drone.send_to(b"86\r\n", from).await.unwrap();
        assert_eq!(transport.receive_response().await.unwrap(), "86\r\n");
    }

    #[tokio::test]
    async fn late_response_is_not_taken_for_the_next_one() {
        let (drone, transport) = drone_and_transport().await;
        let executor = CommandExecutor::new(Arc::new(transport));

        // the drone answers takeoff only after the 200ms timeout
        let err = executor.execute(&Command::basic(mnemonic::TAKE_OFF)).await.unwrap_err();
        assert!(matches!(err, TelloError::Timeout(_)));

        let mut buf = [0u8; 64];
        let (n, from) = drone.recv_from(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"takeoff");
        drone.send_to(b"ok", from).await.unwrap();
        sleep(Duration::from_millis(50)).await;

        let answer = tokio::spawn(async move {
            let mut buf = [0u8; 64];
            let (n, from) = drone.recv_from(&mut buf).await.unwrap();
            assert_eq!(&buf[..n], b"battery?");
            drone.send_to(b"86\r\n", from).await.unwrap();
        });

        let battery = executor.execute_read(&Command::basic(mnemonic::READ_BATTERY)).await.unwrap();
        assert_eq!(battery, "86\r\n");
        answer.await.unwrap();
    }

    #[tokio::test]
    async fn discards_queued_responses() {
        let (drone, transport) = drone_and_transport().await;
        assert_eq!(transport.discard_pending(), 0);

        transport.send(b"command").await.unwrap();
        let mut buf = [0u8; 64];
        let (_, from) = drone.recv_from(&mut buf).await.unwrap();
        drone.send_to(b"ok", from).await.unwrap();
        drone.send_to(b"ok", from).await.unwrap();
        sleep(Duration::from_millis(50)).await;

        assert_eq!(transport.discard_pending(), 2);
        assert!(matches!(transport.receive_response().await, Err(TelloError::Timeout(_))));
    }

    #[tokio::test]
    async fn receive_times_out() {
        let (_drone, transport) = drone_and_transport().await;

        transport.set_timeout(Duration::from_millis(50));
        assert_eq!(transport.timeout(), Duration::from_millis(50));

        let err = transport.receive_telemetry().await.unwrap_err();
        assert!(matches!(err, TelloError::Timeout(_)));
    }

    #[tokio::test]
    async fn disconnect_is_idempotent_and_blocks_further_sends() {
        let (_drone, transport) = drone_and_transport().await;

        transport.disconnect();
        transport.disconnect();

        let err = transport.send(b"command").await.unwrap_err();
        assert!(err.is_connection_lost());
        assert!(transport.receive_telemetry().await.unwrap_err().is_connection_lost());
    }

    #[tokio::test]
    async fn state_port_in_use_fails_the_connect() {
        let taken = UdpSocket::bind("0.0.0.0:0").await.unwrap();
        let taken_port = taken.local_addr().unwrap().port();

        let options = TelloOptions::default()
            .with_host("127.0.0.1")
            .with_control_port(9)
            .with_local_ports(0, taken_port);
        let err = UdpTransport::connect(&options).await.unwrap_err();
        assert!(matches!(err, TelloError::ConnectionError { .. }));
    }
}
