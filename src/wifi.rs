use std::process::Command;

use log::{debug, info};
use tokio::time::{sleep, Duration};

use crate::{TelloError, Result};

/// The drone's own access point is named TELLO-XXXXXX.
pub const TELLO_SSID_PREFIX: &str = "TELLO";

const POLL_INTERVAL: Duration = Duration::from_millis(100);

//////////////////////////////////////////////////////////////////////////////
// macOS

#[cfg(target_os = "macos")]
fn list_wifi_devices() -> Result<Vec<String>> {
    let output = run_command("networksetup", &["-listallhardwareports"])?;
    Ok(wifi_devices(&output))
}

/// Picks the device names out of `networksetup -listallhardwareports`.
#[cfg_attr(not(target_os = "macos"), allow(dead_code))]
fn wifi_devices(output: &str) -> Vec<String> {
    let mut found_wifi = false;
    let mut devices:Vec<String> = vec![];
    for l in output.lines() {
        if !found_wifi {
            // looking for something like "Hardware Port: Wi-Fi"...
            if l.contains("Wi-Fi") {
                found_wifi = true;
            }
        }
        else {
            // ...then next like should be like "Device: en1"
            found_wifi = false;
            devices.push(l.trim_start_matches("Device: ").trim().to_string());
        }
    }
    devices
}

#[cfg(target_os = "macos")]
pub async fn wait_for_wifi(ssid_prefix: &str) -> Result<()> {
    let devices = list_wifi_devices()?;
    if devices.is_empty() {
        return Err(TelloError::WiFiNotConnected);
    }
    debug!("[WiFi] watching {devices:?}");

    // wait for any one of them to connect
    let waiting_for = format!("Current Wi-Fi Network: {ssid_prefix}");
    loop {
        for device in devices.iter() {
            let s = run_command("networksetup", &["-getairportnetwork", device])?;
            if s.starts_with(&waiting_for) {
                info!("[WiFi] joined {}", s.trim());
                return Ok(())
            }
        }
        sleep(POLL_INTERVAL).await;
    }
}

//////////////////////////////////////////////////////////////////////////////
// linux

#[cfg(target_os = "linux")]
pub async fn wait_for_wifi(ssid_prefix: &str) -> Result<()> {
    loop {
        let s = run_command("iwgetid", &["-r"])?;
        if s.starts_with(ssid_prefix) {
            info!("[WiFi] joined {}", s.trim());
            return Ok(())
        }
        sleep(POLL_INTERVAL).await;
    }
}

//////////////////////////////////////////////////////////////////////////////
// anything else

#[cfg(not(any(target_os = "macos", target_os = "linux")))]
pub async fn wait_for_wifi(ssid_prefix: &str) -> Result<()> {
    log::warn!("[WiFi] wait_for_wifi has not been implemented for this OS, assuming {ssid_prefix}... joined already and continuing");
    Ok(())
}

//////////////////////////////////////////////////////////////////////////////

#[cfg_attr(not(any(target_os = "macos", target_os = "linux")), allow(dead_code))]
fn run_command(cmd:&str, args: &[&str]) -> Result<String> {
    let raw_output = Command::new(cmd)
        .args(args)
        .output()
        .map_err(|e| TelloError::Generic { msg: format!("failed to run {cmd} - {e}") })?;

    if !raw_output.status.success() {
        // iwgetid exits non-zero while not associated with any network
        debug!("[WiFi] {cmd} exited with {}", raw_output.status);
    }

    String::from_utf8(raw_output.stdout).map_err(
        |e|  TelloError::Generic { msg: format!("failed to decode {cmd} output - {e:?}") }
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_wifi_devices_in_networksetup_output() {
        let output = "\
Hardware Port: Ethernet
Device: en0
Ethernet Address: 00:00:00:00:00:00

Hardware Port: Wi-Fi
Device: en1
Ethernet Address: 00:00:00:00:00:01
";
        assert_eq!(wifi_devices(output), vec!["en1"]);
    }

    #[test]
    fn missing_command_is_an_error() {
        assert!(run_command("definitely-not-a-real-command", &[]).is_err());
    }
}
