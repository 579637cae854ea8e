//! Physical port discovery and the `SerialLink` adapter over `serialport`.
//! The dispatcher owns exactly one open serial port.

use std::time::Duration;

use crate::error::{Result, ShowError};

use super::dispatcher::SerialLink;

/// Candidate device paths, most-likely-the-MCU first, filtered by platform
/// naming convention. Real enumeration (`serialport::available_ports`) also
/// returns unrelated modems and debug UARTs; callers should still let the
/// operator override via config rather than trusting this ordering blindly.
pub fn likely_ports() -> Vec<String> {
    let mut candidates: Vec<String> = serialport::available_ports()
        .unwrap_or_default()
        .into_iter()
        .map(|p| p.port_name)
        .collect();
    candidates.sort_by_key(|name| likelihood_rank(name));
    candidates
}

fn likelihood_rank(name: &str) -> u8 {
    let lower = name.to_ascii_lowercase();
    if lower.contains("usbmodem") || lower.contains("ttyacm") {
        0
    } else if lower.contains("usbserial") || lower.contains("ttyusb") {
        1
    } else if lower.starts_with("com") {
        2
    } else {
        3
    }
}

/// Opens `path` at the MCU's fixed baud rate and wraps it as a `SerialLink`.
/// Baud rate and timeout are not configurable; the boot handshake's own 2s
/// wait absorbs MCU reset jitter regardless of host-side read timeout.
pub fn open(path: &str) -> Result<Box<dyn SerialLink>> {
    let port = serialport::new(path, 9600)
        .timeout(Duration::from_millis(200))
        .open()
        .map_err(|e| ShowError::Serial(format!("failed to open {path}: {e}")))?;
    Ok(Box::new(OpenSerialPort { port }))
}

struct OpenSerialPort {
    port: Box<dyn serialport::SerialPort>,
}

impl SerialLink for OpenSerialPort {
    fn write_line(&mut self, line: &str) -> Result<()> {
        use std::io::Write;
        self.port
            .write_all(format!("{line}\n").as_bytes())
            .map_err(ShowError::Io)?;
        self.port.flush().map_err(ShowError::Io)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usb_modem_ranks_above_generic_names() {
        assert!(likelihood_rank("/dev/cu.usbmodem14101") < likelihood_rank("/dev/tty.Bluetooth"));
    }

    #[test]
    fn windows_com_ranks_above_unknown() {
        assert!(likelihood_rank("COM3") < likelihood_rank("/dev/random-thing"));
    }
}
