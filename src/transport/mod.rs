// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! Hardware transports - GPIO, I2C and serial access with mock-mode fallback
//!
//! Every transport resolves to a [`TransportHandle`]: either a real hardware
//! handle or `Simulated`. Missing libraries or device nodes never fail
//! acquisition; they log a warning and leave the transport simulated, so a
//! sensor that is enabled in configuration always produces data.

mod gpio;
mod i2c;
mod serial;

pub use gpio::GpioTransport;
pub use i2c::I2cTransport;
pub use serial::SerialTransport;

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::config::HardwareConfig;
use crate::error::TransportError;

/// Serial read timeout shared by every serial sensor
pub const SERIAL_TIMEOUT_SECS: u64 = 1;

/// Whether a transport talks to real hardware
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportMode {
    Hardware,
    Simulated,
}

/// An acquired transport handle
pub enum TransportHandle<H> {
    Real(H),
    Simulated,
}

impl<H> TransportHandle<H> {
    pub fn mode(&self) -> TransportMode {
        match self {
            Self::Real(_) => TransportMode::Hardware,
            Self::Simulated => TransportMode::Simulated,
        }
    }

    pub fn real_mut(&mut self) -> Option<&mut H> {
        match self {
            Self::Real(handle) => Some(handle),
            Self::Simulated => None,
        }
    }
}

/// Hardware access capability held by a sensor
pub trait Transport: Send {
    /// Human-readable binding, e.g. `gpio17` or `i2c-1@0x76`
    fn describe(&self) -> String;

    /// Open the hardware handle, or fall back to simulated mode.
    /// Errors only on a genuine acquisition failure.
    fn acquire(&mut self) -> Result<TransportMode, TransportError>;

    /// Release the handle if one was acquired. Safe to call repeatedly.
    fn release(&mut self);

    /// `None` until acquired
    fn mode(&self) -> Option<TransportMode>;

    /// Read one byte. Simulated transports return 0.
    fn raw_read(&mut self, register: u8) -> Result<u8, TransportError>;

    /// Write one byte. Simulated transports ignore the write.
    fn raw_write(&mut self, register: u8, value: u8) -> Result<(), TransportError>;
}

/// Apply the mock-mode policy to the result of opening a device
pub(crate) fn resolve<H>(
    label: &str,
    opened: Result<H, TransportError>,
) -> Result<TransportHandle<H>, TransportError> {
    match opened {
        Ok(handle) => {
            info!(transport = label, "Hardware handle acquired");
            Ok(TransportHandle::Real(handle))
        }
        Err(e) if e.is_unavailable() => {
            warn!(transport = label, reason = %e, "Hardware not available, using mock mode");
            Ok(TransportHandle::Simulated)
        }
        Err(e) => {
            error!(transport = label, error = %e, "Failed to acquire hardware");
            Err(e)
        }
    }
}

/// Transport binding selected from configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransportConfig {
    Gpio { pin: u32 },
    I2c { bus: u8, address: u16 },
    Serial { port: String, baud_rate: u32 },
}

impl TransportConfig {
    /// Build the (not yet acquired) transport for this binding
    pub fn open(&self, hardware: &HardwareConfig) -> Box<dyn Transport> {
        match self {
            Self::Gpio { pin } => Box::new(GpioTransport::new(*pin, &hardware.gpio_root)),
            Self::I2c { bus, address } => Box::new(I2cTransport::new(
                *bus,
                *address,
                &hardware.i2c_device_prefix,
            )),
            Self::Serial { port, baud_rate } => Box::new(SerialTransport::new(port, *baud_rate)),
        }
    }
}

impl std::fmt::Display for TransportConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Gpio { pin } => write!(f, "gpio{}", pin),
            Self::I2c { bus, address } => write!(f, "i2c-{}@0x{:02X}", bus, address),
            Self::Serial { port, baud_rate } => write!(f, "{}@{}", port, baud_rate),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_policy() {
        let real: Result<u8, TransportError> = Ok(7);
        assert_eq!(resolve("t", real).unwrap().mode(), TransportMode::Hardware);

        let missing: Result<u8, TransportError> = Err(TransportError::unavailable("t", "absent"));
        assert_eq!(resolve("t", missing).unwrap().mode(), TransportMode::Simulated);

        let broken: Result<u8, TransportError> = Err(TransportError::acquisition(
            "t",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        ));
        assert!(resolve("t", broken).is_err());
    }

    #[test]
    fn test_binding_display() {
        assert_eq!(TransportConfig::Gpio { pin: 17 }.to_string(), "gpio17");
        assert_eq!(
            TransportConfig::I2c { bus: 1, address: 0x76 }.to_string(),
            "i2c-1@0x76"
        );
        let serial = TransportConfig::Serial { port: "/dev/ttyUSB0".into(), baud_rate: 9600 };
        assert_eq!(serial.to_string(), "/dev/ttyUSB0@9600");
    }
}
