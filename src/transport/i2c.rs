// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! I2C transport - byte-granular register access on `/dev/i2c-N`

use std::path::PathBuf;
use tracing::debug;

use super::{resolve, Transport, TransportHandle, TransportMode};
use crate::error::TransportError;

#[cfg(feature = "hardware")]
mod bus {
    use std::path::Path;

    use i2cdev::core::I2CDevice;
    use i2cdev::linux::LinuxI2CDevice;

    use crate::error::TransportError;

    pub struct I2cBus(LinuxI2CDevice);

    impl I2cBus {
        pub fn open(label: &str, path: &Path, address: u16) -> Result<Self, TransportError> {
            if !path.exists() {
                return Err(TransportError::unavailable(
                    label,
                    format!("{} not present", path.display()),
                ));
            }
            LinuxI2CDevice::new(path, address)
                .map(Self)
                .map_err(|e| TransportError::other(label, e))
        }

        pub fn read_byte(&mut self, label: &str, register: u8) -> Result<u8, TransportError> {
            self.0
                .smbus_read_byte_data(register)
                .map_err(|e| TransportError::other(label, e))
        }

        pub fn write_byte(&mut self, label: &str, register: u8, value: u8) -> Result<(), TransportError> {
            self.0
                .smbus_write_byte_data(register, value)
                .map_err(|e| TransportError::other(label, e))
        }
    }
}

#[cfg(not(feature = "hardware"))]
mod bus {
    use std::path::Path;

    use crate::error::TransportError;

    /// No bus can be opened without the `hardware` feature
    pub enum I2cBus {}

    impl I2cBus {
        pub fn open(label: &str, _path: &Path, _address: u16) -> Result<Self, TransportError> {
            Err(TransportError::unavailable(
                label,
                "built without the `hardware` feature",
            ))
        }

        pub fn read_byte(&mut self, _label: &str, _register: u8) -> Result<u8, TransportError> {
            match *self {}
        }

        pub fn write_byte(&mut self, _label: &str, _register: u8, _value: u8) -> Result<(), TransportError> {
            match *self {}
        }
    }
}

use bus::I2cBus;

/// Device at a 7-bit address on one I2C bus
pub struct I2cTransport {
    bus: u8,
    address: u16,
    device_path: PathBuf,
    handle: Option<TransportHandle<I2cBus>>,
}

impl I2cTransport {
    pub fn new(bus: u8, address: u16, device_prefix: &str) -> Self {
        Self {
            bus,
            address,
            device_path: PathBuf::from(format!("{}{}", device_prefix, bus)),
            handle: None,
        }
    }

    pub fn bus(&self) -> u8 {
        self.bus
    }

    pub fn address(&self) -> u16 {
        self.address
    }
}

impl Transport for I2cTransport {
    fn describe(&self) -> String {
        format!("i2c-{}@0x{:02X}", self.bus, self.address)
    }

    fn acquire(&mut self) -> Result<TransportMode, TransportError> {
        if let Some(handle) = &self.handle {
            return Ok(handle.mode());
        }
        let label = self.describe();
        let handle = resolve(&label, I2cBus::open(&label, &self.device_path, self.address))?;
        let mode = handle.mode();
        self.handle = Some(handle);
        Ok(mode)
    }

    fn release(&mut self) {
        // Dropping the device closes the file descriptor
        if let Some(TransportHandle::Real(_)) = self.handle.take() {
            debug!(bus = self.bus, address = self.address, "I2C device released");
        }
    }

    fn mode(&self) -> Option<TransportMode> {
        self.handle.as_ref().map(TransportHandle::mode)
    }

    fn raw_read(&mut self, register: u8) -> Result<u8, TransportError> {
        let label = self.describe();
        match self.handle.as_mut().and_then(TransportHandle::real_mut) {
            Some(bus) => bus.read_byte(&label, register),
            None => Ok(0),
        }
    }

    fn raw_write(&mut self, register: u8, value: u8) -> Result<(), TransportError> {
        let label = self.describe();
        match self.handle.as_mut().and_then(TransportHandle::real_mut) {
            Some(bus) => bus.write_byte(&label, register, value),
            None => Ok(()),
        }
    }
}
