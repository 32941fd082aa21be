// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! Serial/USB transport

use tracing::debug;

use super::{resolve, Transport, TransportHandle, TransportMode};
use crate::error::TransportError;

#[cfg(feature = "serial")]
mod link {
    use std::io::{Read, Write};
    use std::path::Path;
    use std::time::Duration;

    use crate::error::TransportError;
    use crate::transport::SERIAL_TIMEOUT_SECS;

    pub struct SerialLink(Box<dyn serialport::SerialPort>);

    impl SerialLink {
        pub fn open(label: &str, port: &str, baud_rate: u32) -> Result<Self, TransportError> {
            if !Path::new(port).exists() {
                return Err(TransportError::unavailable(label, format!("{} not present", port)));
            }
            serialport::new(port, baud_rate)
                .timeout(Duration::from_secs(SERIAL_TIMEOUT_SECS))
                .open()
                .map(Self)
                .map_err(|e| match e.kind() {
                    serialport::ErrorKind::NoDevice
                    | serialport::ErrorKind::Io(std::io::ErrorKind::NotFound) => {
                        TransportError::unavailable(label, e.to_string())
                    }
                    _ => TransportError::other(label, e),
                })
        }

        pub fn read_byte(&mut self, label: &str) -> Result<u8, TransportError> {
            let mut buf = [0u8; 1];
            self.0
                .read_exact(&mut buf)
                .map_err(|e| TransportError::acquisition(label, e))?;
            Ok(buf[0])
        }

        pub fn write_byte(&mut self, label: &str, value: u8) -> Result<(), TransportError> {
            self.0
                .write_all(&[value])
                .map_err(|e| TransportError::acquisition(label, e))
        }
    }
}

#[cfg(not(feature = "serial"))]
mod link {
    use crate::error::TransportError;

    /// No port can be opened without the `serial` feature
    pub enum SerialLink {}

    impl SerialLink {
        pub fn open(label: &str, _port: &str, _baud_rate: u32) -> Result<Self, TransportError> {
            Err(TransportError::unavailable(label, "built without the `serial` feature"))
        }

        pub fn read_byte(&mut self, _label: &str) -> Result<u8, TransportError> {
            match *self {}
        }

        pub fn write_byte(&mut self, _label: &str, _value: u8) -> Result<(), TransportError> {
            match *self {}
        }
    }
}

use link::SerialLink;

/// Serial port at a fixed baud rate, 1 second read timeout
pub struct SerialTransport {
    port: String,
    baud_rate: u32,
    handle: Option<TransportHandle<SerialLink>>,
}

impl SerialTransport {
    pub fn new(port: &str, baud_rate: u32) -> Self {
        Self {
            port: port.to_string(),
            baud_rate,
            handle: None,
        }
    }

    pub fn port(&self) -> &str {
        &self.port
    }

    pub fn baud_rate(&self) -> u32 {
        self.baud_rate
    }
}

impl Transport for SerialTransport {
    fn describe(&self) -> String {
        format!("{}@{}", self.port, self.baud_rate)
    }

    fn acquire(&mut self) -> Result<TransportMode, TransportError> {
        if let Some(handle) = &self.handle {
            return Ok(handle.mode());
        }
        let label = self.describe();
        let handle = resolve(&label, SerialLink::open(&label, &self.port, self.baud_rate))?;
        let mode = handle.mode();
        self.handle = Some(handle);
        Ok(mode)
    }

    fn release(&mut self) {
        if let Some(TransportHandle::Real(_)) = self.handle.take() {
            debug!(port = %self.port, "Serial port closed");
        }
    }

    fn mode(&self) -> Option<TransportMode> {
        self.handle.as_ref().map(TransportHandle::mode)
    }

    /// Registers are meaningless on a byte stream; reads the next byte
    fn raw_read(&mut self, _register: u8) -> Result<u8, TransportError> {
        let label = self.describe();
        match self.handle.as_mut().and_then(TransportHandle::real_mut) {
            Some(link) => link.read_byte(&label),
            None => Ok(0),
        }
    }

    fn raw_write(&mut self, _register: u8, value: u8) -> Result<(), TransportError> {
        let label = self.describe();
        match self.handle.as_mut().and_then(TransportHandle::real_mut) {
            Some(link) => link.write_byte(&label, value),
            None => Ok(()),
        }
    }
}
