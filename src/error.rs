// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! Error types for transports, sensors and configuration

use thiserror::Error;

/// Errors raised while acquiring or using a hardware transport
#[derive(Debug, Error)]
pub enum TransportError {
    /// Access library not compiled in, or the device node does not exist.
    /// Never fatal: the transport falls back to simulated mode.
    #[error("{transport} unavailable: {reason}")]
    Unavailable {
        transport: String,
        reason: String,
    },

    /// Unexpected failure talking to hardware that is present
    #[error("{transport} acquisition failed: {source}")]
    Acquisition {
        transport: String,
        #[source]
        source: std::io::Error,
    },
}

impl TransportError {
    pub fn unavailable(transport: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Unavailable {
            transport: transport.into(),
            reason: reason.into(),
        }
    }

    pub fn acquisition(transport: impl Into<String>, source: std::io::Error) -> Self {
        Self::Acquisition {
            transport: transport.into(),
            source,
        }
    }

    /// Wrap an error that carries no `io::Error` of its own
    pub fn other(transport: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::acquisition(
            transport,
            std::io::Error::new(std::io::ErrorKind::Other, message.to_string()),
        )
    }

    /// Classify an io error: a missing device degrades, anything else is real
    pub fn from_io(transport: impl Into<String>, err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::unavailable(transport, err.to_string()),
            _ => Self::acquisition(transport, err),
        }
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }
}

/// Errors captured inside a sensor read. These never leave `Sensor::read`;
/// they end up in the `error` metadata entry of a zero-quality reading.
#[derive(Debug, Error)]
pub enum SensorError {
    #[error("sensor not initialized")]
    NotInitialized,

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("invalid sample: {0}")]
    InvalidSample(String),
}

/// Unusable values in a sensor configuration entry.
/// Construction logs these and applies the documented default instead.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("{sensor}: i2c address 0x{address:X} is not a 7-bit address")]
    InvalidAddress { sensor: String, address: u16 },

    #[error("{sensor}: i2c binding needs an address")]
    MissingAddress { sensor: String },

    #[error("{sensor}: baud rate must be positive")]
    InvalidBaudRate { sensor: String },

    #[error("{sensor}: sample rate {rate} must be positive")]
    InvalidSampleRate { sensor: String, rate: f64 },

    #[error("sampling rate {0} Hz must give a loop period between 1 ms and 1 h")]
    InvalidLoopRate(f64),

    #[error("monitor: {0}")]
    InvalidMonitor(&'static str),
}
