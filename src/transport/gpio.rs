// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! GPIO transport over the Linux sysfs interface

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::runtime::{Handle, RuntimeFlavor};
use tokio::task;
use tracing::{debug, warn};

use super::{resolve, Transport, TransportHandle, TransportMode};
use crate::error::TransportError;

/// An exported input line
pub struct GpioLine {
    value_path: PathBuf,
    exported_here: bool,
}

/// Digital input line on one pin
pub struct GpioTransport {
    pin: u32,
    root: PathBuf,
    handle: Option<TransportHandle<GpioLine>>,
}

impl GpioTransport {
    pub fn new(pin: u32, root: &Path) -> Self {
        Self {
            pin,
            root: root.to_path_buf(),
            handle: None,
        }
    }

    pub fn pin(&self) -> u32 {
        self.pin
    }

    fn open_line(&self) -> Result<GpioLine, TransportError> {
        let label = self.describe();
        if !self.root.is_dir() {
            return Err(TransportError::unavailable(
                label,
                format!("sysfs gpio root {} not present", self.root.display()),
            ));
        }

        let pin_dir = self.root.join(format!("gpio{}", self.pin));
        let mut exported_here = false;
        if !pin_dir.exists() {
            fs::write(self.root.join("export"), self.pin.to_string())
                .map_err(|e| TransportError::acquisition(label.clone(), e))?;
            exported_here = true;

            // sysfs creates the pin directory asynchronously
            if !pin_dir.exists() {
                settle(Duration::from_millis(50));
            }
            if !pin_dir.exists() {
                return Err(TransportError::other(
                    label,
                    format!("export did not create {}", pin_dir.display()),
                ));
            }
        }

        fs::write(pin_dir.join("direction"), "in")
            .map_err(|e| TransportError::acquisition(label, e))?;

        Ok(GpioLine {
            value_path: pin_dir.join("value"),
            exported_here,
        })
    }
}

/// Wait for sysfs without stalling other tasks on a multi-threaded runtime.
/// `block_in_place` is unavailable on a current-thread runtime.
fn settle(wait: Duration) {
    match Handle::try_current().map(|h| h.runtime_flavor()) {
        Ok(RuntimeFlavor::MultiThread) => task::block_in_place(|| std::thread::sleep(wait)),
        _ => std::thread::sleep(wait),
    }
}

impl Transport for GpioTransport {
    fn describe(&self) -> String {
        format!("gpio{}", self.pin)
    }

    fn acquire(&mut self) -> Result<TransportMode, TransportError> {
        if let Some(handle) = &self.handle {
            return Ok(handle.mode());
        }
        let handle = resolve(&self.describe(), self.open_line())?;
        let mode = handle.mode();
        self.handle = Some(handle);
        Ok(mode)
    }

    fn release(&mut self) {
        if let Some(TransportHandle::Real(line)) = self.handle.take() {
            if line.exported_here {
                if let Err(e) = fs::write(self.root.join("unexport"), self.pin.to_string()) {
                    warn!(pin = self.pin, error = %e, "Failed to unexport GPIO line");
                }
            }
            debug!(pin = self.pin, "GPIO line released");
        }
    }

    fn mode(&self) -> Option<TransportMode> {
        self.handle.as_ref().map(TransportHandle::mode)
    }

    fn raw_read(&mut self, _register: u8) -> Result<u8, TransportError> {
        let label = self.describe();
        let Some(line) = self.handle.as_mut().and_then(TransportHandle::real_mut) else {
            return Ok(0);
        };
        let raw = fs::read_to_string(&line.value_path)
            .map_err(|e| TransportError::acquisition(label.clone(), e))?;
        match raw.trim() {
            "0" => Ok(0),
            "1" => Ok(1),
            other => Err(TransportError::other(label, format!("invalid line value {:?}", other))),
        }
    }

    fn raw_write(&mut self, _register: u8, value: u8) -> Result<(), TransportError> {
        let label = self.describe();
        if let Some(line) = self.handle.as_mut().and_then(TransportHandle::real_mut) {
            let level = if value == 0 { "0" } else { "1" };
            fs::write(&line.value_path, level)
                .map_err(|e| TransportError::acquisition(label, e))?;
        }
        Ok(())
    }
}
