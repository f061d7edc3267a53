//! Automatable port values.
//!
//! A port is a named, lock-guarded value that the control surface and the
//! engine both touch. The lock lives inside the port itself and is held only
//! for the duration of one read or write, so a safe read on the real-time
//! path never blocks on a full stage invocation.

use std::sync::Arc;

use parking_lot::Mutex;

/// Value carried by a port.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PortValue {
    Float(f64),
    UInt(u64),
    Bool(bool),
}

impl PortValue {
    pub fn as_float(self) -> f64 {
        match self {
            PortValue::Float(v) => v,
            PortValue::UInt(v) => v as f64,
            PortValue::Bool(v) => v as u64 as f64,
        }
    }

    pub fn as_uint(self) -> u64 {
        match self {
            PortValue::Float(v) => v.max(0.0) as u64,
            PortValue::UInt(v) => v,
            PortValue::Bool(v) => v as u64,
        }
    }

    pub fn as_bool(self) -> bool {
        match self {
            PortValue::Float(v) => v != 0.0,
            PortValue::UInt(v) => v != 0,
            PortValue::Bool(v) => v,
        }
    }
}

/// A lock-guarded automatable value.
#[derive(Debug)]
pub struct Port {
    name: String,
    value: Mutex<PortValue>,
}

impl Port {
    pub fn new(name: impl Into<String>, value: PortValue) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            value: Mutex::new(value),
        })
    }

    pub fn uint(name: impl Into<String>, value: u64) -> Arc<Self> {
        Self::new(name, PortValue::UInt(value))
    }

    pub fn float(name: impl Into<String>, value: f64) -> Arc<Self> {
        Self::new(name, PortValue::Float(value))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Read the current value. Takes the port lock for the read only.
    pub fn safe_read(&self) -> PortValue {
        *self.value.lock()
    }

    /// Overwrite the value. Takes the port lock for the write only.
    pub fn safe_write(&self, value: PortValue) {
        *self.value.lock() = value;
    }
}
