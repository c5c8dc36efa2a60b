//! Process-wide execution context of learning backends.
use crate::error::RlsrlError;
use anyhow::Result;
use log::info;
use serde::{Deserialize, Serialize};
use std::{env, str::FromStr, sync::OnceLock, thread};

/// Environment variable selecting the device.
pub const DEVICE_ENV_VAR: &str = "RLSRL_DEVICE";

static SESSION: OnceLock<Session> = OnceLock::new();

#[derive(Clone, Debug, Copy, Deserialize, Serialize, PartialEq, Eq)]
/// Device on which a backend runs numeric computation.
pub enum Device {
    /// The main CPU device.
    Cpu,

    /// A GPU device with the given index.
    Cuda(usize),
}

impl FromStr for Device {
    type Err = RlsrlError;

    /// Parses `cpu`, `cuda` or `cuda:<index>`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        match s.as_str() {
            "cpu" => Ok(Self::Cpu),
            "cuda" | "gpu" => Ok(Self::Cuda(0)),
            _ => match s.strip_prefix("cuda:") {
                Some(ix) => ix
                    .parse()
                    .map(Self::Cuda)
                    .map_err(|_| RlsrlError::SessionInitError(format!("invalid device {}", s))),
                None => Err(RlsrlError::SessionInitError(format!("invalid device {}", s))),
            },
        }
    }
}

/// Execution context shared by all training runs of the process.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    device: Device,
    n_threads: usize,
}

impl Session {
    /// Returns the session, creating it on the first call.
    ///
    /// The device is read from [`DEVICE_ENV_VAR`], CPU when unset.
    /// Later calls return the same session without reading the variable again.
    pub fn ensure_initialized() -> Result<&'static Session> {
        if let Some(session) = SESSION.get() {
            return Ok(session);
        }
        let session = Self::from_env()?;
        let session = SESSION.get_or_init(|| session);
        info!(
            "Initialized session: device = {:?}, threads = {}",
            session.device, session.n_threads
        );
        Ok(session)
    }

    /// Returns the session if it has been initialized.
    pub fn get() -> Option<&'static Session> {
        SESSION.get()
    }

    fn from_env() -> Result<Self> {
        let device = match env::var(DEVICE_ENV_VAR) {
            Ok(v) => v.parse()?,
            Err(_) => Device::Cpu,
        };
        let n_threads = thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        Ok(Self { device, n_threads })
    }

    /// Device for numeric computation.
    pub fn device(&self) -> Device {
        self.device
    }

    /// The number of threads available to the backend.
    pub fn n_threads(&self) -> usize {
        self.n_threads
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_device() {
        assert_eq!("cpu".parse::<Device>().unwrap(), Device::Cpu);
        assert_eq!("CUDA".parse::<Device>().unwrap(), Device::Cuda(0));
        assert_eq!("cuda:2".parse::<Device>().unwrap(), Device::Cuda(2));
        assert!("cuda:x".parse::<Device>().is_err());
        assert!("tpu".parse::<Device>().is_err());
    }

    #[test]
    fn test_ensure_initialized_is_idempotent() -> Result<()> {
        let s1 = Session::ensure_initialized()?;
        let s2 = Session::ensure_initialized()?;
        assert!(std::ptr::eq(s1, s2));
        assert!(s1.n_threads() >= 1);
        Ok(())
    }
}
