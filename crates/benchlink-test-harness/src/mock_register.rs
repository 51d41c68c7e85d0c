//! In-memory register bus.
//!
//! [`MockRegisterBus`] keeps a register map and an ordered log of every
//! access. Clones share state, so a test keeps one clone for inspection and
//! hands another to the controller under test.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use benchlink_core::error::{Error, Rejection, Result};
use benchlink_core::register::RegisterBus;

/// One register access, in the order it happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterAccess {
    /// A read of the given register.
    Read(u16),
    /// A write of `value` to `address`.
    Write(u16, u16),
}

#[derive(Debug, Default)]
struct State {
    registers: HashMap<u16, u16>,
    log: Vec<RegisterAccess>,
    rejected: HashSet<u16>,
    closed: bool,
}

/// A [`RegisterBus`] backed by a register map.
///
/// Reading a register that was never set returns 0, mirroring a freshly
/// reset controller.
#[derive(Debug, Clone, Default)]
pub struct MockRegisterBus {
    state: Arc<Mutex<State>>,
}

impl MockRegisterBus {
    /// Create an empty bus.
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> Result<MutexGuard<'_, State>> {
        self.state
            .lock()
            .map_err(|_| Error::Transport("mock register bus poisoned".into()))
    }

    /// Preset a register without logging an access.
    pub fn set(&self, address: u16, value: u16) {
        if let Ok(mut state) = self.state() {
            state.registers.insert(address, value);
        }
    }

    /// Preset a register holding a signed value.
    pub fn set_signed(&self, address: u16, value: i16) {
        self.set(address, value as u16);
    }

    /// Current content of a register.
    pub fn get(&self, address: u16) -> u16 {
        self.state()
            .ok()
            .and_then(|s| s.registers.get(&address).copied())
            .unwrap_or(0)
    }

    /// Current content of a register, read as signed.
    pub fn get_signed(&self, address: u16) -> i16 {
        self.get(address) as i16
    }

    /// Make every write to `address` fail with a Modbus exception 0x04.
    pub fn reject_writes_to(&self, address: u16) {
        if let Ok(mut state) = self.state() {
            state.rejected.insert(address);
        }
    }

    /// Ordered log of all accesses.
    pub fn log(&self) -> Vec<RegisterAccess> {
        self.state().map(|s| s.log.clone()).unwrap_or_default()
    }

    /// Only the writes, as `(address, value)` pairs.
    pub fn writes(&self) -> Vec<(u16, u16)> {
        self.log()
            .into_iter()
            .filter_map(|a| match a {
                RegisterAccess::Write(addr, value) => Some((addr, value)),
                RegisterAccess::Read(_) => None,
            })
            .collect()
    }

    /// Forget the access log, keeping register contents.
    pub fn clear_log(&self) {
        if let Ok(mut state) = self.state() {
            state.log.clear();
        }
    }

    /// Whether `close()` has been called.
    pub fn is_closed(&self) -> bool {
        self.state().map(|s| s.closed).unwrap_or(true)
    }
}

#[async_trait]
impl RegisterBus for MockRegisterBus {
    async fn read_register(&mut self, address: u16) -> Result<u16> {
        let mut state = self.state()?;
        if state.closed {
            return Err(Error::TransportClosed);
        }
        state.log.push(RegisterAccess::Read(address));
        Ok(state.registers.get(&address).copied().unwrap_or(0))
    }

    async fn write_register(&mut self, address: u16, value: u16) -> Result<()> {
        let mut state = self.state()?;
        if state.closed {
            return Err(Error::TransportClosed);
        }
        state.log.push(RegisterAccess::Write(address, value));
        if state.rejected.contains(&address) {
            return Err(Error::DeviceRejected(Rejection::Exception(0x04)));
        }
        state.registers.insert(address, value);
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.state()?.closed = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn clones_share_registers_and_log() {
        let handle = MockRegisterBus::new();
        let mut bus = handle.clone();
        handle.set_signed(0x00, -15);

        assert_eq!(bus.read_register(0x00).await.unwrap() as i16, -15);
        bus.write_register(0x1A, 500).await.unwrap();

        assert_eq!(handle.get(0x1A), 500);
        assert_eq!(
            handle.log(),
            vec![RegisterAccess::Read(0x00), RegisterAccess::Write(0x1A, 500)]
        );
        assert_eq!(handle.writes(), vec![(0x1A, 500)]);
    }

    #[tokio::test]
    async fn rejected_write_keeps_old_value() {
        let mut bus = MockRegisterBus::new();
        bus.set(0x16, 100);
        bus.reject_writes_to(0x16);
        let err = bus.write_register(0x16, 7).await.unwrap_err();
        assert!(matches!(err, Error::DeviceRejected(Rejection::Exception(0x04))));
        assert_eq!(bus.get(0x16), 100);
    }

    #[tokio::test]
    async fn closed_bus_refuses_access() {
        let mut bus = MockRegisterBus::new();
        bus.close().await.unwrap();
        assert!(bus.is_closed());
        assert!(matches!(bus.read_register(0).await, Err(Error::TransportClosed)));
    }
}
