//! In-memory Modbus device for exercising the interpreter without a network.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use crate::client::{Connector, RegisterTransport};
use crate::error::TransportError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Open(String),
    Read(u32, usize),
    WriteMultiple(u32, Vec<u16>),
    WriteSingle(u32, u16),
    Close,
}

#[derive(Default)]
struct DeviceState {
    responses: HashMap<u32, Vec<u16>>,
    failing: HashSet<u32>,
    unreachable: HashSet<String>,
    calls: Vec<Call>,
}

/// Returns canned words per start address and records every call made.
#[derive(Clone, Default)]
pub struct MockDevice {
    state: Rc<RefCell<DeviceState>>,
}

impl MockDevice {
    pub fn respond(&self, address: u32, words: &[u16]) -> &Self {
        self.state.borrow_mut().responses.insert(address, words.to_vec());
        self
    }

    pub fn fail(&self, address: u32) -> &Self {
        self.state.borrow_mut().failing.insert(address);
        self
    }

    pub fn unreachable(&self, host: &str) -> &Self {
        self.state.borrow_mut().unreachable.insert(host.to_string());
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.borrow().calls.clone()
    }

    /// Calls that touched registers, ignoring open and close.
    pub fn register_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| !matches!(c, Call::Open(_) | Call::Close))
            .count()
    }

    fn record(&self, call: Call) {
        self.state.borrow_mut().calls.push(call);
    }
}

impl Connector for MockDevice {
    type Transport = MockDevice;

    async fn open(&self, host: &str) -> Result<MockDevice, TransportError> {
        self.record(Call::Open(host.to_string()));
        if self.state.borrow().unreachable.contains(host) {
            return Err(TransportError::Resolve {
                host: host.to_string(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "unknown host"),
            });
        }
        Ok(self.clone())
    }
}

impl RegisterTransport for MockDevice {
    async fn read_holding_registers(
        &mut self,
        address: u32,
        count: usize,
    ) -> Result<Vec<u16>, TransportError> {
        self.record(Call::Read(address, count));
        let state = self.state.borrow();
        if state.failing.contains(&address) {
            return Err(TransportError::Exception("ServerDeviceFailure".to_string()));
        }
        state
            .responses
            .get(&address)
            .cloned()
            .ok_or_else(|| TransportError::Exception("IllegalDataAddress".to_string()))
    }

    async fn write_multiple_registers(
        &mut self,
        address: u32,
        words: &[u16],
    ) -> Result<(), TransportError> {
        self.record(Call::WriteMultiple(address, words.to_vec()));
        if self.state.borrow().failing.contains(&address) {
            return Err(TransportError::Exception("IllegalDataAddress".to_string()));
        }
        Ok(())
    }

    async fn write_single_register(&mut self, address: u32, word: u16) -> Result<(), TransportError> {
        self.record(Call::WriteSingle(address, word));
        if self.state.borrow().failing.contains(&address) {
            return Err(TransportError::Exception("IllegalDataAddress".to_string()));
        }
        Ok(())
    }

    async fn close(self) {
        self.record(Call::Close);
    }
}
