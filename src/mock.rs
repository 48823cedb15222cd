//! Register-file bus and recording platform used by the engine tests.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Mutex;

use crate::bus::CardBus;
use crate::platform::{DeferredWork, HostPlatform};
use crate::regs::{AU6601_BUFFER, AU6601_INT_STATUS, AU6601_SW_RESET};
use crate::request::Request;

/// In-memory register file with data-port FIFOs and a write journal.
///
/// Interrupt-status writes acknowledge (clear) bits, reset strobes
/// self-clear, reads from the data port pop pre-loaded words and writes to
/// it are captured.
#[derive(Default)]
pub struct MockBus {
    regs: Mutex<BTreeMap<u32, u32>>,
    rx: Mutex<VecDeque<u32>>,
    tx: Mutex<Vec<u32>>,
    journal: Mutex<Vec<(u32, u32)>>,
}

impl MockBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_reg(&self, offset: u32, value: u32) {
        self.regs.lock().unwrap().insert(offset, value);
    }

    /// Latches interrupt-status bits the way the hardware would.
    pub fn raise(&self, bits: u32) {
        let mut regs = self.regs.lock().unwrap();
        let cur = regs.get(&AU6601_INT_STATUS).copied().unwrap_or(0);
        regs.insert(AU6601_INT_STATUS, cur | bits);
    }

    /// Pre-loads words served through the data port.
    pub fn push_rx(&self, words: &[u32]) {
        self.rx.lock().unwrap().extend(words.iter().copied());
    }

    /// Words the engine pushed through the data port.
    pub fn tx_words(&self) -> Vec<u32> {
        self.tx.lock().unwrap().clone()
    }

    /// Every value written to `offset`, oldest first.
    pub fn writes_to(&self, offset: u32) -> Vec<u32> {
        self.journal
            .lock()
            .unwrap()
            .iter()
            .filter(|(off, _)| *off == offset)
            .map(|&(_, val)| val)
            .collect()
    }

    fn record(&self, offset: u32, value: u32) {
        self.journal.lock().unwrap().push((offset, value));
        let mut regs = self.regs.lock().unwrap();
        match offset {
            // ack-by-writeback
            AU6601_INT_STATUS => {
                let cur = regs.get(&offset).copied().unwrap_or(0);
                regs.insert(offset, cur & !value);
            }
            // reset strobes complete instantly
            AU6601_SW_RESET => {
                regs.insert(offset, 0);
            }
            _ => {
                regs.insert(offset, value);
            }
        }
    }
}

impl CardBus for MockBus {
    fn read_reg8(&self, offset: u32) -> u8 {
        self.regs.lock().unwrap().get(&offset).copied().unwrap_or(0) as u8
    }

    fn read_reg32(&self, offset: u32) -> u32 {
        if offset == AU6601_BUFFER {
            return self.rx.lock().unwrap().pop_front().unwrap_or(0);
        }
        self.regs.lock().unwrap().get(&offset).copied().unwrap_or(0)
    }

    fn write_reg8(&self, value: u8, offset: u32) {
        self.record(offset, value as u32);
    }

    fn write_reg16(&self, value: u16, offset: u32) {
        self.record(offset, value as u32);
    }

    fn write_reg32(&self, value: u32, offset: u32) {
        if offset == AU6601_BUFFER {
            self.journal.lock().unwrap().push((offset, value));
            self.tx.lock().unwrap().push(value);
            return;
        }
        self.record(offset, value);
    }
}

/// Records every platform call the engine makes.
#[derive(Default)]
pub struct MockPlatform {
    pub scheduled: Mutex<Vec<DeferredWork>>,
    pub timer_arms: Mutex<Vec<u32>>,
    pub timer_disarms: Mutex<u32>,
    pub done: Mutex<Vec<Request>>,
    pub presence: Mutex<Vec<u32>>,
}

impl MockPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take_done(&self) -> Vec<Request> {
        std::mem::take(&mut self.done.lock().unwrap())
    }

    pub fn scheduled_count(&self, work: DeferredWork) -> usize {
        self.scheduled
            .lock()
            .unwrap()
            .iter()
            .filter(|&&w| w == work)
            .count()
    }
}

impl HostPlatform for MockPlatform {
    fn schedule(&self, work: DeferredWork) {
        self.scheduled.lock().unwrap().push(work);
    }

    fn timer_arm(&self, units: u32) {
        self.timer_arms.lock().unwrap().push(units);
    }

    fn timer_disarm(&self) {
        *self.timer_disarms.lock().unwrap() += 1;
    }

    fn request_done(&self, request: Request) {
        self.done.lock().unwrap().push(request);
    }

    fn card_presence_changed(&self, debounce_ms: u32) {
        self.presence.lock().unwrap().push(debounce_ms);
    }

    fn delay_ms(&self, _ms: u32) {}
}
