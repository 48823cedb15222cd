//! Interrupt dispatcher: the single entry point woken by the hardware line.

use log::{debug, warn};

use super::Au6601Host;
use crate::bus::CardBus;
use crate::platform::HostPlatform;
use crate::regs::{AU6601_INT_STATUS, IntStatus};

impl<B: CardBus, P: HostPlatform> Au6601Host<B, P> {
    /// Classifies and routes one interrupt. Returns `false` for a spurious
    /// wakeup (status reads zero or all-ones), in which case nothing was
    /// acknowledged.
    ///
    /// Every set status bit is acknowledged by writing it back, including
    /// bits the engine does not understand; an unacknowledged bit would
    /// retrigger the line indefinitely.
    pub fn handle_irq(&self) -> bool {
        let mut st = self.state.lock();

        if let Some(snap) = st.snap.as_mut() {
            snap.record(&self.bus);
        }

        let raw = self.bus.read_reg32(AU6601_INT_STATUS);
        if raw == 0 || raw == u32::MAX {
            warn!("spurious interrupt, status {:#010x}", raw);
            return false;
        }
        let mut intmask = IntStatus::from_bits_retain(raw);

        if intmask.intersects(IntStatus::CARD_MASK) {
            if intmask.contains(IntStatus::CARD_REMOVE) {
                debug!("card removed");
            } else {
                debug!("card inserted");
            }
            self.bus.write_reg8(
                (intmask & IntStatus::CARD_MASK).bits() as u8,
                AU6601_INT_STATUS,
            );
            intmask.remove(IntStatus::CARD_MASK);
            self.schedule_card(&mut st);
        }

        if intmask.intersects(IntStatus::TIMEOUT | IntStatus::DATA_TIMEOUT) {
            debug!("timeout bits in status {:#010x}", intmask.bits());
        }

        if intmask.intersects(IntStatus::CMD_MASK) {
            self.bus
                .write_reg32((intmask & IntStatus::CMD_MASK).bits(), AU6601_INT_STATUS);
            self.cmd_irq(&mut st, intmask & IntStatus::CMD_MASK);
            intmask.remove(IntStatus::CMD_MASK);
        }

        if intmask.intersects(IntStatus::DATA_MASK) {
            self.bus
                .write_reg32((intmask & IntStatus::DATA_MASK).bits(), AU6601_INT_STATUS);
            self.data_irq(&mut st, intmask & IntStatus::DATA_MASK);
            intmask.remove(IntStatus::DATA_MASK);
        }

        if intmask.contains(IntStatus::CARD_INT) {
            warn!("card interrupt, status {:#010x}", intmask.bits());
            self.bus
                .write_reg32(IntStatus::CARD_INT.bits(), AU6601_INT_STATUS);
            intmask.remove(IntStatus::CARD_INT);
        }

        if !intmask.is_empty() {
            warn!("unhandled interrupt bits {:#010x}", intmask.bits());
            self.bus.write_reg32(intmask.bits(), AU6601_INT_STATUS);
        }

        true
    }
}
