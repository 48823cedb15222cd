//! Slot power and bus-width control.

use log::debug;

use super::Au6601Host;
use crate::bus::CardBus;
use crate::platform::HostPlatform;
use crate::regs::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerMode {
    Off,
    Up,
    On,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusWidth {
    One,
    Four,
}

/// Power rail selector bits shared by [`AU6601_POWER_CTRL`] and
/// [`AU6601_POWER_AUX`]:
/// - `0x8`: Vcc only
/// - `0x1`: Vcc and the remaining pins
/// - `0x1 | 0x8`: like `0x1` with DAT2 off
const RAIL_FULL: u8 = 0x1;
const RAIL_VCC: u8 = 0x8;

impl<B: CardBus, P: HostPlatform> Au6601Host<B, P> {
    /// Applies slot power and bus width. Clock-rate programming is the
    /// platform layer's job and is not handled here.
    pub fn set_ios(&self, power: PowerMode, width: BusWidth) {
        let _st = self.state.lock();

        match width {
            BusWidth::One => {
                debug!("bus width 1");
                self.bus.write_reg8(0x0, AU6601_BUS_WIDTH);
                self.clear_set_reg86(0xc0, 0);
            }
            BusWidth::Four => {
                debug!("bus width 4");
                self.bus.write_reg8(0x20, AU6601_BUS_WIDTH);
                self.clear_set_reg86(0, 0xc0);
            }
        }

        match power {
            PowerMode::Off => self.set_power(RAIL_FULL | RAIL_VCC, false),
            // Power-up deliberately takes the single-step power-on path;
            // the hardware does not need a separate Vcc-only stage.
            PowerMode::Up | PowerMode::On => self.set_power(RAIL_FULL, true),
        }

        self.bus.write_reg8(0x80, AU6601_XFER_CTRL);
        self.bus.write_reg8(0x7d, REG_69);
        let _ = self.bus.read_reg8(REG_74);
    }

    /// Raises or drops the selected rails on both power registers, with the
    /// settle delay the hardware wants between them on the way up.
    pub(super) fn set_power(&self, rails: u8, on: bool) {
        let ctrl = self.bus.read_reg8(AU6601_POWER_CTRL);
        let aux = self.bus.read_reg8(AU6601_POWER_AUX);
        if on {
            self.bus.write_reg8(ctrl | rails, AU6601_POWER_CTRL);
            self.platform.delay_ms(20);
            self.bus.write_reg8(aux | rails, AU6601_POWER_AUX);
        } else {
            self.bus.write_reg8(aux & !rails, AU6601_POWER_AUX);
            self.bus.write_reg8(ctrl & !rails, AU6601_POWER_CTRL);
        }
    }

    fn clear_set_reg86(&self, clear: u32, set: u32) {
        let mut val = self.bus.read_reg32(REG_86);
        val &= !clear;
        val |= set;
        self.bus.write_reg32(val, REG_86);
    }
}
