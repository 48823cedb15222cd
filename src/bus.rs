//! Typed access to the controller register window.

use log::debug;

use crate::regs::SNAPSHOT_REGS;

/// Byte/word/double-word accessors over the mapped register window.
///
/// Memory-mapped I/O is assumed reachable for as long as the controller is
/// attached, so none of these return errors.
pub trait CardBus {
    fn read_reg8(&self, offset: u32) -> u8;
    fn read_reg32(&self, offset: u32) -> u32;
    fn write_reg8(&self, value: u8, offset: u32);
    fn write_reg16(&self, value: u16, offset: u32);
    fn write_reg32(&self, value: u32, offset: u32);
}

impl<T: CardBus + ?Sized> CardBus for &T {
    fn read_reg8(&self, offset: u32) -> u8 {
        (**self).read_reg8(offset)
    }

    fn read_reg32(&self, offset: u32) -> u32 {
        (**self).read_reg32(offset)
    }

    fn write_reg8(&self, value: u8, offset: u32) {
        (**self).write_reg8(value, offset)
    }

    fn write_reg16(&self, value: u16, offset: u32) {
        (**self).write_reg16(value, offset)
    }

    fn write_reg32(&self, value: u32, offset: u32) {
        (**self).write_reg32(value, offset)
    }
}

/// Volatile MMIO implementation over an ioremapped base address.
#[derive(Debug, Clone, Copy)]
pub struct MmioBus {
    base: usize,
}

impl MmioBus {
    /// # Safety
    ///
    /// `base` must point at a mapped AU6601 register window that stays valid
    /// for the lifetime of the returned bus.
    pub const unsafe fn new(base: usize) -> Self {
        Self { base }
    }
}

impl CardBus for MmioBus {
    #[inline]
    fn read_reg8(&self, offset: u32) -> u8 {
        unsafe { core::ptr::read_volatile((self.base + offset as usize) as *const u8) }
    }

    #[inline]
    fn read_reg32(&self, offset: u32) -> u32 {
        unsafe { core::ptr::read_volatile((self.base + offset as usize) as *const u32) }
    }

    #[inline]
    fn write_reg8(&self, value: u8, offset: u32) {
        unsafe { core::ptr::write_volatile((self.base + offset as usize) as *mut u8, value) }
    }

    #[inline]
    fn write_reg16(&self, value: u16, offset: u32) {
        unsafe { core::ptr::write_volatile((self.base + offset as usize) as *mut u16, value) }
    }

    #[inline]
    fn write_reg32(&self, value: u32, offset: u32) {
        unsafe { core::ptr::write_volatile((self.base + offset as usize) as *mut u32, value) }
    }
}

const SNAPSHOT_LEN: usize = SNAPSHOT_REGS.len();

/// Two-slot capture of the fixed register list for post-mortem comparison.
///
/// Recording reads every listed register once and logs any value that changed
/// since the previous capture. Purely diagnostic; capture order matches the
/// table and never interleaves with engine register traffic because callers
/// hold the controller lock.
#[derive(Debug)]
pub struct RegSnapshot {
    slots: [[u32; SNAPSHOT_LEN]; 2],
    filled: [bool; 2],
    next: usize,
}

impl RegSnapshot {
    pub const fn new() -> Self {
        Self {
            slots: [[0; SNAPSHOT_LEN]; 2],
            filled: [false, false],
            next: 0,
        }
    }

    pub fn record<B: CardBus>(&mut self, bus: &B) {
        let cur = self.next;
        for (i, &(reg, width)) in SNAPSHOT_REGS.iter().enumerate() {
            self.slots[cur][i] = match width {
                1 => bus.read_reg8(reg) as u32,
                2 => {
                    // no 16-bit read port on the bus; two byte reads
                    let lo = bus.read_reg8(reg) as u32;
                    let hi = bus.read_reg8(reg + 1) as u32;
                    lo | (hi << 8)
                }
                _ => bus.read_reg32(reg),
            };
        }
        self.filled[cur] = true;

        let prev = cur ^ 1;
        if self.filled[prev] {
            for (i, &(reg, _)) in SNAPSHOT_REGS.iter().enumerate() {
                if self.slots[prev][i] != self.slots[cur][i] {
                    debug!(
                        "reg {:#04x}: {:#010x} -> {:#010x}",
                        reg, self.slots[prev][i], self.slots[cur][i]
                    );
                }
            }
        }
        self.next = prev;
    }
}

impl Default for RegSnapshot {
    fn default() -> Self {
        Self::new()
    }
}
