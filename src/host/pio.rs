//! Byte packing between the scatter list and the 32-bit data port.

use log::{error, trace};

use super::{Au6601Host, CtrlState};
use crate::bus::CardBus;
use crate::platform::HostPlatform;
use crate::regs::AU6601_BUFFER;
use crate::request::DataDirection;

/// Iteration state over the scatter list. Guarded by the dedicated pio lock;
/// reset at the start of every data phase.
#[derive(Debug, Clone, Copy)]
pub(super) struct SgCursor {
    /// Index of the current scatter segment.
    seg: usize,
    /// Byte offset within the current segment.
    off: usize,
}

impl SgCursor {
    pub(super) const fn new() -> Self {
        Self { seg: 0, off: 0 }
    }

    pub(super) fn reset(&mut self) {
        *self = Self::new();
    }
}

impl<B: CardBus, P: HostPlatform> Au6601Host<B, P> {
    /// Moves exactly one block, then decrements the remaining-block counter.
    /// No-op once the counter reaches zero.
    pub(super) fn transfer_pio(&self, st: &mut CtrlState) {
        if st.blocks == 0 {
            return;
        }
        let Some(dir) = st.data_mut().map(|d| d.dir) else {
            error!("pio transfer with no data phase");
            return;
        };

        match dir {
            DataDirection::Read => self.read_block_pio(st),
            DataDirection::Write => self.write_block_pio(st),
        }

        st.blocks -= 1;
        trace!("pio block done, {} remaining", st.blocks);
    }

    /// Drains one block from the data port into the scatter list. Each port
    /// read yields four bytes, consumed least-significant first; the cursor
    /// carries across segment boundaries.
    fn read_block_pio(&self, st: &mut CtrlState) {
        let mut cur = self.pio.lock();
        let Some(data) = st.data_mut() else {
            return;
        };

        let mut remaining = data.block_size as usize;
        let mut scratch = 0u32;
        let mut chunk = 0usize;

        while remaining > 0 {
            let Some(seg) = data.sg.get_mut(cur.seg) else {
                // geometry is validated at Data::new, this is a defect
                error!("scatter list exhausted mid-block");
                return;
            };
            if cur.off >= seg.len() {
                cur.seg += 1;
                cur.off = 0;
                continue;
            }

            if chunk == 0 {
                scratch = self.bus.read_reg32(AU6601_BUFFER);
                chunk = 4;
            }
            seg[cur.off] = scratch as u8;
            scratch >>= 8;
            chunk -= 1;
            cur.off += 1;
            remaining -= 1;
        }
    }

    /// The inverse of [`Self::read_block_pio`]: accumulates up to four
    /// scatter bytes least-significant first and writes the word out. A
    /// partial accumulator is flushed exactly once, at the very end of the
    /// block.
    fn write_block_pio(&self, st: &mut CtrlState) {
        let mut cur = self.pio.lock();
        let Some(data) = st.data_mut() else {
            return;
        };

        let mut remaining = data.block_size as usize;
        let mut scratch = 0u32;
        let mut chunk = 0usize;

        while remaining > 0 {
            let Some(seg) = data.sg.get(cur.seg) else {
                error!("scatter list exhausted mid-block");
                return;
            };
            if cur.off >= seg.len() {
                cur.seg += 1;
                cur.off = 0;
                continue;
            }

            scratch |= (seg[cur.off] as u32) << (chunk * 8);
            chunk += 1;
            cur.off += 1;
            remaining -= 1;

            if chunk == 4 || remaining == 0 {
                self.bus.write_reg32(scratch, AU6601_BUFFER);
                chunk = 0;
                scratch = 0;
            }
        }
    }
}
