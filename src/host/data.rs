//! Data session engine: block setup, interrupt routing and teardown.

use log::error;

use super::{Au6601Host, CtrlState};
use crate::bus::CardBus;
use crate::err::MciError;
use crate::platform::HostPlatform;
use crate::regs::*;
use crate::request::{CmdRole, DataDirection};

impl<B: CardBus, P: HostPlatform> Au6601Host<B, P> {
    /// Arms a data phase for the primary command. No-op without a data
    /// descriptor. Geometry is validated when the [`crate::request::Data`]
    /// is built; a descriptor that bypassed that gate is a programming
    /// defect.
    pub(super) fn prepare_data(&self, st: &mut CtrlState) {
        debug_assert!(!st.data_active, "data phase already armed");

        let blocks = {
            let Some(data) = st.data_mut() else {
                return;
            };
            debug_assert!(data.block_size <= AU6601_MAX_BLOCK_LENGTH);
            debug_assert!(data.block_count <= AU6601_MAX_BLOCK_COUNT);
            debug_assert!(data.total_bytes() <= AU6601_MAX_REQUEST_BYTES);
            data.bytes_xfered = 0;
            data.block_count
        };

        st.data_active = true;
        st.data_early = false;
        st.blocks = blocks;
        self.pio.lock().reset();

        self.trigger_data_transfer(st);
    }

    /// Writes the block size and kicks off one block in the configured
    /// direction.
    pub(super) fn trigger_data_transfer(&self, st: &mut CtrlState) {
        let Some(data) = st.data_mut() else {
            error!("transfer trigger with no data phase");
            return;
        };
        self.bus.write_reg32(data.block_size, AU6601_BLOCK_SIZE);
        let ctrl = match data.dir {
            DataDirection::Write => XFER_WRITE,
            DataDirection::Read => 0,
        };
        self.bus.write_reg8(ctrl | XFER_START, AU6601_XFER_CTRL);
    }

    /// Data-category interrupt. `mask` is pre-filtered to data bits.
    pub(super) fn data_irq(&self, st: &mut CtrlState, mask: IntStatus) {
        debug_assert!(!mask.is_empty());

        if !st.data_active {
            // "Data complete" doubles as "busy ended" for R1b commands.
            let busy_cmd = {
                let cmd = match (st.cmd, st.mrq.as_ref()) {
                    (Some(CmdRole::Primary), Some(m)) => m.cmd.as_ref(),
                    (Some(CmdRole::BlockCountSetup), Some(m)) => m.sbc.as_ref(),
                    (Some(CmdRole::Stop), Some(m)) => {
                        m.data.as_ref().and_then(|d| d.stop.as_ref())
                    }
                    _ => None,
                };
                cmd.is_some_and(|c| c.resp.is_busy())
            };
            if busy_cmd && mask.contains(IntStatus::DATA_END) {
                self.finish_command(st);
                return;
            }

            error!(
                "data interrupt {:#010x} with no data phase in flight",
                mask.bits()
            );
            if mask.intersects(IntStatus::ERROR_MASK) {
                if let Some(cmd) = st.active_cmd_mut() {
                    cmd.error = Some(MciError::Timeout);
                } else if let Some(cmd) = st.mrq.as_mut().and_then(|m| m.cmd.as_mut()) {
                    cmd.error = Some(MciError::Timeout);
                }
                self.schedule_finish(st);
            }
            return;
        }

        // Precedence: timeout, then end-bit, then CRC. Only one is recorded.
        let err = if mask.contains(IntStatus::DATA_TIMEOUT) {
            Some(MciError::Timeout)
        } else if mask.contains(IntStatus::DATA_END_BIT) {
            Some(MciError::Protocol)
        } else if mask.contains(IntStatus::DATA_CRC) {
            Some(MciError::Protocol)
        } else {
            None
        };

        if err.is_some() {
            if let Some(data) = st.data_mut() {
                data.error = err;
            }
            self.finish_data(st);
            return;
        }

        if mask.intersects(IntStatus::DATA_AVAIL | IntStatus::SPACE_AVAIL) {
            self.transfer_pio(st);
        }

        if mask.contains(IntStatus::DATA_END) {
            if st.cmd.is_some() {
                // Data beat the command response; finish in order once the
                // command completes.
                st.data_early = true;
            } else if st.blocks > 0 {
                self.trigger_data_transfer(st);
            } else {
                self.finish_data(st);
            }
        }
    }

    /// Tears the data phase down and decides what runs next: the stop
    /// command (with engine resets first on error) or request completion.
    ///
    /// The phase is detached before anything else so a nested stop command
    /// can start safely.
    pub(super) fn finish_data(&self, st: &mut CtrlState) {
        debug_assert!(st.data_active || st.data_early);
        st.data_active = false;
        st.data_early = false;

        let (error, need_stop) = {
            let Some(mrq) = st.mrq.as_mut() else {
                error!("finish_data with no request in flight");
                return;
            };
            let Some(data) = mrq.data.as_mut() else {
                error!("finish_data with no data descriptor");
                return;
            };
            // The block-count register is useless to read back, so assume
            // nothing reached the card on error.
            data.bytes_xfered = if data.error.is_some() {
                0
            } else {
                data.total_bytes()
            };
            // CMD12 is needed for an open-ended multi-block transfer (no
            // CMD23) and after any error in a multi-block transfer.
            let need_stop = data.stop.is_some() && (data.error.is_some() || mrq.sbc.is_none());
            (data.error, need_stop)
        };

        if need_stop {
            if error.is_some() {
                // Internal state machines need a reset before the stop
                // command can go out.
                self.reset_engine(RST_CMD);
                self.reset_engine(RST_DATA);
            }
            self.send_cmd(st, CmdRole::Stop);
        } else {
            self.schedule_finish(st);
        }
    }
}
