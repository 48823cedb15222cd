//! Command/response engine.

use log::{error, warn};

use super::{Au6601Host, CtrlState, DEFAULT_TIMEOUT_UNITS, EXTENDED_BUSY_MS};
use crate::bus::CardBus;
use crate::err::MciError;
use crate::platform::HostPlatform;
use crate::regs::*;
use crate::request::{CmdRole, Command, Request, ResponseType};

fn cmd_by_role(mrq: &Request, role: CmdRole) -> Option<&Command> {
    match role {
        CmdRole::Primary => mrq.cmd.as_ref(),
        CmdRole::BlockCountSetup => mrq.sbc.as_ref(),
        CmdRole::Stop => mrq.data.as_ref().and_then(|d| d.stop.as_ref()),
    }
}

impl<B: CardBus, P: HostPlatform> Au6601Host<B, P> {
    /// Writes one command to hardware and arms the watchdog. The primary
    /// command's data session is prepared before the opcode goes out.
    pub(super) fn send_cmd(&self, st: &mut CtrlState, role: CmdRole) {
        let (opcode, arg, resp, units) = {
            let Some(mrq) = st.mrq.as_ref() else {
                error!("send_cmd with no request in flight");
                return;
            };
            let Some(cmd) = cmd_by_role(mrq, role) else {
                error!("request carries no {:?} command", role);
                return;
            };
            let carries_data = role == CmdRole::Primary && mrq.data.is_some();
            // Long busy commands (erase) get a stretched window.
            let units = if !carries_data && cmd.timeout_ms > EXTENDED_BUSY_MS {
                cmd.timeout_ms.div_ceil(1000) + 1
            } else {
                DEFAULT_TIMEOUT_UNITS
            };
            (cmd.opcode, cmd.arg, cmd.resp, units)
        };
        self.platform.timer_arm(units);

        st.cmd = Some(role);
        if role == CmdRole::Primary {
            self.prepare_data(st);
        }

        self.bus.write_reg8(opcode | CMD_START, AU6601_CMD_OPCODE);
        // argument goes out most-significant-byte first
        self.bus.write_reg32(arg.to_be(), AU6601_CMD_ARG);

        let ctrl = match resp {
            ResponseType::None => CTRL_RSP_NONE,
            ResponseType::R1 => CTRL_RSP_SHORT,
            ResponseType::R1b => CTRL_RSP_SHORT | CTRL_RSP_BUSY,
            ResponseType::R2 => CTRL_RSP_LONG,
            ResponseType::R3 => CTRL_RSP_R3,
        };
        self.bus.write_reg8(ctrl | CTRL_LATCH, AU6601_CMD_CTRL);
    }

    /// Command-category interrupt. `mask` is pre-filtered to command bits.
    pub(super) fn cmd_irq(&self, st: &mut CtrlState, mask: IntStatus) {
        debug_assert!(!mask.is_empty());

        let Some(role) = st.cmd else {
            error!(
                "command interrupt {:#010x} with no command in flight",
                mask.bits()
            );
            return;
        };
        let carries_data =
            role == CmdRole::Primary && st.mrq.as_ref().is_some_and(|m| m.data.is_some());

        let err = if mask.contains(IntStatus::TIMEOUT) {
            Some(MciError::Timeout)
        } else if mask.intersects(IntStatus::CRC | IntStatus::END_BIT | IntStatus::INDEX) {
            Some(MciError::Protocol)
        } else {
            None
        };

        let (resp, stored) = {
            let Some(cmd) = st.active_cmd_mut() else {
                error!("{:?} command vanished from the request", role);
                return;
            };
            if err.is_some() {
                cmd.error = err;
            }
            (cmd.resp, cmd.error)
        };

        // An error may already be on record from an earlier interrupt or the
        // watchdog; a late RESPONSE must not override it with a clean finish.
        if stored.is_some() {
            self.schedule_finish(st);
            return;
        }

        // The controller overloads "data complete" with "busy ended", so a
        // busy-type response next to a real data phase is ambiguous. Log and
        // carry on; the data interrupt path sorts it out.
        if resp.is_busy() && carries_data {
            warn!("busy-response command issued together with a data transfer");
        }

        if mask.contains(IntStatus::RESPONSE) {
            self.finish_command(st);
        }
    }

    /// Reads back the response words and routes what comes next: the primary
    /// command after CMD23, the completion path, or a data phase that beat
    /// the command to the finish line.
    pub(super) fn finish_command(&self, st: &mut CtrlState) {
        let Some(role) = st.cmd else {
            error!("finish_command with no command in flight");
            return;
        };

        {
            let Some(cmd) = st.active_cmd_mut() else {
                error!("{:?} command vanished from the request", role);
                return;
            };
            if cmd.resp.is_present() {
                cmd.response[0] = u32::from_be(self.bus.read_reg32(AU6601_CMD_RSP0));
                if cmd.resp.is_long() {
                    cmd.response[1] = u32::from_be(self.bus.read_reg32(AU6601_CMD_RSP1));
                    cmd.response[2] = u32::from_be(self.bus.read_reg32(AU6601_CMD_RSP2));
                    cmd.response[3] = u32::from_be(self.bus.read_reg32(AU6601_CMD_RSP3));
                }
            }
            cmd.error = None;
        }
        st.cmd = None;

        if role == CmdRole::BlockCountSetup {
            // CMD23 acknowledged, now the actual command.
            self.send_cmd(st, CmdRole::Primary);
        } else if !st.data_active {
            self.schedule_finish(st);
        } else if st.data_early {
            self.finish_data(st);
        }
    }
}
