//! AU6601 host engine: controller state, lifecycle and request submission.
//!
//! Three execution contexts reach the engine: the issuer through
//! [`Au6601Host::submit`], the interrupt line through
//! [`Au6601Host::handle_irq`] and the platform timer through
//! [`Au6601Host::handle_timeout`]. All of them serialize on the controller
//! spinlock; the inner [`CtrlState`] is only reachable through methods that
//! take the locked state, so holding the lock is visible in every signature.

mod cmd;
mod data;
mod ios;
mod irq;
mod pio;
mod work;


pub use ios::{BusWidth, PowerMode};

use bitflags::bitflags;
use kspin::SpinNoIrq;
use log::error;

use crate::bus::{CardBus, RegSnapshot};
use crate::err::MciError;
use crate::platform::HostPlatform;
use crate::regs::*;
use crate::request::{CmdRole, Command, Data, Request};
use pio::SgCursor;

/// Debounce delay handed to the issuer on card insert/remove.
pub const CARD_DEBOUNCE_MS: u32 = 200;

/// Default watchdog window, in platform time-units.
const DEFAULT_TIMEOUT_UNITS: u32 = 10;
/// Dataless commands declaring more than this get a stretched watchdog.
const EXTENDED_BUSY_MS: u32 = 9000;

bitflags! {
    /// Deferred work already handed to the platform but not yet run.
    /// Re-scheduling while a unit is pending is a no-op.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    struct PendingWork: u8 {
        const CARD = 0x1;
        const FINISH = 0x2;
    }
}

/// Engine-private shared state, guarded by the controller lock.
pub(crate) struct CtrlState {
    /// The single in-flight request, if any.
    mrq: Option<Request>,
    /// Role of the command currently on the wire.
    cmd: Option<CmdRole>,
    /// A data phase is attached to the hardware.
    data_active: bool,
    /// Data finished before the command response arrived.
    data_early: bool,
    /// Remaining PIO blocks.
    blocks: u32,
    pending: PendingWork,
    snap: Option<RegSnapshot>,
}

impl CtrlState {
    const fn new() -> Self {
        Self {
            mrq: None,
            cmd: None,
            data_active: false,
            data_early: false,
            blocks: 0,
            pending: PendingWork::empty(),
            snap: None,
        }
    }

    fn active_cmd_mut(&mut self) -> Option<&mut Command> {
        let role = self.cmd?;
        let mrq = self.mrq.as_mut()?;
        match role {
            CmdRole::Primary => mrq.cmd.as_mut(),
            CmdRole::BlockCountSetup => mrq.sbc.as_mut(),
            CmdRole::Stop => mrq.data.as_mut().and_then(|d| d.stop.as_mut()),
        }
    }

    fn data_mut(&mut self) -> Option<&mut Data> {
        self.mrq.as_mut()?.data.as_mut()
    }
}

/// The AU6601 command/data engine.
///
/// `B` supplies register access, `P` the timer, deferred-work and
/// notification services. Both seams are traits so the engine runs unchanged
/// against mapped hardware or a register-file mock.
pub struct Au6601Host<B: CardBus, P: HostPlatform> {
    bus: B,
    platform: P,
    state: SpinNoIrq<CtrlState>,
    /// Scatter-cursor lock, finer and stronger than `state`: it is held for
    /// the whole of a block transfer so the 32-bit packing accumulator is
    /// never observed half-filled through the data port.
    pio: SpinNoIrq<SgCursor>,
}

impl<B: CardBus, P: HostPlatform> Au6601Host<B, P> {
    pub fn new(bus: B, platform: P) -> Self {
        Self {
            bus,
            platform,
            state: SpinNoIrq::new(CtrlState::new()),
            pio: SpinNoIrq::new(SgCursor::new()),
        }
    }

    /// Enables before/after register snapshots on interrupt entry and
    /// watchdog expiry. Debug aid, off by default.
    pub fn with_diagnostics(self) -> Self {
        self.state.lock().snap = Some(RegSnapshot::new());
        self
    }

    pub fn card_present(&self) -> bool {
        self.bus.read_reg8(AU6601_DETECT_STATUS) & 0x1 != 0
    }

    /// Submits a request. Exactly one request may be in flight; submitting
    /// while busy is a programming defect.
    ///
    /// With no card present the request never touches hardware: its primary
    /// command is marked `NoMedium` and it short-circuits straight to the
    /// completion path.
    pub fn submit(&self, request: Request) {
        let mut st = self.state.lock();
        assert!(
            st.mrq.is_none(),
            "request submitted while another is in flight"
        );
        st.mrq = Some(request);

        if self.card_present() {
            let first = if st.mrq.as_ref().is_some_and(|m| m.sbc.is_some()) {
                CmdRole::BlockCountSetup
            } else {
                CmdRole::Primary
            };
            self.send_cmd(&mut st, first);
        } else {
            if let Some(cmd) = st.mrq.as_mut().and_then(|m| m.cmd.as_mut()) {
                cmd.error = Some(MciError::NoMedium);
            }
            self.schedule_finish(&mut st);
        }
    }

    /// Brings the controller out of reset and unmasks the interrupt sources
    /// the engine handles. Must run before the first `submit`.
    pub fn attach(&self) {
        let _st = self.state.lock();

        self.bus.write_reg8(0, REG_74);
        self.bus.write_reg8(0, AU6601_DETECT_STATUS);
        self.bus.write_reg8(0x80, AU6601_DETECT_STATUS);

        self.reset_engine(RST_CMD);

        self.bus.write_reg8(0, REG_05);
        self.bus.write_reg8(0x1, REG_75);
        self.clear_set_irqs(
            IntStatus::from_bits_retain(u32::MAX),
            IntStatus::CMD_MASK
                | IntStatus::DATA_MASK
                | IntStatus::CARD_INSERT
                | IntStatus::CARD_REMOVE
                | IntStatus::CARD_INT
                | IntStatus::BUS_POWER,
        );
        self.bus.write_reg32(0, AU6601_BUS_WIDTH);

        self.reset_engine(RST_DATA);

        self.bus.write_reg8(0, REG_05);
        self.bus.write_reg8(0, REG_85);
        self.bus.write_reg8(0x8, REG_75);
        self.bus.write_reg32(0x3d00fa, REG_B4);

        self.set_power(0x1, false);
        self.set_power(0x8, false);
    }

    /// Masks the controller, drains any in-flight request through the normal
    /// completion path and powers the slot down.
    pub fn detach(&self) {
        let mut st = self.state.lock();

        self.bus.write_reg8(0, AU6601_DETECT_STATUS);
        self.clear_set_irqs(IntStatus::from_bits_retain(u32::MAX), IntStatus::empty());

        let drained = st.mrq.take().map(|mut mrq| {
            error!("detach with a request in flight, forcing completion");
            match st.cmd {
                Some(CmdRole::BlockCountSetup) => {
                    if let Some(sbc) = mrq.sbc.as_mut() {
                        sbc.error = Some(MciError::Timeout);
                    }
                }
                Some(CmdRole::Stop) => {
                    if let Some(stop) = mrq.data.as_mut().and_then(|d| d.stop.as_mut()) {
                        stop.error = Some(MciError::Timeout);
                    }
                }
                _ => {
                    if let Some(cmd) = mrq.cmd.as_mut() {
                        cmd.error = Some(MciError::Timeout);
                    }
                }
            }
            mrq
        });
        st.cmd = None;
        st.data_active = false;
        st.data_early = false;
        st.blocks = 0;
        self.platform.timer_disarm();

        self.set_power(0x1, false);
        self.bus.write_reg8(0, REG_85);
        self.bus.write_reg32(0, REG_B4);
        self.set_power(0x8, false);

        drop(st);
        if let Some(mrq) = drained {
            self.platform.request_done(mrq);
        }
    }

    fn clear_set_irqs(&self, clear: IntStatus, set: IntStatus) {
        let mut ier = self.bus.read_reg32(AU6601_INT_ENABLE);
        ier &= !clear.bits();
        ier |= set.bits();
        self.bus.write_reg32(ier, AU6601_INT_ENABLE);
    }

    /// Requests a command (`RST_CMD`) or data (`RST_DATA`) engine reset and
    /// polls for the hardware to acknowledge. Bounded busy-wait; exhaustion
    /// is logged, not escalated, since a stuck engine will fail the next
    /// command visibly anyway.
    fn reset_engine(&self, bits: u8) {
        self.bus.write_reg8(bits | RST_TRIGGER, AU6601_SW_RESET);
        for _ in 0..500 {
            if self.bus.read_reg8(AU6601_SW_RESET) & bits == 0 {
                return;
            }
            self.platform.delay_ms(1);
        }
        error!("engine reset {:#04x} did not complete", bits);
    }
}
