//! Completion/recovery scheduler: deferred work and the timeout watchdog.

use log::error;

use super::{Au6601Host, CARD_DEBOUNCE_MS, CtrlState, PendingWork};
use crate::bus::CardBus;
use crate::err::MciError;
use crate::platform::{DeferredWork, HostPlatform};
use crate::regs::{RST_CMD, RST_DATA};

impl<B: CardBus, P: HostPlatform> Au6601Host<B, P> {
    /// Queues the request-finish work unless it is already pending.
    pub(super) fn schedule_finish(&self, st: &mut CtrlState) {
        if st.pending.contains(PendingWork::FINISH) {
            return;
        }
        st.pending.insert(PendingWork::FINISH);
        self.platform.schedule(DeferredWork::FinishRequest);
    }

    /// Queues the card-presence work unless it is already pending.
    pub(super) fn schedule_card(&self, st: &mut CtrlState) {
        if st.pending.contains(PendingWork::CARD) {
            return;
        }
        st.pending.insert(PendingWork::CARD);
        self.platform.schedule(DeferredWork::CardPresence);
    }

    /// Card-presence deferred work. Runs outside interrupt context; the
    /// debounce delay is delegated to the issuer's detection subsystem.
    pub fn card_work(&self) {
        let mut st = self.state.lock();
        st.pending.remove(PendingWork::CARD);
        drop(st);

        self.platform.card_presence_changed(CARD_DEBOUNCE_MS);
    }

    /// Request-finish deferred work: the single terminal path of every
    /// request. Runs outside interrupt context so the abort polling may
    /// sleep.
    pub fn finish_work(&self) {
        let mut st = self.state.lock();
        st.pending.remove(PendingWork::FINISH);

        // Rescheduled after an intervening completion; nothing to do.
        let Some(mrq) = st.mrq.take() else {
            return;
        };

        self.platform.timer_disarm();

        // The controller needs its internal state machines reset after any
        // error before it will accept the next request.
        if mrq.first_error().is_some() {
            self.reset_engine(RST_CMD);
            self.reset_engine(RST_DATA);
        }

        st.cmd = None;
        st.data_active = false;
        st.data_early = false;
        st.blocks = 0;

        drop(st);
        self.platform.request_done(mrq);
    }

    /// Watchdog expiry. Forces the same terminal path a hardware error
    /// takes. The request-still-active check guards against racing a late
    /// interrupt that already completed the request.
    pub fn handle_timeout(&self) {
        let mut st = self.state.lock();
        if st.mrq.is_none() {
            return;
        }
        error!("timeout waiting for hardware interrupt");

        if let Some(snap) = st.snap.as_mut() {
            snap.record(&self.bus);
        }

        if st.data_active {
            if let Some(data) = st.data_mut() {
                data.error = Some(MciError::Timeout);
            }
            self.finish_data(&mut st);
        } else {
            if let Some(cmd) = st.active_cmd_mut() {
                cmd.error = Some(MciError::Timeout);
            } else if let Some(cmd) = st.mrq.as_mut().and_then(|m| m.cmd.as_mut()) {
                cmd.error = Some(MciError::Timeout);
            }
            self.schedule_finish(&mut st);
        }
    }
}
