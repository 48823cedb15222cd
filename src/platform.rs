//! Platform services the engine depends on but does not implement.

use crate::request::Request;

/// Deferred-work units. Both run outside interrupt context and may sleep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeferredWork {
    /// Run [`crate::Au6601Host::card_work`].
    CardPresence,
    /// Run [`crate::Au6601Host::finish_work`].
    FinishRequest,
}

/// Timer, scheduling and notification hooks supplied by the environment.
///
/// `schedule` must only enqueue; the host re-enters through `card_work` /
/// `finish_work` when the work actually runs. `request_done` and
/// `card_presence_changed` are invoked by the host with no lock held.
pub trait HostPlatform {
    /// Enqueue a deferred-work unit. The host already coalesces duplicate
    /// pending units, so every call corresponds to at most one run.
    fn schedule(&self, work: DeferredWork);

    /// Arm (or re-arm) the one-shot watchdog, in whole time-units tied to
    /// the platform tick rate.
    fn timer_arm(&self, units: u32);

    fn timer_disarm(&self);

    /// Completion notification; hands the request back to the issuer with
    /// its final error and byte-count fields.
    fn request_done(&self, request: Request);

    /// Card insertion/removal notification. `debounce_ms` is the settle
    /// delay the issuer should apply before rescanning.
    fn card_presence_changed(&self, debounce_ms: u32);

    /// Millisecond sleep used by the bounded abort-poll loops.
    fn delay_ms(&self, ms: u32);
}

impl<T: HostPlatform + ?Sized> HostPlatform for &T {
    fn schedule(&self, work: DeferredWork) {
        (**self).schedule(work)
    }

    fn timer_arm(&self, units: u32) {
        (**self).timer_arm(units)
    }

    fn timer_disarm(&self) {
        (**self).timer_disarm()
    }

    fn request_done(&self, request: Request) {
        (**self).request_done(request)
    }

    fn card_presence_changed(&self, debounce_ms: u32) {
        (**self).card_presence_changed(debounce_ms)
    }

    fn delay_ms(&self, ms: u32) {
        (**self).delay_ms(ms)
    }
}
