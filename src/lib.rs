//! Host engine for the Alcor Micro AU6601 SD/MMC controller.
//!
//! The crate implements the command/response exchange, the PIO data path
//! through the controller's 32-bit port, interrupt classification and the
//! error-recovery/completion machinery. Register access and platform
//! services (one-shot timer, deferred work, issuer notification) enter
//! through the [`CardBus`] and [`HostPlatform`] traits, so the engine is
//! agnostic to how the register window, interrupt line and timer are
//! obtained.
//!
//! Typical wiring:
//! - route the controller's interrupt line to [`Au6601Host::handle_irq`]
//! - run scheduled [`DeferredWork`] units through [`Au6601Host::card_work`]
//!   and [`Au6601Host::finish_work`]
//! - route timer expiry to [`Au6601Host::handle_timeout`]

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod bus;
pub mod err;
pub mod platform;
pub mod regs;
pub mod request;

mod host;

#[cfg(test)]
pub(crate) mod mock;

pub use bus::{CardBus, MmioBus};
pub use err::{MciError, MciResult};
pub use host::{Au6601Host, BusWidth, CARD_DEBOUNCE_MS, PowerMode};
pub use platform::{DeferredWork, HostPlatform};
pub use request::{CmdRole, Command, Data, DataDirection, Request, ResponseType};
