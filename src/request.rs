//! Issuer-facing request, command and data descriptors.

use alloc::vec::Vec;

use crate::err::{MciError, MciResult};
use crate::regs::{AU6601_MAX_BLOCK_COUNT, AU6601_MAX_BLOCK_LENGTH, AU6601_MAX_REQUEST_BYTES};

/// Expected response shape of a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseType {
    None,
    /// Short 48-bit response.
    R1,
    /// Short response with a busy phase on the data line.
    R1b,
    /// Long 136-bit response.
    R2,
    /// Short response without CRC (OCR style).
    R3,
}

impl ResponseType {
    pub fn is_busy(self) -> bool {
        self == ResponseType::R1b
    }

    pub fn is_present(self) -> bool {
        self != ResponseType::None
    }

    pub fn is_long(self) -> bool {
        self == ResponseType::R2
    }
}

/// Which slot of the request a command occupies.
///
/// The engine keeps track of the in-flight command by role instead of by
/// pointer identity, so the set-block-count handoff in `finish_command` is an
/// explicit tag check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmdRole {
    Primary,
    BlockCountSetup,
    Stop,
}

/// One protocol command/response exchange with the card.
#[derive(Debug, Clone)]
pub struct Command {
    pub opcode: u8,
    pub arg: u32,
    pub resp: ResponseType,
    pub role: CmdRole,
    /// Issuer-declared worst case, used to stretch the watchdog for long
    /// busy commands such as erase.
    pub timeout_ms: u32,
    /// Captured response words; `[0]` for short shapes, all four for R2.
    pub response: [u32; 4],
    pub error: Option<MciError>,
}

impl Command {
    pub fn new(opcode: u8, arg: u32, resp: ResponseType) -> Self {
        Self {
            opcode,
            arg,
            resp,
            role: CmdRole::Primary,
            timeout_ms: 0,
            response: [0; 4],
            error: None,
        }
    }

    pub fn with_role(mut self, role: CmdRole) -> Self {
        self.role = role;
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u32) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataDirection {
    Read,
    Write,
}

/// Block-oriented transfer descriptor tied to the primary command.
///
/// The scatter list is a sequence of owned buffers forming one logical
/// buffer; reads fill it, writes drain it.
#[derive(Debug)]
pub struct Data {
    pub dir: DataDirection,
    pub block_size: u32,
    pub block_count: u32,
    pub sg: Vec<Vec<u8>>,
    pub bytes_xfered: u32,
    pub error: Option<MciError>,
    /// CMD12 companion for open-ended multi-block transfers.
    pub stop: Option<Command>,
}

impl Data {
    /// Validates the transfer geometry against the hardware limits. The
    /// engine treats a `Data` that bypassed this check as a programming
    /// defect.
    pub fn new(
        dir: DataDirection,
        block_size: u32,
        block_count: u32,
        sg: Vec<Vec<u8>>,
    ) -> MciResult<Self> {
        if block_size == 0 || block_size > AU6601_MAX_BLOCK_LENGTH {
            return Err(MciError::Configuration);
        }
        if block_count == 0 || block_count > AU6601_MAX_BLOCK_COUNT {
            return Err(MciError::Configuration);
        }
        let total = (block_size as u64) * (block_count as u64);
        if total > AU6601_MAX_REQUEST_BYTES as u64 {
            return Err(MciError::Configuration);
        }
        let capacity: u64 = sg.iter().map(|seg| seg.len() as u64).sum();
        if capacity < total {
            return Err(MciError::Configuration);
        }
        Ok(Self {
            dir,
            block_size,
            block_count,
            sg,
            bytes_xfered: 0,
            error: None,
            stop: None,
        })
    }

    pub fn with_stop(mut self, stop: Command) -> Self {
        self.stop = Some(stop.with_role(CmdRole::Stop));
        self
    }

    pub fn total_bytes(&self) -> u32 {
        self.block_size * self.block_count
    }
}

/// One issuer-submitted unit of work. Owned exclusively by the engine from
/// submission until the completion notification hands it back.
#[derive(Debug)]
pub struct Request {
    pub cmd: Option<Command>,
    /// Companion CMD23, issued before the primary command when present.
    pub sbc: Option<Command>,
    pub data: Option<Data>,
}

impl Request {
    pub fn new(cmd: Command) -> Self {
        Self {
            cmd: Some(cmd.with_role(CmdRole::Primary)),
            sbc: None,
            data: None,
        }
    }

    pub fn with_sbc(mut self, sbc: Command) -> Self {
        self.sbc = Some(sbc.with_role(CmdRole::BlockCountSetup));
        self
    }

    pub fn with_data(mut self, data: Data) -> Self {
        self.data = Some(data);
        self
    }

    /// First error recorded anywhere on the request, if any.
    pub fn first_error(&self) -> Option<MciError> {
        if let Some(err) = self.cmd.as_ref().and_then(|c| c.error) {
            return Some(err);
        }
        if let Some(err) = self.sbc.as_ref().and_then(|c| c.error) {
            return Some(err);
        }
        if let Some(data) = self.data.as_ref() {
            if let Some(err) = data.error {
                return Some(err);
            }
            if let Some(err) = data.stop.as_ref().and_then(|s| s.error) {
                return Some(err);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    fn sg(len: usize) -> Vec<Vec<u8>> {
        vec![vec![0u8; len]]
    }

    #[test]
    fn geometry_within_limits_is_accepted() {
        // 512 * 1024 hits the 524288-byte cap exactly
        assert!(Data::new(DataDirection::Read, 512, 1024, sg(524288)).is_ok());
        assert!(Data::new(DataDirection::Write, 64, 2, sg(128)).is_ok());
    }

    #[test]
    fn oversized_block_length_is_rejected() {
        let err = Data::new(DataDirection::Read, 513, 1, sg(1024)).unwrap_err();
        assert_eq!(err, MciError::Configuration);
    }

    #[test]
    fn oversized_block_count_is_rejected() {
        let err = Data::new(DataDirection::Read, 1, 65537, sg(131072)).unwrap_err();
        assert_eq!(err, MciError::Configuration);
    }

    #[test]
    fn product_cap_applies_even_at_individual_limits() {
        // 512 and 65536 are each in range but the product is far past the cap
        let err = Data::new(DataDirection::Read, 512, 65536, sg(1 << 25)).unwrap_err();
        assert_eq!(err, MciError::Configuration);
    }

    #[test]
    fn short_scatter_list_is_rejected() {
        let err = Data::new(DataDirection::Read, 512, 2, sg(512)).unwrap_err();
        assert_eq!(err, MciError::Configuration);
    }
}
