//! AU6601 register map and interrupt-status bits.
//!
//! Offsets and bit positions are a hardware contract and mirror the vendor
//! layout bit for bit. Registers without a known function keep their raw
//! offset names.

use bitflags::bitflags;

pub const REG_00: u32 = 0x00;
pub const REG_05: u32 = 0x05;
/// 32-bit PIO data port.
pub const AU6601_BUFFER: u32 = 0x08;
pub const REG_0C: u32 = 0x0c;
pub const REG_10: u32 = 0x10;
/// Command opcode, or'ed with [`CMD_START`].
pub const AU6601_CMD_OPCODE: u32 = 0x23;
/// Command argument, most-significant-byte first.
pub const AU6601_CMD_ARG: u32 = 0x24;
/// Response words, big-endian. Long responses continue at 0x34/0x38/0x3c.
pub const AU6601_CMD_RSP0: u32 = 0x30;
pub const AU6601_CMD_RSP1: u32 = 0x34;
pub const AU6601_CMD_RSP2: u32 = 0x38;
pub const AU6601_CMD_RSP3: u32 = 0x3c;
pub const REG_51: u32 = 0x51;
pub const REG_52: u32 = 0x52;
pub const REG_61: u32 = 0x61;
pub const REG_63: u32 = 0x63;
pub const REG_69: u32 = 0x69;
pub const AU6601_BLOCK_SIZE: u32 = 0x6c;
/// Power rail control, paired with [`AU6601_POWER_AUX`].
pub const AU6601_POWER_CTRL: u32 = 0x70;
pub const REG_72: u32 = 0x72;
pub const REG_74: u32 = 0x74;
pub const REG_75: u32 = 0x75;
/// Bit 0 reads back card presence.
pub const AU6601_DETECT_STATUS: u32 = 0x76;
pub const REG_77: u32 = 0x77;
/// Engine reset strobe; see [`RST_CMD`] and [`RST_DATA`].
pub const AU6601_SW_RESET: u32 = 0x79;
pub const AU6601_POWER_AUX: u32 = 0x7a;
pub const REG_7B: u32 = 0x7b;
pub const REG_7C: u32 = 0x7c;
pub const REG_7D: u32 = 0x7d;
pub const REG_7F: u32 = 0x7f;
/// Response-shape control; see the `CTRL_RSP_*` tags.
pub const AU6601_CMD_CTRL: u32 = 0x81;
/// Bus width select (0x00 = 1 bit, 0x20 = 4 bit).
pub const AU6601_BUS_WIDTH: u32 = 0x82;
/// Transfer control: [`XFER_WRITE`] | [`XFER_START`].
pub const AU6601_XFER_CTRL: u32 = 0x83;
pub const REG_84: u32 = 0x84;
pub const REG_85: u32 = 0x85;
pub const REG_86: u32 = 0x86;
pub const AU6601_INT_STATUS: u32 = 0x90;
pub const AU6601_INT_ENABLE: u32 = 0x94;
pub const REG_A1: u32 = 0xa1;
pub const REG_A2: u32 = 0xa2;
pub const REG_A3: u32 = 0xa3;
pub const REG_B0: u32 = 0xb0;
pub const REG_B4: u32 = 0xb4;

/// Tag written alongside the opcode to start command execution.
pub const CMD_START: u8 = 0x40;
/// Always set when writing [`AU6601_CMD_CTRL`].
pub const CTRL_LATCH: u8 = 0x20;
pub const CTRL_RSP_NONE: u8 = 0x00;
pub const CTRL_RSP_SHORT: u8 = 0x40;
pub const CTRL_RSP_BUSY: u8 = 0x10;
pub const CTRL_RSP_LONG: u8 = 0xc0;
pub const CTRL_RSP_R3: u8 = 0x80;

/// Direction bit in [`AU6601_XFER_CTRL`] (set = write).
pub const XFER_WRITE: u8 = 0x80;
pub const XFER_START: u8 = 0x01;

/// Command engine reset request in [`AU6601_SW_RESET`].
pub const RST_CMD: u8 = 0x01;
/// Data engine reset request in [`AU6601_SW_RESET`].
pub const RST_DATA: u8 = 0x08;
/// Strobe bit that kicks off the reset.
pub const RST_TRIGGER: u8 = 0x80;

pub const AU6601_MAX_BLOCK_LENGTH: u32 = 512;
pub const AU6601_MAX_BLOCK_COUNT: u32 = 65536;
/// Hard cap on `block_size * block_count` for a single data phase.
pub const AU6601_MAX_REQUEST_BYTES: u32 = 524288;

bitflags! {
    /// Interrupt status / enable word. Largely tracks sdhci bit layout,
    /// except that the card insert/remove bits are swapped.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct IntStatus: u32 {
        const RESPONSE      = 0x0000_0001;
        const DATA_END      = 0x0000_0002;
        const BLK_GAP       = 0x0000_0004;
        const DMA_END       = 0x0000_0008;
        const SPACE_AVAIL   = 0x0000_0010;
        const DATA_AVAIL    = 0x0000_0020;
        const CARD_REMOVE   = 0x0000_0040;
        const CARD_INSERT   = 0x0000_0080;
        const CARD_INT      = 0x0000_0100;
        const ERROR         = 0x0000_8000;
        const TIMEOUT       = 0x0001_0000;
        const CRC           = 0x0002_0000;
        const END_BIT       = 0x0004_0000;
        const INDEX         = 0x0008_0000;
        const DATA_TIMEOUT  = 0x0010_0000;
        const DATA_CRC      = 0x0020_0000;
        const DATA_END_BIT  = 0x0040_0000;
        const BUS_POWER     = 0x0080_0000;
        const ACMD12_ERR    = 0x0100_0000;
        const ADMA_ERROR    = 0x0200_0000;

        const CMD_MASK = Self::RESPONSE.bits() | Self::TIMEOUT.bits()
            | Self::CRC.bits() | Self::END_BIT.bits() | Self::INDEX.bits();
        const DATA_MASK = Self::DATA_END.bits() | Self::DMA_END.bits()
            | Self::DATA_AVAIL.bits() | Self::SPACE_AVAIL.bits()
            | Self::DATA_TIMEOUT.bits() | Self::DATA_CRC.bits()
            | Self::DATA_END_BIT.bits();
        const CARD_MASK = Self::CARD_INSERT.bits() | Self::CARD_REMOVE.bits();
        const ERROR_MASK = 0xFFFF_8000;
        const NORMAL_MASK = 0x0000_7FFF;
    }
}

/// Registers captured by the diagnostic snapshot, with access width.
/// The data port is deliberately absent: reading it would consume FIFO bytes.
pub const SNAPSHOT_REGS: &[(u32, u8)] = &[
    (REG_00, 4),
    (REG_05, 2),
    (REG_0C, 1),
    (REG_10, 4),
    (AU6601_CMD_OPCODE, 1),
    (AU6601_CMD_ARG, 4),
    (AU6601_CMD_RSP0, 4),
    (AU6601_CMD_RSP1, 4),
    (AU6601_CMD_RSP2, 4),
    (AU6601_CMD_RSP3, 4),
    (REG_51, 1),
    (REG_52, 1),
    (REG_61, 1),
    (REG_63, 1),
    (REG_69, 1),
    (AU6601_BLOCK_SIZE, 4),
    (AU6601_POWER_CTRL, 1),
    (REG_72, 2),
    (REG_74, 2),
    (REG_75, 1),
    (AU6601_DETECT_STATUS, 1),
    (REG_77, 1),
    (AU6601_SW_RESET, 1),
    (AU6601_POWER_AUX, 1),
    (REG_7B, 1),
    (REG_7C, 1),
    (REG_7D, 1),
    (REG_7F, 1),
    (AU6601_CMD_CTRL, 1),
    (AU6601_BUS_WIDTH, 1),
    (AU6601_XFER_CTRL, 1),
    (REG_84, 2),
    (REG_85, 1),
    (REG_86, 1),
    (AU6601_INT_STATUS, 4),
    (AU6601_INT_ENABLE, 4),
    (REG_A1, 1),
    (REG_A2, 1),
    (REG_A3, 1),
    (REG_B0, 4),
    (REG_B4, 4),
];
