#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MciError {
    /// No response or data within the armed window, raised either by the
    /// hardware timeout bits or by the watchdog.
    Timeout,
    /// CRC, framing, index or end-bit error reported by the controller.
    Protocol,
    /// No card present at submission time.
    NoMedium,
    /// Invalid transfer geometry. Indicates a programming defect in the
    /// issuer, never a runtime card fault.
    Configuration,
}

pub type MciResult<T = ()> = Result<T, MciError>;
