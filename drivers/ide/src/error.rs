use core::fmt;

/// IDE error types for no-std environment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdeError {
    /// Error bit set in status register
    StatusError,
    /// Drive fault detected
    DriveFault,
    /// Data request not ready
    DataNotReady,
    /// Packet (ATAPI) devices cannot be driven by the ATA path
    UnsupportedDevice,
    /// Invalid parameter
    InvalidParameter,
    /// CHS geometry with a zero field, or more heads than the task file holds
    InvalidGeometry,
    /// More sectors than the addressing mode can reach
    CapacityOutOfRange,
    /// Both drive slots of the channel are taken, or the slot is in use
    ChannelFull,
    /// No channel with that handle
    NoSuchChannel,
    /// No device with that handle
    NoSuchDevice,
}

impl IdeError {
    pub fn description(self) -> &'static str {
        match self {
            IdeError::StatusError => "ERR bit set in status register",
            IdeError::DriveFault => "drive fault",
            IdeError::DataNotReady => "data request not asserted",
            IdeError::UnsupportedDevice => "ATAPI devices are not supported",
            IdeError::InvalidParameter => "invalid parameter",
            IdeError::InvalidGeometry => "CHS geometry is not addressable",
            IdeError::CapacityOutOfRange => "capacity exceeds addressing mode",
            IdeError::ChannelFull => "drive slot already taken on channel",
            IdeError::NoSuchChannel => "no such channel",
            IdeError::NoSuchDevice => "no such device",
        }
    }
}

impl fmt::Display for IdeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// Result type for IDE operations
pub type IdeResult<T> = Result<T, IdeError>;

/// Classification of the status register after a poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    Ready,
    /// ERR set; carries the error register
    Error(u8),
    /// DF set
    Fault,
    /// BSY cleared without DRQ
    DrqMissing,
}

impl PollOutcome {
    pub fn into_result(self) -> IdeResult<()> {
        match self {
            PollOutcome::Ready => Ok(()),
            PollOutcome::Error(_) => Err(IdeError::StatusError),
            PollOutcome::Fault => Err(IdeError::DriveFault),
            PollOutcome::DrqMissing => Err(IdeError::DataNotReady),
        }
    }
}
