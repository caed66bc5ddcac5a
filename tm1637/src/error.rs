use derive_more::derive::{Display, Error};
use embedded_hal_1::digital::ErrorKind;

use crate::pins::Backend;

/// A specialized `Result` where the error is this crate's `Error` type.
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// Everything that can go wrong driving the display.
///
/// All validation errors are raised before the bus is touched, so a failed call never leaves a
/// half-written command on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// A brightness, display position, buffer length or time field outside what the chip or the
    /// operation accepts.
    #[display("Value out of range")]
    OutOfRange,

    /// The character has no entry in the segment font.
    #[display("Character out of range: {_0:?}")]
    InvalidCharacter(#[error(not(source))] char),

    /// The HAL refused to set an output pin.  The pins shipped with the Embassy HALs are
    /// infallible, so this only shows up with other `OutputPin` implementations.
    #[display("Error setting output state: {_0}")]
    Pin(#[error(not(source))] ErrorKind),

    /// The requested pin backend was not compiled in, or was handed a pin belonging to another
    /// backend.
    #[display("Unsupported pin backend: {_0}")]
    UnsupportedBackend(#[error(not(source))] Backend),

    /// Formatting a number into the fixed-size text buffer failed
    #[display("Format error")]
    Format,
}

impl From<core::fmt::Error> for Error {
    fn from(_: core::fmt::Error) -> Self {
        Self::Format
    }
}

impl Error {
    /// Convert the error of any `embedded-hal` pin into the crate error.
    pub(crate) fn from_pin<E: embedded_hal_1::digital::Error>(err: E) -> Self {
        Self::Pin(err.kind())
    }
}
