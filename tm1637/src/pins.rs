//! Pin backends.
//!
//! The driver itself only needs [`OutputPin`].  This module is for firmware that picks the GPIO
//! implementation from configuration rather than at compile time: name a [`Backend`], hand
//! [`output_pin`] the matching [`PinHandle`], and get back a [`BackendPin`] that dispatches to the
//! right implementation.

use core::convert::Infallible;

use embedded_hal_1::digital::{ErrorType, OutputPin};

use crate::{Error, Result};

/// GPIO implementations a [`BackendPin`] can wrap.
///
/// Parses from and prints as kebab-case (`"embassy-rp"`, `"null"`), so it can come straight out
/// of a config string.
#[derive(
    Copy,
    Clone,
    Debug,
    PartialEq,
    Eq,
    strum::Display,
    strum::EnumString,
    strum::VariantArray,
)]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Backend {
    /// RP2040 GPIO through the Embassy HAL.  Requires the `embassy-rp` feature.
    EmbassyRp,

    /// Accepts and discards every write.  For running display code on a board with nothing
    /// attached.
    Null,
}

impl Backend {
    /// Whether this backend was compiled into the crate
    pub fn is_available(self) -> bool {
        match self {
            Backend::EmbassyRp => cfg!(feature = "embassy-rp"),
            Backend::Null => true,
        }
    }
}

/// The hardware resource a pin is built from
pub enum PinHandle {
    /// A type-erased RP2040 pin, as returned by `embassy_rp::gpio::Pin::degrade`
    #[cfg(feature = "embassy-rp")]
    EmbassyRp(embassy_rp::gpio::AnyPin),

    /// No hardware at all
    Unbound,
}

/// Output pin for whichever [`Backend`] was selected
pub enum BackendPin {
    #[cfg(feature = "embassy-rp")]
    EmbassyRp(embassy_rp::gpio::Output<'static, embassy_rp::gpio::AnyPin>),
    Null(NullPin),
}

impl BackendPin {
    /// The backend this pin was created for
    pub fn backend(&self) -> Backend {
        match self {
            #[cfg(feature = "embassy-rp")]
            BackendPin::EmbassyRp(_) => Backend::EmbassyRp,
            BackendPin::Null(_) => Backend::Null,
        }
    }
}

/// Build an output pin using `backend`.
///
/// The pin starts out high, which is the idle level of both TM1637 lines.
///
/// Fails with [`Error::UnsupportedBackend`] if the backend isn't compiled in, or if `handle`
/// belongs to a different backend.  The null backend accepts any handle.
pub fn output_pin(backend: Backend, handle: PinHandle) -> Result<BackendPin> {
    #[cfg(feature = "defmt")]
    defmt::debug!("opening {} output pin", backend);

    match (backend, handle) {
        #[cfg(feature = "embassy-rp")]
        (Backend::EmbassyRp, PinHandle::EmbassyRp(pin)) => Ok(BackendPin::EmbassyRp(
            embassy_rp::gpio::Output::new(pin, embassy_rp::gpio::Level::High),
        )),
        (Backend::Null, _) => Ok(BackendPin::Null(NullPin::new())),
        (backend, _) => Err(Error::UnsupportedBackend(backend)),
    }
}

impl ErrorType for BackendPin {
    type Error = Infallible;
}

impl OutputPin for BackendPin {
    fn set_low(&mut self) -> core::result::Result<(), Self::Error> {
        match self {
            #[cfg(feature = "embassy-rp")]
            BackendPin::EmbassyRp(pin) => {
                pin.set_low();
                Ok(())
            }
            BackendPin::Null(pin) => pin.set_low(),
        }
    }

    fn set_high(&mut self) -> core::result::Result<(), Self::Error> {
        match self {
            #[cfg(feature = "embassy-rp")]
            BackendPin::EmbassyRp(pin) => {
                pin.set_high();
                Ok(())
            }
            BackendPin::Null(pin) => pin.set_high(),
        }
    }
}

/// Pin that remembers the last level written and does nothing else
#[derive(Debug)]
pub struct NullPin {
    high: bool,
}

impl NullPin {
    pub fn new() -> Self {
        Self { high: true }
    }

    /// The last level written
    pub fn is_set_high(&self) -> bool {
        self.high
    }
}

impl Default for NullPin {
    fn default() -> Self {
        Self::new()
    }
}

impl ErrorType for NullPin {
    type Error = Infallible;
}

impl OutputPin for NullPin {
    fn set_low(&mut self) -> core::result::Result<(), Self::Error> {
        self.high = false;
        Ok(())
    }

    fn set_high(&mut self) -> core::result::Result<(), Self::Error> {
        self.high = true;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use core::str::FromStr;

    use super::*;

    #[test]
    fn backend_names_round_trip() {
        use strum::VariantArray;

        for backend in Backend::VARIANTS {
            let mut name = heapless::String::<16>::new();
            core::fmt::write(&mut name, format_args!("{backend}")).unwrap();

            assert_eq!(Ok(*backend), Backend::from_str(&name), "{name}");
        }

        assert_eq!(Ok(Backend::EmbassyRp), Backend::from_str("Embassy-RP"));
        assert!(Backend::from_str("gpiozero").is_err());
    }

    #[test]
    fn null_backend_accepts_anything() {
        let mut pin = output_pin(Backend::Null, PinHandle::Unbound).unwrap();
        assert_eq!(Backend::Null, pin.backend());

        pin.set_low().unwrap();
        pin.set_high().unwrap();
    }

    #[cfg(not(feature = "embassy-rp"))]
    #[test]
    fn missing_backend_is_reported() {
        assert!(!Backend::EmbassyRp.is_available());
        assert_eq!(
            Some(Error::UnsupportedBackend(Backend::EmbassyRp)),
            output_pin(Backend::EmbassyRp, PinHandle::Unbound).err()
        );
    }

    #[test]
    fn null_pin_tracks_level() {
        let mut pin = NullPin::default();
        assert!(pin.is_set_high());

        pin.set_low().unwrap();
        assert!(!pin.is_set_high());
    }
}
