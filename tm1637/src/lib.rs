#![no_std]

mod bus;
mod error;
pub mod font;
pub mod pins;

use core::fmt::Write;

use embedded_hal_1::delay::DelayNs;
use embedded_hal_1::digital::OutputPin;

pub use bus::*;
pub use error::{Error, Result};
pub use font::{DisplayBuffer, EncodingMode};
pub use pins::{Backend, BackendPin, PinHandle};

/// Number of digits on the common 4 digit modules, which is what the `show_*` operations format
/// for
pub const DIGITS: usize = 4;

/// Scratch space for formatting numbers before encoding them
type TextBuffer = heapless::String<8>;

pub struct Tm1637Builder {
    settings: Settings,
}

impl Tm1637Builder {
    /// Use an arbitrary [`BusDriver`] implementation; nothing more needs to be specified!
    pub fn with_bus_driver<Driver: BusDriver>(self, driver: Driver) -> Tm1637Builder3<Driver> {
        Tm1637Builder3 {
            driver,
            settings: self.settings,
        }
    }

    /// Use an arbitrary `embedded-hal` delay to time the bus.
    pub fn with_delay<D: DelayNs>(self, delay: D) -> Tm1637Builder1<D> {
        Tm1637Builder1 {
            delay,
            settings: self.settings,
        }
    }

    #[cfg(feature = "embassy-time")]
    /// Time the bus with the blocking [`embassy_time::Delay`]
    pub fn with_embassy_delay(self) -> Tm1637Builder1<embassy_time::Delay> {
        self.with_delay(embassy_time::Delay)
    }
}

pub struct Tm1637Builder1<D: DelayNs> {
    delay: D,
    settings: Settings,
}

impl<D: DelayNs> Tm1637Builder1<D> {
    /// Use the bit-banging driver, with any pair of output pins
    pub fn with_bit_banging_driver<Clk: OutputPin, Dio: OutputPin>(
        self,
        clock: Clk,
        dio: Dio,
    ) -> Tm1637Builder2<Clk, Dio, D> {
        Tm1637Builder2 {
            clock,
            dio,
            delay: self.delay,
            settings: self.settings,
        }
    }

    /// Use the bit-banging driver on pins created through the [`pins`] backend factory.
    ///
    /// Fails if `backend` is not available or the handles don't belong to it.
    pub fn with_backend_pins(
        self,
        backend: Backend,
        clock: PinHandle,
        dio: PinHandle,
    ) -> Result<Tm1637Builder2<BackendPin, BackendPin, D>> {
        let clock = pins::output_pin(backend, clock)?;
        let dio = pins::output_pin(backend, dio)?;

        Ok(self.with_bit_banging_driver(clock, dio))
    }

    /// Use a bit-banging driver talking to the specified Embassy RP HAL pins
    #[cfg(feature = "embassy-rp")]
    pub fn with_embassy_rp_pins<
        ClockPin: embassy_rp::gpio::Pin,
        DioPin: embassy_rp::gpio::Pin,
    >(
        self,
        clock: ClockPin,
        dio: DioPin,
    ) -> Tm1637Builder2<BackendPin, BackendPin, D> {
        use embassy_rp::gpio::{Level, Output};

        self.with_bit_banging_driver(
            BackendPin::EmbassyRp(Output::new(clock.degrade(), Level::High)),
            BackendPin::EmbassyRp(Output::new(dio.degrade(), Level::High)),
        )
    }
}

pub struct Tm1637Builder2<Clk: OutputPin, Dio: OutputPin, D: DelayNs> {
    clock: Clk,
    dio: Dio,
    delay: D,
    settings: Settings,
}

impl<Clk: OutputPin, Dio: OutputPin, D: DelayNs> Tm1637Builder2<Clk, Dio, D> {
    /// Brightness the display comes up with after [`Tm1637::init`]
    pub fn with_brightness(mut self, brightness: Brightness) -> Self {
        self.settings.brightness = brightness;
        self
    }

    /// How text is rendered; see [`EncodingMode`]
    pub fn with_encoding(mut self, encoding: EncodingMode) -> Self {
        self.settings.encoding = encoding;
        self
    }

    /// Construct the [`Tm1637`] instance using the bit-banging driver.
    ///
    /// This is fallible if the underlying pins are, since the bus is put into its idle state
    /// straight away.
    #[allow(clippy::type_complexity)]
    pub fn build(self) -> Result<Tm1637<BitBangingBusDriver<Clk, Dio, D>>> {
        let driver = BitBangingBusDriver::new(self.clock, self.dio, self.delay)?;
        Ok(Tm1637::with_settings(driver, self.settings))
    }
}

pub struct Tm1637Builder3<Driver: BusDriver> {
    driver: Driver,
    settings: Settings,
}

impl<Driver: BusDriver> Tm1637Builder3<Driver> {
    /// Brightness the display comes up with after [`Tm1637::init`]
    pub fn with_brightness(mut self, brightness: Brightness) -> Self {
        self.settings.brightness = brightness;
        self
    }

    /// How text is rendered; see [`EncodingMode`]
    pub fn with_encoding(mut self, encoding: EncodingMode) -> Self {
        self.settings.encoding = encoding;
        self
    }

    /// Construct the [`Tm1637`] instance using the selected driver.
    pub fn build(self) -> Tm1637<Driver> {
        Tm1637::with_settings(self.driver, self.settings)
    }
}

#[derive(Copy, Clone, Debug, Default)]
struct Settings {
    brightness: Brightness,
    encoding: EncodingMode,
}

/// Display brightness, from 0 (1/16 duty cycle) to 7 (14/16 duty cycle).
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Brightness(u8);

impl Brightness {
    pub const MIN: Brightness = Brightness(0);
    pub const MAX: Brightness = Brightness(7);

    /// Fails with [`Error::OutOfRange`] unless `level` is in `0..=7`.  Out of range values are
    /// rejected, never clamped.
    pub fn new(level: u8) -> Result<Self> {
        if level <= Self::MAX.0 {
            Ok(Self(level))
        } else {
            Err(Error::OutOfRange)
        }
    }

    pub fn level(self) -> u8 {
        self.0
    }
}

impl Default for Brightness {
    fn default() -> Self {
        Self::MAX
    }
}

impl TryFrom<u8> for Brightness {
    type Error = Error;

    fn try_from(level: u8) -> Result<Self> {
        Self::new(level)
    }
}

impl From<Brightness> for u8 {
    fn from(brightness: Brightness) -> u8 {
        brightness.0
    }
}

/// Driver for TM1637 LED display controllers.
///
/// The implementation is generalized over the implementation of the underlying bus protocol
/// driver, behind the [`BusDriver`] trait.  Every operation blocks until the whole command
/// sequence has been clocked out, and validates its arguments before touching the bus.
///
/// The most straightforward way to instantiate this driver is using [`Self::builder`]:
///
/// ```
/// # #[cfg(all(feature = "embassy-time", feature = "embassy-rp"))]
/// # {
/// let p = embassy_rp::init(Default::default());
/// let mut display = tm1637::Tm1637::builder()
///     .with_embassy_delay()
///     .with_embassy_rp_pins(p.PIN_14, p.PIN_15)
///     .build()
///     .unwrap();
/// display.init().unwrap();
/// display.show_number(1637).unwrap();
/// # }
/// ```
pub struct Tm1637<Driver> {
    driver: Driver,
    brightness: Brightness,
    display_on: bool,
    encoding: EncodingMode,
}

impl Tm1637<()> {
    /// Return a builder pattern implementation to ease some of the type parameter complexity
    /// around creating the bus driver.
    pub fn builder() -> Tm1637Builder {
        Tm1637Builder {
            settings: Settings::default(),
        }
    }
}

impl<Driver: BusDriver> Tm1637<Driver> {
    /// Wrap `driver`, with full brightness and plain text encoding
    pub fn new(driver: Driver) -> Self {
        Self::with_settings(driver, Settings::default())
    }

    fn with_settings(driver: Driver, settings: Settings) -> Self {
        Self {
            driver,
            brightness: settings.brightness,
            display_on: true,
            encoding: settings.encoding,
        }
    }

    /// Put the controller in auto-increment mode and switch the display on at the configured
    /// brightness.  The digit contents are whatever the chip held before.
    pub fn init(&mut self) -> Result<()> {
        self.apply_command(Command::SetAutoIncrementAddressing)?;
        self.write_display_control()
    }

    /// Give back the bus driver
    pub fn release(self) -> Driver {
        self.driver
    }

    pub fn brightness(&self) -> Brightness {
        self.brightness
    }

    pub fn is_display_on(&self) -> bool {
        self.display_on
    }

    pub fn encoding(&self) -> EncodingMode {
        self.encoding
    }

    /// Set the brightness from 0 (dimmest) to 7, taking effect immediately.
    ///
    /// Fails with [`Error::OutOfRange`] for anything above 7, leaving the current brightness as
    /// it was.
    pub fn set_brightness(&mut self, level: u8) -> Result<()> {
        let brightness = Brightness::try_from(level)?;

        #[cfg(feature = "defmt")]
        defmt::debug!("brightness = {=u8}", level);

        self.brightness = brightness;
        self.apply_command(Command::SetAutoIncrementAddressing)?;
        self.write_display_control()
    }

    /// Switch the display on.  Digit contents and brightness are kept.
    pub fn activate_display(&mut self) -> Result<()> {
        self.display_on = true;
        self.write_display_control()
    }

    /// Switch the display off.  The chip keeps the digit contents and later writes still land;
    /// they show up once the display is activated again.
    pub fn deactivate_display(&mut self) -> Result<()> {
        self.display_on = false;
        self.write_display_control()
    }

    /// Write raw segment masks to consecutive digits starting at `position` (0 is the left-most
    /// digit, 5 the highest address the chip has).
    ///
    /// Each mask has segments A-G in bits 0-6; bit 7 drives the decimal point or colon wired to
    /// that digit, if any.
    ///
    /// Fails with [`Error::OutOfRange`] if `position` is past 5 or the masks would run past the
    /// last digit.  Nothing is sent in that case.
    pub fn write_raw(&mut self, segments: &[u8], position: u8) -> Result<()> {
        let start = usize::from(position);
        if start >= font::MAX_DIGITS || start + segments.len() > font::MAX_DIGITS {
            return Err(Error::OutOfRange);
        }

        self.apply_command(Command::SetAutoIncrementAddressing)?;
        self.apply_command(Command::WriteDigits {
            start_position: position,
            segments,
        })?;

        // The controller is only guaranteed to latch the new data after a display control
        // command, so resend it with the current state
        self.write_display_control()
    }

    /// Blank all six digit registers
    pub fn blank_display(&mut self) -> Result<()> {
        self.write_raw(&[0u8; font::MAX_DIGITS], 0)
    }

    /// Show a number right-aligned, with leading spaces.  Values outside `-999..=9999` are
    /// clamped to that range.
    pub fn show_number(&mut self, value: i32) -> Result<()> {
        let mut text = TextBuffer::new();
        write!(text, "{:>4}", value.clamp(-999, 9999))?;
        self.show_text(&text, false)
    }

    /// Like [`Self::show_number`], but padded with zeros after the sign (`-005`, `0042`)
    pub fn show_number_zero_padded(&mut self, value: i32) -> Result<()> {
        let mut text = TextBuffer::new();
        write!(text, "{:04}", value.clamp(-999, 9999))?;
        self.show_text(&text, false)
    }

    /// Show `value` as four lower-case hex digits
    pub fn show_hex(&mut self, value: u16) -> Result<()> {
        let mut text = TextBuffer::new();
        write!(text, "{value:04x}")?;
        self.show_text(&text, false)
    }

    /// Show two numbers side by side, two digits each, zero filled.  Each is clamped to `-9..=99`.
    /// With `colon` set, the colon between them is lit (on modules that have one).
    pub fn show_two_numbers(&mut self, left: i32, right: i32, colon: bool) -> Result<()> {
        let mut text = TextBuffer::new();
        write!(
            text,
            "{:0>2}{:0>2}",
            left.clamp(-9, 99),
            right.clamp(-9, 99)
        )?;
        self.show_text(&text, colon)
    }

    /// Show a clock time as `HH:MM`.
    ///
    /// With `flash` set the colon is lit on odd seconds only, so calling this once a second
    /// blinks it; otherwise it stays lit.  Fails with [`Error::OutOfRange`] for an hour past 23
    /// or a minute or second past 59.
    pub fn show_time(&mut self, hour: u8, minute: u8, second: u8, flash: bool) -> Result<()> {
        if hour > 23 || minute > 59 || second > 59 {
            return Err(Error::OutOfRange);
        }

        let mut text = TextBuffer::new();
        write!(text, "{hour:02}{minute:02}")?;
        self.show_text(&text, !flash || second % 2 == 1)
    }

    /// Show a temperature in degrees Celsius in the left two digits, followed by `°C`.
    ///
    /// Anything below -9 shows as `lo`, anything above 99 as `hi`.
    pub fn show_temperature(&mut self, value: i32) -> Result<()> {
        if value < -9 {
            self.show_text("lo", false)?;
        } else if value > 99 {
            self.show_text("hi", false)?;
        } else {
            let mut text = TextBuffer::new();
            write!(text, "{value:>2}")?;
            self.show_text(&text, false)?;
        }

        self.write_raw(&font::DEGREES_CELSIUS, 2)
    }

    /// Show up to four characters from the left.  See [`font::encode_char`] for what can be
    /// displayed.
    ///
    /// The whole of `text` is validated, but only the first four digits' worth is shown.  With
    /// `colon` set, the auxiliary bit of the second digit is lit, which is the colon on clock
    /// style modules.
    pub fn show_text(&mut self, text: &str, colon: bool) -> Result<()> {
        let mut segments = self.render(text)?;

        if colon {
            if let Some(segment) = segments.get_mut(1) {
                *segment |= font::AUX_BIT;
            }
        }

        self.write_raw(&segments, 0)
    }

    /// Scroll `text` across the display from right to left, waiting `delay_ms` after each step.
    ///
    /// The text enters from a blank display and leaves it blank again, so this takes
    /// `(length + 5) * delay_ms` plus bus time.  Text of any length works; every character is
    /// validated before anything is shown.
    pub fn scroll(&mut self, text: &str, delay_ms: u32) -> Result<()> {
        for segment in font::segments(text, self.encoding) {
            segment?;
        }

        self.scroll_frames(
            font::segments(text, self.encoding).filter_map(|segment| segment.ok()),
            delay_ms,
        )
    }

    /// Like [`Self::scroll`], for segment masks that have already been encoded
    pub fn scroll_segments(&mut self, segments: &[u8], delay_ms: u32) -> Result<()> {
        self.scroll_frames(segments.iter().copied(), delay_ms)
    }

    /// Slide a 4 digit window over the segments padded with four blanks on either side
    fn scroll_frames(
        &mut self,
        segments: impl Iterator<Item = u8>,
        delay_ms: u32,
    ) -> Result<()> {
        let mut window = [0u8; DIGITS];

        self.write_raw(&window, 0)?;
        self.driver.pause_ms(delay_ms);

        for segment in segments.chain(core::iter::repeat(0).take(DIGITS)) {
            window.rotate_left(1);
            window[DIGITS - 1] = segment;

            self.write_raw(&window, 0)?;
            self.driver.pause_ms(delay_ms);
        }

        Ok(())
    }

    /// Encode the first [`DIGITS`] digits of `text` in the configured mode, validating all of it
    fn render(&self, text: &str) -> Result<DisplayBuffer> {
        let mut segments = DisplayBuffer::new();

        for segment in font::segments(text, self.encoding) {
            let segment = segment?;
            if segments.len() < DIGITS {
                // Can't fail; DIGITS is below the buffer capacity
                let _ = segments.push(segment);
            }
        }

        Ok(segments)
    }

    fn write_display_control(&mut self) -> Result<()> {
        self.apply_command(Command::DisplayControl {
            on: self.display_on,
            brightness: self.brightness,
        })
    }

    /// Apply the command to the controller
    fn apply_command(&mut self, command: Command<'_>) -> Result<()> {
        let (command_byte, data_bytes) = command.encode();

        #[cfg(feature = "defmt")]
        defmt::trace!("command byte = {=u8:x}", command_byte);

        if let Some(data_bytes) = data_bytes {
            self.driver.send_command_write_data(command_byte, data_bytes)
        } else {
            self.driver.send_command(command_byte)
        }
    }
}

/// Represents the commands this driver sends to the TM1637 as Rust enums for greater readability.
enum Command<'a> {
    /// Data command: write to the display registers, incrementing the address after each byte,
    /// normal (not test) mode
    SetAutoIncrementAddressing,

    /// Address command followed by the segment masks for consecutive digits
    WriteDigits {
        /// Digit the first mask goes to, 0-5
        start_position: u8,

        segments: &'a [u8],
    },

    /// Display control: on/off flag in bit 3, brightness in bits 0-2
    DisplayControl { on: bool, brightness: Brightness },
}

impl<'a> Command<'a> {
    /// Convert this command into the command byte and the data bytes (if any) sent after it in
    /// the same start/stop frame.
    fn encode<'me>(&'me self) -> (u8, Option<&'me [u8]>)
    where
        'a: 'me,
    {
        match self {
            Command::SetAutoIncrementAddressing => (0b0100_0000, None),
            Command::WriteDigits {
                start_position,
                segments,
            } => (0b1100_0000 | (start_position & 0b0000_0111), Some(*segments)),
            Command::DisplayControl { on, brightness } => {
                let on = if *on { 0b0000_1000 } else { 0 };
                (0b1000_0000 | on | brightness.level(), None)
            }
        }
    }
}
