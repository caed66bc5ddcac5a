//! Module describing the [`BusDriver`] trait and the bit-banging implementation of the TM1637
//! two-wire protocol.

use embedded_hal_1::delay::DelayNs;
use embedded_hal_1::digital::OutputPin;

use crate::{Error, Result};

/// Half of one clock phase, in microseconds.
///
/// The datasheet asks for at least a few hundred nanoseconds per phase; the generic RC filters on
/// the cheap breakout boards round the edges off a lot more than that, so this is deliberately slow.
pub const CLOCK_TICK_US: u32 = 10;

/// This trait represents some low-level implementation of the TM1637 bus interface, likely in
/// terms of some platform-specific HAL.
///
/// The TM1637 uses a two-wire bus that looks like I2C but isn't: there is no device address, bits
/// go out LSB first, and the chip's acknowledge bit is clocked but never worth reading because
/// nothing can be done about a missing one.  This trait exposes the byte-level interface the
/// driver needs; [`BitBangingBusDriver`] implements it on any two `embedded-hal` output pins.
pub trait BusDriver {
    /// Send a single command, with no payload
    fn send_command(&mut self, b: u8) -> Result<()>;

    /// Send a command followed by a data payload, all within one start/stop frame
    fn send_command_write_data(&mut self, b: u8, data: &[u8]) -> Result<()>;

    /// Block for `ms` milliseconds.  Used between animation frames.
    fn pause_ms(&mut self, ms: u32);
}

/// Implementation of [`BusDriver`] which toggles the CLK and DIO pins directly.
///
/// Both pins are only ever driven.  The acknowledge bit the TM1637 pulls DIO low for after every
/// byte is clocked through but not read, so DIO doesn't need to be an input.
pub struct BitBangingBusDriver<Clk, Dio, D> {
    clock: Clk,
    dio: Dio,
    delay: D,
}

impl<Clk: OutputPin, Dio: OutputPin, D: DelayNs> BitBangingBusDriver<Clk, Dio, D> {
    /// Take ownership of the pins and put the bus in its idle state, both lines high.
    pub fn new(clock: Clk, dio: Dio, delay: D) -> Result<Self> {
        let mut me = Self { clock, dio, delay };

        me.clock_high()?;
        me.dio_high()?;
        me.wait_clock_tick();

        Ok(me)
    }

    /// Give the pins and the delay back
    pub fn release(self) -> (Clk, Dio, D) {
        (self.clock, self.dio, self.delay)
    }

    /// Start condition: DIO falls while CLK is high, then CLK goes low ready for the first bit.
    ///
    /// Assumes the bus is idle.
    fn start(&mut self) -> Result<()> {
        self.dio_low()?;
        self.wait_clock_tick();
        self.clock_low()?;
        self.wait_clock_tick();

        Ok(())
    }

    /// Stop condition: DIO rises while CLK is high, leaving the bus idle.
    fn stop(&mut self) -> Result<()> {
        self.dio_low()?;
        self.wait_clock_tick();
        self.clock_high()?;
        self.wait_clock_tick();
        self.dio_high()
    }

    /// Shift the byte value out on the DIO pin, LSB first.  The TM1637 samples DIO on the rising
    /// edge of CLK.
    fn write_byte(&mut self, b: u8) -> Result<()> {
        #[cfg(feature = "defmt")]
        defmt::trace!("byte = {=u8:x}", b);

        for bit in 0..8 {
            let value = (b >> bit) & 0x01 != 0;

            self.dio.set_state(value.into()).map_err(Error::from_pin)?;
            self.wait_clock_tick();

            self.clock_high()?;
            self.wait_clock_tick();
            self.clock_low()?;
            self.wait_clock_tick();
        }

        // Ninth clock for the acknowledge bit.  The chip drives DIO low during it; we don't look.
        self.clock_low()?;
        self.wait_clock_tick();
        self.clock_high()?;
        self.wait_clock_tick();
        self.clock_low()?;
        self.wait_clock_tick();

        Ok(())
    }

    fn wait_clock_tick(&mut self) {
        self.delay.delay_us(CLOCK_TICK_US);
    }

    fn clock_high(&mut self) -> Result<()> {
        self.clock.set_high().map_err(Error::from_pin)
    }

    fn clock_low(&mut self) -> Result<()> {
        self.clock.set_low().map_err(Error::from_pin)
    }

    fn dio_high(&mut self) -> Result<()> {
        self.dio.set_high().map_err(Error::from_pin)
    }

    fn dio_low(&mut self) -> Result<()> {
        self.dio.set_low().map_err(Error::from_pin)
    }
}

impl<Clk: OutputPin, Dio: OutputPin, D: DelayNs> BusDriver for BitBangingBusDriver<Clk, Dio, D> {
    fn send_command(&mut self, b: u8) -> Result<()> {
        self.start()?;
        self.write_byte(b)?;
        self.stop()
    }

    fn send_command_write_data(&mut self, b: u8, data: &[u8]) -> Result<()> {
        self.start()?;
        self.write_byte(b)?;
        for b in data {
            self.write_byte(*b)?;
        }
        self.stop()
    }

    fn pause_ms(&mut self, ms: u32) {
        self.delay.delay_ms(ms);
    }
}

#[cfg(test)]
pub(crate) mod test {
    extern crate std;

    use core::cell::RefCell;
    use core::convert::Infallible;
    use std::rc::Rc;
    use std::vec::Vec;

    use super::*;

    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    pub(crate) enum Line {
        Clock,
        Dio,
    }

    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    pub(crate) enum Event {
        Set(Line, bool),
        Wait(u32),
    }

    pub(crate) type Trace = Rc<RefCell<Vec<Event>>>;

    /// Output pin that appends every write to a trace shared with its sibling and the delay
    pub(crate) struct RecordingPin {
        line: Line,
        trace: Trace,
    }

    impl embedded_hal_1::digital::ErrorType for RecordingPin {
        type Error = Infallible;
    }

    impl OutputPin for RecordingPin {
        fn set_low(&mut self) -> core::result::Result<(), Self::Error> {
            self.trace.borrow_mut().push(Event::Set(self.line, false));
            Ok(())
        }

        fn set_high(&mut self) -> core::result::Result<(), Self::Error> {
            self.trace.borrow_mut().push(Event::Set(self.line, true));
            Ok(())
        }
    }

    pub(crate) struct RecordingDelay {
        trace: Trace,
    }

    impl DelayNs for RecordingDelay {
        fn delay_ns(&mut self, ns: u32) {
            self.trace.borrow_mut().push(Event::Wait(ns / 1_000));
        }

        fn delay_us(&mut self, us: u32) {
            self.trace.borrow_mut().push(Event::Wait(us));
        }

        fn delay_ms(&mut self, ms: u32) {
            self.trace.borrow_mut().push(Event::Wait(ms * 1_000));
        }
    }

    pub(crate) fn recording_bus() -> (
        BitBangingBusDriver<RecordingPin, RecordingPin, RecordingDelay>,
        Trace,
    ) {
        let trace = Trace::default();
        let bus = BitBangingBusDriver::new(
            RecordingPin {
                line: Line::Clock,
                trace: trace.clone(),
            },
            RecordingPin {
                line: Line::Dio,
                trace: trace.clone(),
            },
            RecordingDelay {
                trace: trace.clone(),
            },
        )
        .unwrap();

        (bus, trace)
    }

    /// Replay a trace and recover the bytes framed by start/stop conditions, sampling DIO on each
    /// rising clock edge like the chip does.
    pub(crate) fn decode_frames(trace: &[Event]) -> Vec<Vec<u8>> {
        let mut frames = Vec::new();
        let mut clock = true;
        let mut dio = true;
        let mut bits: Vec<bool> = Vec::new();
        let mut in_frame = false;

        for event in trace {
            let Event::Set(line, level) = *event else {
                continue;
            };

            match line {
                Line::Dio => {
                    if clock && dio && !level {
                        in_frame = true;
                        bits.clear();
                    } else if clock && !dio && level && in_frame {
                        in_frame = false;
                        // Every ninth bit is the acknowledge clock
                        let bytes = bits
                            .chunks(9)
                            .filter(|chunk| chunk.len() == 9)
                            .map(|chunk| {
                                chunk[..8]
                                    .iter()
                                    .enumerate()
                                    .fold(0u8, |acc, (i, bit)| acc | ((*bit as u8) << i))
                            })
                            .collect();
                        frames.push(bytes);
                    }
                    dio = level;
                }
                Line::Clock => {
                    if !clock && level && in_frame {
                        bits.push(dio);
                    }
                    clock = level;
                }
            }
        }

        frames
    }

    #[test]
    fn idle_after_construction() {
        let (_bus, trace) = recording_bus();

        assert_eq!(
            &[
                Event::Set(Line::Clock, true),
                Event::Set(Line::Dio, true),
                Event::Wait(CLOCK_TICK_US),
            ],
            trace.borrow().as_slice()
        );
    }

    #[test]
    fn command_pulse_sequence() {
        let (mut bus, trace) = recording_bus();
        trace.borrow_mut().clear();

        bus.send_command(0b0000_0001).unwrap();

        let t = Event::Wait(CLOCK_TICK_US);
        let clk = |level| Event::Set(Line::Clock, level);
        let dio = |level| Event::Set(Line::Dio, level);

        let mut expected = std::vec![dio(false), t, clk(false), t];
        for bit in 0..8 {
            expected.extend([dio(bit == 0), t, clk(true), t, clk(false), t]);
        }
        expected.extend([clk(false), t, clk(true), t, clk(false), t]);
        expected.extend([dio(false), t, clk(true), t, dio(true)]);

        assert_eq!(expected, *trace.borrow());
    }

    #[test]
    fn frames_decode_lsb_first() {
        let (mut bus, trace) = recording_bus();

        bus.send_command(0x40).unwrap();
        bus.send_command_write_data(0xC2, &[0x3F, 0x86]).unwrap();
        bus.send_command(0x8F).unwrap();

        assert_eq!(
            std::vec![
                std::vec![0x40],
                std::vec![0xC2, 0x3F, 0x86],
                std::vec![0x8F]
            ],
            decode_frames(&trace.borrow())
        );
    }

    #[test]
    fn bus_returns_to_idle() {
        let (mut bus, trace) = recording_bus();
        bus.send_command_write_data(0xC0, &[0xFF]).unwrap();

        let trace = trace.borrow();
        let last_level = |line: Line| {
            trace.iter().rev().find_map(|event| match event {
                Event::Set(l, level) if *l == line => Some(*level),
                _ => None,
            })
        };

        assert_eq!(Some(true), last_level(Line::Clock));
        assert_eq!(Some(true), last_level(Line::Dio));
    }

    #[test]
    fn pause_uses_the_delay() {
        let (mut bus, trace) = recording_bus();
        trace.borrow_mut().clear();

        bus.pause_ms(250);

        assert_eq!(&[Event::Wait(250_000)], trace.borrow().as_slice());
    }

    #[test]
    fn pin_errors_propagate() {
        use embedded_hal_1::digital::ErrorKind;

        struct BrokenPin;

        impl embedded_hal_1::digital::ErrorType for BrokenPin {
            type Error = ErrorKind;
        }

        impl OutputPin for BrokenPin {
            fn set_low(&mut self) -> core::result::Result<(), Self::Error> {
                Err(ErrorKind::Other)
            }

            fn set_high(&mut self) -> core::result::Result<(), Self::Error> {
                Err(ErrorKind::Other)
            }
        }

        let trace = Trace::default();
        let result = BitBangingBusDriver::new(
            BrokenPin,
            RecordingPin {
                line: Line::Dio,
                trace: trace.clone(),
            },
            RecordingDelay { trace },
        );

        assert_eq!(Some(Error::Pin(ErrorKind::Other)), result.err());
    }
}
