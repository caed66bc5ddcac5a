//! Example of using a TM1637 4 digit clock module on an RP2040 board like the Pi Pico
//!
//! Wiring: CLK to GP14, DIO to GP15, VCC to 3V3.

#![no_std]
#![no_main]

use core::str::FromStr;

use defmt::*;
use embassy_executor::Spawner;
use embassy_rp::gpio::Pin;
use embassy_time::Timer;
use {defmt_rtt as _, panic_probe as _};

use tm1637::{Backend, PinHandle};

/// Which GPIO backend drives the display.  Set to "null" to run the demo with nothing attached.
const PIN_BACKEND: &str = "embassy-rp";

#[embassy_executor::main]
async fn main(_spawner: Spawner) {
    let p = embassy_rp::init(Default::default());

    let backend = Backend::from_str(PIN_BACKEND).unwrap();
    info!("Driving the display through the {} backend", backend);

    // Instantiate the TM1637 interface using the bit-banging bus driver, timed with the blocking
    // `embassy-time` delay
    let mut display = tm1637::Tm1637::builder()
        .with_embassy_delay()
        .with_backend_pins(
            backend,
            PinHandle::EmbassyRp(p.PIN_14.degrade()),
            PinHandle::EmbassyRp(p.PIN_15.degrade()),
        )
        .unwrap()
        .build()
        .unwrap();
    display.init().unwrap();
    display.blank_display().unwrap();

    loop {
        display.scroll("tm1637 demo", 250).unwrap();

        for level in 0..=7 {
            display.set_brightness(level).unwrap();
            display.show_number(i32::from(level)).unwrap();
            Timer::after_millis(300).await;
        }

        for temperature in [-15, -4, 21, 37, 120] {
            display.show_temperature(temperature).unwrap();
            Timer::after_secs(1).await;
        }

        // Ten seconds of a fake clock with a blinking colon
        for second in 0..10 {
            display.show_time(12, 34, second, true).unwrap();
            Timer::after_secs(1).await;
        }

        display.show_hex(0xbeef).unwrap();
        Timer::after_secs(2).await;

        display.show_two_numbers(-5, 42, true).unwrap();
        Timer::after_secs(2).await;

        debug!("Going around again");
    }
}
