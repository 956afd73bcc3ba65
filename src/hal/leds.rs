//! WS2812 (NeoPixel) LED strips on a plain output pin
//!
//! Each LED takes 24 bits, green then red then blue, most significant bit
//! first. A bit is one high pulse followed by a low pulse; the length of the
//! high part tells a one from a zero. Timings are derived from the CPU clock
//! with [`BitTiming::new`] and can be inspected on the host through
//! [`pulses`].

use super::gpio::{Output, Pin, PortRegister};
use super::register::{interrupt_free, Registers};

const T0H_NS: u32 = 400;
const T1H_NS: u32 = 800;
const PERIOD_NS: u32 = 1_250;
/// Low time after which the strip latches the frame
const RESET_NS: u32 = 50_000;

/// Colour of one LED in wire order
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Grb {
    pub green: u8,
    pub red: u8,
    pub blue: u8,
}

impl Grb {
    pub const fn new(green: u8, red: u8, blue: u8) -> Self {
        Self { green, red, blue }
    }

    pub const fn from_rgb(red: u8, green: u8, blue: u8) -> Self {
        Self { green, red, blue }
    }

    /// The three bytes as they go out on the wire
    pub const fn bytes(&self) -> [u8; 3] {
        [self.green, self.red, self.blue]
    }
}

/// High and low time of one bit, in CPU cycles
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Pulse {
    pub high: u16,
    pub low: u16,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BitTiming {
    pub zero: Pulse,
    pub one: Pulse,
    /// Cycles the line is held low after the last bit
    pub reset: u32,
}

impl BitTiming {
    pub const fn new(cpu_frequency: u32) -> Self {
        let period = cycles(cpu_frequency, PERIOD_NS);
        let zero_high = cycles(cpu_frequency, T0H_NS);
        let one_high = cycles(cpu_frequency, T1H_NS);
        Self {
            zero: Pulse {
                high: zero_high as u16,
                low: (period - zero_high) as u16,
            },
            one: Pulse {
                high: one_high as u16,
                low: (period - one_high) as u16,
            },
            reset: cycles(cpu_frequency, RESET_NS),
        }
    }

    pub const fn pulse(&self, bit: bool) -> Pulse {
        if bit {
            self.one
        } else {
            self.zero
        }
    }
}

// Rounded to the nearest cycle
const fn cycles(cpu_frequency: u32, ns: u32) -> u32 {
    ((cpu_frequency / 1_000) * ns + 500_000) / 1_000_000
}

/// Bits of a frame in transmission order
pub fn bits(values: &[Grb]) -> impl Iterator<Item = bool> + '_ {
    values
        .iter()
        .flat_map(|led| led.bytes())
        .flat_map(|byte| (0..8).rev().map(move |bit| byte & (1 << bit) != 0))
}

/// Pulse train of a frame
pub fn pulses<'a>(values: &'a [Grb], timing: &'a BitTiming) -> impl Iterator<Item = Pulse> + 'a {
    bits(values).map(|bit| timing.pulse(bit))
}

/// A strip hanging off one output pin
pub struct LedStrip {
    pin: Pin<Output>,
    timing: BitTiming,
}

impl LedStrip {
    /// Take over `pin`, driving it low so the strip sees an idle line.
    pub fn new(mut pin: Pin<Output>, cpu_frequency: u32) -> Self {
        pin.set_low();
        Self {
            pin,
            timing: BitTiming::new(cpu_frequency),
        }
    }

    pub fn timing(&self) -> &BitTiming {
        &self.timing
    }

    pub fn pin(&self) -> &Pin<Output> {
        &self.pin
    }

    /// Send a frame. Interrupts are held off for the whole transfer
    /// (30 µs per LED) and the latch gap after it.
    pub fn write(&mut self, values: &[Grb]) {
        let port = self.pin.port();
        let mask = 1 << self.pin.bit();

        interrupt_free(|| {
            // Other pins of the port must not change during the frame
            let latch = port.read(PortRegister::Port);
            let high = latch | mask;
            let low = latch & !mask;

            for pulse in pulses(values, &self.timing) {
                port.write(PortRegister::Port, high);
                spin(u32::from(pulse.high));
                port.write(PortRegister::Port, low);
                spin(u32::from(pulse.low));
            }
            spin(self.timing.reset);
        });
    }
}

// Cycles burnt by one pass of the delay loop (nop, decrement, branch)
#[cfg(target_arch = "avr")]
const CYCLES_PER_SPIN: u32 = 4;

#[cfg(target_arch = "avr")]
#[inline(always)]
fn spin(cycles: u32) {
    for _ in 0..cycles / CYCLES_PER_SPIN {
        avr_device::asm::nop();
    }
}

#[cfg(not(target_arch = "avr"))]
#[inline(always)]
fn spin(_cycles: u32) {}
