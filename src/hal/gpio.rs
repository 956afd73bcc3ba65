use core::convert::Infallible;
use core::marker::PhantomData;

use embedded_hal::digital::v2::{InputPin, OutputPin, StatefulOutputPin};

use avr_device::atmega328p::{PORTB, PORTC, PORTD};

use super::register::{impl_registers, Registers};

pub trait PinMode {}
pub struct Input;
pub struct Output;
impl PinMode for Input {}
impl PinMode for Output {}

/// The three registers behind one I/O port
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PortRegister {
    /// Input pins (PINx)
    Pin,
    /// Data direction (DDRx)
    Ddr,
    /// Output latch / pull-up enable (PORTx)
    Port,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Port {
    B,
    C,
    D,
}

impl_registers! {
    Port: PortRegister {
        Port::B => PORTB { Pin => pinb, Ddr => ddrb, Port => portb },
        Port::C => PORTC { Pin => pinc, Ddr => ddrc, Port => portc },
        Port::D => PORTD { Pin => pind, Ddr => ddrd, Port => portd },
    }
}

/// One pin of an I/O port, tagged with its direction
#[derive(Debug)]
pub struct Pin<MODE> {
    port: Port,
    bit: u8,
    _mode: PhantomData<MODE>,
}

impl Pin<Input> {
    /// Claim a pin. After reset every pin is a floating input.
    ///
    /// The caller must not hold another `Pin` for the same port and bit.
    pub const fn new(port: Port, bit: u8) -> Self {
        Self {
            port,
            bit,
            _mode: PhantomData,
        }
    }
}

impl<MODE: PinMode> Pin<MODE> {
    pub fn port(&self) -> Port {
        self.port
    }

    pub fn bit(&self) -> u8 {
        self.bit
    }

    pub fn into_output(self) -> Pin<Output> {
        self.port.set_bits(PortRegister::Ddr, self.mask());
        self.into_mode()
    }

    pub fn into_input(self) -> Pin<Input> {
        self.port.clear_bits(PortRegister::Ddr, self.mask());
        self.port.clear_bits(PortRegister::Port, self.mask());
        self.into_mode()
    }

    pub fn into_pull_up_input(self) -> Pin<Input> {
        self.port.clear_bits(PortRegister::Ddr, self.mask());
        self.port.set_bits(PortRegister::Port, self.mask());
        self.into_mode()
    }

    #[inline]
    fn mask(&self) -> u8 {
        1 << self.bit
    }

    fn into_mode<M: PinMode>(self) -> Pin<M> {
        Pin {
            port: self.port,
            bit: self.bit,
            _mode: PhantomData,
        }
    }
}

impl Pin<Output> {
    #[inline]
    pub fn set_high(&mut self) {
        self.port.set_bits(PortRegister::Port, self.mask());
    }

    #[inline]
    pub fn set_low(&mut self) {
        self.port.clear_bits(PortRegister::Port, self.mask());
    }

    #[inline]
    pub fn toggle(&mut self) {
        let mask = self.mask();
        self.port.modify(PortRegister::Port, |r| r ^ mask);
    }

    /// Level currently driven on the pin
    #[inline]
    pub fn is_set_high(&self) -> bool {
        self.port.is_set(PortRegister::Port, self.bit)
    }
}

impl Pin<Input> {
    #[inline]
    pub fn is_high(&self) -> bool {
        self.port.is_set(PortRegister::Pin, self.bit)
    }

    #[inline]
    pub fn is_low(&self) -> bool {
        !self.is_high()
    }
}

impl OutputPin for Pin<Output> {
    type Error = Infallible;

    fn set_low(&mut self) -> Result<(), Self::Error> {
        Pin::set_low(self);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        Pin::set_high(self);
        Ok(())
    }
}

impl StatefulOutputPin for Pin<Output> {
    fn is_set_high(&self) -> Result<bool, Self::Error> {
        Ok(Pin::is_set_high(self))
    }

    fn is_set_low(&self) -> Result<bool, Self::Error> {
        Ok(!Pin::is_set_high(self))
    }
}

impl InputPin for Pin<Input> {
    type Error = Infallible;

    fn is_high(&self) -> Result<bool, Self::Error> {
        Ok(Pin::is_high(self))
    }

    fn is_low(&self) -> Result<bool, Self::Error> {
        Ok(Pin::is_low(self))
    }
}

// Arduino Uno pin names
pub mod board {
    use super::*;

    pub const D3: Pin<Input> = Pin::new(Port::D, 3);
    pub const D5: Pin<Input> = Pin::new(Port::D, 5);
    pub const D6: Pin<Input> = Pin::new(Port::D, 6);
    pub const D9: Pin<Input> = Pin::new(Port::B, 1);
    pub const D10: Pin<Input> = Pin::new(Port::B, 2);
    pub const D11: Pin<Input> = Pin::new(Port::B, 3);
    /// On-board LED
    pub const D13: Pin<Input> = Pin::new(Port::B, 5);
    pub const A0: Pin<Input> = Pin::new(Port::C, 0);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::register::sim;

    #[test]
    fn output_sets_direction_and_level() {
        let mut led = Pin::new(Port::B, 5).into_output();
        assert_eq!(sim::peek(0x24), 0b0010_0000);

        led.set_high();
        assert_eq!(sim::peek(0x25), 0b0010_0000);
        assert!(led.is_set_high());

        led.toggle();
        assert_eq!(sim::peek(0x25), 0);
        led.toggle();
        assert!(led.is_set_high());

        led.set_low();
        assert!(!led.is_set_high());
    }

    #[test]
    fn pull_up_input_drives_port_latch() {
        sim::poke(0x2A, 0xFF);
        let pin = Pin::new(Port::D, 2).into_pull_up_input();
        assert_eq!(sim::peek(0x2A), 0b1111_1011);
        assert_eq!(sim::peek(0x2B), 0b0000_0100);

        let pin = pin.into_input();
        assert_eq!(sim::peek(0x2B), 0);
        assert!(pin.is_low());

        sim::poke(0x29, 0b0000_0100);
        assert!(pin.is_high());
    }

    #[test]
    fn embedded_hal_traits() {
        let mut pin = Pin::new(Port::C, 1).into_output();
        OutputPin::set_high(&mut pin).unwrap();
        assert!(StatefulOutputPin::is_set_high(&pin).unwrap());
        OutputPin::set_low(&mut pin).unwrap();
        assert!(StatefulOutputPin::is_set_low(&pin).unwrap());
    }
}
