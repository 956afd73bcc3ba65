//! Timer/counter register model
//!
//! `Timer8` covers Timer0 and Timer2, `Timer16` covers Timer1. Both are thin
//! `Copy` handles over a register group; all state lives in the hardware.

use avr_device::atmega328p::{TC0, TC1, TC2};

use super::gpio::Port;
use super::register::{impl_registers, Registers, WideRegisters};

const COMA_MASK: u8 = 0b1100_0000;
const COMB_MASK: u8 = 0b0011_0000;
const CLOCK_MASK: u8 = 0b0000_0111;

const TIMER8_CRA_MODE_MASK: u8 = 0b0000_0011;
const TIMER8_CRB_MODE_MASK: u8 = 0b0000_1000;

const TIMER16_CRA_MODE_MASK: u8 = 0b0000_0011;
const TIMER16_CRB_MODE_MASK: u8 = 0b0001_1000;

/// Clock select value that stops the counter
pub const CLOCK_NONE: u8 = 0;

/// PWM output channel of a timer
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Channel {
    A,
    B,
}

/// Pin behaviour on compare match
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum CompareOutputMode {
    /// Pin disconnected from the waveform generator
    Normal = 0b00,
    Toggle = 0b01,
    Clear = 0b10,
    Set = 0b11,
}

impl CompareOutputMode {
    /// Clear on up-count match: high while the counter is below the compare value
    pub const NON_INVERTING: Self = CompareOutputMode::Clear;
    pub const INVERTING: Self = CompareOutputMode::Set;

    fn from_bits(bits: u8) -> Self {
        match bits & 0b11 {
            0b00 => CompareOutputMode::Normal,
            0b01 => CompareOutputMode::Toggle,
            0b10 => CompareOutputMode::Clear,
            _ => CompareOutputMode::Set,
        }
    }
}

impl Channel {
    const fn com_shift(self) -> u8 {
        match self {
            Channel::A => 6,
            Channel::B => 4,
        }
    }

    const fn com_mask(self) -> u8 {
        match self {
            Channel::A => COMA_MASK,
            Channel::B => COMB_MASK,
        }
    }
}

/// Waveform generation modes of the 8-bit timers
///
/// Bits 1:0 are WGMx1:0 in TCCRxA, bit 3 is WGMx2 in TCCRxB.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Timer8Mode {
    Normal = 0,
    PhaseCorrect = 1,
    Ctc = 2,
    FastPwm = 3,
    PhaseCorrectOcra = 9,
    FastPwmOcra = 11,
    /// Combination with no defined meaning on this part
    Reserved = 0xFF,
}

impl Timer8Mode {
    fn from_bits(bits: u8) -> Self {
        match bits {
            0 => Timer8Mode::Normal,
            1 => Timer8Mode::PhaseCorrect,
            2 => Timer8Mode::Ctc,
            3 => Timer8Mode::FastPwm,
            9 => Timer8Mode::PhaseCorrectOcra,
            11 => Timer8Mode::FastPwmOcra,
            _ => Timer8Mode::Reserved,
        }
    }
}

/// Waveform generation modes of the 16-bit timer
///
/// Bits 1:0 are WGM11:10 in TCCR1A, bits 4:3 are WGM13:12 in TCCR1B.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Timer16Mode {
    Normal = 0b00000,
    PhaseCorrect8 = 0b00001,
    PhaseCorrect9 = 0b00010,
    PhaseCorrect10 = 0b00011,
    CtcOcra = 0b01000,
    FastPwm8 = 0b01001,
    FastPwm9 = 0b01010,
    FastPwm10 = 0b01011,
    PhaseFrequencyCorrectIcr = 0b10000,
    PhaseFrequencyCorrectOcra = 0b10001,
    PhaseCorrectIcr = 0b10010,
    PhaseCorrectOcra = 0b10011,
    CtcIcr = 0b11000,
    Reserved = 0b11001,
    FastPwmIcr = 0b11010,
    FastPwmOcra = 0b11011,
}

impl Timer16Mode {
    fn from_bits(bits: u8) -> Self {
        use Timer16Mode::*;
        match bits {
            0b00000 => Normal,
            0b00001 => PhaseCorrect8,
            0b00010 => PhaseCorrect9,
            0b00011 => PhaseCorrect10,
            0b01000 => CtcOcra,
            0b01001 => FastPwm8,
            0b01010 => FastPwm9,
            0b01011 => FastPwm10,
            0b10000 => PhaseFrequencyCorrectIcr,
            0b10001 => PhaseFrequencyCorrectOcra,
            0b10010 => PhaseCorrectIcr,
            0b10011 => PhaseCorrectOcra,
            0b11000 => CtcIcr,
            0b11010 => FastPwmIcr,
            0b11011 => FastPwmOcra,
            _ => Reserved,
        }
    }
}

/// Byte registers of an 8-bit timer
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Timer8Register {
    Tccra,
    Tccrb,
    Tcnt,
    Ocra,
    Ocrb,
}

/// Control registers of the 16-bit timer
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Timer16Register {
    Tccra,
    Tccrb,
    Tccrc,
}

/// Counter, capture and compare registers of the 16-bit timer
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Timer16WideRegister {
    Tcnt,
    Icr,
    Ocra,
    Ocrb,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Timer8Id {
    Timer0,
    Timer2,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Timer16Id {
    Timer1,
}

impl_registers! {
    Timer8Id: Timer8Register {
        Timer8Id::Timer0 => TC0 {
            Tccra => tccr0a,
            Tccrb => tccr0b,
            Tcnt => tcnt0,
            Ocra => ocr0a,
            Ocrb => ocr0b,
        },
        Timer8Id::Timer2 => TC2 {
            Tccra => tccr2a,
            Tccrb => tccr2b,
            Tcnt => tcnt2,
            Ocra => ocr2a,
            Ocrb => ocr2b,
        },
    }
}

impl_registers! {
    Timer16Id: Timer16Register {
        Timer16Id::Timer1 => TC1 {
            Tccra => tccr1a,
            Tccrb => tccr1b,
            Tccrc => tccr1c,
        },
    }
}

impl_registers! {
    wide Timer16Id: Timer16WideRegister {
        Timer16Id::Timer1 => TC1 {
            Tcnt => tcnt1,
            Icr => icr1,
            Ocra => ocr1a,
            Ocrb => ocr1b,
        },
    }
}

impl Timer8Id {
    /// Port and bit of the OCxA/OCxB output
    pub const fn output_pin(self, channel: Channel) -> (Port, u8) {
        match (self, channel) {
            (Timer8Id::Timer0, Channel::A) => (Port::D, 6),
            (Timer8Id::Timer0, Channel::B) => (Port::D, 5),
            (Timer8Id::Timer2, Channel::A) => (Port::B, 3),
            (Timer8Id::Timer2, Channel::B) => (Port::D, 3),
        }
    }
}

impl Timer16Id {
    pub const fn output_pin(self, channel: Channel) -> (Port, u8) {
        match (self, channel) {
            (Timer16Id::Timer1, Channel::A) => (Port::B, 1),
            (Timer16Id::Timer1, Channel::B) => (Port::B, 2),
        }
    }
}

/// Handle to Timer0 or Timer2
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Timer8 {
    id: Timer8Id,
}

impl Timer8 {
    pub const fn new(id: Timer8Id) -> Self {
        Self { id }
    }

    pub fn id(&self) -> Timer8Id {
        self.id
    }

    pub fn mode(&self) -> Timer8Mode {
        Timer8Mode::from_bits(
            (self.id.read(Timer8Register::Tccra) & TIMER8_CRA_MODE_MASK)
                | (self.id.read(Timer8Register::Tccrb) & TIMER8_CRB_MODE_MASK),
        )
    }

    pub fn set_mode(&self, mode: Timer8Mode) {
        let bits = mode as u8;
        self.id
            .set_mask(Timer8Register::Tccra, TIMER8_CRA_MODE_MASK, bits);
        self.id
            .set_mask(Timer8Register::Tccrb, TIMER8_CRB_MODE_MASK, bits);
    }

    pub fn clock(&self) -> u8 {
        self.id.read(Timer8Register::Tccrb) & CLOCK_MASK
    }

    /// Select the clock source; 0 stops the counter
    pub fn set_clock(&self, clock_select: u8) {
        self.id
            .set_mask(Timer8Register::Tccrb, CLOCK_MASK, clock_select);
    }

    pub fn compare_output_mode(&self, channel: Channel) -> CompareOutputMode {
        CompareOutputMode::from_bits(self.id.read(Timer8Register::Tccra) >> channel.com_shift())
    }

    pub fn set_compare_output_mode(&self, channel: Channel, mode: CompareOutputMode) {
        self.id.set_mask(
            Timer8Register::Tccra,
            channel.com_mask(),
            (mode as u8) << channel.com_shift(),
        );
    }

    pub fn counter(&self) -> u8 {
        self.id.read(Timer8Register::Tcnt)
    }

    pub fn set_counter(&self, value: u8) {
        self.id.write(Timer8Register::Tcnt, value);
    }

    pub fn compare(&self, channel: Channel) -> u8 {
        self.id.read(Timer8Register::compare(channel))
    }

    pub fn set_compare(&self, channel: Channel, value: u8) {
        self.id.write(Timer8Register::compare(channel), value);
    }

    pub fn ocra(&self) -> u8 {
        self.compare(Channel::A)
    }

    pub fn set_ocra(&self, value: u8) {
        self.set_compare(Channel::A, value);
    }

    pub fn ocrb(&self) -> u8 {
        self.compare(Channel::B)
    }

    pub fn set_ocrb(&self, value: u8) {
        self.set_compare(Channel::B, value);
    }
}

impl Timer8Register {
    const fn compare(channel: Channel) -> Self {
        match channel {
            Channel::A => Timer8Register::Ocra,
            Channel::B => Timer8Register::Ocrb,
        }
    }
}

/// Handle to Timer1
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Timer16 {
    id: Timer16Id,
}

impl Timer16 {
    pub const fn new(id: Timer16Id) -> Self {
        Self { id }
    }

    pub fn id(&self) -> Timer16Id {
        self.id
    }

    pub fn mode(&self) -> Timer16Mode {
        Timer16Mode::from_bits(
            (self.id.read(Timer16Register::Tccra) & TIMER16_CRA_MODE_MASK)
                | (self.id.read(Timer16Register::Tccrb) & TIMER16_CRB_MODE_MASK),
        )
    }

    pub fn set_mode(&self, mode: Timer16Mode) {
        let bits = mode as u8;
        self.id
            .set_mask(Timer16Register::Tccra, TIMER16_CRA_MODE_MASK, bits);
        self.id
            .set_mask(Timer16Register::Tccrb, TIMER16_CRB_MODE_MASK, bits);
    }

    pub fn clock(&self) -> u8 {
        self.id.read(Timer16Register::Tccrb) & CLOCK_MASK
    }

    pub fn set_clock(&self, clock_select: u8) {
        self.id
            .set_mask(Timer16Register::Tccrb, CLOCK_MASK, clock_select);
    }

    pub fn compare_output_mode(&self, channel: Channel) -> CompareOutputMode {
        CompareOutputMode::from_bits(self.id.read(Timer16Register::Tccra) >> channel.com_shift())
    }

    pub fn set_compare_output_mode(&self, channel: Channel, mode: CompareOutputMode) {
        self.id.set_mask(
            Timer16Register::Tccra,
            channel.com_mask(),
            (mode as u8) << channel.com_shift(),
        );
    }

    pub fn counter(&self) -> u16 {
        self.id.read_wide(Timer16WideRegister::Tcnt)
    }

    pub fn set_counter(&self, value: u16) {
        self.id.write_wide(Timer16WideRegister::Tcnt, value);
    }

    pub fn compare(&self, channel: Channel) -> u16 {
        self.id.read_wide(Timer16WideRegister::compare(channel))
    }

    pub fn set_compare(&self, channel: Channel, value: u16) {
        self.id
            .write_wide(Timer16WideRegister::compare(channel), value);
    }

    pub fn ocra(&self) -> u16 {
        self.compare(Channel::A)
    }

    pub fn set_ocra(&self, value: u16) {
        self.set_compare(Channel::A, value);
    }

    pub fn ocrb(&self) -> u16 {
        self.compare(Channel::B)
    }

    pub fn set_ocrb(&self, value: u16) {
        self.set_compare(Channel::B, value);
    }

    pub fn icr(&self) -> u16 {
        self.id.read_wide(Timer16WideRegister::Icr)
    }

    pub fn set_icr(&self, value: u16) {
        self.id.write_wide(Timer16WideRegister::Icr, value);
    }
}

impl Timer16WideRegister {
    const fn compare(channel: Channel) -> Self {
        match channel {
            Channel::A => Timer16WideRegister::Ocra,
            Channel::B => Timer16WideRegister::Ocrb,
        }
    }
}
