//! Analog to digital converter
//!
//! Conversions are started with [`Adc::start`] and collected by polling
//! [`Adc::read16`] or [`Adc::read8`] until they stop returning `WouldBlock`.

use core::convert::Infallible;

use avr_device::atmega328p::ADC;

use super::register::{block, impl_registers, interrupt_free, Registers};

// ADCSRA
const ADEN: u8 = 7;
const ADSC: u8 = 6;
const ADATE: u8 = 5;
const ADIF: u8 = 4;
const ADPS_MASK: u8 = 0b0000_0111;

// ADMUX
const REFS_MASK: u8 = 0b1100_0000;
const ADLAR: u8 = 5;
const MUX_MASK: u8 = 0b0000_1111;

// ADCSRB
const ADTS_MASK: u8 = 0b0000_0111;

// DIDR0: ADC0D..ADC5D
const DIDR0_MASK: u8 = 0b0011_1111;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AdcRegister {
    Adcsra,
    Adcsrb,
    Admux,
    /// Digital input disable for ADC0..ADC5
    Didr0,
}

#[derive(Clone, Copy, Debug)]
struct AdcBlock;

impl_registers! {
    AdcBlock: AdcRegister {
        _ => ADC {
            Adcsra => adcsra,
            Adcsrb => adcsrb,
            Admux => admux,
            Didr0 => didr0,
        },
    }
}

impl AdcBlock {
    /// ADCL then ADCH; the data register is read-only
    fn data(self) -> u16 {
        interrupt_free(|| unsafe { block(ADC::ptr()) }.adc.read().bits())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Reference {
    Aref = 0x00,
    Avcc = 0x40,
    Internal1V1 = 0xC0,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Channel {
    Adc0 = 0,
    Adc1 = 1,
    Adc2 = 2,
    Adc3 = 3,
    Adc4 = 4,
    Adc5 = 5,
    Adc6 = 6,
    Adc7 = 7,
    /// Temperature sensor
    Adc8 = 8,
    /// 1.1 V bandgap
    Vbg = 14,
    Gnd = 15,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Prescaler {
    Div2 = 1,
    Div4 = 2,
    Div8 = 3,
    Div16 = 4,
    Div32 = 5,
    Div64 = 6,
    Div128 = 7,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Adjustment {
    Right,
    /// Result in ADCH bits 7:0 and ADCL bits 7:6
    Left,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum TriggerSource {
    FreeRunning = 0,
    AnalogComparator = 1,
    ExternalInterrupt0 = 2,
    Timer0CompareA = 3,
    Timer0Overflow = 4,
    Timer1CompareB = 5,
    Timer1Overflow = 6,
    Timer1Capture = 7,
}

pub struct Adc {
    regs: AdcBlock,
}

impl Adc {
    pub fn new() -> Self {
        Self { regs: AdcBlock }
    }

    pub fn set_reference(&mut self, reference: Reference) {
        self.regs
            .set_mask(AdcRegister::Admux, REFS_MASK, reference as u8);
    }

    pub fn set_channel(&mut self, channel: Channel) {
        self.regs
            .set_mask(AdcRegister::Admux, MUX_MASK, channel as u8);
    }

    pub fn set_prescaler(&mut self, prescaler: Prescaler) {
        self.regs
            .set_mask(AdcRegister::Adcsra, ADPS_MASK, prescaler as u8);
    }

    pub fn set_adjustment(&mut self, adjustment: Adjustment) {
        self.regs
            .write_bit(AdcRegister::Admux, ADLAR, adjustment == Adjustment::Left);
    }

    pub fn set_auto_trigger(&mut self, enabled: bool) {
        self.regs.write_bit(AdcRegister::Adcsra, ADATE, enabled);
    }

    /// Only used while auto triggering is enabled.
    pub fn set_trigger_source(&mut self, source: TriggerSource) {
        self.regs
            .set_mask(AdcRegister::Adcsrb, ADTS_MASK, source as u8);
    }

    pub fn enable(&mut self) {
        self.regs.set_bits(AdcRegister::Adcsra, 1 << ADEN);
    }

    pub fn disable(&mut self) {
        self.regs.clear_bits(AdcRegister::Adcsra, 1 << ADEN);
    }

    /// Turn off the digital input buffers of the analog pins in `mask`
    /// (bit n = ADCn, n < 6). Pins outside `mask` keep their setting.
    pub fn disable_digital_inputs(&mut self, mask: u8) {
        self.regs
            .set_bits(AdcRegister::Didr0, mask & DIDR0_MASK);
    }

    /// Turn the digital input buffers of the pins in `mask` back on.
    pub fn enable_digital_inputs(&mut self, mask: u8) {
        self.regs
            .clear_bits(AdcRegister::Didr0, mask & DIDR0_MASK);
    }

    pub fn start(&mut self) {
        self.regs.set_bits(AdcRegister::Adcsra, 1 << ADSC);
    }

    pub fn is_converting(&self) -> bool {
        self.regs.is_set(AdcRegister::Adcsra, ADSC)
    }

    /// Full conversion result, as placed by the current adjustment.
    pub fn read16(&mut self) -> nb::Result<u16, Infallible> {
        self.complete()?;
        Ok(self.regs.data())
    }

    /// High eight bits of a left adjusted result (ADCH).
    pub fn read8(&mut self) -> nb::Result<u8, Infallible> {
        self.complete()?;
        Ok((self.regs.data() >> 8) as u8)
    }

    // ADIF is cleared by writing a one to it
    fn complete(&mut self) -> nb::Result<(), Infallible> {
        if !self.regs.is_set(AdcRegister::Adcsra, ADIF) {
            return Err(nb::Error::WouldBlock);
        }
        self.regs.set_bits(AdcRegister::Adcsra, 1 << ADIF);
        Ok(())
    }
}

impl Default for Adc {
    fn default() -> Self {
        Self::new()
    }
}
