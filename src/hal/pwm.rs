//! PWM (Pulse Width Modulation) on the hardware timers
//!
//! A [`PwmChannel`] binds one output compare channel of a timer. Frequencies
//! are requested in hertz together with the CPU clock and mapped onto a
//! clock prescaler and a waveform mode:
//!
//! * [`PwmChannel::set_frequency_hint`] keeps the counter's natural top, so
//!   only the predefined rates `cpu / (2^bits * divisor)` (fast PWM) and half
//!   of those (phase correct) are reachable. Duty cycles keep full resolution.
//! * [`PwmChannel::set_frequency`] additionally programs a top value so the
//!   requested rate is met exactly, trading away duty-cycle resolution.
//!
//! Requesting 0 Hz is a contract violation and panics on the division.

use embedded_hal::PwmPin;

use super::gpio::{Output, Pin};
use super::timer::{
    Channel, CompareOutputMode, Timer16, Timer16Mode, Timer8, Timer8Id, Timer8Mode, CLOCK_NONE,
};

/// Clock prescaler divisors of one timer, ascending, starting at 1
#[derive(Debug, PartialEq, Eq)]
pub struct DivisorTable(&'static [u16]);

impl DivisorTable {
    pub const fn as_slice(&self) -> &'static [u16] {
        self.0
    }

    pub const fn len(&self) -> usize {
        self.0.len()
    }

    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<u32> {
        self.0.get(index).map(|&d| u32::from(d))
    }

    fn at(&self, index: usize) -> u32 {
        u32::from(self.0[index])
    }
}

pub static TIMER0_DIVISORS: DivisorTable = DivisorTable(&[1, 8, 64, 256, 1024]);
pub static TIMER1_DIVISORS: DivisorTable = DivisorTable(&[1, 8, 64, 256, 1024]);
pub static TIMER2_DIVISORS: DivisorTable = DivisorTable(&[1, 8, 32, 64, 128, 256, 1024]);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Waveform {
    /// Counts up then down; half the rate of fast PWM for the same divisor
    PhaseCorrect,
    /// Counts up to top and wraps
    FastPwm,
}

/// Prescaler and waveform picked for a requested frequency
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DivisorModeChoice {
    pub index: usize,
    pub waveform: Waveform,
}

impl DivisorModeChoice {
    /// Hardware clock select value; 0 is reserved for "stopped"
    pub fn clock_select(&self) -> u8 {
        self.index as u8 + 1
    }
}

/// Prescaler, waveform and top for an exact frequency
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExactSetting {
    pub index: usize,
    pub waveform: Waveform,
    pub top: u32,
}

impl ExactSetting {
    pub fn clock_select(&self) -> u8 {
        self.index as u8 + 1
    }
}

/// Pick the prescaler and waveform for `frequency` on a counter of
/// `width_bits` bits.
///
/// `divisor = (cpu_frequency >> width_bits) / frequency` is the total divisor
/// a full-range counter needs. The table is walked in ascending order,
/// starting out in phase-correct mode: the first entry strictly above
/// `divisor` selects fast PWM at that index; before that, the first entry
/// whose double is above `divisor` stops the walk in phase-correct mode. If
/// neither happens the slowest setting (last entry, phase correct) is kept.
///
/// The picked effective divisor (entry, or twice the entry in phase-correct
/// mode) is the smallest one above `divisor`.
pub fn select_divisor(
    table: &DivisorTable,
    cpu_frequency: u32,
    frequency: u32,
    width_bits: u32,
) -> DivisorModeChoice {
    let divisor = (cpu_frequency >> width_bits) / frequency;

    for (index, &value) in table.as_slice().iter().enumerate() {
        let value = u32::from(value);
        if value > divisor {
            return DivisorModeChoice {
                index,
                waveform: Waveform::FastPwm,
            };
        }
        if value * 2 > divisor {
            return DivisorModeChoice {
                index,
                waveform: Waveform::PhaseCorrect,
            };
        }
    }

    DivisorModeChoice {
        index: table.len() - 1,
        waveform: Waveform::PhaseCorrect,
    }
}

/// Turn the approximate choice into an exact setting with a programmable top.
///
/// * fast PWM at index 0: the request is above the fastest full-range rate;
///   stay in fast PWM at index 0 and shorten the count.
/// * fast PWM at index `i`: phase correct at `i`, top from the doubled divisor.
/// * phase correct at `i` with a larger entry left: fast PWM at `i + 1`.
/// * phase correct at the last entry: phase correct with top at `ceiling`,
///   the slowest rate the timer produces.
pub fn exact_setting(
    table: &DivisorTable,
    cpu_frequency: u32,
    frequency: u32,
    width_bits: u32,
    ceiling: u32,
) -> ExactSetting {
    let choice = select_divisor(table, cpu_frequency, frequency, width_bits);
    let index = choice.index;

    match choice.waveform {
        Waveform::FastPwm if index == 0 => ExactSetting {
            index,
            waveform: Waveform::FastPwm,
            top: cpu_frequency / (frequency * table.at(0)),
        },
        Waveform::FastPwm => ExactSetting {
            index,
            waveform: Waveform::PhaseCorrect,
            top: cpu_frequency / (frequency * 2 * table.at(index)),
        },
        Waveform::PhaseCorrect if index + 1 < table.len() => ExactSetting {
            index: index + 1,
            waveform: Waveform::FastPwm,
            top: cpu_frequency / (frequency * table.at(index + 1)),
        },
        Waveform::PhaseCorrect => ExactSetting {
            index,
            waveform: Waveform::PhaseCorrect,
            top: ceiling,
        },
    }
}

/// What a frequency call programmed into the timer
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrequencySetting {
    pub clock_select: u8,
    pub waveform: Waveform,
    /// Programmed top, `None` when the counter runs over its natural range
    pub top: Option<u16>,
}

impl ufmt::uDisplay for FrequencySetting {
    fn fmt<W>(&self, f: &mut ufmt::Formatter<'_, W>) -> Result<(), W::Error>
    where
        W: ufmt::uWrite + ?Sized,
    {
        let waveform = match self.waveform {
            Waveform::PhaseCorrect => "phase-correct",
            Waveform::FastPwm => "fast",
        };
        ufmt::uwrite!(f, "cs={} mode={}", self.clock_select, waveform)?;
        match self.top {
            Some(top) => ufmt::uwrite!(f, " top={}", top),
            None => f.write_str(" top=free"),
        }
    }
}

/// Free-running counter width for 16-bit hint mode
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Resolution {
    #[default]
    Bits8,
    Bits9,
    Bits10,
}

impl Resolution {
    pub const fn bits(self) -> u32 {
        match self {
            Resolution::Bits8 => 8,
            Resolution::Bits9 => 9,
            Resolution::Bits10 => 10,
        }
    }

    pub const fn top(self) -> u16 {
        match self {
            Resolution::Bits8 => 0x00FF,
            Resolution::Bits9 => 0x01FF,
            Resolution::Bits10 => 0x03FF,
        }
    }
}

/// Per-width PWM timer operations
pub trait FrequencySetter: Copy {
    /// Compare register width
    type Duty: Copy;

    fn divisor_table(&self) -> &'static DivisorTable;

    fn duty(&self, channel: Channel) -> Self::Duty;

    fn set_duty(&self, channel: Channel, duty: Self::Duty);

    /// Claim the OCxn pin as an output
    fn output_pin(&self, channel: Channel) -> Pin<Output>;

    fn set_compare_output_mode(&self, channel: Channel, mode: CompareOutputMode);

    /// Program an exact frequency, sacrificing duty-cycle resolution.
    fn set_frequency(&self, frequency: u32, cpu_frequency: u32) -> FrequencySetting;

    /// Program the closest predefined frequency, keeping the natural top.
    fn set_frequency_hint(&self, frequency: u32, cpu_frequency: u32) -> FrequencySetting;

    /// Value at which the counter currently turns around
    fn top(&self) -> Self::Duty;

    /// Plain counting mode with the clock stopped
    fn stop(&self);
}

impl FrequencySetter for Timer8 {
    type Duty = u8;

    fn divisor_table(&self) -> &'static DivisorTable {
        match self.id() {
            Timer8Id::Timer0 => &TIMER0_DIVISORS,
            Timer8Id::Timer2 => &TIMER2_DIVISORS,
        }
    }

    fn duty(&self, channel: Channel) -> u8 {
        self.compare(channel)
    }

    fn set_duty(&self, channel: Channel, duty: u8) {
        self.set_compare(channel, duty);
    }

    fn output_pin(&self, channel: Channel) -> Pin<Output> {
        let (port, bit) = self.id().output_pin(channel);
        Pin::new(port, bit).into_output()
    }

    fn set_compare_output_mode(&self, channel: Channel, mode: CompareOutputMode) {
        Timer8::set_compare_output_mode(self, channel, mode);
    }

    /// Top lives in OCRxA, so channel A cannot carry a duty cycle afterwards.
    fn set_frequency(&self, frequency: u32, cpu_frequency: u32) -> FrequencySetting {
        let exact = exact_setting(
            self.divisor_table(),
            cpu_frequency,
            frequency,
            8,
            u32::from(u8::MAX),
        );
        let top = exact.top.min(u32::from(u8::MAX)) as u8;

        self.set_clock(exact.clock_select());
        self.set_mode(match exact.waveform {
            Waveform::FastPwm => Timer8Mode::FastPwmOcra,
            Waveform::PhaseCorrect => Timer8Mode::PhaseCorrectOcra,
        });
        self.set_ocra(top);

        FrequencySetting {
            clock_select: exact.clock_select(),
            waveform: exact.waveform,
            top: Some(u16::from(top)),
        }
    }

    fn set_frequency_hint(&self, frequency: u32, cpu_frequency: u32) -> FrequencySetting {
        let choice = select_divisor(self.divisor_table(), cpu_frequency, frequency, 8);

        self.set_clock(choice.clock_select());
        self.set_mode(match choice.waveform {
            Waveform::FastPwm => Timer8Mode::FastPwm,
            Waveform::PhaseCorrect => Timer8Mode::PhaseCorrect,
        });

        FrequencySetting {
            clock_select: choice.clock_select(),
            waveform: choice.waveform,
            top: None,
        }
    }

    fn top(&self) -> u8 {
        match self.mode() {
            Timer8Mode::FastPwmOcra | Timer8Mode::PhaseCorrectOcra | Timer8Mode::Ctc => {
                self.ocra()
            }
            _ => u8::MAX,
        }
    }

    fn stop(&self) {
        self.set_mode(Timer8Mode::Normal);
        self.set_clock(CLOCK_NONE);
    }
}

impl Timer16 {
    /// Hint mode on a free-running counter of the given width.
    pub fn set_frequency_hint_with_resolution(
        &self,
        frequency: u32,
        cpu_frequency: u32,
        resolution: Resolution,
    ) -> FrequencySetting {
        let choice = select_divisor(
            self.divisor_table(),
            cpu_frequency,
            frequency,
            resolution.bits(),
        );

        self.set_clock(choice.clock_select());
        self.set_mode(match (choice.waveform, resolution) {
            (Waveform::FastPwm, Resolution::Bits8) => Timer16Mode::FastPwm8,
            (Waveform::FastPwm, Resolution::Bits9) => Timer16Mode::FastPwm9,
            (Waveform::FastPwm, Resolution::Bits10) => Timer16Mode::FastPwm10,
            (Waveform::PhaseCorrect, Resolution::Bits8) => Timer16Mode::PhaseCorrect8,
            (Waveform::PhaseCorrect, Resolution::Bits9) => Timer16Mode::PhaseCorrect9,
            (Waveform::PhaseCorrect, Resolution::Bits10) => Timer16Mode::PhaseCorrect10,
        });

        FrequencySetting {
            clock_select: choice.clock_select(),
            waveform: choice.waveform,
            top: None,
        }
    }
}

impl FrequencySetter for Timer16 {
    type Duty = u16;

    fn divisor_table(&self) -> &'static DivisorTable {
        &TIMER1_DIVISORS
    }

    fn duty(&self, channel: Channel) -> u16 {
        self.compare(channel)
    }

    fn set_duty(&self, channel: Channel, duty: u16) {
        self.set_compare(channel, duty);
    }

    fn output_pin(&self, channel: Channel) -> Pin<Output> {
        let (port, bit) = self.id().output_pin(channel);
        Pin::new(port, bit).into_output()
    }

    fn set_compare_output_mode(&self, channel: Channel, mode: CompareOutputMode) {
        Timer16::set_compare_output_mode(self, channel, mode);
    }

    /// Top lives in ICR1; both compare channels stay usable.
    fn set_frequency(&self, frequency: u32, cpu_frequency: u32) -> FrequencySetting {
        let exact = exact_setting(
            self.divisor_table(),
            cpu_frequency,
            frequency,
            16,
            u32::from(u16::MAX),
        );
        let top = exact.top.min(u32::from(u16::MAX)) as u16;

        self.set_clock(exact.clock_select());
        self.set_mode(match exact.waveform {
            Waveform::FastPwm => Timer16Mode::FastPwmIcr,
            Waveform::PhaseCorrect => Timer16Mode::PhaseCorrectIcr,
        });
        self.set_icr(top);

        FrequencySetting {
            clock_select: exact.clock_select(),
            waveform: exact.waveform,
            top: Some(top),
        }
    }

    fn set_frequency_hint(&self, frequency: u32, cpu_frequency: u32) -> FrequencySetting {
        self.set_frequency_hint_with_resolution(frequency, cpu_frequency, Resolution::Bits8)
    }

    fn top(&self) -> u16 {
        use Timer16Mode::*;
        match self.mode() {
            PhaseCorrect8 | FastPwm8 => Resolution::Bits8.top(),
            PhaseCorrect9 | FastPwm9 => Resolution::Bits9.top(),
            PhaseCorrect10 | FastPwm10 => Resolution::Bits10.top(),
            CtcOcra | PhaseFrequencyCorrectOcra | PhaseCorrectOcra | FastPwmOcra => self.ocra(),
            CtcIcr | PhaseFrequencyCorrectIcr | PhaseCorrectIcr | FastPwmIcr => self.icr(),
            Normal | Reserved => u16::MAX,
        }
    }

    fn stop(&self) {
        self.set_mode(Timer16Mode::Normal);
        self.set_clock(CLOCK_NONE);
    }
}

/// One PWM output: a timer, one of its channels and the pin it drives
///
/// Only one `PwmChannel` may exist per timer and channel. Two channels of the
/// same timer share its prescaler and waveform mode, so a frequency call on
/// either retunes both.
pub struct PwmChannel<T: FrequencySetter> {
    timer: T,
    channel: Channel,
    pin: Pin<Output>,
    divisors: &'static DivisorTable,
}

impl<T: FrequencySetter> PwmChannel<T> {
    /// Bind `channel` of `timer`: the pin becomes an output and the
    /// waveform generator drives it non-inverted.
    pub fn init(timer: T, channel: Channel) -> Self {
        let pin = timer.output_pin(channel);
        timer.set_compare_output_mode(channel, CompareOutputMode::NON_INVERTING);

        Self {
            timer,
            channel,
            pin,
            divisors: timer.divisor_table(),
        }
    }

    pub fn timer(&self) -> &T {
        &self.timer
    }

    pub fn channel(&self) -> Channel {
        self.channel
    }

    pub fn pin(&self) -> &Pin<Output> {
        &self.pin
    }

    pub fn divisor_table(&self) -> &'static DivisorTable {
        self.divisors
    }

    /// Set an exact frequency. Duty cycles above the returned top never
    /// match and leave the output saturated.
    pub fn set_frequency(&mut self, frequency: u32, cpu_frequency: u32) -> FrequencySetting {
        self.timer.set_frequency(frequency, cpu_frequency)
    }

    /// Set the predefined frequency picked by [`select_divisor`].
    pub fn set_frequency_hint(&mut self, frequency: u32, cpu_frequency: u32) -> FrequencySetting {
        self.timer.set_frequency_hint(frequency, cpu_frequency)
    }

    /// Write the compare register. Not checked against the active top.
    pub fn set_duty_cycle(&mut self, duty_cycle: T::Duty) {
        self.timer.set_duty(self.channel, duty_cycle);
    }

    pub fn duty_cycle(&self) -> T::Duty {
        self.timer.duty(self.channel)
    }

    /// Detach the pin, return to plain counting and stop the clock.
    pub fn close(&mut self) {
        self.timer
            .set_compare_output_mode(self.channel, CompareOutputMode::Normal);
        self.timer.stop();
    }
}

impl PwmChannel<Timer16> {
    pub fn set_frequency_hint_with_resolution(
        &mut self,
        frequency: u32,
        cpu_frequency: u32,
        resolution: Resolution,
    ) -> FrequencySetting {
        self.timer
            .set_frequency_hint_with_resolution(frequency, cpu_frequency, resolution)
    }
}

impl<T: FrequencySetter> PwmPin for PwmChannel<T> {
    type Duty = T::Duty;

    fn disable(&mut self) {
        self.timer
            .set_compare_output_mode(self.channel, CompareOutputMode::Normal);
    }

    fn enable(&mut self) {
        self.timer
            .set_compare_output_mode(self.channel, CompareOutputMode::NON_INVERTING);
    }

    fn get_duty(&self) -> Self::Duty {
        self.duty_cycle()
    }

    fn get_max_duty(&self) -> Self::Duty {
        self.timer.top()
    }

    fn set_duty(&mut self, duty: Self::Duty) {
        self.set_duty_cycle(duty);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::register::sim;
    use crate::hal::timer::Timer16Id;

    const CPU: u32 = 16_000_000;

    const TCCR0A: u16 = 0x44;
    const TCCR0B: u16 = 0x45;
    const OCR0A: u16 = 0x47;
    const DDRD: u16 = 0x2A;

    fn choice(index: usize, waveform: Waveform) -> DivisorModeChoice {
        DivisorModeChoice { index, waveform }
    }

    /// Rate a free-running counter of `bits` produces for a choice
    fn hint_rate(table: &DivisorTable, cpu: u32, bits: u32, c: DivisorModeChoice) -> u32 {
        let effective = match c.waveform {
            Waveform::FastPwm => table.at(c.index),
            Waveform::PhaseCorrect => 2 * table.at(c.index),
        };
        (cpu >> bits) / effective
    }

    fn exact_rate(table: &DivisorTable, cpu: u32, s: ExactSetting) -> u32 {
        let effective = match s.waveform {
            Waveform::FastPwm => table.at(s.index),
            Waveform::PhaseCorrect => 2 * table.at(s.index),
        };
        cpu / (effective * s.top)
    }

    #[test]
    fn one_kilohertz_on_timer0_is_fast_pwm_at_64() {
        let c = select_divisor(&TIMER0_DIVISORS, CPU, 1000, 8);
        assert_eq!(c, choice(2, Waveform::FastPwm));
        assert_eq!(c.clock_select(), 3);
    }

    #[test]
    fn timer0_predefined_boundaries() {
        // (requested, index, waveform) around the 16 MHz predefined rates
        let cases = [
            (63_000, 0, Waveform::FastPwm),
            (62_501, 0, Waveform::FastPwm),
            (62_500, 0, Waveform::PhaseCorrect),
            (31_251, 0, Waveform::PhaseCorrect),
            (31_250, 1, Waveform::FastPwm),
            (7_813, 1, Waveform::FastPwm),
            (7_812, 1, Waveform::PhaseCorrect),
            (3_907, 1, Waveform::PhaseCorrect),
            (3_906, 2, Waveform::FastPwm),
            (977, 2, Waveform::FastPwm),
            (976, 2, Waveform::PhaseCorrect),
            (489, 2, Waveform::PhaseCorrect),
            (488, 3, Waveform::FastPwm),
            (245, 3, Waveform::FastPwm),
            (244, 3, Waveform::PhaseCorrect),
            (123, 3, Waveform::PhaseCorrect),
            (122, 4, Waveform::FastPwm),
            (62, 4, Waveform::FastPwm),
            (61, 4, Waveform::PhaseCorrect),
            (30, 4, Waveform::PhaseCorrect),
        ];
        for (frequency, index, waveform) in cases {
            assert_eq!(
                select_divisor(&TIMER0_DIVISORS, CPU, frequency, 8),
                choice(index, waveform),
                "requested {frequency} Hz"
            );
        }
    }

    #[test]
    fn timer2_uses_its_wider_table() {
        assert_eq!(
            select_divisor(&TIMER2_DIVISORS, CPU, 1954, 8),
            choice(2, Waveform::FastPwm)
        );
        assert_eq!(
            select_divisor(&TIMER2_DIVISORS, CPU, 1953, 8),
            choice(2, Waveform::PhaseCorrect)
        );
        assert_eq!(
            select_divisor(&TIMER2_DIVISORS, CPU, 1000, 8),
            choice(2, Waveform::PhaseCorrect)
        );
        assert_eq!(
            select_divisor(&TIMER2_DIVISORS, CPU, 30, 8),
            choice(6, Waveform::PhaseCorrect)
        );
    }

    #[test]
    fn too_slow_keeps_the_slowest_setting() {
        assert_eq!(
            select_divisor(&TIMER0_DIVISORS, CPU, 1, 8),
            choice(4, Waveform::PhaseCorrect)
        );
    }

    #[test]
    fn selection_is_the_smallest_effective_divisor_above_the_requirement() {
        for table in [&TIMER0_DIVISORS, &TIMER2_DIVISORS] {
            for cpu in [1_000_000, 8_000_000, 16_000_000, 20_000_000] {
                let mut frequency = 1;
                while frequency < 200_000 {
                    let c = select_divisor(table, cpu, frequency, 8);
                    let divisor = (cpu >> 8) / frequency;
                    let value = table.at(c.index);
                    match c.waveform {
                        Waveform::FastPwm => {
                            assert!(value > divisor);
                            if c.index > 0 {
                                assert!(2 * table.at(c.index - 1) <= divisor);
                            }
                        }
                        Waveform::PhaseCorrect if 2 * value > divisor => {
                            assert!(value <= divisor);
                        }
                        Waveform::PhaseCorrect => {
                            // Below the slowest rate
                            assert_eq!(c.index, table.len() - 1);
                        }
                    }
                    frequency += frequency / 7 + 1;
                }
            }
        }
    }

    #[test]
    fn hint_rate_tracks_the_request() {
        // Pins the literal table walk: the realised rate never exceeds the request
        let max = (CPU >> 8) / TIMER0_DIVISORS.at(0);
        let min = (CPU >> 8) / (2 * TIMER0_DIVISORS.at(TIMER0_DIVISORS.len() - 1));
        for frequency in (40..max).step_by(97) {
            let c = select_divisor(&TIMER0_DIVISORS, CPU, frequency, 8);
            let rate = hint_rate(&TIMER0_DIVISORS, CPU, 8, c);
            assert!(rate <= frequency, "{frequency} Hz gave {rate} Hz");
            // Next faster setting would overshoot
            assert!(rate * 8 >= frequency);
        }
        let fastest = select_divisor(&TIMER0_DIVISORS, CPU, max + 1000, 8);
        assert_eq!(hint_rate(&TIMER0_DIVISORS, CPU, 8, fastest), max);
        let slowest = select_divisor(&TIMER0_DIVISORS, CPU, 1, 8);
        assert_eq!(hint_rate(&TIMER0_DIVISORS, CPU, 8, slowest), min);
    }

    #[test]
    fn exact_above_maximum_shortens_the_fast_count() {
        let s = exact_setting(&TIMER0_DIVISORS, CPU, 100_000, 8, 255);
        assert_eq!(
            s,
            ExactSetting {
                index: 0,
                waveform: Waveform::FastPwm,
                top: 160
            }
        );
        assert_eq!(exact_rate(&TIMER0_DIVISORS, CPU, s), 100_000);
    }

    #[test]
    fn exact_from_fast_switches_to_phase_correct_at_same_index() {
        let s = exact_setting(&TIMER0_DIVISORS, CPU, 1000, 8, 255);
        assert_eq!(
            s,
            ExactSetting {
                index: 2,
                waveform: Waveform::PhaseCorrect,
                top: 125
            }
        );
        assert_eq!(s.clock_select(), 3);
        assert_eq!(exact_rate(&TIMER0_DIVISORS, CPU, s), 1000);
    }

    #[test]
    fn exact_from_phase_correct_moves_to_next_divisor() {
        // 5000 Hz picks phase correct at index 1 (divisor 8)
        let s = exact_setting(&TIMER0_DIVISORS, CPU, 5000, 8, 255);
        assert_eq!(
            s,
            ExactSetting {
                index: 2,
                waveform: Waveform::FastPwm,
                top: 50
            }
        );
        assert_eq!(s.clock_select(), 3);
        assert_eq!(exact_rate(&TIMER0_DIVISORS, CPU, s), 5000);
    }

    #[test]
    fn exact_at_last_divisor_falls_back_to_ceiling() {
        let s = exact_setting(&TIMER0_DIVISORS, CPU, 40, 8, 255);
        assert_eq!(
            s,
            ExactSetting {
                index: 4,
                waveform: Waveform::PhaseCorrect,
                top: 255
            }
        );
        assert_eq!(exact_rate(&TIMER0_DIVISORS, CPU, s), 30);
    }

    #[test]
    fn exact_top_reproduces_the_request() {
        for table in [&TIMER0_DIVISORS, &TIMER2_DIVISORS] {
            for frequency in [62, 100, 333, 440, 1000, 2500, 8000, 20_000, 50_000, 70_000] {
                let s = exact_setting(table, CPU, frequency, 8, 255);
                assert!(s.top <= 255, "{frequency} Hz: top {}", s.top);
                let rate = exact_rate(table, CPU, s);
                // Integer truncation of top costs at most one count
                let tolerance = frequency / s.top + 1;
                assert!(
                    rate.abs_diff(frequency) <= tolerance,
                    "{frequency} Hz realised as {rate} Hz"
                );
            }
        }
    }

    #[test]
    fn init_attaches_pin_non_inverting() {
        let pwm = PwmChannel::init(Timer8::new(Timer8Id::Timer0), Channel::B);
        assert_eq!(sim::peek(TCCR0A), 0b0010_0000);
        assert_eq!(sim::peek(DDRD), 0b0010_0000);
        assert_eq!(pwm.divisor_table(), &TIMER0_DIVISORS);

        let pwm = PwmChannel::init(Timer8::new(Timer8Id::Timer2), Channel::B);
        assert_eq!(sim::peek(0xB0), 0b0010_0000);
        assert_eq!(sim::peek(DDRD), 0b0010_1000);
        assert_eq!(pwm.divisor_table().len(), 7);
    }

    #[test]
    fn hint_programs_clock_and_mode() {
        let mut pwm = PwmChannel::init(Timer8::new(Timer8Id::Timer0), Channel::A);
        let setting = pwm.set_frequency_hint(1000, CPU);
        assert_eq!(
            setting,
            FrequencySetting {
                clock_select: 3,
                waveform: Waveform::FastPwm,
                top: None
            }
        );
        assert_eq!(sim::peek(TCCR0A), 0b1000_0011);
        assert_eq!(sim::peek(TCCR0B), 0b0000_0011);
        assert_eq!(pwm.get_max_duty(), 255);
    }

    #[test]
    fn exact_programs_ocra_as_top() {
        let mut pwm = PwmChannel::init(Timer8::new(Timer8Id::Timer0), Channel::B);
        let setting = pwm.set_frequency(5000, CPU);
        assert_eq!(setting.top, Some(50));
        assert_eq!(pwm.timer().mode(), Timer8Mode::FastPwmOcra);
        assert_eq!(pwm.timer().clock(), 3);
        assert_eq!(sim::peek(OCR0A), 50);
        assert_eq!(pwm.get_max_duty(), 50);

        pwm.set_duty_cycle(25);
        assert_eq!(pwm.duty_cycle(), 25);
        assert_eq!(sim::peek(0x48), 25);
    }

    #[test]
    fn duty_cycle_is_not_range_checked() {
        let mut pwm = PwmChannel::init(Timer8::new(Timer8Id::Timer2), Channel::B);
        pwm.set_frequency(5000, CPU);
        pwm.set_duty(200);
        assert_eq!(pwm.get_duty(), 200);
    }

    #[test]
    fn close_is_idempotent() {
        let mut pwm = PwmChannel::init(Timer8::new(Timer8Id::Timer0), Channel::A);
        pwm.set_frequency(1000, CPU);
        pwm.close();
        let once = (sim::peek(TCCR0A), sim::peek(TCCR0B));
        assert_eq!(once, (0, 0));
        pwm.close();
        assert_eq!((sim::peek(TCCR0A), sim::peek(TCCR0B)), once);
    }

    #[test]
    fn close_leaves_sibling_channel_output_mode() {
        let mut a = PwmChannel::init(Timer8::new(Timer8Id::Timer0), Channel::A);
        let _b = PwmChannel::init(Timer8::new(Timer8Id::Timer0), Channel::B);
        a.close();
        assert_eq!(
            a.timer().compare_output_mode(Channel::B),
            CompareOutputMode::NON_INVERTING
        );
        assert_eq!(a.timer().clock(), CLOCK_NONE);
    }

    #[test]
    fn pwm_pin_enable_disable() {
        let mut pwm = PwmChannel::init(Timer8::new(Timer8Id::Timer2), Channel::A);
        pwm.disable();
        assert_eq!(sim::peek(0xB0) & 0b1100_0000, 0);
        pwm.enable();
        assert_eq!(sim::peek(0xB0) & 0b1100_0000, 0b1000_0000);
    }

    #[test]
    fn timer1_exact_uses_icr_and_keeps_both_channels() {
        let mut a = PwmChannel::init(Timer16::new(Timer16Id::Timer1), Channel::A);
        let mut b = PwmChannel::init(Timer16::new(Timer16Id::Timer1), Channel::B);
        let setting = a.set_frequency(50, CPU);

        // divisor (16 MHz >> 16) / 50 = 4: fast PWM at 8 becomes phase correct at 8
        assert_eq!(setting.clock_select, 2);
        assert_eq!(setting.waveform, Waveform::PhaseCorrect);
        assert_eq!(setting.top, Some(20_000));
        assert_eq!(a.timer().mode(), Timer16Mode::PhaseCorrectIcr);
        assert_eq!(a.timer().icr(), 20_000);

        a.set_duty_cycle(375);
        b.set_duty_cycle(2500);
        assert_eq!(a.duty_cycle(), 375);
        assert_eq!(b.duty_cycle(), 2500);
        assert_eq!(b.get_max_duty(), 20_000);
    }

    #[test]
    fn timer1_hint_resolutions() {
        let mut pwm = PwmChannel::init(Timer16::new(Timer16Id::Timer1), Channel::A);
        assert_eq!(pwm.timer().divisor_table(), &TIMER1_DIVISORS);

        let setting = pwm.set_frequency_hint(1000, CPU);
        assert_eq!(setting.clock_select, 3);
        assert_eq!(pwm.timer().mode(), Timer16Mode::FastPwm8);
        assert_eq!(pwm.get_max_duty(), 0xFF);

        // divisor (16 MHz >> 10) / 1000 = 15: phase correct at 8
        let setting = pwm.set_frequency_hint_with_resolution(1000, CPU, Resolution::Bits10);
        assert_eq!(setting.clock_select, 2);
        assert_eq!(setting.waveform, Waveform::PhaseCorrect);
        assert_eq!(pwm.timer().mode(), Timer16Mode::PhaseCorrect10);
        assert_eq!(pwm.get_max_duty(), 0x3FF);

        pwm.set_frequency_hint_with_resolution(1000, CPU, Resolution::Bits9);
        assert_eq!(pwm.timer().mode(), Timer16Mode::FastPwm9);
    }

    #[test]
    fn setting_renders_for_logs() {
        let mut out = crate::logger::tests::StringSink::default();
        let setting = FrequencySetting {
            clock_select: 3,
            waveform: Waveform::PhaseCorrect,
            top: Some(125),
        };
        ufmt::uwrite!(&mut out, "{}", setting).unwrap();
        assert_eq!(out.0, "cs=3 mode=phase-correct top=125");
    }
}
