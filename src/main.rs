#![cfg_attr(target_arch = "avr", no_std, no_main)]

#[cfg(target_arch = "avr")]
use panic_halt as _;

#[cfg(target_arch = "avr")]
use rfsavr::{
    config,
    hal::adc::{Adjustment, Channel as AdcChannel, Prescaler, Reference},
    hal::{
        board, Adc, Channel, Grb, LedStrip, PwmChannel, Timer8, Timer8Id, Usart, UsartConfig,
        UsartId,
    },
    log_debug, log_info, log_warn,
    protocol::Message,
    Logger,
};

#[cfg(target_arch = "avr")]
#[avr_device::entry]
fn main() -> ! {
    let mut serial = Usart::open(UsartId::Usart0, UsartConfig::default());
    let speed = serial.set_speed(config::UART_BAUD, config::CPU_FREQ_HZ);
    let mut logger = Logger::new(serial, config::LOG_LEVEL);

    match speed {
        Ok(setting) => {
            log_info!(
                logger,
                "usart0 {} baud ubrr={} u2x={}",
                config::UART_BAUD.hz(),
                setting.ubrr,
                setting.double_speed as u8
            )
            .ok();
        }
        Err(_) => {
            // Nobody can hear us, park with the LED on
            let mut led = board::D13.into_output();
            led.set_high();
            #[allow(clippy::empty_loop)]
            loop {}
        }
    }

    let mut exact = PwmChannel::init(Timer8::new(Timer8Id::Timer0), Channel::B);
    let setting = exact.set_frequency(config::EXACT_PWM_HZ, config::CPU_FREQ_HZ);
    exact.set_duty_cycle((setting.top.unwrap_or(0xFF) / 2) as u8);
    log_info!(logger, "timer0 {} Hz: {}", config::EXACT_PWM_HZ, setting).ok();

    let mut hint = PwmChannel::init(Timer8::new(Timer8Id::Timer2), Channel::B);
    let setting = hint.set_frequency_hint(config::HINT_PWM_HZ, config::CPU_FREQ_HZ);
    hint.set_duty_cycle(0x40);
    log_info!(logger, "timer2 ~{} Hz: {}", config::HINT_PWM_HZ, setting).ok();

    let mut adc = Adc::new();
    adc.set_reference(Reference::Avcc);
    adc.set_prescaler(Prescaler::Div128);
    adc.set_adjustment(Adjustment::Right);
    adc.set_channel(AdcChannel::Adc0);
    adc.disable_digital_inputs(1 << 0);
    adc.enable();
    adc.start();

    let mut strip = LedStrip::new(board::D11.into_output(), config::CPU_FREQ_HZ);
    let mut leds = [Grb::default(); config::LED_COUNT];

    let mut frames: u16 = 0;
    loop {
        let reading = match adc.read16() {
            Ok(value) => value,
            Err(_) => continue,
        };
        adc.start();

        let payload = reading.to_be_bytes();
        let mut message = Message::new(logger.sink(), &payload);
        while message.send().is_err() {
            // The hint channel duty follows A0 while the frame drains
            hint.set_duty_cycle((reading >> 2) as u8);
        }

        frames = frames.wrapping_add(1);
        if frames % 64 == 0 {
            // Bar graph of A0 in blue
            let lit = usize::from(reading) * config::LED_COUNT / 0x400;
            for (i, led) in leds.iter_mut().enumerate() {
                *led = if i < lit { Grb::new(0, 0, 0x20) } else { Grb::default() };
            }
            strip.write(&leds);
        }
        log_debug!(logger, "frame {} a0={}", frames, reading).ok();
        if reading == 0x3FF {
            log_warn!(logger, "a0 saturated").ok();
        }
    }
}

#[cfg(not(target_arch = "avr"))]
fn main() {}
