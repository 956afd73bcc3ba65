//! Configuration constants for the ATmega328P firmware

use crate::hal::uart::Baudrate;
use crate::logger::LogLevel;

/// CPU frequency in Hz, injected by the build script (`MCU_FREQ_HZ`)
pub const CPU_FREQ_HZ: u32 = parse_hz(env!("MCU_FREQ_HZ"));

/// USART0 baud rate
pub const UART_BAUD: Baudrate = Baudrate::B19200;

/// Lowest level the firmware logger lets through
pub const LOG_LEVEL: LogLevel = if cfg!(feature = "debug") {
    LogLevel::Debug
} else {
    LogLevel::Info
};

/// Exact frequency requested on Timer0 channel B by the demo firmware
pub const EXACT_PWM_HZ: u32 = 1_000;

/// Approximate frequency requested on Timer2 channel B by the demo firmware
pub const HINT_PWM_HZ: u32 = 500;

/// WS2812 LEDs on the strip driven from D11
pub const LED_COUNT: usize = 12;

const fn parse_hz(digits: &str) -> u32 {
    let bytes = digits.as_bytes();
    let mut value: u32 = 0;
    let mut i = 0;
    while i < bytes.len() {
        value = value * 10 + (bytes[i] - b'0') as u32;
        i += 1;
    }
    value
}
