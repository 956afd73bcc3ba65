//! Bare-metal HAL for the ATmega328P
//!
//! PWM with exact or predefined frequencies on all three timers, digital I/O,
//! a polled USART and ADC, and a checksum-framed message emitter that never
//! blocks on the transport.
#![cfg_attr(not(test), no_std)]

pub mod config;
pub mod hal;
pub mod logger;
pub mod protocol;

pub use logger::{LogLevel, Logger};
