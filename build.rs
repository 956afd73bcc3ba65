use std::env;

const DEFAULT_MCU_FREQ_HZ: &str = "16000000";

fn main() {
    println!("cargo:rerun-if-env-changed=MCU_FREQ_HZ");

    // CPU frequency for timing calculations, overridable for boards clocked differently
    let freq = env::var("MCU_FREQ_HZ").unwrap_or_else(|_| DEFAULT_MCU_FREQ_HZ.to_string());
    if freq.is_empty() || !freq.bytes().all(|b| b.is_ascii_digit()) {
        panic!("MCU_FREQ_HZ must be a decimal number of hertz, got {freq:?}");
    }
    println!("cargo:rustc-env=MCU_FREQ_HZ={freq}");

    // Host builds run the unit tests against the simulated data space
    let arch = env::var("CARGO_CFG_TARGET_ARCH").unwrap_or_default();
    if arch == "avr" {
        println!("cargo:rustc-link-arg=-mmcu=atmega328p");
        println!("cargo:warning=Building for ATmega328P at {freq} Hz");
    }
}
