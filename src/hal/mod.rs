pub mod adc;
pub mod gpio;
pub mod leds;
pub mod pwm;
pub mod register;
pub mod timer;
pub mod uart;

// Re-export commonly used types
pub use adc::Adc;
pub use gpio::board;
pub use gpio::{Input, Output, Pin, Port};
pub use leds::{Grb, LedStrip};
pub use pwm::{FrequencySetter, FrequencySetting, PwmChannel, Resolution};
pub use timer::{Channel, Timer16, Timer16Id, Timer8, Timer8Id};
pub use uart::{Baudrate, Usart, UsartConfig, UsartId};
