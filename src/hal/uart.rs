//! Polled USART driver
//!
//! Reads and writes never wait: they report `nb::Error::WouldBlock` when the
//! hardware is not ready and the caller retries from its polling loop.

use core::convert::Infallible;

use embedded_hal::serial;

use avr_device::atmega328p::USART0;

use super::gpio::{Pin, Port};
use super::register::{impl_registers, Registers, WideRegisters};

// UCSRnA
const RXC: u8 = 7;
const UDRE: u8 = 5;
const FE: u8 = 4;
const DOR: u8 = 3;
const UPE: u8 = 2;
const U2X: u8 = 1;
const MPCM: u8 = 0;

// UCSRnB
const RXEN: u8 = 4;
const TXEN: u8 = 3;
const UCSZ2: u8 = 2;

// UCSRnC
const MODE_MASK: u8 = 0b1100_0000;
const FORMAT_MASK: u8 = 0b0011_1111;
const UCPOL: u8 = 0;

const NORMAL_SPEED_DIVISOR: u32 = 16;
const DOUBLE_SPEED_DIVISOR: u32 = 8;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Error {
    /// Stop bit read as zero
    Frame,
    /// A byte arrived while the receive buffer was full
    Overrun,
    Parity,
    /// Neither speed mode can divide the CPU clock down to the baud rate
    BaudRateUnreachable,
}

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UsartRegister {
    Udr,
    Ucsra,
    Ucsrb,
    Ucsrc,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UsartWideRegister {
    Ubrr,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UsartId {
    Usart0,
}

impl_registers! {
    UsartId: UsartRegister {
        UsartId::Usart0 => USART0 {
            Udr => udr0,
            Ucsra => ucsr0a,
            Ucsrb => ucsr0b,
            Ucsrc => ucsr0c,
        },
    }
}

impl_registers! {
    wide UsartId: UsartWideRegister {
        UsartId::Usart0 => USART0 { Ubrr => ubrr0 },
    }
}

impl UsartId {
    /// XCK pin for the synchronous modes
    const fn clock_pin(self) -> (Port, u8) {
        match self {
            UsartId::Usart0 => (Port::D, 4),
        }
    }
}

/// Standard baud rates
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum Baudrate {
    B50 = 50,
    B75 = 75,
    B110 = 110,
    B134 = 134,
    B150 = 150,
    B200 = 200,
    B300 = 300,
    B600 = 600,
    B1200 = 1200,
    B1800 = 1800,
    B2400 = 2400,
    B4800 = 4800,
    B9600 = 9600,
    B19200 = 19200,
    B38400 = 38400,
    B57600 = 57600,
    B115200 = 115200,
    B230400 = 230400,
    B460800 = 460800,
    B500000 = 500000,
    B576000 = 576000,
    B921600 = 921600,
    B1000000 = 1000000,
    B1152000 = 1152000,
    B1500000 = 1500000,
    B2000000 = 2000000,
}

impl Baudrate {
    pub const fn hz(self) -> u32 {
        self as u32
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Mode {
    #[default]
    Async,
    /// Synchronous, XCK driven by this device
    SyncMaster,
    /// Synchronous, XCK driven externally
    SyncSlave,
    MasterSpi,
}

impl Mode {
    /// UMSELn bits of UCSRnC
    const fn umsel(self) -> u8 {
        match self {
            Mode::Async => 0x00,
            Mode::SyncMaster | Mode::SyncSlave => 0x40,
            Mode::MasterSpi => 0xC0,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DataBits {
    Five,
    Six,
    Seven,
    #[default]
    Eight,
    Nine,
}

impl DataBits {
    /// (UCSZn1:0 in UCSRnC, UCSZn2 in UCSRnB)
    const fn size_bits(self) -> (u8, bool) {
        match self {
            DataBits::Five => (0b00, false),
            DataBits::Six => (0b01, false),
            DataBits::Seven => (0b10, false),
            DataBits::Eight => (0b11, false),
            DataBits::Nine => (0b11, true),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Parity {
    #[default]
    None,
    Even,
    Odd,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StopBits {
    #[default]
    One,
    Two,
}

/// Frame format and direction setup applied by [`Usart::open`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UsartConfig {
    pub mode: Mode,
    pub data_bits: DataBits,
    pub parity: Parity,
    pub stop_bits: StopBits,
    pub rx: bool,
    pub tx: bool,
    pub multiprocessor: bool,
    /// Synchronous modes: change TxD on the falling XCK edge
    pub clock_falling: bool,
}

impl Default for UsartConfig {
    /// Asynchronous 8N1, both directions
    fn default() -> Self {
        Self {
            mode: Mode::Async,
            data_bits: DataBits::Eight,
            parity: Parity::None,
            stop_bits: StopBits::One,
            rx: true,
            tx: true,
            multiprocessor: false,
            clock_falling: false,
        }
    }
}

impl UsartConfig {
    fn ucsrc_format(&self) -> u8 {
        let (size, _) = self.data_bits.size_bits();
        let parity = match self.parity {
            Parity::None => 0b00,
            Parity::Even => 0b10,
            Parity::Odd => 0b11,
        };
        let stop = match self.stop_bits {
            StopBits::One => 0,
            StopBits::Two => 1,
        };
        (parity << 4) | (stop << 3) | (size << 1) | ((self.clock_falling as u8) << UCPOL)
    }
}

/// UBRR value and speed mode chosen for a baud rate
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BaudSetting {
    pub ubrr: u16,
    pub double_speed: bool,
    /// |cpu - clock_divisor * baud * (ubrr + 1)| in Hz of CPU clock
    pub error: u32,
}

/// Nearest UBRR for one clock divisor, with the CPU-clock error it leaves.
///
/// `None` when the CPU clock is below `baudrate * clock_divisor`.
fn ubrr_for(baudrate: u32, cpu_frequency: u32, clock_divisor: u32) -> Option<(u16, u32)> {
    let divisor = baudrate * clock_divisor;
    if cpu_frequency < divisor {
        return None;
    }

    // Smallest count with divisor * count >= cpu_frequency
    let count = cpu_frequency.div_ceil(divisor);
    let above = divisor * count;
    let (ubrr, error) = if above - cpu_frequency < divisor >> 1 {
        (count - 1, above - cpu_frequency)
    } else {
        (count - 2, cpu_frequency - (above - divisor))
    };
    Some((ubrr.min(u32::from(u16::MAX)) as u16, error))
}

/// Pick the speed mode whose UBRR lands closest to the baud rate.
///
/// Ties go to normal speed.
pub fn baud_setting(baudrate: u32, cpu_frequency: u32) -> Result<BaudSetting> {
    let normal = ubrr_for(baudrate, cpu_frequency, NORMAL_SPEED_DIVISOR);
    let double = ubrr_for(baudrate, cpu_frequency, DOUBLE_SPEED_DIVISOR);

    match (normal, double) {
        (Some((ubrr, error)), Some((_, double_error))) if error <= double_error => {
            Ok(BaudSetting {
                ubrr,
                double_speed: false,
                error,
            })
        }
        (Some((ubrr, error)), None) => Ok(BaudSetting {
            ubrr,
            double_speed: false,
            error,
        }),
        (_, Some((ubrr, error))) => Ok(BaudSetting {
            ubrr,
            double_speed: true,
            error,
        }),
        (None, None) => Err(Error::BaudRateUnreachable),
    }
}

pub struct Usart {
    id: UsartId,
}

impl Usart {
    /// Set mode, frame format and enabled directions. The baud rate is set
    /// separately with [`Usart::set_speed`].
    pub fn open(id: UsartId, config: UsartConfig) -> Self {
        let (port, bit) = id.clock_pin();
        match config.mode {
            Mode::SyncMaster => {
                Pin::new(port, bit).into_output();
            }
            Mode::SyncSlave => {
                Pin::new(port, bit).into_input();
            }
            Mode::Async | Mode::MasterSpi => {}
        }
        id.set_mask(UsartRegister::Ucsrc, MODE_MASK, config.mode.umsel());

        id.write_bit(UsartRegister::Ucsra, MPCM, config.multiprocessor);

        let (_, ninth_bit) = config.data_bits.size_bits();
        let ucsrb = ((config.rx as u8) << RXEN) | ((config.tx as u8) << TXEN) | ((ninth_bit as u8) << UCSZ2);
        id.set_mask(
            UsartRegister::Ucsrb,
            (1 << RXEN) | (1 << TXEN) | (1 << UCSZ2),
            ucsrb,
        );

        id.set_mask(UsartRegister::Ucsrc, FORMAT_MASK, config.ucsrc_format());

        Self { id }
    }

    pub fn id(&self) -> UsartId {
        self.id
    }

    pub fn set_speed(&mut self, baudrate: Baudrate, cpu_frequency: u32) -> Result<BaudSetting> {
        let setting = baud_setting(baudrate.hz(), cpu_frequency)?;
        self.id.write_wide(UsartWideRegister::Ubrr, setting.ubrr);
        self.id
            .write_bit(UsartRegister::Ucsra, U2X, setting.double_speed);
        Ok(setting)
    }

    /// Next received byte.
    ///
    /// The status flags belong to the byte in UDR, so they are sampled
    /// before reading it.
    pub fn read(&mut self) -> nb::Result<u8, Error> {
        if !self.id.is_set(UsartRegister::Ucsra, RXC) {
            return Err(nb::Error::WouldBlock);
        }

        let status = self.id.read(UsartRegister::Ucsra);
        let byte = self.id.read(UsartRegister::Udr);

        if status & (1 << FE) != 0 {
            Err(nb::Error::Other(Error::Frame))
        } else if status & (1 << DOR) != 0 {
            Err(nb::Error::Other(Error::Overrun))
        } else if status & (1 << UPE) != 0 {
            Err(nb::Error::Other(Error::Parity))
        } else {
            Ok(byte)
        }
    }

    /// Queue one byte if the data register is empty.
    pub fn write(&mut self, byte: u8) -> nb::Result<(), Infallible> {
        if !self.id.is_set(UsartRegister::Ucsra, UDRE) {
            return Err(nb::Error::WouldBlock);
        }
        self.id.write(UsartRegister::Udr, byte);
        Ok(())
    }

    /// Disable the receiver and transmitter.
    pub fn close(self) {
        self.id.write(UsartRegister::Ucsrb, 0);
    }
}

impl serial::Read<u8> for Usart {
    type Error = Error;

    fn read(&mut self) -> nb::Result<u8, Error> {
        Usart::read(self)
    }
}

impl serial::Write<u8> for Usart {
    type Error = Infallible;

    fn write(&mut self, byte: u8) -> nb::Result<(), Infallible> {
        Usart::write(self, byte)
    }

    /// Done once the data register can take the next byte.
    fn flush(&mut self) -> nb::Result<(), Infallible> {
        if self.id.is_set(UsartRegister::Ucsra, UDRE) {
            Ok(())
        } else {
            Err(nb::Error::WouldBlock)
        }
    }
}

impl ufmt::uWrite for Usart {
    type Error = Infallible;

    fn write_str(&mut self, s: &str) -> core::result::Result<(), Infallible> {
        for byte in s.bytes() {
            nb::block!(Usart::write(self, byte))?;
        }
        Ok(())
    }
}
