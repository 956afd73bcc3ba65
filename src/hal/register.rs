//! Register access on top of the avr-device peripheral blocks
//!
//! Drivers name the registers of a peripheral with a small enum and reach
//! them through [`Registers`] / [`WideRegisters`], implemented for each
//! peripheral id by [`impl_registers!`]. The block itself always comes from
//! the PAC (`TC0::ptr()`, `USART0::ptr()`, ...).
//!
//! In host test builds [`block`] moves every register block into a per-thread
//! simulated data space at the same address, so drivers run unchanged.

/// Byte-wide registers of one peripheral, selected by name
pub trait Registers {
    type Name: Copy;

    fn read(&self, name: Self::Name) -> u8;

    fn write(&self, name: Self::Name, value: u8);

    /// Read-modify-write with interrupts held off.
    fn modify(&self, name: Self::Name, f: impl FnOnce(u8) -> u8);

    /// Replace the bits selected by `mask` with `value`.
    ///
    /// Bits of `value` outside `mask` are dropped.
    #[inline]
    fn set_mask(&self, name: Self::Name, mask: u8, value: u8) {
        self.modify(name, |r| (r & !mask) | (value & mask));
    }

    #[inline]
    fn set_bits(&self, name: Self::Name, bits: u8) {
        self.modify(name, |r| r | bits);
    }

    #[inline]
    fn clear_bits(&self, name: Self::Name, bits: u8) {
        self.modify(name, |r| r & !bits);
    }

    #[inline]
    fn write_bit(&self, name: Self::Name, bit: u8, value: bool) {
        self.set_mask(name, 1 << bit, (value as u8) << bit);
    }

    #[inline]
    fn is_set(&self, name: Self::Name, bit: u8) -> bool {
        self.read(name) & (1 << bit) != 0
    }
}

/// 16-bit register pairs of one peripheral (TCNT1, ICR1, UBRR0, ADC, ...)
pub trait WideRegisters {
    type WideName: Copy;

    fn read_wide(&self, name: Self::WideName) -> u16;

    fn write_wide(&self, name: Self::WideName, value: u16);
}

/// Implement [`Registers`] (and optionally [`WideRegisters`]) for a
/// peripheral id by mapping each register name onto a PAC field.
///
/// ```ignore
/// impl_registers! {
///     Timer8Id: Timer8Register {
///         Timer8Id::Timer0 => TC0 { Tccra => tccr0a, Tccrb => tccr0b },
///         Timer8Id::Timer2 => TC2 { Tccra => tccr2a, Tccrb => tccr2b },
///     }
/// }
/// ```
macro_rules! impl_registers {
    (
        wide $id:ty: $name:ident {
            $( $variant:pat => $periph:ident { $( $reg:ident => $field:ident ),+ $(,)? } ),+ $(,)?
        }
    ) => {
        impl $crate::hal::register::WideRegisters for $id {
            type WideName = $name;

            #[inline]
            fn read_wide(&self, name: $name) -> u16 {
                match self {
                    $( $variant => {
                        let regs = unsafe { $crate::hal::register::block($periph::ptr()) };
                        $crate::hal::register::interrupt_free(|| match name {
                            $( $name::$reg => regs.$field.read().bits(), )+
                        })
                    } )+
                }
            }

            #[inline]
            #[allow(unused_unsafe)]
            fn write_wide(&self, name: $name, value: u16) {
                match self {
                    $( $variant => {
                        let regs = unsafe { $crate::hal::register::block($periph::ptr()) };
                        $crate::hal::register::interrupt_free(|| match name {
                            $( $name::$reg => regs.$field.write(|w| unsafe { w.bits(value) }), )+
                        })
                    } )+
                }
            }
        }
    };
    (
        $id:ty: $name:ident {
            $( $variant:pat => $periph:ident { $( $reg:ident => $field:ident ),+ $(,)? } ),+ $(,)?
        }
    ) => {
        impl $crate::hal::register::Registers for $id {
            type Name = $name;

            #[inline]
            fn read(&self, name: $name) -> u8 {
                match self {
                    $( $variant => {
                        let regs = unsafe { $crate::hal::register::block($periph::ptr()) };
                        match name {
                            $( $name::$reg => regs.$field.read().bits(), )+
                        }
                    } )+
                }
            }

            #[inline]
            #[allow(unused_unsafe)]
            fn write(&self, name: $name, value: u8) {
                match self {
                    $( $variant => {
                        let regs = unsafe { $crate::hal::register::block($periph::ptr()) };
                        match name {
                            $( $name::$reg => regs.$field.write(|w| unsafe { w.bits(value) }), )+
                        }
                    } )+
                }
            }

            #[inline]
            #[allow(unused_unsafe)]
            fn modify(&self, name: $name, f: impl FnOnce(u8) -> u8) {
                match self {
                    $( $variant => {
                        let regs = unsafe { $crate::hal::register::block($periph::ptr()) };
                        $crate::hal::register::interrupt_free(|| match name {
                            $( $name::$reg => regs
                                .$field
                                .modify(|r, w| unsafe { w.bits(f(r.bits())) }), )+
                        })
                    } )+
                }
            }
        }
    };
}

pub(crate) use impl_registers;

/// Run `f` with interrupts disabled on the target.
///
/// Only single read-modify-write updates are wrapped; sequences touching
/// several registers are not atomic as a whole.
#[inline]
pub fn interrupt_free<R>(f: impl FnOnce() -> R) -> R {
    #[cfg(target_arch = "avr")]
    {
        avr_device::interrupt::free(|_| f())
    }
    #[cfg(not(target_arch = "avr"))]
    {
        f()
    }
}

/// Register block behind a PAC peripheral pointer.
///
/// # Safety
///
/// `ptr` must come from a PAC peripheral's `ptr()`.
#[cfg(not(test))]
#[inline(always)]
pub(crate) unsafe fn block<T>(ptr: *const T) -> &'static T {
    &*ptr
}

#[cfg(test)]
pub(crate) unsafe fn block<T>(ptr: *const T) -> &'static T {
    &*(sim::address(ptr as usize as u16) as *const T)
}

/// Per-thread stand-in for the I/O area of the data space
#[cfg(test)]
pub(crate) mod sim {
    use core::cell::UnsafeCell;

    pub const SIZE: usize = 0x100;

    // Wide registers sit at even addresses; keep them aligned on the host
    #[repr(C, align(8))]
    struct DataSpace(UnsafeCell<[u8; SIZE]>);

    std::thread_local! {
        static DATA_SPACE: DataSpace = const { DataSpace(UnsafeCell::new([0; SIZE])) };
    }

    pub fn address(addr: u16) -> *mut u8 {
        assert!((addr as usize) < SIZE, "address {addr:#x} is outside the I/O area");
        DATA_SPACE.with(|space| unsafe { (space.0.get() as *mut u8).add(addr as usize) })
    }

    /// Store `value` as the hardware would, bypassing register semantics.
    pub fn poke(addr: u16, value: u8) {
        unsafe { address(addr).write(value) }
    }

    pub fn peek(addr: u16) -> u8 {
        unsafe { address(addr).read() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use avr_device::atmega328p::{ADC, PORTB, TC1};

    #[derive(Clone, Copy)]
    enum Scratch {
        Latch,
    }

    #[derive(Clone, Copy)]
    enum ScratchWide {
        Capture,
    }

    struct Bench;

    impl_registers! {
        Bench: Scratch {
            _ => PORTB { Latch => portb },
        }
    }

    impl_registers! {
        wide Bench: ScratchWide {
            _ => TC1 { Capture => icr1 },
        }
    }

    const PORTB_ADDR: u16 = 0x25;
    const ICR1_ADDR: u16 = 0x86;

    #[test]
    fn blocks_sit_at_their_data_space_address() {
        let adc = unsafe { block(ADC::ptr()) };
        sim::poke(0x7C, 0x4F);
        assert_eq!(adc.admux.read().bits(), 0x4F);
    }

    #[test]
    fn set_mask_only_touches_masked_bits() {
        Bench.write(Scratch::Latch, 0b1010_1010);
        Bench.set_mask(Scratch::Latch, 0b0000_0111, 0b0000_0101);
        assert_eq!(sim::peek(PORTB_ADDR), 0b1010_1101);

        Bench.set_mask(Scratch::Latch, 0b1100_0000, 0xFF);
        assert_eq!(Bench.read(Scratch::Latch), 0b1110_1101);
    }

    #[test]
    fn bit_helpers() {
        Bench.write(Scratch::Latch, 0);
        Bench.set_bits(Scratch::Latch, 0b1001);
        assert_eq!(Bench.read(Scratch::Latch), 0b1001);
        Bench.clear_bits(Scratch::Latch, 0b0001);
        assert_eq!(Bench.read(Scratch::Latch), 0b1000);
        Bench.write_bit(Scratch::Latch, 1, true);
        assert!(Bench.is_set(Scratch::Latch, 1));
        Bench.write_bit(Scratch::Latch, 3, false);
        assert_eq!(Bench.read(Scratch::Latch), 0b0010);
    }

    #[test]
    fn wide_register_is_little_endian() {
        Bench.write_wide(ScratchWide::Capture, 0xBEEF);
        assert_eq!(sim::peek(ICR1_ADDR), 0xEF);
        assert_eq!(sim::peek(ICR1_ADDR + 1), 0xBE);
        assert_eq!(Bench.read_wide(ScratchWide::Capture), 0xBEEF);
    }
}
