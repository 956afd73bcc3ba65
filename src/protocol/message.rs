//! Non-blocking frame emitter

use embedded_hal::serial;

use super::{checksum, hex_digit, HEADER, TERMINATOR};

/// Next part of the frame to go out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Header,
    Data,
    ChecksumHigh,
    ChecksumLow,
    End,
    /// Whole frame accepted by the transport
    Sent,
}

/// One frame in flight on `transport`
///
/// Holding the transport by `&mut` keeps a second message from interleaving
/// with this one. Dropping a message abandons it mid-frame.
pub struct Message<'a, W: serial::Write<u8>> {
    transport: &'a mut W,
    payload: &'a [u8],
    checksum: u8,
    state: State,
    cursor: usize,
}

impl<'a, W: serial::Write<u8>> Message<'a, W> {
    pub fn new(transport: &'a mut W, payload: &'a [u8]) -> Self {
        Self {
            transport,
            payload,
            checksum: checksum(payload),
            state: State::Header,
            cursor: 0,
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn checksum(&self) -> u8 {
        self.checksum
    }

    /// Payload bytes accepted so far
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_sent(&self) -> bool {
        self.state == State::Sent
    }

    /// Offer the transport at most one byte.
    ///
    /// `Ok(())` once the terminator has been accepted, `WouldBlock` while
    /// any part of the frame is still pending. Transport errors are passed
    /// through and the same byte is offered again on the next call.
    pub fn send(&mut self) -> nb::Result<(), W::Error> {
        match self.state {
            State::Header => {
                self.transport.write(HEADER)?;
                self.state = State::Data;
            }
            State::Data => {
                let written = match self.payload.get(self.cursor) {
                    Some(&byte) => self.transport.write(byte),
                    None => Ok(()),
                };
                if written.is_ok() && self.cursor < self.payload.len() {
                    self.cursor += 1;
                }
                // Checked on every attempt, accepted or not
                if self.cursor >= self.payload.len() {
                    self.state = State::ChecksumHigh;
                }
                written?;
            }
            State::ChecksumHigh => {
                self.transport.write(hex_digit(self.checksum >> 4))?;
                self.state = State::ChecksumLow;
            }
            State::ChecksumLow => {
                self.transport.write(hex_digit(self.checksum))?;
                self.state = State::End;
            }
            State::End => {
                self.transport.write(TERMINATOR)?;
                self.state = State::Sent;
                return Ok(());
            }
            State::Sent => return Ok(()),
        }
        Err(nb::Error::WouldBlock)
    }
}
