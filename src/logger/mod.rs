//! Leveled text logging over any `ufmt::uWrite` sink
//!
//! Lines look like `[I] pwm: cs=3 mode=fast top=free`. Records below the
//! logger's level are dropped before anything is formatted.

use ufmt::uWrite;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Error = 0,
    Warn = 1,
    Info = 2,
    Debug = 3,
}

impl LogLevel {
    fn tag(self) -> &'static str {
        match self {
            LogLevel::Error => "[E] ",
            LogLevel::Warn => "[W] ",
            LogLevel::Info => "[I] ",
            LogLevel::Debug => "[D] ",
        }
    }
}

pub struct Logger<W> {
    sink: W,
    level: LogLevel,
}

impl<W: uWrite> Logger<W> {
    pub fn new(sink: W, level: LogLevel) -> Self {
        Self { sink, level }
    }

    pub fn level(&self) -> LogLevel {
        self.level
    }

    pub fn set_level(&mut self, level: LogLevel) {
        self.level = level;
    }

    pub fn enabled(&self, level: LogLevel) -> bool {
        level <= self.level
    }

    /// Emit one record; `body` formats the text after the level tag.
    pub fn log(
        &mut self,
        level: LogLevel,
        body: impl FnOnce(&mut W) -> Result<(), W::Error>,
    ) -> Result<(), W::Error> {
        if !self.enabled(level) {
            return Ok(());
        }
        self.sink.write_str(level.tag())?;
        body(&mut self.sink)?;
        self.sink.write_str("\r\n")
    }

    pub fn sink(&mut self) -> &mut W {
        &mut self.sink
    }

    pub fn into_inner(self) -> W {
        self.sink
    }
}

#[macro_export]
macro_rules! log_error {
    ($logger:expr, $($arg:tt)+) => {
        $logger.log($crate::logger::LogLevel::Error, |w| ufmt::uwrite!(w, $($arg)+))
    };
}

#[macro_export]
macro_rules! log_warn {
    ($logger:expr, $($arg:tt)+) => {
        $logger.log($crate::logger::LogLevel::Warn, |w| ufmt::uwrite!(w, $($arg)+))
    };
}

#[macro_export]
macro_rules! log_info {
    ($logger:expr, $($arg:tt)+) => {
        $logger.log($crate::logger::LogLevel::Info, |w| ufmt::uwrite!(w, $($arg)+))
    };
}

#[macro_export]
macro_rules! log_debug {
    ($logger:expr, $($arg:tt)+) => {
        $logger.log($crate::logger::LogLevel::Debug, |w| ufmt::uwrite!(w, $($arg)+))
    };
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use core::convert::Infallible;

    #[derive(Default)]
    pub(crate) struct StringSink(pub String);

    impl uWrite for StringSink {
        type Error = Infallible;

        fn write_str(&mut self, s: &str) -> Result<(), Infallible> {
            self.0.push_str(s);
            Ok(())
        }
    }

    #[test]
    fn records_carry_level_tags() {
        let mut logger = Logger::new(StringSink::default(), LogLevel::Debug);
        log_info!(logger, "baud {}", 19200u32).unwrap();
        log_debug!(logger, "ubrr={}", 51u16).unwrap();
        log_error!(logger, "frame error").unwrap();
        assert_eq!(
            logger.into_inner().0,
            "[I] baud 19200\r\n[D] ubrr=51\r\n[E] frame error\r\n"
        );
    }

    #[test]
    fn records_below_level_are_dropped() {
        let mut logger = Logger::new(StringSink::default(), LogLevel::Warn);
        log_info!(logger, "hidden").unwrap();
        log_warn!(logger, "shown").unwrap();
        assert!(!logger.enabled(LogLevel::Debug));
        assert_eq!(logger.sink().0, "[W] shown\r\n");

        logger.set_level(LogLevel::Info);
        log_info!(logger, "now shown").unwrap();
        assert_eq!(logger.into_inner().0, "[W] shown\r\n[I] now shown\r\n");
    }
}
