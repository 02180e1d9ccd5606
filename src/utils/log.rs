// src/utils/log.rs

//! Logging setup for the BARCH library and its command-line front end.
//!
//! The library itself only talks to the `log` facade; nothing is printed
//! unless the host installs a logger. Binaries (and tests that want output)
//! call [`init_logger`] once at startup.
//!
//! ```
//! barch::utils::log::init_logger(log::Level::Debug);
//! log::debug!("codec ready");
//! ```

pub use log::{debug, error, info, trace, warn, Level};

/// Installs `simple_logger` as the global logger at `max_level`.
///
/// Calling this more than once is harmless: the second installation fails
/// inside `log` and is ignored.
pub fn init_logger(max_level: Level) {
    if simple_logger::init_with_level(max_level).is_ok() {
        info!("Initialized logger");
        info!("Log level :{}", max_level);
    }
}

/// Maps `-v`/`-q` counts from the command line to a log level.
/// Warn is the default, each `-v` steps towards Trace, `-q` drops to Error.
pub fn level_from_verbosity(verbose: u8, quiet: bool) -> Level {
    if quiet {
        return Level::Error;
    }
    match verbose {
        0 => Level::Warn,
        1 => Level::Info,
        2 => Level::Debug,
        _ => Level::Trace,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_mapping() {
        assert_eq!(level_from_verbosity(0, false), Level::Warn);
        assert_eq!(level_from_verbosity(2, false), Level::Debug);
        assert_eq!(level_from_verbosity(9, false), Level::Trace);
        assert_eq!(level_from_verbosity(3, true), Level::Error);
    }
}
