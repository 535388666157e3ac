use std::io::Write;

use env_logger::{fmt::Color, Builder, Env};
use log::{Level, LevelFilter};

/// Console logger of the whole program.
///
/// Verbosity maps from the number of '-v' occurrences on the command line;
/// warnings stay visible at verbosity 0 unless '--quiet' brings the level
/// down to errors only. The 'LOWVAR_LOG' environment variable overrides
/// the command-line level, using the usual env_logger filter syntax.
#[derive(Debug)]
pub struct Logger;

impl Logger {
    pub fn init(verbosity: u8) {
        let log_level = Self::u8_to_loglevel(verbosity);
        let env = Env::default().filter("LOWVAR_LOG");

        Builder::new()
            .filter_level(log_level)
            .format(|buf, record| {
                let traceback = if record.level() == LevelFilter::Error {
                    format!("(@ {}:{}) ", record.file().unwrap_or("unknown"), record.line().unwrap_or(0))
                } else {
                    String::new()
                };

                let mut level_style = buf.style();
                let color = match record.level() {
                    Level::Error => Color::Red,
                    Level::Warn  => Color::Yellow,
                    Level::Info  => Color::Green,
                    Level::Debug => Color::Blue,
                    Level::Trace => Color::Cyan,
                };
                level_style.set_color(color).set_bold(true);

                writeln!(
                    buf,
                    "[{} {: <5} {}] {traceback}{}",
                    chrono::Local::now().format("%Y-%m-%dT%H:%M:%S"),
                    level_style.value(record.level()),
                    record.target(),
                    record.args()
                )
            })
            .parse_env(env)
            .try_init()
            .expect("Failed to initialize logger");
    }

    fn u8_to_loglevel(verbosity: u8) -> LevelFilter {
        match verbosity {
            0           => LevelFilter::Error,
            1           => LevelFilter::Warn,
            2           => LevelFilter::Info,
            3           => LevelFilter::Debug,
            4..=u8::MAX => LevelFilter::Trace,
        }
    }

    pub fn set_level(verbosity: u8) {
        log::set_max_level(Self::u8_to_loglevel(verbosity));
    }
}
