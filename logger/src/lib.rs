use std::fs::File;

use colored::Colorize;
use middleware::logger::LoggerMiddleware;

pub mod middleware {
    pub mod logger;
}

pub const LOG_FILE: &str = "genmeter.log";

/// Installs the global logger. Production keeps to `Info` so request bodies
/// stay out of the log.
pub fn setup(is_production: bool) -> Result<(), fern::InitError> {
    File::create(LOG_FILE).map_err(fern::InitError::Io)?;

    fern::Dispatch::new()
        .format(|out, message, record| {
            let color = match record.level() {
                log::Level::Info => "green",
                log::Level::Warn => "yellow",
                log::Level::Error => "red",
                log::Level::Debug => "magenta",
                log::Level::Trace => "bright black",
            };
            out.finish(format_args!(
                "{}[{}][{}] {}",
                chrono::Local::now().format("[%H:%M:%S]"),
                record.target(),
                record.level().to_string().color(color),
                message
            ))
        })
        .level(level_for(is_production))
        .level_for("hyper", log::LevelFilter::Off)
        .level_for("hyper_util", log::LevelFilter::Off)
        .level_for("reqwest", log::LevelFilter::Warn)
        .chain(std::io::stdout())
        .chain(fern::log_file(LOG_FILE)?)
        .apply()?;
    Ok(())
}

fn level_for(is_production: bool) -> log::LevelFilter {
    if is_production {
        log::LevelFilter::Info
    } else {
        log::LevelFilter::Debug
    }
}

pub fn middleware() -> LoggerMiddleware {
    LoggerMiddleware::new()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn production_logs_at_info() {
        assert_eq!(level_for(true), log::LevelFilter::Info);
        assert_eq!(level_for(false), log::LevelFilter::Debug);
    }
}
