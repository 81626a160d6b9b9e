// Rigminer - Free and Open Source Software Statement
//
// File: src/utils/logging.rs
// Version: 1.0.0
//
// log4rs setup for the binary. A YAML file given with --log-config wins;
// otherwise a console appender is built at the requested level.

use std::path::Path;
use std::str::FromStr;

use log::LevelFilter;
use log4rs::append::console::ConsoleAppender;
use log4rs::config::{Appender, Config, Root};
use log4rs::encode::pattern::PatternEncoder;

const CONSOLE_PATTERN: &str = "{d(%Y-%m-%d %H:%M:%S)} {h({l:5})} [{t}] {m}{n}";

pub fn init_logging(log_config: Option<&Path>, level: &str) -> crate::Result<()> {
    if let Some(path) = log_config {
        log4rs::init_file(path, Default::default())
            .map_err(|e| format!("Failed to load log config {}: {}", path.display(), e))?;
        return Ok(());
    }

    let level = LevelFilter::from_str(level)
        .map_err(|_| format!("Unknown log level '{}'", level))?;
    let stdout = ConsoleAppender::builder()
        .encoder(Box::new(PatternEncoder::new(CONSOLE_PATTERN)))
        .build();
    let config = Config::builder()
        .appender(Appender::builder().build("stdout", Box::new(stdout)))
        .build(Root::builder().appender("stdout").build(level))
        .map_err(|e| format!("Invalid logging config: {}", e))?;
    log4rs::init_config(config)?;
    Ok(())
}
