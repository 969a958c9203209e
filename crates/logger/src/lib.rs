use colored::Colorize;
use log::Level;

pub struct Logger;

impl log::Log for Logger {
  fn enabled(&self, metadata: &log::Metadata) -> bool {
    metadata.level() <= log::max_level()
  }

  fn log(&self, record: &log::Record) {
    if !self.enabled(record.metadata()) {
      return;
    }

    let time = chrono::Local::now()
      .format("%Y-%m-%d %H:%M:%S%.3f")
      .to_string()
      .magenta();

    let level = match record.level() {
      Level::Error => "ERROR".red(),
      Level::Warn => "WARN".yellow(),
      Level::Info => "INFO".green(),
      Level::Debug => "DEBUG".blue(),
      Level::Trace => "TRACE".cyan(),
    };

    let target = record.target().cyan();

    println!("{} {} {} {}", time, level, target, record.args());
  }

  fn flush(&self) {}
}

static LOGGER: Logger = Logger;

pub fn init_logger() {
  init_logger_with_level(Level::Debug);
}

/// Installs the logger and sets the level. Repeated initialization (e.g. one
/// call per test) is fine; the latest requested level always takes effect.
pub fn init_logger_with_level(level: Level) {
  let _ = log::set_logger(&LOGGER);
  log::set_max_level(level.to_level_filter());
}
