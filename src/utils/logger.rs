use chrono::Local;
use fern::Dispatch;
use log::LevelFilter;

/// Initializes the global logger, writing to stderr.
///
/// The level comes from `RUST_LOG` (e.g. `RUST_LOG=debug`) and defaults to
/// `info`. Call once at the beginning of `main`.
pub fn init() {
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    let log_level_filter = log_level.parse::<LevelFilter>().unwrap_or(LevelFilter::Info);

    Dispatch::new()
        .level(log_level_filter)
        .level_for("serde_yaml", LevelFilter::Warn)
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{} {} {}] {}",
                Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.target(),
                message
            ))
        })
        .chain(std::io::stderr())
        .apply()
        .unwrap_or_else(|e| {
            eprintln!("Failed to apply logger configuration: {}", e);
        });
}
