pub use slog::{crit, debug, error, info, o, trace, warn, Discard, Drain, Logger};

/// Builds the terminal logger used by binaries. Library types take an
/// optional parent logger instead and stay silent when given none.
pub fn init() -> Logger {
    use sloggers::{Config, LoggerConfig};

    let config: LoggerConfig = serdeconv::from_toml_str(
        r#"
type = "terminal"
level = "debug"
destination = "stderr"
"#,
    )
    .expect("builtin logging config must parse");

    config.build_logger().expect("terminal logger construction failed")
}
