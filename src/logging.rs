use env_logger::{Builder, Env, Target};

/// Logs go to stderr; stdout carries the event stream.
pub fn init() {
    Builder::from_env(Env::default().default_filter_or("info"))
        .target(Target::Stderr)
        .format_timestamp_millis()
        .init();
}
