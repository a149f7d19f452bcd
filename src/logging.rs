use actix_web::middleware::Logger;

/// Access log line: arrival time of this request, request line, status, latency.
pub const REQUEST_LOG_FORMAT: &str = "%t - %r %s %Dms";

/// Installs `env_logger`. `RUST_LOG` wins over `default_level`.
pub fn init(default_level: &str) {
    let env = env_logger::Env::default().default_filter_or(default_level);
    let _ = env_logger::Builder::from_env(env).try_init();
}

/// Per-request access logger. `%t` is captured when each request arrives.
pub fn request_logger() -> Logger {
    Logger::new(REQUEST_LOG_FORMAT)
}
