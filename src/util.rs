//! Small ambient helpers shared by the rest of the crate.

/// Installs a `tracing-subscriber` `EnvFilter` subscriber, honoring
/// `RUST_LOG` (defaulting to `info`). Safe to call from multiple places
/// (tests, the demo binary); only the first call takes effect.
static INIT_ONCE: std::sync::Once = std::sync::Once::new();
pub fn init_tracing_once() {
    INIT_ONCE.call_once(|| {
        let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
        let _ = tracing_subscriber::fmt().with_env_filter(env_filter).try_init();
    });
}
