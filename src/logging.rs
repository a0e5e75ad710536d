//! Tracing subscriber setup for the `np` binary.
//!
//! Events go to stderr so command output on stdout stays clean for pipes
//! and `--json`. The filter comes from `NP_LOG`, then `RUST_LOG`, then the
//! level passed in. ANSI colours are only used when stderr is a terminal.

use tracing_subscriber::EnvFilter;

/// Library modules held at `warn` unless a filter says otherwise.
const NOISY_MODULES: &[&str] = &["sqlx", "hyper", "hyper_util", "tower_http"];

fn build_filter(default_level: &str) -> EnvFilter {
    for var in ["NP_LOG", "RUST_LOG"] {
        if let Ok(filter) = EnvFilter::try_from_env(var) {
            return filter;
        }
    }
    let mut directives = String::from(default_level);
    for module in NOISY_MODULES {
        directives.push_str(&format!(",{}=warn", module));
    }
    EnvFilter::new(directives)
}

/// Install the global subscriber. Safe to call more than once.
pub fn init(default_level: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(build_filter(default_level))
        .with_writer(std::io::stderr)
        .with_ansi(atty::is(atty::Stream::Stderr))
        .with_target(false)
        .try_init();
}
