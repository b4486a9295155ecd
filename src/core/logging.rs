//! Logging setup for tools and tests built on the crate

/// Install env_logger with an `info` default filter, overridable through
/// `RUST_LOG`. Timestamps carry milliseconds so build and traversal timings
/// line up.
///
/// # Example
/// ```no_run
/// quadmesh::core::logging::init();
/// log::info!("Quadtree rebuild scheduled");
/// ```
pub fn init() {
    builder().init();
}

/// Same as [`init`] but tolerates a logger already being installed, for
/// tests. Returns whether this call installed it.
pub fn try_init() -> bool {
    builder().is_test(true).try_init().is_ok()
}

fn builder() -> env_logger::Builder {
    let mut builder = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info")
    );
    builder.format_timestamp_millis();
    builder
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_try_init_is_repeatable() {
        try_init();
        assert!(!try_init());
        log::debug!("logger installed");
    }
}
