use tracing_subscriber::EnvFilter;

/// Initializes a `tracing_subscriber` using `XCTOPO_LOG` first, then `RUST_LOG`, then a default.
///
/// Events go to stderr; stdout is reserved for report lines.
///
/// Log field contract for xctopo binaries:
/// - Always include `rank` and `world_size` once the collective runtime is up.
/// - Include `flag` on any agreement-check event.
/// - Include `tier` on any distinct-unit count.
pub fn init_tracing() {
    let filter = env_filter();
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

pub fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env("XCTOPO_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("info"))
}
