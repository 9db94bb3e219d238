//! tfscenario CLI entry point

fn main() {
    // Structured logging on stderr, `RUST_LOG` overrides the default level
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init();

    tfscenario::cli::run();
}
