mod actions;
mod batch;
mod clipboard;
mod cli;
mod encoder;
mod error;
mod filter;
mod launch;
mod model;
mod overlay;
mod platform;
mod poller;
mod post_action;
mod resolver;
mod screenshot;

use tracing_subscriber::EnvFilter;

fn main() {
    // All logging goes to stderr; stdout carries only the verb's own output.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    std::process::exit(cli::run());
}
