use anyhow::Result;
use clap::Parser;
use maia_firq::{app::App, args::Args, config::Config};
use tracing_subscriber::{filter::LevelFilter, fmt, prelude::*, EnvFilter};

fn main() -> Result<()> {
    // stdout is reserved for command output
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::WARN.into())
                .from_env_lossy(),
        )
        .init();

    let args = Args::parse();
    App::new(Config::from_args(&args)?, args.json).run(&args.command)
}
