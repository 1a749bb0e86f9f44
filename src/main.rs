use clap::Parser;
use miette::Result;
use pave::cli::{Cli, Commands};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() -> Result<()> {
    // Reset SIGPIPE to default behavior (terminate silently) for proper Unix piping.
    // Without this, piping to `head`, `grep -q`, etc. causes a panic on broken pipe.
    #[cfg(unix)]
    {
        unsafe {
            libc::signal(libc::SIGPIPE, libc::SIG_DFL);
        }
    }
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .tab_width(4)
                .build(),
        )
    }))?;

    let cli = Cli::parse();
    let global = cli.global;

    // Logs go to stderr so stdout stays clean for yaml/json/csv output
    let default_level = if global.verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(EnvFilter::try_from_env("PAVE_LOG").unwrap_or_else(|_| EnvFilter::new(default_level)))
        .init();

    match cli.command {
        Commands::Estimate(args) => pave::cli::commands::estimate::run(args, &global),
        Commands::Schedule(args) => pave::cli::commands::schedule::run(args, &global),
        Commands::Simulate(args) => pave::cli::commands::simulate::run(args, &global),
        Commands::Shift(args) => pave::cli::commands::shift::run(args, &global),
        Commands::Reference(args) => pave::cli::commands::reference::run(args, &global),
        Commands::Completions(args) => pave::cli::commands::completions::run(args),
    }
}
