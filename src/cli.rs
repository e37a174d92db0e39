use std::path::{Path, PathBuf};

mod check;
mod input;
mod resolve;
mod terminal;

use bc3::Config;
use check::Check;
use clap::ArgAction;
use resolve::Resolve;

#[derive(Debug, clap::Parser)]
#[command(version, about)]
pub struct Cli {
    /// Verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to a TOML configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

impl Cli {
    pub fn run(self) -> anyhow::Result<()> {
        Self::setup_logging(self.verbose);

        let config = load_config(self.config.as_deref())?;
        self.command.run(&config)
    }

    fn setup_logging(verbosity: u8) {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

        let level = match verbosity {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            2 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        };

        let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into());

        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_thread_names(false)
            .with_line_number(false);

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let config = Config::load(path)?;
    tracing::debug!(path = %path.display(), ?config, "loaded configuration");
    Ok(config)
}

#[derive(Debug, clap::Parser)]
pub enum Command {
    /// Resolve budgets into priced line items
    ///
    /// Each file is flattened from its root concepts, multiplying the
    /// decomposition factors along every path.
    Resolve(Resolve),

    /// Report malformed records, dangling references and cycles
    ///
    /// Exits with status 2 when any problem is found.
    Check(Check),
}

impl Command {
    fn run(self, config: &Config) -> anyhow::Result<()> {
        match self {
            Self::Resolve(command) => command.run(config)?,
            Self::Check(command) => command.run(config)?,
        }
        Ok(())
    }
}
