use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::commands;

/// failclosectl - inspect and exercise a fail-closed access gate
#[derive(Parser, Debug)]
#[command(name = "failclosectl")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Gate configuration file
    #[arg(
        long,
        short = 'c',
        global = true,
        env = "FAILCLOSE_CONFIG",
        default_value = "failclose.yaml"
    )]
    pub config: PathBuf,

    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate a rules file against the configured apps and project
    Validate {
        /// Rules file (defaults to the configured permissions_module)
        #[arg(long, short)]
        rules: Option<PathBuf>,
    },

    /// Print the resolved project name
    Project,

    /// Explain the decision for a handler, e.g. `check demo.views.pretty`
    Check {
        /// Fully-qualified handler: <module path>.<name>
        handler: String,

        /// Treat the handler as marked safe
        #[arg(long)]
        safe: bool,

        /// Rules file (defaults to the configured permissions_module)
        #[arg(long, short)]
        rules: Option<PathBuf>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        output: String,
    },

    /// Serve the demo application with `pretty` and `ugly` handlers
    Demo {
        /// Port to listen on
        #[arg(long, short, default_value = "8080")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
    },
}

impl Cli {
    pub async fn execute(self) -> anyhow::Result<()> {
        match self.command {
            Commands::Validate { rules } => {
                commands::validate::execute(&self.config, rules.as_deref())
            }
            Commands::Project => commands::project::execute(&self.config),
            Commands::Check {
                handler,
                safe,
                rules,
                output,
            } => commands::check::execute(&self.config, &handler, safe, rules.as_deref(), &output),
            Commands::Demo { port, host } => {
                commands::demo::execute(&self.config, &host, port).await
            }
        }
    }
}
