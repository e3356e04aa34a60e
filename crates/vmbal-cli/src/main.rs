use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "vmbal",
    about = "vmbal — constrained VM-to-host rebalancing",
    version,
    propagate_version = true,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute a rebalancing plan.
    ///
    /// Reads the cluster description as JSON and prints the plan to stdout.
    /// Weights missing from the input fall back to [weights] in vmbal.toml.
    Solve {
        /// Input JSON file, or "-" for stdin
        #[arg(short, long)]
        input: String,
        /// Config file (default: ./vmbal.toml when present)
        #[arg(short, long)]
        config: Option<String>,
        /// Output format: json or text (overrides [output].format)
        #[arg(short, long)]
        format: Option<String>,
        /// Give up after this many seconds (overrides [solver].time_limit_secs)
        #[arg(long)]
        time_limit: Option<f64>,
    },
    /// Check an input file without solving it
    Validate {
        /// Input JSON file, or "-" for stdin
        #[arg(short, long)]
        input: String,
    },
    /// Re-check a plan against the input it was computed for
    Audit {
        /// Input JSON file the plan was computed for
        #[arg(short, long)]
        input: String,
        /// Plan JSON file, or "-" for stdin
        #[arg(short, long)]
        plan: String,
    },
    /// Generate a vmbal.toml scaffold
    InitConfig {
        #[arg(short, long, default_value = "vmbal.toml")]
        path: String,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("vmbal=info".parse()?)
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Solve { input, config, format, time_limit } => {
            commands::solve::solve(&input, config.as_deref(), format.as_deref(), time_limit)
        }
        Commands::Validate { input } => commands::validate::validate(&input),
        Commands::Audit { input, plan } => commands::audit::audit(&input, &plan),
        Commands::InitConfig { path, force } => commands::config::init(&path, force),
    }
}
