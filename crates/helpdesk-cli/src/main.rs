mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::config::ConfigSubcommand;
use cmd::ticket::TicketSubcommand;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "helpdesk",
    about = "Tiered support desk: open, work, escalate and resolve tickets",
    version
)]
struct Cli {
    /// Workspace root (default: nearest directory containing .helpdesk/)
    #[arg(long, global = true, env = "HELPDESK_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, short = 'j', global = true)]
    json: bool,

    /// Who is acting (required for ticket changes and policy)
    #[arg(long, global = true, env = "HELPDESK_ACTOR")]
    actor: Option<String>,

    /// Role of the acting user: L1, L2, L3 or ADMIN
    #[arg(long, global = true, env = "HELPDESK_ROLE")]
    role: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create .helpdesk/ with a default config
    Init {
        /// Project name (default: directory name)
        #[arg(long)]
        name: Option<String>,
    },

    /// Open, inspect and move tickets
    Ticket {
        #[command(subcommand)]
        subcommand: TicketSubcommand,
    },

    /// Dashboard counters
    Stats,

    /// Inspect the workspace config
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },

    /// Run the HTTP API over this workspace
    Serve {
        /// Port to bind (default: server.port from config)
        #[arg(long)]
        port: Option<u16>,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Serve { .. } => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let root = root::resolve_root(cli.root.as_deref());
    let identity = cmd::Identity {
        actor: cli.actor,
        role: cli.role,
    };

    let result = match cli.command {
        Commands::Init { name } => cmd::init::run(&root, name.as_deref()),
        Commands::Ticket { subcommand } => cmd::ticket::run(&root, &identity, subcommand, cli.json),
        Commands::Stats => cmd::stats::run(&root, cli.json),
        Commands::Config { subcommand } => cmd::config::run(&root, subcommand, cli.json),
        Commands::Serve { port } => cmd::serve::run(&root, port),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
