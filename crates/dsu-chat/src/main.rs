//! dsu-chat - command-line client for the DSU direct-messaging server.
//!
//! Every subcommand opens a `.dsu` profile, performs one action through
//! `dsu_core::Messenger` and saves the profile back.

use clap::{Parser, Subcommand};
use dsu_core::config::duration_from_secs;
use dsu_core::{ClientConfig, Messenger};
use std::process::ExitCode;

mod commands;
mod output;

/// Command-line client for the DSU direct-messaging server.
#[derive(Parser, Debug)]
#[command(name = "dsu-chat")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Server port, used when the profile's server address has none
    #[arg(long, global = true)]
    port: Option<u16>,

    /// Network timeout in seconds
    #[arg(long, global = true)]
    timeout: Option<f64>,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Output as single-line JSON (implies --json)
    #[arg(long, global = true)]
    compact: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a new profile file
    New {
        /// Profile path (default: ~/.dsu/<username>.dsu)
        path: Option<String>,

        /// Server address (host or host:port)
        #[arg(short, long)]
        server: String,

        /// Username to join with
        #[arg(short, long)]
        username: String,

        /// Password to join with
        #[arg(short, long)]
        password: String,
    },

    /// Show a profile summary and its contacts
    Show {
        /// Profile path
        path: String,
    },

    /// Add a contact to a profile
    AddContact {
        /// Profile path
        path: String,

        /// Contact username
        name: String,
    },

    /// Send a direct message to a contact
    Send {
        /// Profile path
        path: String,

        /// Contact name (fuzzy matched against the contact list)
        contact: String,

        /// Message to send
        #[arg(required = true)]
        message: Vec<String>,
    },

    /// Fetch new messages
    Poll {
        /// Profile path
        path: String,

        /// Keep polling until interrupted
        #[arg(short, long)]
        watch: bool,

        /// Seconds between polls when watching
        #[arg(short, long)]
        interval: Option<f64>,
    },

    /// Fetch every message on the server and add the ones missing locally
    Sync {
        /// Profile path
        path: String,
    },

    /// Print the conversation with a contact
    Conversation {
        /// Profile path
        path: String,

        /// Contact name
        contact: String,
    },
}

fn build_config(cli: &Cli) -> ClientConfig {
    let mut config = ClientConfig::from_env();
    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(timeout) = cli.timeout.and_then(duration_from_secs) {
        config.timeout = timeout;
    }
    config
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = build_config(&cli);
    let poll_interval = config.poll_interval;
    let mut messenger = Messenger::new(config);
    let output = output::OutputMode::from_flags(cli.json, cli.compact);

    match cli.command {
        Command::New {
            path,
            server,
            username,
            password,
        } => commands::new(
            &mut messenger,
            path.as_deref(),
            &server,
            &username,
            &password,
            output,
        ),
        Command::Show { path } => {
            commands::show(&mut messenger, &commands::expand_path(&path)?, output)
        }
        Command::AddContact { path, name } => {
            commands::add_contact(&mut messenger, &commands::expand_path(&path)?, &name, output)
        }
        Command::Send {
            path,
            contact,
            message,
        } => commands::send(
            &mut messenger,
            &commands::expand_path(&path)?,
            &contact,
            &message.join(" "),
            output,
        ),
        Command::Poll {
            path,
            watch,
            interval,
        } => {
            let interval = interval
                .and_then(duration_from_secs)
                .unwrap_or(poll_interval);
            commands::poll(
                &mut messenger,
                &commands::expand_path(&path)?,
                watch,
                interval,
                output,
            )
        }
        Command::Sync { path } => {
            commands::sync(&mut messenger, &commands::expand_path(&path)?, output)
        }
        Command::Conversation { path, contact } => commands::conversation(
            &mut messenger,
            &commands::expand_path(&path)?,
            &contact,
            output,
        ),
    }
}

fn main() -> ExitCode {
    // Initialize tracing/logging
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let cli = Cli::parse();
    let mode = output::OutputMode::from_flags(cli.json, cli.compact);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            mode.fail(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}
