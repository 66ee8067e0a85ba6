//! kvdb CLI Client
//!
//! Command-line interface for interacting with kvdb. Runs one command and
//! exits, or opens an interactive prompt with line editing and history when
//! no subcommand is given.

use std::io::{self, Write};
use std::time::Duration;

use clap::{Parser, Subcommand};
use kvdb::protocol::{Command, CommandName};
use kvdb::{Client, KvError};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing_subscriber::{fmt, EnvFilter};

/// kvdb CLI
#[derive(Parser, Debug)]
#[command(name = "kvdb-cli")]
#[command(about = "CLI for the kvdb key-value store")]
#[command(version)]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "localhost:3223")]
    address: String,

    /// Give up waiting for a response after this many seconds
    #[arg(short, long)]
    timeout_secs: Option<u64>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Get a value by key
    Get {
        /// The key to get
        key: String,
    },

    /// Set a key-value pair
    Set {
        /// The key to set
        key: String,

        /// The value to set
        value: String,
    },

    /// Delete a key
    Del {
        /// The key to delete
        key: String,
    },
}

impl Commands {
    fn into_command(self) -> Result<Command, KvError> {
        let command = match self {
            Commands::Get { key } => Command::new(CommandName::Get, vec![key]),
            Commands::Set { key, value } => Command::new(CommandName::Set, vec![key, value]),
            Commands::Del { key } => Command::new(CommandName::Del, vec![key]),
        };
        command.map_err(|e| KvError::Config(e.to_string()))
    }
}

const PROMPT: &str = "> ";
const CLEAR_SCREEN: &str = "\x1b[H\x1b[2J";

fn main() {
    // Diagnostics go to stderr so stdout carries only responses
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    if let Err(e) = run(args) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<(), KvError> {
    let mut client = Client::connect(args.address.as_str())?;
    client.set_timeout(args.timeout_secs.map(Duration::from_secs))?;

    let result = match args.command {
        Some(command) => one_shot_command(&mut client, command),
        None => interactive_mode(&mut client),
    };

    client.close()?;
    result
}

fn one_shot_command(client: &mut Client, command: Commands) -> Result<(), KvError> {
    let query = command.into_command()?.to_string();
    let response = client.query(&query)?;
    println!("{response}");
    Ok(())
}

fn interactive_mode(client: &mut Client) -> Result<(), KvError> {
    let mut editor = DefaultEditor::new().map_err(readline_error)?;
    let mut stdout = io::stdout();

    println!("Connected to {}", client.peer_addr());

    loop {
        let line = match editor.readline(PROMPT) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => return Ok(()),
            Err(e) => return Err(readline_error(e)),
        };

        let query = line.trim();
        match query {
            "" => continue,
            "exit" => return Ok(()),
            "clear" => {
                write!(stdout, "{CLEAR_SCREEN}")?;
                stdout.flush()?;
                continue;
            }
            _ => {}
        }

        if let Err(e) = editor.add_history_entry(query) {
            tracing::debug!("Failed to record history: {}", e);
        }

        match client.query(query) {
            Ok(response) => println!("{response}"),
            Err(e) => {
                eprintln!("Error sending message: {e}");
                // A failed exchange leaves the client closed
                if client.is_closed() {
                    eprintln!("Connection to {} lost", client.peer_addr());
                    return Ok(());
                }
            }
        }
    }
}

fn readline_error(e: ReadlineError) -> KvError {
    KvError::Io(io::Error::new(io::ErrorKind::Other, e))
}
