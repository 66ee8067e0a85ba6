//! kvdb Server Binary
//!
//! Starts the TCP server for kvdb.
//!
//! Settings are layered: built-in defaults, then the YAML config file, then
//! command-line flags and their environment variables.

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use kvdb::config::{LogFormat, LogLevel, LogOutput};
use kvdb::network::ServerOptions;
use kvdb::storage::EngineType;
use kvdb::{logging, Config, Database, KvError, Server};

/// Config file read from the working directory when none is named
const DEFAULT_CONFIG_FILE: &str = "config.yml";

/// kvdb Server
#[derive(Parser, Debug)]
#[command(name = "kvdb-server")]
#[command(about = "Networked in-memory key-value store")]
#[command(version)]
struct Args {
    /// YAML config file [default: ./config.yml when present]
    #[arg(short, long, env = "CONFIG_FILE_NAME")]
    config: Option<PathBuf>,

    /// Listen address (host:port) [default: 127.0.0.1:3223]
    #[arg(short, long, env = "KVDB_ADDRESS")]
    address: Option<String>,

    /// Storage engine [default: in_memory]
    #[arg(short, long, env = "KVDB_ENGINE")]
    engine: Option<EngineType>,

    /// Maximum concurrent connections, 0 for unlimited [default: 100]
    #[arg(short, long, env = "KVDB_MAX_CONNECTIONS")]
    max_connections: Option<usize>,

    /// Largest accepted request, in bytes [default: 4096]
    #[arg(long, env = "KVDB_MAX_MESSAGE_SIZE")]
    max_message_size: Option<usize>,

    /// Close connections idle for this many seconds
    #[arg(long, env = "KVDB_IDLE_TIMEOUT_SECS")]
    idle_timeout_secs: Option<u64>,

    /// Log level: debug, info, warn, error [default: info]
    #[arg(long, env = "KVDB_LOG_LEVEL")]
    log_level: Option<LogLevel>,

    /// Log destination: stdout, stderr, or a file path [default: stdout]
    #[arg(long, env = "KVDB_LOG_OUTPUT")]
    log_output: Option<LogOutput>,

    /// Log line format: text or json [default: text]
    #[arg(long, env = "KVDB_LOG_FORMAT")]
    log_format: Option<LogFormat>,
}

impl Args {
    /// Overlay the flags that were given onto `base`
    fn apply(self, base: Config) -> Config {
        let mut builder = base.into_builder();

        if let Some(address) = self.address {
            builder = builder.listen_addr(address);
        }
        if let Some(engine) = self.engine {
            builder = builder.engine(engine);
        }
        if let Some(count) = self.max_connections {
            builder = builder.max_connections(count);
        }
        if let Some(size) = self.max_message_size {
            builder = builder.max_message_size(size);
        }
        if let Some(secs) = self.idle_timeout_secs {
            builder = builder.idle_timeout(Some(Duration::from_secs(secs)));
        }
        if let Some(level) = self.log_level {
            builder = builder.log_level(level);
        }
        if let Some(output) = self.log_output {
            builder = builder.log_output(output);
        }
        if let Some(format) = self.log_format {
            builder = builder.log_format(format);
        }

        builder.build()
    }
}

/// Load the named config file, or `./config.yml` if it exists
fn load_base_config(path: Option<&Path>) -> Result<Config, KvError> {
    match path {
        Some(path) => Config::from_file(path),
        None if Path::new(DEFAULT_CONFIG_FILE).is_file() => Config::from_file(DEFAULT_CONFIG_FILE),
        None => Ok(Config::default()),
    }
}

fn main() {
    let args = Args::parse();

    let base = match load_base_config(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    let config = args.apply(base);

    if let Err(e) = config.validate() {
        eprintln!("Invalid configuration: {e}");
        std::process::exit(1);
    }

    if let Err(e) = logging::init(&config.log) {
        eprintln!("{e}");
        std::process::exit(1);
    }

    tracing::info!("kvdb Server v{}", kvdb::VERSION);
    tracing::info!("Storage engine: {}", config.engine);
    tracing::info!("Listen address: {}", config.listen_addr);

    let database = Database::open(config.engine);

    // Start server
    let server = match Server::bind(&config.listen_addr, database, ServerOptions::from(&config)) {
        Ok(server) => server,
        Err(e) => {
            tracing::error!("Failed to start server: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = server.run() {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }

    tracing::info!("Server stopped");
}
