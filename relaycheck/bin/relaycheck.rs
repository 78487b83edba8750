//! Command-line front end for relaycheck
//!
//! - Probe the configured relay and print the per-step transcripts
//! - Send a test message
//! - Serve the HTTP endpoints
//! - Show, validate or edit the configuration

use std::{path::PathBuf, process::ExitCode, sync::Arc};

use clap::{Parser, Subcommand};
use relaycheck::render::{self, Format};
use relaycheck_common::{
    ConfigError, ConfigProvider, ConfigUpdate, Mailbox, SecurityMode, Signal,
    config::FileConfigProvider, internal, logging,
};
use relaycheck_diagnostics::{
    ConnectionDiagnostics, DEFAULT_BODY, DEFAULT_SUBJECT, MessageDispatcher,
};
use relaycheck_http::{HttpConfig, HttpServer};

/// Probe SMTP relays and send test messages
#[derive(Parser, Debug)]
#[command(name = "relaycheck")]
#[command(about = "Probe SMTP relays and send test messages", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to the configuration file (overrides RELAYCHECK_CONFIG)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the handshake against the relay without sending mail
    Probe {
        /// Output format
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },
    /// Send a test message through the relay
    Send {
        /// Recipient address
        #[arg(long)]
        to: String,

        #[arg(long, default_value = DEFAULT_SUBJECT)]
        subject: String,

        /// HTML body; the plain-text part is derived from it
        #[arg(long, default_value = DEFAULT_BODY)]
        message: String,

        /// Output format
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },
    /// Serve the HTTP endpoints until interrupted
    Serve {
        /// Address to listen on
        #[arg(long)]
        listen: Option<String>,
    },
    /// Inspect the configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print the configuration with the password masked
    Show {
        /// Output format (text is RON)
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },
    /// Check the configuration and list every problem
    Validate,
    /// Edit settings and write them back to the file
    Set(SetArgs),
}

/// Settings to change; anything omitted keeps its current value.
#[derive(clap::Args, Debug)]
struct SetArgs {
    #[arg(long)]
    host: Option<String>,

    #[arg(long)]
    port: Option<u16>,

    /// none, ssl (implicit TLS) or tls (STARTTLS)
    #[arg(long)]
    security: Option<SecurityMode>,

    /// An empty value disables authentication
    #[arg(long)]
    username: Option<String>,

    /// An empty value keeps the stored password
    #[arg(long)]
    password: Option<String>,

    #[arg(long)]
    from_email: Option<String>,

    /// An empty value removes the display name
    #[arg(long)]
    from_name: Option<String>,
}

impl From<SetArgs> for ConfigUpdate {
    fn from(args: SetArgs) -> Self {
        Self {
            host: args.host,
            port: args.port,
            security: args.security,
            username: args.username,
            password: args.password,
            from_email: args.from_email,
            from_name: args.from_name,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    logging::init();

    let cli = Cli::parse();
    let config_path = relaycheck::find_config_file(cli.config)?;

    match cli.command {
        Commands::Config {
            action: ConfigAction::Validate,
        } => Ok(cmd_validate(&config_path)),
        command => {
            let provider = Arc::new(FileConfigProvider::load(&config_path)?);
            run(command, provider).await
        }
    }
}

async fn run(command: Commands, provider: Arc<FileConfigProvider>) -> anyhow::Result<ExitCode> {
    match command {
        Commands::Probe { format } => {
            let config = provider.current();
            let report = ConnectionDiagnostics::new(&config).probe().await;
            println!("{}", render::report(&report, format)?);
            Ok(exit_code(report.success))
        }
        Commands::Send {
            to,
            subject,
            message,
            format,
        } => {
            let to = Mailbox::parse(&to)
                .map_err(|e| anyhow::anyhow!("Invalid recipient address: {e}"))?
                .to_string();

            let config = provider.current();
            let result = MessageDispatcher::new(&config)
                .send(&to, &subject, &message)
                .await;
            println!("{}", render::dispatch(&result, format)?);
            Ok(exit_code(result.success))
        }
        Commands::Serve { listen } => {
            cmd_serve(provider, listen).await?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Config {
            action: ConfigAction::Show { format },
        } => {
            println!("{}", render::configuration(&provider.current(), format)?);
            Ok(ExitCode::SUCCESS)
        }
        Commands::Config {
            action: ConfigAction::Validate,
        } => Ok(cmd_validate(provider.path())),
        Commands::Config {
            action: ConfigAction::Set(args),
        } => Ok(cmd_set(&provider, args.into())),
    }
}

fn cmd_set(provider: &FileConfigProvider, update: ConfigUpdate) -> ExitCode {
    let config = update.apply(&provider.current());

    match provider.store(config) {
        Ok(()) => {
            println!("Configuration updated successfully!");
            ExitCode::SUCCESS
        }
        Err(ConfigError::Invalid(messages)) => {
            println!("Configuration was not saved:");
            for message in messages {
                println!("  - {message}");
            }
            ExitCode::FAILURE
        }
        Err(e) => {
            println!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn cmd_validate(path: &std::path::Path) -> ExitCode {
    match FileConfigProvider::load(path) {
        Ok(_) => {
            println!("{} is valid", path.display());
            ExitCode::SUCCESS
        }
        Err(ConfigError::Invalid(messages)) => {
            println!("{} is invalid:", path.display());
            for message in messages {
                println!("  - {message}");
            }
            ExitCode::FAILURE
        }
        Err(e) => {
            println!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn cmd_serve(provider: Arc<FileConfigProvider>, listen: Option<String>) -> anyhow::Result<()> {
    let mut config = HttpConfig::default();
    if let Some(listen) = listen {
        config.listen_address = listen;
    }

    let server = HttpServer::new(config, provider.clone()).await?;
    let (shutdown, receiver) = tokio::sync::broadcast::channel(1);

    tokio::spawn(async move {
        if let Err(e) = wait_for_shutdown().await {
            tracing::error!("Unable to listen for shutdown signals: {e}");
            return;
        }
        let _ = shutdown.send(Signal::Shutdown);
    });

    #[cfg(unix)]
    tokio::spawn(reload_on_hangup(provider));

    server.serve(receiver).await?;
    Ok(())
}

#[cfg(unix)]
async fn wait_for_shutdown() -> std::io::Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut terminate = signal(SignalKind::terminate())?;

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result?;
            internal!("CTRL+C entered, shutting down");
        }
        _ = terminate.recv() => {
            internal!("Terminate Signal received, shutting down");
        }
    };

    Ok(())
}

#[cfg(not(unix))]
async fn wait_for_shutdown() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await?;
    internal!("CTRL+C entered, shutting down");
    Ok(())
}

/// Re-reads the configuration file on every SIGHUP.
#[cfg(unix)]
async fn reload_on_hangup(provider: Arc<FileConfigProvider>) {
    use tokio::signal::unix::{SignalKind, signal};

    let mut hangup = match signal(SignalKind::hangup()) {
        Ok(hangup) => hangup,
        Err(e) => {
            tracing::warn!("Unable to listen for SIGHUP, configuration reload disabled: {e}");
            return;
        }
    };

    while hangup.recv().await.is_some() {
        if let Err(e) = provider.reload() {
            tracing::error!(path = %provider.path().display(), "Configuration reload failed: {e}");
        }
    }
}

const fn exit_code(success: bool) -> ExitCode {
    if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
