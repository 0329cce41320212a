use anyhow::Context;
use clap::{Parser, Subcommand};
use shelf_kernel::Settings;

/// Book inventory REST API
#[derive(Debug, Parser)]
#[command(name = "shelf", version, about)]
struct Cli {
    /// Override `database.url` from configuration
    #[arg(long, global = true)]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP server (default)
    Serve {
        /// Override `server.port` from configuration
        #[arg(long)]
        port: Option<u16>,
        /// Skip inserting sample books into an empty database
        #[arg(long)]
        no_seed: bool,
    },
    /// Apply pending database migrations and exit
    Migrate,
    /// Print the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut settings = Settings::load().with_context(|| "failed to load shelf settings")?;
    shelf_telemetry::init(&settings.telemetry);

    if let Some(url) = cli.database_url {
        settings.database.url = url;
    }

    match cli.command.unwrap_or(Command::Serve {
        port: None,
        no_seed: false,
    }) {
        Command::Serve { port, no_seed } => {
            if let Some(port) = port {
                settings.server.port = port;
            }
            if no_seed {
                settings.database.seed = false;
            }
            let app = shelf_app::App::bootstrap(settings).await?;
            app.serve().await
        }
        Command::Migrate => {
            let applied = shelf_app::migrate(&settings).await?;
            tracing::info!(applied, "migrations complete");
            println!("applied {applied} migration(s)");
            Ok(())
        }
        Command::Config => {
            let summary = serde_json::json!({
                "environment": format!("{:?}", settings.environment).to_lowercase(),
                "server": {
                    "host": settings.server.host,
                    "port": settings.server.port,
                    "request_timeout_ms": settings.server.request_timeout_ms,
                },
                "database": {
                    "url": settings.database.url,
                    "max_connections": settings.database.max_connections,
                    "seed": settings.database.seed,
                },
                "telemetry": {
                    "log_format": format!("{:?}", settings.telemetry.log_format).to_lowercase(),
                    "log_level": settings.telemetry.log_level,
                },
            });
            println!("{}", serde_json::to_string_pretty(&summary)?);
            Ok(())
        }
    }
}
