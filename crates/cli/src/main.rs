use anyhow::Context;
use atlas_kernel::settings::Settings;
use catalog_app::modules::catalog::{models::CATALOG_PATH, routes::ROUTES};
use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "catalog", version, about = "Library catalog service")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP server until Ctrl-C
    Serve {
        /// Override the configured listen port
        #[arg(long)]
        port: Option<u16>,
    },
    /// Print the resolved settings as JSON
    Config,
    /// Print the catalog routing table
    Routes,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut settings = Settings::load().context("failed to load catalog settings")?;

    match cli.command {
        Command::Serve { port } => {
            if let Some(port) = port {
                settings.server.port = port;
            }
            atlas_telemetry::init(&settings.telemetry)?;
            tracing::info!(port = settings.server.port, "starting catalog service");

            tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .context("failed to build tokio runtime")?
                .block_on(catalog_app::run(settings))
        }
        Command::Config => {
            let rendered =
                serde_json::to_string_pretty(&settings).context("failed to render settings")?;
            println!("{rendered}");
            Ok(())
        }
        Command::Routes => {
            for route in ROUTES {
                let path = match route.path {
                    "/" => CATALOG_PATH.to_string(),
                    path => format!("{CATALOG_PATH}{path}"),
                };
                println!("{:<6} {:<38} {}", route.method, path, route.summary);
            }
            Ok(())
        }
    }
}
