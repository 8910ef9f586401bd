use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use dynconf::observability::logging::init_logging;
use dynconf::{load_options, ChangeEvent, Client, ConfigClient, ConfigSource, TypedAccessor};

#[derive(Parser)]
#[command(name = "config-cli")]
#[command(about = "Inspect and watch dynamic configuration", long_about = None)]
struct Cli {
    /// Client options file (TOML).
    #[arg(short, long, default_value = "dynconf.toml")]
    options: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print a value (the whole config when no key is given)
    Get {
        config: String,
        key: Option<String>,
        /// Substitute ${VAR} placeholders in string values
        #[arg(long)]
        env: bool,
    },
    /// List the configs that were loaded
    Names,
    /// Print the config every time it changes, until Ctrl-C
    Watch { config: String },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = init_logging("dynconf=info,config_cli=info");

    let cli = Cli::parse();
    let options = load_options(&cli.options)?;
    let client = ConfigClient::new(options).await?;

    match cli.command {
        Commands::Get { config, key, env } => {
            let key = key.unwrap_or_default();
            if env {
                println!("{}", client.get_string_with_env(&config, &key)?);
            } else {
                let value = client.get(&config, &key)?;
                println!("{}", serde_json::to_string_pretty(&value)?);
            }
        }
        Commands::Names => {
            for name in client.config_names() {
                println!("{}", name);
            }
        }
        Commands::Watch { config } => {
            println!("{}", serde_json::to_string_pretty(&client.get(&config, "")?)?);
            client.add_change_listener(
                &config,
                Arc::new(|event: &ChangeEvent| {
                    if !event.reloaded {
                        eprintln!("{}: update rejected, keeping previous content", event.config);
                        return;
                    }
                    match serde_json::to_string_pretty(event.snapshot.as_ref()) {
                        Ok(text) => println!("{}", text),
                        Err(e) => eprintln!("{}: cannot render snapshot: {}", event.config, e),
                    }
                }),
            )?;
            tokio::signal::ctrl_c().await?;
        }
    }

    client.close()?;
    Ok(())
}
