use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use cinelista::config::{Config, LogFormat};

#[derive(Parser, Debug)]
#[command(name = "cinelista-server")]
#[command(
    about = "Movie tracking REST API: users, ratings, comments and watchlists",
    long_about = None
)]
struct Args {
    #[arg(short, long, default_value = "cinelista.yaml")]
    config: String,

    /// Log at debug level for this crate.
    #[arg(short, long)]
    debug: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let config = match Config::from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let default_filter = if args.debug {
        "cinelista=debug,tower_http=debug"
    } else {
        "cinelista=info,tower_http=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into());

    match config.log_format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
        LogFormat::Text => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init(),
    }

    tracing::info!("Using config file: {}", args.config);

    if let Err(e) = cinelista::run(config, args.debug).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
