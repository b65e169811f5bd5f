use clap::{Parser, Subcommand};

use quickslug::config::{StaticConfig, get_config, init_config_from_path};
use quickslug::errors::QuickslugError;
use quickslug::runtime::run_server;
use quickslug::system::init_logging;

#[derive(Parser, Debug)]
#[command(name = "quickslug", version, about = "URL shortener service")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Print a sample configuration file
    GenerateConfig,
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    dotenvy::dotenv().ok();

    match cli.command.unwrap_or(Command::Serve) {
        Command::GenerateConfig => {
            println!("{}", StaticConfig::generate_sample_config());
            Ok(())
        }
        Command::Serve => {
            init_config_from_path(&cli.config);
            let config = get_config();
            let guard = init_logging(&config);

            tracing::info!("quickslug {} starting", env!("CARGO_PKG_VERSION"));
            if let Err(e) = run_server().await {
                // 存储等启动阶段的错误以彩色格式输出到终端
                match e.downcast_ref::<QuickslugError>() {
                    Some(err) => eprintln!("{}", err.format_colored()),
                    None => eprintln!("Server error: {:#}", e),
                }
                drop(guard);
                std::process::exit(1);
            }
            drop(guard);
            Ok(())
        }
    }
}
