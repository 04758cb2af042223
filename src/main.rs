use clap::Parser;
use log::{error, info, warn};
use morphnet::configuration::config::Config;
use morphnet::configuration::types::ExecutorMode;
use morphnet::controller::{create_shutdown_token, Controller};
use std::fs::OpenOptions;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "morphnet")]
#[command(version = "0.1.0")]
#[command(about = "Moving target defense engine with decoy listeners")]
struct Args {
    /// Path to the TOML configuration file
    config_file: PathBuf,

    /// Append log output to this file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Force the simulation executor whatever the configuration says
    #[arg(long)]
    simulate: bool,

    /// Cloudflare API token, overrides `dns.api_token`
    #[arg(long, env = "MORPHNET_DNS_API_TOKEN", hide_env_values = true)]
    dns_api_token: Option<String>,
}

fn init_logging(log_file: Option<&PathBuf>) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    builder.format_target(false);

    if let Some(path) = log_file {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            let _ = std::fs::create_dir_all(parent);
        }
        match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => {
                builder.target(env_logger::Target::Pipe(Box::new(file)));
            }
            Err(e) => eprintln!("Unable to open log file {}: {}", path.display(), e),
        }
    }

    builder.init();
}

fn apply_overrides(config: &mut Config, args: &Args) {
    if args.simulate && config.executor.mode != ExecutorMode::Simulation {
        warn!("--simulate given, interface changes will only be logged");
        config.executor.mode = ExecutorMode::Simulation;
    }
    if let Some(token) = &args.dns_api_token {
        config.dns.api_token = Some(token.clone());
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_logging(args.log_file.as_ref());

    println!(
        "
███╗   ███╗ ██████╗ ██████╗ ██████╗ ██╗  ██╗███╗   ██╗███████╗████████╗
████╗ ████║██╔═══██╗██╔══██╗██╔══██╗██║  ██║████╗  ██║██╔════╝╚══██╔══╝
██╔████╔██║██║   ██║██████╔╝██████╔╝███████║██╔██╗ ██║█████╗     ██║
██║╚██╔╝██║██║   ██║██╔══██╗██╔═══╝ ██╔══██║██║╚██╗██║██╔══╝     ██║
██║ ╚═╝ ██║╚██████╔╝██║  ██║██║     ██║  ██║██║ ╚████║███████╗   ██║
╚═╝     ╚═╝ ╚═════╝ ╚═╝  ╚═╝╚═╝     ╚═╝  ╚═╝╚═╝  ╚═══╝╚══════╝   ╚═╝
=======================================================================
          Moving target defense: IP rotation and decoys v0.1.0
=======================================================================
"
    );

    info!("Importing configuration");

    let mut config = match Config::from_file(&args.config_file) {
        Ok(config) => config,
        Err(e) => {
            error!("Unable to import configuration from file: {}", e);
            std::process::exit(1);
        }
    };
    apply_overrides(&mut config, &args);

    info!("Configuration imported successfully");

    let controller = match Controller::new(config) {
        Ok(controller) => controller,
        Err(e) => {
            error!("Unable to create a controller instance: {}, exiting...", e);
            std::process::exit(1);
        }
    };

    let cancel = create_shutdown_token();
    if let Err(e) = controller.run(cancel).await {
        error!("Error occured in the controller process: {}, exiting...", e);
        std::process::exit(1);
    }
}
