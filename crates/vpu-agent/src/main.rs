use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use vpu_updater::{ConsoleNotifier, GpgTool, Notifier, PlatformLabel, UpdatePipeline, UpdaterConfig};

mod mail;

use mail::SmtpNotifier;

#[derive(Parser)]
#[command(name = "vpu-agent")]
#[command(about = "Vendor package updater - fetch, verify and report new installers")]
struct Args {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Platform label to look for (e.g. "Ubuntu 64-bit")
    #[arg(short, long)]
    platform: Option<String>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Print the report instead of mailing it
    #[arg(long)]
    no_notify: bool,

    /// Print the supported platform labels and exit
    #[arg(long)]
    list_platforms: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<ExitCode> {
    let args = Args::parse();

    if args.list_platforms {
        for label in PlatformLabel::ALL {
            println!("{}", label);
        }
        return Ok(ExitCode::SUCCESS);
    }

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "vpu_agent={},vpu_updater={}",
            args.log_level, args.log_level
        ))
    });
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut config = match &args.config {
        Some(path) => UpdaterConfig::load_from_file(path)?,
        None => UpdaterConfig::default(),
    };
    config.apply_env()?;
    if let Some(platform) = &args.platform {
        config.platform = platform.parse()?;
    }
    config.validate()?;

    if !nix::unistd::Uid::effective().is_root() {
        warn!(
            "Not running as root; writing to {} may fail",
            config.cache_dir.display()
        );
    }

    let host = nix::unistd::gethostname()
        .map(|h| h.to_string_lossy().into_owned())
        .unwrap_or_else(|_| "unknown-host".to_string());

    let notifier: Box<dyn Notifier> = if config.email.enabled && !args.no_notify {
        Box::new(SmtpNotifier::from_config(&config.email)?)
    } else {
        Box::new(ConsoleNotifier)
    };
    let trust_tool = GpgTool::new(config.trust.program.clone(), config.trust.timeout());

    info!(product = %config.product_name, %host, "Starting vpu-agent");
    let pipeline = UpdatePipeline::new(config, Box::new(trust_tool), notifier)?.with_host(host);

    let outcome = pipeline.run().await;
    println!("{}", pipeline.console_message(&outcome));

    Ok(if outcome.is_failure() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}
