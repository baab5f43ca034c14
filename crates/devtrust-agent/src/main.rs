//! DevTrust agent: command-line entry point.
//!
//! Runs one trust operation and prints the bridge response as JSON on stdout,
//! or serves bridge calls line by line over stdin/stdout for a host process.
//!
//! # Usage
//!
//! ```text
//! devtrust [OPTIONS] [COMMAND]
//!
//! Commands:
//!   self-check          Module liveness record (default)
//!   emulator            Emulator detection verdict
//!   root                Root detection verdict
//!   developer-options   Developer options verdict
//!   device-info         Device snapshot
//!   assess              Run every enabled check and decide
//!   initialize          Snapshot, assess, then enable capture protection
//!   summary             Assessment counters and protection state
//!   enable-protection   Set the secure display flag
//!   disable-protection  Clear the secure display flag
//!   serve               Read operation names from stdin, answer on stdout
//!   write-config        Save the effective configuration to --config
//!
//! Options:
//!   --config <PATH>            Config file [default: platform config dir]
//!   --log-level <LEVEL>        Log level when RUST_LOG is unset
//!   --shell-timeout-ms <MS>    Bound on the privileged-shell lookup
//!   --query-timeout-ms <MS>    Deadline for each getprop/settings/pm query
//!   --headless-surface         Attach an in-memory display surface
//!   --adb                      Query a device over `adb shell`
//!   --serial <SERIAL>          Device serial for --adb
//!   --app-package <ID>         Hosting app package for the debuggable check
//! ```
//!
//! Logs go to stderr so stdout stays machine-readable.
//!
//! # Architecture
//!
//! ```text
//! main()
//!  └─ load AgentConfig            -- TOML, defaults on first run
//!  └─ AndroidShellPlatform        -- getprop / settings / pm / which
//!  └─ UiThreadExecutor            -- serial looper for flag mutations
//!  └─ SurfaceRegistry             -- optional HeadlessSurface
//!  └─ TrustEvaluator → HostBridge -- one call, or the serve loop
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use devtrust_agent::application::evaluator::TrustEvaluator;
use devtrust_agent::infrastructure::bridge::{BridgeOperation, HostBridge};
use devtrust_agent::infrastructure::platform::android_shell::{AndroidShellPlatform, ShellTarget};
use devtrust_agent::infrastructure::storage::config::{
    config_file_path, load_config_from, save_config_to,
};
use devtrust_agent::infrastructure::surface::{HeadlessSurface, SurfaceRegistry};
use devtrust_agent::infrastructure::ui_thread::UiThreadExecutor;

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Device trust evaluator.
#[derive(Debug, Parser)]
#[command(
    name = "devtrust",
    about = "Evaluates device trust and manages capture protection",
    version
)]
struct Cli {
    /// Path to the TOML config file.
    #[arg(long, env = "DEVTRUST_CONFIG")]
    config: Option<PathBuf>,

    /// Log level used when `RUST_LOG` is unset; overrides the config file.
    #[arg(long, env = "DEVTRUST_LOG_LEVEL")]
    log_level: Option<String>,

    /// Upper bound on the privileged-shell lookup in milliseconds.
    #[arg(long, env = "DEVTRUST_SHELL_TIMEOUT_MS")]
    shell_timeout_ms: Option<u64>,

    /// Deadline for each `getprop`/`settings`/`pm` query in milliseconds.
    #[arg(long, env = "DEVTRUST_QUERY_TIMEOUT_MS")]
    query_timeout_ms: Option<u64>,

    /// Attach an in-memory display surface so protection commands succeed
    /// on hosts without a window system.
    #[arg(long)]
    headless_surface: bool,

    /// Query a connected device through `adb shell` instead of locally.
    #[arg(long)]
    adb: bool,

    /// Device serial passed to `adb -s` (implies --adb).
    #[arg(long, env = "ANDROID_SERIAL")]
    serial: Option<String>,

    /// Package id of the hosting application.
    #[arg(long, env = "DEVTRUST_APP_PACKAGE")]
    app_package: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Clone, Copy, Subcommand)]
enum Command {
    SelfCheck,
    Emulator,
    Root,
    DeveloperOptions,
    DeviceInfo,
    Assess,
    Initialize,
    /// Counters start at zero for each process; use `serve` to accumulate.
    Summary,
    EnableProtection,
    DisableProtection,
    /// Answer one bridge call per stdin line (operation names such as
    /// `checkRoot`) with one JSON response per stdout line.
    Serve,
    /// Save the effective configuration (file plus flag overrides).
    WriteConfig,
}

impl Command {
    fn operation(self) -> Option<BridgeOperation> {
        Some(match self {
            Command::SelfCheck => BridgeOperation::SelfCheck,
            Command::Emulator => BridgeOperation::CheckEmulator,
            Command::Root => BridgeOperation::CheckRoot,
            Command::DeveloperOptions => BridgeOperation::CheckDeveloperOptions,
            Command::DeviceInfo => BridgeOperation::GetDeviceInfo,
            Command::Assess => BridgeOperation::Assess,
            Command::Initialize => BridgeOperation::Initialize,
            Command::Summary => BridgeOperation::Summary,
            Command::EnableProtection => BridgeOperation::EnableProtection,
            Command::DisableProtection => BridgeOperation::DisableProtection,
            Command::Serve | Command::WriteConfig => return None,
        })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let config_path = match &cli.config {
        Some(p) => p.clone(),
        None => config_file_path().context("resolving config path")?,
    };
    let mut config = load_config_from(&config_path)
        .with_context(|| format!("loading config from {}", config_path.display()))?;
    if let Some(level) = &cli.log_level {
        config.agent.log_level = level.clone();
    }
    if let Some(ms) = cli.shell_timeout_ms {
        config.detection.shell_probe_timeout_ms = ms;
    }
    if let Some(ms) = cli.query_timeout_ms {
        config.detection.query_timeout_ms = ms;
    }

    // Initialise structured logging.  `RUST_LOG` wins over the config level.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.agent.log_level)),
        )
        .init();

    info!(config = %config_path.display(), "DevTrust agent starting");

    let command = cli.command.unwrap_or(Command::SelfCheck);
    if let Command::WriteConfig = command {
        save_config_to(&config, &config_path)
            .with_context(|| format!("writing config to {}", config_path.display()))?;
        info!(config = %config_path.display(), "configuration saved");
        return Ok(ExitCode::SUCCESS);
    }

    let settings = config.evaluator_settings().context("invalid [checks] table")?;
    let target = if cli.adb || cli.serial.is_some() {
        ShellTarget::Adb {
            serial: cli.serial.clone(),
        }
    } else {
        ShellTarget::Local
    };
    let platform = Arc::new(
        AndroidShellPlatform::new(target, cli.app_package.clone())
            .with_query_timeout(Duration::from_millis(config.detection.query_timeout_ms)),
    );
    let executor = Arc::new(UiThreadExecutor::spawn().context("starting UI looper")?);
    let surfaces = Arc::new(SurfaceRegistry::new());
    if cli.headless_surface {
        surfaces.attach(Arc::new(HeadlessSurface::new()));
    }

    info!(
        timeout_ms = settings.shell_probe_timeout.as_millis() as u64,
        query_timeout_ms = config.detection.query_timeout_ms,
        level = settings.security_level.as_str(),
        "evaluator configured"
    );
    let evaluator = TrustEvaluator::new(
        platform,
        surfaces,
        executor.clone(),
        config.indicators.clone(),
        settings,
    );
    let bridge = HostBridge::new(Arc::new(evaluator));

    let exit = match command.operation() {
        Some(op) => {
            let response = bridge.call(op).await;
            println!("{}", response.to_json()?);
            if response.success {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        None => {
            serve(&bridge).await?;
            ExitCode::SUCCESS
        }
    };

    executor.shutdown();
    Ok(exit)
}

/// Answers bridge calls from stdin until EOF.
async fn serve(bridge: &HostBridge) -> anyhow::Result<()> {
    info!("serving bridge calls on stdin");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    while let Some(line) = lines.next_line().await.context("reading stdin")? {
        let name = line.trim();
        if name.is_empty() {
            continue;
        }
        let json = match bridge.call_by_name(name).await {
            Ok(response) => response.to_json()?,
            Err(e) => {
                warn!(error = %e, "rejecting unknown operation");
                serde_json::json!({
                    "success": false,
                    "data": null,
                    "error": { "code": null, "message": e.to_string() },
                })
                .to_string()
            }
        };
        stdout.write_all(json.as_bytes()).await?;
        stdout.write_all(b"\n").await?;
        stdout.flush().await?;
    }

    info!("stdin closed; shutting down");
    Ok(())
}
