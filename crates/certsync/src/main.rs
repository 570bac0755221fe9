//! certsync - main entry point
//!
//! Exit codes: 0 when work was done or the bundle is usable, 1 when nothing
//! needed to change, 2 on error.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{error, info, warn};

use certsync::app::{self, exit};
use certsync::validation::{self, Requirements};
use certsync::{Bundle, CertificateIssuer, IssueRequest, PemFileIssuer, Synchronizer};
use certsync_config::Config;

/// certsync - keep one TLS certificate bundle in sync across file layouts
#[derive(Parser, Debug)]
#[command(name = "certsync")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file path
    #[arg(
        short = 'c',
        long = "config",
        env = "CERTSYNC_CONFIG",
        default_value = "certsync.kdl",
        global = true
    )]
    config: PathBuf,

    /// Enable verbose logging (debug level)
    #[arg(long = "verbose", global = true)]
    verbose: bool,

    /// Log output format
    #[arg(long = "log-format", value_enum, default_value_t = LogFormat::Text, global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate the canonical certificate bundle
    Check,
    /// Bring every save format in line with the canonical one
    Sync {
        /// Print the sync report as JSON on stdout
        #[arg(long = "json")]
        json: bool,
    },
    /// Publish a key and chain read from PEM files to every save format
    Import {
        /// PEM file holding the private key
        #[arg(long = "key")]
        key: PathBuf,
        /// PEM file holding the certificate chain, leaf first
        #[arg(long = "chain")]
        chain: PathBuf,
        /// Publish even if the credential fails expiry, key or domain checks
        #[arg(long = "force")]
        force: bool,
    },
    /// Import the given PEM files only if the stored bundle is not usable
    Renew {
        /// PEM file holding the private key
        #[arg(long = "key")]
        key: PathBuf,
        /// PEM file holding the certificate chain, leaf first
        #[arg(long = "chain")]
        chain: PathBuf,
    },
    /// Validate the configuration file and exit
    TestConfig,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.log_format);

    match run(&cli) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            error!(error = %format!("{e:#}"), "certsync failed");
            ExitCode::from(exit::ERROR)
        }
    }
}

fn init_logging(verbose: bool, format: LogFormat) {
    let log_level = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

fn run(cli: &Cli) -> Result<u8> {
    match &cli.command {
        Commands::Check => check(&cli.config),
        Commands::Sync { json } => sync(&cli.config, *json),
        Commands::Import { key, chain, force } => import(&cli.config, key, chain, *force),
        Commands::Renew { key, chain } => {
            let config = load_config(&cli.config)?;
            let issuer = PemFileIssuer::new(key, chain);
            let outcome = app::renew(&config, &issuer, chrono::Utc::now())?;
            Ok(outcome.exit_code())
        }
        Commands::TestConfig => test_config(&cli.config),
    }
}

/// Load and validate configuration, logging any warnings.
fn load_config(path: &Path) -> Result<Config> {
    let config = Config::from_file(path)?;
    let result = config
        .validate()
        .context("Configuration validation failed")?;

    for warning in &result.warnings {
        warn!("{}", warning);
    }
    Ok(config)
}

fn check(path: &Path) -> Result<u8> {
    let config = load_config(path)?;
    let format = config
        .canonical_format()
        .context("No save format configured")?;
    // Read-only: every slot file is read at most once.
    let bundle = Bundle::from_save_format_cached(format)?;
    let credential = bundle.get()?;

    match validation::validate_credential_now(&credential, &Requirements::from_config(&config)) {
        Ok(()) => {
            info!(
                bundle = %bundle.name(),
                not_after = ?credential.leaf().map(|leaf| leaf.not_after()),
                "Certificate bundle is valid"
            );
            Ok(exit::OK)
        }
        Err(e) => {
            error!(
                bundle = %bundle.name(),
                error = %e,
                "Certificate bundle is not valid"
            );
            Ok(exit::NO_CHANGE)
        }
    }
}

fn sync(path: &Path, json: bool) -> Result<u8> {
    let config = load_config(path)?;
    let synchronizer = Synchronizer::from_config(&config)?;
    let report = synchronizer.sync()?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to encode sync report")?
        );
    }

    Ok(if report.changed() {
        exit::OK
    } else {
        exit::NO_CHANGE
    })
}

fn import(path: &Path, key: &Path, chain: &Path, force: bool) -> Result<u8> {
    let config = load_config(path)?;
    let synchronizer = Synchronizer::from_config(&config)?;
    let requirements = Requirements::from_config(&config);

    let credential = PemFileIssuer::new(key, chain).issue(&IssueRequest::from_config(&config))?;

    validation::validate_chain(&credential.chain).context("Imported chain is malformed")?;
    if force {
        if let Err(e) = validation::validate_credential_now(&credential, &requirements) {
            warn!(error = %e, "Importing a credential that is not valid");
        }
    } else {
        validation::validate_credential_now(&credential, &requirements)
            .context("Imported credential is not valid, use --force to import anyway")?;
    }

    synchronizer.set(&credential)?;

    let stored = synchronizer.get()?;
    match validation::validate_credential_now(&stored, &requirements) {
        Ok(()) => info!(
            bundles = synchronizer.bundles().len(),
            "Imported credential"
        ),
        Err(e) => warn!(error = %e, "Imported credential is stored but not valid"),
    }

    Ok(exit::OK)
}

fn test_config(path: &Path) -> Result<u8> {
    let config = load_config(path)?;

    info!("Configuration test successful:");
    info!("  - {} domain(s)", config.domains.len());
    info!("  - {} save format(s)", config.save_formats.len());
    for format in &config.save_formats {
        let slots: Vec<String> = format.configured_slots().map(|s| s.to_string()).collect();
        info!("  - '{}': {}", format.name, slots.join(", "));
    }

    println!(
        "certsync: configuration file {} test is successful",
        path.display()
    );

    Ok(exit::OK)
}
