mod catalog_cmd;
mod compare_cmd;
mod config_cmd;
mod context;
mod diff_cmd;
mod scan_cmd;
mod terminal_output;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use policyforge_config::{load_config, prepare, resolve_config_path, PolicyforgeConfig};
use policyforge_logging::{init_logger, LogSettings};
use tracing::debug;

use catalog_cmd::CatalogArgs;
use compare_cmd::CompareArgs;
use config_cmd::ConfigCommands;
use diff_cmd::DiffArgs;
use scan_cmd::ScanArgs;
use terminal_output::note_error;

#[derive(Parser)]
#[command(name = "policyforge")]
#[command(about = "Least-privilege IAM policies from infrastructure-as-code")]
#[command(version)]
struct Cli {
    /// Config file (default: $POLICYFORGE_CONFIG_DIR/config.yaml or ~/.policyforge/config.yaml)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level or env-filter directive; RUST_LOG takes precedence
    #[arg(long, global = true, value_name = "LEVEL")]
    log_level: Option<String>,

    /// Log JSON lines to stderr
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Synthesize the policies a Terraform codebase needs
    Scan(ScanArgs),
    /// Compare the AWS policy a codebase needs with a deployed policy
    Compare(CompareArgs),
    /// Structurally compare two policy documents
    Diff(DiffArgs),
    /// Inspect the rule catalog
    Catalog(CatalogArgs),
    /// Manage the config file
    #[command(subcommand)]
    Config(ConfigCommands),
}

fn log_settings(cli: &Cli, config: &PolicyforgeConfig) -> LogSettings {
    let logging = config.logging.clone().unwrap_or_default();
    let defaults = LogSettings::default();
    LogSettings {
        level: cli.log_level.clone().or(logging.level).unwrap_or(defaults.level),
        json: cli.log_json || logging.json.unwrap_or(false),
        dir: logging.dir,
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let config_path = resolve_config_path(cli.config.as_deref());
    let raw = load_config(&config_path).await?;
    init_logger(&log_settings(&cli, &raw))?;
    let config = prepare(raw);
    debug!(path = %config_path.display(), "Using config");

    match cli.command {
        Commands::Scan(args) => scan_cmd::run(args, &config).await,
        Commands::Compare(args) => compare_cmd::run(args, &config).await,
        Commands::Diff(args) => diff_cmd::run(args).await,
        Commands::Catalog(args) => catalog_cmd::run(args, &config).await,
        Commands::Config(cmd) => config_cmd::run(cmd, &config_path, &config).await,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            note_error(&format!("{err:#}"));
            ExitCode::from(2)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use policyforge_config::LoggingConfig;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_scan_flags() {
        let cli = Cli::try_parse_from([
            "policyforge",
            "scan",
            "infra",
            "--output",
            "tf",
            "--resource",
            "arn:aws:s3:::a",
            "--resource",
            "arn:aws:s3:::b",
            "-e",
            "vendor",
            "--log-level",
            "debug",
        ])
        .unwrap();
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        let Commands::Scan(args) = cli.command else {
            panic!("expected scan");
        };
        assert_eq!(args.path, Some(PathBuf::from("infra")));
        assert_eq!(args.output, Some(policyforge_engine::RenderFormat::Terraform));
        assert_eq!(args.resources, vec!["arn:aws:s3:::a", "arn:aws:s3:::b"]);
        assert_eq!(args.excludes, vec!["vendor"]);
    }

    #[test]
    fn scan_needs_a_path_or_records() {
        assert!(Cli::try_parse_from(["policyforge", "scan"]).is_err());
        assert!(Cli::try_parse_from(["policyforge", "scan", "--records", "r.json"]).is_ok());
        assert!(Cli::try_parse_from(["policyforge", "scan", "-o", "yaml", "."]).is_err());
    }

    #[test]
    fn compare_requires_live() {
        assert!(Cli::try_parse_from(["policyforge", "compare", "."]).is_err());
        assert!(Cli::try_parse_from(["policyforge", "compare", ".", "--live", "p.json"]).is_ok());
    }

    #[test]
    fn flags_override_logging_config() {
        let cli = Cli::try_parse_from(["policyforge", "--log-json", "config", "show"]).unwrap();
        let config = PolicyforgeConfig {
            logging: Some(LoggingConfig {
                level: Some("warn".into()),
                dir: Some(PathBuf::from("/var/log/policyforge")),
                json: None,
            }),
            ..Default::default()
        };
        let settings = log_settings(&cli, &config);
        assert_eq!(settings.level, "warn");
        assert!(settings.json);
        assert_eq!(settings.dir, Some(PathBuf::from("/var/log/policyforge")));
    }
}
