use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use stacksend::config::{Config, Network};
use stacksend::recipients::parse_recipients;
use stacksend::transfer::{build_transfer_request, STX_DECIMALS};
use stacksend::user_settings::{SettingsUpdate, UserSettings};
use stacksend::utils;
use stacksend::{TransferAmount, TransferMode};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "stacksend", version, about = "Batch STX and SIP-010 airdrops")]
struct Cli {
    /// Network to use instead of the one in settings
    #[arg(long, global = true)]
    network: Option<Network>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Parse a recipient file (one address per line) and report whether it forms a valid batch
    Check { recipients: PathBuf },
    /// Build the multi-send contract call for a batch and print it as JSON
    Preview {
        /// stx or token (defaults to the mode in settings)
        #[arg(long)]
        mode: Option<TransferMode>,
        /// Amount per recipient: STX for native batches, base units for tokens
        #[arg(long)]
        amount: TransferAmount,
        #[arg(long)]
        recipients: PathBuf,
        /// Token contract as <issuer>.<name>
        #[arg(long)]
        token: Option<String>,
    },
    /// Show persisted settings, updating any field given
    Settings(SettingsArgs),
}

#[derive(Args)]
struct SettingsArgs {
    /// Network used when neither --network nor STACKSEND_NETWORK is set
    #[arg(long)]
    default_network: Option<Network>,
    /// Mode used when preview is run without --mode
    #[arg(long)]
    default_mode: Option<TransferMode>,
    #[arg(long)]
    min_recipients: Option<usize>,
    #[arg(long)]
    max_recipients: Option<usize>,
    /// Self-deployed STX multi-send contract (empty string clears it)
    #[arg(long)]
    stx_contract: Option<String>,
    /// Self-deployed token multi-send contract (empty string clears it)
    #[arg(long)]
    token_contract: Option<String>,
}

fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = UserSettings::load();

    match cli.command {
        Command::Settings(args) => update_settings(settings, args),
        Command::Check { recipients } => check(&load_config(&settings, cli.network)?, &recipients),
        Command::Preview {
            mode,
            amount,
            recipients,
            token,
        } => preview(
            &load_config(&settings, cli.network)?,
            mode.unwrap_or(settings.default_mode),
            &amount,
            &recipients,
            token.as_deref(),
        ),
    }
}

fn load_config(settings: &UserSettings, network: Option<Network>) -> Result<Config> {
    let config = Config::load(settings, network)?;
    info!("Using {} ({})", config.network_label(), config.network);
    Ok(config)
}

fn read_recipients(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read recipients from {}", path.display()))
}

fn check(config: &Config, path: &Path) -> Result<()> {
    let list = parse_recipients(&read_recipients(path)?, config.address_prefix());
    let policy = &config.recipient_policy;

    println!("Recipients: {} / {}", list.len(), policy.max);
    let duplicates = list.duplicates();
    if !duplicates.is_empty() {
        println!("Listed more than once (each entry is paid):");
        for addr in duplicates {
            println!("  {}", addr);
        }
    }

    list.check_count(policy)?;
    println!("Valid batch");
    Ok(())
}

fn preview(
    config: &Config,
    mode: TransferMode,
    amount: &TransferAmount,
    path: &Path,
    token: Option<&str>,
) -> Result<()> {
    let list = parse_recipients(&read_recipients(path)?, config.address_prefix());
    list.check_count(&config.recipient_policy)?;

    let contracts = config.multi_send_contracts()?;
    let request = build_transfer_request(mode, list.addresses(), amount, token, &contracts, config.network)?;

    if mode == TransferMode::Native {
        let per_recipient = amount.scaled(STX_DECIMALS)?;
        let total = per_recipient
            .checked_mul(list.len() as u128)
            .ok_or_else(|| anyhow!("Total amount overflows"))?;
        info!(
            "{}: {} {} to each of {} recipients ({} {} total)",
            mode.display_name(),
            utils::format_micro_stx(per_recipient),
            mode.unit_label(),
            list.len(),
            utils::format_micro_stx(total),
            mode.unit_label()
        );
    } else {
        info!(
            "{}: {} {} to each of {} recipients",
            mode.display_name(),
            amount,
            mode.unit_label(),
            list.len()
        );
    }

    println!("{}", serde_json::to_string_pretty(&request.descriptor())?);
    Ok(())
}

fn update_settings(mut settings: UserSettings, args: SettingsArgs) -> Result<()> {
    let changed = settings.apply(SettingsUpdate {
        selected_network: args.default_network,
        default_mode: args.default_mode,
        min_recipients: args.min_recipients,
        max_recipients: args.max_recipients,
        stx_contract: args.stx_contract,
        token_contract: args.token_contract,
    });

    // Refuse to persist anything the next run could not load
    let config = Config::from_settings(&settings)?;
    if changed {
        settings.save()?;
    }

    println!("Settings file: {}", UserSettings::settings_path_display());
    println!("Default network: {} ({})", config.network_label(), config.network);
    println!("{}", serde_json::to_string_pretty(&settings)?);
    Ok(())
}
