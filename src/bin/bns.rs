//! BNS transaction CLI
//!
//! Estimate, build and broadcast name-registration transactions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use console::{style, Term};

use bns_tx::btc::tx_builder::decode_tx_hex;
use bns_tx::network::{NetworkConfig, NetworkProvider};
use bns_tx::operations::{parse_payload, safety, NamespaceDefinition, TransactionFactory};
use bns_tx::utils::crypto::PaymentKey;

/// BNS transaction CLI - build and broadcast name operations on Bitcoin
#[derive(Parser)]
#[command(name = "bns-tx")]
#[command(version = bns_tx::VERSION)]
#[command(about = "Estimate, build and broadcast BNS transactions", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to a JSON configuration file; environment variables are used when absent
    #[arg(short, long, env = "BNS_CONFIG")]
    config: Option<PathBuf>,

    /// Broadcast built transactions instead of printing them
    #[arg(short, long, global = true)]
    broadcast: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the default configuration to a file
    Init {
        /// Destination file
        path: PathBuf,
    },

    /// Show the current fee rate
    FeeRate,

    /// List spendable outputs of an address
    Utxos {
        /// Bitcoin address
        address: String,
    },

    /// Show the registry record of a name
    NameInfo {
        /// Fully qualified name
        name: String,
    },

    /// Run pre-flight checks for registering a name
    Check {
        /// Fully qualified name
        name: String,
        /// Address the name would be registered to
        #[arg(long)]
        owner: Option<String>,
    },

    /// Estimate the cost of an operation, in satoshis
    #[command(subcommand)]
    Estimate(EstimateCommands),

    /// Build and sign an operation
    #[command(subcommand)]
    Make(MakeCommands),

    /// Send bitcoin, fees included in the amount
    Spend {
        /// Destination address
        destination: String,
        /// Amount in satoshis
        amount: u64,
        #[command(flatten)]
        payer: PayerKey,
    },

    /// Broadcast a raw transaction
    Broadcast {
        /// Raw transaction hex
        raw_hex: String,
        /// Transaction the relay should wait on before broadcasting
        #[arg(long)]
        watch: Option<String>,
        /// Confirmations to wait for on the watched transaction
        #[arg(long)]
        confirmations: Option<u32>,
    },

    /// Broadcast a zone file
    BroadcastZoneFile {
        /// Path to the zone file
        path: PathBuf,
        /// Transaction the relay should wait on before broadcasting
        #[arg(long)]
        watch: Option<String>,
    },

    /// Decode the operation carried by a raw transaction
    Decode {
        /// Raw transaction hex
        raw_hex: String,
    },
}

#[derive(Args)]
struct PayerKey {
    /// Hex private key paying for the transaction
    #[arg(long, env = "BNS_PAYMENT_KEY", hide_env_values = true)]
    payment_key: String,
}

#[derive(Args)]
struct OwnerKey {
    /// Hex private key owning the name
    #[arg(long, env = "BNS_OWNER_KEY", hide_env_values = true)]
    owner_key: String,
}

#[derive(Subcommand)]
enum EstimateCommands {
    /// Name preorder
    Preorder {
        name: String,
        destination: String,
        payment_address: String,
        #[arg(long, default_value_t = 1)]
        utxos: usize,
    },
    /// Name registration
    Register {
        name: String,
        destination: String,
        payment_address: String,
        #[arg(long)]
        with_zonefile: bool,
        #[arg(long, default_value_t = 1)]
        utxos: usize,
    },
    /// Zone file update
    Update {
        name: String,
        owner_address: String,
        payment_address: String,
        #[arg(long, default_value_t = 1)]
        utxos: usize,
    },
    /// Name transfer
    Transfer {
        name: String,
        destination: String,
        owner_address: String,
        payment_address: String,
        #[arg(long, default_value_t = 1)]
        utxos: usize,
    },
    /// Name revocation
    Revoke {
        name: String,
        owner_address: String,
        payment_address: String,
        #[arg(long, default_value_t = 1)]
        utxos: usize,
    },
    /// Name renewal
    Renewal {
        name: String,
        destination: String,
        owner_address: String,
        payment_address: String,
        #[arg(long)]
        with_zonefile: bool,
        #[arg(long, default_value_t = 1)]
        utxos: usize,
    },
    /// Namespace preorder
    NamespacePreorder {
        namespace_id: String,
        reveal_address: String,
        payment_address: String,
        #[arg(long, default_value_t = 1)]
        utxos: usize,
    },
    /// Namespace launch
    NamespaceReady {
        namespace_id: String,
        #[arg(long, default_value_t = 1)]
        utxos: usize,
    },
    /// Announcement
    Announce {
        message_hash: String,
        #[arg(long, default_value_t = 1)]
        utxos: usize,
    },
}

#[derive(Subcommand)]
enum MakeCommands {
    /// Name preorder
    Preorder {
        name: String,
        destination: String,
        #[command(flatten)]
        payer: PayerKey,
    },
    /// Name registration
    Register {
        name: String,
        destination: String,
        /// Zone file committed to by the registration
        #[arg(long)]
        zonefile: Option<PathBuf>,
        #[command(flatten)]
        payer: PayerKey,
    },
    /// Zone file update
    Update {
        name: String,
        /// New zone file
        zonefile: PathBuf,
        #[command(flatten)]
        owner: OwnerKey,
        #[command(flatten)]
        payer: PayerKey,
    },
    /// Name transfer
    Transfer {
        name: String,
        destination: String,
        /// Keep the current zone file
        #[arg(long)]
        keep_zonefile: bool,
        #[command(flatten)]
        owner: OwnerKey,
        #[command(flatten)]
        payer: PayerKey,
    },
    /// Name revocation
    Revoke {
        name: String,
        #[command(flatten)]
        owner: OwnerKey,
        #[command(flatten)]
        payer: PayerKey,
    },
    /// Name renewal
    Renewal {
        name: String,
        destination: String,
        #[arg(long)]
        zonefile: Option<PathBuf>,
        #[command(flatten)]
        owner: OwnerKey,
        #[command(flatten)]
        payer: PayerKey,
    },
    /// Namespace preorder
    NamespacePreorder {
        namespace_id: String,
        reveal_address: String,
        #[command(flatten)]
        payer: PayerKey,
    },
    /// Namespace reveal from a JSON definition file
    NamespaceReveal {
        definition: PathBuf,
        reveal_address: String,
        #[command(flatten)]
        payer: PayerKey,
    },
    /// Namespace launch, paid by the reveal key
    NamespaceReady {
        namespace_id: String,
        #[command(flatten)]
        payer: PayerKey,
    },
    /// Name import, paid by the import key
    NameImport {
        name: String,
        recipient: String,
        zonefile_hash: String,
        #[command(flatten)]
        payer: PayerKey,
    },
    /// Announcement
    Announce {
        message_hash: String,
        #[command(flatten)]
        payer: PayerKey,
    },
}

// ═══════════════════════════════════════════════════════════════════════════════
// MAIN
// ═══════════════════════════════════════════════════════════════════════════════

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let term = Term::stdout();

    if let Err(e) = run_command(&cli, &term).await {
        eprintln!("{} {}", style("Error:").red().bold(), e);
        std::process::exit(1);
    }
}

async fn run_command(cli: &Cli, term: &Term) -> anyhow::Result<()> {
    if let Commands::Init { path } = &cli.command {
        return cmd_init(path, term);
    }

    let provider = NetworkProvider::new(load_config(cli)?)?;
    match &cli.command {
        Commands::Init { .. } => Ok(()),
        Commands::FeeRate => {
            let rate = provider.get_fee_rate().await?;
            term.write_line(&format!("{} {} sat/byte", style("→").cyan(), rate.sat_per_byte()))?;
            Ok(())
        }
        Commands::Utxos { address } => cmd_utxos(&provider, address, term).await,
        Commands::NameInfo { name } => {
            let info = provider.get_name_info(name).await?;
            term.write_line(&serde_json::to_string_pretty(&info)?)?;
            Ok(())
        }
        Commands::Check { name, owner } => cmd_check(&provider, name, owner.as_deref(), term).await,
        Commands::Estimate(cmd) => cmd_estimate(&provider, cmd, term).await,
        Commands::Make(cmd) => {
            let raw = cmd_make(&provider, cmd).await?;
            emit(cli, &provider, &raw, term).await
        }
        Commands::Spend {
            destination,
            amount,
            payer,
        } => {
            let key = PaymentKey::from_hex(&payer.payment_key, provider.network())?;
            let raw = TransactionFactory::new(&provider)
                .make_bitcoin_spend(destination, &key, *amount)
                .await?;
            emit(cli, &provider, &raw, term).await
        }
        Commands::Broadcast {
            raw_hex,
            watch,
            confirmations,
        } => {
            let ack = provider
                .broadcaster()
                .broadcast_transaction(raw_hex, watch.as_deref(), *confirmations)
                .await?;
            term.write_line(&format!("{} Broadcast accepted: {}", style("✓").green(), ack.body))?;
            Ok(())
        }
        Commands::BroadcastZoneFile { path, watch } => {
            let zone_file = std::fs::read_to_string(path)?;
            let ack = provider
                .broadcaster()
                .broadcast_zone_file(&zone_file, watch.as_deref())
                .await?;
            term.write_line(&format!("{} Zone file accepted: {}", style("✓").green(), ack.body))?;
            Ok(())
        }
        Commands::Decode { raw_hex } => cmd_decode(raw_hex, term),
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// COMMAND HANDLERS
// ═══════════════════════════════════════════════════════════════════════════════

fn cmd_init(path: &PathBuf, term: &Term) -> anyhow::Result<()> {
    if path.exists() {
        anyhow::bail!("Configuration already exists: {}", path.display());
    }

    NetworkConfig::default().save(path)?;
    term.write_line(&format!(
        "{} Configuration written to: {}",
        style("✓").green(),
        path.display()
    ))?;
    Ok(())
}

async fn cmd_utxos(provider: &NetworkProvider, address: &str, term: &Term) -> anyhow::Result<()> {
    let utxos = provider.get_utxos(address).await?;
    if utxos.is_empty() {
        term.write_line(&format!("{} No UTXOs for {}", style("ℹ").blue(), address))?;
        return Ok(());
    }

    for utxo in &utxos {
        term.write_line(&format!(
            "  {}:{}  {} sat  ({} conf)",
            utxo.txid,
            utxo.vout,
            style(utxo.value).green(),
            utxo.confirmations
        ))?;
    }
    term.write_line(&format!(
        "{} Total: {} sat",
        style("→").cyan(),
        bns_tx::btc::utxo::total_value(&utxos)
    ))?;
    Ok(())
}

async fn cmd_check(provider: &NetworkProvider, name: &str, owner: Option<&str>, term: &Term) -> anyhow::Result<()> {
    let mark = |ok: bool| if ok { style("✓").green() } else { style("✗").red() };

    let valid = safety::is_name_valid(name);
    term.write_line(&format!("{} name is well formed", mark(valid)))?;
    if !valid {
        return Ok(());
    }

    let available = safety::is_name_available(provider, name).await?;
    term.write_line(&format!("{} name is available", mark(available)))?;

    let in_grace = safety::is_in_grace_period(provider, name).await?;
    term.write_line(&format!("{} name is outside its grace period", mark(!in_grace)))?;

    if let Some(owner) = owner {
        let can_receive = safety::address_can_receive_name(provider, owner).await?;
        term.write_line(&format!("{} {} can receive another name", mark(can_receive), owner))?;
    }
    Ok(())
}

async fn cmd_estimate(provider: &NetworkProvider, cmd: &EstimateCommands, term: &Term) -> anyhow::Result<()> {
    let factory = TransactionFactory::new(provider);
    let cost = match cmd {
        EstimateCommands::Preorder {
            name,
            destination,
            payment_address,
            utxos,
        } => factory.estimate_preorder(name, destination, payment_address, *utxos).await?,
        EstimateCommands::Register {
            name,
            destination,
            payment_address,
            with_zonefile,
            utxos,
        } => {
            factory
                .estimate_register(name, destination, payment_address, *with_zonefile, *utxos)
                .await?
        }
        EstimateCommands::Update {
            name,
            owner_address,
            payment_address,
            utxos,
        } => factory.estimate_update(name, owner_address, payment_address, *utxos).await?,
        EstimateCommands::Transfer {
            name,
            destination,
            owner_address,
            payment_address,
            utxos,
        } => {
            factory
                .estimate_transfer(name, destination, owner_address, payment_address, *utxos)
                .await?
        }
        EstimateCommands::Revoke {
            name,
            owner_address,
            payment_address,
            utxos,
        } => factory.estimate_revoke(name, owner_address, payment_address, *utxos).await?,
        EstimateCommands::Renewal {
            name,
            destination,
            owner_address,
            payment_address,
            with_zonefile,
            utxos,
        } => {
            factory
                .estimate_renewal(name, destination, owner_address, payment_address, *with_zonefile, *utxos)
                .await?
        }
        EstimateCommands::NamespacePreorder {
            namespace_id,
            reveal_address,
            payment_address,
            utxos,
        } => {
            factory
                .estimate_namespace_preorder(namespace_id, reveal_address, payment_address, *utxos)
                .await?
        }
        EstimateCommands::NamespaceReady { namespace_id, utxos } => {
            factory.estimate_namespace_ready(namespace_id, *utxos).await?
        }
        EstimateCommands::Announce { message_hash, utxos } => {
            factory.estimate_announce(message_hash, *utxos).await?
        }
    };

    term.write_line(&format!("{} Estimated cost: {} sat", style("→").cyan(), style(cost).yellow()))?;
    Ok(())
}

async fn cmd_make(provider: &NetworkProvider, cmd: &MakeCommands) -> anyhow::Result<String> {
    let factory = TransactionFactory::new(provider);
    let network = provider.network();
    let key = |sk_hex: &str| PaymentKey::from_hex(sk_hex, network);

    let raw = match cmd {
        MakeCommands::Preorder { name, destination, payer } => {
            factory.make_preorder(name, destination, &key(&payer.payment_key)?).await?
        }
        MakeCommands::Register {
            name,
            destination,
            zonefile,
            payer,
        } => {
            let zonefile = read_optional(zonefile.as_ref())?;
            factory
                .make_register(name, destination, &key(&payer.payment_key)?, zonefile.as_deref(), None)
                .await?
        }
        MakeCommands::Update {
            name,
            zonefile,
            owner,
            payer,
        } => {
            let zonefile = std::fs::read_to_string(zonefile)?;
            factory
                .make_update(
                    name,
                    &key(&owner.owner_key)?,
                    &key(&payer.payment_key)?,
                    Some(&zonefile),
                    None,
                )
                .await?
        }
        MakeCommands::Transfer {
            name,
            destination,
            keep_zonefile,
            owner,
            payer,
        } => {
            factory
                .make_transfer(
                    name,
                    destination,
                    &key(&owner.owner_key)?,
                    &key(&payer.payment_key)?,
                    *keep_zonefile,
                )
                .await?
        }
        MakeCommands::Revoke { name, owner, payer } => {
            factory
                .make_revoke(name, &key(&owner.owner_key)?, &key(&payer.payment_key)?)
                .await?
        }
        MakeCommands::Renewal {
            name,
            destination,
            zonefile,
            owner,
            payer,
        } => {
            let zonefile = read_optional(zonefile.as_ref())?;
            factory
                .make_renewal(
                    name,
                    destination,
                    &key(&owner.owner_key)?,
                    &key(&payer.payment_key)?,
                    zonefile.as_deref(),
                    None,
                )
                .await?
        }
        MakeCommands::NamespacePreorder {
            namespace_id,
            reveal_address,
            payer,
        } => {
            factory
                .make_namespace_preorder(namespace_id, reveal_address, &key(&payer.payment_key)?)
                .await?
        }
        MakeCommands::NamespaceReveal {
            definition,
            reveal_address,
            payer,
        } => {
            let definition: NamespaceDefinition = serde_json::from_str(&std::fs::read_to_string(definition)?)?;
            factory
                .make_namespace_reveal(&definition, reveal_address, &key(&payer.payment_key)?)
                .await?
        }
        MakeCommands::NamespaceReady { namespace_id, payer } => {
            factory
                .make_namespace_ready(namespace_id, &key(&payer.payment_key)?)
                .await?
        }
        MakeCommands::NameImport {
            name,
            recipient,
            zonefile_hash,
            payer,
        } => {
            factory
                .make_name_import(name, recipient, zonefile_hash, &key(&payer.payment_key)?)
                .await?
        }
        MakeCommands::Announce { message_hash, payer } => {
            factory.make_announce(message_hash, &key(&payer.payment_key)?).await?
        }
    };

    Ok(raw)
}

fn cmd_decode(raw_hex: &str, term: &Term) -> anyhow::Result<()> {
    let tx = decode_tx_hex(raw_hex)?;
    term.write_line(&format!("{} txid {}", style("→").cyan(), tx.compute_txid()))?;

    match tx.output.first().and_then(|out| parse_payload(&out.script_pubkey)) {
        Some(payload) => {
            term.write_line(&format!("  Operation: {}", style(payload.op).yellow()))?;
            term.write_line(&format!("  Body: {}", hex::encode(&payload.body)))?;
        }
        None => {
            term.write_line(&format!("{} No protocol payload in output 0", style("ℹ").blue()))?;
        }
    }

    for (index, out) in tx.output.iter().enumerate() {
        term.write_line(&format!("  [{}] {} sat  {}", index, out.value.to_sat(), out.script_pubkey))?;
    }
    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════════════
// HELPERS
// ═══════════════════════════════════════════════════════════════════════════════

fn load_config(cli: &Cli) -> anyhow::Result<NetworkConfig> {
    let config = match &cli.config {
        Some(path) => NetworkConfig::load(path)?,
        None => NetworkConfig::from_env()?,
    };
    Ok(config)
}

fn read_optional(path: Option<&PathBuf>) -> anyhow::Result<Option<String>> {
    Ok(path.map(std::fs::read_to_string).transpose()?)
}

async fn emit(cli: &Cli, provider: &NetworkProvider, raw: &str, term: &Term) -> anyhow::Result<()> {
    if !cli.broadcast {
        term.write_line(raw)?;
        return Ok(());
    }

    provider.broadcast_transaction(raw).await?;
    let txid = provider.modify_utxo_set_from(raw)?;
    term.write_line(&format!("{} Broadcast {}", style("✓").green(), style(txid).yellow()))?;
    Ok(())
}
