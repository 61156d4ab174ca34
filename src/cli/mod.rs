use std::fmt::Write as _;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::application::{
    AppError, BroadcastNotifier, WalletData, WalletEvent, WalletInfo, WalletService,
};
use crate::config::{parse_bounds, parse_notifier, Config, NotifierKind};
use crate::domain::{Amount, BoundPolicy, Limit, TierId, WalletId};
use crate::logging;

/// Events buffered for echoing; one command publishes at most one.
const EVENT_CAPACITY: usize = 16;

/// Balance - tier-limited wallets with holds
#[derive(Parser)]
#[command(name = "balance")]
#[command(about = "Create wallets, hold and release funds, apply debits and deposits")]
#[command(version)]
pub struct Cli {
    /// Database file path (overrides DATABASE_PATH)
    #[arg(short, long)]
    pub database: Option<String>,

    /// Tier bound semantics: exclusive, upper-inclusive, inclusive (overrides BALANCE_BOUNDS)
    #[arg(long, value_parser = parse_bounds_arg)]
    pub bounds: Option<BoundPolicy>,

    /// Event sink: log, broadcast (overrides NOTIFIER). Broadcast events are echoed to stdout
    #[arg(long, value_parser = parse_notifier_arg)]
    pub notifier: Option<NotifierKind>,

    /// Print wallets and errors as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new database with the default identification levels
    Init,

    /// Create a wallet
    Create {
        /// Initial balance
        #[arg(value_parser = clap::value_parser!(i64).range(1..))]
        balance: Amount,

        /// Identification level (1 = anonymous, 2 = simplified, 3 = full)
        #[arg(short, long, default_value = "1", value_parser = clap::value_parser!(i64).range(1..))]
        tier: TierId,
    },

    /// Hold funds on a wallet
    Hold {
        /// Wallet ID
        #[arg(value_parser = clap::value_parser!(i64).range(1..))]
        id: WalletId,

        /// Amount to hold
        #[arg(value_parser = clap::value_parser!(i64).range(1..))]
        amount: Amount,
    },

    /// Release held funds
    #[command(alias = "dishold")]
    Release {
        /// Wallet ID
        #[arg(value_parser = clap::value_parser!(i64).range(1..))]
        id: WalletId,

        /// Amount to release
        #[arg(value_parser = clap::value_parser!(i64).range(1..))]
        amount: Amount,
    },

    /// Apply a debit or deposit
    #[command(alias = "edit")]
    Apply {
        /// Wallet ID
        #[arg(value_parser = clap::value_parser!(i64).range(1..))]
        id: WalletId,

        /// Amount to debit or deposit
        #[arg(value_parser = clap::value_parser!(i64).range(1..))]
        amount: Amount,

        /// Transaction kind (1 = debit, 2 = deposit)
        #[arg(short, long, value_parser = clap::value_parser!(i64).range(1..))]
        kind: i64,
    },

    /// Show a wallet
    Get {
        /// Wallet ID
        #[arg(value_parser = clap::value_parser!(i64).range(1..))]
        id: WalletId,
    },

    /// List identification levels and their balance limits
    Limits,
}

fn parse_bounds_arg(raw: &str) -> std::result::Result<BoundPolicy, String> {
    parse_bounds("--bounds", raw).map_err(|e| e.to_string())
}

fn parse_notifier_arg(raw: &str) -> std::result::Result<NotifierKind, String> {
    parse_notifier("--notifier", raw).map_err(|e| e.to_string())
}

impl Cli {
    /// Run the command. Request failures are printed and turned into a
    /// failing exit code; only configuration and output errors are returned.
    pub async fn run(self) -> Result<ExitCode> {
        logging::init(self.verbose);

        let config = Config::from_env()
            .context("Invalid configuration")?
            .with_database_path(self.database)
            .with_bounds(self.bounds)
            .with_notifier(self.notifier);

        tracing::debug!(
            app = %config.app_name,
            database = %config.database_path,
            bounds = %config.bounds,
            notifier = %config.notifier,
            "configuration loaded"
        );

        let broadcast = match config.notifier {
            NotifierKind::Broadcast => Some(BroadcastNotifier::new(EVENT_CAPACITY)),
            NotifierKind::Log => None,
        };
        let mut events = broadcast.as_ref().map(BroadcastNotifier::subscribe);

        let printer = Printer { json: self.json };
        let outcome = execute(self.command, &config, broadcast).await;

        match outcome {
            Ok(outcome) => {
                println!("{}", printer.outcome(&outcome)?);
                if let Some(events) = events.as_mut() {
                    while let Ok(event) = events.try_recv() {
                        println!("{}", printer.event(&event)?);
                    }
                }
                Ok(ExitCode::SUCCESS)
            }
            Err(err) => {
                if !err.is_client_error() {
                    tracing::error!(error = ?err, "request failed");
                }
                let rendered = printer.failure(&err)?;
                if self.json {
                    println!("{}", rendered);
                } else {
                    eprintln!("{}", rendered);
                }
                Ok(ExitCode::FAILURE)
            }
        }
    }
}

/// What a successful command produced.
enum Outcome {
    Initialized(String),
    Wallet { heading: String, info: WalletInfo },
    Limits { limits: Vec<Limit>, policy: BoundPolicy },
}

async fn execute(
    command: Commands,
    config: &Config,
    broadcast: Option<BroadcastNotifier>,
) -> std::result::Result<Outcome, AppError> {
    let mut service = match command {
        Commands::Init => WalletService::init(&config.database_path).await?,
        _ => WalletService::connect(&config.database_path).await?,
    }
    .with_policy(config.bounds);

    if let Some(notifier) = broadcast {
        service = service.with_notifier(Arc::new(notifier));
    }

    let outcome = match command {
        Commands::Init => Outcome::Initialized(config.database_path.clone()),

        Commands::Create { balance, tier } => {
            let info = service.create_wallet(balance, tier).await?;
            Outcome::Wallet {
                heading: format!("Created wallet {}", info.wallet.id),
                info,
            }
        }

        Commands::Hold { id, amount } => Outcome::Wallet {
            heading: format!("Held {} on wallet {}", amount, id),
            info: service.hold(id, amount).await?,
        },

        Commands::Release { id, amount } => Outcome::Wallet {
            heading: format!("Released {} on wallet {}", amount, id),
            info: service.release_hold(id, amount).await?,
        },

        Commands::Apply { id, amount, kind } => {
            let result = service.apply_transaction(id, kind, amount).await?;
            Outcome::Wallet {
                heading: format!("Applied {} of {} to wallet {}", result.kind, amount, id),
                info: result.info,
            }
        }

        Commands::Get { id } => Outcome::Wallet {
            heading: format!("Wallet {}", id),
            info: service.get_wallet(id).await?,
        },

        Commands::Limits => Outcome::Limits {
            limits: service.list_limits().await?,
            policy: service.policy(),
        },
    };

    Ok(outcome)
}

struct Printer {
    json: bool,
}

impl Printer {
    fn outcome(&self, outcome: &Outcome) -> Result<String> {
        match outcome {
            Outcome::Initialized(path) => {
                if self.json {
                    Ok(serde_json::to_string_pretty(&serde_json::json!({ "initialized": path }))?)
                } else {
                    Ok(format!("Database initialized: {}", path))
                }
            }
            Outcome::Wallet { heading, info } => self.wallet(heading, info),
            Outcome::Limits { limits, policy } => self.limits(limits, *policy),
        }
    }

    fn wallet(&self, heading: &str, info: &WalletInfo) -> Result<String> {
        if self.json {
            let data = WalletData::new(&info.wallet, &info.limit);
            return Ok(serde_json::to_string_pretty(&data)?);
        }

        let wallet = &info.wallet;
        let mut out = String::new();
        writeln!(out, "{}", heading)?;
        writeln!(out, "  Balance:        {}", wallet.balance())?;
        writeln!(out, "  Held:           {}", wallet.hold_amount())?;
        writeln!(out, "  Available:      {}", wallet.available())?;
        writeln!(
            out,
            "  Identification: {} ({})",
            info.limit.name, wallet.identification_level
        )?;
        writeln!(
            out,
            "  Created:        {}",
            wallet.created_at.format("%Y-%m-%d %H:%M:%S")
        )?;
        write!(
            out,
            "  Updated:        {}",
            wallet.updated_at.format("%Y-%m-%d %H:%M:%S")
        )?;
        Ok(out)
    }

    fn limits(&self, limits: &[Limit], policy: BoundPolicy) -> Result<String> {
        if self.json {
            return Ok(serde_json::to_string_pretty(limits)?);
        }
        if limits.is_empty() {
            return Ok("No identification levels found.".to_string());
        }

        let mut out = String::new();
        writeln!(out, "{:<4} {:<12} {}", "ID", "LEVEL", "PERMITTED BALANCE")?;
        write!(out, "{}", "-".repeat(48))?;
        for limit in limits {
            write!(
                out,
                "\n{:<4} {:<12} {}",
                limit.id,
                limit.name,
                policy.describe(limit.balance_min, limit.balance_max)
            )?;
        }
        Ok(out)
    }

    fn event(&self, event: &WalletEvent) -> Result<String> {
        if self.json {
            Ok(serde_json::to_string(event)?)
        } else {
            Ok(format!(
                "Event {} on wallet {} ({})",
                event.kind, event.wallet.wallet_id, event.id
            ))
        }
    }

    /// Only the sanitised message reaches the user; store details stay in the log.
    fn failure(&self, err: &AppError) -> Result<String> {
        if self.json {
            Ok(serde_json::to_string_pretty(
                &serde_json::json!({ "error": err.body() }),
            )?)
        } else {
            Ok(format!("Error: {}", err.client_message()))
        }
    }
}
