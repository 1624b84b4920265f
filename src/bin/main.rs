// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Daniel Negri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.


use clap::Parser;
use csv::{Position, ReaderBuilder, Trim, Writer};
use payment_splitter::{
    AccountId, Amount, Asset, Posture, RoleGate, Shares, Splitter, SplitterConfig, SplitterError,
    Vault,
};
use serde::Deserialize;
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

type ReplaySplitter = Splitter<RoleGate, Arc<Vault>>;

/// Payment Splitter - Replay ledger operations from a CSV file
///
/// Applies deposits, payee changes and releases to an in-memory splitter and
/// writes per-payee statements for every tracked asset to stdout.
#[derive(Parser, Debug)]
#[command(name = "payment-splitter")]
#[command(about = "Replays payment splitter operations from a CSV file", long_about = None)]
struct Args {
    /// Path to CSV file with operations
    ///
    /// Expected format: type,caller,asset,payee,shares,amount,num,den
    /// Example: cargo run -- operations.csv > statements.csv
    #[arg(value_name = "FILE")]
    input: PathBuf,

    /// Account holding the distributed funds
    #[arg(long, default_value = SplitterConfig::DEFAULT_HOLDER)]
    holder: String,

    /// Account granted the administrator role (repeatable)
    #[arg(long = "admin", default_value = SplitterConfig::DEFAULT_ADMIN)]
    admins: Vec<String>,

    /// Who may trigger releases
    #[arg(long, value_enum, default_value_t = Posture::Strict)]
    posture: Posture,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,
}

impl Args {
    fn config(&self) -> SplitterConfig {
        SplitterConfig {
            holder: AccountId::from(self.holder.as_str()),
            admins: self.admins.iter().map(|admin| AccountId::from(admin.as_str())).collect(),
            posture: self.posture,
        }
    }
}

fn main() {
    let args = Args::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let file = match File::open(&args.input) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Error opening file '{}': {}", args.input.display(), e);
            process::exit(1);
        }
    };

    let Replay { splitter, skipped } = match replay_operations(BufReader::new(file), &args.config()) {
        Ok(replay) => replay,
        Err(e) => {
            eprintln!("Error replaying operations: {}", e);
            process::exit(1);
        }
    };
    if !skipped.is_empty() {
        tracing::warn!(count = skipped.len(), lines = ?skipped, "rows skipped or rejected");
    }

    if let Err(e) = write_statements(&splitter, std::io::stdout()) {
        eprintln!("Error writing output: {}", e);
        process::exit(1);
    }
}

/// Raw CSV record matching the input format.
///
/// Fields: `type, caller, asset, payee, shares, amount, num, den`
#[derive(Debug, Deserialize)]
struct CsvRecord {
    #[serde(rename = "type")]
    op_type: String,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    caller: Option<String>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    asset: Option<String>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    payee: Option<String>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    shares: Option<Shares>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    amount: Option<Amount>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    num: Option<u64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    den: Option<u64>,
}

/// Outcome of replaying an operations file.
struct Replay {
    splitter: ReplaySplitter,
    /// Input lines that were malformed or whose operation failed.
    skipped: Vec<u64>,
}

/// A single replayable operation.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Operation {
    Deposit { asset: Asset, amount: Amount },
    Add { caller: AccountId, payee: AccountId, shares: Shares },
    Remove { caller: AccountId, payee: AccountId },
    Release { caller: AccountId, asset: Asset, payee: Option<AccountId> },
    Fraction { caller: AccountId, asset: Asset, num: u64, den: u64 },
    Amount { caller: AccountId, asset: Asset, amount: Amount },
    Track { caller: AccountId, token: AccountId },
    Reject { payee: AccountId },
    Accept { payee: AccountId },
}

impl CsvRecord {
    /// Converts CSV record to an operation.
    ///
    /// Returns `None` for unknown types or missing required fields. An empty
    /// asset means the native one.
    fn into_operation(self) -> Option<Operation> {
        let caller = self.caller.map(AccountId::from);
        let payee = self.payee.map(AccountId::from);
        let asset = match self.asset {
            Some(asset) => asset.parse::<Asset>().ok()?,
            None => Asset::Native,
        };

        match self.op_type.to_lowercase().as_str() {
            "deposit" => Some(Operation::Deposit {
                asset,
                amount: self.amount?,
            }),
            "add" => Some(Operation::Add {
                caller: caller?,
                payee: payee?,
                shares: self.shares?,
            }),
            "remove" => Some(Operation::Remove {
                caller: caller?,
                payee: payee?,
            }),
            "release" => Some(Operation::Release {
                caller: caller?,
                asset,
                payee,
            }),
            "fraction" => Some(Operation::Fraction {
                caller: caller?,
                asset,
                num: self.num?,
                den: self.den?,
            }),
            "amount" => Some(Operation::Amount {
                caller: caller?,
                asset,
                amount: self.amount?,
            }),
            "track" => match asset {
                Asset::Token(token) => Some(Operation::Track {
                    caller: caller?,
                    token,
                }),
                Asset::Native => None,
            },
            "reject" => Some(Operation::Reject { payee: payee? }),
            "accept" => Some(Operation::Accept { payee: payee? }),
            _ => None,
        }
    }
}

fn apply(splitter: &ReplaySplitter, operation: Operation) -> Result<(), SplitterError> {
    let vault = splitter.custody();
    match operation {
        Operation::Deposit { asset, amount } => vault.deposit(&asset, amount),
        Operation::Add {
            caller,
            payee,
            shares,
        } => splitter.add_payee(&caller, payee, shares)?,
        Operation::Remove { caller, payee } => {
            splitter.remove_payee(&caller, &payee)?;
        }
        Operation::Release {
            caller,
            asset,
            payee: Some(payee),
        } => {
            splitter.release_asset_payee(&caller, &asset, &payee)?;
        }
        Operation::Release {
            caller,
            asset,
            payee: None,
        } => {
            splitter.release_asset(&caller, &asset)?;
        }
        Operation::Fraction {
            caller,
            asset,
            num,
            den,
        } => {
            splitter.release_asset_in_shares(&caller, &asset, num, den)?;
        }
        Operation::Amount {
            caller,
            asset,
            amount,
        } => {
            splitter.release_asset_balance(&caller, &asset, amount)?;
        }
        Operation::Track { caller, token } => {
            splitter.track_token(&caller, token)?;
        }
        Operation::Reject { payee } => vault.reject(payee),
        Operation::Accept { payee } => vault.accept(&payee),
    }
    Ok(())
}

/// Replay operations from a CSV reader.
///
/// Rows are streamed, so arbitrarily large files are handled without loading
/// them into memory. Malformed rows and rejected operations are logged and
/// skipped.
///
/// # CSV Format
///
/// Expected columns: `type, caller, asset, payee, shares, amount, num, den`
/// - `type`: deposit, add, remove, release, fraction, amount, track, reject, accept
/// - `caller`: Account performing the operation
/// - `asset`: `native` (default) or a token address
/// - `payee`: Target payee (optional for release)
/// - `shares`, `amount`, `num`, `den`: Operation arguments
///
/// # Example
///
/// ```csv
/// type,caller,asset,payee,shares,amount,num,den
/// add,admin,,alice,75,,,
/// add,admin,,bob,25,,,
/// deposit,,native,,,100,,
/// release,admin,native,,,,,
/// ```
///
/// # Errors
///
/// Returns a CSV error if the header row cannot be read.
fn replay_operations<R: Read>(reader: R, config: &SplitterConfig) -> Result<Replay, csv::Error> {
    let vault = Arc::new(Vault::new(config.holder.clone()));
    let splitter = Splitter::from_config(config, vault);
    let mut skipped = Vec::new();

    let mut rdr = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .has_headers(true)
        .from_reader(reader);
    let headers = rdr.headers()?.clone();

    for result in rdr.records() {
        let raw = match result {
            Ok(raw) => raw,
            Err(e) => {
                let line = e.position().map_or(0, Position::line);
                tracing::warn!(line, error = %e, "skipping malformed row");
                skipped.push(line);
                continue;
            }
        };
        // 1-based line in the input file, header included.
        let line = raw.position().map_or(0, Position::line);

        let record = match raw.deserialize::<CsvRecord>(Some(&headers)) {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(line, error = %e, "skipping malformed row");
                skipped.push(line);
                continue;
            }
        };

        let Some(operation) = record.into_operation() else {
            tracing::warn!(line, "skipping invalid operation record");
            skipped.push(line);
            continue;
        };

        if let Err(e) = apply(&splitter, operation.clone()) {
            tracing::warn!(line, ?operation, error = %e, "operation failed");
            skipped.push(line);
        }
    }

    Ok(Replay { splitter, skipped })
}

/// Write payee statements to a CSV writer.
///
/// One block of rows per tracked asset, native first.
///
/// # CSV Format
///
/// Columns: `asset, payee, shares, share, released`
///
/// # Example
///
/// ```csv
/// asset,payee,shares,share,released
/// native,alice,75,0.75,75
/// native,bob,25,0.25,25
/// ```
///
/// # Errors
///
/// Returns a CSV error if writing fails.
fn write_statements<W: Write>(splitter: &ReplaySplitter, writer: W) -> Result<(), csv::Error> {
    let mut wtr = Writer::from_writer(writer);

    for asset in splitter.tracked_assets() {
        for statement in splitter.statements(&asset) {
            wtr.serialize(&statement)?;
        }
    }

    wtr.flush()?;
    Ok(())
}
