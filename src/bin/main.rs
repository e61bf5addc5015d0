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
use csv::{ReaderBuilder, Trim, Writer};
use point_ledger::{LedgerConfig, MAX_BALANCE, PointError, PointLedger, UserBalance};
use serde::Deserialize;
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::PathBuf;
use std::process;
use tracing::{debug, error, warn};
use tracing_subscriber::EnvFilter;

/// Point Ledger - Replay charge/use CSV files
///
/// Reads point operations from a CSV file and writes the resulting balances
/// (or the full transaction history) to stdout.
#[derive(Parser, Debug)]
#[command(name = "point-ledger")]
#[command(about = "Replays point charge/use operations from a CSV file", long_about = None)]
struct Args {
    /// Path to CSV file with operations
    ///
    /// Expected format: type,user,amount
    /// Example: cargo run -- operations.csv > balances.csv
    #[arg(value_name = "FILE")]
    input: PathBuf,

    /// Print the transaction history instead of balances
    #[arg(long)]
    history: bool,

    /// Largest balance a user may hold
    #[arg(long, default_value_t = MAX_BALANCE)]
    max_balance: i64,
}

fn main() {
    // Logs go to stderr so stdout stays valid CSV.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let args = Args::parse();

    let file = match File::open(&args.input) {
        Ok(f) => f,
        Err(e) => {
            error!(path = %args.input.display(), error = %e, "cannot open input");
            process::exit(1);
        }
    };

    let config = LedgerConfig::default().with_max_balance(args.max_balance);
    let ledger = match replay(BufReader::new(file), config) {
        Ok(ledger) => ledger,
        Err(e) => {
            error!(error = %e, "cannot replay operations");
            process::exit(1);
        }
    };

    let written = if args.history {
        write_history(&ledger, std::io::stdout())
    } else {
        write_balances(&ledger, std::io::stdout())
    };
    if let Err(e) = written {
        error!(error = %e, "cannot write output");
        process::exit(1);
    }
}

/// Raw CSV record matching the input format.
///
/// Fields: `type, user, amount`
#[derive(Debug, Deserialize)]
struct CsvRecord {
    #[serde(rename = "type")]
    kind: String,
    user: i64,
    #[serde(deserialize_with = "csv::invalid_option")]
    amount: Option<i64>,
}

impl CsvRecord {
    fn apply(&self, ledger: &PointLedger) -> Option<Result<UserBalance, PointError>> {
        let amount = match self.amount {
            Some(amount) => amount,
            None => return Some(Err(PointError::InvalidAmount)),
        };
        match self.kind.to_lowercase().as_str() {
            "charge" => Some(ledger.charge(self.user, amount)),
            "use" => Some(ledger.use_point(self.user, amount)),
            _ => None,
        }
    }
}

/// Replays operations from a CSV reader, in file order.
///
/// Malformed rows, unknown operation types and rejected operations are
/// skipped and logged at debug level.
///
/// # CSV Format
///
/// Expected columns: `type, user, amount`
/// - `type`: `charge` or `use`
/// - `user`: User id
/// - `amount`: Positive integer amount
///
/// # Example
///
/// ```csv
/// type,user,amount
/// charge,5,1000
/// use,5,400
/// ```
///
/// # Errors
///
/// Returns a CSV error if the reader fails.
pub fn replay<R: Read>(reader: R, config: LedgerConfig) -> Result<PointLedger, csv::Error> {
    let ledger = PointLedger::with_config(config);

    let mut rdr = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .has_headers(true)
        .from_reader(reader);

    for (line, result) in rdr.deserialize::<CsvRecord>().enumerate() {
        let record = match result {
            Ok(record) => record,
            Err(e) if e.is_io_error() => return Err(e),
            Err(e) => {
                debug!(line, error = %e, "skipping malformed row");
                continue;
            }
        };

        match record.apply(&ledger) {
            None => warn!(line, kind = %record.kind, "skipping unknown operation"),
            Some(Err(e)) => debug!(line, user = record.user, error = %e, "skipping rejected operation"),
            Some(Ok(_)) => {}
        }
    }

    Ok(ledger)
}

/// Writes balances sorted by user.
///
/// # CSV Format
///
/// Columns: `user, point, updated_at`
pub fn write_balances<W: Write>(ledger: &PointLedger, writer: W) -> Result<(), csv::Error> {
    let mut wtr = Writer::from_writer(writer);
    for balance in ledger.balances().snapshot() {
        wtr.serialize(balance)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Writes every history record ordered by id.
///
/// # CSV Format
///
/// Columns: `id, user, amount, type, updated_at`
pub fn write_history<W: Write>(ledger: &PointLedger, writer: W) -> Result<(), csv::Error> {
    let mut wtr = Writer::from_writer(writer);
    for record in ledger.history().all() {
        wtr.serialize(record)?;
    }
    wtr.flush()?;
    Ok(())
}
