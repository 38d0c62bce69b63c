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

use anyhow::Context;
use clap::Parser;
use csv::{ReaderBuilder, Trim};
use parking_reservation_rs::http::{AppState, router};
use parking_reservation_rs::{ReservationService, Spot, SpotId, default_spots};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::fs::File;
use std::io::{BufReader, Read};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Parking Reservation Server
///
/// Serves spot listing, proximity search and booking over HTTP.
#[derive(Parser, Debug)]
#[command(name = "parking-reservation-rs")]
#[command(about = "A parking spot reservation server", long_about = None)]
struct Args {
    /// HTTP listen address
    #[arg(long, env = "PARKING_ADDR", default_value = "127.0.0.1:8080")]
    addr: SocketAddr,

    /// CSV file with the spots to seed at startup
    ///
    /// Expected format: id,latitude,longitude,cost,address
    /// Without it the five built-in spots are used.
    #[arg(long, value_name = "FILE")]
    spots: Option<PathBuf>,

    /// Log level used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logger(&args.log_level)?;

    let spots = match &args.spots {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("opening spot file '{}'", path.display()))?;
            load_spots(BufReader::new(file))
                .with_context(|| format!("reading spot file '{}'", path.display()))?
        }
        None => default_spots(),
    };
    tracing::info!(count = spots.len(), "seeded spot registry");

    let state = AppState {
        service: Arc::new(ReservationService::in_memory(spots)),
    };

    let listener = TcpListener::bind(args.addr)
        .await
        .with_context(|| format!("binding {}", args.addr))?;
    tracing::info!(address = %args.addr, "listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server terminated unexpectedly")
        .inspect_err(|e| tracing::error!(error.message = %e, "server error"))?;

    tracing::info!("terminated");
    Ok(())
}

fn init_logger(default_level: &str) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .context("invalid log level")?;

    let subscriber = tracing_subscriber::fmt::layer()
        .with_file(true)
        .with_line_number(true)
        .with_target(false);

    tracing_subscriber::registry()
        .with(subscriber)
        .with(env_filter)
        .try_init()?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
}

/// Raw CSV record matching the seed format.
///
/// Fields: `id, latitude, longitude, cost, address`
#[derive(Debug, Deserialize)]
struct CsvSpot {
    id: u32,
    latitude: String,
    longitude: String,
    cost: Decimal,
    #[serde(default)]
    address: String,
}

impl From<CsvSpot> for Spot {
    fn from(record: CsvSpot) -> Self {
        Spot::new(
            SpotId(record.id),
            record.latitude,
            record.longitude,
            record.cost,
            record.address,
        )
    }
}

/// Reads seed spots from CSV.
///
/// # CSV Format
///
/// ```csv
/// id,latitude,longitude,cost,address
/// 1,44.968046,-94.420307,100,address 1
/// 2,44.33328,-89.132008,10,
/// ```
///
/// # Errors
///
/// Returns a CSV error for the first malformed row. A bad seed file stops
/// startup rather than silently serving a partial registry.
fn load_spots<R: Read>(reader: R) -> Result<Vec<Spot>, csv::Error> {
    let mut rdr = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true) // Allow missing address field
        .has_headers(true)
        .from_reader(reader);

    rdr.deserialize::<CsvSpot>()
        .map(|record| record.map(Spot::from))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::io::Cursor;

    #[test]
    fn parse_seed_spots() {
        let csv = "id,latitude,longitude,cost,address\n\
                   1,44.968046,-94.420307,100,address 1\n\
                   7,33.755787,-116.359998,80.5,address 7\n";
        let spots = load_spots(Cursor::new(csv)).unwrap();

        assert_eq!(spots.len(), 2);
        assert_eq!(spots[1].id, SpotId(7));
        assert_eq!(spots[1].cost, dec!(80.5));
        assert_eq!(spots[1].address, "address 7");
        assert!(!spots[1].reserved);
    }

    #[test]
    fn parse_with_whitespace_and_missing_address() {
        let csv = "id,latitude,longitude,cost,address\n 3 , 1.5 , 2.5 , 10 \n";
        let spots = load_spots(Cursor::new(csv)).unwrap();

        assert_eq!(spots[0].latitude, "1.5");
        assert_eq!(spots[0].address, "");
    }

    #[test]
    fn malformed_row_fails_the_load() {
        let csv = "id,latitude,longitude,cost,address\n\
                   1,44.9,-94.4,100,a\n\
                   x,44.3,-89.1,10,b\n";
        assert!(load_spots(Cursor::new(csv)).is_err());
    }

    #[test]
    fn empty_file_yields_no_spots() {
        let csv = "id,latitude,longitude,cost,address\n";
        assert!(load_spots(Cursor::new(csv)).unwrap().is_empty());
    }
}
