// SPDX-FileCopyrightText: 2026 Kash Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `kash history` commands.

use kash_config::KashConfig;
use kash_core::error::KashError;
use kash_core::types::HistoryRecord;
use kash_core::{HistoryStore, UserId};
use kash_history::JsonHistoryStore;

/// Prints a user's raw log, optionally only the last `limit` records.
pub async fn show(config: &KashConfig, user: &str, limit: Option<usize>) -> Result<(), KashError> {
    let store = JsonHistoryStore::new(&config.history);
    let user_id = UserId::from(user);
    let records = last_records(store.read_all(&user_id).await?, limit);

    if records.is_empty() {
        println!("no history for user {user_id}");
    }
    for record in &records {
        println!("{}", format_record(record));
    }
    Ok(())
}

/// Deletes a user's log.
pub async fn clear(config: &KashConfig, user: &str) -> Result<(), KashError> {
    let store = JsonHistoryStore::new(&config.history);
    let user_id = UserId::from(user);
    store.clear(&user_id).await?;
    println!("cleared history for user {user_id}");
    Ok(())
}

/// The last `limit` records of the full log, `forget` markers included.
fn last_records(mut records: Vec<HistoryRecord>, limit: Option<usize>) -> Vec<HistoryRecord> {
    if let Some(n) = limit {
        let skip = records.len().saturating_sub(n);
        records.drain(..skip);
    }
    records
}

fn format_record(record: &HistoryRecord) -> String {
    let speaker = if record.is_bot {
        "bot".to_string()
    } else {
        record
            .username
            .clone()
            .unwrap_or_else(|| record.user_id.to_string())
    };
    format!(
        "{} {speaker}: {}",
        record.time.format("%Y-%m-%d %H:%M:%S"),
        record.text
    )
}
