//! SQLite trade journal and circuit-breaker state store.
//!
//! Two tables: an append-only `trades` log and a `state` key/value table
//! holding the global breaker counters. A close writes both inside one
//! transaction, which is what makes the executor's commit point atomic.

use chrono::{DateTime, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, Transaction};

use crate::domain::breaker::CircuitBreakerState;
use crate::domain::error::KestrelError;
use crate::domain::position::{Side, TradeRecord, TradeStatus};
use crate::ports::config_port::ConfigPort;
use crate::ports::journal_port::JournalPort;

const KEY_CONSECUTIVE_LOSSES: &str = "consecutive_losses";
const KEY_COOLDOWN_UNTIL: &str = "cooldown_until";

pub struct SqliteJournal {
    pool: Pool<SqliteConnectionManager>,
}

impl SqliteJournal {
    pub fn from_config(config: &dyn ConfigPort) -> Result<SqliteJournal, KestrelError> {
        let db_path =
            config
                .get_string("sqlite", "path")
                .ok_or_else(|| KestrelError::ConfigMissing {
                    section: "sqlite".into(),
                    key: "path".into(),
                })?;
        let pool_size = config.get_int("sqlite", "pool_size", 4).max(1) as u32;

        let manager = SqliteConnectionManager::file(&db_path);
        let pool = Pool::builder()
            .max_size(pool_size)
            .build(manager)
            .map_err(|e: r2d2::Error| KestrelError::Journal {
                reason: e.to_string(),
            })?;

        let journal = SqliteJournal { pool };
        journal.initialize_schema()?;
        Ok(journal)
    }

    pub fn in_memory() -> Result<SqliteJournal, KestrelError> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(|e: r2d2::Error| KestrelError::Journal {
                reason: e.to_string(),
            })?;

        let journal = SqliteJournal { pool };
        journal.initialize_schema()?;
        Ok(journal)
    }

    fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>, KestrelError> {
        self.pool.get().map_err(|e: r2d2::Error| KestrelError::Journal {
            reason: e.to_string(),
        })
    }

    fn initialize_schema(&self) -> Result<(), KestrelError> {
        let conn = self.conn()?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS trades (
                id        INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp TEXT NOT NULL,
                symbol    TEXT NOT NULL,
                side      TEXT NOT NULL,
                price     REAL NOT NULL,
                size_usd  REAL NOT NULL,
                pnl       REAL NOT NULL DEFAULT 0,
                status    TEXT NOT NULL DEFAULT 'CLOSED'
            );
            CREATE TABLE IF NOT EXISTS state (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            INSERT OR IGNORE INTO state (key, value) VALUES ('consecutive_losses', '0');
            INSERT OR IGNORE INTO state (key, value) VALUES ('cooldown_until', '');",
        )
        .map_err(query_err)?;
        Ok(())
    }
}

impl JournalPort for SqliteJournal {
    fn append_trade(
        &self,
        record: &TradeRecord,
        breaker: &CircuitBreakerState,
    ) -> Result<i64, KestrelError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(query_err)?;

        tx.execute(
            "INSERT INTO trades (timestamp, symbol, side, price, size_usd, pnl, status)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                record.timestamp.to_rfc3339(),
                record.symbol,
                record.side.to_string(),
                record.price,
                record.size_usd,
                record.pnl,
                record.status.to_string()
            ],
        )
        .map_err(query_err)?;
        let trade_id = tx.last_insert_rowid();

        write_state(&tx, breaker)?;
        tx.commit().map_err(query_err)?;

        Ok(trade_id)
    }

    fn load_circuit_state(&self) -> Result<CircuitBreakerState, KestrelError> {
        let conn = self.conn()?;

        let losses_raw = read_state(&conn, KEY_CONSECUTIVE_LOSSES)?;
        let consecutive_losses = if losses_raw.is_empty() {
            0
        } else {
            losses_raw.parse().map_err(|_| KestrelError::Journal {
                reason: format!("corrupt consecutive_losses value: {losses_raw}"),
            })?
        };

        let cooldown_raw = read_state(&conn, KEY_COOLDOWN_UNTIL)?;
        let cooldown_until = if cooldown_raw.is_empty() {
            None
        } else {
            let parsed = DateTime::parse_from_rfc3339(&cooldown_raw).map_err(|e| {
                KestrelError::Journal {
                    reason: format!("corrupt cooldown_until value: {e}"),
                }
            })?;
            Some(parsed.with_timezone(&Utc))
        };

        Ok(CircuitBreakerState {
            consecutive_losses,
            cooldown_until,
        })
    }

    fn save_circuit_state(&self, state: &CircuitBreakerState) -> Result<(), KestrelError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(query_err)?;
        write_state(&tx, state)?;
        tx.commit().map_err(query_err)?;
        Ok(())
    }

    fn recent_trades(&self, limit: usize) -> Result<Vec<TradeRecord>, KestrelError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, timestamp, symbol, side, price, size_usd, pnl, status
                 FROM trades ORDER BY id DESC LIMIT ?1",
            )
            .map_err(query_err)?;

        let limit: i64 = limit.try_into().unwrap_or(i64::MAX);
        let rows = stmt
            .query_map(params![limit], |row| {
                let timestamp_raw: String = row.get(1)?;
                let timestamp = DateTime::parse_from_rfc3339(&timestamp_raw)
                    .map_err(|e| conversion_err(1, e))?
                    .with_timezone(&Utc);

                let side_raw: String = row.get(3)?;
                let side: Side = side_raw.parse().map_err(|e| conversion_err(3, e))?;

                let status_raw: String = row.get(7)?;
                let status: TradeStatus =
                    status_raw.parse().map_err(|e| conversion_err(7, e))?;

                Ok(TradeRecord {
                    id: Some(row.get(0)?),
                    timestamp,
                    symbol: row.get(2)?,
                    side,
                    price: row.get(4)?,
                    size_usd: row.get(5)?,
                    pnl: row.get(6)?,
                    status,
                })
            })
            .map_err(query_err)?;

        let mut trades = Vec::new();
        for row in rows {
            trades.push(row.map_err(query_err)?);
        }
        Ok(trades)
    }
}

fn write_state(tx: &Transaction<'_>, state: &CircuitBreakerState) -> Result<(), KestrelError> {
    tx.execute(
        "INSERT OR REPLACE INTO state (key, value) VALUES (?1, ?2)",
        params![
            KEY_CONSECUTIVE_LOSSES,
            state.consecutive_losses.to_string()
        ],
    )
    .map_err(query_err)?;

    let cooldown = state
        .cooldown_until
        .map(|until| until.to_rfc3339())
        .unwrap_or_default();
    tx.execute(
        "INSERT OR REPLACE INTO state (key, value) VALUES (?1, ?2)",
        params![KEY_COOLDOWN_UNTIL, cooldown],
    )
    .map_err(query_err)?;

    Ok(())
}

fn read_state(conn: &rusqlite::Connection, key: &str) -> Result<String, KestrelError> {
    use rusqlite::OptionalExtension;

    conn.query_row(
        "SELECT value FROM state WHERE key = ?1",
        params![key],
        |row| row.get(0),
    )
    .optional()
    .map_err(query_err)
    .map(|value| value.unwrap_or_default())
}

fn query_err(e: rusqlite::Error) -> KestrelError {
    KestrelError::JournalQuery {
        reason: e.to_string(),
    }
}

fn conversion_err(
    column: usize,
    e: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        column,
        rusqlite::types::Type::Text,
        Box::new(e),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    struct EmptyConfig;

    impl ConfigPort for EmptyConfig {
        fn get_string(&self, _section: &str, _key: &str) -> Option<String> {
            None
        }
        fn get_int(&self, _section: &str, _key: &str, default: i64) -> i64 {
            default
        }
        fn get_double(&self, _section: &str, _key: &str, default: f64) -> f64 {
            default
        }
        fn get_bool(&self, _section: &str, _key: &str, default: bool) -> bool {
            default
        }
    }

    fn record(symbol: &str, pnl: f64) -> TradeRecord {
        TradeRecord {
            id: None,
            timestamp: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
            symbol: symbol.to_string(),
            side: Side::Sell,
            price: 50_000.0,
            size_usd: 100.0,
            pnl,
            status: TradeStatus::Closed,
        }
    }

    #[test]
    fn from_config_missing_path() {
        let result = SqliteJournal::from_config(&EmptyConfig);
        match result {
            Err(KestrelError::ConfigMissing { section, key }) => {
                assert_eq!(section, "sqlite");
                assert_eq!(key, "path");
            }
            Err(other) => panic!("expected ConfigMissing, got: {other}"),
            Ok(_) => panic!("expected error, got Ok"),
        }
    }

    #[test]
    fn fresh_journal_has_default_state() {
        let journal = SqliteJournal::in_memory().unwrap();
        let state = journal.load_circuit_state().unwrap();
        assert_eq!(state, CircuitBreakerState::default());
        assert!(journal.recent_trades(10).unwrap().is_empty());
    }

    #[test]
    fn append_trade_round_trip() {
        let journal = SqliteJournal::in_memory().unwrap();
        let id = journal
            .append_trade(&record("BTCUSDT", 2.0), &CircuitBreakerState::default())
            .unwrap();
        assert_eq!(id, 1);

        let trades = journal.recent_trades(10).unwrap();
        assert_eq!(trades.len(), 1);
        let trade = &trades[0];
        assert_eq!(trade.id, Some(1));
        assert_eq!(trade.symbol, "BTCUSDT");
        assert_eq!(trade.side, Side::Sell);
        assert_eq!(trade.status, TradeStatus::Closed);
        assert!((trade.pnl - 2.0).abs() < f64::EPSILON);
        assert_eq!(
            trade.timestamp,
            Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
        );
    }

    #[test]
    fn append_trade_persists_breaker_state() {
        let journal = SqliteJournal::in_memory().unwrap();
        let tripped = CircuitBreakerState {
            consecutive_losses: 3,
            cooldown_until: Some(Utc.with_ymd_and_hms(2024, 5, 2, 12, 0, 0).unwrap()),
        };
        journal.append_trade(&record("BTCUSDT", -2.0), &tripped).unwrap();

        let loaded = journal.load_circuit_state().unwrap();
        assert_eq!(loaded, tripped);
    }

    #[test]
    fn recent_trades_newest_first_and_limited() {
        let journal = SqliteJournal::in_memory().unwrap();
        for i in 0..5 {
            journal
                .append_trade(
                    &record(&format!("SYM{i}USDT"), 1.0),
                    &CircuitBreakerState::default(),
                )
                .unwrap();
        }

        let trades = journal.recent_trades(2).unwrap();
        assert_eq!(trades.len(), 2);
        assert_eq!(trades[0].symbol, "SYM4USDT");
        assert_eq!(trades[1].symbol, "SYM3USDT");
    }

    #[test]
    fn save_and_reload_circuit_state() {
        let journal = SqliteJournal::in_memory().unwrap();
        let state = CircuitBreakerState {
            consecutive_losses: 2,
            cooldown_until: None,
        };
        journal.save_circuit_state(&state).unwrap();
        assert_eq!(journal.load_circuit_state().unwrap(), state);

        // Manual reset path.
        journal
            .save_circuit_state(&CircuitBreakerState::default())
            .unwrap();
        assert_eq!(
            journal.load_circuit_state().unwrap(),
            CircuitBreakerState::default()
        );
    }

    #[test]
    fn state_survives_reopen_on_disk() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let path = file.path().to_str().unwrap().to_string();

        struct PathConfig(String);
        impl ConfigPort for PathConfig {
            fn get_string(&self, section: &str, key: &str) -> Option<String> {
                (section == "sqlite" && key == "path").then(|| self.0.clone())
            }
            fn get_int(&self, _s: &str, _k: &str, default: i64) -> i64 {
                default
            }
            fn get_double(&self, _s: &str, _k: &str, default: f64) -> f64 {
                default
            }
            fn get_bool(&self, _s: &str, _k: &str, default: bool) -> bool {
                default
            }
        }
        let config = PathConfig(path);

        let tripped = CircuitBreakerState {
            consecutive_losses: 3,
            cooldown_until: Some(Utc.with_ymd_and_hms(2024, 5, 2, 0, 0, 0).unwrap()),
        };
        {
            let journal = SqliteJournal::from_config(&config).unwrap();
            journal.append_trade(&record("BTCUSDT", -2.0), &tripped).unwrap();
        }

        let reopened = SqliteJournal::from_config(&config).unwrap();
        assert_eq!(reopened.load_circuit_state().unwrap(), tripped);
        assert_eq!(reopened.recent_trades(10).unwrap().len(), 1);
    }
}
