pub mod ledger;

use crate::config::{ArtifactFormat, StorageConfig};
use crate::error::StorageError;
use crate::models::{Cell, GameRecord, Period};
use duckdb::types::Value;
use duckdb::{params_from_iter, Connection};
use std::path::{Path, PathBuf};
use tracing::info;

// ── Artifact writer ───────────────────────────────────────────────────────────

/// Writes one file per game under `{base}/{YYYY}/{MM}/{DD}/`.
pub struct ArtifactWriter {
    base: PathBuf,
    format: ArtifactFormat,
}

impl ArtifactWriter {
    /// Fails if the base directory cannot be created.
    pub fn new(config: &StorageConfig) -> Result<Self, StorageError> {
        std::fs::create_dir_all(&config.output_dir)?;
        Ok(Self {
            base: config.output_dir.clone(),
            format: config.format,
        })
    }

    /// `{base}/{YYYY}/{MM}/{DD}/{away} @ {home}.{ext}`
    pub fn artifact_path(&self, game: &GameRecord) -> PathBuf {
        self.base
            .join(game.date.format("%Y").to_string())
            .join(game.date.format("%m").to_string())
            .join(game.date.format("%d").to_string())
            .join(format!(
                "{} @ {}.{}",
                game.away,
                game.home,
                self.format.extension()
            ))
    }

    pub fn write(&self, game: &GameRecord) -> Result<PathBuf, StorageError> {
        let path = self.artifact_path(game);
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }

        match self.format {
            ArtifactFormat::Csv => write_csv(game, &path)?,
            ArtifactFormat::Parquet => write_parquet(game, &path)?,
        }

        info!("{} rows saved to {:?}", game.rows.len(), path);
        Ok(path)
    }
}

fn write_csv(game: &GameRecord, path: &Path) -> Result<(), StorageError> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(game.columns())?;
    for row in &game.rows {
        writer.write_record(game.cells(row).iter().map(Cell::render))?;
    }
    writer.flush()?;
    Ok(())
}

// ── Parquet via DuckDB ────────────────────────────────────────────────────────

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn sql_type(column: &str, game: &GameRecord) -> &'static str {
    match column {
        "date" => "DATE",
        c if Period::ALL.iter().any(|p| p.column() == c) => "BIGINT",
        c if game.stat_columns.iter().any(|s| s == c) => "DOUBLE",
        _ => "VARCHAR",
    }
}

fn cell_value(cell: Cell) -> Value {
    match cell {
        Cell::Text(s) => Value::Text(s),
        Cell::Number(Some(v)) => Value::Double(v),
        Cell::Number(None) => Value::Null,
        Cell::Points(p) => Value::BigInt(i64::from(p)),
    }
}

fn write_parquet(game: &GameRecord, path: &Path) -> Result<(), StorageError> {
    let conn = Connection::open_in_memory()?;
    let columns = game.columns();

    let ddl = columns
        .iter()
        .map(|c| format!("{} {}", quote_ident(c), sql_type(c, game)))
        .collect::<Vec<_>>()
        .join(", ");
    conn.execute_batch(&format!("CREATE TABLE game ({ddl});"))?;

    let placeholders = columns
        .iter()
        .map(|c| if c == "date" { "CAST(? AS DATE)" } else { "?" })
        .collect::<Vec<_>>()
        .join(", ");
    let insert = format!("INSERT INTO game VALUES ({placeholders})");

    let tx = conn.unchecked_transaction()?;
    {
        let mut stmt = tx.prepare(&insert)?;
        for row in &game.rows {
            stmt.execute(params_from_iter(game.cells(row).into_iter().map(cell_value)))?;
        }
    }
    tx.commit()?;

    let target = path.to_string_lossy().replace('\'', "''");
    conn.execute_batch(&format!("COPY game TO '{target}' (FORMAT PARQUET);"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EnrichedRow, PeriodBreakdown, PlayerRow};
    use chrono::NaiveDate;

    fn game() -> GameRecord {
        let row = |team: &str, name: &str, pts: f64, h1: u32| EnrichedRow {
            row: PlayerRow {
                team: team.to_string(),
                name: name.to_string(),
                minutes: "31:02".to_string(),
                stats: vec![("FG%".to_string(), None), ("PTS".to_string(), Some(pts))],
            },
            periods: PeriodBreakdown {
                q1: h1,
                h1,
                ..Default::default()
            },
        };
        GameRecord {
            game_id: "LAL_DEN_20231024".to_string(),
            date: NaiveDate::from_ymd_opt(2023, 10, 24).unwrap(),
            away: "LAL".to_string(),
            home: "DEN".to_string(),
            stat_columns: vec!["FG%".to_string(), "PTS".to_string()],
            rows: vec![row("LAL", "O'Neal", 21.0, 9), row("DEN", "Jokic", 29.0, 12)],
        }
    }

    fn writer(dir: &Path, format: ArtifactFormat) -> ArtifactWriter {
        ArtifactWriter::new(&StorageConfig {
            output_dir: dir.to_path_buf(),
            ledger_path: dir.join("ledger.txt"),
            format,
        })
        .unwrap()
    }

    #[test]
    fn test_artifact_path_layout() {
        let dir = tempfile::tempdir().unwrap();
        let w = writer(dir.path(), ArtifactFormat::Parquet);
        assert_eq!(
            w.artifact_path(&game()),
            dir.path().join("2023").join("10").join("24").join("LAL @ DEN.parquet")
        );
    }

    #[test]
    fn test_write_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = writer(dir.path(), ArtifactFormat::Csv).write(&game()).unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let headers: Vec<String> = reader.headers().unwrap().iter().map(String::from).collect();
        assert_eq!(
            headers,
            vec![
                "game_id", "date", "Team", "Player", "MP", "FG%", "PTS", "PTS_Q1", "PTS_Q2",
                "PTS_Q3", "PTS_Q4", "PTS_H1", "PTS_H2"
            ]
        );
        let records: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(records.len(), 2);
        assert_eq!(&records[0][0], "LAL_DEN_20231024");
        assert_eq!(&records[0][1], "2023-10-24");
        assert_eq!(&records[0][5], "");
        assert_eq!(&records[1][6], "29");
        assert_eq!(&records[1][11], "12");
    }

    #[test]
    fn test_write_parquet() {
        let dir = tempfile::tempdir().unwrap();
        let path = writer(dir.path(), ArtifactFormat::Parquet).write(&game()).unwrap();
        assert!(path.exists());

        let conn = Connection::open_in_memory().unwrap();
        let sql = format!(
            "SELECT COUNT(*), CAST(SUM(\"PTS_H1\") AS BIGINT) FROM read_parquet('{}')",
            path.to_string_lossy().replace('\'', "''")
        );
        let (count, h1): (i64, i64) = conn
            .query_row(&sql, [], |r| Ok((r.get(0)?, r.get(1)?)))
            .unwrap();
        assert_eq!(count, 2);
        assert_eq!(h1, 21);
    }
}
