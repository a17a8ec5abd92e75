use anyhow::{anyhow, Context, Result};
use rusqlite::{Connection, OpenFlags, Row};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

pub mod models;
use models::*;

/// How long a reader waits on a locked database file before giving up.
const READER_BUSY_TIMEOUT: Duration = Duration::from_secs(2);

/// SQLite handle. The prediction pipeline writes these tables; this service
/// only reads them.
///
/// The mutex-guarded connection is only used for migrations. Every query
/// opens its own read-only connection, so leagues read in parallel (WAL) and
/// a stuck query never holds a lock another league needs.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
    target: Arc<str>,
    reader_flags: OpenFlags,
}

impl Database {
    /// Open (or create) the SQLite database at the given path
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database at {}", path))?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
        let reader_flags = OpenFlags::SQLITE_OPEN_READ_ONLY
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        Self::from_connection(conn, path, reader_flags)
    }

    /// Fresh in-memory database with the schema applied. It is a named
    /// shared-cache database so reader connections see the same tables.
    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        use std::sync::atomic::{AtomicUsize, Ordering};
        static NEXT: AtomicUsize = AtomicUsize::new(0);

        let uri = format!(
            "file:livepicks-{}-{}?mode=memory&cache=shared",
            std::process::id(),
            NEXT.fetch_add(1, Ordering::Relaxed)
        );
        let conn = Connection::open(&uri)?;
        Self::from_connection(conn, &uri, OpenFlags::default())
    }

    fn from_connection(conn: Connection, target: &str, reader_flags: OpenFlags) -> Result<Self> {
        let db = Database {
            conn: Arc::new(Mutex::new(conn)),
            target: Arc::from(target),
            reader_flags,
        };
        db.run_migrations()?;
        Ok(db)
    }

    /// Run schema migrations (idempotent)
    fn run_migrations(&self) -> Result<()> {
        let conn = self.conn()?;
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("database connection mutex poisoned"))
    }

    /// New connection for a single query pass; dropped when the pass ends.
    fn reader(&self) -> Result<Connection> {
        let conn = Connection::open_with_flags(&*self.target, self.reader_flags)
            .with_context(|| format!("Failed to open read connection to {}", self.target))?;
        conn.busy_timeout(READER_BUSY_TIMEOUT)?;
        Ok(conn)
    }

    #[cfg(test)]
    pub fn seed(&self, sql: &str) -> Result<()> {
        self.conn()?.execute_batch(sql)?;
        Ok(())
    }

    /// Hold the migration connection, as a long write would.
    #[cfg(test)]
    pub fn lock_writer(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn()
    }

    // ── Latest-run predictions ───────────────────────────────────────────────
    //
    // Every query keeps only the newest run and left-joins the lines table on
    // the sport's own game key. Rows without lines keep NULL line fields.

    /// Pro football: newest `run_id`, lines joined on `game_key`.
    pub fn latest_nfl_predictions(&self) -> Result<Vec<NflPrediction>> {
        let conn = self.reader()?;
        let mut stmt = conn.prepare(
            "SELECT p.game_key, p.home_team, p.away_team,
                    p.home_win_prob, p.home_cover_prob, p.over_prob,
                    l.home_spread, l.total_line
             FROM nfl_predictions p
             LEFT JOIN nfl_betting_lines l ON l.game_key = p.game_key
             WHERE p.run_id = (SELECT MAX(run_id) FROM nfl_predictions)
             ORDER BY p.id",
        )?;
        let rows = stmt
            .query_map([], map_nfl)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("Failed to read nfl_predictions")?;
        Ok(rows)
    }

    /// College football: newest `run_id`, lines joined on `game_id`.
    pub fn latest_cfb_predictions(&self) -> Result<Vec<CfbPrediction>> {
        let conn = self.reader()?;
        let mut stmt = conn.prepare(
            "SELECT p.game_id, p.home_team, p.away_team,
                    p.home_cover_prob, p.over_prob,
                    p.pred_home_score, p.pred_away_score,
                    p.spread_edge, p.total_edge,
                    l.home_spread, l.total_line
             FROM cfb_predictions p
             LEFT JOIN cfb_betting_lines l ON l.game_id = p.game_id
             WHERE p.run_id = (SELECT MAX(run_id) FROM cfb_predictions)
             ORDER BY p.id",
        )?;
        let rows = stmt
            .query_map([], map_cfb)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("Failed to read cfb_predictions")?;
        Ok(rows)
    }

    /// Pro basketball: newest `generated_at`, lines joined on `game_id`.
    pub fn latest_nba_predictions(&self) -> Result<Vec<NbaPrediction>> {
        let conn = self.reader()?;
        let mut stmt = conn.prepare(
            "SELECT p.game_id, p.home_team, p.away_team,
                    p.home_win_prob, p.model_total,
                    l.home_spread, l.total_line
             FROM nba_predictions p
             LEFT JOIN nba_betting_lines l ON l.game_id = p.game_id
             WHERE p.generated_at = (SELECT MAX(generated_at) FROM nba_predictions)
             ORDER BY p.id",
        )?;
        let rows = stmt
            .query_map([], map_nba)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("Failed to read nba_predictions")?;
        Ok(rows)
    }

    /// College basketball: newest `generated_at`, lines joined on `game_id`.
    pub fn latest_ncaab_predictions(&self) -> Result<Vec<NcaabPrediction>> {
        let conn = self.reader()?;
        let mut stmt = conn.prepare(
            "SELECT p.game_id, p.home_team, p.away_team,
                    p.home_win_prob, p.home_cover_prob, p.over_prob, p.over_lean,
                    l.home_spread, l.total_line
             FROM ncaab_predictions p
             LEFT JOIN ncaab_betting_lines l ON l.game_id = p.game_id
             WHERE p.generated_at = (SELECT MAX(generated_at) FROM ncaab_predictions)
             ORDER BY p.id",
        )?;
        let rows = stmt
            .query_map([], map_ncaab)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("Failed to read ncaab_predictions")?;
        Ok(rows)
    }
}

// ── SQL helpers ────────────────────────────────────────────────────────────────

fn map_nfl(row: &Row) -> rusqlite::Result<NflPrediction> {
    Ok(NflPrediction {
        game_key: row.get(0)?,
        home_team: row.get(1)?,
        away_team: row.get(2)?,
        home_win_prob: row.get(3)?,
        home_cover_prob: row.get(4)?,
        over_prob: row.get(5)?,
        home_spread: row.get(6)?,
        total_line: row.get(7)?,
    })
}

fn map_cfb(row: &Row) -> rusqlite::Result<CfbPrediction> {
    Ok(CfbPrediction {
        game_id: row.get(0)?,
        home_team: row.get(1)?,
        away_team: row.get(2)?,
        home_cover_prob: row.get(3)?,
        over_prob: row.get(4)?,
        pred_home_score: row.get(5)?,
        pred_away_score: row.get(6)?,
        spread_edge: row.get(7)?,
        total_edge: row.get(8)?,
        home_spread: row.get(9)?,
        total_line: row.get(10)?,
    })
}

fn map_nba(row: &Row) -> rusqlite::Result<NbaPrediction> {
    Ok(NbaPrediction {
        game_id: row.get(0)?,
        home_team: row.get(1)?,
        away_team: row.get(2)?,
        home_win_prob: row.get(3)?,
        model_total: row.get(4)?,
        home_spread: row.get(5)?,
        total_line: row.get(6)?,
    })
}

fn map_ncaab(row: &Row) -> rusqlite::Result<NcaabPrediction> {
    Ok(NcaabPrediction {
        game_id: row.get(0)?,
        home_team: row.get(1)?,
        away_team: row.get(2)?,
        home_win_prob: row.get(3)?,
        home_cover_prob: row.get(4)?,
        over_prob: row.get(5)?,
        over_lean: row.get(6)?,
        home_spread: row.get(7)?,
        total_line: row.get(8)?,
    })
}

/// SQLite schema (idempotent CREATE IF NOT EXISTS)
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS nfl_predictions (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    run_id          INTEGER NOT NULL,
    game_key        TEXT    NOT NULL,
    home_team       TEXT    NOT NULL,
    away_team       TEXT    NOT NULL,
    home_win_prob   REAL,
    home_cover_prob REAL,
    over_prob       REAL
);

CREATE TABLE IF NOT EXISTS nfl_betting_lines (
    game_key    TEXT PRIMARY KEY,
    home_spread REAL,
    total_line  REAL
);

CREATE TABLE IF NOT EXISTS cfb_predictions (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    run_id          INTEGER NOT NULL,
    game_id         INTEGER NOT NULL,
    home_team       TEXT    NOT NULL,
    away_team       TEXT    NOT NULL,
    home_cover_prob REAL,
    over_prob       REAL,
    pred_home_score REAL,
    pred_away_score REAL,
    spread_edge     REAL,
    total_edge      REAL
);

CREATE TABLE IF NOT EXISTS cfb_betting_lines (
    game_id     INTEGER PRIMARY KEY,
    home_spread REAL,
    total_line  REAL
);

CREATE TABLE IF NOT EXISTS nba_predictions (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    generated_at  TEXT    NOT NULL,
    game_id       INTEGER NOT NULL,
    home_team     TEXT    NOT NULL,
    away_team     TEXT    NOT NULL,
    home_win_prob REAL,
    model_total   REAL
);

CREATE TABLE IF NOT EXISTS nba_betting_lines (
    game_id     INTEGER PRIMARY KEY,
    home_spread REAL,
    total_line  REAL
);

CREATE TABLE IF NOT EXISTS ncaab_predictions (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    generated_at    TEXT    NOT NULL,
    game_id         INTEGER NOT NULL,
    home_team       TEXT    NOT NULL,
    away_team       TEXT    NOT NULL,
    home_win_prob   REAL,
    home_cover_prob REAL,
    over_prob       REAL,
    over_lean       INTEGER
);

CREATE TABLE IF NOT EXISTS ncaab_betting_lines (
    game_id     INTEGER PRIMARY KEY,
    home_spread REAL,
    total_line  REAL
);

CREATE INDEX IF NOT EXISTS idx_nfl_predictions_run ON nfl_predictions(run_id);
CREATE INDEX IF NOT EXISTS idx_cfb_predictions_run ON cfb_predictions(run_id);
CREATE INDEX IF NOT EXISTS idx_nba_predictions_generated ON nba_predictions(generated_at);
CREATE INDEX IF NOT EXISTS idx_ncaab_predictions_generated ON ncaab_predictions(generated_at);
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_tables_yield_no_predictions() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.latest_nfl_predictions().unwrap().is_empty());
        assert!(db.latest_cfb_predictions().unwrap().is_empty());
        assert!(db.latest_nba_predictions().unwrap().is_empty());
        assert!(db.latest_ncaab_predictions().unwrap().is_empty());
    }

    #[test]
    fn queries_do_not_wait_on_the_writer_connection() {
        let db = Database::open_in_memory().unwrap();
        db.seed(
            "INSERT INTO nba_predictions (generated_at, game_id, home_team, away_team, home_win_prob)
               VALUES ('2026-01-10T18:00:00Z', 55, 'Boston Celtics', 'Miami Heat', 0.66);",
        )
        .unwrap();

        let _guard = db.lock_writer().unwrap();
        let rows = db.latest_nba_predictions().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].home_win_prob, Some(0.66));
    }

    #[test]
    fn file_database_reads_through_read_only_connections() {
        let path = std::env::temp_dir().join(format!("livepicks-{}.db", std::process::id()));
        let path = path.to_string_lossy().into_owned();
        let cleanup = |path: &str| {
            for suffix in ["", "-wal", "-shm"] {
                let _ = std::fs::remove_file(format!("{}{}", path, suffix));
            }
        };
        cleanup(&path);
        let db = Database::open(&path).unwrap();
        db.seed(
            "INSERT INTO nfl_predictions (run_id, game_key, home_team, away_team, home_win_prob)
               VALUES (1, 'KC@BUF', 'Buffalo Bills', 'Kansas City Chiefs', 0.55);",
        )
        .unwrap();

        let rows = db.latest_nfl_predictions().unwrap();
        assert_eq!(rows.len(), 1);
        assert!(db.reader().unwrap().execute_batch("DELETE FROM nfl_predictions").is_err());

        drop(db);
        cleanup(&path);
    }

    #[test]
    fn nfl_keeps_only_latest_run_and_joins_lines() {
        let db = Database::open_in_memory().unwrap();
        db.seed(
            "INSERT INTO nfl_predictions (run_id, game_key, home_team, away_team, home_win_prob)
               VALUES (1, 'KC@BUF', 'Buffalo Bills', 'Kansas City Chiefs', 0.40),
                      (2, 'KC@BUF', 'Buffalo Bills', 'Kansas City Chiefs', 0.55),
                      (2, 'DAL@PHI', 'Philadelphia Eagles', 'Dallas Cowboys', 0.70);
             INSERT INTO nfl_betting_lines (game_key, home_spread, total_line)
               VALUES ('KC@BUF', -2.5, 47.5);",
        )
        .unwrap();

        let rows = db.latest_nfl_predictions().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].game_key, "KC@BUF");
        assert_eq!(rows[0].home_win_prob, Some(0.55));
        assert_eq!(rows[0].home_spread, Some(-2.5));
        assert_eq!(rows[0].total_line, Some(47.5));
        // No lines row: left join leaves the fields empty
        assert_eq!(rows[1].home_spread, None);
        assert_eq!(rows[1].total_line, None);
    }

    #[test]
    fn nba_latest_run_is_newest_timestamp() {
        let db = Database::open_in_memory().unwrap();
        db.seed(
            "INSERT INTO nba_predictions (generated_at, game_id, home_team, away_team, home_win_prob, model_total)
               VALUES ('2026-01-10T15:00:00Z', 55, 'Boston Celtics', 'Miami Heat', 0.61, 214.0),
                      ('2026-01-10T18:00:00Z', 55, 'Boston Celtics', 'Miami Heat', 0.66, 218.5),
                      ('2026-01-10T18:00:00Z', 56, 'Denver Nuggets', 'Utah Jazz', 0.81, NULL);
             INSERT INTO nba_betting_lines (game_id, home_spread, total_line)
               VALUES (55, -6.5, 216.0);",
        )
        .unwrap();

        let rows = db.latest_nba_predictions().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].home_win_prob, Some(0.66));
        assert_eq!(rows[0].model_total, Some(218.5));
        assert_eq!(rows[0].total_line, Some(216.0));
        assert_eq!(rows[1].game_id, 56);
        assert_eq!(rows[1].model_total, None);
    }

    #[test]
    fn cfb_passes_raw_edges_through() {
        let db = Database::open_in_memory().unwrap();
        db.seed(
            "INSERT INTO cfb_predictions (run_id, game_id, home_team, away_team,
                                          pred_home_score, pred_away_score, spread_edge, total_edge)
               VALUES (7, 401, 'Georgia', 'Alabama', 27.0, 24.0, 1.5, -4.0);
             INSERT INTO cfb_betting_lines (game_id, home_spread, total_line)
               VALUES (401, -3.0, 52.5);",
        )
        .unwrap();

        let rows = db.latest_cfb_predictions().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].home_cover_prob, None);
        assert_eq!(rows[0].spread_edge, Some(1.5));
        assert_eq!(rows[0].total_edge, Some(-4.0));
        assert_eq!(rows[0].home_spread, Some(-3.0));
    }

    #[test]
    fn cfb_reads_stored_probabilities_next_to_edges() {
        let db = Database::open_in_memory().unwrap();
        db.seed(
            "INSERT INTO cfb_predictions (run_id, game_id, home_team, away_team,
                                          home_cover_prob, over_prob, spread_edge, total_edge)
               VALUES (8, 402, 'Ohio State', 'Michigan', 0.7, 0.35, -10.0, 6.0);",
        )
        .unwrap();

        let rows = db.latest_cfb_predictions().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].home_cover_prob, Some(0.7));
        assert_eq!(rows[0].over_prob, Some(0.35));
        assert_eq!(rows[0].spread_edge, Some(-10.0));
        assert_eq!(rows[0].total_edge, Some(6.0));
        assert_eq!(rows[0].home_spread, None);
    }

    #[test]
    fn ncaab_reads_over_lean_flag() {
        let db = Database::open_in_memory().unwrap();
        db.seed(
            "INSERT INTO ncaab_predictions (generated_at, game_id, home_team, away_team, home_win_prob, over_lean)
               VALUES ('2026-02-01T12:00:00Z', 9001, 'Duke', 'North Carolina', 0.58, 1),
                      ('2026-02-01T12:00:00Z', 9002, 'Kansas', 'Baylor', NULL, NULL);",
        )
        .unwrap();

        let rows = db.latest_ncaab_predictions().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].over_lean, Some(true));
        assert_eq!(rows[1].over_lean, None);
        assert_eq!(rows[1].home_win_prob, None);
    }
}
