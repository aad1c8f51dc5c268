//! SQLite-backed record repository.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::duplicates::{select_against, SelectionStats};
use crate::scanner::{FileRecord, HashStrategy};

/// Errors raised by the repository. Fatal to whichever run hit them.
#[derive(thiserror::Error, Debug)]
pub enum RepositoryError {
    /// Underlying SQLite failure.
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// `update_hash` targeted a row that does not exist.
    #[error("No record with id {0}")]
    RecordNotFound(i64),
}

/// Result type for repository operations.
pub type RepositoryResult<T> = Result<T, RepositoryError>;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS files (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    path         TEXT NOT NULL UNIQUE,
    size         INTEGER NOT NULL,
    modified     INTEGER NOT NULL,
    accessed     INTEGER,
    created      INTEGER,
    content_hash TEXT,
    quick_hash   TEXT,
    partial_hash TEXT,
    partial_strategy TEXT
);
CREATE INDEX IF NOT EXISTS idx_files_size ON files(size);
CREATE INDEX IF NOT EXISTS idx_files_content_hash ON files(content_hash);
";

const SELECT_COLUMNS: &str = "id, path, size, modified, accessed, created, \
     content_hash, quick_hash, partial_hash, partial_strategy";

/// Records sharing their size with at least one other stored record.
const SIZE_COLLIDES: &str = "size IN (SELECT size FROM files GROUP BY size HAVING COUNT(*) > 1)";

/// Which rows a hash pass still has to fingerprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingHash {
    /// Rows without an exact content hash, even if a partial one is stored.
    Exact,
    /// Rows with no fingerprint of any kind.
    Any,
}

impl PendingHash {
    /// What a pass with `strategy` has left to do.
    ///
    /// An exact pass upgrades rows that only carry a partial fingerprint; any
    /// other pass leaves them alone.
    #[must_use]
    pub fn for_strategy(strategy: HashStrategy) -> Self {
        if strategy.is_exact() {
            Self::Exact
        } else {
            Self::Any
        }
    }

    fn condition(self) -> &'static str {
        match self {
            Self::Exact => "content_hash IS NULL",
            Self::Any => "content_hash IS NULL AND partial_hash IS NULL",
        }
    }
}

/// Persistent store of file records and their fingerprints.
///
/// Each worker thread opens its own `Repository`; a connection is never
/// shared across threads.
pub struct Repository {
    conn: Connection,
    path: Option<PathBuf>,
}

impl std::fmt::Debug for Repository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository").field("path", &self.path).finish()
    }
}

impl Repository {
    /// Open (creating if needed) the repository at `path`.
    ///
    /// # Errors
    ///
    /// Fails if the database cannot be opened or the schema cannot be created.
    pub fn open(path: &Path) -> RepositoryResult<Self> {
        let conn = Connection::open(path)?;
        let repo = Self {
            conn,
            path: Some(path.to_path_buf()),
        };
        repo.configure_pragmas()?;
        repo.init_schema()?;
        log::debug!("Opened repository at {}", path.display());
        Ok(repo)
    }

    /// Open a private in-memory repository.
    ///
    /// # Errors
    ///
    /// Fails if SQLite cannot allocate the database.
    pub fn open_in_memory() -> RepositoryResult<Self> {
        let conn = Connection::open_in_memory()?;
        let repo = Self { conn, path: None };
        repo.init_schema()?;
        Ok(repo)
    }

    /// Location on disk, `None` for in-memory repositories.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn configure_pragmas(&self) -> RepositoryResult<()> {
        self.conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA busy_timeout = 5000;",
        )?;
        Ok(())
    }

    fn init_schema(&self) -> RepositoryResult<()> {
        self.conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    /// Insert or refresh records by path, in one transaction.
    ///
    /// A record whose size or modification time changed loses its stored
    /// fingerprints; an unchanged record keeps them. Returns the number of
    /// rows written.
    ///
    /// # Errors
    ///
    /// Any SQLite failure aborts the whole batch.
    pub fn insert_records(&mut self, records: &[FileRecord]) -> RepositoryResult<usize> {
        let tx = self.conn.transaction()?;
        let mut written = 0;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO files (path, size, modified, accessed, created)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(path) DO UPDATE SET
                     content_hash = CASE
                         WHEN files.size != excluded.size OR files.modified != excluded.modified
                         THEN NULL ELSE files.content_hash END,
                     quick_hash = CASE
                         WHEN files.size != excluded.size OR files.modified != excluded.modified
                         THEN NULL ELSE files.quick_hash END,
                     partial_hash = CASE
                         WHEN files.size != excluded.size OR files.modified != excluded.modified
                         THEN NULL ELSE files.partial_hash END,
                     partial_strategy = CASE
                         WHEN files.size != excluded.size OR files.modified != excluded.modified
                         THEN NULL ELSE files.partial_strategy END,
                     size = excluded.size,
                     modified = excluded.modified,
                     accessed = excluded.accessed,
                     created = excluded.created",
            )?;
            for record in records {
                written += stmt.execute(params![
                    record.path.to_string_lossy(),
                    to_sql_size(record.size),
                    to_millis(record.modified),
                    record.accessed.map(to_millis),
                    record.created.map(to_millis),
                ])?;
            }
        }
        tx.commit()?;
        log::debug!("Stored {} records", written);
        Ok(written)
    }

    /// Records still lacking an exact content hash, largest first.
    ///
    /// With `smart` set, only records whose size collides with another
    /// stored record are returned. The collision is checked against the
    /// whole table, not the returned page.
    ///
    /// # Errors
    ///
    /// Propagates SQLite failures.
    pub fn records_without_hash(
        &self,
        min_size: u64,
        max_size: Option<u64>,
        limit: Option<usize>,
        smart: bool,
    ) -> RepositoryResult<Vec<FileRecord>> {
        let (records, _) =
            self.select_pending(PendingHash::Exact, min_size, max_size, limit, smart)?;
        Ok(records)
    }

    /// Pending records after smart selection and `limit`, with the selection
    /// outcome.
    ///
    /// Records come largest first, then by path. The stats count every
    /// pending record in the size range, so records cut by `limit` show up
    /// as deferred rather than kept.
    ///
    /// # Errors
    ///
    /// Propagates SQLite failures.
    pub fn select_pending(
        &self,
        pending: PendingHash,
        min_size: u64,
        max_size: Option<u64>,
        limit: Option<usize>,
        smart: bool,
    ) -> RepositoryResult<(Vec<FileRecord>, SelectionStats)> {
        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM files
             WHERE {} AND size >= ?1 AND (?2 IS NULL OR size <= ?2)
             ORDER BY size DESC, path",
            pending.condition()
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(
            params![to_sql_size(min_size), max_size.map(to_sql_size)],
            record_from_row,
        )?;
        let records = rows.collect::<Result<Vec<_>, _>>()?;

        let corpus_sizes = if smart {
            self.size_counts()?
        } else {
            HashMap::new()
        };
        Ok(select_against(records, smart, &corpus_sizes, limit))
    }

    /// Number of stored records per size, over the whole table.
    ///
    /// # Errors
    ///
    /// Propagates SQLite failures.
    pub fn size_counts(&self) -> RepositoryResult<HashMap<u64, usize>> {
        let mut stmt = self
            .conn
            .prepare("SELECT size, COUNT(*) FROM files GROUP BY size")?;
        let rows = stmt.query_map([], |row| {
            let size: i64 = row.get(0)?;
            let count: i64 = row.get(1)?;
            Ok((
                u64::try_from(size).unwrap_or(0),
                usize::try_from(count).unwrap_or(0),
            ))
        })?;
        Ok(rows.collect::<Result<HashMap<_, _>, _>>()?)
    }

    /// Store the exact fingerprint of one record, plus its quick hash.
    ///
    /// `content_hash` must come from an exact strategy; equal content hashes
    /// are taken as proof of equal content.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::RecordNotFound`] if no row has `id`.
    pub fn update_hash(
        &self,
        id: i64,
        content_hash: &str,
        quick_hash: Option<&str>,
    ) -> RepositoryResult<()> {
        let changed = self.conn.execute(
            "UPDATE files SET content_hash = ?1, quick_hash = COALESCE(?2, quick_hash) WHERE id = ?3",
            params![content_hash, quick_hash, id],
        )?;
        if changed == 0 {
            return Err(RepositoryError::RecordNotFound(id));
        }
        Ok(())
    }

    /// Store a probabilistic fingerprint of one record, tagged with its strategy.
    ///
    /// The content hash is left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::RecordNotFound`] if no row has `id`.
    pub fn update_partial_hash(
        &self,
        id: i64,
        strategy: HashStrategy,
        partial_hash: &str,
        quick_hash: Option<&str>,
    ) -> RepositoryResult<()> {
        let changed = self.conn.execute(
            "UPDATE files SET partial_hash = ?1, partial_strategy = ?2,
                 quick_hash = COALESCE(?3, quick_hash)
             WHERE id = ?4",
            params![partial_hash, strategy.name(), quick_hash, id],
        )?;
        if changed == 0 {
            return Err(RepositoryError::RecordNotFound(id));
        }
        Ok(())
    }

    /// Stored records bucketed by size, keeping only sizes shared by 2+ records.
    ///
    /// # Errors
    ///
    /// Propagates SQLite failures.
    pub fn duplicate_candidates_by_size(
        &self,
        min_size: u64,
    ) -> RepositoryResult<HashMap<u64, Vec<FileRecord>>> {
        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM files WHERE size >= ?1 AND {SIZE_COLLIDES} ORDER BY size DESC, path"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![to_sql_size(min_size)], record_from_row)?;

        let mut buckets: HashMap<u64, Vec<FileRecord>> = HashMap::new();
        for record in rows {
            let record = record?;
            buckets.entry(record.size).or_default().push(record);
        }
        Ok(buckets)
    }

    /// Look up one record by path.
    ///
    /// # Errors
    ///
    /// Propagates SQLite failures.
    pub fn find_by_path(&self, path: &Path) -> RepositoryResult<Option<FileRecord>> {
        let sql = format!("SELECT {SELECT_COLUMNS} FROM files WHERE path = ?1");
        let record = self
            .conn
            .query_row(&sql, params![path.to_string_lossy()], record_from_row)
            .optional()?;
        Ok(record)
    }

    /// Every stored record, ordered by path.
    ///
    /// # Errors
    ///
    /// Propagates SQLite failures.
    pub fn all_records(&self) -> RepositoryResult<Vec<FileRecord>> {
        let sql = format!("SELECT {SELECT_COLUMNS} FROM files ORDER BY path");
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], record_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Number of stored records.
    ///
    /// # Errors
    ///
    /// Propagates SQLite failures.
    pub fn count_records(&self) -> RepositoryResult<usize> {
        self.count("SELECT COUNT(*) FROM files")
    }

    /// Number of records carrying an exact content hash.
    ///
    /// # Errors
    ///
    /// Propagates SQLite failures.
    pub fn count_hashed(&self) -> RepositoryResult<usize> {
        self.count("SELECT COUNT(*) FROM files WHERE content_hash IS NOT NULL")
    }

    /// Number of records carrying any fingerprint, exact or partial.
    ///
    /// # Errors
    ///
    /// Propagates SQLite failures.
    pub fn count_fingerprinted(&self) -> RepositoryResult<usize> {
        self.count(
            "SELECT COUNT(*) FROM files WHERE content_hash IS NOT NULL OR partial_hash IS NOT NULL",
        )
    }

    fn count(&self, sql: &str) -> RepositoryResult<usize> {
        let n: i64 = self.conn.query_row(sql, [], |row| row.get(0))?;
        Ok(usize::try_from(n).unwrap_or(0))
    }
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<FileRecord> {
    let path: String = row.get(1)?;
    let size: i64 = row.get(2)?;
    Ok(FileRecord {
        id: Some(row.get(0)?),
        path: PathBuf::from(path),
        size: u64::try_from(size).unwrap_or(0),
        modified: from_millis(row.get(3)?),
        accessed: row.get::<_, Option<i64>>(4)?.map(from_millis),
        created: row.get::<_, Option<i64>>(5)?.map(from_millis),
        content_hash: row.get(6)?,
        quick_hash: row.get(7)?,
        partial_hash: row.get(8)?,
        partial_strategy: row
            .get::<_, Option<String>>(9)?
            .as_deref()
            .and_then(HashStrategy::from_name),
    })
}

fn to_sql_size(size: u64) -> i64 {
    i64::try_from(size).unwrap_or(i64::MAX)
}

fn to_millis(time: SystemTime) -> i64 {
    time.duration_since(UNIX_EPOCH)
        .map_or(0, |d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
}

fn from_millis(millis: i64) -> SystemTime {
    UNIX_EPOCH + Duration::from_millis(u64::try_from(millis).unwrap_or(0))
}
