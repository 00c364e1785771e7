//! SQLite archive of suite revisions and analyses.
//!
//! Every public method opens its own connection so that callers never
//! manage connection lifetime. Payloads are JSON with a CRC32 checksum that
//! is verified on every read.

use std::path::{Path, PathBuf};

use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};

use crate::analyzer::filesystem::content_hash;
use crate::errors::{ForgeError, ForgeResult};
use crate::models::{Ir, Suite};
use crate::refine::RefinementSession;
use crate::store::codec;
use crate::store::schema;

pub struct SuiteArchive {
    db_path: PathBuf,
}

fn verified(payload: String, stored: i64, what: &str) -> ForgeResult<String> {
    if codec::checksum(&payload) != stored {
        return Err(ForgeError::Store(format!("checksum mismatch for {what}")));
    }
    Ok(payload)
}

impl SuiteArchive {
    /// Open (or create) an archive at `db_path`. Parent directories are
    /// created and the schema is migrated to the current version.
    pub fn open(db_path: impl AsRef<Path>) -> ForgeResult<Self> {
        let db_path = db_path.as_ref().to_path_buf();
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let archive = Self { db_path };
        archive.init_schema()?;
        Ok(archive)
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    fn connect(&self) -> ForgeResult<Connection> {
        let conn = Connection::open(&self.db_path)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(conn)
    }

    fn init_schema(&self) -> ForgeResult<()> {
        let conn = self.connect()?;
        conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        for stmt in schema::SCHEMA_STATEMENTS {
            conn.execute_batch(stmt)?;
        }
        schema::migrate_schema(&conn)
    }

    // -----------------------------------------------------------------------
    // Suite revisions
    // -----------------------------------------------------------------------

    /// Archive one revision. Revisions are immutable: storing the same
    /// revision twice is an error.
    pub fn save_revision(&self, session_id: &str, suite: &Suite) -> ForgeResult<()> {
        let payload = codec::encode_suite(suite)?;
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO sessions(id, language, framework) VALUES(?1, ?2, ?3) \
             ON CONFLICT(id) DO NOTHING;",
            params![session_id, suite.ir.language.as_str(), suite.framework],
        )?;
        let exists: Option<i64> = tx
            .query_row(
                "SELECT 1 FROM suite_revisions WHERE session_id = ?1 AND revision = ?2;",
                params![session_id, suite.revision],
                |row| row.get(0),
            )
            .optional()?;
        if exists.is_some() {
            return Err(ForgeError::Store(format!(
                "revision {} of session {session_id} is already archived",
                suite.revision
            )));
        }
        tx.execute(
            "INSERT INTO suite_revisions(session_id, revision, case_count, coverage, gap_count, payload_json, checksum) \
             VALUES(?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            params![
                session_id,
                suite.revision,
                suite.cases.len() as i64,
                suite.coverage.percentage,
                suite.gaps.len() as i64,
                payload,
                codec::checksum(&payload),
            ],
        )?;
        tx.commit()?;
        info!(session = session_id, revision = suite.revision, "archived suite revision");
        Ok(())
    }

    /// Archive every revision of a session not yet stored. Returns how many
    /// were written.
    pub fn save_session(&self, session_id: &str, session: &RefinementSession) -> ForgeResult<usize> {
        let stored = self.revisions(session_id)?;
        let mut written = 0;
        for revision in session.revisions() {
            if stored.contains(&revision) {
                continue;
            }
            if let Some(suite) = session.revision(revision) {
                self.save_revision(session_id, &suite)?;
                written += 1;
            }
        }
        Ok(written)
    }

    pub fn load_revision(&self, session_id: &str, revision: u32) -> ForgeResult<Option<Suite>> {
        let conn = self.connect()?;
        let row: Option<(String, i64)> = conn
            .query_row(
                "SELECT payload_json, checksum FROM suite_revisions \
                 WHERE session_id = ?1 AND revision = ?2;",
                params![session_id, revision],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        match row {
            Some((payload, stored)) => {
                let what = format!("revision {revision} of session {session_id}");
                let payload = verified(payload, stored, &what)?;
                Ok(Some(codec::decode_suite(&payload)?))
            }
            None => Ok(None),
        }
    }

    pub fn latest(&self, session_id: &str) -> ForgeResult<Option<Suite>> {
        match self.revisions(session_id)?.last() {
            Some(&revision) => self.load_revision(session_id, revision),
            None => Ok(None),
        }
    }

    /// Archived revision numbers of a session, ascending.
    pub fn revisions(&self, session_id: &str) -> ForgeResult<Vec<u32>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT revision FROM suite_revisions WHERE session_id = ?1 ORDER BY revision;",
        )?;
        let rows = stmt.query_map(params![session_id], |row| row.get::<_, u32>(0))?;
        let mut revisions = Vec::new();
        for row in rows {
            revisions.push(row?);
        }
        Ok(revisions)
    }

    /// `(revision, gap count)` per archived revision, ascending, read from
    /// the indexed columns without decoding payloads.
    pub fn gap_history(&self, session_id: &str) -> ForgeResult<Vec<(u32, usize)>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT revision, gap_count FROM suite_revisions WHERE session_id = ?1 ORDER BY revision;",
        )?;
        let rows = stmt.query_map(params![session_id], |row| {
            Ok((row.get::<_, u32>(0)?, row.get::<_, i64>(1)?))
        })?;
        let mut history = Vec::new();
        for row in rows {
            let (revision, gaps) = row?;
            history.push((revision, usize::try_from(gaps).unwrap_or(0)));
        }
        Ok(history)
    }

    // -----------------------------------------------------------------------
    // Analyses
    // -----------------------------------------------------------------------

    /// Store the IR for a source text, keyed by the text's SHA-256. Returns
    /// the key. Re-analysis of identical text replaces the stored IR.
    pub fn save_ir(&self, source_text: &str, ir: &Ir) -> ForgeResult<String> {
        let key = content_hash(source_text);
        let payload = codec::encode_ir(ir)?;
        let conn = self.connect()?;
        conn.execute(
            "INSERT INTO analyses(content_hash, language, strategy, degraded, payload_json, checksum) \
             VALUES(?1, ?2, ?3, ?4, ?5, ?6) \
             ON CONFLICT(content_hash) DO UPDATE SET \
                language = excluded.language, \
                strategy = excluded.strategy, \
                degraded = excluded.degraded, \
                payload_json = excluded.payload_json, \
                checksum = excluded.checksum;",
            params![
                key,
                ir.language.as_str(),
                ir.strategy,
                ir.degraded,
                payload,
                codec::checksum(&payload),
            ],
        )?;
        debug!(hash = %key, callables = ir.callables.len(), "archived analysis");
        Ok(key)
    }

    pub fn load_ir(&self, hash: &str) -> ForgeResult<Option<Ir>> {
        let conn = self.connect()?;
        let row: Option<(String, i64)> = conn
            .query_row(
                "SELECT payload_json, checksum FROM analyses WHERE content_hash = ?1;",
                params![hash],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        match row {
            Some((payload, stored)) => {
                let payload = verified(payload, stored, &format!("analysis {hash}"))?;
                Ok(Some(codec::decode_ir(&payload)?))
            }
            None => Ok(None),
        }
    }

    // -----------------------------------------------------------------------
    // Backup
    // -----------------------------------------------------------------------

    /// Copy the archive to `destination` with the SQLite backup API.
    pub fn backup_to(&self, destination: impl AsRef<Path>) -> ForgeResult<PathBuf> {
        let destination = destination.as_ref().to_path_buf();
        if let Some(parent) = destination.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let src_conn = self.connect()?;
        let mut dst_conn = Connection::open(&destination)?;
        let backup = rusqlite::backup::Backup::new(&src_conn, &mut dst_conn)?;
        backup.run_to_completion(100, std::time::Duration::from_millis(10), None)?;
        info!(path = %destination.display(), "archive backed up");
        Ok(destination)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::analyze;
    use crate::models::{Directive, RefineOp, SourceUnit, SynthesisOptions};
    use crate::synthesis::generate_suite;

    const SRC: &str = "def divide(a: int, b: int):\n    if b == 0:\n        raise ValueError(\"zero\")\n    return a / b\n";

    fn tempdir() -> tempfile::TempDir {
        tempfile::Builder::new().prefix("forge").tempdir().unwrap()
    }

    fn session() -> RefinementSession {
        let ir = analyze(&SourceUnit::new(SRC, "python")).unwrap();
        RefinementSession::new(generate_suite(&ir, &SynthesisOptions::default()))
    }

    #[test]
    fn test_revisions_round_trip() {
        let dir = tempdir();
        let archive = SuiteArchive::open(dir.path().join("nested/forge.db")).unwrap();
        let session = session();
        session
            .apply(&Directive::new("divide", RefineOp::Document))
            .unwrap();

        assert_eq!(archive.save_session("s1", &session).unwrap(), 2);
        assert_eq!(archive.save_session("s1", &session).unwrap(), 0);
        assert_eq!(archive.revisions("s1").unwrap(), vec![1, 2]);

        let latest = archive.latest("s1").unwrap().unwrap();
        assert_eq!(latest, *session.current());
        assert!(archive.load_revision("s1", 7).unwrap().is_none());
        assert!(archive.latest("other").unwrap().is_none());
    }

    #[test]
    fn test_revision_cannot_be_overwritten() {
        let dir = tempdir();
        let archive = SuiteArchive::open(dir.path().join("forge.db")).unwrap();
        let suite = session().current();
        archive.save_revision("s1", &suite).unwrap();
        assert!(matches!(
            archive.save_revision("s1", &suite),
            Err(ForgeError::Store(_))
        ));
    }

    #[test]
    fn test_corrupted_payload_is_detected() {
        let dir = tempdir();
        let archive = SuiteArchive::open(dir.path().join("forge.db")).unwrap();
        archive.save_revision("s1", &session().current()).unwrap();

        let conn = Connection::open(archive.db_path()).unwrap();
        conn.execute(
            "UPDATE suite_revisions SET payload_json = replace(payload_json, 'divide', 'divid3');",
            [],
        )
        .unwrap();
        let err = archive.load_revision("s1", 1).unwrap_err();
        assert!(err.to_string().contains("checksum mismatch"));
    }

    #[test]
    fn test_ir_keyed_by_content_hash() {
        let dir = tempdir();
        let archive = SuiteArchive::open(dir.path().join("forge.db")).unwrap();
        let ir = analyze(&SourceUnit::new(SRC, "python")).unwrap();
        let key = archive.save_ir(SRC, &ir).unwrap();
        assert_eq!(key, content_hash(SRC));
        assert_eq!(archive.load_ir(&key).unwrap(), Some(ir.clone()));
        // Replaying the same text is an upsert.
        archive.save_ir(SRC, &ir).unwrap();
        assert!(archive.load_ir("missing").unwrap().is_none());
    }

    #[test]
    fn test_gap_history_tracks_each_revision() {
        let dir = tempdir();
        let archive = SuiteArchive::open(dir.path().join("forge.db")).unwrap();
        let src = "def tick():\n    if STATE.ready:\n        return 1\n    return 0\n";
        let ir = analyze(&SourceUnit::new(src, "python")).unwrap();
        let gapped = generate_suite(&ir, &SynthesisOptions::default());
        assert_eq!(gapped.gaps.len(), 1);

        archive.save_revision("s1", &session().current()).unwrap();
        archive.save_revision("s2", &gapped).unwrap();
        assert_eq!(archive.gap_history("s1").unwrap(), vec![(1, 0)]);
        assert_eq!(archive.gap_history("s2").unwrap(), vec![(1, 1)]);
        assert!(archive.gap_history("missing").unwrap().is_empty());
    }

    #[test]
    fn test_backup_copies_revisions() {
        let dir = tempdir();
        let archive = SuiteArchive::open(dir.path().join("forge.db")).unwrap();
        archive.save_revision("s1", &session().current()).unwrap();
        let copy = archive.backup_to(dir.path().join("backup/copy.db")).unwrap();
        let restored = SuiteArchive::open(copy).unwrap();
        assert_eq!(restored.revisions("s1").unwrap(), vec![1]);
    }
}
