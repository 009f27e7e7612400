//! Durable project store on SQLite.
//!
//! One row per project holds its JSON record; a small `meta` table holds the
//! project list and the active project id. Opening never fails: an unusable
//! database file degrades to an in-memory database, and if even that cannot
//! be created every operation becomes a logged no-op.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use rusqlite::{Connection, OptionalExtension, params};
use serde_json::Value;

use crate::app::domain::project::{ProjectMeta, ProjectState};
use crate::app::infrastructure::error::Result;
use crate::app::services::migration::{self, UpgradedRecord};

const META_PROJECTS: &str = "projects";
const META_CURRENT_PROJECT: &str = "currentProject";

#[derive(Debug, Clone, PartialEq)]
pub enum StoreMode {
    Persistent(PathBuf),
    /// Session-only database after the file could not be opened.
    Memory,
    Unavailable,
}

/// A project read from the store.
#[derive(Debug)]
pub struct LoadedProject {
    pub record: UpgradedRecord,
    /// The on-disk JSON, kept when the record was migrated so it can be
    /// backed up before being overwritten.
    pub original: Option<String>,
}

pub struct ProjectStore {
    conn: Option<Connection>,
    mode: StoreMode,
    writes: u64,
}

fn now_ts() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

fn ensure_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "\
        CREATE TABLE IF NOT EXISTS projects (
          id TEXT PRIMARY KEY,
          data TEXT NOT NULL,
          updated_ts INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS meta (
          key TEXT PRIMARY KEY,
          value TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS legacy_backups (
          id INTEGER PRIMARY KEY,
          project_id TEXT NOT NULL,
          saved_ts INTEGER NOT NULL,
          data TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_legacy_backups_project
          ON legacy_backups(project_id);",
    )?;
    Ok(())
}

fn read_meta(conn: &Connection, key: &str) -> Result<Option<String>> {
    let value = conn
        .query_row("SELECT value FROM meta WHERE key = ?1", params![key], |row| {
            row.get::<_, String>(0)
        })
        .optional()?;
    Ok(value)
}

fn write_meta(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.execute(
        "\
        INSERT INTO meta (key, value) VALUES (?1, ?2)
        ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        params![key, value],
    )?;
    Ok(())
}

fn read_project_list(conn: &Connection) -> Result<Vec<ProjectMeta>> {
    match read_meta(conn, META_PROJECTS)? {
        Some(json) => Ok(serde_json::from_str(&json)?),
        None => Ok(Vec::new()),
    }
}

fn write_project_row(conn: &Connection, project_id: &str, data: &str) -> Result<()> {
    conn.execute(
        "\
        INSERT INTO projects (id, data, updated_ts) VALUES (?1, ?2, ?3)
        ON CONFLICT(id) DO UPDATE SET
          data = excluded.data,
          updated_ts = excluded.updated_ts",
        params![project_id, data, now_ts()],
    )?;
    Ok(())
}

/// Refresh the cached screenshot count of one entry in the project list.
fn refresh_count(conn: &Connection, project_id: &str, count: usize) -> Result<()> {
    let mut list = read_project_list(conn)?;
    if let Some(meta) = list.iter_mut().find(|m| m.id == project_id) {
        if meta.screenshot_count != count {
            meta.screenshot_count = count;
            write_meta(conn, META_PROJECTS, &serde_json::to_string(&list)?)?;
        }
    }
    Ok(())
}

impl ProjectStore {
    /// Open the database at `path`, degrading instead of failing.
    pub fn open(path: &Path) -> Self {
        match Self::open_file(path) {
            Ok(conn) => {
                log::info!("Opened project store at {}", path.display());
                Self {
                    conn: Some(conn),
                    mode: StoreMode::Persistent(path.to_path_buf()),
                    writes: 0,
                }
            }
            Err(e) => {
                log::error!(
                    "Failed to open project store at {}: {}. Changes will not survive a restart.",
                    path.display(),
                    e
                );
                Self::open_in_memory()
            }
        }
    }

    fn open_file(path: &Path) -> Result<Connection> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        ensure_schema(&conn)?;
        Ok(conn)
    }

    pub fn open_in_memory() -> Self {
        let opened = Connection::open_in_memory()
            .map_err(Into::into)
            .and_then(|conn| ensure_schema(&conn).map(|_| conn));
        match opened {
            Ok(conn) => Self {
                conn: Some(conn),
                mode: StoreMode::Memory,
                writes: 0,
            },
            Err(e) => {
                log::error!("In-memory project store unavailable: {}", e);
                Self::unavailable()
            }
        }
    }

    /// A store with no backend at all.
    pub fn unavailable() -> Self {
        Self {
            conn: None,
            mode: StoreMode::Unavailable,
            writes: 0,
        }
    }

    pub fn mode(&self) -> &StoreMode {
        &self.mode
    }

    /// Number of project records written since the store was opened.
    pub fn write_count(&self) -> u64 {
        self.writes
    }

    pub fn load_raw(&self, project_id: &str) -> Result<Option<String>> {
        let Some(conn) = &self.conn else {
            return Ok(None);
        };
        let data = conn
            .query_row("SELECT data FROM projects WHERE id = ?1", params![project_id], |row| {
                row.get::<_, String>(0)
            })
            .optional()?;
        Ok(data)
    }

    /// Read and upgrade a project. `Ok(None)` means no record exists.
    pub fn load_project(&self, project_id: &str, fallback_language: &str) -> Result<Option<LoadedProject>> {
        let Some(data) = self.load_raw(project_id)? else {
            return Ok(None);
        };
        let raw: Value = serde_json::from_str(&data)?;
        let record = migration::upgrade_record(raw, project_id, fallback_language)?;
        let original = record.migrated().then_some(data);
        Ok(Some(LoadedProject { record, original }))
    }

    /// Write a project record and refresh its cached screenshot count in
    /// one transaction.
    pub fn save_project(&mut self, state: &ProjectState) -> Result<()> {
        self.write_project(state, None)
    }

    /// Like [`save_project`](Self::save_project), first keeping `original`
    /// in the legacy backup table.
    pub fn save_migrated_project(&mut self, state: &ProjectState, original: &str) -> Result<()> {
        self.write_project(state, Some(original))
    }

    fn write_project(&mut self, state: &ProjectState, backup: Option<&str>) -> Result<()> {
        let Some(conn) = self.conn.as_mut() else {
            log::debug!("No store backend; project {} kept in memory only", state.id);
            return Ok(());
        };
        let data = migration::serialize_record(state)?;
        let tx = conn.transaction()?;
        if let Some(original) = backup {
            tx.execute(
                "INSERT INTO legacy_backups (project_id, saved_ts, data) VALUES (?1, ?2, ?3)",
                params![state.id, now_ts(), original],
            )?;
        }
        write_project_row(&tx, &state.id, &data)?;
        refresh_count(&tx, &state.id, state.screenshots.len())?;
        tx.commit()?;
        self.writes += 1;
        log::debug!("Saved project {} ({} screenshots)", state.id, state.screenshots.len());
        Ok(())
    }

    pub fn delete_project(&mut self, project_id: &str) -> Result<()> {
        let Some(conn) = self.conn.as_mut() else {
            return Ok(());
        };
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM projects WHERE id = ?1", params![project_id])?;
        let mut list = read_project_list(&tx)?;
        list.retain(|m| m.id != project_id);
        write_meta(&tx, META_PROJECTS, &serde_json::to_string(&list)?)?;
        tx.commit()?;
        Ok(())
    }

    pub fn load_project_list(&self) -> Result<Vec<ProjectMeta>> {
        match &self.conn {
            Some(conn) => read_project_list(conn),
            None => Ok(Vec::new()),
        }
    }

    pub fn save_project_list(&mut self, list: &[ProjectMeta]) -> Result<()> {
        let Some(conn) = &self.conn else {
            return Ok(());
        };
        write_meta(conn, META_PROJECTS, &serde_json::to_string(list)?)
    }

    pub fn current_project(&self) -> Result<Option<String>> {
        let Some(conn) = &self.conn else {
            return Ok(None);
        };
        match read_meta(conn, META_CURRENT_PROJECT)? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    pub fn set_current_project(&mut self, project_id: &str) -> Result<()> {
        let Some(conn) = &self.conn else {
            return Ok(());
        };
        write_meta(conn, META_CURRENT_PROJECT, &serde_json::to_string(project_id)?)
    }

    /// Legacy records kept when migrated projects were first overwritten,
    /// oldest first.
    pub fn legacy_backups(&self, project_id: &str) -> Result<Vec<String>> {
        let Some(conn) = &self.conn else {
            return Ok(Vec::new());
        };
        let mut stmt = conn.prepare(
            "SELECT data FROM legacy_backups WHERE project_id = ?1 ORDER BY id ASC",
        )?;
        let mut rows = stmt.query(params![project_id])?;
        let mut result = Vec::new();
        while let Some(row) = rows.next()? {
            result.push(row.get(0)?);
        }
        Ok(result)
    }

    /// Write a raw record as-is. Used to import records from other tools
    /// and to seed legacy data.
    pub fn put_raw(&mut self, project_id: &str, data: &str) -> Result<()> {
        let Some(conn) = &self.conn else {
            return Ok(());
        };
        write_project_row(conn, project_id, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn meta(id: &str, name: &str) -> ProjectMeta {
        ProjectMeta {
            id: id.to_string(),
            name: name.to_string(),
            screenshot_count: 0,
        }
    }

    #[test]
    fn test_missing_record_is_none() {
        let store = ProjectStore::open_in_memory();
        assert_eq!(store.mode(), &StoreMode::Memory);
        assert!(store.load_project("nope", "en").unwrap().is_none());
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("projects.sqlite3");
        let mut state = ProjectState::new("p1");
        state.add_screenshot("Home");
        state.screenshots[0].settings.screenshot.scale = 33.0;

        {
            let mut store = ProjectStore::open(&path);
            assert_eq!(store.mode(), &StoreMode::Persistent(path.clone()));
            store.save_project_list(&[meta("p1", "First")]).unwrap();
            store.save_project(&state).unwrap();
            assert_eq!(store.write_count(), 1);
        }

        let store = ProjectStore::open(&path);
        let loaded = store.load_project("p1", "en").unwrap().unwrap();
        assert!(!loaded.record.migrated());
        assert!(loaded.original.is_none());
        assert!(loaded.record.state.same_content(&state));
        assert_eq!(store.load_project_list().unwrap()[0].screenshot_count, 1);
    }

    #[test]
    fn test_unopenable_path_degrades_to_memory() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "not a directory").unwrap();
        let mut store = ProjectStore::open(&blocker.join("projects.sqlite3"));
        assert_eq!(store.mode(), &StoreMode::Memory);
        store.save_project(&ProjectState::new("p1")).unwrap();
        assert!(store.load_project("p1", "en").unwrap().is_some());
    }

    #[test]
    fn test_unavailable_store_is_noop() {
        let mut store = ProjectStore::unavailable();
        store.save_project(&ProjectState::new("p1")).unwrap();
        store.set_current_project("p1").unwrap();
        assert!(store.load_project("p1", "en").unwrap().is_none());
        assert!(store.current_project().unwrap().is_none());
        assert_eq!(store.write_count(), 0);
    }

    #[test]
    fn test_legacy_record_is_migrated_on_read_only() {
        let mut store = ProjectStore::open_in_memory();
        let legacy = json!({ "screenshots": [], "background": { "type": "solid" } }).to_string();
        store.put_raw("old", &legacy).unwrap();

        let loaded = store.load_project("old", "en").unwrap().unwrap();
        assert!(loaded.record.migrated());
        assert_eq!(loaded.original.as_deref(), Some(legacy.as_str()));
        // Reading did not touch the stored record.
        assert_eq!(store.load_raw("old").unwrap().as_deref(), Some(legacy.as_str()));

        store.save_migrated_project(&loaded.record.state, &legacy).unwrap();
        assert_eq!(store.legacy_backups("old").unwrap(), vec![legacy]);
        assert!(!store.load_project("old", "en").unwrap().unwrap().record.migrated());
    }

    #[test]
    fn test_delete_removes_record_and_list_entry() {
        let mut store = ProjectStore::open_in_memory();
        store.save_project_list(&[meta("a", "A"), meta("b", "B")]).unwrap();
        store.save_project(&ProjectState::new("a")).unwrap();
        store.delete_project("a").unwrap();
        assert!(store.load_raw("a").unwrap().is_none());
        let list = store.load_project_list().unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].id, "b");
    }

    #[test]
    fn test_current_project_round_trip() {
        let mut store = ProjectStore::open_in_memory();
        assert!(store.current_project().unwrap().is_none());
        store.set_current_project("p7").unwrap();
        assert_eq!(store.current_project().unwrap().as_deref(), Some("p7"));
    }
}
