//! sqlite-adapter — SQLite implementation of the ResourceRepository port for
//! local/dev.
//!
//! Purpose
//! - Provide a lightweight, file-based record store to run the module locally
//!   without the full host platform.
//! - Implements the `ResourceRepository` trait from the `domain` crate.
//!
//! Notes
//! - Uses `rusqlite` with the `bundled` feature for portability.
//! - `displayoptions` and `parameters` are stored as JSON blobs; that
//!   encoding is internal to this adapter and only has to round-trip through
//!   the store.

use std::collections::BTreeMap;
use std::path::Path;

use domain::{CoreError, DisplayMode, DisplayOptions, ResourceRepository, UrlResource};
use rusqlite::{params, Connection};

/// SQLite-backed record store for local development.
pub struct SqliteRepo {
    conn: std::sync::Mutex<Connection>,
}

impl SqliteRepo {
    /// Open (or create) a SQLite database at the given path and ensure
    /// schema. Missing parent directories are created first.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, CoreError> {
        if let Some(dir) = path.as_ref().parent() {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir).map_err(map_sqerr)?;
            }
        }
        let conn = Connection::open(path).map_err(map_sqerr)?;
        init_schema(&conn)?;
        Ok(Self {
            conn: std::sync::Mutex::new(conn),
        })
    }
}

fn init_schema(conn: &Connection) -> Result<(), CoreError> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS urlresource (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            course INTEGER NOT NULL,
            name TEXT NOT NULL,
            intro TEXT NOT NULL DEFAULT '',
            externalurl TEXT NOT NULL,
            display TEXT NOT NULL DEFAULT 'auto',
            displayoptions TEXT NOT NULL DEFAULT '{}',
            parameters TEXT NOT NULL DEFAULT '{}',
            timeopen INTEGER NOT NULL DEFAULT 0,
            timeclose INTEGER NOT NULL DEFAULT 0,
            timemodified INTEGER NOT NULL DEFAULT 0
        );
        CREATE INDEX IF NOT EXISTS idx_urlresource_course ON urlresource(course);
        "#,
    )
    .map_err(map_sqerr)
}

fn map_sqerr<E: std::fmt::Display>(e: E) -> CoreError {
    CoreError::Repository(format!("sqlite error: {e}"))
}

fn encode_options(options: &DisplayOptions) -> Result<String, CoreError> {
    serde_json::to_string(options).map_err(map_sqerr)
}

fn encode_parameters(parameters: &BTreeMap<String, String>) -> Result<String, CoreError> {
    serde_json::to_string(parameters).map_err(map_sqerr)
}

fn row_to_resource(row: &rusqlite::Row) -> Result<UrlResource, CoreError> {
    let id: i64 = row.get(0).map_err(map_sqerr)?;
    let course: i64 = row.get(1).map_err(map_sqerr)?;
    let name: String = row.get(2).map_err(map_sqerr)?;
    let intro: String = row.get(3).map_err(map_sqerr)?;
    let externalurl: String = row.get(4).map_err(map_sqerr)?;
    let display: String = row.get(5).map_err(map_sqerr)?;
    let displayoptions: String = row.get(6).map_err(map_sqerr)?;
    let parameters: String = row.get(7).map_err(map_sqerr)?;
    let timeopen: i64 = row.get(8).map_err(map_sqerr)?;
    let timeclose: i64 = row.get(9).map_err(map_sqerr)?;
    let timemodified: i64 = row.get(10).map_err(map_sqerr)?;

    let display = DisplayMode::parse(&display)
        .ok_or_else(|| CoreError::Repository(format!("bad display mode in db: {display}")))?;
    let display_options: DisplayOptions = serde_json::from_str(&displayoptions)
        .map_err(|e| CoreError::Repository(format!("bad displayoptions in db: {e}")))?;
    let parameters: BTreeMap<String, String> = serde_json::from_str(&parameters)
        .map_err(|e| CoreError::Repository(format!("bad parameters in db: {e}")))?;

    Ok(UrlResource {
        id: id as u64,
        course: course as u64,
        name,
        intro,
        external_url: externalurl,
        display,
        display_options,
        parameters,
        time_open: timeopen as u64,
        time_close: timeclose as u64,
        time_modified: timemodified as u64,
    })
}

const COLUMNS: &str = "id, course, name, intro, externalurl, display, displayoptions, parameters, timeopen, timeclose, timemodified";

impl ResourceRepository for SqliteRepo {
    fn get(&self, id: u64) -> Result<Option<UrlResource>, CoreError> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| CoreError::Repository("mutex poisoned".into()))?;
        let mut stmt = conn
            .prepare(&format!("SELECT {COLUMNS} FROM urlresource WHERE id = ?1"))
            .map_err(map_sqerr)?;
        let mut rows = stmt.query(params![id as i64]).map_err(map_sqerr)?;
        if let Some(row) = rows.next().map_err(map_sqerr)? {
            Ok(Some(row_to_resource(row)?))
        } else {
            Ok(None)
        }
    }

    fn insert(&self, resource: UrlResource) -> Result<u64, CoreError> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| CoreError::Repository("mutex poisoned".into()))?;
        conn.execute(
            "INSERT INTO urlresource (course, name, intro, externalurl, display, displayoptions, parameters, timeopen, timeclose, timemodified)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                resource.course as i64,
                resource.name,
                resource.intro,
                resource.external_url,
                resource.display.as_str(),
                encode_options(&resource.display_options)?,
                encode_parameters(&resource.parameters)?,
                resource.time_open as i64,
                resource.time_close as i64,
                resource.time_modified as i64,
            ],
        )
        .map_err(map_sqerr)?;
        Ok(conn.last_insert_rowid() as u64)
    }

    fn update(&self, resource: &UrlResource) -> Result<(), CoreError> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| CoreError::Repository("mutex poisoned".into()))?;
        let changed = conn
            .execute(
                "UPDATE urlresource SET course = ?2, name = ?3, intro = ?4, externalurl = ?5, display = ?6, displayoptions = ?7, parameters = ?8, timeopen = ?9, timeclose = ?10, timemodified = ?11
                 WHERE id = ?1",
                params![
                    resource.id as i64,
                    resource.course as i64,
                    resource.name,
                    resource.intro,
                    resource.external_url,
                    resource.display.as_str(),
                    encode_options(&resource.display_options)?,
                    encode_parameters(&resource.parameters)?,
                    resource.time_open as i64,
                    resource.time_close as i64,
                    resource.time_modified as i64,
                ],
            )
            .map_err(map_sqerr)?;
        if changed == 0 {
            return Err(CoreError::NotFound);
        }
        Ok(())
    }

    fn delete(&self, id: u64) -> Result<(), CoreError> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| CoreError::Repository("mutex poisoned".into()))?;
        let changed = conn
            .execute("DELETE FROM urlresource WHERE id = ?1", params![id as i64])
            .map_err(map_sqerr)?;
        if changed == 0 {
            return Err(CoreError::NotFound);
        }
        Ok(())
    }

    fn list_by_course(&self, course: u64) -> Result<Vec<UrlResource>, CoreError> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| CoreError::Repository("mutex poisoned".into()))?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {COLUMNS} FROM urlresource WHERE course = ?1 ORDER BY id"
            ))
            .map_err(map_sqerr)?;
        let mut rows = stmt.query(params![course as i64]).map_err(map_sqerr)?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().map_err(map_sqerr)? {
            out.push(row_to_resource(row)?);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn open_temp() -> (tempfile::TempDir, SqliteRepo) {
        let dir = tempfile::tempdir().expect("tempdir");
        let repo = SqliteRepo::new(dir.path().join("test.db")).expect("open");
        (dir, repo)
    }

    fn mk_resource() -> UrlResource {
        let mut parameters = BTreeMap::new();
        parameters.insert("u".to_string(), "userid".to_string());
        UrlResource {
            id: 0,
            course: 5,
            name: "Course page".into(),
            intro: "<p>intro</p>".into(),
            external_url: "http://example.com/?a=1".into(),
            display: DisplayMode::Popup,
            display_options: DisplayOptions {
                popup_width: Some(800),
                popup_height: Some(600),
                ..Default::default()
            },
            parameters,
            time_open: 100,
            time_close: 200,
            time_modified: 1_000,
        }
    }

    #[test]
    fn insert_get_roundtrip() {
        let (_dir, repo) = open_temp();
        let id = repo.insert(mk_resource()).unwrap();
        assert!(id > 0);
        let got = repo.get(id).unwrap().expect("present");
        assert_eq!(got.external_url, "http://example.com/?a=1");
        assert_eq!(got.display, DisplayMode::Popup);
        assert_eq!(got.display_options.popup_geometry(), (800, 600));
        assert_eq!(got.parameters.get("u").map(String::as_str), Some("userid"));
        assert_eq!((got.time_open, got.time_close), (100, 200));
    }

    #[test]
    fn new_creates_missing_parent_dirs() {
        let dir = tempfile::tempdir().expect("tempdir");
        let repo = SqliteRepo::new(dir.path().join("nested/store/test.db")).expect("open");
        let id = repo.insert(mk_resource()).unwrap();
        assert!(repo.get(id).unwrap().is_some());
    }

    #[test]
    fn get_missing_is_none() {
        let (_dir, repo) = open_temp();
        assert!(repo.get(99).unwrap().is_none());
    }

    #[test]
    fn update_changes_row() {
        let (_dir, repo) = open_temp();
        let id = repo.insert(mk_resource()).unwrap();
        let mut r = repo.get(id).unwrap().expect("present");
        r.external_url = "https://example.org/".into();
        r.display = DisplayMode::Auto;
        r.parameters.clear();
        repo.update(&r).unwrap();
        let got = repo.get(id).unwrap().expect("present");
        assert_eq!(got.external_url, "https://example.org/");
        assert_eq!(got.display, DisplayMode::Auto);
        assert!(got.parameters.is_empty());
    }

    #[test]
    fn update_missing_is_not_found() {
        let (_dir, repo) = open_temp();
        let mut r = mk_resource();
        r.id = 77;
        assert!(matches!(repo.update(&r), Err(CoreError::NotFound)));
    }

    #[test]
    fn delete_removes_row() {
        let (_dir, repo) = open_temp();
        let id = repo.insert(mk_resource()).unwrap();
        repo.delete(id).unwrap();
        assert!(repo.get(id).unwrap().is_none());
        assert!(matches!(repo.delete(id), Err(CoreError::NotFound)));
    }

    #[test]
    fn list_by_course_filters() {
        let (_dir, repo) = open_temp();
        repo.insert(mk_resource()).unwrap();
        repo.insert(mk_resource()).unwrap();
        let mut other = mk_resource();
        other.course = 6;
        repo.insert(other).unwrap();
        assert_eq!(repo.list_by_course(5).unwrap().len(), 2);
        assert_eq!(repo.list_by_course(6).unwrap().len(), 1);
    }
}
