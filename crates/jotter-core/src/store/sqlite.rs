use parking_lot::Mutex;
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::collections::HashMap;
use std::path::Path;
use tracing::warn;

use super::CommandStore;
use crate::error::{CommandError, Result};
use crate::models::{
    Command, CommandAction, CommandFilter, CommandPatch, CommandSource, CommandType, Hotkey,
};

const SCHEMA: &str = r#"
    PRAGMA foreign_keys = ON;
    CREATE TABLE IF NOT EXISTS commands (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        description TEXT,
        command_type TEXT NOT NULL,
        action_type TEXT NOT NULL,
        action_payload TEXT NOT NULL DEFAULT '{}',
        enabled INTEGER NOT NULL DEFAULT 1,
        is_built_in INTEGER NOT NULL DEFAULT 0,
        source TEXT NOT NULL DEFAULT 'user',
        category TEXT,
        created_at INTEGER NOT NULL,
        updated_at INTEGER NOT NULL
    );
    CREATE TABLE IF NOT EXISTS hotkeys (
        id TEXT PRIMARY KEY,
        command_id TEXT NOT NULL REFERENCES commands(id) ON DELETE CASCADE,
        accelerator TEXT NOT NULL UNIQUE,
        is_global INTEGER NOT NULL DEFAULT 0,
        created_at INTEGER NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_hotkeys_command_id ON hotkeys(command_id);
"#;

const COMMAND_COLUMNS: &str = "id, name, description, command_type, action_type, action_payload, \
     enabled, is_built_in, source, category, created_at, updated_at";

const HOTKEY_COLUMNS: &str = "id, command_id, accelerator, is_global, created_at";

/// SQLite-backed command store.
///
/// One connection behind a mutex; every call is a single statement or a
/// single transaction.
pub struct SqliteCommandStore {
    conn: Mutex<Connection>,
}

impl SqliteCommandStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Self::with_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

/// Raw `commands` row before enum/payload decoding.
struct CommandRow {
    id: String,
    name: String,
    description: Option<String>,
    command_type: String,
    action_type: String,
    action_payload: String,
    enabled: bool,
    is_built_in: bool,
    source: String,
    category: Option<String>,
    created_at: i64,
    updated_at: i64,
}

impl CommandRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            description: row.get(2)?,
            command_type: row.get(3)?,
            action_type: row.get(4)?,
            action_payload: row.get(5)?,
            enabled: row.get(6)?,
            is_built_in: row.get(7)?,
            source: row.get(8)?,
            category: row.get(9)?,
            created_at: row.get(10)?,
            updated_at: row.get(11)?,
        })
    }

    fn into_command(self, hotkeys: Vec<Hotkey>) -> Result<Command> {
        let command_type = self
            .command_type
            .parse::<CommandType>()
            .map_err(|e| CommandError::InvalidRecord(format!("command {}: {}", self.id, e)))?;
        let source = self
            .source
            .parse::<CommandSource>()
            .map_err(|e| CommandError::InvalidRecord(format!("command {}: {}", self.id, e)))?;
        let payload = serde_json::from_str(&self.action_payload)?;
        let action = CommandAction::from_parts(&self.action_type, payload)?;

        Ok(Command {
            id: self.id,
            name: self.name,
            description: self.description,
            command_type,
            action,
            enabled: self.enabled,
            is_built_in: self.is_built_in,
            source,
            category: self.category,
            hotkeys,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

fn hotkey_from_row(row: &Row<'_>) -> rusqlite::Result<Hotkey> {
    Ok(Hotkey {
        id: row.get(0)?,
        command_id: row.get(1)?,
        accelerator: row.get(2)?,
        is_global: row.get(3)?,
        created_at: row.get(4)?,
    })
}

fn hotkeys_for_command(conn: &Connection, command_id: &str) -> rusqlite::Result<Vec<Hotkey>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {HOTKEY_COLUMNS} FROM hotkeys WHERE command_id = ? ORDER BY rowid"
    ))?;
    let hotkeys = stmt
        .query_map(params![command_id], hotkey_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(hotkeys)
}

fn hotkey_by_accelerator(conn: &Connection, accelerator: &str) -> rusqlite::Result<Option<Hotkey>> {
    conn.query_row(
        &format!("SELECT {HOTKEY_COLUMNS} FROM hotkeys WHERE accelerator = ?"),
        params![accelerator],
        hotkey_from_row,
    )
    .optional()
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

/// Translate a UNIQUE(accelerator) violation into a conflict naming the
/// command that already holds the accelerator.
fn hotkey_write_error(conn: &Connection, accelerator: &str, err: rusqlite::Error) -> CommandError {
    if !is_unique_violation(&err) {
        return CommandError::Storage(err);
    }
    let command_id = hotkey_by_accelerator(conn, accelerator)
        .ok()
        .flatten()
        .map(|h| h.command_id)
        .unwrap_or_default();
    CommandError::AcceleratorConflict {
        accelerator: accelerator.to_string(),
        command_id,
    }
}

fn insert_hotkey(conn: &Connection, hotkey: &Hotkey) -> Result<()> {
    conn.execute(
        &format!("INSERT INTO hotkeys ({HOTKEY_COLUMNS}) VALUES (?, ?, ?, ?, ?)"),
        params![
            hotkey.id,
            hotkey.command_id,
            hotkey.accelerator,
            hotkey.is_global,
            hotkey.created_at,
        ],
    )
    .map_err(|e| hotkey_write_error(conn, &hotkey.accelerator, e))?;
    Ok(())
}

impl CommandStore for SqliteCommandStore {
    fn find_command(&self, id: &str) -> Result<Option<Command>> {
        let conn = self.conn.lock();
        let row = conn
            .query_row(
                &format!("SELECT {COMMAND_COLUMNS} FROM commands WHERE id = ?"),
                params![id],
                CommandRow::from_row,
            )
            .optional()?;

        match row {
            Some(row) => {
                let hotkeys = hotkeys_for_command(&conn, id)?;
                row.into_command(hotkeys).map(Some)
            }
            None => Ok(None),
        }
    }

    fn find_commands(&self, filter: &CommandFilter) -> Result<Vec<Command>> {
        let conn = self.conn.lock();

        let mut sql = format!("SELECT {COMMAND_COLUMNS} FROM commands WHERE 1 = 1");
        let mut values: Vec<SqlValue> = Vec::new();
        if let Some(command_type) = filter.command_type {
            sql.push_str(" AND command_type = ?");
            values.push(SqlValue::Text(command_type.as_str().to_string()));
        }
        if let Some(enabled) = filter.enabled {
            sql.push_str(" AND enabled = ?");
            values.push(SqlValue::Integer(enabled as i64));
        }
        sql.push_str(" ORDER BY rowid");

        let rows = {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params_from_iter(values.iter()), CommandRow::from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            rows
        };

        let mut hotkeys: HashMap<String, Vec<Hotkey>> = HashMap::new();
        {
            let mut stmt = conn.prepare(&format!("SELECT {HOTKEY_COLUMNS} FROM hotkeys ORDER BY rowid"))?;
            for hotkey in stmt.query_map([], hotkey_from_row)? {
                let hotkey = hotkey?;
                hotkeys.entry(hotkey.command_id.clone()).or_default().push(hotkey);
            }
        }

        // A row that no longer decodes is left out so the rest still load
        let mut commands = Vec::with_capacity(rows.len());
        for row in rows {
            let id = row.id.clone();
            let attached = hotkeys.remove(&id).unwrap_or_default();
            match row.into_command(attached) {
                Ok(command) => commands.push(command),
                Err(e) => warn!(command_id = %id, error = %e, "Skipping unreadable command row"),
            }
        }
        Ok(commands)
    }

    fn create_command(&self, command: &Command) -> Result<()> {
        let payload = serde_json::to_string(&command.action.payload())?;
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        tx.execute(
            &format!(
                "INSERT INTO commands ({COMMAND_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
            ),
            params![
                command.id,
                command.name,
                command.description,
                command.command_type.as_str(),
                command.action.action_type(),
                payload,
                command.enabled,
                command.is_built_in,
                command.source.as_str(),
                command.category,
                command.created_at,
                command.updated_at,
            ],
        )?;
        for hotkey in &command.hotkeys {
            insert_hotkey(&tx, hotkey)?;
        }
        tx.commit()?;
        Ok(())
    }

    fn update_command(&self, id: &str, patch: &CommandPatch, updated_at: i64) -> Result<bool> {
        let mut assignments: Vec<&str> = Vec::new();
        let mut values: Vec<SqlValue> = Vec::new();

        if let Some(name) = &patch.name {
            assignments.push("name = ?");
            values.push(SqlValue::Text(name.clone()));
        }
        if let Some(description) = &patch.description {
            assignments.push("description = ?");
            values.push(SqlValue::Text(description.clone()));
        }
        if let Some(enabled) = patch.enabled {
            assignments.push("enabled = ?");
            values.push(SqlValue::Integer(enabled as i64));
        }
        if let Some(action) = &patch.action {
            assignments.push("action_type = ?");
            values.push(SqlValue::Text(action.action_type().to_string()));
            assignments.push("action_payload = ?");
            values.push(SqlValue::Text(serde_json::to_string(&action.payload())?));
        }
        if let Some(category) = &patch.category {
            assignments.push("category = ?");
            values.push(SqlValue::Text(category.clone()));
        }
        assignments.push("updated_at = ?");
        values.push(SqlValue::Integer(updated_at));
        values.push(SqlValue::Text(id.to_string()));

        let sql = format!("UPDATE commands SET {} WHERE id = ?", assignments.join(", "));
        let conn = self.conn.lock();
        let changed = conn.execute(&sql, params_from_iter(values.iter()))?;
        Ok(changed > 0)
    }

    fn delete_command(&self, id: &str) -> Result<bool> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM hotkeys WHERE command_id = ?", params![id])?;
        let deleted = tx.execute("DELETE FROM commands WHERE id = ?", params![id])?;
        tx.commit()?;
        Ok(deleted > 0)
    }

    fn find_hotkey(&self, id: &str) -> Result<Option<Hotkey>> {
        let conn = self.conn.lock();
        let hotkey = conn
            .query_row(
                &format!("SELECT {HOTKEY_COLUMNS} FROM hotkeys WHERE id = ?"),
                params![id],
                hotkey_from_row,
            )
            .optional()?;
        Ok(hotkey)
    }

    fn find_hotkey_by_accelerator(&self, accelerator: &str) -> Result<Option<Hotkey>> {
        let conn = self.conn.lock();
        Ok(hotkey_by_accelerator(&conn, accelerator)?)
    }

    fn create_hotkey(&self, hotkey: &Hotkey) -> Result<()> {
        let conn = self.conn.lock();
        insert_hotkey(&conn, hotkey)
    }

    fn update_hotkey_accelerator(&self, id: &str, accelerator: &str) -> Result<bool> {
        let conn = self.conn.lock();
        let changed = conn
            .execute(
                "UPDATE hotkeys SET accelerator = ? WHERE id = ?",
                params![accelerator, id],
            )
            .map_err(|e| hotkey_write_error(&conn, accelerator, e))?;
        Ok(changed > 0)
    }

    fn delete_hotkey(&self, id: &str) -> Result<bool> {
        let conn = self.conn.lock();
        let deleted = conn.execute("DELETE FROM hotkeys WHERE id = ?", params![id])?;
        Ok(deleted > 0)
    }
}
