use rusqlite::types::ValueRef;
use rusqlite::{Connection, Result, params};
use serde_json::Value;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};
use super::models::{NotaFiscal, Record};

pub struct Database {
    conn: Mutex<Connection>,
    path: String,
}

impl Database {
    /// Open (or create) the database file and reset the `notas_fiscais` table.
    ///
    /// Any rows left over from a previous run are discarded.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_str = path.as_ref().to_string_lossy().to_string();
        let conn = Connection::open(&path)?;
        let db = Database { conn: Mutex::new(conn), path: path_str };
        db.reset_notas_table()?;
        Ok(db)
    }

    pub fn get_path(&self) -> String {
        self.path.clone()
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database { conn: Mutex::new(conn), path: ":memory:".to_string() };
        db.reset_notas_table()?;
        Ok(db)
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Drop and recreate `notas_fiscais` with untyped columns and no key.
    pub fn reset_notas_table(&self) -> Result<()> {
        let conn = self.lock();
        conn.execute_batch(
            "
            DROP TABLE IF EXISTS notas_fiscais;
            CREATE TABLE notas_fiscais (
                id,
                empresa,
                valor,
                data
            );
            "
        )
    }

    pub fn insert_nota(&self, nota: &NotaFiscal) -> Result<()> {
        let conn = self.lock();
        conn.execute(
            "INSERT INTO notas_fiscais (id, empresa, valor, data) VALUES (?1, ?2, ?3, ?4)",
            params![nota.id, nota.empresa, nota.valor, nota.data],
        )?;
        Ok(())
    }

    /// Every row of `notas_fiscais`, keyed by column name.
    pub fn get_notas(&self) -> Result<Vec<Record>> {
        let conn = self.lock();
        let mut stmt = conn.prepare("SELECT * FROM notas_fiscais")?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

        let rows = stmt.query_map([], |row| {
            let mut record = Record::new();
            for (i, name) in columns.iter().enumerate() {
                record.insert(name.clone(), value_to_json(row.get_ref(i)?));
            }
            Ok(record)
        })?;

        rows.collect()
    }
}

fn value_to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        // NaN/inf have no JSON form
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        ValueRef::Text(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Value::String(hex::encode(bytes)),
    }
}
