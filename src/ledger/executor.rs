// Transaction Executor - runs statements inside one driver transaction
//
// Rows come back as JSON values, the way a document driver hands back
// result values; callers deserialize the shapes they expect.

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{debug, trace};

use super::digest::{revision_hash, StoredRevision};
use super::statement::{json_path, path_segments, validate_identifier, Filter, Statement};
use crate::error::{LedgerError, LedgerResult};

// ============================================================================
// RESULT SHAPES
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevisionMetadata {
    pub id: String,
    pub version: u64,
    pub tx_id: String,
    pub tx_time: DateTime<Utc>,
}

/// Committed-view row: data plus ledger metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommittedRevision {
    pub hash: String,

    /// `None` for deletion revisions
    pub data: Option<Value>,
    pub metadata: RevisionMetadata,
}

/// Table as listed by the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableInfo {
    pub name: String,
    pub table_id: String,
    pub indexes: Vec<String>,
}

/// Revision row before decoding
struct RawRevision {
    document_id: String,
    version: i64,
    data: Option<String>,
    hash: String,
    tx_id: String,
    tx_time: String,
}

impl RawRevision {
    fn decode(self) -> LedgerResult<CommittedRevision> {
        let version = self.version as u64;
        let corrupt = |reason: String| LedgerError::CorruptRevision {
            document_id: self.document_id.clone(),
            version,
            reason,
        };

        let tx_time = DateTime::parse_from_rfc3339(&self.tx_time)
            .map_err(|e| corrupt(format!("bad txTime: {}", e)))?
            .with_timezone(&Utc);
        let data = match &self.data {
            Some(text) => Some(
                serde_json::from_str(text).map_err(|e| corrupt(format!("bad data: {}", e)))?,
            ),
            None => None,
        };

        Ok(CommittedRevision {
            hash: self.hash.clone(),
            data,
            metadata: RevisionMetadata {
                id: self.document_id.clone(),
                version,
                tx_id: self.tx_id,
                tx_time,
            },
        })
    }
}

// ============================================================================
// EXECUTOR
// ============================================================================

pub struct TransactionExecutor<'t> {
    conn: &'t Connection,
    transaction_id: String,
    tx_time: DateTime<Utc>,
    aborted: bool,
}

impl<'t> TransactionExecutor<'t> {
    /// `conn` must already be inside an open transaction
    pub fn new(conn: &'t Connection) -> Self {
        TransactionExecutor {
            conn,
            transaction_id: uuid::Uuid::new_v4().simple().to_string(),
            tx_time: Utc::now(),
            aborted: false,
        }
    }

    pub fn transaction_id(&self) -> &str {
        &self.transaction_id
    }

    /// Mark the transaction for rollback. The driver discards every write
    /// made so far and still returns the closure's value to the caller.
    pub fn abort(&mut self) {
        debug!(tx_id = %self.transaction_id, "abort requested");
        self.aborted = true;
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted
    }

    pub fn execute(&mut self, statement: &Statement) -> LedgerResult<Vec<Value>> {
        trace!(
            tx_id = %self.transaction_id,
            kind = statement.kind(),
            table = statement.table(),
            "executing statement"
        );

        match statement {
            Statement::CreateTable { table } => self.create_table(table),
            Statement::CreateIndex { table, field } => self.create_index(table, field),
            Statement::Insert { table, document } => self.insert(table, document),
            Statement::AppendToList {
                table,
                filter,
                path,
                values,
            } => self.append_to_list(table, filter, path, values),
            Statement::Delete { table, filter } => self.delete(table, filter.as_ref()),
            Statement::Select { table, filter } => self.select(table, filter.as_ref()),
            Statement::SelectCommitted { table, filter } => {
                let rows = self.committed(table, Some(filter))?;
                rows.into_iter()
                    .map(|row| serde_json::to_value(row).map_err(LedgerError::from))
                    .collect()
            }
            Statement::History { table, document_id } => {
                let rows = self.history(table, document_id)?;
                rows.into_iter()
                    .map(|row| serde_json::to_value(row).map_err(LedgerError::from))
                    .collect()
            }
        }
    }

    // ========================================================================
    // CATALOG
    // ========================================================================

    pub fn table_exists(&self, table: &str) -> LedgerResult<bool> {
        let found = self
            .conn
            .query_row(
                "SELECT 1 FROM ledger_tables WHERE name = ?1",
                params![table],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn index_exists(&self, table: &str, field: &str) -> LedgerResult<bool> {
        let found = self
            .conn
            .query_row(
                "SELECT 1 FROM ledger_indexes WHERE table_name = ?1 AND field = ?2",
                params![table, field],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn require_table(&self, table: &str) -> LedgerResult<()> {
        validate_identifier(table)?;
        if self.table_exists(table)? {
            Ok(())
        } else {
            Err(LedgerError::TableNotFound(table.to_string()))
        }
    }

    pub fn list_table_names(&self) -> LedgerResult<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT name FROM ledger_tables ORDER BY created_at, name")?;
        let names = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(names)
    }

    pub fn list_tables(&self) -> LedgerResult<Vec<TableInfo>> {
        let mut stmt = self
            .conn
            .prepare("SELECT name, table_id FROM ledger_tables ORDER BY created_at, name")?;
        let tables = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;

        let mut index_stmt = self
            .conn
            .prepare("SELECT field FROM ledger_indexes WHERE table_name = ?1 ORDER BY field")?;

        let mut infos = Vec::with_capacity(tables.len());
        for (name, table_id) in tables {
            let indexes = index_stmt
                .query_map(params![name], |row| row.get(0))?
                .collect::<Result<Vec<String>, _>>()?;
            infos.push(TableInfo {
                name,
                table_id,
                indexes,
            });
        }
        Ok(infos)
    }

    fn create_table(&mut self, table: &str) -> LedgerResult<Vec<Value>> {
        validate_identifier(table)?;
        if self.table_exists(table)? {
            return Err(LedgerError::TableAlreadyExists(table.to_string()));
        }

        let table_id = uuid::Uuid::new_v4().simple().to_string();
        self.conn.execute(
            "INSERT INTO ledger_tables (name, table_id, created_at) VALUES (?1, ?2, ?3)",
            params![table, table_id, self.tx_time_string()],
        )?;
        debug!(table, %table_id, "table created");

        Ok(vec![json!({ "tableId": table_id })])
    }

    fn create_index(&mut self, table: &str, field: &str) -> LedgerResult<Vec<Value>> {
        self.require_table(table)?;
        let path = json_path(field)?;

        if self.index_exists(table, field)? {
            return Err(LedgerError::IndexAlreadyExists {
                table: table.to_string(),
                field: field.to_string(),
            });
        }

        self.conn.execute(
            "INSERT INTO ledger_indexes (table_name, field, created_at) VALUES (?1, ?2, ?3)",
            params![table, field, self.tx_time_string()],
        )?;

        // Identifiers are validated above, so they are safe to inline. Lookups
        // must repeat this expression and predicate verbatim to hit the index.
        self.conn.execute(
            &format!(
                "CREATE INDEX IF NOT EXISTS {} ON documents (json_extract(data, '{}'))
                 WHERE table_name = '{}'",
                index_name(table, field),
                path,
                table
            ),
            [],
        )?;
        debug!(table, field, "index created");

        let table_id: String = self.conn.query_row(
            "SELECT table_id FROM ledger_tables WHERE name = ?1",
            params![table],
            |row| row.get(0),
        )?;
        Ok(vec![json!({ "tableId": table_id })])
    }

    // ========================================================================
    // WRITES
    // ========================================================================

    fn insert(&mut self, table: &str, document: &Value) -> LedgerResult<Vec<Value>> {
        self.require_table(table)?;
        if !document.is_object() {
            return Err(LedgerError::InvalidDocument(format!(
                "expected an object for {}, got {}",
                table, document
            )));
        }

        let document_id = uuid::Uuid::new_v4().simple().to_string();
        self.write_revision(table, &document_id, 0, Some(document), None)?;

        Ok(vec![json!({ "documentId": document_id })])
    }

    fn append_to_list(
        &mut self,
        table: &str,
        filter: &Filter,
        path: &str,
        values: &[Value],
    ) -> LedgerResult<Vec<Value>> {
        let segments = path_segments(path)?;
        let targets = self.committed(table, Some(filter))?;

        let mut updated = Vec::with_capacity(targets.len());
        for target in targets {
            let document_id = target.metadata.id.clone();
            let mut data = target.data.unwrap_or_else(|| Value::Object(Map::new()));

            let list = list_at_path(&mut data, &segments).ok_or_else(|| LedgerError::NotAList {
                document_id: document_id.clone(),
                path: path.to_string(),
            })?;
            list.extend(values.iter().cloned());

            self.write_revision(
                table,
                &document_id,
                target.metadata.version + 1,
                Some(&data),
                Some(&target.hash),
            )?;
            updated.push(json!({ "documentId": document_id }));
        }

        Ok(updated)
    }

    fn delete(&mut self, table: &str, filter: Option<&Filter>) -> LedgerResult<Vec<Value>> {
        let targets = self.committed(table, filter)?;

        let mut deleted = Vec::with_capacity(targets.len());
        for target in targets {
            self.write_revision(
                table,
                &target.metadata.id,
                target.metadata.version + 1,
                None,
                Some(&target.hash),
            )?;
            deleted.push(json!({ "documentId": target.metadata.id }));
        }

        Ok(deleted)
    }

    /// Append one revision to the journal and move the current view
    fn write_revision(
        &mut self,
        table: &str,
        document_id: &str,
        version: u64,
        data: Option<&Value>,
        previous_hash: Option<&str>,
    ) -> LedgerResult<()> {
        let data_text = data.map(serde_json::to_string).transpose()?;
        let hash = revision_hash(previous_hash, table, document_id, version, data_text.as_deref());

        self.conn.execute(
            "INSERT INTO revisions (
                table_name, document_id, version, data, hash, previous_hash, tx_id, tx_time
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                table,
                document_id,
                version as i64,
                data_text,
                hash,
                previous_hash,
                self.transaction_id,
                self.tx_time_string(),
            ],
        )?;

        match data_text {
            Some(text) => {
                self.conn.execute(
                    "INSERT INTO documents (document_id, table_name, version, data)
                     VALUES (?1, ?2, ?3, ?4)
                     ON CONFLICT(document_id) DO UPDATE SET
                        version = excluded.version,
                        data = excluded.data",
                    params![document_id, table, version as i64, text],
                )?;
            }
            None => {
                self.conn.execute(
                    "DELETE FROM documents WHERE document_id = ?1",
                    params![document_id],
                )?;
            }
        }

        trace!(table, document_id, version, "revision written");
        Ok(())
    }

    // ========================================================================
    // READS
    // ========================================================================

    fn select(&mut self, table: &str, filter: Option<&Filter>) -> LedgerResult<Vec<Value>> {
        Ok(self
            .committed(table, filter)?
            .into_iter()
            .filter_map(|row| row.data)
            .collect())
    }

    /// Current revision of every live document matching `filter`
    pub fn committed(
        &self,
        table: &str,
        filter: Option<&Filter>,
    ) -> LedgerResult<Vec<CommittedRevision>> {
        self.require_table(table)?;

        let (sql, values) = self.committed_query(table, filter)?;
        let mut stmt = self.conn.prepare(&sql)?;
        let raw = stmt
            .query_map(params_from_iter(values.iter()), map_raw_revision)?
            .collect::<Result<Vec<_>, _>>()?;

        raw.into_iter().map(RawRevision::decode).collect()
    }

    /// SQL and parameters for the committed view. A filter on an indexed
    /// field goes through that field's expression index.
    fn committed_query(
        &self,
        table: &str,
        filter: Option<&Filter>,
    ) -> LedgerResult<(String, Vec<String>)> {
        let base = "SELECT d.document_id, d.version, d.data, r.hash, r.tx_id, r.tx_time
                    FROM documents d
                    JOIN revisions r ON r.document_id = d.document_id AND r.version = d.version
                    WHERE d.table_name = ?1";

        let Some(filter) = filter else {
            return Ok((format!("{} ORDER BY d.rowid", base), vec![table.to_string()]));
        };

        let path = json_path(&filter.field)?;
        if self.index_exists(table, &filter.field)? {
            // Same literal expression and predicate as in create_index
            let sql = format!(
                "{} AND d.document_id IN (
                    SELECT document_id FROM documents INDEXED BY {}
                    WHERE table_name = '{}' AND json_extract(data, '{}') = ?2
                 )
                 ORDER BY d.rowid",
                base,
                index_name(table, &filter.field),
                table,
                path
            );
            Ok((sql, vec![table.to_string(), filter.value.clone()]))
        } else {
            let sql = format!("{} AND json_extract(d.data, ?2) = ?3 ORDER BY d.rowid", base);
            Ok((sql, vec![table.to_string(), path, filter.value.clone()]))
        }
    }

    /// Every revision of one document in `table`, version ascending
    pub fn history(&self, table: &str, document_id: &str) -> LedgerResult<Vec<CommittedRevision>> {
        self.require_table(table)?;

        let mut stmt = self.conn.prepare(
            "SELECT document_id, version, data, hash, tx_id, tx_time
             FROM revisions
             WHERE table_name = ?1 AND document_id = ?2
             ORDER BY version ASC",
        )?;
        let raw = stmt
            .query_map(params![table, document_id], map_raw_revision)?
            .collect::<Result<Vec<_>, _>>()?;

        raw.into_iter().map(RawRevision::decode).collect()
    }

    /// Journal entries of one document, whatever its table, for verification
    pub fn stored_revisions(&self, document_id: &str) -> LedgerResult<Vec<StoredRevision>> {
        let mut stmt = self.conn.prepare(
            "SELECT table_name, document_id, version, data, hash, previous_hash
             FROM revisions
             WHERE document_id = ?1
             ORDER BY version ASC",
        )?;
        let revisions = stmt
            .query_map(params![document_id], |row| {
                Ok(StoredRevision {
                    table: row.get(0)?,
                    document_id: row.get(1)?,
                    version: row.get::<_, i64>(2)? as u64,
                    data: row.get(3)?,
                    hash: row.get(4)?,
                    previous_hash: row.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(revisions)
    }

    fn tx_time_string(&self) -> String {
        self.tx_time.to_rfc3339_opts(SecondsFormat::Micros, true)
    }
}

fn index_name(table: &str, field: &str) -> String {
    format!("idx_doc_{}_{}", table, field.replace('.', "_"))
}

fn map_raw_revision(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawRevision> {
    Ok(RawRevision {
        document_id: row.get(0)?,
        version: row.get(1)?,
        data: row.get(2)?,
        hash: row.get(3)?,
        tx_id: row.get(4)?,
        tx_time: row.get(5)?,
    })
}

/// Walk `segments` into `doc`, creating missing objects along the way and a
/// missing or null list at the end. `None` if something else is in the way.
fn list_at_path<'v>(doc: &'v mut Value, segments: &[&str]) -> Option<&'v mut Vec<Value>> {
    let (last, parents) = segments.split_last()?;

    let mut current = doc;
    for segment in parents {
        let object = current.as_object_mut()?;
        let next = object
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if next.is_null() {
            *next = Value::Object(Map::new());
        }
        current = next;
    }

    let slot = current
        .as_object_mut()?
        .entry(last.to_string())
        .or_insert(Value::Null);
    if slot.is_null() {
        *slot = Value::Array(Vec::new());
    }
    slot.as_array_mut()
}
