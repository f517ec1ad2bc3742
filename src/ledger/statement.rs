// Statements - the closed set of operations a transaction can execute
//
// There is no query language here: every statement the application issues
// is one of these shapes. Table names and field paths are validated as
// plain identifiers before they reach SQL.

use serde::Serialize;
use serde_json::Value;

use crate::error::{LedgerError, LedgerResult};

/// Equality filter on a (possibly nested) string field
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    /// Dotted field path, e.g. `Owners.PrimaryOwner.PersonId`
    pub field: String,
    pub value: String,
}

impl Filter {
    pub fn eq(field: impl Into<String>, value: impl Into<String>) -> Self {
        Filter {
            field: field.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    // ========================================================================
    // DDL
    // ========================================================================
    CreateTable {
        table: String,
    },
    CreateIndex {
        table: String,
        field: String,
    },

    // ========================================================================
    // WRITES (each produces one revision per affected document)
    // ========================================================================
    /// Returns `{"documentId": ...}`
    Insert {
        table: String,
        document: Value,
    },
    /// Appends `values` to the list at `path` of every matching document.
    /// A missing or null list is created. Returns `{"documentId": ...}` per update.
    AppendToList {
        table: String,
        filter: Filter,
        path: String,
        values: Vec<Value>,
    },
    /// Returns `{"documentId": ...}` per deleted document
    Delete {
        table: String,
        filter: Option<Filter>,
    },

    // ========================================================================
    // READS
    // ========================================================================
    /// Current user view: returns the data documents
    Select {
        table: String,
        filter: Option<Filter>,
    },
    /// Committed view: returns `{hash, data, metadata: {id, version, txId, txTime}}`
    SelectCommitted {
        table: String,
        filter: Filter,
    },
    /// Every revision of one document, version ascending, committed shape
    History {
        table: String,
        document_id: String,
    },
}

impl Statement {
    pub fn create_table(table: &str) -> Self {
        Statement::CreateTable {
            table: table.to_string(),
        }
    }

    pub fn create_index(table: &str, field: &str) -> Self {
        Statement::CreateIndex {
            table: table.to_string(),
            field: field.to_string(),
        }
    }

    /// Serialize any entity into an insert statement
    pub fn insert<T: Serialize>(table: &str, document: &T) -> LedgerResult<Self> {
        Ok(Statement::Insert {
            table: table.to_string(),
            document: serde_json::to_value(document)?,
        })
    }

    pub fn select_all(table: &str) -> Self {
        Statement::Select {
            table: table.to_string(),
            filter: None,
        }
    }

    pub fn select_where(table: &str, field: &str, value: &str) -> Self {
        Statement::Select {
            table: table.to_string(),
            filter: Some(Filter::eq(field, value)),
        }
    }

    pub fn committed_where(table: &str, field: &str, value: &str) -> Self {
        Statement::SelectCommitted {
            table: table.to_string(),
            filter: Filter::eq(field, value),
        }
    }

    pub fn append_where(table: &str, filter: Filter, path: &str, values: Vec<Value>) -> Self {
        Statement::AppendToList {
            table: table.to_string(),
            filter,
            path: path.to_string(),
            values,
        }
    }

    pub fn history(table: &str, document_id: &str) -> Self {
        Statement::History {
            table: table.to_string(),
            document_id: document_id.to_string(),
        }
    }

    pub fn delete_all(table: &str) -> Self {
        Statement::Delete {
            table: table.to_string(),
            filter: None,
        }
    }

    pub fn table(&self) -> &str {
        match self {
            Statement::CreateTable { table }
            | Statement::CreateIndex { table, .. }
            | Statement::Insert { table, .. }
            | Statement::AppendToList { table, .. }
            | Statement::Delete { table, .. }
            | Statement::Select { table, .. }
            | Statement::SelectCommitted { table, .. }
            | Statement::History { table, .. } => table,
        }
    }

    /// Short verb for logging
    pub fn kind(&self) -> &'static str {
        match self {
            Statement::CreateTable { .. } => "CREATE TABLE",
            Statement::CreateIndex { .. } => "CREATE INDEX",
            Statement::Insert { .. } => "INSERT",
            Statement::AppendToList { .. } => "APPEND",
            Statement::Delete { .. } => "DELETE",
            Statement::Select { .. } => "SELECT",
            Statement::SelectCommitted { .. } => "SELECT COMMITTED",
            Statement::History { .. } => "HISTORY",
        }
    }
}

// ============================================================================
// IDENTIFIERS & FIELD PATHS
// ============================================================================

/// Table names and path segments: ASCII letter or `_`, then letters, digits, `_`
pub fn validate_identifier(name: &str) -> LedgerResult<()> {
    let mut chars = name.chars();
    let valid_head = chars
        .next()
        .map_or(false, |c| c.is_ascii_alphabetic() || c == '_');

    if valid_head && chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        Ok(())
    } else {
        Err(LedgerError::InvalidIdentifier(name.to_string()))
    }
}

/// Split and validate a dotted field path
pub fn path_segments(path: &str) -> LedgerResult<Vec<&str>> {
    let segments: Vec<&str> = path.split('.').collect();
    for segment in &segments {
        validate_identifier(segment)?;
    }
    Ok(segments)
}

/// `Owners.PrimaryOwner.PersonId` -> `$.Owners.PrimaryOwner.PersonId`
pub fn json_path(path: &str) -> LedgerResult<String> {
    let segments = path_segments(path)?;
    Ok(format!("$.{}", segments.join(".")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier_validation() {
        assert!(validate_identifier("VehicleRegistration").is_ok());
        assert!(validate_identifier("_ql_committed").is_ok());
        assert!(validate_identifier("GovId2").is_ok());

        assert!(validate_identifier("").is_err());
        assert!(validate_identifier("2Fast").is_err());
        assert!(validate_identifier("Person; DROP TABLE x").is_err());
        assert!(validate_identifier("Gov-Id").is_err());
    }

    #[test]
    fn test_json_path() {
        assert_eq!(
            json_path("Owners.PrimaryOwner.PersonId").unwrap(),
            "$.Owners.PrimaryOwner.PersonId"
        );
        assert_eq!(json_path("VIN").unwrap(), "$.VIN");
        assert!(json_path("Owners..PersonId").is_err());
        assert!(json_path("Owners.'x'").is_err());
    }

    #[test]
    fn test_insert_serializes_entity() {
        #[derive(Serialize)]
        #[serde(rename_all = "PascalCase")]
        struct Doc {
            gov_id: String,
        }

        let statement = Statement::insert(
            "Person",
            &Doc {
                gov_id: "LEWISR261LL".to_string(),
            },
        )
        .unwrap();

        match &statement {
            Statement::Insert { table, document } => {
                assert_eq!(table, "Person");
                assert_eq!(document["GovId"], "LEWISR261LL");
            }
            other => panic!("unexpected statement {:?}", other),
        }
        assert_eq!(statement.kind(), "INSERT");
        assert_eq!(statement.table(), "Person");
    }
}
