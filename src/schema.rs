//! Schema introspection types and mapping
//!
//! Metadata comes from `pg_table_def`, Redshift's catalog view of column-level
//! table definitions. Each catalog row carries `tablename`, `column`, and
//! `type`; grouping those rows by table yields the schema descriptor the host
//! renders in its datasource explorer.

use std::collections::HashMap;

use serde::Serialize;

use crate::value::Row;

/// Catalog query listing column-level metadata for one schema
pub const COLUMNS_QUERY: &str = "SELECT * FROM pg_table_def WHERE schemaname = $1";

/// Entity kind reported for every catalog table
pub const TABLE_KIND: &str = "TABLE";

/// One column of a warehouse table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Column {
    /// Column name
    pub name: String,
    /// Declared SQL type, as the catalog reports it
    #[serde(rename = "type")]
    pub type_name: String,
}

/// One warehouse table with its columns
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Table {
    /// Table name
    pub name: String,
    /// Entity kind, always [`TABLE_KIND`]
    #[serde(rename = "type")]
    pub kind: String,
    /// Columns in catalog row order
    pub columns: Vec<Column>,
}

impl Table {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: TABLE_KIND.to_string(),
            columns: Vec::new(),
        }
    }
}

/// Schema descriptor for one warehouse schema
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DbSchema {
    /// Tables in first-seen catalog order
    pub tables: Vec<Table>,
}

/// Group catalog rows into a schema descriptor.
///
/// Tables appear in the order their first row is encountered; rows sharing a
/// `tablename` merge into one table with columns appended in row order. Rows
/// without a `tablename` are skipped.
pub fn build_schema(rows: &[Row]) -> DbSchema {
    let mut tables: Vec<Table> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for row in rows {
        let Some(table_name) = row.get_by_name("tablename").and_then(|v| v.as_str()) else {
            continue;
        };

        let column = row
            .get_by_name("column")
            .and_then(|v| v.as_str())
            .unwrap_or_default();
        let type_name = row
            .get_by_name("type")
            .and_then(|v| v.as_str())
            .unwrap_or_default();

        let idx = *index.entry(table_name.to_string()).or_insert_with(|| {
            tables.push(Table::new(table_name));
            tables.len() - 1
        });

        tables[idx].columns.push(Column {
            name: column.to_string(),
            type_name: type_name.to_string(),
        });
    }

    DbSchema { tables }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    fn catalog_row(table: &str, column: &str, type_name: &str) -> Row {
        Row::new(
            vec!["tablename".into(), "column".into(), "type".into()],
            vec![
                Value::String(table.into()),
                Value::String(column.into()),
                Value::String(type_name.into()),
            ],
        )
    }

    #[test]
    fn test_groups_rows_by_table_in_first_seen_order() {
        let rows = vec![
            catalog_row("t1", "a", "int"),
            catalog_row("t1", "b", "text"),
            catalog_row("t2", "c", "int"),
        ];

        let schema = build_schema(&rows);

        assert_eq!(schema.tables.len(), 2);
        assert_eq!(schema.tables[0].name, "t1");
        assert_eq!(schema.tables[0].kind, "TABLE");
        assert_eq!(
            schema.tables[0].columns,
            vec![
                Column {
                    name: "a".into(),
                    type_name: "int".into()
                },
                Column {
                    name: "b".into(),
                    type_name: "text".into()
                },
            ]
        );
        assert_eq!(schema.tables[1].name, "t2");
        assert_eq!(
            schema.tables[1].columns,
            vec![Column {
                name: "c".into(),
                type_name: "int".into()
            }]
        );
    }

    #[test]
    fn test_interleaved_rows_merge_into_one_table() {
        let rows = vec![
            catalog_row("t1", "a", "int"),
            catalog_row("t2", "x", "text"),
            catalog_row("t1", "b", "text"),
        ];

        let schema = build_schema(&rows);

        assert_eq!(schema.tables.len(), 2);
        assert_eq!(schema.tables[0].name, "t1");
        assert_eq!(schema.tables[0].columns.len(), 2);
        assert_eq!(schema.tables[0].columns[1].name, "b");
    }

    #[test]
    fn test_rows_without_tablename_are_skipped() {
        let rows = vec![
            Row::new(vec!["other".into()], vec![Value::String("x".into())]),
            catalog_row("t1", "a", "int"),
        ];

        let schema = build_schema(&rows);
        assert_eq!(schema.tables.len(), 1);
        assert_eq!(schema.tables[0].name, "t1");
    }

    #[test]
    fn test_empty_catalog_yields_empty_schema() {
        assert_eq!(build_schema(&[]), DbSchema::default());
    }

    #[test]
    fn test_schema_serialization_shape() {
        let schema = build_schema(&[catalog_row("users", "id", "integer")]);
        let json = serde_json::to_value(&schema).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "tables": [{
                    "name": "users",
                    "type": "TABLE",
                    "columns": [{"name": "id", "type": "integer"}]
                }]
            })
        );
    }
}
