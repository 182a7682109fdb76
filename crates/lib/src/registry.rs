//! # Table Registry
//!
//! The static catalog of tables the assistant knows how to talk about. Each
//! mapping binds a table to the trigger keywords that select it, the
//! natural-language aliases users have for its columns, and the visibility
//! split applied to rows shown to non-authenticated sessions.
//!
//! Mappings are plain data: the built-in defaults below can be replaced
//! wholesale from configuration without touching any control flow.

use crate::guard::sql::escape_string;
use crate::types::Row;
use serde::Deserialize;
use std::collections::HashMap;

/// Binds one table to its keywords, field aliases, and visibility policy.
#[derive(Debug, Clone, Deserialize)]
pub struct TableMapping {
    pub table_name: String,
    /// Any of these appearing in a question (case-insensitive) selects this table.
    #[serde(default)]
    pub keywords: Vec<String>,
    /// Natural-language alias -> column name. Many aliases per column; lookups
    /// are case-insensitive.
    #[serde(default)]
    pub field_aliases: HashMap<String, String>,
    /// Columns visible to non-authenticated sessions. `None` means the table
    /// has no visibility split and rows pass through unchanged.
    #[serde(default)]
    pub public_fields: Option<Vec<String>>,
    /// Columns withheld from non-authenticated sessions. Informational; the
    /// projection is driven by `public_fields`.
    #[serde(default)]
    pub restricted_fields: Vec<String>,
    #[serde(default)]
    pub description: String,
}

impl TableMapping {
    /// Translates a natural-language alias to its column name.
    ///
    /// Pure and idempotent: unknown aliases come back unchanged, never an error.
    pub fn translate_alias<'a>(&'a self, alias: &'a str) -> &'a str {
        let lower = alias.to_lowercase();
        self.field_aliases
            .iter()
            .find(|(k, _)| k.to_lowercase() == lower)
            .map(|(_, column)| column.as_str())
            .unwrap_or(alias)
    }

    /// The column users mean when they say a name, if this table has one.
    pub fn name_column(&self) -> Option<&str> {
        let column = self.translate_alias("nama");
        (column != "nama").then_some(column)
    }

    /// Projects rows onto `public_fields` for non-authenticated sessions.
    ///
    /// Authenticated sessions, and tables without a visibility split, see rows
    /// unchanged. The input is never mutated and the row count is preserved.
    pub fn filter_fields_by_auth(&self, rows: &[Row], is_authenticated: bool) -> Vec<Row> {
        let Some(public) = (!is_authenticated).then_some(self.public_fields.as_ref()).flatten()
        else {
            return rows.to_vec();
        };

        rows.iter()
            .map(|row| {
                public
                    .iter()
                    .filter_map(|field| row.get(field).map(|v| (field.clone(), v.clone())))
                    .collect()
            })
            .collect()
    }

    /// Builds `col = 'value' AND ...` from aliased equality conditions.
    pub fn build_where_clause(&self, conditions: &[(&str, &str)]) -> String {
        conditions
            .iter()
            .map(|(alias, value)| {
                format!("{} = '{}'", self.translate_alias(alias), escape_string(value))
            })
            .collect::<Vec<_>>()
            .join(" AND ")
    }

    /// Renders `alias -> column` pairs for prompt context and debug trailers.
    pub fn alias_summary(&self) -> String {
        let mut pairs: Vec<_> = self
            .field_aliases
            .iter()
            .map(|(alias, column)| format!("{alias} -> {column}"))
            .collect();
        pairs.sort();
        pairs.join(", ")
    }
}

/// The ordered set of registered table mappings.
///
/// Keyword detection is intentionally simple: the first mapping in
/// registration order with any keyword contained in the question wins. There
/// is no scoring, so two tables sharing a keyword resolve to whichever was
/// registered first.
#[derive(Debug, Clone, Deserialize)]
#[serde(transparent)]
pub struct TableRegistry {
    mappings: Vec<TableMapping>,
}

impl TableRegistry {
    pub fn new(mappings: Vec<TableMapping>) -> Self {
        Self { mappings }
    }

    /// Finds the mapping whose keywords match the question, if any.
    pub fn find_mapping(&self, question: &str) -> Option<&TableMapping> {
        let lower = question.to_lowercase();
        self.mappings.iter().find(|mapping| {
            mapping
                .keywords
                .iter()
                .any(|keyword| lower.contains(&keyword.to_lowercase()))
        })
    }

    /// Looks a mapping up by its table name.
    pub fn by_table_name(&self, table_name: &str) -> Option<&TableMapping> {
        self.mappings.iter().find(|m| m.table_name == table_name)
    }

    pub fn mappings(&self) -> &[TableMapping] {
        &self.mappings
    }

    pub fn table_names(&self) -> Vec<&str> {
        self.mappings.iter().map(|m| m.table_name.as_str()).collect()
    }
}

impl Default for TableRegistry {
    fn default() -> Self {
        Self::new(vec![observation_card_mapping(), employees_mapping()])
    }
}

fn observation_card_mapping() -> TableMapping {
    let aliases: [(&str, &str); 24] = [
        ("id", "TrackingNum"),
        ("id ob card", "TrackingNum"),
        ("nomor", "TrackingNum"),
        ("nomor tracking", "TrackingNum"),
        ("tracking number", "TrackingNum"),
        ("nama", "EmpName"),
        ("nama orang", "EmpName"),
        ("nama pembuat", "EmpName"),
        ("nama submit", "EmpName"),
        ("orang yang submit", "EmpName"),
        ("orang yang buat", "EmpName"),
        ("pembuat", "EmpName"),
        ("creator", "EmpName"),
        ("atas nama", "EmpName"),
        ("a.n", "EmpName"),
        ("id employee", "EmpID"),
        ("id karyawan", "EmpID"),
        ("employee id", "EmpID"),
        ("badge id", "EmpID"),
        ("evidence", "ImageFinding"),
        ("bukti", "ImageFinding"),
        ("foto", "ImageFinding"),
        ("gambar", "ImageFinding"),
        ("dokumentasi", "ImageFinding"),
    ];

    TableMapping {
        table_name: "RecordOBCard".to_string(),
        keywords: [
            "observation card",
            "ob card",
            "obcard",
            "kartu observasi",
            "observasi",
            "obs card",
            "safety card",
            "laporan observasi",
            "safety observation",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect(),
        field_aliases: aliases
            .iter()
            .map(|(a, c)| (a.to_string(), c.to_string()))
            .collect(),
        public_fields: None,
        restricted_fields: vec![],
        description: "Data observation card (kartu observasi keselamatan kerja)".to_string(),
    }
}

fn employees_mapping() -> TableMapping {
    let aliases: [(&str, &str); 7] = [
        ("nama", "name"),
        ("badge", "badgeId"),
        ("departemen", "department"),
        ("jabatan", "designation"),
        ("email", "email"),
        ("jenis kelamin", "gender"),
        ("status", "employmentStatus"),
    ];

    TableMapping {
        table_name: "employees".to_string(),
        keywords: [
            "karyawan",
            "employee",
            "pegawai",
            "staff",
            "pekerja",
            "tenaga kerja",
            "sdm",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect(),
        field_aliases: aliases
            .iter()
            .map(|(a, c)| (a.to_string(), c.to_string()))
            .collect(),
        public_fields: Some(
            ["name", "department", "designation"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        ),
        restricted_fields: ["badgeId", "email", "gender", "employmentStatus"]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        description: "Data karyawan perusahaan".to_string(),
    }
}
