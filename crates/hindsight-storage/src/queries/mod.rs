//! Raw SQL operations. Each module owns one table.

pub mod entity_ops;
pub mod version_ops;

/// JSON path addressing a top-level payload field.
pub(crate) fn json_field_path(field: &str) -> String {
    format!("$.\"{field}\"")
}
