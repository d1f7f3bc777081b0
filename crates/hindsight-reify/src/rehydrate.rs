//! Attribute rehydration: stored JSON payload → typed [`AttributeSet`].
//!
//! Declared fields are converted to their registered type; a mismatch is a
//! deserialization error. Undeclared fields are kept as untyped values so the
//! round trip is lossless. `id` is always the entity's own id.

use serde_json::{Map, Value};
use tracing::warn;

use hindsight_core::errors::{HindsightResult, ReifyError};
use hindsight_core::models::{AttributeSet, AttributeValue};
use hindsight_core::schema::{EntityKind, ID_FIELD};
use hindsight_core::HindsightError;

pub struct Rehydrator<'a> {
    kind: &'a EntityKind,
    strict: bool,
}

impl<'a> Rehydrator<'a> {
    pub fn new(kind: &'a EntityKind, strict: bool) -> Self {
        Self { kind, strict }
    }

    /// Rehydrate a version payload. In permissive mode a required field the
    /// payload lacks is taken from `live` (fetched only when needed), else null.
    pub fn rehydrate<F>(&self, item_id: i64, payload: &str, live: F) -> HindsightResult<AttributeSet>
    where
        F: FnOnce() -> HindsightResult<Option<AttributeSet>>,
    {
        let mut attributes = self.typed(item_id, payload)?;

        let missing: Vec<&str> = self
            .kind
            .fields
            .iter()
            .filter(|spec| spec.required && !attributes.contains(&spec.name))
            .map(|spec| spec.name.as_str())
            .collect();
        if missing.is_empty() {
            return Ok(attributes);
        }

        if self.strict {
            return Err(self.error(item_id, format!("missing required field(s): {}", missing.join(", "))));
        }

        warn!(
            "{}#{item_id}: payload lacks {}, falling back to live values",
            self.kind.name,
            missing.join(", ")
        );
        let live = live()?;
        for field in missing {
            let value = live
                .as_ref()
                .and_then(|attrs| attrs.get(field))
                .cloned()
                .unwrap_or(AttributeValue::Null);
            attributes.insert(field, value);
        }
        Ok(attributes)
    }

    /// Convert a live row. Live rows are authoritative, so no required-field check.
    pub fn from_live(&self, item_id: i64, raw: &str) -> HindsightResult<AttributeSet> {
        self.typed(item_id, raw)
    }

    fn typed(&self, item_id: i64, raw: &str) -> HindsightResult<AttributeSet> {
        let value: Value = serde_json::from_str(raw)
            .map_err(|e| self.error(item_id, format!("invalid JSON: {e}")))?;
        let Value::Object(object) = value else {
            return Err(self.error(item_id, "payload is not a JSON object".to_string()));
        };

        let mut attributes = self.convert(item_id, &object)?;
        attributes.insert(ID_FIELD, item_id);
        Ok(attributes)
    }

    fn convert(&self, item_id: i64, object: &Map<String, Value>) -> HindsightResult<AttributeSet> {
        object
            .iter()
            .filter(|(field, _)| field.as_str() != ID_FIELD)
            .map(|(field, value)| {
                let converted = match self.kind.field_type(field) {
                    Some(field_type) => AttributeValue::from_typed_json(field_type, value)
                        .map_err(|reason| self.error(item_id, format!("field {field}: {reason}")))?,
                    None => AttributeValue::from_json(value),
                };
                Ok::<_, HindsightError>((field.clone(), converted))
            })
            .collect()
    }

    fn error(&self, item_id: i64, reason: String) -> HindsightError {
        ReifyError::Deserialization {
            item_type: self.kind.name.clone(),
            item_id,
            reason,
        }
        .into()
    }
}
