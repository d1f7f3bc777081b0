//! Schema registry: validated, immutable set of entity kinds.
//!
//! Every descriptor problem is raised here, at registration, so that no
//! reification ever starts against a malformed graph.

use std::collections::{BTreeMap, BTreeSet};

use serde::Deserialize;
use tracing::debug;

use crate::errors::{HindsightError, HindsightResult, ReifyError};
use crate::models::FieldType;

use super::descriptor::{Association, EntityKind, RelationshipDescriptor, ThroughTarget};

#[derive(Debug, Deserialize)]
struct SchemaDocument {
    #[serde(default, rename = "kind")]
    kinds: Vec<EntityKind>,
}

/// Registered entity kinds, keyed by name.
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    kinds: BTreeMap<String, EntityKind>,
    max_depth: usize,
}

impl SchemaRegistry {
    /// Validate and register `kinds`.
    ///
    /// Fails with a configuration error on duplicate names, unknown kinds,
    /// undeclared or non-integer key fields, undeclared ordering fields,
    /// cycles, or a descriptor graph deeper than `max_depth`.
    pub fn new(kinds: Vec<EntityKind>, max_depth: usize) -> HindsightResult<Self> {
        let mut by_name = BTreeMap::new();
        for kind in kinds {
            if by_name.contains_key(&kind.name) {
                return Err(config_err(format!("entity kind {} declared twice", kind.name)));
            }
            by_name.insert(kind.name.clone(), kind);
        }

        let registry = Self {
            kinds: by_name,
            max_depth,
        };

        for kind in registry.kinds.values() {
            registry.validate_kind(kind)?;
        }
        registry.reject_cycles()?;

        for kind in registry.kinds.values() {
            let depth = registry.descriptor_depth(&kind.name);
            if depth > max_depth {
                return Err(config_err(format!(
                    "relationship graph below {} is {depth} levels deep, ceiling is {max_depth}",
                    kind.name
                )));
            }
        }

        debug!("registered {} entity kind(s)", registry.kinds.len());
        Ok(registry)
    }

    /// Load kinds from a TOML document of `[[kind]]` tables.
    pub fn from_toml(toml_str: &str, max_depth: usize) -> HindsightResult<Self> {
        let doc: SchemaDocument =
            toml::from_str(toml_str).map_err(|e| HindsightError::ConfigError(e.to_string()))?;
        Self::new(doc.kinds, max_depth)
    }

    pub fn kind(&self, name: &str) -> HindsightResult<&EntityKind> {
        self.kinds
            .get(name)
            .ok_or_else(|| ReifyError::UnknownKind(name.to_string()).into())
    }

    pub fn relationship(
        &self,
        kind: &str,
        relationship: &str,
    ) -> HindsightResult<&RelationshipDescriptor> {
        self.kind(kind)?
            .relationship_named(relationship)
            .ok_or_else(|| {
                ReifyError::UnknownRelationship {
                    item_type: kind.to_string(),
                    relationship: relationship.to_string(),
                }
                .into()
            })
    }

    pub fn kinds(&self) -> impl Iterator<Item = &EntityKind> {
        self.kinds.values()
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Longest chain of relationships reachable from `kind`, in edges.
    pub fn descriptor_depth(&self, kind: &str) -> usize {
        let mut memo = BTreeMap::new();
        self.depth_from(kind, &mut memo)
    }

    fn depth_from(&self, kind: &str, memo: &mut BTreeMap<String, usize>) -> usize {
        if let Some(depth) = memo.get(kind) {
            return *depth;
        }
        let depth = self
            .kinds
            .get(kind)
            .map(|k| {
                k.relationships
                    .iter()
                    .map(|r| 1 + self.depth_from(&r.target_kind, memo))
                    .max()
                    .unwrap_or(0)
            })
            .unwrap_or(0);
        memo.insert(kind.to_string(), depth);
        depth
    }

    fn validate_kind(&self, kind: &EntityKind) -> HindsightResult<()> {
        let mut field_names = BTreeSet::new();
        for field in &kind.fields {
            if !field_names.insert(field.name.as_str()) {
                return Err(config_err(format!(
                    "field {}.{} declared twice",
                    kind.name, field.name
                )));
            }
        }

        let mut rel_names = BTreeSet::new();
        for rel in &kind.relationships {
            if !rel_names.insert(rel.name.as_str()) {
                return Err(config_err(format!(
                    "relationship {}.{} declared twice",
                    kind.name, rel.name
                )));
            }
            self.validate_relationship(kind, rel)?;
        }
        Ok(())
    }

    fn validate_relationship(
        &self,
        owner: &EntityKind,
        rel: &RelationshipDescriptor,
    ) -> HindsightResult<()> {
        let context = format!("{}.{}", owner.name, rel.name);
        let target = self.kinds.get(&rel.target_kind).ok_or_else(|| {
            config_err(format!("{context}: unknown target kind {}", rel.target_kind))
        })?;

        match &rel.association {
            Association::HasMany { foreign_key } => {
                require_integer_field(target, foreign_key, &context)?;
            }
            Association::Through {
                link_kind,
                link_foreign_key,
                target: through_target,
            } => {
                let link = self.kinds.get(link_kind).ok_or_else(|| {
                    config_err(format!("{context}: unknown link kind {link_kind}"))
                })?;
                require_integer_field(link, link_foreign_key, &context)?;
                match through_target {
                    ThroughTarget::LinkColumn(field) => {
                        require_integer_field(link, field, &context)?;
                    }
                    ThroughTarget::TargetColumn(field) => {
                        require_integer_field(target, field, &context)?;
                    }
                }
                if rel.is_cascade() {
                    return Err(config_err(format!(
                        "{context}: dependent destroy is only supported on has_many"
                    )));
                }
            }
        }

        if let Some(order_field) = &rel.order_by {
            if target.field_type(order_field).is_none() {
                return Err(config_err(format!(
                    "{context}: order_by field {order_field} is not declared on {}",
                    target.name
                )));
            }
        }
        Ok(())
    }

    fn reject_cycles(&self) -> HindsightResult<()> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            Visiting,
            Done,
        }

        fn visit(
            registry: &SchemaRegistry,
            kind: &str,
            marks: &mut BTreeMap<String, Mark>,
            path: &mut Vec<String>,
        ) -> HindsightResult<()> {
            match marks.get(kind) {
                Some(Mark::Done) => return Ok(()),
                Some(Mark::Visiting) => {
                    let start = path.iter().position(|k| k == kind).unwrap_or(0);
                    let mut cycle = path[start..].to_vec();
                    cycle.push(kind.to_string());
                    return Err(config_err(format!(
                        "cyclic relationship graph: {}",
                        cycle.join(" -> ")
                    )));
                }
                None => {}
            }

            marks.insert(kind.to_string(), Mark::Visiting);
            path.push(kind.to_string());
            if let Some(k) = registry.kinds.get(kind) {
                for rel in &k.relationships {
                    visit(registry, &rel.target_kind, marks, path)?;
                }
            }
            path.pop();
            marks.insert(kind.to_string(), Mark::Done);
            Ok(())
        }

        let mut marks = BTreeMap::new();
        for name in self.kinds.keys() {
            visit(self, name, &mut marks, &mut Vec::new())?;
        }
        Ok(())
    }
}

fn require_integer_field(kind: &EntityKind, field: &str, context: &str) -> HindsightResult<()> {
    match kind.field_type(field) {
        Some(FieldType::Integer) => Ok(()),
        Some(other) => Err(config_err(format!(
            "{context}: key field {}.{field} must be integer, is {}",
            kind.name,
            other.as_str()
        ))),
        None => Err(config_err(format!(
            "{context}: key field {}.{field} is not declared",
            kind.name
        ))),
    }
}

fn config_err(message: String) -> HindsightError {
    ReifyError::Configuration(message).into()
}
