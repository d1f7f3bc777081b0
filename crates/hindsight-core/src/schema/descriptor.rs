//! Relationship descriptors and per-kind field registries.

use serde::{Deserialize, Serialize};

use crate::models::FieldType;

/// Structural identity field present on every entity.
pub const ID_FIELD: &str = "id";

/// One declared field of an entity kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub required: bool,
}

impl FieldSpec {
    pub fn required(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            required: true,
        }
    }

    pub fn optional(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            required: false,
        }
    }
}

/// What destroying the owner means for the collection's members.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CascadePolicy {
    /// Members are destroyed with the owner.
    Destroy,
    /// Members are left alone.
    #[default]
    Keep,
}

/// How the far side of a through-relationship is found from a link row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThroughTarget {
    /// The link row names the target id in this field (join table).
    LinkColumn(String),
    /// The target row names the link id in this field (nested has-many).
    TargetColumn(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Association {
    /// Target rows carry `foreign_key` pointing at the owner.
    HasMany { foreign_key: String },
    /// Link rows of `link_kind` carry `link_foreign_key` pointing at the
    /// owner; `target` leads from each link to the far side.
    Through {
        link_kind: String,
        link_foreign_key: String,
        target: ThroughTarget,
    },
}

/// A named collection declared on an entity kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipDescriptor {
    pub name: String,
    pub target_kind: String,
    pub association: Association,
    #[serde(default)]
    pub cascade: CascadePolicy,
    /// Sort members by this field's value at `as_of` instead of by id.
    #[serde(default)]
    pub order_by: Option<String>,
}

impl RelationshipDescriptor {
    pub fn has_many(
        name: impl Into<String>,
        target_kind: impl Into<String>,
        foreign_key: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            target_kind: target_kind.into(),
            association: Association::HasMany {
                foreign_key: foreign_key.into(),
            },
            cascade: CascadePolicy::Keep,
            order_by: None,
        }
    }

    pub fn through(
        name: impl Into<String>,
        target_kind: impl Into<String>,
        link_kind: impl Into<String>,
        link_foreign_key: impl Into<String>,
        target: ThroughTarget,
    ) -> Self {
        Self {
            name: name.into(),
            target_kind: target_kind.into(),
            association: Association::Through {
                link_kind: link_kind.into(),
                link_foreign_key: link_foreign_key.into(),
                target,
            },
            cascade: CascadePolicy::Keep,
            order_by: None,
        }
    }

    pub fn dependent_destroy(mut self) -> Self {
        self.cascade = CascadePolicy::Destroy;
        self
    }

    pub fn order_by(mut self, field: impl Into<String>) -> Self {
        self.order_by = Some(field.into());
        self
    }

    pub fn is_cascade(&self) -> bool {
        self.cascade == CascadePolicy::Destroy
    }
}

/// An entity kind: its field registry and its collections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityKind {
    pub name: String,
    #[serde(default)]
    pub fields: Vec<FieldSpec>,
    #[serde(default)]
    pub relationships: Vec<RelationshipDescriptor>,
}

impl EntityKind {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            relationships: Vec::new(),
        }
    }

    pub fn field(mut self, spec: FieldSpec) -> Self {
        self.fields.push(spec);
        self
    }

    pub fn relationship(mut self, descriptor: RelationshipDescriptor) -> Self {
        self.relationships.push(descriptor);
        self
    }

    /// Declared type of `name`; `id` is implicitly an integer.
    pub fn field_type(&self, name: &str) -> Option<FieldType> {
        if name == ID_FIELD {
            return Some(FieldType::Integer);
        }
        self.field_spec(name).map(|f| f.field_type)
    }

    pub fn field_spec(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn relationship_named(&self, name: &str) -> Option<&RelationshipDescriptor> {
        self.relationships.iter().find(|r| r.name == name)
    }
}
