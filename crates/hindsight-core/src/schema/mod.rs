//! Static relationship schema: entity kinds, their fields and relationships.

mod descriptor;
mod registry;

pub use descriptor::{
    Association, CascadePolicy, EntityKind, FieldSpec, RelationshipDescriptor, ThroughTarget,
    ID_FIELD,
};
pub use registry::SchemaRegistry;
