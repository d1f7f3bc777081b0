mod attribute;
mod historical;
mod resolution;
mod version_record;

pub use attribute::{format_timestamp, parse_timestamp, AttributeSet, AttributeValue, FieldType};
pub use historical::{HistoricalEntity, SnapshotSource};
pub use resolution::{AbsenceReason, Resolution, Snapshot};
pub use version_record::{VersionEvent, VersionRecord};
