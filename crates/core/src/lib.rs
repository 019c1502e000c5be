pub mod error;
pub mod field_value;
pub mod fields;
pub mod ids;
pub mod normalize;
pub mod record;
pub mod sdp;

pub use error::CoreError;
pub use field_value::FieldValue;
pub use fields::{FieldDef, FieldKind};
pub use ids::FlowId;
pub use normalize::{Normalized, normalize};
pub use record::{FieldMap, FlowRecord, Patch};
