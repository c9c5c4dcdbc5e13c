//! # Export Payload Codec
//!
//! Decodes and re-encodes the remote platform's record export payloads.
//!
//! ## Overview
//!
//! Update sets are exported as large tag-structured (XML) payloads. This
//! crate turns those payloads into flat [`Record`]s and back:
//!
//! - **Record Stream Parser** (`parser`): single-pass streaming decoder
//!   driven by a declarative [`FieldSelection`], with optional identifier
//!   filtering
//! - **Record Serializer** (`serializer`): re-emits records in the wire
//!   format, including the `payload`-field entity repair
//! - **Record model** (`record`, `selection`): field values, boundary-tag
//!   attributes, and capture rules
//!
//! ## Components
//!
//! - **`RecordStreamParser`**: converts a payload byte stream into an ordered
//!   record sequence, incrementally
//! - **`RecordSerializer`**: inverse transform with text-escaping fixups for
//!   the double-escaped `payload` field

pub mod error;
pub mod parser;
pub mod record;
pub mod selection;
pub mod serializer;

pub use error::{PayloadError, Result};
pub use parser::{RecordStream, RecordStreamParser, SYS_ID_FIELD};
pub use record::{FieldValue, Record};
pub use selection::{FieldList, FieldSelection, FieldSpec};
pub use serializer::{repair_payload_entities, RecordSerializer, PAYLOAD_FIELD};
