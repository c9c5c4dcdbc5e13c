//! Export-payload serializer: the inverse of the record stream parser.
//!
//! Re-emits structured records in the export's tag format. Fields named
//! `payload` get a bounded entity-repair pass first: upstream export
//! pipelines double-escape that one field, so a fixed sequence of
//! character-reference repairs is applied exactly once before the writer's
//! generic escaping runs. All other fields use default escaping.

use quick_xml::events::{BytesCData, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::error::{PayloadError, Result};
use crate::record::{FieldValue, Record};

/// Field whose content receives the entity-repair pass.
pub const PAYLOAD_FIELD: &str = "payload";

/// Undo one level of entity escaping, in a fixed repair order.
///
/// The order (quote, ampersand, less-than, greater-than, apostrophe) matches
/// the upstream export pipeline's double-escaping and each repair runs over
/// the text exactly once.
pub fn repair_payload_entities(text: &str) -> String {
    text.replace("&quot;", "\"")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&apos;", "'")
}

/// Serializes record trees back into the export wire format.
pub struct RecordSerializer;

impl RecordSerializer {
    /// Emit `records` wrapped in a single `root` element.
    ///
    /// Field content is escaped by the writer; CDATA fields are written as
    /// CDATA sections so their content stays verbatim. `serialize` followed
    /// by `parse` reproduces record content losslessly for any field not
    /// named `payload`; for `payload` it reproduces the pre-double-escaping
    /// text.
    pub fn serialize(root: &str, records: &[Record]) -> Result<String> {
        let mut writer = Writer::new(Vec::new());

        write_event(&mut writer, Event::Start(BytesStart::new(root)))?;
        for record in records {
            Self::write_record(&mut writer, record)?;
        }
        write_event(&mut writer, Event::End(BytesEnd::new(root)))?;

        String::from_utf8(writer.into_inner()).map_err(|e| PayloadError::Write(e.to_string()))
    }

    fn write_record(writer: &mut Writer<Vec<u8>>, record: &Record) -> Result<()> {
        let mut boundary = BytesStart::new(record.name.as_str());
        for (key, value) in record.attributes() {
            boundary.push_attribute((key, value));
        }
        write_event(writer, Event::Start(boundary))?;

        for (name, value) in record.fields() {
            write_event(writer, Event::Start(BytesStart::new(name)))?;
            match value {
                FieldValue::Text(text) => {
                    let content = if name == PAYLOAD_FIELD {
                        repair_payload_entities(text)
                    } else {
                        text.clone()
                    };
                    write_event(writer, Event::Text(BytesText::new(&content)))?;
                }
                FieldValue::CData { cdata } => {
                    let content = if name == PAYLOAD_FIELD {
                        repair_payload_entities(cdata)
                    } else {
                        cdata.clone()
                    };
                    write_event(writer, Event::CData(BytesCData::new(content)))?;
                }
            }
            write_event(writer, Event::End(BytesEnd::new(name)))?;
        }

        write_event(writer, Event::End(BytesEnd::new(record.name.as_str())))
    }
}

fn write_event(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<()> {
    writer
        .write_event(event)
        .map_err(|e| PayloadError::Write(e.to_string()))
}
