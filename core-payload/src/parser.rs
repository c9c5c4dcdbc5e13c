//! Streaming export-payload parser.
//!
//! Converts a tag-structured export payload into a sequence of flat
//! [`Record`]s, driven by a declarative [`FieldSelection`]. The parser is a
//! single-pass, forward-only scanner over `quick-xml` events with three
//! pieces of explicit mutable state:
//!
//! - `current_selection` — capture rules active for the open record, if any
//! - `current_field` — the child tag presently open, if it qualifies
//! - `current_record` — the accumulator for the record being built
//!
//! Records become available incrementally as the stream is read; any reader
//! error fails the whole parse with [`PayloadError::Malformed`] and no
//! partial results are returned.

use std::collections::HashSet;
use std::io::BufRead;

use quick_xml::events::Event;
use quick_xml::Reader;
use tracing::debug;

use crate::error::{PayloadError, Result};
use crate::record::{FieldValue, Record};
use crate::selection::{FieldSelection, FieldSpec};

/// Field that identifies a record for filter membership checks.
pub const SYS_ID_FIELD: &str = "sys_id";

/// Parser configuration: the field selection plus an optional identifier
/// filter. Cheap to clone; one parser can decode many payloads.
#[derive(Debug, Clone)]
pub struct RecordStreamParser {
    selection: FieldSelection,
    filter: Option<HashSet<String>>,
}

impl RecordStreamParser {
    pub fn new(selection: FieldSelection) -> Self {
        Self {
            selection,
            filter: None,
        }
    }

    /// Restrict output to records whose `sys_id` field is in `ids`.
    ///
    /// An empty set disables filtering, matching unfiltered behavior.
    pub fn with_filter<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let set: HashSet<String> = ids.into_iter().map(Into::into).collect();
        self.filter = if set.is_empty() { None } else { Some(set) };
        self
    }

    /// Decode the entire payload, failing on the first reader error.
    pub fn parse<R: BufRead>(&self, reader: R) -> Result<Vec<Record>> {
        self.stream(reader).collect()
    }

    /// Pull-based record stream over the payload.
    pub fn stream<R: BufRead>(&self, reader: R) -> RecordStream<'_, R> {
        let mut xml = Reader::from_reader(reader);
        xml.config_mut().trim_text(true);

        RecordStream {
            reader: xml,
            selection: &self.selection,
            filter: self.filter.as_ref(),
            current_selection: None,
            current_field: None,
            current_record: Record::default(),
            buf: Vec::new(),
            done: false,
        }
    }
}

/// Capture rules for the record currently being accumulated.
struct ActiveSelection<'a> {
    /// Wire tag that opened the record; its close emits the record.
    boundary: String,
    spec: &'a FieldSpec,
}

/// Incremental record sequence over one payload.
///
/// Also usable as an `Iterator<Item = Result<Record>>`. After the first
/// error the stream is exhausted.
pub struct RecordStream<'a, R: BufRead> {
    reader: Reader<R>,
    selection: &'a FieldSelection,
    filter: Option<&'a HashSet<String>>,
    current_selection: Option<ActiveSelection<'a>>,
    current_field: Option<String>,
    current_record: Record,
    buf: Vec<u8>,
    done: bool,
}

impl<'a, R: BufRead> RecordStream<'a, R> {
    /// Advance the scanner until the next record boundary closes, returning
    /// the emitted record, or `None` once the stream ends.
    pub fn next_record(&mut self) -> Result<Option<Record>> {
        if self.done {
            return Ok(None);
        }

        loop {
            self.buf.clear();
            let event = match self.reader.read_event_into(&mut self.buf) {
                Ok(event) => event,
                Err(e) => {
                    self.done = true;
                    return Err(PayloadError::Malformed(e.to_string()));
                }
            };

            match event {
                Event::Start(e) => {
                    // Detach from the read buffer so the record opener can
                    // borrow the scanner state mutably.
                    let e = e.into_owned();
                    let tag = tag_name(e.name().as_ref())?;
                    if let Some(spec) = self.selection.get(&tag) {
                        self.open_record(tag, spec, &e)?;
                    } else {
                        self.open_field(&tag);
                    }
                }
                Event::Empty(e) => {
                    // Self-closing tag: open and close in one step. A
                    // self-closing boundary yields a record with no fields.
                    let e = e.into_owned();
                    let tag = tag_name(e.name().as_ref())?;
                    if let Some(spec) = self.selection.get(&tag) {
                        self.open_record(tag.clone(), spec, &e)?;
                        if let Some(record) = self.close_record() {
                            return Ok(Some(record));
                        }
                    } else {
                        self.current_field = None;
                    }
                }
                Event::Text(e) => {
                    if self.current_selection.is_some() {
                        if let Some(field) = self.current_field.clone() {
                            // Capture once: the first text event wins.
                            if !self.current_record.has_field(&field) {
                                let text = e.unescape().map_err(|e| {
                                    PayloadError::Malformed(e.to_string())
                                })?;
                                self.current_record
                                    .set_field(field, FieldValue::Text(text.into_owned()));
                            }
                        }
                    }
                }
                Event::CData(e) => {
                    if self.current_selection.is_some() {
                        if let Some(field) = self.current_field.clone() {
                            let content = std::str::from_utf8(&e.into_inner())
                                .map_err(|e| PayloadError::Malformed(e.to_string()))?
                                .to_string();
                            // CDATA overwrites any prior plain-text capture.
                            self.current_record
                                .set_field(field, FieldValue::CData { cdata: content });
                        }
                    }
                }
                Event::End(e) => {
                    let tag = tag_name(e.name().as_ref())?;
                    let at_boundary = self
                        .current_selection
                        .as_ref()
                        .is_some_and(|active| active.boundary == tag);

                    if at_boundary {
                        if let Some(record) = self.close_record() {
                            return Ok(Some(record));
                        }
                    } else if self.current_field.as_deref() == Some(tag.as_str()) {
                        self.current_field = None;
                    }
                }
                Event::Eof => {
                    self.done = true;
                    return Ok(None);
                }
                _ => {}
            }
        }
    }

    fn open_record(
        &mut self,
        tag: String,
        spec: &'a FieldSpec,
        start: &quick_xml::events::BytesStart<'_>,
    ) -> Result<()> {
        let name = spec.record_name.clone().unwrap_or_else(|| tag.clone());
        let mut record = Record::new(name);

        for attr in start.attributes() {
            let attr = attr.map_err(|e| PayloadError::Malformed(e.to_string()))?;
            let key = tag_name(attr.key.as_ref())?;
            let value = attr
                .unescape_value()
                .map_err(|e| PayloadError::Malformed(e.to_string()))?;
            record.push_attribute(key, value.into_owned());
        }

        self.current_record = record;
        self.current_selection = Some(ActiveSelection {
            boundary: tag,
            spec,
        });
        self.current_field = None;
        Ok(())
    }

    fn open_field(&mut self, tag: &str) {
        match &self.current_selection {
            Some(active) if active.spec.fields.matches(tag) => {
                self.current_field = Some(tag.to_string());
            }
            Some(_) => {
                // Unlisted tag: its content, if any, is ignored.
                self.current_field = None;
            }
            None => {}
        }
    }

    /// Close the active record boundary, emitting the accumulated record if
    /// it passes the identifier filter. State is reset either way.
    fn close_record(&mut self) -> Option<Record> {
        let record = std::mem::take(&mut self.current_record);
        self.current_selection = None;
        self.current_field = None;

        let passes = match self.filter {
            None => true,
            Some(ids) => record
                .get_field(SYS_ID_FIELD)
                .is_some_and(|v| ids.contains(v.as_str())),
        };

        if passes {
            debug!(record = %record.name, fields = record.field_count(), "emitting record");
            Some(record)
        } else {
            None
        }
    }
}

impl<'a, R: BufRead> Iterator for RecordStream<'a, R> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_record().transpose()
    }
}

fn tag_name(raw: &[u8]) -> Result<String> {
    std::str::from_utf8(raw)
        .map(str::to_string)
        .map_err(|e| PayloadError::Malformed(e.to_string()))
}
