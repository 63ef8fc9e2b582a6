//! LDIF decoder

use crate::control::Control;
use crate::error::{ErrorKind, LdifError};
use crate::record::{
    push_value, Attribute, ChangeKind, ChangeRecord, ChangeType, Entry, LdifRecord, Modification,
    ModificationType, CHANGETYPE, CONTROL, DELETEOLDRDN, DN, MOD_SPEC_END, NEWRDN, NEWSUPERIOR, VERSION,
};
use crate::value::{FileUrlFetcher, ResourceFetcher, ValueSource};
use std::io::BufRead;
use std::sync::Arc;
use tracing::{debug, trace};

const CONTINUATION: u8 = b' ';
const COMMENT: u8 = b'#';
const NEWLINE: u8 = b'\n';
const CARRIAGE_RETURN: u8 = b'\r';

/// A logical line, with continuations already joined
#[derive(Debug, Clone)]
struct Line {
    /// Physical line number of the first line
    number: usize,
    bytes: Vec<u8>,
}

impl Line {
    /// Split into the name and everything after the first colon
    fn split(&self) -> Result<(&str, &[u8]), LdifError> {
        let colon = self.bytes.iter().position(|&b| b == b':').ok_or_else(|| {
            LdifError::syntax(
                format!("Line '{}' has no ':' separator", String::from_utf8_lossy(&self.bytes)),
                self.number,
            )
        })?;
        let name = std::str::from_utf8(&self.bytes[..colon])
            .map_err(|_| LdifError::syntax("Attribute name is not valid UTF-8", self.number))?;
        if name.is_empty() {
            return Err(LdifError::syntax(
                format!("Line '{}' has no name before ':'", String::from_utf8_lossy(&self.bytes)),
                self.number,
            ));
        }
        Ok((name, &self.bytes[colon + 1..]))
    }

    fn is_mod_spec_end(&self) -> bool {
        let end = self.bytes.iter().rposition(|&b| b != b' ').map_or(0, |i| i + 1);
        &self.bytes[..end] == MOD_SPEC_END.as_bytes()
    }

    fn starts_with_name(&self, name: &str) -> bool {
        let name = name.as_bytes();
        self.bytes.len() > name.len()
            && self.bytes[..name.len()].eq_ignore_ascii_case(name)
            && self.bytes[name.len()] == b':'
    }
}

/// Decodes LDIF text into entries and change records
#[derive(Clone)]
pub struct Decoder {
    fetcher: Arc<dyn ResourceFetcher>,
}

impl Decoder {
    /// Create a decoder that resolves `:<` values from `file:` URLs
    pub fn new() -> Self {
        Self {
            fetcher: Arc::new(FileUrlFetcher),
        }
    }

    /// Use `fetcher` to resolve `:<` URL values
    pub fn with_fetcher(mut self, fetcher: impl ResourceFetcher + 'static) -> Self {
        self.fetcher = Arc::new(fetcher);
        self
    }

    /// Iterate over the records of a stream.
    ///
    /// After an error that allows reading to continue, the next call picks
    /// up at the following record. After any other error the iterator ends.
    pub fn records<R: BufRead>(&self, reader: R) -> Records<'_, R> {
        Records {
            decoder: self,
            reader,
            line_number: 0,
            record_line: 0,
            first_record: true,
            finished: false,
        }
    }

    /// Decode every record, stopping at the first error
    pub fn decode(&self, input: &[u8]) -> Result<Vec<LdifRecord>, LdifError> {
        self.records(input).collect()
    }

    /// Decode every record of a string, stopping at the first error
    pub fn decode_str(&self, input: &str) -> Result<Vec<LdifRecord>, LdifError> {
        self.decode(input.as_bytes())
    }

    /// Decode a stream that must contain only change records
    pub fn decode_change_records(&self, input: &[u8]) -> Result<Vec<ChangeRecord>, LdifError> {
        let mut records = self.records(input);
        let mut changes = Vec::new();
        while let Some(record) = records.next() {
            match record? {
                LdifRecord::Change(change) => changes.push(change),
                LdifRecord::Entry(entry) => {
                    return Err(LdifError::syntax(
                        format!("Record for '{}' has no changetype", entry.dn()),
                        records.record_line(),
                    ))
                }
            }
        }
        Ok(changes)
    }

    /// Decode exactly one change record
    pub fn decode_change_record(&self, input: &[u8]) -> Result<ChangeRecord, LdifError> {
        let mut changes = self.decode_change_records(input)?;
        match changes.len() {
            1 => Ok(changes.remove(0)),
            0 => Err(LdifError::new(ErrorKind::SyntaxError, "Input contains no change record", None)),
            n => Err(LdifError::new(
                ErrorKind::SyntaxError,
                format!("Expected a single change record but found {}", n),
                None,
            )),
        }
    }

    fn parse_record(&self, lines: &[Line]) -> Result<LdifRecord, LdifError> {
        let record = RecordParser {
            lines,
            pos: 0,
            changetype_line: lines[0].number,
            fetcher: &*self.fetcher,
        }
        .parse()?;
        trace!(dn = record.dn(), line = lines[0].number, "decoded record");
        Ok(record)
    }
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Streaming record iterator returned by [`Decoder::records`]
pub struct Records<'a, R> {
    decoder: &'a Decoder,
    reader: R,
    line_number: usize,
    record_line: usize,
    first_record: bool,
    finished: bool,
}

impl<R: BufRead> Records<'_, R> {
    /// Line number where the most recently read record starts
    pub fn record_line(&self) -> usize {
        self.record_line
    }

    /// Read the logical lines of the next record along with its raw text
    fn read_record_lines(&mut self) -> Result<Option<(Vec<Line>, Vec<String>)>, LdifError> {
        let mut lines: Vec<Line> = Vec::new();
        let mut raw = Vec::new();
        let mut in_comment = false;
        let mut buf = Vec::new();

        loop {
            buf.clear();
            let read = self.reader.read_until(NEWLINE, &mut buf).map_err(|e| {
                LdifError::structural("Failed to read LDIF input", Some(self.line_number + 1))
                    .with_cause(e)
                    .with_lines(raw.clone())
            })?;
            if read == 0 {
                break;
            }
            self.line_number += 1;

            // Strip LF or CRLF
            if buf.last() == Some(&NEWLINE) {
                buf.pop();
            }
            if buf.last() == Some(&CARRIAGE_RETURN) {
                buf.pop();
            }

            if buf.is_empty() {
                if lines.is_empty() {
                    // Blank lines between records, or after a comment-only block
                    raw.clear();
                    in_comment = false;
                    continue;
                }
                break;
            }
            raw.push(String::from_utf8_lossy(&buf).into_owned());

            // Folded line: join onto the previous logical line
            if buf[0] == CONTINUATION {
                if in_comment {
                    continue;
                }
                match lines.last_mut() {
                    Some(line) => line.bytes.extend_from_slice(&buf[1..]),
                    None => {
                        return Err(LdifError::structural(
                            "Continuation line does not follow a line it could continue",
                            Some(self.line_number),
                        )
                        .with_lines(raw))
                    }
                }
                continue;
            }

            in_comment = buf[0] == COMMENT;
            if in_comment {
                trace!(line = self.line_number, "skipping comment");
                continue;
            }
            lines.push(Line {
                number: self.line_number,
                bytes: buf.clone(),
            });
        }

        Ok(if lines.is_empty() { None } else { Some((lines, raw)) })
    }

    /// Drop a leading `version:` line from the first record
    fn strip_version(&self, lines: &mut Vec<Line>) -> Result<(), LdifError> {
        let first = &lines[0];
        if !first.starts_with_name(VERSION) {
            return Ok(());
        }
        let version = String::from_utf8_lossy(&first.bytes[VERSION.len() + 1..]);
        if version.trim() != "1" {
            return Err(LdifError::structural(
                format!("Unsupported LDIF version '{}'", version.trim()),
                Some(first.number),
            ));
        }
        trace!(line = first.number, "LDIF version 1");
        lines.remove(0);
        Ok(())
    }

    fn next_record(&mut self) -> Option<Result<LdifRecord, LdifError>> {
        loop {
            let (mut lines, raw) = match self.read_record_lines() {
                Ok(Some(record)) => record,
                Ok(None) => return None,
                Err(e) => return Some(Err(e)),
            };
            if self.first_record {
                self.first_record = false;
                if let Err(e) = self.strip_version(&mut lines) {
                    return Some(Err(e.with_lines(raw)));
                }
                if lines.is_empty() {
                    continue;
                }
            }
            self.record_line = lines[0].number;
            return Some(self.decoder.parse_record(&lines).map_err(|e| e.with_lines(raw)));
        }
    }
}

impl<R: BufRead> Iterator for Records<'_, R> {
    type Item = Result<LdifRecord, LdifError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        let result = self.next_record();
        match &result {
            Some(Err(e)) => {
                debug!(
                    error = %e,
                    may_continue = e.may_continue_reading(),
                    "failed to decode LDIF record"
                );
                if !e.may_continue_reading() {
                    self.finished = true;
                }
            }
            None => self.finished = true,
            Some(Ok(_)) => {}
        }
        result
    }
}

/// Parses one record: dn, controls, changetype, then the kind-specific body
struct RecordParser<'a> {
    lines: &'a [Line],
    pos: usize,
    changetype_line: usize,
    fetcher: &'a dyn ResourceFetcher,
}

impl<'a> RecordParser<'a> {
    fn peek(&self) -> Option<&'a Line> {
        self.lines.get(self.pos)
    }

    fn value(&self, line: &Line, after_colon: &[u8]) -> Result<Vec<u8>, LdifError> {
        ValueSource::parse(after_colon).resolve(line.number, self.fetcher)
    }

    fn text(&self, line: &Line, after_colon: &[u8], what: &str) -> Result<String, LdifError> {
        String::from_utf8(self.value(line, after_colon)?)
            .map_err(|_| LdifError::encoding(format!("{} is not valid UTF-8", what), line.number))
    }

    fn parse(mut self) -> Result<LdifRecord, LdifError> {
        let dn = self.parse_dn()?;
        let controls = self.parse_controls()?;

        match self.parse_change_type()? {
            Some(change_type) => {
                let kind = match change_type {
                    ChangeType::Add => self.parse_add()?,
                    ChangeType::Delete => self.parse_delete()?,
                    ChangeType::Modify => self.parse_modify()?,
                    ChangeType::ModDn => self.parse_rename()?,
                };
                Ok(LdifRecord::Change(ChangeRecord::new(dn, kind).with_controls(controls)))
            }
            None if !controls.is_empty() => {
                let line_number = self.peek().map_or(self.lines[self.pos - 1].number, |l| l.number);
                Err(LdifError::syntax(
                    "Controls are only allowed in change records; expected a 'changetype' line",
                    line_number,
                ))
            }
            None => {
                let attributes = self.parse_attributes()?;
                if attributes.is_empty() {
                    return Err(LdifError::syntax(
                        format!("Entry '{}' has no attributes", dn),
                        self.lines[0].number,
                    ));
                }
                Ok(LdifRecord::Entry(Entry::from_parts(dn, attributes)))
            }
        }
    }

    fn parse_dn(&mut self) -> Result<String, LdifError> {
        let line = &self.lines[0];
        let (name, rest) = line.split()?;
        if !name.eq_ignore_ascii_case(DN) {
            return Err(LdifError::syntax(
                format!("Record must start with a 'dn' line, found '{}'", name),
                line.number,
            ));
        }
        self.pos = 1;
        self.text(line, rest, "DN")
    }

    fn parse_controls(&mut self) -> Result<Vec<Control>, LdifError> {
        let mut controls = Vec::new();
        while let Some(line) = self.peek() {
            let (name, rest) = line.split()?;
            if !name.eq_ignore_ascii_case(CONTROL) {
                break;
            }
            controls.push(Control::parse(rest, line.number, self.fetcher)?);
            self.pos += 1;
        }
        Ok(controls)
    }

    fn parse_change_type(&mut self) -> Result<Option<ChangeType>, LdifError> {
        let line = match self.peek() {
            Some(line) => line,
            None => return Ok(None),
        };
        let (name, rest) = line.split()?;
        if !name.eq_ignore_ascii_case(CHANGETYPE) {
            return Ok(None);
        }
        self.pos += 1;
        self.changetype_line = line.number;
        let keyword = self.text(line, rest, "changetype")?;
        ChangeType::parse(&keyword).map(Some).ok_or_else(|| {
            LdifError::syntax(
                format!(
                    "Invalid changetype '{}': expected add, delete, modify, moddn or modrdn",
                    keyword.trim()
                ),
                line.number,
            )
        })
    }

    fn parse_attributes(&mut self) -> Result<Vec<Attribute>, LdifError> {
        let mut attributes = Vec::new();
        while let Some(line) = self.peek() {
            let (name, rest) = line.split()?;
            let value = self.value(line, rest)?;
            push_value(&mut attributes, name, value);
            self.pos += 1;
        }
        Ok(attributes)
    }

    fn parse_add(&mut self) -> Result<ChangeKind, LdifError> {
        let attributes = self.parse_attributes()?;
        if attributes.is_empty() {
            return Err(LdifError::syntax("Add change record has no attributes", self.changetype_line));
        }
        Ok(ChangeKind::Add { attributes })
    }

    fn parse_delete(&mut self) -> Result<ChangeKind, LdifError> {
        match self.peek() {
            Some(line) => Err(LdifError::syntax(
                "Delete change record must not contain any further lines",
                line.number,
            )),
            None => Ok(ChangeKind::Delete),
        }
    }

    fn parse_modify(&mut self) -> Result<ChangeKind, LdifError> {
        let mut modifications = Vec::new();

        while let Some(line) = self.peek() {
            // `<op>: <attribute>` header
            self.pos += 1;
            let (keyword, rest) = line.split()?;
            let operation = ModificationType::parse(keyword).ok_or_else(|| {
                LdifError::syntax(
                    format!(
                        "Invalid modification type '{}': expected add, delete, replace or increment",
                        keyword
                    ),
                    line.number,
                )
            })?;
            let attribute = self.text(line, rest, "Modification attribute name")?.trim().to_string();
            if attribute.is_empty() {
                return Err(LdifError::syntax("Modification has no attribute name", line.number));
            }

            // Values up to the `-` line, or the end of the record
            let mut values = Vec::new();
            while let Some(value_line) = self.peek() {
                self.pos += 1;
                if value_line.is_mod_spec_end() {
                    break;
                }
                let (name, rest) = value_line.split()?;
                if !name.eq_ignore_ascii_case(&attribute) {
                    return Err(LdifError::syntax(
                        format!(
                            "Attribute '{}' does not match modification attribute '{}' (missing '-' line?)",
                            name, attribute
                        ),
                        value_line.number,
                    ));
                }
                values.push(self.value(value_line, rest)?);
            }

            match operation {
                ModificationType::Add if values.is_empty() => {
                    return Err(LdifError::syntax(
                        format!("Add modification of '{}' has no values", attribute),
                        line.number,
                    ))
                }
                ModificationType::Increment if values.len() != 1 => {
                    return Err(LdifError::syntax(
                        format!("Increment modification of '{}' needs exactly one value", attribute),
                        line.number,
                    ))
                }
                _ => {}
            }
            modifications.push(Modification::new(operation, attribute, values));
        }

        Ok(ChangeKind::Modify { modifications })
    }

    fn expect(&mut self, name: &str) -> Result<(&'a Line, &'a [u8]), LdifError> {
        let line = self.peek().ok_or_else(|| {
            LdifError::syntax(
                format!("Missing '{}' line in moddn change record", name),
                self.changetype_line,
            )
        })?;
        let (found, rest) = line.split()?;
        if !found.eq_ignore_ascii_case(name) {
            return Err(LdifError::syntax(
                format!("Expected '{}' but found '{}'", name, found),
                line.number,
            ));
        }
        self.pos += 1;
        Ok((line, rest))
    }

    fn parse_rename(&mut self) -> Result<ChangeKind, LdifError> {
        let (line, rest) = self.expect(NEWRDN)?;
        let new_rdn = self.text(line, rest, "New RDN")?;

        let (line, rest) = self.expect(DELETEOLDRDN)?;
        let flag = self.text(line, rest, "deleteoldrdn")?;
        let delete_old_rdn = match flag.trim() {
            "1" | "true" => true,
            "0" | "false" => false,
            other => {
                return Err(LdifError::syntax(
                    format!("Invalid deleteoldrdn value '{}': expected 0 or 1", other),
                    line.number,
                ))
            }
        };

        let mut new_superior = None;
        if let Some(line) = self.peek() {
            let (name, rest) = line.split()?;
            if !name.eq_ignore_ascii_case(NEWSUPERIOR) {
                return Err(LdifError::syntax(
                    format!("Unexpected '{}' line in moddn change record", name),
                    line.number,
                ));
            }
            self.pos += 1;
            new_superior = Some(self.text(line, rest, "New superior DN")?);
        }

        if let Some(line) = self.peek() {
            return Err(LdifError::syntax(
                "Unexpected line after 'newsuperior' in moddn change record",
                line.number,
            ));
        }

        Ok(ChangeKind::Rename {
            new_rdn,
            delete_old_rdn,
            new_superior,
        })
    }
}
