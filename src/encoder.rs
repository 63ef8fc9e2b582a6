//! LDIF encoder

use crate::record::{
    Attribute, ChangeKind, ChangeRecord, Entry, LdifRecord, CHANGETYPE, DELETEOLDRDN, DN, MOD_SPEC_END,
    NEWRDN, NEWSUPERIOR, VERSION,
};
use crate::strategy::EncodingStrategy;
use crate::value::value_line;
use anyhow::Result;

/// Default column at which long lines are folded
pub const DEFAULT_WRAP_COLUMN: usize = 76;

const NEWLINE: u8 = b'\n';
const CONTINUATION: u8 = b' ';

/// Encodes entries and change records as LDIF
#[derive(Debug, Clone)]
pub struct Encoder {
    strategy: EncodingStrategy,
    wrap_column: usize,
    version_header: bool,
}

impl Encoder {
    /// Create an encoder with the default strategy, folding at 76 columns
    pub fn new() -> Self {
        Self {
            strategy: EncodingStrategy::DEFAULT,
            wrap_column: DEFAULT_WRAP_COLUMN,
            version_header: false,
        }
    }

    /// Set the policy deciding which values are base64-encoded
    pub fn with_strategy(mut self, strategy: EncodingStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Fold lines longer than `column` bytes; values below 2 disable folding
    pub fn with_wrap_column(mut self, column: usize) -> Self {
        self.wrap_column = column;
        self
    }

    /// Write a `version: 1` line before the first record
    pub fn with_version_header(mut self, enabled: bool) -> Self {
        self.version_header = enabled;
        self
    }

    /// Get the policy in use
    pub fn strategy(&self) -> &EncodingStrategy {
        &self.strategy
    }

    /// Encode a sequence of records separated by blank lines
    pub fn encode(&self, records: &[LdifRecord]) -> Vec<u8> {
        let mut output = Vec::new();
        if self.version_header {
            self.push_line(&mut output, format!("{}: 1", VERSION).as_bytes());
            if !records.is_empty() {
                output.push(NEWLINE);
            }
        }
        for (i, record) in records.iter().enumerate() {
            if i > 0 {
                output.push(NEWLINE);
            }
            self.encode_record_into(&mut output, record);
        }
        output
    }

    /// Encode change records separated by blank lines
    pub fn encode_change_records(&self, records: &[ChangeRecord]) -> Vec<u8> {
        let records: Vec<LdifRecord> = records.iter().cloned().map(LdifRecord::Change).collect();
        self.encode(&records)
    }

    /// Encode a single entry or change record
    pub fn encode_record(&self, record: &LdifRecord) -> Vec<u8> {
        let mut output = Vec::new();
        self.encode_record_into(&mut output, record);
        output
    }

    /// Encode a single content entry
    pub fn encode_entry(&self, entry: &Entry) -> Vec<u8> {
        let mut output = Vec::new();
        self.encode_entry_into(&mut output, entry);
        output
    }

    /// Encode a single change record
    pub fn encode_change_record(&self, record: &ChangeRecord) -> Vec<u8> {
        let mut output = Vec::new();
        self.encode_change_record_into(&mut output, record);
        output
    }

    /// Encode records to a string; fails if a literal value is not UTF-8
    pub fn encode_to_string(&self, records: &[LdifRecord]) -> Result<String> {
        String::from_utf8(self.encode(records)).map_err(|_| {
            anyhow::anyhow!("Encoded LDIF contains literal values that are not valid UTF-8")
        })
    }

    /// Encode records directly to a writer
    pub fn encode_to_writer<W: std::io::Write>(&self, records: &[LdifRecord], mut writer: W) -> Result<()> {
        writer.write_all(&self.encode(records))?;
        writer.flush()?;
        Ok(())
    }

    fn encode_record_into(&self, output: &mut Vec<u8>, record: &LdifRecord) {
        match record {
            LdifRecord::Entry(entry) => self.encode_entry_into(output, entry),
            LdifRecord::Change(change) => self.encode_change_record_into(output, change),
        }
    }

    fn encode_entry_into(&self, output: &mut Vec<u8>, entry: &Entry) {
        self.push_value(output, DN, entry.dn().as_bytes());
        self.push_attributes(output, entry.attributes());
    }

    fn encode_change_record_into(&self, output: &mut Vec<u8>, record: &ChangeRecord) {
        // Header: dn, controls, changetype
        self.push_value(output, DN, record.dn().as_bytes());
        for control in record.controls() {
            self.push_line(output, &control.to_ldif_line(&self.strategy));
        }
        self.push_line(
            output,
            format!("{}: {}", CHANGETYPE, record.change_type().keyword()).as_bytes(),
        );

        match record.kind() {
            ChangeKind::Add { attributes } => self.push_attributes(output, attributes),
            ChangeKind::Delete => {}
            ChangeKind::Modify { modifications } => {
                for modification in modifications {
                    self.push_value(
                        output,
                        modification.operation.keyword(),
                        modification.attribute.as_bytes(),
                    );
                    for value in &modification.values {
                        self.push_value(output, &modification.attribute, value);
                    }
                    self.push_line(output, MOD_SPEC_END.as_bytes());
                }
            }
            ChangeKind::Rename {
                new_rdn,
                delete_old_rdn,
                new_superior,
            } => {
                self.push_value(output, NEWRDN, new_rdn.as_bytes());
                let flag: &[u8] = if *delete_old_rdn { b"1" } else { b"0" };
                self.push_value(output, DELETEOLDRDN, flag);
                if let Some(superior) = new_superior {
                    self.push_value(output, NEWSUPERIOR, superior.as_bytes());
                }
            }
        }
    }

    fn push_attributes(&self, output: &mut Vec<u8>, attributes: &[Attribute]) {
        for attribute in attributes {
            for value in &attribute.values {
                self.push_value(output, &attribute.name, value);
            }
        }
    }

    fn push_value(&self, output: &mut Vec<u8>, name: &str, value: &[u8]) {
        self.push_line(output, &value_line(name, value, &self.strategy));
    }

    /// Write one logical line, folding it at the wrap column
    fn push_line(&self, output: &mut Vec<u8>, line: &[u8]) {
        if self.wrap_column < 2 || line.len() <= self.wrap_column {
            output.extend_from_slice(line);
            output.push(NEWLINE);
            return;
        }

        // First physical line gets the full width
        let mut start = 0;
        let mut width = self.wrap_column;
        while start < line.len() {
            let end = fold_point(line, start, width);
            if start > 0 {
                output.push(CONTINUATION);
            }
            output.extend_from_slice(&line[start..end]);
            output.push(NEWLINE);
            start = end;
            // Continuation lines lose one column to the leading space
            width = self.wrap_column - 1;
        }
    }
}

/// End of the chunk starting at `start`, at most `width` bytes long, moved
/// back so that a UTF-8 sequence is not split
fn fold_point(line: &[u8], start: usize, width: usize) -> usize {
    let mut end = (start + width).min(line.len());
    if end == line.len() {
        return end;
    }
    while end > start + 1 && is_utf8_continuation(line[end]) {
        end -= 1;
    }
    end
}

fn is_utf8_continuation(byte: u8) -> bool {
    byte & 0b1100_0000 == 0b1000_0000
}

impl Default for Encoder {
    fn default() -> Self {
        Self::new()
    }
}
