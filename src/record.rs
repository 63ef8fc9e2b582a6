//! LDIF record data structures

use crate::control::Control;

// LDIF keywords
pub const DN: &str = "dn";
pub const CONTROL: &str = "control";
pub const CHANGETYPE: &str = "changetype";
pub const VERSION: &str = "version";
pub const NEWRDN: &str = "newrdn";
pub const DELETEOLDRDN: &str = "deleteoldrdn";
pub const NEWSUPERIOR: &str = "newsuperior";
pub const MOD_SPEC_END: &str = "-";

/// A named attribute with its values, in the order they were given
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub values: Vec<Vec<u8>>,
}

impl Attribute {
    /// Create an attribute with the given values
    pub fn new(name: impl Into<String>, values: Vec<Vec<u8>>) -> Self {
        Self { name: name.into(), values }
    }
}

/// Append `value` to the attribute named `name` (ASCII case-insensitive),
/// creating it at the end if it is not present yet
pub(crate) fn push_value(attributes: &mut Vec<Attribute>, name: &str, value: Vec<u8>) {
    match attributes.iter_mut().find(|a| a.name.eq_ignore_ascii_case(name)) {
        Some(attribute) => attribute.values.push(value),
        None => attributes.push(Attribute::new(name, vec![value])),
    }
}

/// The operation of a single modification in a modify record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModificationType {
    Add,
    Delete,
    Replace,
    Increment,
}

impl ModificationType {
    /// Keyword used in `add:`/`delete:`/`replace:`/`increment:` lines
    pub fn keyword(&self) -> &'static str {
        match self {
            ModificationType::Add => "add",
            ModificationType::Delete => "delete",
            ModificationType::Replace => "replace",
            ModificationType::Increment => "increment",
        }
    }

    /// Parse a modification keyword (ASCII case-insensitive)
    pub fn parse(keyword: &str) -> Option<Self> {
        let keyword = keyword.trim();
        [
            ModificationType::Add,
            ModificationType::Delete,
            ModificationType::Replace,
            ModificationType::Increment,
        ]
        .into_iter()
        .find(|t| t.keyword().eq_ignore_ascii_case(keyword))
    }
}

/// One `add:`/`delete:`/`replace:`/`increment:` block of a modify record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Modification {
    pub operation: ModificationType,
    pub attribute: String,
    pub values: Vec<Vec<u8>>,
}

impl Modification {
    /// Create a modification of `attribute`
    pub fn new(operation: ModificationType, attribute: impl Into<String>, values: Vec<Vec<u8>>) -> Self {
        Self {
            operation,
            attribute: attribute.into(),
            values,
        }
    }
}

/// The `changetype:` keyword of a change record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeType {
    Add,
    Delete,
    Modify,
    /// `moddn`, also spelled `modrdn`
    ModDn,
}

impl ChangeType {
    /// Keyword written on output
    pub fn keyword(&self) -> &'static str {
        match self {
            ChangeType::Add => "add",
            ChangeType::Delete => "delete",
            ChangeType::Modify => "modify",
            ChangeType::ModDn => "moddn",
        }
    }

    /// Parse a changetype keyword; `modrdn` is accepted as `moddn`
    pub fn parse(keyword: &str) -> Option<Self> {
        match keyword.trim().to_ascii_lowercase().as_str() {
            "add" => Some(ChangeType::Add),
            "delete" => Some(ChangeType::Delete),
            "modify" => Some(ChangeType::Modify),
            "moddn" | "modrdn" => Some(ChangeType::ModDn),
            _ => None,
        }
    }
}

/// Kind-specific payload of a change record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeKind {
    Add {
        attributes: Vec<Attribute>,
    },
    Delete,
    Modify {
        modifications: Vec<Modification>,
    },
    Rename {
        new_rdn: String,
        delete_old_rdn: bool,
        new_superior: Option<String>,
    },
}

impl ChangeKind {
    /// Get the changetype keyword matching this payload
    pub fn change_type(&self) -> ChangeType {
        match self {
            ChangeKind::Add { .. } => ChangeType::Add,
            ChangeKind::Delete => ChangeType::Delete,
            ChangeKind::Modify { .. } => ChangeType::Modify,
            ChangeKind::Rename { .. } => ChangeType::ModDn,
        }
    }
}

/// An LDIF change record: DN, controls in source order, and the change itself
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeRecord {
    dn: String,
    controls: Vec<Control>,
    kind: ChangeKind,
}

impl ChangeRecord {
    /// Create a change record without controls
    pub fn new(dn: impl Into<String>, kind: ChangeKind) -> Self {
        Self {
            dn: dn.into(),
            controls: Vec::new(),
            kind,
        }
    }

    /// Create an add change record
    pub fn add(dn: impl Into<String>, attributes: Vec<Attribute>) -> Self {
        Self::new(dn, ChangeKind::Add { attributes })
    }

    /// Create a delete change record
    pub fn delete(dn: impl Into<String>) -> Self {
        Self::new(dn, ChangeKind::Delete)
    }

    /// Create a modify change record
    pub fn modify(dn: impl Into<String>, modifications: Vec<Modification>) -> Self {
        Self::new(dn, ChangeKind::Modify { modifications })
    }

    /// Create a moddn change record
    pub fn rename(
        dn: impl Into<String>,
        new_rdn: impl Into<String>,
        delete_old_rdn: bool,
        new_superior: Option<String>,
    ) -> Self {
        Self::new(
            dn,
            ChangeKind::Rename {
                new_rdn: new_rdn.into(),
                delete_old_rdn,
                new_superior,
            },
        )
    }

    /// Return a copy of this record with `control` appended
    pub fn with_control(mut self, control: Control) -> Self {
        self.controls.push(control);
        self
    }

    /// Return a copy of this record with `controls` replacing the current ones
    pub fn with_controls(mut self, controls: impl IntoIterator<Item = Control>) -> Self {
        self.controls = controls.into_iter().collect();
        self
    }

    /// Get the target DN
    pub fn dn(&self) -> &str {
        &self.dn
    }

    /// Get the controls in the order they were given
    pub fn controls(&self) -> &[Control] {
        &self.controls
    }

    /// Get the kind-specific payload
    pub fn kind(&self) -> &ChangeKind {
        &self.kind
    }

    /// Get the changetype of this record
    pub fn change_type(&self) -> ChangeType {
        self.kind.change_type()
    }
}

/// An LDIF content record: a DN and its attributes, no `changetype`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    dn: String,
    attributes: Vec<Attribute>,
}

impl Entry {
    /// Create an entry without attributes
    pub fn new(dn: impl Into<String>) -> Self {
        Self {
            dn: dn.into(),
            attributes: Vec::new(),
        }
    }

    /// Return a copy of this entry with `value` added to attribute `name`
    pub fn with_value(mut self, name: &str, value: impl Into<Vec<u8>>) -> Self {
        push_value(&mut self.attributes, name, value.into());
        self
    }

    /// Get the entry DN
    pub fn dn(&self) -> &str {
        &self.dn
    }

    /// Get the attributes in the order they were given
    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    /// Look up an attribute by name (ASCII case-insensitive)
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name.eq_ignore_ascii_case(name))
    }

    /// The add change record that would create this entry
    pub fn to_add_record(&self) -> ChangeRecord {
        ChangeRecord::add(self.dn.clone(), self.attributes.clone())
    }

    pub(crate) fn from_parts(dn: String, attributes: Vec<Attribute>) -> Self {
        Self { dn, attributes }
    }
}

/// Any record read from an LDIF stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LdifRecord {
    Entry(Entry),
    Change(ChangeRecord),
}

impl LdifRecord {
    /// Get the DN of either record type
    pub fn dn(&self) -> &str {
        match self {
            LdifRecord::Entry(entry) => entry.dn(),
            LdifRecord::Change(record) => record.dn(),
        }
    }

    /// Get the change record, if this is one
    pub fn as_change(&self) -> Option<&ChangeRecord> {
        match self {
            LdifRecord::Change(record) => Some(record),
            LdifRecord::Entry(_) => None,
        }
    }
}

impl From<Entry> for LdifRecord {
    fn from(entry: Entry) -> Self {
        LdifRecord::Entry(entry)
    }
}

impl From<ChangeRecord> for LdifRecord {
    fn from(record: ChangeRecord) -> Self {
        LdifRecord::Change(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_change_type_keywords() {
        assert_eq!(ChangeType::parse("add"), Some(ChangeType::Add));
        assert_eq!(ChangeType::parse("Delete"), Some(ChangeType::Delete));
        assert_eq!(ChangeType::parse(" modify "), Some(ChangeType::Modify));
        assert_eq!(ChangeType::parse("moddn"), Some(ChangeType::ModDn));
        assert_eq!(ChangeType::parse("modrdn"), Some(ChangeType::ModDn));
        assert_eq!(ChangeType::parse("rename"), None);
        assert_eq!(ChangeType::ModDn.keyword(), "moddn");
    }

    #[test]
    fn test_modification_type_keywords() {
        assert_eq!(ModificationType::parse("replace"), Some(ModificationType::Replace));
        assert_eq!(ModificationType::parse("INCREMENT"), Some(ModificationType::Increment));
        assert_eq!(ModificationType::parse("cn"), None);
    }

    #[test]
    fn test_push_value_merges_case_insensitively() {
        let mut attributes = Vec::new();
        push_value(&mut attributes, "cn", b"a".to_vec());
        push_value(&mut attributes, "sn", b"b".to_vec());
        push_value(&mut attributes, "CN", b"c".to_vec());
        assert_eq!(
            attributes,
            vec![
                Attribute::new("cn", vec![b"a".to_vec(), b"c".to_vec()]),
                Attribute::new("sn", vec![b"b".to_vec()]),
            ]
        );
    }

    #[test]
    fn test_controls_keep_order() {
        let record = ChangeRecord::delete("cn=x")
            .with_control(Control::new("1.1", false, None))
            .with_control(Control::new("2.2", true, None));
        let oids: Vec<&str> = record.controls().iter().map(|c| c.oid()).collect();
        assert_eq!(oids, vec!["1.1", "2.2"]);
        assert_eq!(record.change_type(), ChangeType::Delete);
    }

    #[test]
    fn test_entry_to_add_record() {
        let entry = Entry::new("dc=example,dc=com")
            .with_value("objectClass", "top")
            .with_value("objectClass", "domain")
            .with_value("dc", "example");
        assert_eq!(entry.attribute("OBJECTCLASS").map(|a| a.values.len()), Some(2));

        let record = entry.to_add_record();
        assert_eq!(record.dn(), "dc=example,dc=com");
        match record.kind() {
            ChangeKind::Add { attributes } => assert_eq!(attributes, entry.attributes()),
            other => panic!("unexpected kind {:?}", other),
        }
    }
}
