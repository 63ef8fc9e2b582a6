//! Protocol request objects produced from change records
//!
//! Each change record kind maps to exactly one LDAP request operation. The
//! mapping is structural in both directions and performs no validation.

use crate::control::Control;
use crate::record::{Attribute, ChangeKind, ChangeRecord, Modification, ModificationType};

/// An LDAP request together with the controls to send with it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LdapRequest {
    pub operation: RequestOperation,
    pub controls: Vec<Control>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestOperation {
    Add(AddRequest),
    Delete(DelRequest),
    Modify(ModifyRequest),
    ModifyDn(ModifyDnRequest),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartialAttribute {
    pub attr_type: String,
    pub attr_values: Vec<Vec<u8>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddRequest {
    pub entry: String,
    pub attributes: Vec<PartialAttribute>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DelRequest {
    pub entry: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModifyRequest {
    pub object: String,
    pub changes: Vec<ModifyChange>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModifyChange {
    pub operation: ModifyOperation,
    pub modification: PartialAttribute,
}

/// Modify operation codes (RFC 4511, increment from RFC 4525)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModifyOperation {
    Add = 0,
    Delete = 1,
    Replace = 2,
    Increment = 3,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModifyDnRequest {
    pub entry: String,
    pub newrdn: String,
    pub delete_old_rdn: bool,
    pub new_superior: Option<String>,
}

impl From<ModificationType> for ModifyOperation {
    fn from(operation: ModificationType) -> Self {
        match operation {
            ModificationType::Add => ModifyOperation::Add,
            ModificationType::Delete => ModifyOperation::Delete,
            ModificationType::Replace => ModifyOperation::Replace,
            ModificationType::Increment => ModifyOperation::Increment,
        }
    }
}

impl From<ModifyOperation> for ModificationType {
    fn from(operation: ModifyOperation) -> Self {
        match operation {
            ModifyOperation::Add => ModificationType::Add,
            ModifyOperation::Delete => ModificationType::Delete,
            ModifyOperation::Replace => ModificationType::Replace,
            ModifyOperation::Increment => ModificationType::Increment,
        }
    }
}

impl From<&Attribute> for PartialAttribute {
    fn from(attribute: &Attribute) -> Self {
        Self {
            attr_type: attribute.name.clone(),
            attr_values: attribute.values.clone(),
        }
    }
}

impl From<PartialAttribute> for Attribute {
    fn from(attribute: PartialAttribute) -> Self {
        Attribute::new(attribute.attr_type, attribute.attr_values)
    }
}

impl ChangeRecord {
    /// Build the protocol request for this record
    pub fn to_request(&self) -> LdapRequest {
        let entry = self.dn().to_string();
        let operation = match self.kind() {
            ChangeKind::Add { attributes } => RequestOperation::Add(AddRequest {
                entry,
                attributes: attributes.iter().map(PartialAttribute::from).collect(),
            }),
            ChangeKind::Delete => RequestOperation::Delete(DelRequest { entry }),
            ChangeKind::Modify { modifications } => RequestOperation::Modify(ModifyRequest {
                object: entry,
                changes: modifications
                    .iter()
                    .map(|m| ModifyChange {
                        operation: m.operation.into(),
                        modification: PartialAttribute {
                            attr_type: m.attribute.clone(),
                            attr_values: m.values.clone(),
                        },
                    })
                    .collect(),
            }),
            ChangeKind::Rename {
                new_rdn,
                delete_old_rdn,
                new_superior,
            } => RequestOperation::ModifyDn(ModifyDnRequest {
                entry,
                newrdn: new_rdn.clone(),
                delete_old_rdn: *delete_old_rdn,
                new_superior: new_superior.clone(),
            }),
        };
        LdapRequest {
            operation,
            controls: self.controls().to_vec(),
        }
    }

    /// Build a change record from a protocol request
    pub fn from_request(request: LdapRequest) -> Self {
        let record = match request.operation {
            RequestOperation::Add(add) => {
                ChangeRecord::add(add.entry, add.attributes.into_iter().map(Attribute::from).collect())
            }
            RequestOperation::Delete(del) => ChangeRecord::delete(del.entry),
            RequestOperation::Modify(modify) => ChangeRecord::modify(
                modify.object,
                modify
                    .changes
                    .into_iter()
                    .map(|c| {
                        Modification::new(
                            c.operation.into(),
                            c.modification.attr_type,
                            c.modification.attr_values,
                        )
                    })
                    .collect(),
            ),
            RequestOperation::ModifyDn(moddn) => {
                ChangeRecord::rename(moddn.entry, moddn.newrdn, moddn.delete_old_rdn, moddn.new_superior)
            }
        };
        record.with_controls(request.controls)
    }
}

impl From<&ChangeRecord> for LdapRequest {
    fn from(record: &ChangeRecord) -> Self {
        record.to_request()
    }
}

impl From<LdapRequest> for ChangeRecord {
    fn from(request: LdapRequest) -> Self {
        ChangeRecord::from_request(request)
    }
}
