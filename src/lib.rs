//! # emx-ldif
//!
//! LDIF (RFC 2849) codec for directory entries and change records.
//!
//! ## Record Format
//!
//! ```text
//! dn: cn=jdoe,ou=People,o=example.com
//! control: 1.2.840.113556.1.4.805 true
//! changetype: modify
//! replace: description
//! description:: IGxlYWRpbmcgc3BhY2U=
//! -
//! ```
//!
//! Change records carry a DN, zero or more controls in order, and one of
//! four changes: `add`, `delete`, `modify` or `moddn` (also `modrdn`).
//! Records without `changetype` are plain entries.
//!
//! ## Value Forms
//!
//! - `name: text` literal value
//! - `name:: base64` base64-encoded value
//! - `name:< url` value read from a URL through a [`ResourceFetcher`]
//!
//! ## Encoding Strategy
//!
//! On write, each value is checked against an [`EncodingStrategy`]:
//! 1. Empty values are always literal
//! 2. Leading/trailing space, leading `:` or `<`, NUL, LF or CR → base64
//! 3. Otherwise the four switches (ASCII controls, displayable non-ASCII,
//!    non-displayable non-ASCII, invalid UTF-8) decide
//!
//! `EncodingStrategy::DEFAULT` keeps readable text such as `jalapeño`
//! literal and encodes everything else that is not plain ASCII.
//!
//! ## Round Trip
//!
//! ```rust
//! use emx_ldif::{ChangeRecord, Control, Decoder, Encoder};
//!
//! let record = ChangeRecord::rename("ou=People,o=example.com", "ou=Users", true, None)
//!     .with_control(Control::new("1.2.3.4", true, Some(b"value".to_vec())));
//!
//! let ldif = Encoder::new().encode_change_record(&record);
//! let decoded = Decoder::new().decode_change_record(&ldif)?;
//! assert_eq!(decoded, record);
//! # Ok::<(), emx_ldif::LdifError>(())
//! ```

pub mod control;
pub mod decoder;
pub mod encoder;
pub mod error;
pub mod record;
pub mod request;
pub mod strategy;
pub mod value;

pub use control::Control;
pub use decoder::{Decoder, Records};
pub use encoder::Encoder;
pub use error::{ErrorKind, LdifError};
pub use record::{
    Attribute, ChangeKind, ChangeRecord, ChangeType, Entry, LdifRecord, Modification, ModificationType,
};
pub use request::{
    AddRequest, DelRequest, LdapRequest, ModifyChange, ModifyDnRequest, ModifyOperation, ModifyRequest,
    PartialAttribute, RequestOperation,
};
pub use strategy::{classify, ByteClass, ByteClasses, EncodingStrategy};
pub use value::{FileUrlFetcher, ResourceFetcher, ValueSource};
