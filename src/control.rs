//! `control:` lines attached to change records
//!
//! Format: `control: <oid> [true|false] [: value | :: base64 | :< url]`

use crate::error::LdifError;
use crate::strategy::EncodingStrategy;
use crate::value::{append_value, ResourceFetcher, ValueSource};

pub const CONTROL_PREFIX: &str = "control: ";

/// A request control: identifier, criticality and optional value.
///
/// A control with no value differs from one whose value is empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Control {
    oid: String,
    critical: bool,
    value: Option<Vec<u8>>,
}

impl Control {
    /// Create a control
    ///
    /// # Panics
    /// Panics if `oid` is empty.
    pub fn new(oid: impl Into<String>, critical: bool, value: Option<Vec<u8>>) -> Self {
        let oid = oid.into();
        assert!(!oid.is_empty(), "control OID must not be empty");
        Self { oid, critical, value }
    }

    /// Get the control identifier
    pub fn oid(&self) -> &str {
        &self.oid
    }

    /// Whether the server must reject the request if it cannot honor the control
    pub fn is_critical(&self) -> bool {
        self.critical
    }

    /// Get the control value; `None` when absent, which is not the same as empty
    pub fn value(&self) -> Option<&[u8]> {
        self.value.as_deref()
    }

    /// Parse everything after `control:` on a logical line
    pub fn parse(spec: &[u8], line_number: usize, fetcher: &dyn ResourceFetcher) -> Result<Self, LdifError> {
        let rest = skip_spaces(spec);
        let end = token_end(rest);
        if end == 0 {
            return Err(LdifError::syntax("Control line has no OID", line_number));
        }
        let oid = std::str::from_utf8(&rest[..end])
            .map_err(|_| LdifError::syntax("Control OID is not valid UTF-8", line_number))?
            .to_string();

        let mut rest = skip_spaces(&rest[end..]);
        let mut critical = false;
        if !rest.is_empty() && rest[0] != b':' {
            // Criticality keyword, ASCII case-insensitive
            let end = token_end(rest);
            let token = &rest[..end];
            critical = if token.eq_ignore_ascii_case(b"true") {
                true
            } else if token.eq_ignore_ascii_case(b"false") {
                false
            } else {
                return Err(LdifError::syntax(
                    format!(
                        "Invalid criticality '{}' for control {}: expected 'true' or 'false'",
                        String::from_utf8_lossy(token),
                        oid
                    ),
                    line_number,
                ));
            };
            rest = skip_spaces(&rest[end..]);
        }

        let value = match rest.split_first() {
            None => None,
            Some((b':', after_colon)) => Some(ValueSource::parse(after_colon).resolve(line_number, fetcher)?),
            Some(_) => {
                return Err(LdifError::syntax(
                    format!("Unexpected content after criticality of control {}", oid),
                    line_number,
                ))
            }
        };

        Ok(Self { oid, critical, value })
    }

    /// Render the full `control:` line; criticality only appears when true
    pub fn to_ldif_line(&self, strategy: &EncodingStrategy) -> Vec<u8> {
        let mut line = Vec::with_capacity(CONTROL_PREFIX.len() + self.oid.len() + 8);
        line.extend_from_slice(CONTROL_PREFIX.as_bytes());
        line.extend_from_slice(self.oid.as_bytes());
        if self.critical {
            line.extend_from_slice(b" true");
        }
        if let Some(value) = &self.value {
            append_value(&mut line, value, strategy);
        }
        line
    }
}

fn skip_spaces(bytes: &[u8]) -> &[u8] {
    let start = bytes.iter().position(|&b| b != b' ').unwrap_or(bytes.len());
    &bytes[start..]
}

fn token_end(bytes: &[u8]) -> usize {
    bytes.iter().position(|&b| b == b' ' || b == b':').unwrap_or(bytes.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use base64::Engine;

    fn no_fetch(url: &str) -> anyhow::Result<Vec<u8>> {
        Err(anyhow::anyhow!("unexpected fetch of {}", url))
    }

    fn parse(spec: &str) -> Result<Control, LdifError> {
        Control::parse(spec.as_bytes(), 1, &no_fetch)
    }

    #[test]
    fn test_parse_oid_only() {
        let control = parse(" 1.1.1.1").unwrap();
        assert_eq!(control, Control::new("1.1.1.1", false, None));
    }

    #[test]
    fn test_parse_criticality() {
        assert!(parse(" 1.1.1.2 true").unwrap().is_critical());
        assert!(parse(" 1.1.1.3     true").unwrap().is_critical());
        assert!(!parse(" 1.1.1.4 false").unwrap().is_critical());
        assert!(parse(" 1.1.1.5 true   ").unwrap().value().is_none());
    }

    #[test]
    fn test_parse_criticality_ignores_case() {
        assert!(parse(" 1.2.3 TRUE").unwrap().is_critical());
        assert!(!parse(" 1.2.3 False").unwrap().is_critical());

        let control = parse(" 1.2.3 True: v").unwrap();
        assert!(control.is_critical());
        assert_eq!(control.value(), Some(&b"v"[..]));

        let err = parse(" 1.2.3 yes").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SyntaxError);
    }

    #[test]
    fn test_parse_values() {
        let encoded = base64::engine::general_purpose::STANDARD.encode("value1.1.1.6");
        let control = parse(&format!(" 1.1.1.6::{}", encoded)).unwrap();
        assert_eq!(control.value(), Some(&b"value1.1.1.6"[..]));
        assert!(!control.is_critical());

        let control = parse(" 1.1.1.7 true: some value").unwrap();
        assert!(control.is_critical());
        assert_eq!(control.value(), Some(&b"some value"[..]));

        let control = parse(" 1.1.1.8:").unwrap();
        assert_eq!(control.value(), Some(&b""[..]));

        let control = parse(" 1.1.1.9 false :: dmFsdWU=").unwrap();
        assert_eq!(control.value(), Some(&b"value"[..]));
    }

    #[test]
    fn test_parse_url_value() {
        let fetcher = |_: &str| -> anyhow::Result<Vec<u8>> { Ok(b"fetched".to_vec()) };
        let control = Control::parse(b" 1.2.3:< file:///value", 5, &fetcher).unwrap();
        assert_eq!(control.value(), Some(&b"fetched"[..]));
    }

    #[test]
    fn test_parse_errors() {
        let err = parse(" 1.2.3.4:: malformed.base64").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EncodingError);

        let err = parse("").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SyntaxError);

        let err = parse(" ").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SyntaxError);

        let err = parse(" 1.2.3.4 invalid").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SyntaxError);
        assert!(err.message().contains("Invalid criticality"));

        let err = parse(" 1.2.3.4 true extra").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SyntaxError);
    }

    #[test]
    fn test_to_ldif_line() {
        let strategy = EncodingStrategy::DEFAULT;
        assert_eq!(Control::new("1.2.3", false, None).to_ldif_line(&strategy), b"control: 1.2.3");
        assert_eq!(
            Control::new("1.2.3", true, Some(b"v".to_vec())).to_ldif_line(&strategy),
            b"control: 1.2.3 true: v"
        );
        assert_eq!(
            Control::new("1.2.3", false, Some(vec![0x00, 0x01])).to_ldif_line(&strategy),
            b"control: 1.2.3:: AAE="
        );
    }

    #[test]
    fn test_line_round_trip() {
        let strategy = EncodingStrategy::DEFAULT;
        let controls = [
            Control::new("1.2.3.4", false, None),
            Control::new("1.2.3.4", true, None),
            Control::new("1.2.3.4", false, Some(Vec::new())),
            Control::new("1.2.3.4", true, Some(b" padded ".to_vec())),
            Control::new("1.2.3.4", false, Some(vec![0xFF, 0x00, 0x0A])),
        ];
        for control in controls {
            let line = control.to_ldif_line(&strategy);
            let spec = &line[CONTROL_PREFIX.len() - 1..];
            assert_eq!(Control::parse(spec, 1, &no_fetch).unwrap(), control);
        }
    }

    #[test]
    #[should_panic(expected = "must not be empty")]
    fn test_empty_oid_panics() {
        let _ = Control::new("", false, None);
    }
}
