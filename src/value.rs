//! Value forms: literal text, base64 and URL references
//!
//! ```text
//! cn: literal value
//! jpegPhoto:: /9j/4AAQSkZJRg==
//! description:< file:///tmp/description.txt
//! ```

use crate::error::LdifError;
use crate::strategy::EncodingStrategy;
use anyhow::{anyhow, bail, Context};
use base64::Engine;
use tracing::debug;

/// Separator written between a name and a literal value
pub const LITERAL_SEPARATOR: &[u8] = b": ";
/// Separator written between a name and a base64 value
pub const BASE64_SEPARATOR: &[u8] = b":: ";

/// Source of external content for `:<` values.
///
/// The decoder calls this only for URL references. Fetch failures are
/// reported as resource errors for the value being read; no retry is made.
pub trait ResourceFetcher: Send + Sync {
    fn fetch(&self, url: &str) -> anyhow::Result<Vec<u8>>;
}

impl<F> ResourceFetcher for F
where
    F: Fn(&str) -> anyhow::Result<Vec<u8>> + Send + Sync,
{
    fn fetch(&self, url: &str) -> anyhow::Result<Vec<u8>> {
        self(url)
    }
}

/// Fetcher for `file:` URLs; every other scheme is rejected
#[derive(Debug, Clone, Copy, Default)]
pub struct FileUrlFetcher;

impl ResourceFetcher for FileUrlFetcher {
    fn fetch(&self, url: &str) -> anyhow::Result<Vec<u8>> {
        let parsed = url::Url::parse(url).with_context(|| format!("Malformed URL '{}'", url))?;
        if parsed.scheme() != "file" {
            bail!("Unsupported URL scheme '{}' in '{}'", parsed.scheme(), url);
        }
        let path = parsed
            .to_file_path()
            .map_err(|_| anyhow!("URL '{}' does not name a local file", url))?;
        std::fs::read(&path).with_context(|| format!("Failed to read {}", path.display()))
    }
}

/// How a value was written after its name
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueSource {
    /// `name: text`
    Literal(Vec<u8>),
    /// `name:: base64`
    Base64(String),
    /// `name:< url`
    Url(String),
}

impl ValueSource {
    /// Parse the part of a line that follows the first colon after the name
    pub fn parse(after_colon: &[u8]) -> Self {
        match after_colon.split_first() {
            Some((b':', rest)) => ValueSource::Base64(String::from_utf8_lossy(rest).trim().to_string()),
            Some((b'<', rest)) => ValueSource::Url(String::from_utf8_lossy(rest).trim().to_string()),
            Some((b' ', rest)) => ValueSource::Literal(rest.to_vec()),
            _ => ValueSource::Literal(after_colon.to_vec()),
        }
    }

    /// Produce the raw bytes of the value
    pub fn resolve(&self, line_number: usize, fetcher: &dyn ResourceFetcher) -> Result<Vec<u8>, LdifError> {
        match self {
            ValueSource::Literal(bytes) => Ok(bytes.clone()),
            ValueSource::Base64(text) => base64::engine::general_purpose::STANDARD
                .decode(text)
                .map_err(|e| {
                    LdifError::encoding(format!("Unable to base64-decode value '{}'", text), line_number)
                        .with_cause(e)
                }),
            ValueSource::Url(url) => {
                debug!(url = %url, line = line_number, "fetching value from URL");
                fetcher.fetch(url).map_err(|e| {
                    LdifError::resource(format!("Unable to retrieve value from URL '{}'", url), line_number)
                        .with_cause(e)
                })
            }
        }
    }
}

/// Append `: value` or `:: base64` for `value`, as the strategy decides
pub fn append_value(out: &mut Vec<u8>, value: &[u8], strategy: &EncodingStrategy) {
    if strategy.should_encode(value) {
        out.extend_from_slice(BASE64_SEPARATOR);
        out.extend_from_slice(base64::engine::general_purpose::STANDARD.encode(value).as_bytes());
    } else {
        out.extend_from_slice(LITERAL_SEPARATOR);
        out.extend_from_slice(value);
    }
}

/// Build a complete `name: value` line
pub fn value_line(name: &str, value: &[u8], strategy: &EncodingStrategy) -> Vec<u8> {
    let mut line = Vec::with_capacity(name.len() + value.len() + 2);
    line.extend_from_slice(name.as_bytes());
    append_value(&mut line, value, strategy);
    line
}
