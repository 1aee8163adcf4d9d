use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use crate::{Error, Result};

/// Escapes arbitrary payload text into the delimiter-free alphabet used by
/// the envelope format.
///
/// The envelope reserves `:` and newline as structural characters, so any
/// payload that may contain them (strings, nested field bags, trait maps) is
/// carried as standard base64 over its UTF-8 bytes. The empty string escapes
/// to the empty string.
pub fn escape(raw: &str) -> String {
    STANDARD.encode(raw.as_bytes())
}

/// Reverses [`escape`].
///
/// # Errors
/// Returns [`Error::Malformed`] if the input is not valid base64 or does not
/// decode to valid UTF-8.
pub fn unescape(safe: &str) -> Result<String> {
    let bytes = STANDARD
        .decode(safe)
        .map_err(|err| Error::Malformed(format!("invalid payload encoding: {err}")))?;
    String::from_utf8(bytes)
        .map_err(|err| Error::Malformed(format!("payload is not valid UTF-8: {err}")))
}
