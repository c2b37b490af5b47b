//! UTF-8 validation with byte-precise error reporting.

use crate::protocol::FormError;

/// Checks that `bytes` is well-formed UTF-8 and returns it as a `String`.
///
/// On the first invalid sequence this fails with [`FormError::BadEncoding`]
/// carrying the offending byte value and `location`, a label identifying what
/// was being validated (a field name, or `"filename"`).
pub fn validate_utf8(bytes: &[u8], location: &str) -> Result<String, FormError> {
    match std::str::from_utf8(bytes) {
        Ok(s) => Ok(s.to_string()),
        Err(e) => {
            // valid_up_to points at the first offending byte; an unexpected
            // end of input inside a sequence reports the byte starting it
            let byte = bytes.get(e.valid_up_to()).copied().unwrap_or(0);
            Err(FormError::bad_encoding(byte, location))
        }
    }
}
