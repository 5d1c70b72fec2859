//! Text sanitization for values read from kernel/USB attribute files.
//!
//! Vendor, model, and serial strings arrive as raw bytes from sysfs or HID
//! descriptors and are never trustworthy: they may contain invalid UTF-8,
//! control characters, or trailing padding. Nothing read here is allowed to
//! reach the bus surface unsanitized.

/// Sanitizes a raw byte sequence into a display-safe UTF-8 string.
///
/// Invalid UTF-8 is replaced by lossy conversion, then any remaining
/// control characters are dropped and trailing whitespace is trimmed.
pub fn sanitize_bytes(raw: &[u8]) -> String {
    let lossy = String::from_utf8_lossy(raw);
    sanitize_str(&lossy)
}

/// Sanitizes an already-decoded string: strips control characters and
/// trims trailing whitespace.
pub fn sanitize_str(raw: &str) -> String {
    let stripped: String = raw
        .chars()
        .filter(|c| !c.is_control() || *c == ' ')
        .collect();

    stripped.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_invalid_utf8() {
        let raw = [0x46, 0x6f, 0x6f, 0xff, 0xfe];
        let result = sanitize_bytes(&raw);
        assert!(result.starts_with("Foo"));
    }

    #[test]
    fn strips_control_characters() {
        let result = sanitize_str("Foo\u{0}Bar\n");
        assert_eq!(result, "FooBar");
    }

    #[test]
    fn trims_trailing_whitespace() {
        let result = sanitize_str("Acme Corp   \n\t");
        assert_eq!(result, "Acme Corp");
    }

    #[test]
    fn keeps_interior_spaces() {
        let result = sanitize_str("Logitech G Pro");
        assert_eq!(result, "Logitech G Pro");
    }
}
