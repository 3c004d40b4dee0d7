// blocks/common.rs
//! Line-oriented helpers shared by the header parser and the block chain walker.
//!
//! MSRD headers are plain `key=value` text. These helpers split lines, split
//! key/value pairs on the first `=`, and parse the integer and float values
//! that the format stores as text.

use crate::{Error, Result};
use std::io::BufRead;

// ============================================================================
// Line Reading
// ============================================================================

/// Read one line (including its trailing `\n`, if any) into `buf`.
///
/// `buf` is cleared first. Returns the number of bytes consumed; a return value
/// of `0` means the reader is at end of file.
#[inline]
pub(crate) fn read_line<R: BufRead>(reader: &mut R, buf: &mut Vec<u8>) -> Result<usize> {
    buf.clear();
    Ok(reader.read_until(b'\n', buf)?)
}

/// Read one mandatory `key=value` line.
///
/// # Arguments
/// * `reader` - Source positioned at the start of the line
/// * `offset` - File offset of the line, used for error reporting
///
/// # Returns
/// The trimmed key, the trimmed value and the number of bytes consumed.
/// A line without `=` is an [`Error::MissingSeparator`]; end of file is an
/// [`Error::IOError`] of kind `UnexpectedEof`.
pub(crate) fn read_key_value<R: BufRead>(
    reader: &mut R,
    offset: u64,
) -> Result<(String, String, usize)> {
    let mut buf = Vec::new();
    let consumed = read_line(reader, &mut buf)?;
    if consumed == 0 {
        return Err(Error::IOError(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            format!("expected a key=value line at offset {offset}"),
        )));
    }
    match split_key_value(&buf) {
        Some((key, value)) => Ok((key, value, consumed)),
        None => Err(Error::MissingSeparator {
            offset,
            line: String::from_utf8_lossy(&buf).trim_end().to_string(),
        }),
    }
}

// ============================================================================
// Text Splitting
// ============================================================================

/// Split a header line on its first `=` into a trimmed `(key, value)` pair.
///
/// Returns `None` when the line has no `=`. Both sides are decoded as lossy
/// UTF-8 and stripped of surrounding whitespace, including a trailing `\r`.
///
/// ```
/// use msrd_rs::blocks::split_key_value;
///
/// let (k, v) = split_key_value(b"Label=El 12=b\r\n").unwrap();
/// assert_eq!(k, "Label");
/// assert_eq!(v, "El 12=b");
/// assert!(split_key_value(b"MCS banner").is_none());
/// ```
pub fn split_key_value(line: &[u8]) -> Option<(String, String)> {
    let eq = line.iter().position(|&b| b == b'=')?;
    let key = String::from_utf8_lossy(&line[..eq]).trim().to_string();
    let value = String::from_utf8_lossy(&line[eq + 1..]).trim().to_string();
    Some((key, value))
}

/// Iterate the lines of a text region, splitting on `\n` and dropping a
/// trailing `\r` from each line.
pub(crate) fn text_lines(text: &[u8]) -> impl Iterator<Item = &[u8]> {
    text.split(|&b| b == b'\n')
        .map(|line| line.strip_suffix(b"\r").unwrap_or(line))
}

/// Split `haystack` on every occurrence of `delimiter`.
///
/// Behaves like `bytes.split(delimiter)`: the result always has at least one
/// fragment, and adjacent delimiters produce empty fragments.
pub(crate) fn split_bytes<'a>(haystack: &'a [u8], delimiter: &[u8]) -> Vec<&'a [u8]> {
    let mut fragments = Vec::new();
    if delimiter.is_empty() {
        fragments.push(haystack);
        return fragments;
    }
    let mut start = 0;
    let mut i = 0;
    while i + delimiter.len() <= haystack.len() {
        if &haystack[i..i + delimiter.len()] == delimiter {
            fragments.push(&haystack[start..i]);
            i += delimiter.len();
            start = i;
        } else {
            i += 1;
        }
    }
    fragments.push(&haystack[start..]);
    fragments
}

/// Remove every space character from a tier-1 value.
#[inline]
pub(crate) fn strip_spaces(value: &str) -> String {
    value.chars().filter(|&c| c != ' ').collect()
}

// ============================================================================
// Value Parsing
// ============================================================================

/// Parse an integer header value.
pub(crate) fn parse_int(key: &str, value: &str) -> Result<i64> {
    value.trim().parse::<i64>().map_err(|_| Error::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}

/// Parse a non-negative integer header value used as a file offset or size.
pub(crate) fn parse_offset(key: &str, value: &str) -> Result<u64> {
    value.trim().parse::<u64>().map_err(|_| Error::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}

/// Parse a floating point header value.
pub(crate) fn parse_float(key: &str, value: &str) -> Result<f64> {
    value.trim().parse::<f64>().map_err(|_| Error::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_split_on_first_equals_only() {
        let (k, v) = split_key_value(b"Comment=a=b=c").unwrap();
        assert_eq!(k, "Comment");
        assert_eq!(v, "a=b=c");
    }

    #[test]
    fn test_split_trims_crlf() {
        let (k, v) = split_key_value(b" Tick = 50 \r\n").unwrap();
        assert_eq!(k, "Tick");
        assert_eq!(v, "50");
    }

    #[test]
    fn test_split_bytes_like_python() {
        let parts = split_bytes(b"a\r\nStream=0\r\nStream=1", b"\r\nStream=");
        assert_eq!(parts, vec![&b"a"[..], &b"0"[..], &b"1"[..]]);

        let parts = split_bytes(b"no delimiter", b"\r\nStream=");
        assert_eq!(parts, vec![&b"no delimiter"[..]]);

        let parts = split_bytes(b"XX", b"X");
        assert_eq!(parts, vec![&b""[..], &b""[..], &b""[..]]);
    }

    #[test]
    fn test_text_lines_strip_cr() {
        let lines: Vec<&[u8]> = text_lines(b"a=1\r\nb=2\nc").collect();
        assert_eq!(lines, vec![&b"a=1"[..], &b"b=2"[..], &b"c"[..]]);
    }

    #[test]
    fn test_read_key_value_reports_consumed() {
        let mut cursor = Cursor::new(b"Size=128\r\npayload".to_vec());
        let (k, v, n) = read_key_value(&mut cursor, 0).unwrap();
        assert_eq!((k.as_str(), v.as_str(), n), ("Size", "128", 10));
    }

    #[test]
    fn test_read_key_value_rejects_missing_separator() {
        let mut cursor = Cursor::new(b"garbage\r\n".to_vec());
        match read_key_value(&mut cursor, 42) {
            Err(Error::MissingSeparator { offset, line }) => {
                assert_eq!(offset, 42);
                assert_eq!(line, "garbage");
            }
            other => panic!("expected MissingSeparator, got {other:?}"),
        }
    }

    #[test]
    fn test_read_key_value_eof() {
        let mut cursor = Cursor::new(Vec::new());
        assert!(matches!(
            read_key_value(&mut cursor, 0),
            Err(Error::IOError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof
        ));
    }

    #[test]
    fn test_parse_values() {
        assert_eq!(parse_int("FPosNext", "-1").unwrap(), -1);
        assert_eq!(parse_offset("Size", " 64 ").unwrap(), 64);
        assert!(parse_offset("Size", "-4").is_err());
        assert_eq!(parse_float("Tick", "50").unwrap(), 50.0);
        assert!(matches!(
            parse_float("Tick", "fast"),
            Err(Error::InvalidValue { .. })
        ));
    }
}
