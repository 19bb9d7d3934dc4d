//! Decoder for the length-prefixed, type-tagged value stream used by the
//! fingerprint database.
//!
//! Grammar (one value):
//!
//! ```text
//! i:<int>;            integer
//! b:<0|1>;            boolean
//! d:<float>;          float
//! N;                  null
//! s:<len>:"<bytes>";  byte string of exactly <len> bytes
//! a:<count>:{<key><value>...}   ordered map with <count> pairs
//! ```
//!
//! The type tag is matched case-insensitively. The decoder works on raw bytes
//! so that string payloads are never re-interpreted as UTF-8. Integers too
//! wide for `i64` decode as floats.

use thiserror::Error;

/// Maximum map nesting accepted by the decoder.
pub const MAX_DEPTH: usize = 128;

/// Error raised while decoding a typed-value stream.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("unexpected end of input while reading {expected}")]
    UnexpectedEof { expected: &'static str },

    #[error("unknown type tag {tag:?} at offset {offset}")]
    UnknownType { tag: char, offset: usize },

    #[error("malformed length prefix at offset {offset}")]
    MalformedLength { offset: usize },

    #[error("invalid {kind} literal: {text:?}")]
    InvalidNumber { kind: &'static str, text: String },

    #[error("expected {expected:?} at offset {offset}, found {found:?}")]
    ExpectedByte {
        expected: char,
        found: char,
        offset: usize,
    },

    #[error("string payload does not match declared length {declared} at offset {offset}")]
    LengthMismatch { declared: usize, offset: usize },

    #[error("maps nested too deeply at offset {offset}")]
    TooDeep { offset: usize },
}

/// A decoded value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Null,
    /// Raw payload bytes of a string token.
    Text(Vec<u8>),
    /// Key/value pairs in stream order. Keys may repeat.
    OrderedMap(Vec<(Value, Value)>),
}

impl Value {
    /// Borrow the payload of a `Text` value.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Text(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// Borrow the pairs of an `OrderedMap` value.
    pub fn as_pairs(&self) -> Option<&[(Value, Value)]> {
        match self {
            Value::OrderedMap(pairs) => Some(pairs),
            _ => None,
        }
    }

    /// Byte form of a scalar usable as a map key.
    ///
    /// Integer keys are rendered in decimal, as the producer writes numeric
    /// array indices.
    pub fn key_bytes(&self) -> Option<Vec<u8>> {
        match self {
            Value::Text(bytes) => Some(bytes.clone()),
            Value::Integer(i) => Some(i.to_string().into_bytes()),
            _ => None,
        }
    }

    /// Look up a key in an `OrderedMap`. The last matching pair wins.
    pub fn get(&self, key: &[u8]) -> Option<&Value> {
        self.as_pairs()?
            .iter()
            .rev()
            .find(|(k, _)| k.key_bytes().as_deref() == Some(key))
            .map(|(_, v)| v)
    }

    /// Name of the variant, for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::Boolean(_) => "boolean",
            Value::Null => "null",
            Value::Text(_) => "string",
            Value::OrderedMap(_) => "map",
        }
    }

    /// Encode this value into the stream format accepted by [`decode`].
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.write_to(&mut out);
        out
    }

    fn write_to(&self, out: &mut Vec<u8>) {
        match self {
            Value::Integer(i) => out.extend_from_slice(format!("i:{};", i).as_bytes()),
            Value::Float(f) => out.extend_from_slice(format!("d:{};", f).as_bytes()),
            Value::Boolean(b) => out.extend_from_slice(if *b { b"b:1;" } else { b"b:0;" }),
            Value::Null => out.extend_from_slice(b"N;"),
            Value::Text(bytes) => {
                out.extend_from_slice(format!("s:{}:\"", bytes.len()).as_bytes());
                out.extend_from_slice(bytes);
                out.extend_from_slice(b"\";");
            }
            Value::OrderedMap(pairs) => {
                out.extend_from_slice(format!("a:{}:{{", pairs.len()).as_bytes());
                for (k, v) in pairs {
                    k.write_to(out);
                    v.write_to(out);
                }
                out.push(b'}');
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.as_bytes().to_vec())
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

/// Decode exactly one value from the front of `input`.
///
/// Anything after the value is ignored.
pub fn unserialize(input: &[u8]) -> Result<Value, DecodeError> {
    decode(input).map(|(value, _)| value)
}

/// Decode one value and return it together with the unconsumed input.
pub fn decode(input: &[u8]) -> Result<(Value, &[u8]), DecodeError> {
    let mut reader = Reader {
        input,
        pos: 0,
        depth: 0,
    };
    let value = reader.value()?;
    Ok((value, &input[reader.pos..]))
}

struct Reader<'a> {
    input: &'a [u8],
    pos: usize,
    depth: usize,
}

impl<'a> Reader<'a> {
    fn value(&mut self) -> Result<Value, DecodeError> {
        let offset = self.pos;
        let tag = self.next("type tag")?.to_ascii_lowercase();

        match tag {
            b'n' => {
                self.expect(b';')?;
                Ok(Value::Null)
            }
            b'i' => {
                self.expect(b':')?;
                let text = self.until(b';', "integer")?;
                parse_integer(text)
            }
            b'd' => {
                self.expect(b':')?;
                let text = self.until(b';', "float")?;
                parse_number(text, "float").map(Value::Float)
            }
            b'b' => {
                self.expect(b':')?;
                let text = self.until(b';', "boolean")?;
                Ok(Value::Boolean(text == b"1"))
            }
            b's' => {
                self.expect(b':')?;
                let len = self.length()?;
                self.expect(b'"')?;
                let start = self.pos;
                let payload = self.take(len, "string payload")?.to_vec();
                if self.peek() != Some(b'"') {
                    return Err(DecodeError::LengthMismatch {
                        declared: len,
                        offset: start,
                    });
                }
                self.pos += 1;
                self.expect(b';')?;
                Ok(Value::Text(payload))
            }
            b'a' => {
                self.expect(b':')?;
                let count = self.length()?;
                self.expect(b'{')?;
                if self.depth >= MAX_DEPTH {
                    return Err(DecodeError::TooDeep { offset });
                }
                self.depth += 1;
                let mut pairs = Vec::with_capacity(count.min(4096));
                for _ in 0..count {
                    let key = self.value()?;
                    let value = self.value()?;
                    pairs.push((key, value));
                }
                self.depth -= 1;
                self.expect(b'}')?;
                Ok(Value::OrderedMap(pairs))
            }
            other => Err(DecodeError::UnknownType {
                tag: other as char,
                offset,
            }),
        }
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn next(&mut self, expected: &'static str) -> Result<u8, DecodeError> {
        let byte = self
            .peek()
            .ok_or(DecodeError::UnexpectedEof { expected })?;
        self.pos += 1;
        Ok(byte)
    }

    fn expect(&mut self, expected: u8) -> Result<(), DecodeError> {
        let offset = self.pos;
        let found = self.next("delimiter")?;
        if found != expected {
            return Err(DecodeError::ExpectedByte {
                expected: expected as char,
                found: found as char,
                offset,
            });
        }
        Ok(())
    }

    /// Bytes up to (not including) `terminator`; the terminator is consumed.
    fn until(&mut self, terminator: u8, expected: &'static str) -> Result<&'a [u8], DecodeError> {
        let rest = &self.input[self.pos..];
        let end = rest
            .iter()
            .position(|&b| b == terminator)
            .ok_or(DecodeError::UnexpectedEof { expected })?;
        self.pos += end + 1;
        Ok(&rest[..end])
    }

    fn take(&mut self, len: usize, expected: &'static str) -> Result<&'a [u8], DecodeError> {
        let rest = &self.input[self.pos..];
        if rest.len() < len {
            return Err(DecodeError::UnexpectedEof { expected });
        }
        self.pos += len;
        Ok(&rest[..len])
    }

    /// Decimal length prefix terminated by `:`.
    fn length(&mut self) -> Result<usize, DecodeError> {
        let offset = self.pos;
        let digits = self.until(b':', "length prefix")?;
        if digits.is_empty() || !digits.iter().all(u8::is_ascii_digit) {
            return Err(DecodeError::MalformedLength { offset });
        }
        std::str::from_utf8(digits)
            .ok()
            .and_then(|s| s.parse().ok())
            .ok_or(DecodeError::MalformedLength { offset })
    }
}

/// Integer token; out-of-range values fall back to a float.
fn parse_integer(text: &[u8]) -> Result<Value, DecodeError> {
    if let Ok(i) = parse_number::<i64>(text, "integer") {
        return Ok(Value::Integer(i));
    }

    let trimmed = text.trim_ascii();
    let digits = trimmed
        .strip_prefix(b"-")
        .or_else(|| trimmed.strip_prefix(b"+"))
        .unwrap_or(trimmed);
    if digits.is_empty() || !digits.iter().all(u8::is_ascii_digit) {
        return Err(DecodeError::InvalidNumber {
            kind: "integer",
            text: String::from_utf8_lossy(text).into_owned(),
        });
    }
    parse_number(text, "integer").map(Value::Float)
}

fn parse_number<T: std::str::FromStr>(text: &[u8], kind: &'static str) -> Result<T, DecodeError> {
    std::str::from_utf8(text)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .ok_or_else(|| DecodeError::InvalidNumber {
            kind,
            text: String::from_utf8_lossy(text).into_owned(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalars() {
        assert_eq!(unserialize(b"i:42;").unwrap(), Value::Integer(42));
        assert_eq!(unserialize(b"i:-7;").unwrap(), Value::Integer(-7));
        assert_eq!(unserialize(b"d:1.5;").unwrap(), Value::Float(1.5));
        assert_eq!(unserialize(b"b:1;").unwrap(), Value::Boolean(true));
        assert_eq!(unserialize(b"b:0;").unwrap(), Value::Boolean(false));
        assert_eq!(unserialize(b"N;").unwrap(), Value::Null);
    }

    #[test]
    fn test_type_tag_case_insensitive() {
        assert_eq!(unserialize(b"I:3;").unwrap(), Value::Integer(3));
        assert_eq!(unserialize(b"S:2:\"ok\";").unwrap(), Value::from("ok"));
        assert_eq!(unserialize(b"n;").unwrap(), Value::Null);
    }

    #[test]
    fn test_remainder_returned() {
        let (value, rest) = decode(b"i:1;i:2;").unwrap();
        assert_eq!(value, Value::Integer(1));
        assert_eq!(rest, b"i:2;");

        let (value, rest) = decode(b"N;tail").unwrap();
        assert_eq!(value, Value::Null);
        assert_eq!(rest, b"tail");
    }

    #[test]
    fn test_trailing_bytes_ignored() {
        assert_eq!(unserialize(b"s:3:\"abc\";garbage").unwrap(), Value::from("abc"));
    }

    #[test]
    fn test_string_payload_is_length_delimited() {
        // Payload contains the delimiters themselves.
        let value = unserialize(b"s:6:\"a\";b:}\";").unwrap();
        assert_eq!(value, Value::Text(b"a\";b:}".to_vec()));
    }

    #[test]
    fn test_string_binary_payload() {
        let mut stream = b"s:3:\"".to_vec();
        stream.extend_from_slice(&[0xff, 0x00, 0xfe]);
        stream.extend_from_slice(b"\";");
        assert_eq!(unserialize(&stream).unwrap(), Value::Text(vec![0xff, 0x00, 0xfe]));
    }

    #[test]
    fn test_string_length_exceeds_input() {
        let err = unserialize(b"s:10:\"short\";").unwrap_err();
        assert!(matches!(err, DecodeError::UnexpectedEof { .. }));
    }

    #[test]
    fn test_string_length_too_short_is_rejected() {
        let err = unserialize(b"s:2:\"abc\";").unwrap_err();
        assert!(matches!(err, DecodeError::LengthMismatch { declared: 2, .. }));
    }

    #[test]
    fn test_malformed_length() {
        let err = unserialize(b"s:x:\"a\";").unwrap_err();
        assert!(matches!(err, DecodeError::MalformedLength { .. }));

        let err = unserialize(b"a::{}").unwrap_err();
        assert!(matches!(err, DecodeError::MalformedLength { .. }));
    }

    #[test]
    fn test_unknown_type() {
        let err = unserialize(b"x:1;").unwrap_err();
        assert_eq!(err, DecodeError::UnknownType { tag: 'x', offset: 0 });
    }

    #[test]
    fn test_empty_input() {
        assert!(matches!(
            unserialize(b"").unwrap_err(),
            DecodeError::UnexpectedEof { .. }
        ));
    }

    #[test]
    fn test_invalid_integer() {
        let err = unserialize(b"i:abc;").unwrap_err();
        assert!(matches!(err, DecodeError::InvalidNumber { kind: "integer", .. }));
    }

    #[test]
    fn test_wide_integer_becomes_float() {
        assert_eq!(
            unserialize(b"i:20130501000000000000;").unwrap(),
            Value::Float(20130501000000000000.0)
        );
        assert_eq!(
            unserialize(b"i:-99999999999999999999;").unwrap(),
            Value::Float(-99999999999999999999.0)
        );
        assert_eq!(unserialize(b"i:9223372036854775807;").unwrap(), Value::Integer(i64::MAX));
        assert!(matches!(
            unserialize(b"i:12abc;").unwrap_err(),
            DecodeError::InvalidNumber { .. }
        ));
    }

    fn nested(levels: usize) -> Vec<u8> {
        let mut stream = b"a:1:{i:0;".repeat(levels);
        stream.extend_from_slice(b"N;");
        stream.extend(std::iter::repeat(b'}').take(levels));
        stream
    }

    #[test]
    fn test_nesting_limit() {
        assert!(unserialize(&nested(MAX_DEPTH)).is_ok());

        let err = unserialize(&nested(MAX_DEPTH + 1)).unwrap_err();
        assert!(matches!(err, DecodeError::TooDeep { .. }));

        let err = unserialize(&nested(200_000)).unwrap_err();
        assert_eq!(
            err,
            DecodeError::TooDeep {
                offset: MAX_DEPTH * 9
            }
        );
    }

    #[test]
    fn test_sibling_maps_do_not_accumulate_depth() {
        let inner = b"a:1:{i:0;N;}";
        let mut stream = format!("a:{}:{{", MAX_DEPTH + 10).into_bytes();
        for i in 0..MAX_DEPTH + 10 {
            stream.extend_from_slice(format!("i:{};", i).as_bytes());
            stream.extend_from_slice(inner);
        }
        stream.push(b'}');

        let value = unserialize(&stream).unwrap();
        assert_eq!(value.as_pairs().unwrap().len(), MAX_DEPTH + 10);
    }

    #[test]
    fn test_unterminated_integer() {
        let err = unserialize(b"i:12").unwrap_err();
        assert!(matches!(err, DecodeError::UnexpectedEof { .. }));
    }

    #[test]
    fn test_map_round_trip() {
        let source = Value::OrderedMap(vec![
            (Value::from("a"), Value::Integer(1)),
            (Value::from("b"), Value::from("x")),
        ]);
        let stream = source.to_bytes();
        assert_eq!(stream, b"a:2:{s:1:\"a\";i:1;s:1:\"b\";s:1:\"x\";}".to_vec());

        let decoded = unserialize(&stream).unwrap();
        let pairs = decoded.as_pairs().unwrap();
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0], (Value::from("a"), Value::Integer(1)));
        assert_eq!(pairs[1], (Value::from("b"), Value::from("x")));
    }

    #[test]
    fn test_nested_map() {
        let stream = b"a:1:{i:0;a:1:{s:1:\"k\";N;}}";
        let value = unserialize(stream).unwrap();
        let inner = value.get(b"0").unwrap();
        assert_eq!(inner.get(b"k"), Some(&Value::Null));
    }

    #[test]
    fn test_map_count_exceeds_entries() {
        let err = unserialize(b"a:2:{s:1:\"a\";i:1;}").unwrap_err();
        assert!(matches!(err, DecodeError::UnknownType { tag: '}', .. }));

        let err = unserialize(b"a:2:{s:1:\"a\";i:1;").unwrap_err();
        assert!(matches!(err, DecodeError::UnexpectedEof { .. }));
    }

    #[test]
    fn test_map_missing_close() {
        let err = unserialize(b"a:1:{i:0;i:1;").unwrap_err();
        assert!(matches!(err, DecodeError::UnexpectedEof { .. }));
    }

    #[test]
    fn test_duplicate_keys_last_wins() {
        let stream = b"a:2:{s:1:\"k\";i:1;s:1:\"k\";i:2;}";
        let value = unserialize(stream).unwrap();
        assert_eq!(value.as_pairs().unwrap().len(), 2);
        assert_eq!(value.get(b"k"), Some(&Value::Integer(2)));
    }
}
