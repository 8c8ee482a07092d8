use std::io::Read;

use crate::error::{RdbError, RdbResult};
use crate::lzf;

/// The result of reading one Redis length-encoding token: either a plain
/// length, or a marker that the following bytes use a special encoding
/// (integer-as-string or LZF-compressed string).
enum LengthToken {
    Plain(u64),
    Special(u8),
}

fn read_length_token<R: Read>(reader: &mut R) -> RdbResult<LengthToken> {
    let first = read_byte(reader)?;
    match (first & 0xC0) >> 6 {
        0b00 => Ok(LengthToken::Plain(u64::from(first & 0x3F))),
        0b01 => {
            let second = read_byte(reader)?;
            let len = (u64::from(first & 0x3F) << 8) | u64::from(second);
            Ok(LengthToken::Plain(len))
        }
        0b10 => {
            if first == 0x80 {
                let mut buf = [0u8; 4];
                reader.read_exact(&mut buf)?;
                Ok(LengthToken::Plain(u64::from(u32::from_be_bytes(buf))))
            } else if first == 0x81 {
                let mut buf = [0u8; 8];
                reader.read_exact(&mut buf)?;
                Ok(LengthToken::Plain(u64::from_be_bytes(buf)))
            } else {
                Err(RdbError::malformed(format!(
                    "invalid 32/64-bit length marker byte {first:#04x}"
                )))
            }
        }
        0b11 => Ok(LengthToken::Special(first & 0x3F)),
        _ => unreachable!("two-bit mask always matches one of the above arms"),
    }
}

/// Reads one byte.
pub fn read_byte<R: Read>(reader: &mut R) -> RdbResult<u8> {
    let mut buf = [0u8; 1];
    reader.read_exact(&mut buf)?;
    Ok(buf[0])
}

/// Reads a plain Redis length. Fails if the encoded token is a special
/// (integer or LZF) marker rather than a length.
pub fn read_length<R: Read>(reader: &mut R) -> RdbResult<u64> {
    match read_length_token(reader)? {
        LengthToken::Plain(len) => Ok(len),
        LengthToken::Special(kind) => Err(RdbError::malformed(format!(
            "expected a plain length, found special encoding {kind}"
        ))),
    }
}

/// Reads a Redis-encoded string: either a length-prefixed byte run, an
/// integer stored as its own compact encoding, or an LZF-compressed blob.
pub fn read_string<R: Read>(reader: &mut R) -> RdbResult<Vec<u8>> {
    match read_length_token(reader)? {
        LengthToken::Plain(len) => {
            let mut buf = vec![0u8; len as usize];
            reader.read_exact(&mut buf)?;
            Ok(buf)
        }
        LengthToken::Special(0) => {
            let value = read_byte(reader)? as i8;
            Ok(value.to_string().into_bytes())
        }
        LengthToken::Special(1) => {
            let mut buf = [0u8; 2];
            reader.read_exact(&mut buf)?;
            Ok(i16::from_le_bytes(buf).to_string().into_bytes())
        }
        LengthToken::Special(2) => {
            let mut buf = [0u8; 4];
            reader.read_exact(&mut buf)?;
            Ok(i32::from_le_bytes(buf).to_string().into_bytes())
        }
        LengthToken::Special(3) => {
            let compressed_len = read_length(reader)? as usize;
            let real_len = read_length(reader)? as usize;
            let mut compressed = vec![0u8; compressed_len];
            reader.read_exact(&mut compressed)?;
            lzf::decompress(&compressed, real_len)
        }
        LengthToken::Special(other) => Err(RdbError::malformed(format!(
            "unknown string special encoding {other}"
        ))),
    }
}

/// Reads an 8-byte IEEE-754 double, little-endian (the `RDB_TYPE_ZSET_2` /
/// module encoding).
pub fn read_double<R: Read>(reader: &mut R) -> RdbResult<f64> {
    let mut buf = [0u8; 8];
    reader.read_exact(&mut buf)?;
    Ok(f64::from_le_bytes(buf))
}

/// Reads the legacy ASCII-encoded float format used by `RDB_TYPE_ZSET`
/// (v1): a length byte of 253/254/255 means NaN/+Inf/-Inf, otherwise that
/// many ASCII digits follow and are parsed as a decimal float.
pub fn read_float<R: Read>(reader: &mut R) -> RdbResult<f64> {
    let len = read_byte(reader)?;
    match len {
        253 => Ok(f64::NAN),
        254 => Ok(f64::INFINITY),
        255 => Ok(f64::NEG_INFINITY),
        _ => {
            let mut buf = vec![0u8; len as usize];
            reader.read_exact(&mut buf)?;
            let text = std::str::from_utf8(&buf)
                .map_err(|_| RdbError::malformed("legacy float digits were not valid UTF-8"))?;
            text.parse::<f64>()
                .map_err(|_| RdbError::malformed(format!("invalid legacy float digits: {text:?}")))
        }
    }
}

/// Reads a 32-bit unsigned integer, little-endian (expire-in-seconds opcode).
pub fn read_u32_le<R: Read>(reader: &mut R) -> RdbResult<u32> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

/// Reads a 64-bit unsigned integer, little-endian (expire-in-ms opcode, and
/// the per-field-TTL hash layouts' `min_expire`).
pub fn read_u64_le<R: Read>(reader: &mut R) -> RdbResult<u64> {
    let mut buf = [0u8; 8];
    reader.read_exact(&mut buf)?;
    Ok(u64::from_le_bytes(buf))
}

/// Formats a float the way the source does for `ZADD` scores: `%.17g`.
#[must_use]
pub fn format_score(score: f64) -> String {
    if score.is_nan() {
        return "nan".to_owned();
    }
    if score.is_infinite() {
        return if score > 0.0 { "inf".to_owned() } else { "-inf".to_owned() };
    }
    format_g17(score)
}

/// A minimal `%.17g`-equivalent formatter: up to 17 significant digits,
/// trailing zeros trimmed, matching C's `printf("%.17g", ...)` for the
/// finite range RDB scores occupy.
fn format_g17(value: f64) -> String {
    let mut formatted = format!("{value:.17e}");
    if let Some(exp_pos) = formatted.find('e') {
        let (mantissa, exponent) = formatted.split_at(exp_pos);
        let exponent: i32 = exponent[1..].parse().unwrap_or(0);
        if (-5..17).contains(&exponent) {
            let digits = mantissa.replace('.', "").replace('-', "");
            let negative = mantissa.starts_with('-');
            let mut out = String::new();
            if negative {
                out.push('-');
            }
            if exponent < 0 {
                out.push_str("0.");
                out.push_str(&"0".repeat((-exponent - 1) as usize));
                out.push_str(&digits);
            } else {
                let exponent = exponent as usize;
                if exponent + 1 >= digits.len() {
                    out.push_str(&digits);
                    out.push_str(&"0".repeat(exponent + 1 - digits.len()));
                } else {
                    out.push_str(&digits[..=exponent]);
                    out.push('.');
                    out.push_str(&digits[exponent + 1..]);
                }
            }
            formatted = out;
        }
    }
    trim_trailing_zeros(&formatted)
}

fn trim_trailing_zeros(text: &str) -> String {
    if !text.contains('.') {
        return text.to_owned();
    }
    let trimmed = text.trim_end_matches('0');
    let trimmed = trimmed.trim_end_matches('.');
    if trimmed.is_empty() || trimmed == "-" {
        "0".to_owned()
    } else {
        trimmed.to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn reads_6_bit_length() {
        let mut cursor = Cursor::new(vec![0x05]);
        assert_eq!(read_length(&mut cursor).unwrap(), 5);
    }

    #[test]
    fn reads_14_bit_length() {
        let mut cursor = Cursor::new(vec![0x42, 0x01]);
        assert_eq!(read_length(&mut cursor).unwrap(), ((0x02u64) << 8) | 1);
    }

    #[test]
    fn reads_32_bit_length() {
        let mut cursor = Cursor::new(vec![0x80, 0x00, 0x00, 0x01, 0x00]);
        assert_eq!(read_length(&mut cursor).unwrap(), 256);
    }

    #[test]
    fn reads_64_bit_length() {
        let mut cursor = Cursor::new(vec![0x81, 0, 0, 0, 0, 0, 0, 0, 1]);
        assert_eq!(read_length(&mut cursor).unwrap(), 1);
    }

    #[test]
    fn reads_int8_string() {
        let mut cursor = Cursor::new(vec![0xC0, 0xFF]);
        assert_eq!(read_string(&mut cursor).unwrap(), b"-1".to_vec());
    }

    #[test]
    fn reads_int16_string() {
        let mut cursor = Cursor::new(vec![0xC1, 0x2C, 0x01]);
        assert_eq!(read_string(&mut cursor).unwrap(), b"300".to_vec());
    }

    #[test]
    fn reads_plain_string() {
        let mut cursor = Cursor::new(vec![0x03, b'f', b'o', b'o']);
        assert_eq!(read_string(&mut cursor).unwrap(), b"foo".to_vec());
    }

    #[test]
    fn reads_double_le() {
        let mut cursor = Cursor::new(2.5f64.to_le_bytes().to_vec());
        assert_eq!(read_double(&mut cursor).unwrap(), 2.5);
    }

    #[test]
    fn reads_legacy_float_digits() {
        let mut cursor = Cursor::new({
            let mut buf = vec![3];
            buf.extend_from_slice(b"1.5");
            buf
        });
        assert_eq!(read_float(&mut cursor).unwrap(), 1.5);
    }

    #[test]
    fn reads_legacy_float_special_values() {
        assert!(read_float(&mut Cursor::new(vec![253])).unwrap().is_nan());
        assert_eq!(
            read_float(&mut Cursor::new(vec![254])).unwrap(),
            f64::INFINITY
        );
        assert_eq!(
            read_float(&mut Cursor::new(vec![255])).unwrap(),
            f64::NEG_INFINITY
        );
    }

    #[test]
    fn formats_score_like_percent_17g() {
        assert_eq!(format_score(1.0), "1");
        assert_eq!(format_score(2.5), "2.5");
        assert_eq!(format_score(0.0), "0");
    }
}
