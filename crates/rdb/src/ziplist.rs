use crate::error::{RdbError, RdbResult};
use crate::length;

/// Decodes a legacy ziplist blob (as embedded in `RDB_TYPE_*_ZIPLIST` value
/// types) into its flat entry sequence, rendering integer entries as
/// decimal ASCII the same way the source does before handing them to the
/// command rewriter.
///
/// # Errors
///
/// Returns [`RdbError::Malformed`] if the blob is shorter than its own
/// declared header, or an entry's encoding byte is not a recognized ziplist
/// encoding.
pub fn decode(blob: &[u8]) -> RdbResult<Vec<Vec<u8>>> {
    if blob.len() < 11 {
        return Err(RdbError::malformed("ziplist blob shorter than its header"));
    }
    let declared_len = u16::from_le_bytes([blob[8], blob[9]]);
    let mut entries = Vec::new();
    let mut pos = 10usize;

    loop {
        let marker = *blob
            .get(pos)
            .ok_or_else(|| RdbError::malformed("ziplist ended without terminator"))?;
        if marker == 0xFF {
            break;
        }
        pos += skip_prevlen(&blob[pos..])?;
        let (entry, consumed) = read_entry(&blob[pos..])?;
        entries.push(entry);
        pos += consumed;
    }

    if declared_len != 0xFFFF && entries.len() as u16 != declared_len {
        tracing::debug!(
            declared = declared_len,
            actual = entries.len(),
            "ziplist entry count mismatch (zllen saturated or stale)"
        );
    }
    Ok(entries)
}

fn skip_prevlen(buf: &[u8]) -> RdbResult<usize> {
    let first = *buf
        .first()
        .ok_or_else(|| RdbError::malformed("ziplist entry missing prevlen"))?;
    if first < 254 {
        Ok(1)
    } else {
        if buf.len() < 5 {
            return Err(RdbError::malformed("ziplist prevlen truncated"));
        }
        Ok(5)
    }
}

fn read_entry(buf: &[u8]) -> RdbResult<(Vec<u8>, usize)> {
    let first = *buf
        .first()
        .ok_or_else(|| RdbError::malformed("ziplist entry missing encoding byte"))?;
    match first & 0xC0 {
        0x00 => {
            let len = (first & 0x3F) as usize;
            let data = read_bytes(buf, 1, len)?;
            Ok((data.to_vec(), 1 + len))
        }
        0x40 => {
            let next = *buf
                .get(1)
                .ok_or_else(|| RdbError::malformed("ziplist 14-bit length truncated"))?;
            let len = (((first & 0x3F) as usize) << 8) | next as usize;
            let data = read_bytes(buf, 2, len)?;
            Ok((data.to_vec(), 2 + len))
        }
        0x80 if first == 0x80 => {
            let len_bytes = read_bytes(buf, 1, 4)?;
            let len = u32::from_be_bytes([len_bytes[0], len_bytes[1], len_bytes[2], len_bytes[3]])
                as usize;
            let data = read_bytes(buf, 5, len)?;
            Ok((data.to_vec(), 5 + len))
        }
        0xC0 => match first {
            0xC0 => {
                let raw = read_bytes(buf, 1, 2)?;
                let value = i16::from_le_bytes([raw[0], raw[1]]);
                Ok((value.to_string().into_bytes(), 3))
            }
            0xD0 => {
                let raw = read_bytes(buf, 1, 4)?;
                let value = i32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]);
                Ok((value.to_string().into_bytes(), 5))
            }
            0xE0 => {
                let raw = read_bytes(buf, 1, 8)?;
                let value = i64::from_le_bytes(raw.try_into().unwrap());
                Ok((value.to_string().into_bytes(), 9))
            }
            0xF0 => {
                let raw = read_bytes(buf, 1, 3)?;
                let mut sign_extended = [0u8; 4];
                sign_extended[..3].copy_from_slice(raw);
                if raw[2] & 0x80 != 0 {
                    sign_extended[3] = 0xFF;
                }
                let value = i32::from_le_bytes(sign_extended);
                Ok((value.to_string().into_bytes(), 4))
            }
            0xFE => {
                let raw = read_bytes(buf, 1, 1)?;
                let value = raw[0] as i8;
                Ok((value.to_string().into_bytes(), 2))
            }
            0xF1..=0xFD => {
                let value = (first & 0x0F) as i64 - 1;
                Ok((value.to_string().into_bytes(), 1))
            }
            other => Err(RdbError::malformed(format!(
                "unknown ziplist integer encoding byte {other:#04x}"
            ))),
        },
        other => Err(RdbError::malformed(format!(
            "unknown ziplist encoding mask {other:#04x}"
        ))),
    }
}

fn read_bytes(buf: &[u8], offset: usize, len: usize) -> RdbResult<&[u8]> {
    buf.get(offset..offset + len)
        .ok_or_else(|| RdbError::malformed("ziplist entry data truncated"))
}

/// Decodes an intset blob (`RDB_TYPE_SET_INTSET`) into decimal ASCII members.
pub fn decode_intset(blob: &[u8]) -> RdbResult<Vec<Vec<u8>>> {
    let mut cursor = std::io::Cursor::new(blob);
    let encoding = length::read_u32_le(&mut cursor)?;
    let length = length::read_u32_le(&mut cursor)? as usize;
    let mut out = Vec::with_capacity(length);
    for _ in 0..length {
        let value = match encoding {
            2 => {
                let mut buf = [0u8; 2];
                std::io::Read::read_exact(&mut cursor, &mut buf)?;
                i64::from(i16::from_le_bytes(buf))
            }
            4 => {
                let mut buf = [0u8; 4];
                std::io::Read::read_exact(&mut cursor, &mut buf)?;
                i64::from(i32::from_le_bytes(buf))
            }
            8 => {
                let mut buf = [0u8; 8];
                std::io::Read::read_exact(&mut cursor, &mut buf)?;
                i64::from_le_bytes(buf)
            }
            other => {
                return Err(RdbError::malformed(format!(
                    "unknown intset encoding width {other}"
                )))
            }
        };
        out.push(value.to_string().into_bytes());
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_ziplist(entries: &[&[u8]]) -> Vec<u8> {
        let mut body = Vec::new();
        for entry in entries {
            body.push(0u8); // prevlen placeholder
            body.push(entry.len() as u8);
            body.extend_from_slice(entry);
        }
        body.push(0xFF);
        let zlbytes = (10 + body.len()) as u32;
        let mut out = Vec::new();
        out.extend_from_slice(&zlbytes.to_le_bytes());
        out.extend_from_slice(&0u32.to_le_bytes());
        out.extend_from_slice(&(entries.len() as u16).to_le_bytes());
        out.extend_from_slice(&body);
        out
    }

    #[test]
    fn decodes_string_entries() {
        let blob = build_ziplist(&[b"a", b"bc"]);
        let entries = decode(&blob).unwrap();
        assert_eq!(entries, vec![b"a".to_vec(), b"bc".to_vec()]);
    }

    #[test]
    fn decodes_intset_members() {
        let mut blob = Vec::new();
        blob.extend_from_slice(&4u32.to_le_bytes());
        blob.extend_from_slice(&2u32.to_le_bytes());
        blob.extend_from_slice(&1i32.to_le_bytes());
        blob.extend_from_slice(&(-5i32).to_le_bytes());
        let members = decode_intset(&blob).unwrap();
        assert_eq!(members, vec![b"1".to_vec(), b"-5".to_vec()]);
    }
}
