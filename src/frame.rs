//! The outer container: `header_len (u16 LE) · header · [segment…]` where
//! each segment frame is `pad_zeros (u8) · byte_length (u32 LE) · bytes`.
//! End-of-stream after a complete segment is normal termination.

use crate::CodecError;
use crate::body::Segment;

pub(crate) const HEADER_LEN_FIELD: usize = 2;
pub(crate) const SEGMENT_META_LEN: usize = 5;
pub(crate) const MAX_PAD_ZEROS: u8 = 7;

pub(crate) fn encode_container(
    header: &[u8],
    segments: &[Segment],
) -> Result<Vec<u8>, CodecError> {
    let header_len =
        u16::try_from(header.len()).map_err(|_| CodecError::AlphabetTooLarge(header.len()))?;

    let framed_len: usize = segments
        .iter()
        .map(|segment| SEGMENT_META_LEN + segment.bytes.len())
        .sum();
    let mut out = Vec::with_capacity(HEADER_LEN_FIELD + header.len() + framed_len);

    out.extend_from_slice(&header_len.to_le_bytes());
    out.extend_from_slice(header);

    for segment in segments {
        let byte_length =
            u32::try_from(segment.bytes.len()).map_err(|_| CodecError::SegmentTooLarge)?;
        out.push(segment.pad_zeros);
        write_u32(&mut out, byte_length);
        out.extend_from_slice(&segment.bytes);
    }

    Ok(out)
}

pub(crate) fn decode_container(data: &[u8]) -> Result<(Vec<u8>, Vec<Segment>), CodecError> {
    let header_len =
        read_u16(data, 0).ok_or(CodecError::TruncatedFile("missing header length"))? as usize;
    let header_end = HEADER_LEN_FIELD + header_len;
    let header = data
        .get(HEADER_LEN_FIELD..header_end)
        .ok_or(CodecError::TruncatedFile(
            "header is shorter than its declared length",
        ))?
        .to_vec();

    let mut segments = Vec::new();
    let mut cursor = header_end;
    while cursor < data.len() {
        let pad_zeros = data[cursor];
        cursor += 1;
        if pad_zeros > MAX_PAD_ZEROS {
            return Err(CodecError::MalformedSegment("pad_zeros out of range"));
        }

        let byte_length = read_u32(data, cursor)
            .ok_or(CodecError::TruncatedFile("segment length is cut short"))?
            as usize;
        cursor += 4;

        let end = cursor
            .checked_add(byte_length)
            .ok_or(CodecError::TruncatedFile("segment length overflows the file"))?;
        let bytes = data
            .get(cursor..end)
            .ok_or(CodecError::TruncatedFile("segment body is cut short"))?
            .to_vec();
        cursor = end;

        segments.push(Segment { pad_zeros, bytes });
    }

    Ok((header, segments))
}

pub(crate) fn write_u32(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_le_bytes());
}

pub(crate) fn read_u16(bytes: &[u8], offset: usize) -> Option<u16> {
    let end = offset.checked_add(2)?;
    let slice = bytes.get(offset..end)?;
    Some(u16::from_le_bytes(slice.try_into().ok()?))
}

pub(crate) fn read_u32(bytes: &[u8], offset: usize) -> Option<u32> {
    let end = offset.checked_add(4)?;
    let slice = bytes.get(offset..end)?;
    Some(u32::from_le_bytes(slice.try_into().ok()?))
}
