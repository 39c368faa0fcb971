//! Bit-packed segment encoding and trie-walking decode.
//!
//! A segment is one independently decodable unit: its final byte is padded
//! with `pad_zeros` trailing zero bits so that no code straddles a segment
//! boundary.

use crate::codebook::{Node, PrefixTable};
use crate::{CancelFlag, CodecError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub pad_zeros: u8,
    pub bytes: Vec<u8>,
}

/// Packs `scalars` into a bit stream, MSB first within each byte.
pub fn encode_segment(
    table: &PrefixTable,
    scalars: &[char],
    cancel: &CancelFlag,
) -> Result<Segment, CodecError> {
    let mut bytes = Vec::with_capacity(scalars.len());
    let mut acc = 0_u8;
    let mut bit_count = 0_u8;

    for &ch in scalars {
        if cancel.is_cancelled() {
            return Err(CodecError::Cancelled);
        }
        let symbol = ch as u32;
        let entry = table
            .get(&symbol)
            .copied()
            .ok_or(CodecError::UnknownSymbol(symbol))?;

        for i in (0..entry.bits).rev() {
            acc = (acc << 1) | ((entry.code >> i) & 1) as u8;
            bit_count += 1;
            if bit_count == 8 {
                bytes.push(acc);
                acc = 0;
                bit_count = 0;
            }
        }
    }

    let mut pad_zeros = 0_u8;
    if bit_count > 0 {
        pad_zeros = 8 - bit_count;
        bytes.push(acc << pad_zeros);
    }

    Ok(Segment { pad_zeros, bytes })
}

/// Walks the trie over `bytes`, bit 7 down to bit 0 of each byte, skipping
/// the final byte's `pad_zeros` low bits. The walk must end back at the root.
pub fn decode_segment(
    root: &Node,
    bytes: &[u8],
    pad_zeros: u8,
    cancel: &CancelFlag,
) -> Result<String, CodecError> {
    if pad_zeros > 7 {
        return Err(CodecError::MalformedSegment("pad_zeros out of range"));
    }
    if pad_zeros > 0 && bytes.is_empty() {
        return Err(CodecError::MalformedSegment("pad without a final byte"));
    }

    let mut out = String::new();
    let mut node = root;
    let last = bytes.len().saturating_sub(1);

    for (i, &byte) in bytes.iter().enumerate() {
        if cancel.is_cancelled() {
            return Err(CodecError::Cancelled);
        }
        let end_bit = if i == last { pad_zeros } else { 0 };
        for bit_pos in (end_bit..8).rev() {
            let bit = (byte >> bit_pos) & 1;
            let Node::Internal { left, right } = node else {
                return Err(CodecError::Internal("decode cursor stopped on a leaf"));
            };
            let next = if bit == 0 { left } else { right };
            node = next
                .as_deref()
                .ok_or(CodecError::InvalidCode("code walks into a missing child"))?;

            if let Node::Leaf { symbol, .. } = node {
                let ch = char::from_u32(*symbol)
                    .ok_or(CodecError::Internal("leaf stores an invalid scalar"))?;
                out.push(ch);
                node = root;
            }
        }
    }

    if !std::ptr::eq(node, root) {
        return Err(CodecError::TruncatedSegment(
            "final code crosses the segment boundary",
        ));
    }
    if out.is_empty() && !bytes.is_empty() {
        return Err(CodecError::InvalidCode("non-empty segment decoded to nothing"));
    }
    Ok(out)
}
