//! The on-disk codebook: a flat stream of 9-byte leaf records
//! `(symbol u32 LE, code u32 LE, bit_length u8)` in pre-order.

use crate::CodecError;
use crate::codebook::{MAX_CODE_BITS, Node, Symbol};
use crate::frame::read_u32;

pub const LEAF_RECORD_LEN: usize = 9;

/// Serializes the trie's leaves in pre-order. Internal nodes emit nothing.
pub fn serialize_tree(root: &Node) -> Vec<u8> {
    let mut out = Vec::new();
    write_leaf_records(root, &mut out);
    out
}

fn write_leaf_records(node: &Node, out: &mut Vec<u8>) {
    match node {
        Node::Leaf { symbol, code, bits } => {
            out.extend_from_slice(&symbol.to_le_bytes());
            out.extend_from_slice(&code.to_le_bytes());
            out.push(*bits);
        }
        Node::Internal { left, right } => {
            if let Some(child) = left {
                write_leaf_records(child, out);
            }
            if let Some(child) = right {
                write_leaf_records(child, out);
            }
        }
    }
}

/// Rebuilds the decoding trie from a serialized header.
///
/// Every record inserts one root-to-leaf path; the records must describe a
/// prefix-free code over valid Unicode scalars.
pub fn parse_tree(header: &[u8]) -> Result<Node, CodecError> {
    if header.is_empty() {
        return Err(CodecError::MalformedHeader("header carries no leaf records"));
    }
    if header.len() % LEAF_RECORD_LEN != 0 {
        return Err(CodecError::MalformedHeader(
            "length is not a multiple of the record size",
        ));
    }

    let mut root = Node::internal();
    for record in header.chunks_exact(LEAF_RECORD_LEN) {
        let symbol =
            read_u32(record, 0).ok_or(CodecError::MalformedHeader("leaf record is cut short"))?;
        let code =
            read_u32(record, 4).ok_or(CodecError::MalformedHeader("leaf record is cut short"))?;
        let bits = record[8];

        if char::from_u32(symbol).is_none() {
            return Err(CodecError::MalformedHeader(
                "symbol is not a unicode scalar value",
            ));
        }
        if bits == 0 || bits > MAX_CODE_BITS {
            return Err(CodecError::MalformedHeader("bit length out of range"));
        }
        if bits < MAX_CODE_BITS && (code >> bits) != 0 {
            return Err(CodecError::MalformedHeader(
                "code has bits above its stated length",
            ));
        }

        insert_leaf(&mut root, symbol, code, bits)?;
    }
    Ok(root)
}

fn insert_leaf(root: &mut Node, symbol: Symbol, code: u32, bits: u8) -> Result<(), CodecError> {
    let mut node = root;
    for i in (0..bits).rev() {
        let Node::Internal { left, right } = node else {
            return Err(CodecError::MalformedHeader("code passes through another leaf"));
        };
        let slot = if (code >> i) & 1 == 0 { left } else { right };
        if i == 0 {
            if slot.is_some() {
                return Err(CodecError::MalformedHeader("code path already occupied"));
            }
            *slot = Some(Box::new(Node::Leaf { symbol, code, bits }));
            return Ok(());
        }
        node = slot
            .get_or_insert_with(|| Box::new(Node::internal()))
            .as_mut();
    }
    Err(CodecError::Internal("leaf insertion fell through"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codebook::build_codebook;
    use crate::freq::count_scalars;

    fn record(symbol: u32, code: u32, bits: u8) -> Vec<u8> {
        let mut out = Vec::with_capacity(LEAF_RECORD_LEN);
        out.extend_from_slice(&symbol.to_le_bytes());
        out.extend_from_slice(&code.to_le_bytes());
        out.push(bits);
        out
    }

    #[test]
    fn built_trees_survive_the_wire() {
        let freq = count_scalars("this is a test for compression");
        let (tree, _) = build_codebook(&freq).expect("build should succeed");

        let header = serialize_tree(&tree);
        assert_eq!(header.len() % LEAF_RECORD_LEN, 0);
        assert_eq!(header.len() / LEAF_RECORD_LEN, freq.len());

        // The rebuilt trie has the same shape, so a second serialization is
        // byte-identical.
        let parsed = parse_tree(&header).expect("parse should succeed");
        assert_eq!(serialize_tree(&parsed), header);
    }

    #[test]
    fn single_record_header() {
        let header = record('a' as u32, 0, 1);
        let tree = parse_tree(&header).expect("parse should succeed");

        let Node::Internal { left, right } = &tree else {
            panic!("root must be internal");
        };
        assert!(right.is_none());
        assert!(matches!(
            left.as_deref(),
            Some(Node::Leaf { symbol, .. }) if *symbol == 'a' as u32
        ));
    }

    #[test]
    fn empty_header_is_rejected() {
        let error = parse_tree(&[]).expect_err("empty header should fail");
        assert!(matches!(error, CodecError::MalformedHeader(_)));
    }

    #[test]
    fn ragged_length_is_rejected() {
        let mut header = record('a' as u32, 0, 1);
        header.pop();
        let error = parse_tree(&header).expect_err("ragged header should fail");
        assert!(matches!(error, CodecError::MalformedHeader(_)));
    }

    #[test]
    fn zero_bit_length_is_rejected() {
        let header = record('a' as u32, 0, 0);
        let error = parse_tree(&header).expect_err("zero bits should fail");
        assert!(matches!(error, CodecError::MalformedHeader(_)));
    }

    #[test]
    fn oversized_bit_length_is_rejected() {
        let header = record('a' as u32, 0, 33);
        let error = parse_tree(&header).expect_err("33 bits should fail");
        assert!(matches!(error, CodecError::MalformedHeader(_)));
    }

    #[test]
    fn stray_high_code_bits_are_rejected() {
        let header = record('a' as u32, 0b100, 2);
        let error = parse_tree(&header).expect_err("stray bits should fail");
        assert!(matches!(error, CodecError::MalformedHeader(_)));
    }

    #[test]
    fn duplicate_paths_are_rejected() {
        let mut header = record('a' as u32, 0, 1);
        header.extend_from_slice(&record('b' as u32, 0, 1));
        let error = parse_tree(&header).expect_err("duplicate path should fail");
        assert!(matches!(error, CodecError::MalformedHeader(_)));
    }

    #[test]
    fn prefix_collisions_are_rejected() {
        // "0" and "01": the second code routes through the first leaf.
        let mut header = record('a' as u32, 0, 1);
        header.extend_from_slice(&record('b' as u32, 0b01, 2));
        let error = parse_tree(&header).expect_err("prefix collision should fail");
        assert!(matches!(error, CodecError::MalformedHeader(_)));

        // The reverse order occupies an internal slot with a leaf instead.
        let mut header = record('b' as u32, 0b01, 2);
        header.extend_from_slice(&record('a' as u32, 0, 1));
        let error = parse_tree(&header).expect_err("prefix collision should fail");
        assert!(matches!(error, CodecError::MalformedHeader(_)));
    }

    #[test]
    fn non_scalar_symbol_is_rejected() {
        let header = record(0xD800, 0, 1);
        let error = parse_tree(&header).expect_err("surrogate should fail");
        assert!(matches!(error, CodecError::MalformedHeader(_)));
    }

    #[test]
    fn deep_multilingual_tree_round_trips() {
        let freq = count_scalars("中中中🚀🚀 ab\0ab 中🚀");
        let (tree, table) = build_codebook(&freq).expect("build should succeed");

        let header = serialize_tree(&tree);
        let parsed = parse_tree(&header).expect("parse should succeed");
        assert_eq!(serialize_tree(&parsed), header);
        assert_eq!(header.len() / LEAF_RECORD_LEN, table.len());
    }
}
