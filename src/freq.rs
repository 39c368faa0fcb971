//! The character-frequency table and its JSON wire format.
//!
//! The surrounding platform ships the table as a JSON object mapping
//! decimal-stringified code points to counts, e.g. `{"97":3,"98":2}`.

use std::collections::BTreeMap;

use crate::CodecError;
use crate::codebook::Symbol;

/// Scalar -> occurrence count. Ordered so that the codebook builder sees a
/// deterministic insertion order, which pins the tie-break across runs.
pub type FrequencyTable = BTreeMap<Symbol, u64>;

/// Counts the Unicode scalars of `text`, producing the same table the
/// upload-side counter emits for that stream.
pub fn count_scalars(text: &str) -> FrequencyTable {
    let mut freq = FrequencyTable::new();
    for ch in text.chars() {
        *freq.entry(ch as u32).or_insert(0) += 1;
    }
    freq
}

/// Parses the wire-format JSON object into a frequency table.
pub fn frequency_table_from_json(data: &[u8]) -> Result<FrequencyTable, CodecError> {
    let raw: BTreeMap<String, u64> = serde_json::from_slice(data)?;

    let mut freq = FrequencyTable::new();
    for (key, count) in raw {
        let scalar: u32 = key
            .parse()
            .map_err(|_| CodecError::InvalidFrequencyTable("key is not a decimal code point"))?;
        if char::from_u32(scalar).is_none() {
            return Err(CodecError::InvalidFrequencyTable(
                "key is not a unicode scalar value",
            ));
        }
        if count == 0 {
            return Err(CodecError::InvalidFrequencyTable("count must be positive"));
        }
        // Distinct JSON keys such as "97" and "097" can name the same scalar.
        if freq.insert(scalar, count).is_some() {
            return Err(CodecError::InvalidFrequencyTable("duplicate code point"));
        }
    }
    Ok(freq)
}

/// Renders a frequency table back into the wire format.
pub fn frequency_table_to_json(freq: &FrequencyTable) -> Result<Vec<u8>, CodecError> {
    let raw: BTreeMap<String, u64> = freq
        .iter()
        .map(|(&symbol, &count)| (symbol.to_string(), count))
        .collect();
    Ok(serde_json::to_vec(&raw)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_scalars_not_bytes() {
        let freq = count_scalars("ab中🚀a");
        assert_eq!(freq[&('a' as u32)], 2);
        assert_eq!(freq[&('b' as u32)], 1);
        assert_eq!(freq[&0x4E2D], 1);
        assert_eq!(freq[&0x1F680], 1);
        assert_eq!(freq.len(), 4);
    }

    #[test]
    fn parses_the_documented_example() {
        let freq = frequency_table_from_json(br#"{"97":3,"98":2}"#).expect("parse should succeed");
        assert_eq!(freq[&97], 3);
        assert_eq!(freq[&98], 2);
        assert_eq!(freq.len(), 2);
    }

    #[test]
    fn rejects_non_decimal_keys() {
        let error = frequency_table_from_json(br#"{"0x61":1}"#).expect_err("bad key should fail");
        assert!(matches!(error, CodecError::InvalidFrequencyTable(_)));
    }

    #[test]
    fn rejects_zero_counts() {
        let error = frequency_table_from_json(br#"{"97":0}"#).expect_err("zero count should fail");
        assert!(matches!(error, CodecError::InvalidFrequencyTable(_)));
    }

    #[test]
    fn rejects_surrogate_code_points() {
        let error =
            frequency_table_from_json(br#"{"55296":1}"#).expect_err("surrogate should fail");
        assert!(matches!(error, CodecError::InvalidFrequencyTable(_)));
    }

    #[test]
    fn rejects_aliased_keys() {
        let error = frequency_table_from_json(br#"{"97":1,"097":2}"#)
            .expect_err("aliased keys should fail");
        assert!(matches!(error, CodecError::InvalidFrequencyTable(_)));
    }

    #[test]
    fn rejects_malformed_json() {
        let error = frequency_table_from_json(b"{").expect_err("broken json should fail");
        assert!(matches!(error, CodecError::FrequencyTableJson(_)));
    }

    #[test]
    fn wire_format_round_trips() {
        let freq = count_scalars("frequency table round trip \u{4E2D}");
        let json = frequency_table_to_json(&freq).expect("render should succeed");
        let parsed = frequency_table_from_json(&json).expect("parse should succeed");
        assert_eq!(parsed, freq);
    }
}
