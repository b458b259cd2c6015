use alloy_primitives::{hex, keccak256, U256};

use crate::domain::{Address, Log};

use super::Error;

/// `keccak256("Transfer(address,address,uint256)")`, the ERC-20/721 transfer
/// topic0 used both for stablecoin valuation and
/// circulated-volume accounting. Hashed on first use and
/// cached rather than hand-copied, so the value can never drift from the
/// signature it was derived from.
pub fn transfer_topic0() -> &'static str {
    static TOPIC: std::sync::OnceLock<String> = std::sync::OnceLock::new();
    TOPIC.get_or_init(|| format!("0x{}", hex::encode(keccak256(b"Transfer(address,address,uint256)"))))
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransferLog {
    pub token: Address,
    pub from: Address,
    pub to: Address,
    pub amount: U256,
}

/// Decodes a standard ERC-20 `Transfer(address indexed from, address indexed
/// to, uint256 value)` log. Returns `None` for anything that isn't shaped
/// like one (wrong topic count/topic0, unparsable data) rather than an
/// error — unrecognized log shapes are an expected, common case.
pub fn decode_transfer_log(log: &Log) -> Option<TransferLog> {
    if log.topics.len() != 3 || !log.topics[0].eq_ignore_ascii_case(transfer_topic0()) {
        return None;
    }
    let from = topic_to_address(&log.topics[1])?;
    let to = topic_to_address(&log.topics[2])?;
    let amount = decode_word_at(&log.data, 0).ok().map(|w| U256::from_be_bytes(w))?;
    Some(TransferLog { token: log.address, from, to, amount })
}

fn topic_to_address(topic: &str) -> Option<Address> {
    let stripped = topic.strip_prefix("0x").unwrap_or(topic);
    if stripped.len() != 64 {
        return None;
    }
    Address::parse(&format!("0x{}", &stripped[24..])).ok()
}

/// Extracts the `index`-th 32-byte word from a log's `data` field.
///
/// Bridge aggregation reads "the second 32-byte word" of
/// `OFTSent`/`OFTReceived` logs for the bridged amount; this is the one
/// place that indexing is expressed.
pub fn decode_word_at(data: &str, index: usize) -> Result<[u8; 32], Error> {
    let stripped = data.strip_prefix("0x").unwrap_or(data);
    let bytes = hex::decode(stripped).map_err(|e| Error::InvalidHex(e.to_string()))?;
    let start = index * 32;
    let end = start + 32;
    if bytes.len() < end {
        return Err(Error::TruncatedData(index));
    }
    let mut word = [0u8; 32];
    word.copy_from_slice(&bytes[start..end]);
    Ok(word)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(n: u8) -> Address {
        Address::parse(&format!("0x{:040x}", n)).unwrap()
    }

    #[test]
    fn decodes_well_formed_transfer() {
        let log = Log {
            index: 0,
            address: addr(0xAA),
            topics: vec![
                transfer_topic0().to_string(),
                format!("0x{:064x}", 0x11u64),
                format!("0x{:064x}", 0x22u64),
            ],
            data: format!("0x{:064x}", 1_000_000u64),
        };
        let transfer = decode_transfer_log(&log).unwrap();
        assert_eq!(transfer.from, addr(0x11));
        assert_eq!(transfer.to, addr(0x22));
        assert_eq!(transfer.amount, U256::from(1_000_000u64));
    }

    #[test]
    fn rejects_wrong_topic_count() {
        let log = Log {
            index: 0,
            address: addr(0xAA),
            topics: vec![transfer_topic0().to_string()],
            data: "0x".into(),
        };
        assert!(decode_transfer_log(&log).is_none());
    }

    #[test]
    fn decode_word_at_reads_second_word() {
        let first = format!("{:064x}", 1u64);
        let second = format!("{:064x}", 42u64);
        let data = format!("0x{first}{second}");
        let word = decode_word_at(&data, 1).unwrap();
        assert_eq!(U256::from_be_bytes(word), U256::from(42u64));
    }

    #[test]
    fn decode_word_at_truncated_errors() {
        let data = format!("0x{:064x}", 1u64);
        assert!(decode_word_at(&data, 1).is_err());
    }
}
