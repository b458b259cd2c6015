use alloy_json_abi::JsonAbi;
use alloy_primitives::keccak256;

use super::Error;

/// Decodes a function's display name from the first 4 bytes of call input
/// against a contract's stored ABI. Returns `None`
/// for unknown selectors or when the contract has no ABI on file — this is
/// an expected outcome, not an error.
pub fn decode_function_name(abi_json: &serde_json::Value, input: &str) -> Result<Option<String>, Error> {
    let selector = match extract_selector(input)? {
        Some(s) => s,
        None => return Ok(None),
    };
    let abi: JsonAbi = serde_json::from_value(abi_json.clone())
        .map_err(|e| Error::InvalidAbiJson(e.to_string()))?;
    for function in abi.functions() {
        let signature = function.signature();
        let hash = keccak256(signature.as_bytes());
        if hash[..4] == selector {
            return Ok(Some(function.name.clone()));
        }
    }
    Ok(None)
}

fn extract_selector(input: &str) -> Result<Option<[u8; 4]>, Error> {
    let stripped = input.strip_prefix("0x").unwrap_or(input);
    if stripped.len() < 8 {
        return Ok(None);
    }
    let value = u32::from_str_radix(&stripped[..8], 16)
        .map_err(|e| Error::InvalidHex(e.to_string()))?;
    Ok(Some(value.to_be_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_known_erc20_transfer_selector() {
        let abi = json!([
            {
                "type": "function",
                "name": "transfer",
                "inputs": [
                    {"name": "to", "type": "address"},
                    {"name": "amount", "type": "uint256"}
                ],
                "outputs": [{"name": "", "type": "bool"}],
                "stateMutability": "nonpayable"
            }
        ]);
        // keccak256("transfer(address,uint256)")[..4] = 0xa9059cbb
        let input = "0xa9059cbb0000000000000000000000000000000000000000000000000000000000000000";
        let name = decode_function_name(&abi, input).unwrap();
        assert_eq!(name, Some("transfer".to_string()));
    }

    #[test]
    fn unknown_selector_returns_none() {
        let abi = json!([]);
        let input = "0xdeadbeef";
        assert_eq!(decode_function_name(&abi, input).unwrap(), None);
    }

    #[test]
    fn short_input_returns_none_not_error() {
        let abi = json!([]);
        assert_eq!(decode_function_name(&abi, "0x").unwrap(), None);
    }
}
