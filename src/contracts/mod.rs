//! Contract interfaces for the probe legs
//!
//! The router is any UniswapV2Router02-compatible deployment; its address is
//! supplied by the caller rather than hard-coded per chain.
pub mod erc20;
pub mod uniswap_router;
pub use erc20::{IERC20, ERC20_ABI};
pub use uniswap_router::ROUTER_ABI;

use ethers::abi::{decode, ParamType, Token};

/// Selector of `Error(string)`
const ERROR_STRING_SELECTOR: [u8; 4] = [0x08, 0xc3, 0x79, 0xa0];

/// Selector of `Panic(uint256)`
const PANIC_SELECTOR: [u8; 4] = [0x4e, 0x48, 0x7b, 0x71];

/// Render revert output as a human-readable reason
pub fn decode_revert_reason(output: &[u8]) -> String {
    if output.is_empty() {
        return "execution reverted (no reason)".to_string();
    }

    if output.len() >= 4 && output[..4] == ERROR_STRING_SELECTOR {
        if let Ok(tokens) = decode(&[ParamType::String], &output[4..]) {
            if let Some(Token::String(msg)) = tokens.into_iter().next() {
                return msg;
            }
        }
    }

    if output.len() >= 4 && output[..4] == PANIC_SELECTOR {
        if let Ok(tokens) = decode(&[ParamType::Uint(256)], &output[4..]) {
            if let Some(Token::Uint(code)) = tokens.into_iter().next() {
                return format!("panic 0x{:02x}", code.low_u64());
            }
        }
    }

    format!("0x{}", hex::encode(&output[..output.len().min(36)]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers::abi::encode;

    #[test]
    fn test_decode_error_string() {
        let mut output = ERROR_STRING_SELECTOR.to_vec();
        output.extend(encode(&[Token::String("TransferHelper: TRANSFER_FROM_FAILED".into())]));
        assert_eq!(decode_revert_reason(&output), "TransferHelper: TRANSFER_FROM_FAILED");
    }

    #[test]
    fn test_decode_panic() {
        let mut output = PANIC_SELECTOR.to_vec();
        output.extend(encode(&[Token::Uint(0x11.into())]));
        assert_eq!(decode_revert_reason(&output), "panic 0x11");
    }

    #[test]
    fn test_decode_custom_error_and_empty() {
        assert_eq!(decode_revert_reason(&[]), "execution reverted (no reason)");
        assert_eq!(decode_revert_reason(&[0xde, 0xad, 0xbe, 0xef]), "0xdeadbeef");
    }
}
