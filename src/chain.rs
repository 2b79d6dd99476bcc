//! Normalization of chain identifiers.
//!
//! Every family reports its network differently: EVM providers return a
//! hexadecimal chain id, Solana wallets only expose their RPC endpoint and
//! TronLink may answer a node info request or give nothing but the host
//! names of its nodes. The connection always carries the canonical string
//! form computed here.

use crate::Family;
use serde_json::Value;

pub const SOLANA_MAINNET: &str = "5eykt4UsFv8P8NJdTREpY1vzqKqZKvdp";
pub const SOLANA_DEVNET: &str = "EtWTRABZaYq6iMfeYKouRu166VU2xqa1";
pub const SOLANA_TESTNET: &str = "4uhcVJyU9pJkvQyS88uRDiswHXSCkY3z";

pub const TRON_MAINNET: &str = "728126428";
pub const TRON_SHASTA: &str = "2494104990";
pub const TRON_NILE: &str = "3448148188";

/// Decimal string form of an EVM chain id.
///
/// Accepts the hexadecimal form returned by `eth_chainId` and
/// `chainChanged` (`"0x89"`), an already decimal string or a JSON number.
pub fn evm_chain_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
                u64::from_str_radix(hex, 16).ok().map(|id| id.to_string())
            } else {
                s.parse::<u64>().ok().map(|id| id.to_string())
            }
        }
        Value::Number(n) => n.as_u64().map(|id| id.to_string()),
        _ => None,
    }
}

/// Solana cluster from the RPC endpoint the wallet is configured with,
/// mainnet when it cannot be told.
pub fn solana_cluster(endpoint: Option<&str>) -> &'static str {
    let Some(endpoint) = endpoint else {
        return SOLANA_MAINNET;
    };
    let endpoint = endpoint.to_lowercase();

    if endpoint.contains("mainnet") {
        SOLANA_MAINNET
    } else if endpoint.contains("devnet") {
        SOLANA_DEVNET
    } else if endpoint.contains("testnet") {
        SOLANA_TESTNET
    } else {
        SOLANA_MAINNET
    }
}

/// chain id from the answer to `/wallet/getnodeinfo`
pub fn tron_chain_from_node_info(node_info: &Value) -> Option<String> {
    match node_info.pointer("/config/chainId")? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// chain id guessed from the host names of the TronWeb nodes, `None` if
/// none is recognized
pub fn tron_chain_from_hosts<S: AsRef<str>>(hosts: &[S]) -> Option<&'static str> {
    hosts.iter().find_map(|host| {
        let host = host.as_ref().to_lowercase();
        if host.contains("api.trongrid.io") || host.contains("tronstackapi.com") {
            Some(TRON_MAINNET)
        } else if host.contains("api.shasta.trongrid.io") {
            Some(TRON_SHASTA)
        } else if host.contains("nile.trongrid.io") {
            Some(TRON_NILE)
        } else {
            None
        }
    })
}

/// Human readable name of a chain, for display.
pub fn chain_name(chain_id: &str, family: Family) -> Option<&'static str> {
    let decimal;
    let chain_id = match family {
        Family::Evm if chain_id.starts_with("0x") => {
            decimal = evm_chain_id(&Value::String(chain_id.to_owned()))?;
            decimal.as_str()
        }
        _ => chain_id,
    };

    let name = match (family, chain_id) {
        (Family::Evm, "1") => "Ethereum Mainnet",
        (Family::Evm, "17000") => "Ethereum Holesky Testnet",
        (Family::Evm, "11155111") => "Ethereum Sepolia Testnet",
        (Family::Evm, "560048") => "Ethereum Hoodi Testnet",
        (Family::Evm, "10") => "Optimism Mainnet",
        (Family::Evm, "11155420") => "Optimism Sepolia Testnet",
        (Family::Evm, "25") => "Cronos Mainnet",
        (Family::Evm, "338") => "Cronos Testnet",
        (Family::Evm, "56") => "BSC Mainnet",
        (Family::Evm, "97") => "BSC Testnet",
        (Family::Evm, "137") => "Polygon Mainnet",
        (Family::Evm, "80002") => "Polygon Amoy Testnet",
        (Family::Evm, "250") => "Fantom Opera",
        (Family::Evm, "4002") => "Fantom Testnet",
        (Family::Evm, "324") => "zkSync Era Mainnet",
        (Family::Evm, "300") => "zkSync Era Testnet",
        (Family::Evm, "5000") => "Mantle Mainnet",
        (Family::Evm, "5003") => "Mantle Testnet",
        (Family::Evm, "8217") => "Kaia Mainnet",
        (Family::Evm, "1001") => "Kaia Testnet",
        (Family::Evm, "8453") => "Base Mainnet",
        (Family::Evm, "84532") => "Base Sepolia Testnet",
        (Family::Evm, "42161") => "Arbitrum One",
        (Family::Evm, "421614") => "Arbitrum Sepolia Testnet",
        (Family::Evm, "43114") => "Avalanche C-Chain",
        (Family::Evm, "43113") => "Avalanche Fuji Testnet",
        (Family::Evm, "31337") => "Localhost",
        (Family::Solana, SOLANA_MAINNET) => "Solana Mainnet",
        (Family::Solana, SOLANA_DEVNET) => "Solana Devnet",
        (Family::Solana, SOLANA_TESTNET) => "Solana Testnet",
        (Family::Tron, TRON_MAINNET) => "Tron Mainnet",
        (Family::Tron, TRON_SHASTA) => "Tron Shasta Testnet",
        (Family::Tron, TRON_NILE) => "Tron Nile Testnet",
        _ => return None,
    };
    Some(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn evm_hex_to_decimal() {
        assert_eq!(evm_chain_id(&json!("0x1")).as_deref(), Some("1"));
        assert_eq!(evm_chain_id(&json!("0x89")).as_deref(), Some("137"));
        assert_eq!(evm_chain_id(&json!("0xaa36a7")).as_deref(), Some("11155111"));
        assert_eq!(evm_chain_id(&json!("137")).as_deref(), Some("137"));
        assert_eq!(evm_chain_id(&json!(56)).as_deref(), Some("56"));
        assert_eq!(evm_chain_id(&json!("0xzz")), None);
        assert_eq!(evm_chain_id(&json!(null)), None);
    }

    #[test]
    fn solana_cluster_from_endpoint() {
        assert_eq!(
            solana_cluster(Some("https://api.mainnet-beta.solana.com")),
            SOLANA_MAINNET
        );
        assert_eq!(
            solana_cluster(Some("https://api.Devnet.solana.com")),
            SOLANA_DEVNET
        );
        assert_eq!(
            solana_cluster(Some("https://api.testnet.solana.com")),
            SOLANA_TESTNET
        );
        assert_eq!(solana_cluster(Some("http://localhost:8899")), SOLANA_MAINNET);
        assert_eq!(solana_cluster(None), SOLANA_MAINNET);
    }

    #[test]
    fn tron_chain_detection() {
        assert_eq!(
            tron_chain_from_node_info(&json!({ "config": { "chainId": 2494104990u64 } })).as_deref(),
            Some("2494104990")
        );
        assert_eq!(
            tron_chain_from_node_info(&json!({ "config": { "chainId": "728126428" } })).as_deref(),
            Some("728126428")
        );
        assert_eq!(tron_chain_from_node_info(&json!({ "config": {} })), None);

        assert_eq!(
            tron_chain_from_hosts(&["https://api.trongrid.io"]),
            Some(TRON_MAINNET)
        );
        assert_eq!(
            tron_chain_from_hosts(&["https://api.shasta.trongrid.io"]),
            Some(TRON_SHASTA)
        );
        assert_eq!(
            tron_chain_from_hosts(&["https://example.org", "https://nile.trongrid.io"]),
            Some(TRON_NILE)
        );
        assert_eq!(tron_chain_from_hosts::<&str>(&[]), None);
    }

    #[test]
    fn chain_names() {
        assert_eq!(chain_name("1", Family::Evm), Some("Ethereum Mainnet"));
        assert_eq!(chain_name("0x89", Family::Evm), Some("Polygon Mainnet"));
        assert_eq!(chain_name(TRON_NILE, Family::Tron), Some("Tron Nile Testnet"));
        assert_eq!(chain_name(SOLANA_DEVNET, Family::Solana), Some("Solana Devnet"));
        assert_eq!(chain_name("1", Family::Tron), None);
        assert_eq!(chain_name("999999", Family::Evm), None);
    }
}
