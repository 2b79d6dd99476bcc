use std::fmt;

/// Blockchain ecosystem a wallet belongs to. It decides which adapter
/// handles the connection and how chain identifiers are normalized.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Family {
    Evm,
    Solana,
    Tron,
}

impl Family {
    pub const ALL: [Family; 3] = [Family::Evm, Family::Solana, Family::Tron];

    /// the CAIP-2 namespace prefix of the family's chains, `eip155` for EVM
    pub fn namespace(&self) -> &'static str {
        match self {
            Family::Evm => "eip155",
            Family::Solana => "solana",
            Family::Tron => "tron",
        }
    }

    /// build the chain namespace (e.g. `eip155:1`) of the given chain
    pub fn chain_namespace(&self, chain_id: &str) -> String {
        format!("{}:{chain_id}", self.namespace())
    }

    fn matches(&self, chain: &str) -> bool {
        chain
            .strip_prefix(self.namespace())
            .is_some_and(|rest| rest.starts_with(':'))
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Family::Evm => write!(f, "evm"),
            Family::Solana => write!(f, "solana"),
            Family::Tron => write!(f, "tron"),
        }
    }
}

/// wallet id fragments of well known wallets, in lookup order
pub(crate) const KNOWN_WALLETS: &[(&str, Family)] = &[
    ("metamask", Family::Evm),
    ("coinbase", Family::Evm),
    ("rabby", Family::Evm),
    ("trust", Family::Evm),
    ("mathwallet", Family::Evm),
    ("phantom", Family::Solana),
    ("solflare", Family::Solana),
    ("sollet", Family::Solana),
    ("tron", Family::Tron),
    ("tokenpocket", Family::Tron),
];

/// Classify a wallet into a single [`Family`].
///
/// The chain namespaces take precedence: EVM wins over Solana which wins
/// over Tron when a wallet reports more than one. Without namespaces the
/// wallet id is matched against a table of well known wallets.
///
/// ```
/// use wallet_connector::{Family, classify};
///
/// assert_eq!(classify(Some(&["eip155:1".to_owned()]), None), Some(Family::Evm));
/// assert_eq!(classify(None, Some("io.metamask")), Some(Family::Evm));
/// assert_eq!(classify(Some(&[]), None), None);
/// ```
pub fn classify(chains: Option<&[String]>, wallet_id: Option<&str>) -> Option<Family> {
    match chains {
        Some(chains) if !chains.is_empty() => Family::ALL
            .into_iter()
            .find(|family| chains.iter().any(|chain| family.matches(chain))),
        _ => wallet_id.and_then(classify_wallet_id),
    }
}

fn classify_wallet_id(wallet_id: &str) -> Option<Family> {
    KNOWN_WALLETS
        .iter()
        .find(|(fragment, _)| wallet_id.contains(fragment))
        .map(|(_, family)| *family)
}

/// every family found in the chain namespaces, in [`Family::ALL`] order
pub fn families_from_chains(chains: &[String]) -> Vec<Family> {
    Family::ALL
        .into_iter()
        .filter(|family| chains.iter().any(|chain| family.matches(chain)))
        .collect()
}

/// Families a well known wallet supports, from its wallet id.
///
/// Unlike [`classify`] this knows about multi-chain wallets: Phantom
/// speaks both EVM and Solana.
pub fn families_from_wallet_id(wallet_id: &str) -> Vec<Family> {
    const EVM: &[&str] = &["metamask", "coinbase", "rabby", "trust", "mathwallet"];
    const SOLANA: &[&str] = &["solflare", "sollet"];
    const TRON: &[&str] = &["tron", "tokenpocket"];

    let contains_any = |fragments: &[&str]| fragments.iter().any(|f| wallet_id.contains(f));

    if contains_any(EVM) {
        vec![Family::Evm]
    } else if wallet_id.contains("phantom") {
        vec![Family::Evm, Family::Solana]
    } else if contains_any(SOLANA) {
        vec![Family::Solana]
    } else if contains_any(TRON) {
        vec![Family::Tron]
    } else {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chains(chains: &[&str]) -> Vec<String> {
        chains.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn classify_from_namespaces() {
        assert_eq!(classify(Some(&chains(&["eip155:1"])), None), Some(Family::Evm));
        assert_eq!(
            classify(Some(&chains(&["solana:101"])), None),
            Some(Family::Solana)
        );
        assert_eq!(
            classify(Some(&chains(&["tron:0x2b6653dc"])), None),
            Some(Family::Tron)
        );
        assert_eq!(classify(Some(&chains(&["cosmos:hub-4"])), None), None);
        assert_eq!(classify(Some(&[]), None), None);
        assert_eq!(classify(None, None), None);
    }

    #[test]
    fn classify_prefers_evm_then_solana() {
        assert_eq!(
            classify(Some(&chains(&["solana:101", "eip155:137"])), None),
            Some(Family::Evm)
        );
        assert_eq!(
            classify(Some(&chains(&["tron:0x2b6653dc", "solana:101"])), None),
            Some(Family::Solana)
        );
    }

    #[test]
    fn classify_needs_the_separator() {
        assert_eq!(classify(Some(&chains(&["eip155"])), None), None);
        assert_eq!(classify(Some(&chains(&["solanax:1"])), None), None);
    }

    #[test]
    fn classify_falls_back_on_wallet_id() {
        assert_eq!(classify(None, Some("io.metamask")), Some(Family::Evm));
        assert_eq!(classify(Some(&[]), Some("io.rabby")), Some(Family::Evm));
        assert_eq!(classify(None, Some("app.phantom")), Some(Family::Solana));
        assert_eq!(classify(None, Some("tronlink")), Some(Family::Tron));
        assert_eq!(classify(None, Some("com.example.wallet")), None);

        // namespaces win over the wallet id
        assert_eq!(
            classify(Some(&chains(&["solana:101"])), Some("io.metamask")),
            Some(Family::Solana)
        );
    }

    #[test]
    fn multi_family_categorization() {
        assert_eq!(
            families_from_chains(&chains(&["tron:0x2b6653dc", "eip155:1", "solana:101"])),
            vec![Family::Evm, Family::Solana, Family::Tron]
        );
        assert!(families_from_chains(&[]).is_empty());

        assert_eq!(
            families_from_wallet_id("app.phantom"),
            vec![Family::Evm, Family::Solana]
        );
        assert_eq!(families_from_wallet_id("com.solflare"), vec![Family::Solana]);
        assert_eq!(families_from_wallet_id("pro.tokenpocket"), vec![Family::Tron]);
        assert!(families_from_wallet_id("com.example").is_empty());
    }

    #[test]
    fn family_json() {
        assert_eq!(serde_json::to_string(&Family::Evm).unwrap(), "\"evm\"");
        assert_eq!(
            serde_json::from_str::<Family>("\"tron\"").unwrap(),
            Family::Tron
        );
    }
}
