//! The wallets available in the page, for a wallet picker.

use crate::{
    Family, family,
    provider::{GlobalProviders, GlobalSlot, ProviderInfo, ProviderRegistry},
};
use std::rc::Rc;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectedWallet {
    pub wallet_id: String,
    pub name: String,
    pub icon: Option<String>,
    /// every family the wallet speaks for, in [`Family::ALL`] order
    pub families: Vec<Family>,
}

impl DetectedWallet {
    pub fn is_multi_chain(&self) -> bool {
        self.families.len() > 1
    }

    fn supports(&self, family: Family) -> bool {
        self.families.contains(&family)
    }
}

/// wallets found through a global object rather than the registry
const GLOBAL_WALLETS: &[(GlobalSlot, &str, &str, &[Family])] = &[
    (
        GlobalSlot::Solana,
        "phantom",
        "Phantom",
        &[Family::Evm, Family::Solana],
    ),
    (GlobalSlot::Tron, "tronlink", "TronLink", &[Family::Tron]),
];

pub struct WalletDiscovery {
    registry: Rc<dyn ProviderRegistry>,
    globals: Rc<dyn GlobalProviders>,
    priority: Vec<String>,
}

impl WalletDiscovery {
    /// `priority` lists the wallet names to show first, in this order
    pub fn new(
        registry: Rc<dyn ProviderRegistry>,
        globals: Rc<dyn GlobalProviders>,
        priority: Vec<String>,
    ) -> Self {
        Self {
            registry,
            globals,
            priority,
        }
    }

    /// Every supported wallet in the page.
    ///
    /// Multi-chain wallets come first, then EVM, Solana and Tron ones; the
    /// priority wallets are then moved to the front. A wallet found both in
    /// the registry and as a global object is listed once.
    pub fn detected_wallets(&self) -> Vec<DetectedWallet> {
        let mut wallets: Vec<DetectedWallet> = self
            .registry
            .providers()
            .iter()
            .filter_map(|descriptor| {
                let info = descriptor.info();
                let families = categorize(&info);
                if families.is_empty() {
                    debug!(wallet_id = %info.wallet_id, name = %info.name, "Skipping unsupported wallet");
                    return None;
                }
                Some(DetectedWallet {
                    wallet_id: info.wallet_id,
                    name: info.name,
                    icon: info.icon,
                    families,
                })
            })
            .collect();

        for (slot, wallet_id, name, families) in GLOBAL_WALLETS {
            if self.globals.global(*slot).is_none() || wallets.iter().any(|w| w.name == *name) {
                continue;
            }
            debug!(wallet_id, slot = slot.name(), "Wallet detected through its global object");
            wallets.push(DetectedWallet {
                wallet_id: wallet_id.to_string(),
                name: name.to_string(),
                icon: None,
                families: families.to_vec(),
            });
        }

        // stable sorts, registration order is kept inside each group
        wallets.sort_by_key(|wallet| {
            if wallet.is_multi_chain() {
                0
            } else {
                match wallet.families[0] {
                    Family::Evm => 1,
                    Family::Solana => 2,
                    Family::Tron => 3,
                }
            }
        });
        wallets.sort_by_key(|wallet| {
            self.priority
                .iter()
                .position(|name| *name == wallet.name)
                .unwrap_or(usize::MAX)
        });

        wallets
    }
}

/// The chain namespaces decide, the wallet id is only looked at when
/// none of them is supported.
fn categorize(info: &ProviderInfo) -> Vec<Family> {
    let families = family::families_from_chains(&info.chains);
    if !families.is_empty() {
        return families;
    }
    family::families_from_wallet_id(&info.wallet_id)
}

/// What a wallet picker shows: a few wallets up front, the others behind a
/// "view all" and grouped by family.
#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletGroups {
    pub top_wallets: Vec<DetectedWallet>,
    pub grouped_wallets: GroupedWallets,
    pub total_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupedWallets {
    /// wallets speaking both EVM and Solana
    pub multi_chain: Vec<DetectedWallet>,
    pub evm: Vec<DetectedWallet>,
    pub solana: Vec<DetectedWallet>,
    pub tron: Vec<DetectedWallet>,
}

impl WalletGroups {
    pub fn split(mut wallets: Vec<DetectedWallet>, top_count: usize) -> Self {
        let total_count = wallets.len();
        let remaining = wallets.split_off(top_count.min(total_count));

        let mut grouped_wallets = GroupedWallets::default();
        for wallet in remaining {
            let group = if wallet.supports(Family::Evm) && wallet.supports(Family::Solana) {
                &mut grouped_wallets.multi_chain
            } else if wallet.supports(Family::Evm) {
                &mut grouped_wallets.evm
            } else if wallet.supports(Family::Solana) {
                &mut grouped_wallets.solana
            } else {
                &mut grouped_wallets.tron
            };
            group.push(wallet);
        }

        Self {
            top_wallets: wallets,
            grouped_wallets,
            total_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        provider::{MemoryGlobals, MemoryRegistry, ProviderDescriptor, ProviderHandle},
        testing::{MockSolana, MockTron},
    };

    fn announce(registry: &MemoryRegistry, wallet_id: &str, name: &str, chains: &[&str]) {
        registry.announce(ProviderDescriptor::new(
            ProviderInfo {
                name: name.to_owned(),
                wallet_id: wallet_id.to_owned(),
                icon: Some(format!("data:image/svg+xml;base64,{wallet_id}")),
                chains: chains.iter().map(|c| c.to_string()).collect(),
            },
            ProviderHandle::default(),
        ));
    }

    fn discovery() -> (Rc<MemoryRegistry>, Rc<MemoryGlobals>, WalletDiscovery) {
        let registry = Rc::new(MemoryRegistry::new());
        let globals = Rc::new(MemoryGlobals::new());
        let discovery = WalletDiscovery::new(
            registry.clone(),
            globals.clone(),
            crate::Config::default().priority_wallets,
        );
        (registry, globals, discovery)
    }

    fn names(wallets: &[DetectedWallet]) -> Vec<&str> {
        wallets.iter().map(|w| w.name.as_str()).collect()
    }

    #[test]
    fn categories_and_priority() {
        let (registry, _, discovery) = discovery();
        announce(&registry, "com.solflare", "Solflare", &[]);
        announce(&registry, "com.example", "Example", &[]);
        announce(&registry, "io.rabby", "Rabby Wallet", &["eip155:1"]);
        announce(&registry, "com.tokenpocket", "TokenPocket", &[]);
        announce(&registry, "com.coinbase.wallet", "Coinbase Wallet", &["eip155:1"]);
        announce(&registry, "app.phantom", "Phantom", &[]);
        announce(&registry, "io.metamask", "MetaMask", &["eip155:1"]);

        let wallets = discovery.detected_wallets();
        assert_eq!(
            names(&wallets),
            vec![
                "Phantom",
                "MetaMask",
                "Coinbase Wallet",
                "Rabby Wallet",
                "Solflare",
                "TokenPocket"
            ]
        );
        assert_eq!(wallets[0].families, vec![Family::Evm, Family::Solana]);
        assert_eq!(wallets[5].families, vec![Family::Tron]);
    }

    #[test]
    fn chains_take_precedence_over_wallet_id() {
        let (registry, _, discovery) = discovery();
        announce(&registry, "io.metamask", "MetaMask", &["solana:101", "eip155:1"]);

        let wallets = discovery.detected_wallets();
        assert_eq!(wallets[0].families, vec![Family::Evm, Family::Solana]);
        assert!(wallets[0].is_multi_chain());
    }

    #[test]
    fn globals_without_duplicates() {
        let (registry, globals, discovery) = discovery();
        globals.set(
            GlobalSlot::Solana,
            ProviderHandle::default().with_solana(MockSolana::new()),
        );
        globals.set(
            GlobalSlot::Tron,
            ProviderHandle::default().with_tron(MockTron::new()),
        );
        announce(&registry, "app.phantom", "Phantom", &["eip155:1", "solana:101"]);

        let wallets = discovery.detected_wallets();
        assert_eq!(names(&wallets), vec!["Phantom", "TronLink"]);
        assert_eq!(wallets[0].wallet_id, "app.phantom");
        assert_eq!(wallets[1].wallet_id, "tronlink");
        assert_eq!(wallets[1].icon, None);
    }

    #[test]
    fn split() {
        let wallet = |name: &str, families: &[Family]| DetectedWallet {
            wallet_id: name.to_lowercase(),
            name: name.to_owned(),
            icon: None,
            families: families.to_vec(),
        };
        let wallets = vec![
            wallet("Phantom", &[Family::Evm, Family::Solana]),
            wallet("MetaMask", &[Family::Evm]),
            wallet("Rabby", &[Family::Evm]),
            wallet("Solflare", &[Family::Solana]),
            wallet("Backpack", &[Family::Evm, Family::Solana]),
            wallet("Trust", &[Family::Evm]),
            wallet("Glow", &[Family::Solana]),
            wallet("TronLink", &[Family::Tron]),
        ];

        let groups = WalletGroups::split(wallets, 4);
        assert_eq!(groups.total_count, 8);
        assert_eq!(
            names(&groups.top_wallets),
            vec!["Phantom", "MetaMask", "Rabby", "Solflare"]
        );
        assert_eq!(names(&groups.grouped_wallets.multi_chain), vec!["Backpack"]);
        assert_eq!(names(&groups.grouped_wallets.evm), vec!["Trust"]);
        assert_eq!(names(&groups.grouped_wallets.solana), vec!["Glow"]);
        assert_eq!(names(&groups.grouped_wallets.tron), vec!["TronLink"]);

        let groups = WalletGroups::split(Vec::new(), 4);
        assert_eq!(groups, WalletGroups::default());
    }
}
