//! Contract address resolution.
//!
//! Lookup order for a contract on a chain: the built-in table for that
//! chain, then an environment override, then the built-in table for the
//! default local chain. Anything else is "not configured" and comes back
//! as `None`; callers disable the feature instead of failing.

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tracing::warn;
use yd_api_types::ChainId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContractName {
    PlatformToken,
    BalanceRegistry,
    CourseManager,
    StakingTreasury,
    ProfileRegistry,
}

impl ContractName {
    pub const ALL: [ContractName; 5] = [
        Self::PlatformToken,
        Self::BalanceRegistry,
        Self::CourseManager,
        Self::StakingTreasury,
        Self::ProfileRegistry,
    ];

    /// Environment variable that overrides this contract's address.
    pub fn env_var(&self) -> &'static str {
        match self {
            Self::PlatformToken => "YD_TOKEN_ADDRESS",
            Self::BalanceRegistry => "BALANCE_REGISTRY_ADDRESS",
            Self::CourseManager => "COURSE_MANAGER_ADDRESS",
            Self::StakingTreasury => "STAKING_CONTRACT_ADDRESS",
            Self::ProfileRegistry => "PROFILE_REGISTRY_ADDRESS",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PlatformToken => "YDPlatformToken",
            Self::BalanceRegistry => "YDBalanceRegistry",
            Self::CourseManager => "CourseManager",
            Self::StakingTreasury => "StakingTreasury",
            Self::ProfileRegistry => "ProfileRegistry",
        }
    }
}

impl fmt::Display for ContractName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const HARDHAT_DEPLOYMENT: [(ContractName, &str); 5] = [
    (ContractName::PlatformToken, "0x9E545E3C0baAB3E08CdfD552C960A1050f373042"),
    (ContractName::BalanceRegistry, "0x84eA74d481Ee0A5332c457a4d796187F6Ba67fEB"),
    (ContractName::CourseManager, "0xa82fF9aFd8f496c3d6ac40E2a0F282E47488CFc9"),
    (ContractName::StakingTreasury, "0x1613beB3B2C4f22Ee086B2b38C1476A3cE7f78E8"),
    (ContractName::ProfileRegistry, "0x851356ae760d987E095750cCeb3bC6014560891C"),
];

const SEPOLIA_DEPLOYMENT: [(ContractName, &str); 5] = [
    (ContractName::PlatformToken, "0x3636C4790f5B1e7A44045AE33b8BbD4E06bcb1c8"),
    (ContractName::BalanceRegistry, "0xA06eaF76EC588F785f67f7a3c71e8B54375869A3"),
    (ContractName::CourseManager, "0x585508DdFa58aE8416F41C88C4FcCB0845317513"),
    (ContractName::StakingTreasury, "0x06CaB4902c63a16A693ebba2c7677804D0937229"),
    (ContractName::ProfileRegistry, "0x79d57B160c1b8bDe68554cB2017af9BD0FB6A31f"),
];

#[derive(Debug, Clone)]
pub struct AddressBook {
    deployments: HashMap<ChainId, HashMap<ContractName, Address>>,
    overrides: HashMap<ContractName, Address>,
    default_chain: ChainId,
}

impl Default for AddressBook {
    fn default() -> Self {
        Self::builtin()
    }
}

impl AddressBook {
    /// No deployments, no overrides.
    pub fn empty(default_chain: ChainId) -> Self {
        Self {
            deployments: HashMap::new(),
            overrides: HashMap::new(),
            default_chain,
        }
    }

    /// Known Hardhat and Sepolia deployments, default chain 31337.
    pub fn builtin() -> Self {
        let mut book = Self::empty(ChainId::HARDHAT);
        for (chain, table) in [
            (ChainId::HARDHAT, HARDHAT_DEPLOYMENT),
            (ChainId::SEPOLIA, SEPOLIA_DEPLOYMENT),
        ] {
            for (name, raw) in table {
                if let Ok(address) = raw.parse::<Address>() {
                    book.insert(chain, name, address);
                }
            }
        }
        book
    }

    pub fn with_default_chain(mut self, chain: ChainId) -> Self {
        self.default_chain = chain;
        self
    }

    /// Apply overrides from the process environment.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any key/value source.
    pub fn with_overrides_from<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        for name in ContractName::ALL {
            let Some(raw) = lookup(name.env_var()) else {
                continue;
            };
            let raw = raw.trim();
            if raw.is_empty() {
                continue;
            }
            match raw.parse::<Address>() {
                Ok(address) => self.set_override(name, address),
                Err(err) => warn!(
                    "ignoring {}='{}': not an address ({})",
                    name.env_var(),
                    raw,
                    err
                ),
            }
        }
        self
    }

    pub fn insert(&mut self, chain: ChainId, name: ContractName, address: Address) {
        if address.is_zero() {
            return;
        }
        self.deployments.entry(chain).or_default().insert(name, address);
    }

    pub fn set_override(&mut self, name: ContractName, address: Address) {
        if address.is_zero() {
            self.overrides.remove(&name);
            return;
        }
        self.overrides.insert(name, address);
    }

    pub fn default_chain(&self) -> ChainId {
        self.default_chain
    }

    pub fn resolve(&self, name: ContractName, chain: Option<ChainId>) -> Option<Address> {
        let chain = chain.unwrap_or(self.default_chain);
        self.lookup(chain, name)
            .or_else(|| self.overrides.get(&name).copied())
            .or_else(|| self.lookup(self.default_chain, name))
    }

    fn lookup(&self, chain: ChainId, name: ContractName) -> Option<Address> {
        self.deployments.get(&chain)?.get(&name).copied()
    }
}
