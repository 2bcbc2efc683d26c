mod amount;

pub use alloy_primitives::{Address, B256 as TxHash, U256};
pub use amount::{AmountError, TOKEN_DECIMALS, TokenAmount};

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChainId(pub u64);

impl ChainId {
    pub const MAINNET: ChainId = ChainId(1);
    pub const SEPOLIA: ChainId = ChainId(11_155_111);
    pub const HARDHAT: ChainId = ChainId(31_337);

    pub fn name(&self) -> String {
        match *self {
            Self::MAINNET => "Ethereum".to_owned(),
            Self::SEPOLIA => "Sepolia".to_owned(),
            Self::HARDHAT => "Hardhat".to_owned(),
            ChainId(other) => format!("Chain {other}"),
        }
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Course identifier: the decimal form of the on-chain id, or a slug for
/// sample courses that never existed on chain.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CourseId(pub String);

impl CourseId {
    pub fn from_chain(id: U256) -> Self {
        Self(id.to_string())
    }

    /// The on-chain id, if this is one.
    pub fn chain_id(&self) -> Option<U256> {
        if self.0.is_empty() || !self.0.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        U256::from_str_radix(&self.0, 10).ok()
    }
}

impl fmt::Display for CourseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CourseCategory {
    Beginner,
    Advanced,
    Expert,
}

impl CourseCategory {
    pub const ALL: [CourseCategory; 3] = [Self::Beginner, Self::Advanced, Self::Expert];

    /// Value written to the contract's `category` string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Beginner => "beginner",
            Self::Advanced => "advanced",
            Self::Expert => "expert",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Beginner => "Beginner",
            Self::Advanced => "Advanced",
            Self::Expert => "Expert",
        }
    }

    /// Accepts the English labels (any case) and the legacy labels used by
    /// earlier deployments.
    pub fn from_label(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "beginner" | "零基础" => Some(Self::Beginner),
            "advanced" | "进阶" => Some(Self::Advanced),
            "expert" | "专家" => Some(Self::Expert),
            _ => None,
        }
    }

    /// Category stored on chain; empty or unknown values read as `Advanced`.
    pub fn from_chain(raw: &str) -> Self {
        Self::from_label(raw).unwrap_or(Self::Advanced)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CourseSource {
    OnChain,
    Sample,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    pub id: CourseId,
    pub title: String,
    pub description: String,
    pub price: TokenAmount,
    pub cover: String,
    pub rating: f32,
    pub learners: u32,
    pub category: CourseCategory,
    pub tags: Vec<String>,
    pub content_url: String,
    pub source: CourseSource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StakeAsset {
    #[serde(alias = "eth")]
    Native,
    #[serde(alias = "yd")]
    Token,
}

impl StakeAsset {
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Native => "ETH",
            Self::Token => "YD",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakingPosition {
    pub native: TokenAmount,
    pub token: TokenAmount,
}

impl StakingPosition {
    pub fn amount(&self, asset: StakeAsset) -> TokenAmount {
        match asset {
            StakeAsset::Native => self.native,
            StakeAsset::Token => self.token,
        }
    }
}

// ── Service request / response bodies ──

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwitchChainRequest {
    pub chain_id: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateCourseRequest {
    pub name: String,
    pub description: String,
    pub price: String,
    #[serde(default)]
    pub category: Option<String>,
    pub content_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StakeRequest {
    pub asset: StakeAsset,
    pub amount: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenameRequest {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuyTokensRequest {
    pub amount: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractAddressInfo {
    pub contract: String,
    pub address: Option<Address>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainConfigResponse {
    pub chain_id: ChainId,
    pub chain_name: String,
    pub connected: bool,
    pub contracts: Vec<ContractAddressInfo>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn course_id_only_maps_numeric_ids_to_chain() {
        assert_eq!(CourseId("7".into()).chain_id(), Some(U256::from(7u8)));
        assert_eq!(CourseId::from_chain(U256::from(12u8)).0, "12");
        assert_eq!(CourseId("solidity-pro".into()).chain_id(), None);
        assert_eq!(CourseId(String::new()).chain_id(), None);
    }

    #[test]
    fn category_accepts_english_and_legacy_labels() {
        assert_eq!(CourseCategory::from_label("Expert"), Some(CourseCategory::Expert));
        assert_eq!(CourseCategory::from_label("零基础"), Some(CourseCategory::Beginner));
        assert_eq!(CourseCategory::from_chain(""), CourseCategory::Advanced);
        assert_eq!(CourseCategory::from_chain("unknown"), CourseCategory::Advanced);
    }

    #[test]
    fn stake_asset_accepts_symbol_aliases() {
        let asset: StakeAsset = serde_json::from_str("\"yd\"").unwrap();
        assert_eq!(asset, StakeAsset::Token);
        let asset: StakeAsset = serde_json::from_str("\"native\"").unwrap();
        assert_eq!(asset, StakeAsset::Native);
    }

    #[test]
    fn chain_names_cover_known_networks() {
        assert_eq!(ChainId::HARDHAT.name(), "Hardhat");
        assert_eq!(ChainId(10).name(), "Chain 10");
    }
}
