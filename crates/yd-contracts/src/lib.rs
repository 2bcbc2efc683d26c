//! Addresses and call interfaces of the YD marketplace contracts.

pub mod abi;
pub mod addresses;
pub mod decode;

pub use addresses::{AddressBook, ContractName};

pub use alloy_sol_types::{SolCall, SolInterface};

/// Reward minted to a course creator after a successful `createCourse`.
pub const CREATOR_REWARD_TOKENS: u64 = 100;

/// Platform-token fee charged for an on-chain profile rename.
pub const RENAME_FEE_TOKENS: u64 = 5;

/// Message the wallet signs before a profile rename.
pub fn rename_message(display_name: &str) -> String {
    format!("YD Profile rename -> {display_name}")
}

#[cfg(test)]
mod tests {
    use super::abi::{ICourseManager, IStakingTreasury};
    use super::*;
    use alloy_primitives::{Address, U256};

    #[test]
    fn course_tuple_decodes_into_named_fields() {
        let creator = Address::repeat_byte(0x42);
        let encoded = ICourseManager::coursesCall::abi_encode_returns(&(
            U256::from(3u8),
            creator,
            "Rust".to_owned(),
            "Ownership in practice".to_owned(),
            U256::from(10u8),
            "expert".to_owned(),
            "ipfs://rust".to_owned(),
        ));
        let decoded = ICourseManager::coursesCall::abi_decode_returns(&encoded, true).unwrap();
        assert_eq!(decoded.id, U256::from(3u8));
        assert_eq!(decoded.creator, creator);
        assert_eq!(decoded.name, "Rust");
        assert_eq!(decoded.contentUri, "ipfs://rust");
    }

    #[test]
    fn calldata_round_trips_through_interface_enum() {
        let call = IStakingTreasury::depositYdCall {
            amount: U256::from(50u8),
        };
        let data = call.abi_encode();
        assert_eq!(&data[..4], IStakingTreasury::depositYdCall::SELECTOR.as_slice());
        let decoded = IStakingTreasury::IStakingTreasuryCalls::abi_decode(&data, true).unwrap();
        assert!(matches!(
            decoded,
            IStakingTreasury::IStakingTreasuryCalls::depositYd(inner) if inner.amount == U256::from(50u8)
        ));
    }

    #[test]
    fn rename_message_embeds_name() {
        assert_eq!(rename_message("Ada"), "YD Profile rename -> Ada");
    }
}
