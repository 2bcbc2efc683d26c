//! Raw contract return values into domain types.

use crate::abi::{ICourseManager, IStakingTreasury};
use alloy_primitives::U256;
use yd_api_types::{Course, CourseCategory, CourseId, CourseSource, StakingPosition, TokenAmount};

/// Cover images shared by on-chain courses (picked by id) and sample data.
pub const COURSE_COVERS: [&str; 3] = [
    "https://images.unsplash.com/photo-1520607162513-77705c0f0d4a?auto=format&fit=crop&w=900&q=80",
    "https://images.unsplash.com/photo-1500530855697-b586d89ba3ee?auto=format&fit=crop&w=900&q=80",
    "https://images.unsplash.com/photo-1472289065668-ce650ac443d2?auto=format&fit=crop&w=900&q=80",
];

const ON_CHAIN_RATING: f32 = 4.8;

/// A `courses(id)` tuple as a [`Course`]; `None` for an empty slot
/// (zero creator).
pub fn course(raw: ICourseManager::coursesReturn) -> Option<Course> {
    if raw.creator.is_zero() {
        return None;
    }
    let slot = (raw.id % U256::from(COURSE_COVERS.len())).to::<usize>();
    Some(Course {
        id: CourseId::from_chain(raw.id),
        title: raw.name,
        description: raw.description,
        price: TokenAmount::from_base_units(raw.priceWei),
        cover: COURSE_COVERS[slot].to_owned(),
        rating: ON_CHAIN_RATING,
        learners: 0,
        category: CourseCategory::from_chain(&raw.category),
        tags: vec!["On-chain".to_owned(), "Live".to_owned()],
        content_url: raw.contentUri,
        source: CourseSource::OnChain,
    })
}

pub fn staking_position(raw: IStakingTreasury::positionsReturn) -> StakingPosition {
    StakingPosition {
        native: TokenAmount::from_base_units(raw.ethAmount),
        token: TokenAmount::from_base_units(raw.ydAmount),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::Address;

    fn raw(id: u64, creator: Address, category: &str) -> ICourseManager::coursesReturn {
        ICourseManager::coursesReturn {
            id: U256::from(id),
            creator,
            name: "Test Course".into(),
            description: "intro".into(),
            priceWei: TokenAmount::from_tokens(10).base_units(),
            category: category.into(),
            contentUri: "ipfs://test".into(),
        }
    }

    #[test]
    fn empty_slot_is_skipped() {
        assert!(course(raw(1, Address::ZERO, "beginner")).is_none());
    }

    #[test]
    fn live_course_gets_defaults() {
        let course = course(raw(4, Address::repeat_byte(7), "")).unwrap();
        assert_eq!(course.id.0, "4");
        assert_eq!(course.price.to_string(), "10");
        assert_eq!(course.category, CourseCategory::Advanced);
        assert_eq!(course.cover, COURSE_COVERS[1]);
        assert_eq!(course.tags, vec!["On-chain", "Live"]);
        assert_eq!(course.source, CourseSource::OnChain);
    }
}
