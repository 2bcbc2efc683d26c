//! Demo catalog shown when no live course data can be read.

use yd_api_types::{Course, CourseCategory, CourseId, CourseSource, TokenAmount};
use yd_contracts::decode::COURSE_COVERS;

struct SampleCourse {
    id: &'static str,
    title: &'static str,
    description: &'static str,
    price: u64,
    rating: f32,
    learners: u32,
    category: CourseCategory,
    tags: [&'static str; 3],
}

const SAMPLES: [SampleCourse; 3] = [
    SampleCourse {
        id: "solidity-pro",
        title: "Full-Stack Solidity in Practice",
        description: "Course contracts, ERC-20 and on-chain data tooling end to end on the YD platform.",
        price: 520,
        rating: 4.9,
        learners: 1280,
        category: CourseCategory::Expert,
        tags: ["Solidity", "GraphQL", "DeFi"],
    },
    SampleCourse {
        id: "defi-architect",
        title: "DeFi Strategy and Risk Control",
        description: "Yield aggregation, collateralised lending and cross-chain risk models with an institutional researcher.",
        price: 360,
        rating: 4.8,
        learners: 980,
        category: CourseCategory::Advanced,
        tags: ["Lending", "Risk", "Yield"],
    },
    SampleCourse {
        id: "graph-analytics",
        title: "On-Chain Analytics Bootcamp",
        description: "Build indexers, write schemas and query course data straight from the chain.",
        price: 280,
        rating: 4.7,
        learners: 860,
        category: CourseCategory::Advanced,
        tags: ["Indexing", "Subgraph", "Visualisation"],
    },
];

pub fn sample_courses() -> Vec<Course> {
    SAMPLES
        .iter()
        .zip(COURSE_COVERS)
        .map(|(sample, cover)| Course {
            id: CourseId(sample.id.to_owned()),
            title: sample.title.to_owned(),
            description: sample.description.to_owned(),
            price: TokenAmount::from_tokens(sample.price),
            cover: cover.to_owned(),
            rating: sample.rating,
            learners: sample.learners,
            category: sample.category,
            tags: sample.tags.iter().map(|t| (*t).to_owned()).collect(),
            content_url: format!("ipfs://{}", sample.id),
            source: CourseSource::Sample,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn samples_are_marked_and_never_map_to_chain_ids() {
        let courses = sample_courses();
        assert_eq!(courses.len(), 3);
        for course in &courses {
            assert_eq!(course.source, CourseSource::Sample);
            assert!(course.id.chain_id().is_none());
        }
        assert_eq!(courses[0].price.to_string(), "520");
    }
}
