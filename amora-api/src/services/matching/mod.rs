pub mod ranking;
pub mod scorer;

pub use ranking::{rank, rank_candidates, RankedCandidate};
pub use scorer::{MatchScorer, PairCompatibility};

/// Aggregate of everything the scorer reads about one user: profile text,
/// expectation text, and the stored photo paths on both sides of the
/// comparison.
#[derive(Debug, Clone)]
pub struct CandidateUser {
    pub user_id: i32,
    pub profile_text: String,
    pub expectation_text: String,
    pub photo_paths: Vec<String>,
    pub ideal_photo_paths: Vec<String>,
}
