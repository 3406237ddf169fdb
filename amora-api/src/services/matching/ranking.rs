use super::scorer::{MatchScorer, PairCompatibility};
use super::CandidateUser;

#[derive(Debug, Clone)]
pub struct RankedCandidate {
    pub user_id: i32,
    pub compatibility: PairCompatibility,
}

/// Threshold, sort descending by mutual score, truncate.
pub fn rank(
    mut scored: Vec<RankedCandidate>,
    min_mutual_score: f64,
    limit: usize,
) -> Vec<RankedCandidate> {
    scored.retain(|c| c.compatibility.mutual_score >= min_mutual_score);
    scored.sort_by(|a, b| {
        b.compatibility
            .mutual_score
            .partial_cmp(&a.compatibility.mutual_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    scored.truncate(limit);
    scored
}

/// Score the seeker against every candidate, one pair at a time, and keep
/// the best.
pub async fn rank_candidates(
    scorer: &MatchScorer,
    seeker: &CandidateUser,
    candidates: &[CandidateUser],
) -> Vec<RankedCandidate> {
    let mut scored = Vec::new();

    for candidate in candidates {
        if candidate.user_id == seeker.user_id {
            continue;
        }

        let compatibility = scorer.score_pair(seeker, candidate).await;
        tracing::debug!(
            seeker_id = seeker.user_id,
            candidate_id = candidate.user_id,
            mutual = compatibility.mutual_score,
            degraded = compatibility.degraded,
            "pair scored"
        );
        scored.push(RankedCandidate {
            user_id: candidate.user_id,
            compatibility,
        });
    }

    let config = scorer.config();
    rank(scored, config.min_mutual_score, config.match_limit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::matching::scorer::{combine_pair, DirectionalAnalysis};
    use crate::config::ScoringConfig;

    fn candidate_with_score(user_id: i32, mutual: f64) -> RankedCandidate {
        let mut forward = DirectionalAnalysis::fallback();
        let mut reverse = DirectionalAnalysis::fallback();
        forward.overall_score = mutual;
        reverse.overall_score = mutual;

        let config = ScoringConfig {
            text_weight: 1.0,
            visual_weight: 0.0,
            ..ScoringConfig::default()
        };
        RankedCandidate {
            user_id,
            compatibility: combine_pair(&forward, &reverse, 0.0, 0.0, &config),
        }
    }

    #[test]
    fn below_threshold_candidates_are_dropped() {
        let ranked = rank(
            vec![candidate_with_score(1, 0.9), candidate_with_score(2, 0.5)],
            0.7,
            10,
        );
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].user_id, 1);
    }

    #[test]
    fn ranking_is_non_increasing() {
        let ranked = rank(
            vec![
                candidate_with_score(1, 0.72),
                candidate_with_score(2, 0.95),
                candidate_with_score(3, 0.81),
                candidate_with_score(4, 0.74),
            ],
            0.7,
            10,
        );
        let scores: Vec<f64> = ranked.iter().map(|c| c.compatibility.mutual_score).collect();
        assert!(scores.windows(2).all(|w| w[0] >= w[1]));
        assert_eq!(ranked[0].user_id, 2);
    }

    #[test]
    fn ties_keep_insertion_order() {
        let ranked = rank(
            vec![candidate_with_score(7, 0.8), candidate_with_score(3, 0.8)],
            0.7,
            10,
        );
        assert_eq!(ranked[0].user_id, 7);
        assert_eq!(ranked[1].user_id, 3);
    }

    #[test]
    fn result_is_truncated_to_limit() {
        let scored = (0..10).map(|i| candidate_with_score(i, 0.9)).collect();
        assert_eq!(rank(scored, 0.7, 5).len(), 5);
    }

    #[tokio::test]
    async fn seeker_is_never_their_own_match() {
        use amora_shared::clients::chat::ChatClient;
        use amora_shared::clients::storage::UploadStore;

        let dir = tempfile::tempdir().unwrap();
        let chat = ChatClient::new("http://127.0.0.1:1", "k", "m", 1);
        let scorer = MatchScorer::new(chat, UploadStore::new(dir.path()), ScoringConfig {
            // everything scores the fallback 0.35, keep it all
            min_mutual_score: 0.0,
            ..ScoringConfig::default()
        });

        let seeker = CandidateUser {
            user_id: 1,
            profile_text: "p".into(),
            expectation_text: "e".into(),
            photo_paths: vec![],
            ideal_photo_paths: vec![],
        };
        let mut me_again = seeker.clone();
        me_again.user_id = 1;
        let mut other = seeker.clone();
        other.user_id = 2;

        let ranked = rank_candidates(&scorer, &seeker, &[me_again, other]).await;
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].user_id, 2);
    }
}
