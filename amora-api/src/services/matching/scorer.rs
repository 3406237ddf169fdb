use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::{Deserialize, Serialize};

use amora_shared::clients::chat::{ChatClient, ChatMessage, ContentPart};
use amora_shared::clients::storage::UploadStore;

use super::CandidateUser;
use crate::config::ScoringConfig;

/// Substituted for every sub-score when the external call or its JSON
/// cannot be used. Callers get this value, never an error.
pub const NEUTRAL_SCORE: f64 = 0.5;

const MAX_IDEAL_PHOTOS: usize = 2;
const MAX_CANDIDATE_PHOTOS: usize = 3;

const FALLBACK_REASONING: &str = "Analysis unavailable due to a technical error";

const SYSTEM_PROMPT: &str = "\
You are an expert relationship compatibility analyst for all types of \
relationships and lifestyles. You analyze how well two people fit across \
personality, lifestyle, emotional needs, and long-term potential. You are \
open-minded and non-judgmental about every consensual adult relationship \
style, and you focus on communication, compatibility, and mutual respect.";

const VISUAL_PROMPT: &str = "\
Analyze the visual compatibility between the ideal-partner photos and the \
candidate's actual photos.

Consider:
- Physical appearance and aesthetic preferences
- Style, fashion, and presentation
- Energy, vibe, and overall appeal
- How well the candidate matches the ideal preferences

Rate the visual compatibility from 0.0 to 1.0:
- 0.0-0.3: Poor visual match
- 0.4-0.6: Moderate visual compatibility
- 0.7-0.8: Good visual match
- 0.9-1.0: Excellent visual compatibility

Respond with only a single number between 0.0 and 1.0.";

pub fn clamp_unit(value: f64) -> f64 {
    value.clamp(0.0, 1.0)
}

fn neutral() -> f64 {
    NEUTRAL_SCORE
}

#[derive(Debug, Deserialize)]
struct RawAnalysis {
    overall_score: f64,
    #[serde(default = "neutral")]
    personality_score: f64,
    #[serde(default = "neutral")]
    lifestyle_score: f64,
    #[serde(default = "neutral")]
    emotional_score: f64,
    #[serde(default = "neutral")]
    longterm_score: f64,
    #[serde(default)]
    reasoning: String,
}

/// One direction of a pair comparison: how well the candidate satisfies
/// what the seeker is asking for.
#[derive(Debug, Clone, Serialize)]
pub struct DirectionalAnalysis {
    pub overall_score: f64,
    pub personality_score: f64,
    pub lifestyle_score: f64,
    pub emotional_score: f64,
    pub longterm_score: f64,
    pub reasoning: String,
    #[serde(skip)]
    pub degraded: bool,
}

impl DirectionalAnalysis {
    pub fn fallback() -> Self {
        Self {
            overall_score: NEUTRAL_SCORE,
            personality_score: NEUTRAL_SCORE,
            lifestyle_score: NEUTRAL_SCORE,
            emotional_score: NEUTRAL_SCORE,
            longterm_score: NEUTRAL_SCORE,
            reasoning: FALLBACK_REASONING.to_string(),
            degraded: true,
        }
    }
}

/// Combined result for a user pair, both directions folded together.
#[derive(Debug, Clone, Serialize)]
pub struct PairCompatibility {
    /// How well the candidate satisfies the seeker's expectations.
    pub forward_score: f64,
    /// How well the seeker satisfies the candidate's expectations.
    pub reverse_score: f64,
    /// min(forward, reverse) — both sides have to be satisfied.
    pub mutual_score: f64,
    pub average_score: f64,
    pub text_score: f64,
    pub visual_score: f64,
    pub personality_score: f64,
    pub lifestyle_score: f64,
    pub emotional_score: f64,
    pub longterm_score: f64,
    #[serde(skip)]
    pub degraded: bool,
}

/// Detailed reasoning for a match detail view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchReasoning {
    pub summary: String,
    pub strengths: String,
    pub shared_interests: String,
    pub conversation_starters: String,
    pub growth_potential: String,
}

impl MatchReasoning {
    pub fn fallback(compatibility_score: f64) -> Self {
        Self {
            summary: format!(
                "This match shows {:.0}% compatibility based on profile analysis.",
                compatibility_score * 100.0
            ),
            strengths: "Both users show potential for a meaningful connection.".to_string(),
            shared_interests: "Explore common interests through conversation.".to_string(),
            conversation_starters: "Ask about their interests, goals, and experiences.".to_string(),
            growth_potential: "This connection offers opportunities for mutual growth.".to_string(),
        }
    }
}

/// Slice out the first `{` .. last `}` span; models often wrap the JSON
/// object in prose.
pub fn extract_json(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&raw[start..=end])
}

pub fn parse_analysis(raw: &str) -> Option<DirectionalAnalysis> {
    let json = extract_json(raw)?;
    let parsed: RawAnalysis = serde_json::from_str(json).ok()?;

    Some(DirectionalAnalysis {
        overall_score: clamp_unit(parsed.overall_score),
        personality_score: clamp_unit(parsed.personality_score),
        lifestyle_score: clamp_unit(parsed.lifestyle_score),
        emotional_score: clamp_unit(parsed.emotional_score),
        longterm_score: clamp_unit(parsed.longterm_score),
        reasoning: parsed.reasoning,
        degraded: false,
    })
}

/// The visual call asks for a bare number.
pub fn parse_score(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().map(clamp_unit)
}

pub fn combine_direction(text_score: f64, visual_score: f64, config: &ScoringConfig) -> f64 {
    clamp_unit(text_score * config.text_weight + visual_score * config.visual_weight)
}

/// Fold two directional analyses and two visual scores into one pair
/// result. Sub-scores are per-dimension averages of the two directions.
pub fn combine_pair(
    forward: &DirectionalAnalysis,
    reverse: &DirectionalAnalysis,
    visual_forward: f64,
    visual_reverse: f64,
    config: &ScoringConfig,
) -> PairCompatibility {
    let forward_score = combine_direction(forward.overall_score, visual_forward, config);
    let reverse_score = combine_direction(reverse.overall_score, visual_reverse, config);

    PairCompatibility {
        forward_score,
        reverse_score,
        mutual_score: forward_score.min(reverse_score),
        average_score: (forward_score + reverse_score) / 2.0,
        text_score: (forward.overall_score + reverse.overall_score) / 2.0,
        visual_score: (visual_forward + visual_reverse) / 2.0,
        personality_score: (forward.personality_score + reverse.personality_score) / 2.0,
        lifestyle_score: (forward.lifestyle_score + reverse.lifestyle_score) / 2.0,
        emotional_score: (forward.emotional_score + reverse.emotional_score) / 2.0,
        longterm_score: (forward.longterm_score + reverse.longterm_score) / 2.0,
        degraded: forward.degraded || reverse.degraded,
    }
}

fn mime_for_path(path: &str) -> &'static str {
    match path.rsplit('.').next().map(|e| e.to_ascii_lowercase()).as_deref() {
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        _ => "image/jpeg",
    }
}

fn build_analysis_prompt(seeker: &CandidateUser, candidate: &CandidateUser) -> String {
    format!(
        "Analyze how well the candidate matches what the seeker is looking for in a partner.\n\n\
         SEEKER PROFILE: {}\n\n\
         SEEKER EXPECTATIONS: {}\n\n\
         CANDIDATE PROFILE: {}\n\n\
         Analyze the compatibility from the seeker's perspective across these dimensions:\n\
         - Personality compatibility (values, traits, communication style)\n\
         - Lifestyle compatibility (interests, goals, life stage, relationship dynamics)\n\
         - Emotional compatibility (emotional needs, relationship style, intimacy preferences)\n\
         - Long-term potential (shared vision, growth compatibility)\n\n\
         Rate the match from the seeker's perspective (0.0 to 1.0):\n\
         - 0.0-0.3: Poor match, significant incompatibilities\n\
         - 0.4-0.6: Moderate match, some compatibility\n\
         - 0.7-0.8: Good match, strong compatibility\n\
         - 0.9-1.0: Excellent match, exceptional compatibility\n\n\
         Provide your analysis in this exact JSON format:\n\
         {{\n\
             \"overall_score\": 0.85,\n\
             \"personality_score\": 0.90,\n\
             \"lifestyle_score\": 0.80,\n\
             \"emotional_score\": 0.85,\n\
             \"longterm_score\": 0.85,\n\
             \"reasoning\": \"Explanation of why this is or is not a good match\"\n\
         }}",
        seeker.profile_text, seeker.expectation_text, candidate.profile_text
    )
}

fn build_reasoning_prompt(
    seeker: &CandidateUser,
    candidate: &CandidateUser,
    scores: &crate::models::Match,
) -> String {
    format!(
        "Generate a comprehensive but concise compatibility report for this match.\n\n\
         USER 1 PROFILE: {}\n\
         USER 1 LOOKING FOR: {}\n\n\
         USER 2 PROFILE: {}\n\
         USER 2 LOOKING FOR: {}\n\n\
         COMPATIBILITY SCORES:\n\
         - Overall: {:.2}\n\
         - Text: {:.2}\n\
         - Visual: {:.2}\n\
         - Personality: {:.2}\n\
         - Lifestyle: {:.2}\n\
         - Emotional: {:.2}\n\
         - Long-term: {:.2}\n\n\
         Keep the tone positive, encouraging, and insightful, and be inclusive of \
         all consensual adult relationship styles.\n\n\
         Provide your response in this exact JSON format:\n\
         {{\n\
             \"summary\": \"2-3 sentence overall compatibility summary\",\n\
             \"strengths\": \"Key compatibility strengths\",\n\
             \"shared_interests\": \"Areas of mutual interest to explore\",\n\
             \"conversation_starters\": \"3 specific conversation starter suggestions\",\n\
             \"growth_potential\": \"How this relationship could help both people grow\"\n\
         }}",
        seeker.profile_text,
        seeker.expectation_text,
        candidate.profile_text,
        candidate.expectation_text,
        scores.compatibility_score,
        scores.text_score,
        scores.visual_score,
        scores.personality_score,
        scores.lifestyle_score,
        scores.emotional_score,
        scores.longterm_score,
    )
}

/// Orchestrates the external compatibility calls for one user pair. Every
/// failure path degrades to a neutral default instead of erroring.
#[derive(Clone)]
pub struct MatchScorer {
    chat: ChatClient,
    store: UploadStore,
    config: ScoringConfig,
}

impl MatchScorer {
    pub fn new(chat: ChatClient, store: UploadStore, config: ScoringConfig) -> Self {
        Self { chat, store, config }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Score one direction: how well `candidate` satisfies `seeker`.
    pub async fn analyze_direction(
        &self,
        seeker: &CandidateUser,
        candidate: &CandidateUser,
    ) -> DirectionalAnalysis {
        match self.request_analysis(seeker, candidate).await {
            Ok(analysis) => analysis,
            Err(e) => {
                tracing::warn!(
                    seeker_id = seeker.user_id,
                    candidate_id = candidate.user_id,
                    error = %e,
                    "text analysis degraded to neutral fallback"
                );
                DirectionalAnalysis::fallback()
            }
        }
    }

    async fn request_analysis(
        &self,
        seeker: &CandidateUser,
        candidate: &CandidateUser,
    ) -> anyhow::Result<DirectionalAnalysis> {
        let messages = [
            ChatMessage::system(SYSTEM_PROMPT),
            ChatMessage::user(build_analysis_prompt(seeker, candidate)),
        ];
        let reply = self.chat.complete(&messages, 500, 0.3).await?;
        parse_analysis(&reply).ok_or_else(|| anyhow::anyhow!("no valid JSON object in completion"))
    }

    /// Score the ideal-partner photos against the candidate's photos.
    /// Either side empty short-circuits to 0.0 without a call; an
    /// unparsable reply is worth the neutral default; a failed call is 0.0.
    pub async fn visual_compatibility(
        &self,
        ideal_paths: &[String],
        photo_paths: &[String],
    ) -> f64 {
        if ideal_paths.is_empty() || photo_paths.is_empty() {
            return 0.0;
        }

        match self.request_visual_score(ideal_paths, photo_paths).await {
            Ok(Some(score)) => score,
            Ok(None) => NEUTRAL_SCORE,
            Err(e) => {
                tracing::warn!(error = %e, "visual analysis failed");
                0.0
            }
        }
    }

    async fn request_visual_score(
        &self,
        ideal_paths: &[String],
        photo_paths: &[String],
    ) -> anyhow::Result<Option<f64>> {
        let mut parts = vec![
            ContentPart::text(VISUAL_PROMPT),
            ContentPart::text("IDEAL PARTNER PHOTOS:"),
        ];
        for path in ideal_paths.iter().take(MAX_IDEAL_PHOTOS) {
            parts.push(self.encode_photo(path).await?);
        }
        parts.push(ContentPart::text("CANDIDATE PHOTOS:"));
        for path in photo_paths.iter().take(MAX_CANDIDATE_PHOTOS) {
            parts.push(self.encode_photo(path).await?);
        }

        let reply = self
            .chat
            .complete(&[ChatMessage::user_parts(parts)], 10, 0.3)
            .await?;
        Ok(parse_score(&reply))
    }

    async fn encode_photo(&self, stored_path: &str) -> anyhow::Result<ContentPart> {
        let bytes = tokio::fs::read(self.store.absolute(stored_path)).await?;
        Ok(ContentPart::image_data_url(
            mime_for_path(stored_path),
            &BASE64.encode(bytes),
        ))
    }

    /// Full bidirectional comparison of two users.
    pub async fn score_pair(&self, a: &CandidateUser, b: &CandidateUser) -> PairCompatibility {
        let forward = self.analyze_direction(a, b).await;
        let reverse = self.analyze_direction(b, a).await;
        let visual_forward = self.visual_compatibility(&a.ideal_photo_paths, &b.photo_paths).await;
        let visual_reverse = self.visual_compatibility(&b.ideal_photo_paths, &a.photo_paths).await;

        combine_pair(&forward, &reverse, visual_forward, visual_reverse, &self.config)
    }

    /// Regenerate detailed reasoning for a stored match.
    pub async fn detailed_reasoning(
        &self,
        seeker: &CandidateUser,
        candidate: &CandidateUser,
        stored: &crate::models::Match,
    ) -> MatchReasoning {
        let messages = [
            ChatMessage::system(SYSTEM_PROMPT),
            ChatMessage::user(build_reasoning_prompt(seeker, candidate, stored)),
        ];

        let parsed = match self.chat.complete(&messages, 600, 0.7).await {
            Ok(reply) => extract_json(&reply).and_then(|json| serde_json::from_str(json).ok()),
            Err(e) => {
                tracing::warn!(match_id = stored.id, error = %e, "reasoning generation failed");
                None
            }
        };

        parsed.unwrap_or_else(|| MatchReasoning::fallback(stored.compatibility_score))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_candidate(id: i32) -> CandidateUser {
        CandidateUser {
            user_id: id,
            profile_text: "calm climber and cook".into(),
            expectation_text: "someone outdoorsy".into(),
            photo_paths: vec![],
            ideal_photo_paths: vec![],
        }
    }

    fn unreachable_scorer() -> (tempfile::TempDir, MatchScorer) {
        let dir = tempfile::tempdir().unwrap();
        let chat = ChatClient::new("http://127.0.0.1:1", "test-key", "test-model", 1);
        let store = UploadStore::new(dir.path());
        (dir, MatchScorer::new(chat, store, ScoringConfig::default()))
    }

    #[test]
    fn clamp_unit_bounds() {
        assert_eq!(clamp_unit(-0.2), 0.0);
        assert_eq!(clamp_unit(0.42), 0.42);
        assert_eq!(clamp_unit(1.7), 1.0);
    }

    #[test]
    fn json_is_extracted_from_surrounding_prose() {
        let raw = "Sure! Here is the analysis:\n{\"overall_score\": 0.8}\nHope that helps.";
        assert_eq!(extract_json(raw), Some("{\"overall_score\": 0.8}"));
        assert_eq!(extract_json("no braces here"), None);
        assert_eq!(extract_json("} reversed {"), None);
    }

    #[test]
    fn analysis_scores_are_clamped() {
        let raw = r#"{"overall_score": 1.4, "personality_score": -0.3, "reasoning": "ok"}"#;
        let analysis = parse_analysis(raw).unwrap();
        assert_eq!(analysis.overall_score, 1.0);
        assert_eq!(analysis.personality_score, 0.0);
        // omitted dimensions default to neutral
        assert_eq!(analysis.lifestyle_score, NEUTRAL_SCORE);
        assert!(!analysis.degraded);
    }

    #[test]
    fn analysis_without_overall_score_fails_to_parse() {
        assert!(parse_analysis(r#"{"reasoning": "no numbers"}"#).is_none());
        assert!(parse_analysis("not json at all").is_none());
    }

    #[test]
    fn bare_number_replies_parse_and_clamp() {
        assert_eq!(parse_score("0.85"), Some(0.85));
        assert_eq!(parse_score("  0.4\n"), Some(0.4));
        assert_eq!(parse_score("1.9"), Some(1.0));
        assert_eq!(parse_score("a solid 0.8"), None);
    }

    #[test]
    fn direction_combines_weighted_text_and_visual() {
        let config = ScoringConfig::default();
        let combined = combine_direction(0.8, 0.6, &config);
        assert!((combined - (0.8 * 0.7 + 0.6 * 0.3)).abs() < 1e-9);
    }

    #[test]
    fn mutual_score_is_the_weaker_direction() {
        let config = ScoringConfig::default();
        let mut forward = DirectionalAnalysis::fallback();
        let mut reverse = DirectionalAnalysis::fallback();
        forward.overall_score = 0.9;
        forward.degraded = false;
        reverse.overall_score = 0.6;
        reverse.degraded = false;

        let pair = combine_pair(&forward, &reverse, 1.0, 1.0, &config);
        let forward_expected = 0.9 * 0.7 + 0.3;
        let reverse_expected = 0.6 * 0.7 + 0.3;
        assert!((pair.forward_score - forward_expected).abs() < 1e-9);
        assert!((pair.mutual_score - reverse_expected).abs() < 1e-9);
        assert!((pair.average_score - (forward_expected + reverse_expected) / 2.0).abs() < 1e-9);
        assert!(!pair.degraded);
    }

    #[tokio::test]
    async fn failed_call_returns_exact_neutral_defaults() {
        let (_dir, scorer) = unreachable_scorer();
        let a = test_candidate(1);
        let b = test_candidate(2);

        let analysis = scorer.analyze_direction(&a, &b).await;
        assert_eq!(analysis.overall_score, NEUTRAL_SCORE);
        assert_eq!(analysis.personality_score, NEUTRAL_SCORE);
        assert_eq!(analysis.lifestyle_score, NEUTRAL_SCORE);
        assert_eq!(analysis.emotional_score, NEUTRAL_SCORE);
        assert_eq!(analysis.longterm_score, NEUTRAL_SCORE);
        assert!(analysis.degraded);
    }

    #[tokio::test]
    async fn visual_score_is_zero_without_photos() {
        let (_dir, scorer) = unreachable_scorer();
        assert_eq!(scorer.visual_compatibility(&[], &["p.jpg".into()]).await, 0.0);
        assert_eq!(scorer.visual_compatibility(&["i.jpg".into()], &[]).await, 0.0);
    }

    #[tokio::test]
    async fn failing_pair_score_is_deterministic() {
        let (_dir, scorer) = unreachable_scorer();
        let mut a = test_candidate(1);
        let mut b = test_candidate(2);
        a.ideal_photo_paths = vec!["ideal_partners/missing.jpg".into()];
        b.photo_paths = vec!["profiles/missing.jpg".into()];

        let pair = scorer.score_pair(&a, &b).await;
        // text degrades to 0.5 in both directions, visual to 0.0
        assert!((pair.forward_score - 0.35).abs() < 1e-9);
        assert!((pair.reverse_score - 0.35).abs() < 1e-9);
        assert_eq!(pair.personality_score, NEUTRAL_SCORE);
        assert!(pair.degraded);
    }

    #[test]
    fn all_pair_fields_stay_in_unit_interval() {
        let config = ScoringConfig::default();
        let mut forward = DirectionalAnalysis::fallback();
        let mut reverse = DirectionalAnalysis::fallback();
        forward.overall_score = 1.0;
        reverse.overall_score = 1.0;

        let pair = combine_pair(&forward, &reverse, 1.0, 1.0, &config);
        for value in [
            pair.forward_score,
            pair.reverse_score,
            pair.mutual_score,
            pair.average_score,
            pair.text_score,
            pair.visual_score,
            pair.personality_score,
            pair.lifestyle_score,
            pair.emotional_score,
            pair.longterm_score,
        ] {
            assert!((0.0..=1.0).contains(&value));
        }
    }
}
