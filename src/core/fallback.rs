//! Scripted fallback replies: per-persona pools, greetings and keyword
//! overrides.

use rand::seq::SliceRandom;
use rand::Rng;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::core::stage::{StageBucket, StageTable};
use crate::schema::message::{AiResponse, MoodTag};
use crate::schema::persona::PersonaId;

#[derive(Debug, Error)]
pub enum FallbackError {
    #[error("no fallback pools for persona: {0}")]
    UnknownPersona(PersonaId),
    #[error("fallback pool for persona {0} is empty")]
    EmptyPool(PersonaId),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
}

/// A pre-written reply and the mood it was written in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptedLine {
    pub text: String,
    pub mood: MoodTag,
}

impl ScriptedLine {
    fn to_response(&self) -> AiResponse {
        AiResponse::new(self.text.clone(), self.mood)
    }
}

/// The two pools a persona draws from.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PersonaPools {
    /// Small-talk replies for the early bucket.
    pub base: Vec<ScriptedLine>,
    /// More vulnerable replies once the mood shifts.
    #[serde(default)]
    pub mood_shift: Vec<ScriptedLine>,
}

impl PersonaPools {
    fn for_bucket(&self, bucket: StageBucket) -> &[ScriptedLine] {
        match bucket {
            StageBucket::Early => self.base.as_slice(),
            StageBucket::Mid | StageBucket::Late if self.mood_shift.is_empty() => {
                self.base.as_slice()
            }
            StageBucket::Mid | StageBucket::Late => self.mood_shift.as_slice(),
        }
    }
}

/// Replaces the random pick when the user's words hit a trigger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordOverride {
    pub name: String,
    /// Lowercase tokens that activate the rule. The user text is lowercased
    /// and split on single spaces, so "hi!" is not the token "hi".
    pub triggers: Vec<String>,
    /// The first pool line containing one of these as a case-sensitive
    /// substring replaces the pick.
    pub prefers: Vec<String>,
}

impl KeywordOverride {
    fn is_triggered_by(&self, user_tokens: &[&str]) -> bool {
        user_tokens
            .iter()
            .any(|token| self.triggers.iter().any(|t| t == token))
    }

    fn find_preferred<'a>(&self, pool: &'a [ScriptedLine]) -> Option<&'a ScriptedLine> {
        pool.iter()
            .find(|line| self.prefers.iter().any(|p| line.text.contains(p.as_str())))
    }
}

/// Shape of a fallback RON file.
#[derive(Debug, Deserialize)]
struct RonFallbacks {
    default_greeting: String,
    #[serde(default)]
    greetings: FxHashMap<String, String>,
    pools: FxHashMap<String, PersonaPools>,
    #[serde(default)]
    overrides: Vec<KeywordOverride>,
}

/// Static, per-persona table of scripted replies.
///
/// Lookups are pure apart from the caller-supplied RNG used for the
/// default pick.
#[derive(Debug, Clone)]
pub struct FallbackLibrary {
    pools: FxHashMap<PersonaId, PersonaPools>,
    greetings: FxHashMap<PersonaId, String>,
    default_greeting: String,
    overrides: Vec<KeywordOverride>,
    stages: StageTable,
}

const BUILTIN_FALLBACKS: &str = include_str!("../../scenario_data/blind_date/fallbacks.ron");

impl FallbackLibrary {
    /// Fallback content for the built-in cast.
    pub fn builtin() -> Result<Self, FallbackError> {
        Self::parse_ron(BUILTIN_FALLBACKS)
    }

    pub fn load_from_ron(path: &Path) -> Result<Self, FallbackError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }

    pub fn parse_ron(input: &str) -> Result<Self, FallbackError> {
        let raw: RonFallbacks = ron::from_str(input)?;
        Ok(Self {
            pools: raw
                .pools
                .into_iter()
                .map(|(id, pools)| (PersonaId(id), pools))
                .collect(),
            greetings: raw
                .greetings
                .into_iter()
                .map(|(id, text)| (PersonaId(id), text))
                .collect(),
            default_greeting: raw.default_greeting,
            overrides: raw.overrides,
            stages: StageTable::default(),
        })
    }

    /// Use a different threshold table for bucket selection.
    pub fn with_stages(mut self, stages: StageTable) -> Self {
        self.stages = stages;
        self
    }

    pub fn stages(&self) -> &StageTable {
        &self.stages
    }

    /// Pick a scripted reply for the persona at the given stage.
    ///
    /// The default pick is uniformly random. Keyword overrides are then
    /// checked in order and each match replaces the pick, so the last
    /// matching rule wins.
    pub fn lookup<R: Rng + ?Sized>(
        &self,
        persona_id: &PersonaId,
        stage: u32,
        user_text: &str,
        rng: &mut R,
    ) -> Result<AiResponse, FallbackError> {
        let pools = self
            .pools
            .get(persona_id)
            .ok_or_else(|| FallbackError::UnknownPersona(persona_id.clone()))?;
        let pool = pools.for_bucket(self.stages.bucket(stage));

        let mut selected = pool
            .choose(rng)
            .ok_or_else(|| FallbackError::EmptyPool(persona_id.clone()))?;

        let lowered = user_text.to_lowercase();
        let user_tokens: Vec<&str> = lowered.split(' ').collect();
        for rule in &self.overrides {
            if !rule.is_triggered_by(&user_tokens) {
                continue;
            }
            if let Some(preferred) = rule.find_preferred(pool) {
                selected = preferred;
            }
        }

        Ok(selected.to_response())
    }

    /// Opening line for a persona, or the default greeting for unknown ids.
    pub fn greeting(&self, persona_id: &PersonaId) -> &str {
        self.greetings
            .get(persona_id)
            .map(String::as_str)
            .unwrap_or(&self.default_greeting)
    }

    pub fn has_greeting(&self, persona_id: &PersonaId) -> bool {
        self.greetings.contains_key(persona_id)
    }

    pub fn has_persona(&self, persona_id: &PersonaId) -> bool {
        self.pools
            .get(persona_id)
            .is_some_and(|pools| !pools.base.is_empty())
    }

    pub fn pools(&self, persona_id: &PersonaId) -> Option<&PersonaPools> {
        self.pools.get(persona_id)
    }

    pub fn persona_ids(&self) -> impl Iterator<Item = &PersonaId> {
        self.pools.keys()
    }

    pub fn greeting_ids(&self) -> impl Iterator<Item = &PersonaId> {
        self.greetings.keys()
    }

    pub fn overrides(&self) -> &[KeywordOverride] {
        &self.overrides
    }

    /// Lines of `pool` that a rule would select, for content checks.
    pub fn preferred_line<'a>(
        rule: &KeywordOverride,
        pool: &'a [ScriptedLine],
    ) -> Option<&'a ScriptedLine> {
        rule.find_preferred(pool)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn library() -> FallbackLibrary {
        FallbackLibrary::builtin().unwrap()
    }

    fn id(s: &str) -> PersonaId {
        PersonaId::from(s)
    }

    #[test]
    fn triggers_match_space_separated_tokens() {
        let lib = library();
        let rule = &lib.overrides()[0];
        assert!(rule.is_triggered_by(&["well", "hello", "there"]));
        assert!(!rule.is_triggered_by(&["hello,", "there"]));
        assert!(!rule.is_triggered_by(&["this", "is", "nice"]));
    }

    #[test]
    fn preferred_lines_match_case_sensitive_substrings() {
        let lib = library();
        let rule = &lib.overrides()[0];
        let pool = vec![
            ScriptedLine {
                text: "Hello there.".to_string(),
                mood: MoodTag::Flirty,
            },
            ScriptedLine {
                text: "Something tells me we'll get along.".to_string(),
                mood: MoodTag::Flirty,
            },
        ];
        let line = rule.find_preferred(&pool).unwrap();
        assert!(line.text.starts_with("Something"));
    }

    #[test]
    fn hello_there_pins_romantic_star_pick() {
        let lib = library();
        for seed in 0..16 {
            let reply = lib
                .lookup(&id("romantic-star"), 0, "hello there", &mut StdRng::seed_from_u64(seed))
                .unwrap();
            assert!(
                reply.content.starts_with("You know what? There's something"),
                "got {}",
                reply.content
            );
        }
    }

    #[test]
    fn builtin_covers_every_persona() {
        let lib = library();
        for persona in ["romantic-star", "nerdy-crush", "sassy-diva", "mysterious-ai"] {
            let pools = lib.pools(&id(persona)).unwrap();
            assert_eq!(pools.base.len(), 8, "{} base pool", persona);
            assert_eq!(pools.mood_shift.len(), 2, "{} mood-shift pool", persona);
            assert!(lib.has_greeting(&id(persona)));
        }
    }

    #[test]
    fn lookup_is_deterministic_for_a_seed() {
        let lib = library();
        let a = lib
            .lookup(&id("sassy-diva"), 0, "what do you do", &mut StdRng::seed_from_u64(7))
            .unwrap();
        let b = lib
            .lookup(&id("sassy-diva"), 0, "what do you do", &mut StdRng::seed_from_u64(7))
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn early_stage_draws_from_base_pool() {
        let lib = library();
        let pools = lib.pools(&id("nerdy-crush")).unwrap().clone();
        for seed in 0..30 {
            let reply = lib
                .lookup(&id("nerdy-crush"), 2, "tell me more", &mut StdRng::seed_from_u64(seed))
                .unwrap();
            assert!(pools.base.iter().any(|l| l.text == reply.content));
        }
    }

    #[test]
    fn mood_shift_pool_from_mid_stage() {
        let lib = library();
        let pools = lib.pools(&id("mysterious-ai")).unwrap().clone();
        for stage in [3, 5, 6, 12] {
            for seed in 0..10 {
                let reply = lib
                    .lookup(&id("mysterious-ai"), stage, "go on", &mut StdRng::seed_from_u64(seed))
                    .unwrap();
                assert!(
                    pools.mood_shift.iter().any(|l| l.text == reply.content),
                    "stage {} gave a non mood-shift line: {}",
                    stage,
                    reply.content
                );
            }
        }
    }

    #[test]
    fn love_override_picks_affectionate_line() {
        let lib = library();
        for persona in ["romantic-star", "nerdy-crush"] {
            for seed in 0..20 {
                let reply = lib
                    .lookup(&id(persona), 0, "I love this place", &mut StdRng::seed_from_u64(seed))
                    .unwrap();
                assert!(
                    reply.content.contains("love") || reply.content.contains("heart"),
                    "{}: expected love/heart line, got {}",
                    persona,
                    reply.content
                );
            }
        }
    }

    #[test]
    fn greeting_override_picks_greeting_line() {
        let lib = library();
        let reply = lib
            .lookup(&id("mysterious-ai"), 0, "hi there", &mut StdRng::seed_from_u64(3))
            .unwrap();
        assert!(reply.content.starts_with("Hello."));
        assert_eq!(reply.mood, MoodTag::Mysterious);
    }

    #[test]
    fn last_matching_override_wins() {
        let lib = library();
        // Both the greeting and the affection rule trigger; affection is later.
        let reply = lib
            .lookup(&id("romantic-star"), 0, "hey I love it here", &mut StdRng::seed_from_u64(1))
            .unwrap();
        assert!(reply.content.contains("heart race"), "got {}", reply.content);
    }

    #[test]
    fn override_without_matching_line_keeps_random_pick() {
        let lib = library();
        let pools = lib.pools(&id("sassy-diva")).unwrap().clone();
        let reply = lib
            .lookup(&id("sassy-diva"), 0, "love", &mut StdRng::seed_from_u64(11))
            .unwrap();
        assert!(pools.base.iter().any(|l| l.text == reply.content));
    }

    #[test]
    fn unknown_persona_is_an_error() {
        let lib = library();
        let err = lib
            .lookup(&id("nobody"), 0, "hello", &mut StdRng::seed_from_u64(0))
            .unwrap_err();
        assert!(matches!(err, FallbackError::UnknownPersona(p) if p.as_str() == "nobody"));
    }

    #[test]
    fn greeting_falls_back_to_default() {
        let lib = library();
        assert!(lib.greeting(&id("nerdy-crush")).starts_with("Hi! Oh wow"));
        assert_eq!(lib.greeting(&id("nobody")), lib.greeting(&id("romantic-star")));
    }

    #[test]
    fn empty_mood_shift_uses_base_pool() {
        let input = r#"(
            default_greeting: "Hi.",
            pools: {
                "solo": (
                    base: [(text: "Only line.", mood: flirty)],
                ),
            },
        )"#;
        let lib = FallbackLibrary::parse_ron(input).unwrap();
        let reply = lib
            .lookup(&id("solo"), 7, "anything", &mut StdRng::seed_from_u64(0))
            .unwrap();
        assert_eq!(reply.content, "Only line.");
        assert!(lib.overrides().is_empty());
    }

    #[test]
    fn empty_pool_is_an_error() {
        let input = r#"(
            default_greeting: "Hi.",
            pools: { "ghost": (base: []) },
        )"#;
        let lib = FallbackLibrary::parse_ron(input).unwrap();
        let err = lib
            .lookup(&id("ghost"), 0, "boo", &mut StdRng::seed_from_u64(0))
            .unwrap_err();
        assert!(matches!(err, FallbackError::EmptyPool(_)));
        assert!(!lib.has_persona(&id("ghost")));
    }

    #[test]
    fn custom_stage_table_moves_bucket_boundary() {
        let lib = library().with_stages(StageTable {
            mid_at: 1,
            late_at: 2,
            reveal_at: 3,
            early_end_at: 1,
        });
        let pools = lib.pools(&id("sassy-diva")).unwrap().clone();
        let reply = lib
            .lookup(&id("sassy-diva"), 1, "so", &mut StdRng::seed_from_u64(4))
            .unwrap();
        assert!(pools.mood_shift.iter().any(|l| l.text == reply.content));
    }
}
