// Content integration tests: the shipped personas and fallback tables.

use blind_date_engine::config::EngineConfig;
use blind_date_engine::core::classifier::MoodClassifier;
use blind_date_engine::core::fallback::FallbackLibrary;
use blind_date_engine::core::stage::{StageBucket, StageTable};
use blind_date_engine::schema::message::MoodTag;
use blind_date_engine::schema::persona::{PersonaId, PersonaRegistry};
use rand::rngs::StdRng;
use rand::SeedableRng;

const PERSONAS: [&str; 4] = ["romantic-star", "nerdy-crush", "sassy-diva", "mysterious-ai"];

#[test]
fn builtin_personas_load_from_file() {
    let from_file =
        PersonaRegistry::load_from_ron(std::path::Path::new("scenario_data/blind_date/personas.ron"))
            .unwrap();
    let builtin = PersonaRegistry::builtin().unwrap();
    assert_eq!(from_file.len(), builtin.len());

    let ids: Vec<&str> = builtin.ids().map(|id| id.as_str()).collect();
    assert_eq!(ids, PERSONAS.to_vec());

    for persona in builtin.iter() {
        assert!(!persona.name.is_empty());
        assert!(!persona.personality.is_empty());
        assert!(persona.fun_fact.is_some(), "{} has no fun fact", persona.id);
    }
}

#[test]
fn every_persona_has_greeting_and_pools() {
    let library = FallbackLibrary::load_from_ron(std::path::Path::new(
        "scenario_data/blind_date/fallbacks.ron",
    ))
    .unwrap();
    for id in PERSONAS {
        let id = PersonaId::from(id);
        assert!(library.has_greeting(&id), "{} has no greeting", id);
        let pools = library.pools(&id).unwrap();
        assert_eq!(pools.base.len(), 8, "{} base pool", id);
        assert_eq!(pools.mood_shift.len(), 2, "{} mood-shift pool", id);
    }
}

#[test]
fn love_always_picks_affectionate_line_when_one_exists() {
    let library = FallbackLibrary::builtin().unwrap();
    let stages = StageTable::default();

    for id in PERSONAS {
        let id = PersonaId::from(id);
        let pools = library.pools(&id).unwrap();
        for stage in [0, stages.mid_at, stages.late_at] {
            let pool = match stages.bucket(stage) {
                StageBucket::Early => &pools.base,
                StageBucket::Mid | StageBucket::Late => &pools.mood_shift,
            };
            let has_affection = pool
                .iter()
                .any(|line| line.text.contains("love") || line.text.contains("heart"));
            if !has_affection {
                continue;
            }
            for seed in 0..32 {
                let mut rng = StdRng::seed_from_u64(seed);
                let reply = library
                    .lookup(&id, stage, "I love spending time with you", &mut rng)
                    .unwrap();
                assert!(
                    reply.content.contains("love") || reply.content.contains("heart"),
                    "{} at stage {} gave {:?}",
                    id,
                    stage,
                    reply.content
                );
            }
        }
    }
}

#[test]
fn classifier_known_cases() {
    let classifier = MoodClassifier::new(StageTable::default());
    assert_eq!(classifier.classify("I feel so nervous", 0), MoodTag::Nervous);
    assert_eq!(classifier.classify("you're gorgeous", 0), MoodTag::Sassy);
    assert_eq!(classifier.classify("I love how you feel", 6), MoodTag::Romantic);
}

#[test]
fn shipped_engine_config_matches_defaults() {
    let config =
        EngineConfig::load_from_ron(std::path::Path::new("scenario_data/blind_date/engine.ron"))
            .unwrap();
    assert_eq!(config, EngineConfig::default());
}
