//! Prompt assembly for language model backends.

use serde::{Deserialize, Serialize};

use crate::core::stage::{StageBucket, StageTable};
use crate::schema::message::{Message, Sender};
use crate::schema::persona::Persona;

/// Number of prior messages included as context.
pub const HISTORY_WINDOW: usize = 3;

/// Extra narrative direction per stage bucket. `None` adds nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageInstructions {
    #[serde(default)]
    pub early: Option<String>,
    #[serde(default)]
    pub mid: Option<String>,
    #[serde(default)]
    pub late: Option<String>,
}

impl Default for StageInstructions {
    fn default() -> Self {
        Self {
            early: None,
            mid: Some(
                "Start opening up more emotionally. Share something personal or vulnerable. \
                 Be more genuine and less performative."
                    .to_string(),
            ),
            late: Some(
                "The conversation is deepening. Be vulnerable and authentic. Express genuine \
                 interest in seeing them again after tonight."
                    .to_string(),
            ),
        }
    }
}

impl StageInstructions {
    pub fn for_bucket(&self, bucket: StageBucket) -> Option<&str> {
        match bucket {
            StageBucket::Early => self.early.as_deref(),
            StageBucket::Mid => self.mid.as_deref(),
            StageBucket::Late => self.late.as_deref(),
        }
    }
}

/// Builds a single instruction-formatted prompt from the persona, a short
/// window of history and the user's latest line.
#[derive(Debug, Clone, Default)]
pub struct PromptBuilder {
    stages: StageTable,
    instructions: StageInstructions,
}

impl PromptBuilder {
    pub fn new(stages: StageTable) -> Self {
        Self {
            stages,
            instructions: StageInstructions::default(),
        }
    }

    pub fn with_instructions(mut self, instructions: StageInstructions) -> Self {
        self.instructions = instructions;
        self
    }

    /// `history` is the conversation before `user_text` was said. Only the
    /// last [`HISTORY_WINDOW`] entries are used.
    pub fn build(
        &self,
        persona: &Persona,
        history: &[Message],
        stage: u32,
        user_text: &str,
    ) -> String {
        let start = history.len().saturating_sub(HISTORY_WINDOW);
        let context = history[start..]
            .iter()
            .map(|msg| {
                let label = match msg.sender() {
                    Sender::User => "User",
                    Sender::Persona => persona.name.as_str(),
                };
                format!("{}: {}", label, msg.content())
            })
            .collect::<Vec<_>>()
            .join("\n");

        let stage_context = self
            .instructions
            .for_bucket(self.stages.bucket(stage))
            .unwrap_or("");

        format!(
            "You are {name}, an AI character on a blind date. Your personality: {personality}\n\
             \n\
             {stage_context}\n\
             \n\
             Previous conversation:\n\
             {context}\n\
             \n\
             User just said: \"{user_text}\"\n\
             \n\
             Respond as {name} in character. Keep it under 80 words, be natural and \
             conversational like a real person on a date. Avoid overly flowery language or \
             excessive emojis. Be genuine, relatable, and human-like. Show personality through \
             natural speech patterns, not just descriptions. Don't break character or mention \
             you're an AI unless it's part of your character.",
            name = persona.name,
            personality = persona.personality,
        )
    }
}
