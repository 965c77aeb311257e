//! Post-date summary, rating and transcript.

use std::fmt;
use thiserror::Error;

use crate::schema::persona::PersonaId;
use crate::schema::session::Session;

/// Substrings in user messages that count toward the compatibility score.
const POSITIVE_WORDS: &[&str] = &[
    "love",
    "like",
    "amazing",
    "wonderful",
    "great",
    "awesome",
    "beautiful",
    "sweet",
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RevealError {
    #[error("rating must be between 1 and 5 stars, got {0}")]
    InvalidRating(u8),
}

/// A star rating from 1 to 5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Rating(u8);

impl Rating {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    pub fn new(stars: u8) -> Result<Self, RevealError> {
        if (Self::MIN..=Self::MAX).contains(&stars) {
            Ok(Self(stars))
        } else {
            Err(RevealError::InvalidRating(stars))
        }
    }

    pub fn stars(&self) -> u8 {
        self.0
    }

    pub fn compatibility(&self) -> Compatibility {
        match self.0 {
            n if n >= 4 => Compatibility::Excellent,
            3 => Compatibility::Great,
            2 => Compatibility::Good,
            _ => Compatibility::CouldBeBetter,
        }
    }

    pub fn closing_line(&self) -> &'static str {
        match self.0 {
            n if n >= 4 => "Looks like you found your perfect match! 💕",
            3 => "Great chemistry! Maybe a second date? 😊",
            2 => "Not bad for a first date! 💫",
            _ => "Everyone has different preferences! 🌟",
        }
    }
}

impl TryFrom<u8> for Rating {
    type Error = RevealError;

    fn try_from(stars: u8) -> Result<Self, Self::Error> {
        Rating::new(stars)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compatibility {
    Excellent,
    Great,
    Good,
    CouldBeBetter,
}

impl Compatibility {
    pub fn label(&self) -> &'static str {
        match self {
            Compatibility::Excellent => "Excellent",
            Compatibility::Great => "Great",
            Compatibility::Good => "Good",
            Compatibility::CouldBeBetter => "Could be better",
        }
    }
}

impl fmt::Display for Compatibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Everything the reveal screen shows about a finished date.
#[derive(Debug, Clone, PartialEq)]
pub struct DateSummary {
    pub persona_id: PersonaId,
    pub persona_name: String,
    pub reveal_glyph: String,
    pub fun_fact: Option<String>,
    pub total_messages: usize,
    pub user_messages: usize,
    pub persona_messages: usize,
    /// Rough length of the date, one minute per four messages, rounded up.
    pub duration_minutes: usize,
    pub final_stage: u32,
}

impl DateSummary {
    pub fn from_session(session: &Session) -> Self {
        let persona = session.persona();
        let user_messages = session.user_message_count();
        let persona_messages = session.persona_message_count();
        let total_messages = user_messages + persona_messages;

        Self {
            persona_id: persona.id.clone(),
            persona_name: persona.name.clone(),
            reveal_glyph: persona.reveal_glyph.clone(),
            fun_fact: persona.fun_fact.clone(),
            total_messages,
            user_messages,
            persona_messages,
            duration_minutes: total_messages.div_ceil(4),
            final_stage: session.stage(),
        }
    }

    pub fn duration_label(&self) -> String {
        format!("{} minutes", self.duration_minutes)
    }
}

/// Score from 0 to 100. An unrated date contributes no rating bonus.
///
/// 50 base, 3 per user message up to 30, 4 per star, and 2 for every
/// positive word found in each user message.
pub fn compatibility_score(session: &Session, rating: Option<Rating>) -> u8 {
    let user_lines: Vec<String> = session
        .messages()
        .iter()
        .filter(|m| m.is_from_user())
        .map(|m| m.content().to_lowercase())
        .collect();

    let positive_hits: usize = user_lines
        .iter()
        .map(|line| POSITIVE_WORDS.iter().filter(|w| line.contains(*w)).count())
        .sum();

    let score = 50
        + (user_lines.len() * 3).min(30)
        + rating.map_or(0, |r| r.stars() as usize * 4)
        + positive_hits * 2;

    score.min(100) as u8
}

pub fn score_message(score: u8) -> &'static str {
    match score {
        90..=u8::MAX => "Perfect Match! 💕",
        80..=89 => "Excellent Chemistry! ✨",
        70..=79 => "Great Connection! 💫",
        60..=69 => "Good Compatibility! 😊",
        50..=59 => "Nice Potential! 🌟",
        _ => "Room to Grow! 💪",
    }
}

/// Plain-text export of the conversation.
pub fn render_transcript(session: &Session, rating: Rating) -> String {
    let name = &session.persona().name;
    let lines = session
        .messages()
        .iter()
        .map(|m| {
            let label = if m.is_from_user() { "You" } else { name.as_str() };
            format!("{}: {}", label, m.content())
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Blind Date with AI - Chat with {}\n\n{}\n\nRating: {}/5 stars\nCompatibility: {}",
        name,
        lines,
        rating.stars(),
        rating.compatibility()
    )
}

/// Suggested file name for [`render_transcript`] output.
pub fn transcript_file_name(session: &Session) -> String {
    format!("blind-date-{}.txt", session.persona().name)
}
