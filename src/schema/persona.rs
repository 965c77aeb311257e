//! Persona definitions and the registry they are loaded into.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersonaError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
    #[error("duplicate persona id: {0}")]
    DuplicateId(PersonaId),
}

/// Newtype wrapper for persona identifiers such as `"romantic-star"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PersonaId(pub String);

impl PersonaId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PersonaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PersonaId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Presentation theme. The engine never interprets these values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Theme {
    pub primary: String,
    pub secondary: String,
    pub accent: String,
}

/// A scripted character the user can go on a date with.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Persona {
    pub id: PersonaId,
    pub name: String,
    pub description: String,
    /// Prompt fragment describing how the persona talks and behaves.
    pub personality: String,
    /// Glyph shown during the conversation.
    pub avatar: String,
    /// Glyph shown once the persona is revealed.
    pub reveal_glyph: String,
    #[serde(default)]
    pub theme: Theme,
    /// One-line trivia shown on the reveal screen.
    #[serde(default)]
    pub fun_fact: Option<String>,
}

/// Registry of all loaded personas, keyed by id.
///
/// Personas are handed out as `Arc<Persona>` so sessions can hold on to
/// them without owning them.
#[derive(Debug, Clone, Default)]
pub struct PersonaRegistry {
    personas: FxHashMap<PersonaId, Arc<Persona>>,
    /// Ids in load order, for stable listings.
    order: Vec<PersonaId>,
}

const BUILTIN_PERSONAS: &str = include_str!("../../scenario_data/blind_date/personas.ron");

impl PersonaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The reference cast shipped with the engine.
    pub fn builtin() -> Result<Self, PersonaError> {
        Self::parse_ron(BUILTIN_PERSONAS)
    }

    /// Load personas from a RON file containing a list of persona definitions.
    pub fn load_from_ron(path: &Path) -> Result<Self, PersonaError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }

    pub fn parse_ron(input: &str) -> Result<Self, PersonaError> {
        let personas: Vec<Persona> = ron::from_str(input)?;
        let mut registry = Self::new();
        for persona in personas {
            registry.register(persona)?;
        }
        Ok(registry)
    }

    /// Add a persona. Ids must be unique within the registry.
    pub fn register(&mut self, persona: Persona) -> Result<Arc<Persona>, PersonaError> {
        if self.personas.contains_key(&persona.id) {
            return Err(PersonaError::DuplicateId(persona.id));
        }
        let id = persona.id.clone();
        let persona = Arc::new(persona);
        self.personas.insert(id.clone(), Arc::clone(&persona));
        self.order.push(id);
        Ok(persona)
    }

    pub fn get(&self, id: &PersonaId) -> Option<&Arc<Persona>> {
        self.personas.get(id)
    }

    pub fn contains(&self, id: &PersonaId) -> bool {
        self.personas.contains_key(id)
    }

    /// Personas in the order they were registered.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Persona>> {
        self.order.iter().filter_map(|id| self.personas.get(id))
    }

    pub fn ids(&self) -> impl Iterator<Item = &PersonaId> {
        self.order.iter()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
