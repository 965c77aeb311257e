//! Per-conversation state.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::message::{Message, Sender};
use super::persona::Persona;

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);
static NEXT_TURN_TICKET: AtomicU64 = AtomicU64::new(1);

/// Newtype wrapper for session IDs. A restarted conversation always gets a
/// fresh id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub u64);

impl SessionId {
    fn next() -> Self {
        Self(NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Identifies one outstanding persona turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TurnTicket(pub u64);

impl TurnTicket {
    pub(crate) fn next() -> Self {
        Self(NEXT_TURN_TICKET.fetch_add(1, Ordering::Relaxed))
    }
}

/// One conversation between the user and a persona.
///
/// The message list is append-only and the stage counter only moves
/// forward. Both are mutated exclusively by the orchestrator.
#[derive(Debug, Clone)]
pub struct Session {
    id: SessionId,
    persona: Arc<Persona>,
    messages: Vec<Message>,
    stage: u32,
    revealed: bool,
    in_flight: Option<TurnTicket>,
}

impl Session {
    pub(crate) fn new(persona: Arc<Persona>) -> Self {
        Self {
            id: SessionId::next(),
            persona,
            messages: Vec::new(),
            stage: 0,
            revealed: false,
            in_flight: None,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn persona(&self) -> &Arc<Persona> {
        &self.persona
    }

    /// Messages in conversation order.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn stage(&self) -> u32 {
        self.stage
    }

    pub fn is_revealed(&self) -> bool {
        self.revealed
    }

    pub fn turn_in_flight(&self) -> Option<TurnTicket> {
        self.in_flight
    }

    pub fn user_message_count(&self) -> usize {
        self.count_by(Sender::User)
    }

    pub fn persona_message_count(&self) -> usize {
        self.count_by(Sender::Persona)
    }

    /// Fraction of the way to the reveal, clamped to `0.0..=1.0`.
    pub fn progress(&self, reveal_at: u32) -> f32 {
        if reveal_at == 0 {
            return 1.0;
        }
        (self.stage as f32 / reveal_at as f32).min(1.0)
    }

    /// Drop the outstanding turn without applying a reply, e.g. after the
    /// host cancelled the future resolving it. The user message stays.
    pub fn abandon_turn(&mut self) -> Option<TurnTicket> {
        self.in_flight.take()
    }

    fn count_by(&self, sender: Sender) -> usize {
        self.messages.iter().filter(|m| m.sender() == sender).count()
    }

    pub(crate) fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub(crate) fn open_turn(&mut self) -> TurnTicket {
        let ticket = TurnTicket::next();
        self.in_flight = Some(ticket);
        ticket
    }

    pub(crate) fn close_turn(&mut self) {
        self.in_flight = None;
    }

    pub(crate) fn advance_stage(&mut self) -> u32 {
        self.stage += 1;
        self.stage
    }

    pub(crate) fn mark_revealed(&mut self) {
        self.revealed = true;
    }
}
