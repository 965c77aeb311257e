//! Turn orchestration: user input in, persona reply out.
//!
//! A turn runs in three steps so a host can release the session while the
//! provider call is pending:
//!
//! 1. [`ConversationOrchestrator::begin_turn`] validates the input, appends
//!    the user message and opens a turn ticket.
//! 2. [`ConversationOrchestrator::resolve_turn`] calls the provider with one
//!    retry, or falls back to scripted content.
//! 3. [`ConversationOrchestrator::complete_turn`] appends the reply, advances
//!    the stage and checks the reveal.
//!
//! [`ConversationOrchestrator::submit_user_turn`] runs all three in order.

use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::{ConfigError, EngineConfig};
use crate::core::classifier::MoodClassifier;
use crate::core::fallback::{FallbackError, FallbackLibrary};
use crate::core::prompt::PromptBuilder;
use crate::core::stage::StageTable;
use crate::providers::{select_provider, ProviderError, ProviderSettings, ResponseProvider};
use crate::schema::message::{AiResponse, Message, MoodTag};
use crate::schema::persona::{Persona, PersonaError, PersonaId, PersonaRegistry};
use crate::schema::session::{Session, SessionId, TurnTicket};

/// Errors a host sees from turn and session operations.
#[derive(Debug, Error)]
pub enum ConversationError {
    #[error("message is empty")]
    EmptyInput,
    #[error("a reply is already pending for this session")]
    TurnInProgress,
    #[error("unknown persona: {0}")]
    UnknownPersona(PersonaId),
    #[error("reply belongs to a session that is no longer current")]
    StaleSession,
    #[error("cannot end the date at stage {stage}, minimum is {minimum}")]
    EndTooEarly { stage: u32, minimum: u32 },
    #[error("fallback error: {0}")]
    Fallback(#[from] FallbackError),
}

/// Errors from building the orchestrator.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("no personas registered")]
    MissingPersonas,
    #[error("persona {0} has no fallback pool")]
    MissingPool(PersonaId),
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("persona error: {0}")]
    Persona(#[from] PersonaError),
    #[error("fallback error: {0}")]
    Fallback(#[from] FallbackError),
}

/// Recoverable notice for the host to show alongside a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advisory {
    /// Both provider attempts failed and the reply is scripted.
    ConnectionTrouble,
    /// The first attempt failed and the retry succeeded.
    Reconnected,
}

impl Advisory {
    pub fn message(&self) -> &'static str {
        match self {
            Advisory::ConnectionTrouble => {
                "I seem to be having connection issues... But I'm still here! 💕"
            }
            Advisory::Reconnected => "Having trouble connecting... Let me try again! 💫",
        }
    }
}

/// Where a reply came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplySource {
    Provider { name: String, attempts: u32 },
    Fallback,
}

impl ReplySource {
    pub fn is_fallback(&self) -> bool {
        matches!(self, ReplySource::Fallback)
    }
}

/// A turn that has been started but not yet completed.
#[derive(Debug, Clone)]
pub struct PendingTurn {
    session_id: SessionId,
    ticket: TurnTicket,
    persona_id: PersonaId,
    stage: u32,
    user_text: String,
    prompt: String,
}

impl PendingTurn {
    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    pub fn ticket(&self) -> TurnTicket {
        self.ticket
    }

    pub fn persona_id(&self) -> &PersonaId {
        &self.persona_id
    }

    /// Stage at the time the user spoke.
    pub fn stage(&self) -> u32 {
        self.stage
    }

    pub fn user_text(&self) -> &str {
        &self.user_text
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }
}

/// A resolved reply, ready to be applied to its session.
#[derive(Debug, Clone)]
pub struct TurnReply {
    pub response: AiResponse,
    pub source: ReplySource,
    pub advisory: Option<Advisory>,
}

/// Result of a completed turn.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub response: AiResponse,
    /// Stage after this turn.
    pub stage: u32,
    pub revealed: bool,
    pub source: ReplySource,
    pub advisory: Option<Advisory>,
}

/// How the provider side of a turn ended.
#[derive(Debug)]
enum ProviderOutcome {
    NoProvider,
    Replied {
        text: String,
        attempts: u32,
    },
    BothFailed {
        first_error: ProviderError,
        last_error: ProviderError,
    },
}

/// Clears the session's in-flight ticket unless disarmed.
struct AbandonOnDrop<'a> {
    session: &'a mut Session,
    armed: bool,
}

impl Drop for AbandonOnDrop<'_> {
    fn drop(&mut self) {
        if self.armed && self.session.abandon_turn().is_some() {
            debug!(session = self.session.id().0, "turn abandoned");
        }
    }
}

/// Provider call progress for one turn.
#[derive(Debug)]
enum RetryState {
    FirstAttempt,
    Retrying { first_error: ProviderError },
    Done(ProviderOutcome),
}

pub struct ConversationOrchestrator {
    personas: Arc<PersonaRegistry>,
    fallbacks: Arc<FallbackLibrary>,
    provider: Option<Arc<dyn ResponseProvider>>,
    prompts: PromptBuilder,
    classifier: MoodClassifier,
    config: EngineConfig,
    seed: u64,
}

/// Builder for constructing a `ConversationOrchestrator`.
///
/// Without explicit content the built-in personas and fallbacks are used.
/// Without a provider or provider settings every reply is scripted.
pub struct ConversationOrchestratorBuilder {
    personas: Option<PersonaRegistry>,
    personas_path: Option<String>,
    fallbacks: Option<FallbackLibrary>,
    fallbacks_path: Option<String>,
    provider: Option<Arc<dyn ResponseProvider>>,
    provider_settings: Option<ProviderSettings>,
    config: EngineConfig,
}

impl ConversationOrchestrator {
    pub fn builder() -> ConversationOrchestratorBuilder {
        ConversationOrchestratorBuilder {
            personas: None,
            personas_path: None,
            fallbacks: None,
            fallbacks_path: None,
            provider: None,
            provider_settings: None,
            config: EngineConfig::default(),
        }
    }

    pub fn personas(&self) -> &PersonaRegistry {
        &self.personas
    }

    pub fn fallbacks(&self) -> &FallbackLibrary {
        &self.fallbacks
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn stages(&self) -> &StageTable {
        &self.config.stages
    }

    /// Name of the active backend, `None` in scripted-only mode.
    pub fn provider_name(&self) -> Option<&str> {
        self.provider.as_deref().map(|p| p.name())
    }

    /// Start a conversation with the persona's opening line.
    ///
    /// Personas missing from the greeting table open with the default
    /// greeting.
    pub fn start_session(&self, persona: &Arc<Persona>) -> Session {
        let mut session = Session::new(Arc::clone(persona));
        let greeting = self.fallbacks.greeting(&persona.id);
        session.push(Message::from_persona(greeting, MoodTag::Flirty));
        debug!(session = session.id().0, persona = %persona.id, "session started");
        session
    }

    pub fn start_session_by_id(&self, id: &PersonaId) -> Result<Session, ConversationError> {
        let persona = self
            .personas
            .get(id)
            .ok_or_else(|| ConversationError::UnknownPersona(id.clone()))?;
        Ok(self.start_session(persona))
    }

    /// A fresh session, with a new id, for the same persona.
    pub fn restart_session(&self, session: &Session) -> Session {
        self.start_session(session.persona())
    }

    /// Force the reveal once enough turns have been completed.
    pub fn end_session_early(&self, session: &mut Session) -> Result<(), ConversationError> {
        let stages = &self.config.stages;
        if !stages.can_end_early(session.stage()) {
            return Err(ConversationError::EndTooEarly {
                stage: session.stage(),
                minimum: stages.early_end_at,
            });
        }
        if !session.is_revealed() {
            session.mark_revealed();
            info!(session = session.id().0, stage = session.stage(), "date ended early");
        }
        Ok(())
    }

    /// Run a whole turn against the session.
    ///
    /// The session stays mutably borrowed while the provider is called. Hosts
    /// that need to keep using the session meanwhile should use the split
    /// API instead.
    ///
    /// Dropping the returned future before it resolves abandons the turn, so
    /// the session accepts the next message.
    pub async fn submit_user_turn(
        &self,
        session: &mut Session,
        text: &str,
    ) -> Result<TurnOutcome, ConversationError> {
        let pending = self.begin_turn(session, text)?;
        let reply = {
            let mut guard = AbandonOnDrop {
                session: &mut *session,
                armed: true,
            };
            let reply = self.resolve_turn(&pending).await;
            guard.armed = reply.is_err();
            reply
        }?;
        self.complete_turn(session, pending, reply)
    }

    /// Validate input, record the user message and open a turn.
    ///
    /// Nothing is changed on error.
    pub fn begin_turn(
        &self,
        session: &mut Session,
        text: &str,
    ) -> Result<PendingTurn, ConversationError> {
        if text.trim().is_empty() {
            return Err(ConversationError::EmptyInput);
        }
        if session.turn_in_flight().is_some() {
            return Err(ConversationError::TurnInProgress);
        }

        let stage = session.stage();
        let prompt = self
            .prompts
            .build(session.persona(), session.messages(), stage, text);

        session.push(Message::from_user(text));
        let ticket = session.open_turn();

        Ok(PendingTurn {
            session_id: session.id(),
            ticket,
            persona_id: session.persona().id.clone(),
            stage,
            user_text: text.to_string(),
            prompt,
        })
    }

    /// Produce the persona reply for a pending turn.
    ///
    /// Never touches the session. If this returns an error the host should
    /// call [`Session::abandon_turn`].
    pub async fn resolve_turn(&self, pending: &PendingTurn) -> Result<TurnReply, ConversationError> {
        let advisory = match self.call_provider(pending).await {
            ProviderOutcome::Replied { text, attempts } => {
                let mood = self.classifier.classify(&text, pending.stage);
                let name = self.provider_name().unwrap_or_default().to_string();
                return Ok(TurnReply {
                    response: AiResponse::new(text, mood),
                    source: ReplySource::Provider { name, attempts },
                    advisory: (attempts > 1).then_some(Advisory::Reconnected),
                });
            }
            ProviderOutcome::BothFailed {
                first_error,
                last_error,
            } => {
                warn!(
                    session = pending.session_id.0,
                    first = %first_error,
                    last = %last_error,
                    "provider failed twice, using scripted reply"
                );
                Some(Advisory::ConnectionTrouble)
            }
            ProviderOutcome::NoProvider => None,
        };

        let mut rng = StdRng::seed_from_u64(
            self.seed
                .wrapping_add(pending.session_id.0.wrapping_mul(7919))
                .wrapping_add(pending.stage as u64),
        );
        let scripted =
            self.fallbacks
                .lookup(&pending.persona_id, pending.stage, &pending.user_text, &mut rng)?;
        let mood = self.classifier.classify(&scripted.content, pending.stage);

        Ok(TurnReply {
            response: AiResponse::new(scripted.content, mood),
            source: ReplySource::Fallback,
            advisory,
        })
    }

    /// Apply a reply to the session it was started on.
    ///
    /// Fails with [`ConversationError::StaleSession`] and changes nothing if
    /// the session was restarted or the turn abandoned in the meantime.
    pub fn complete_turn(
        &self,
        session: &mut Session,
        pending: PendingTurn,
        reply: TurnReply,
    ) -> Result<TurnOutcome, ConversationError> {
        if session.id() != pending.session_id || session.turn_in_flight() != Some(pending.ticket) {
            debug!(
                session = session.id().0,
                pending_session = pending.session_id.0,
                "dropping stale reply"
            );
            return Err(ConversationError::StaleSession);
        }

        session.push(reply.response.clone().into_message());
        session.close_turn();
        let stage = session.advance_stage();

        if self.config.stages.is_reveal(stage) && !session.is_revealed() {
            session.mark_revealed();
            info!(session = session.id().0, stage, "reveal reached");
        }

        Ok(TurnOutcome {
            response: reply.response,
            stage,
            revealed: session.is_revealed(),
            source: reply.source,
            advisory: reply.advisory,
        })
    }

    async fn call_provider(&self, pending: &PendingTurn) -> ProviderOutcome {
        let Some(provider) = self.provider.as_deref() else {
            return ProviderOutcome::NoProvider;
        };

        let mut state = RetryState::FirstAttempt;
        loop {
            state = match state {
                RetryState::FirstAttempt => match self.attempt(provider, &pending.prompt).await {
                    Ok(text) => RetryState::Done(ProviderOutcome::Replied { text, attempts: 1 }),
                    Err(error) => {
                        warn!(
                            session = pending.session_id.0,
                            backend = provider.name(),
                            error = %error,
                            "provider call failed, retrying"
                        );
                        RetryState::Retrying { first_error: error }
                    }
                },
                RetryState::Retrying { first_error } => {
                    let delay = self.config.retry_delay();
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    match self.attempt(provider, &pending.prompt).await {
                        Ok(text) => RetryState::Done(ProviderOutcome::Replied { text, attempts: 2 }),
                        Err(last_error) => RetryState::Done(ProviderOutcome::BothFailed {
                            first_error,
                            last_error,
                        }),
                    }
                }
                RetryState::Done(outcome) => return outcome,
            };
        }
    }

    async fn attempt(
        &self,
        provider: &dyn ResponseProvider,
        prompt: &str,
    ) -> Result<String, ProviderError> {
        let timeout = self.config.request_timeout();
        match tokio::time::timeout(timeout, provider.generate_response(prompt)).await {
            Ok(Ok(text)) if !text.trim().is_empty() => Ok(text.trim().to_string()),
            Ok(Ok(_)) => Err(ProviderError::Empty {
                backend: provider.name().to_string(),
            }),
            Ok(Err(error)) => Err(error),
            Err(_) => Err(ProviderError::Timeout(timeout)),
        }
    }
}

impl ConversationOrchestratorBuilder {
    pub fn personas_path(mut self, path: &str) -> Self {
        self.personas_path = Some(path.to_string());
        self
    }

    pub fn fallbacks_path(mut self, path: &str) -> Self {
        self.fallbacks_path = Some(path.to_string());
        self
    }

    /// Provide personas directly (for testing without files).
    pub fn with_personas(mut self, personas: PersonaRegistry) -> Self {
        self.personas = Some(personas);
        self
    }

    /// Provide fallback content directly (for testing without files).
    pub fn with_fallbacks(mut self, fallbacks: FallbackLibrary) -> Self {
        self.fallbacks = Some(fallbacks);
        self
    }

    /// Use this provider regardless of any provider settings.
    pub fn with_provider(mut self, provider: Arc<dyn ResponseProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn provider_settings(mut self, settings: ProviderSettings) -> Self {
        self.provider_settings = Some(settings);
        self
    }

    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = Some(seed);
        self
    }

    pub fn stages(mut self, stages: StageTable) -> Self {
        self.config.stages = stages;
        self
    }

    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.config.retry_delay_ms = delay.as_millis() as u64;
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn build(self) -> Result<ConversationOrchestrator, OrchestratorError> {
        let config = self.config;
        config.validate()?;

        let personas = match (self.personas, self.personas_path) {
            (Some(personas), _) => personas,
            (None, Some(path)) => PersonaRegistry::load_from_ron(Path::new(&path))?,
            (None, None) => PersonaRegistry::builtin()?,
        };
        if personas.is_empty() {
            return Err(OrchestratorError::MissingPersonas);
        }

        let fallbacks = match (self.fallbacks, self.fallbacks_path) {
            (Some(fallbacks), _) => fallbacks,
            (None, Some(path)) => FallbackLibrary::load_from_ron(Path::new(&path))?,
            (None, None) => FallbackLibrary::builtin()?,
        }
        .with_stages(config.stages);

        if let Some(missing) = personas.ids().find(|id| !fallbacks.has_persona(id)) {
            return Err(OrchestratorError::MissingPool(missing.clone()));
        }

        let provider = match (self.provider, self.provider_settings) {
            (Some(provider), _) => Some(provider),
            (None, Some(settings)) => select_provider(&settings, config.params),
            (None, None) => None,
        };

        let seed = config.seed.unwrap_or_else(rand::random);

        Ok(ConversationOrchestrator {
            personas: Arc::new(personas),
            fallbacks: Arc::new(fallbacks),
            provider,
            prompts: PromptBuilder::new(config.stages).with_instructions(config.instructions.clone()),
            classifier: MoodClassifier::new(config.stages),
            config,
            seed,
        })
    }
}
