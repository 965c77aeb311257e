// First Date demo: a scripted offline date with Maya.
//
// The provider flakes once mid-date and drops out completely near the end,
// so the run shows a normal reply, a recovered retry and a scripted fallback.
//
// Run with: cargo run --example first_date

use blind_date_engine::core::orchestrator::{ConversationOrchestrator, ReplySource};
use blind_date_engine::core::reveal::{self, DateSummary, Rating};
use blind_date_engine::providers::{ProviderError, ScriptedProvider};
use blind_date_engine::schema::persona::PersonaId;
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() {
    let provider = ScriptedProvider::new()
        .named("demo")
        .with_reply("Ha, okay, I'm a little nervous. Do you always open this strong?")
        .with_reply("I build tiny robots on weekends. One of them waters my plants. Badly.")
        .with_error(ProviderError::Http {
            status: 503,
            message: "overloaded".into(),
        })
        .with_reply("Sorry, brain buffered for a second. You were saying you like hiking?")
        .with_reply("Honestly? I feel like I've known you longer than one evening.")
        .with_error(ProviderError::Transport("connection reset".into()))
        .with_error(ProviderError::Transport("connection reset".into()))
        .with_reply("Can I tell you a secret? I almost didn't come tonight. I'm really glad I did.");

    let engine = ConversationOrchestrator::builder()
        .seed(2026)
        .retry_delay(Duration::from_millis(100))
        .with_provider(Arc::new(provider))
        .build()
        .expect("Failed to build orchestrator");

    let mut session = engine
        .start_session_by_id(&PersonaId::from("nerdy-crush"))
        .expect("Maya is a built-in persona");

    let persona = Arc::clone(session.persona());
    println!("=== First Date ===\n");
    println!("{} {}: {}\n", persona.avatar, persona.name, session.messages()[0].content());

    let lines = [
        "Hi! You look great tonight.",
        "So what do you do for fun?",
        "I love that. I'm more of an outdoors person, I like hiking.",
        "This is going really well, isn't it?",
        "I have to say, I feel the same way.",
        "Tell me something nobody knows about you.",
        "I'd love to see you again.",
        "Same time next week?",
    ];

    for line in lines {
        println!("You: {}", line);
        let outcome = match engine.submit_user_turn(&mut session, line).await {
            Ok(outcome) => outcome,
            Err(e) => {
                println!("  !! {}", e);
                continue;
            }
        };
        if let Some(advisory) = outcome.advisory {
            println!("  ({})", advisory.message());
        }
        let origin = match &outcome.source {
            ReplySource::Provider { attempts, .. } if *attempts > 1 => "retried",
            ReplySource::Provider { .. } => "live",
            ReplySource::Fallback => "scripted",
        };
        println!(
            "{} {} {} [{}]: {}\n",
            persona.avatar,
            persona.name,
            outcome.response.mood.icon(),
            origin,
            outcome.response.content
        );
        if outcome.revealed {
            break;
        }
    }

    let summary = DateSummary::from_session(&session);
    println!("=== The Reveal ===\n");
    println!("{}  Meet {}!", summary.reveal_glyph, summary.persona_name);
    if let Some(fact) = &summary.fun_fact {
        println!("Fun fact: {}", fact);
    }
    println!(
        "{} messages over about {}\n",
        summary.total_messages,
        summary.duration_label()
    );

    let rating = Rating::new(4).expect("4 stars is a valid rating");
    let score = reveal::compatibility_score(&session, Some(rating));
    println!("Rating: {}/5, {}", rating.stars(), rating.closing_line());
    println!("Compatibility: {}% {}\n", score, reveal::score_message(score));

    println!("--- Transcript ---");
    println!("{}", reveal::render_transcript(&session, rating));
}
