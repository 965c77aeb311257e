// Date Shell: interactive terminal blind date.
//
// Usage: date_shell [--config <path>] [--personas <path>] [--fallbacks <path>]
//                   [--seed <n>] [--offline]
//
// Plain lines are sent to the current date. Commands start with '/':
//   /personas          list available personas
//   /date <id>         start a date with a persona
//   /status            show stage and reveal progress
//   /end               end the date early (once allowed)
//   /rate <1-5>        rate the revealed date and show the summary
//   /save [path]       write the transcript of a rated date
//   /restart           start over with the same persona
//   /help              list commands
//   /quit              exit
//
// Provider credentials are read from the environment or a `.env` file.
// RUST_LOG controls log output (default `warn`).

use blind_date_engine::config::EngineConfig;
use blind_date_engine::core::orchestrator::{ConversationOrchestrator, ReplySource};
use blind_date_engine::core::reveal::{self, DateSummary, Rating};
use blind_date_engine::providers::ProviderSettings;
use blind_date_engine::schema::persona::PersonaId;
use blind_date_engine::schema::session::Session;
use std::io::{self, Write};
use std::path::Path;
use std::process;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();

    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        return;
    }

    let mut config_path = None;
    let mut personas_path = None;
    let mut fallbacks_path = None;
    let mut seed = None;
    let mut offline = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" if i + 1 < args.len() => {
                i += 1;
                config_path = Some(args[i].clone());
            }
            "--personas" if i + 1 < args.len() => {
                i += 1;
                personas_path = Some(args[i].clone());
            }
            "--fallbacks" if i + 1 < args.len() => {
                i += 1;
                fallbacks_path = Some(args[i].clone());
            }
            "--seed" if i + 1 < args.len() => {
                i += 1;
                seed = args[i].parse().ok();
            }
            "--offline" => offline = true,
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                print_usage();
                process::exit(1);
            }
        }
        i += 1;
    }

    let config = match config_path {
        Some(path) => match EngineConfig::load_from_ron(Path::new(&path)) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("ERROR: Failed to load config: {}", e);
                process::exit(1);
            }
        },
        None => EngineConfig::default(),
    };

    let settings = if offline {
        ProviderSettings::offline()
    } else {
        ProviderSettings::from_env()
    };

    let mut builder = ConversationOrchestrator::builder()
        .config(config)
        .provider_settings(settings);
    if let Some(path) = personas_path {
        builder = builder.personas_path(&path);
    }
    if let Some(path) = fallbacks_path {
        builder = builder.fallbacks_path(&path);
    }
    if let Some(seed) = seed {
        builder = builder.seed(seed);
    }

    let engine = match builder.build() {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            process::exit(1);
        }
    };

    println!("Loaded {} personas", engine.personas().len());
    match engine.provider_name() {
        Some(name) => println!("Provider: {}", name),
        None => println!("Provider: none (scripted replies only)"),
    }
    println!("Type /help for commands.\n");
    print_personas(&engine);

    let mut session: Option<Session> = None;
    let mut rating: Option<Rating> = None;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = io::stdout();

    loop {
        print!("you> ");
        stdout.flush().ok();

        let Some(line) = read_input(&mut lines).await else {
            break;
        };
        let line = line.as_str();
        if line.trim().is_empty() {
            continue;
        }

        if !line.starts_with('/') {
            match session.as_mut() {
                Some(current) => send(&engine, current, line).await,
                None => println!("No date yet. Use /date <id> to start one."),
            }
            continue;
        }

        let parts: Vec<&str> = line[1..].split_whitespace().collect();
        let cmd = parts.first().map(|c| c.to_lowercase()).unwrap_or_default();

        match cmd.as_str() {
            "quit" | "exit" | "q" => {
                println!("Goodbye.");
                break;
            }
            "help" | "h" | "?" => print_help(),
            "personas" | "list" => print_personas(&engine),
            "date" => {
                let Some(id) = parts.get(1) else {
                    println!("Usage: /date <persona-id>");
                    continue;
                };
                match engine.start_session_by_id(&PersonaId::from(*id)) {
                    Ok(new_session) => {
                        print_opening(&new_session);
                        session = Some(new_session);
                        rating = None;
                    }
                    Err(e) => println!("ERROR: {}", e),
                }
            }
            "restart" => match session.as_ref() {
                Some(current) => {
                    let new_session = engine.restart_session(current);
                    print_opening(&new_session);
                    session = Some(new_session);
                    rating = None;
                }
                None => println!("No date to restart."),
            },
            "status" => match session.as_ref() {
                Some(current) => {
                    let reveal_at = engine.stages().reveal_at;
                    println!(
                        "Stage {}/{} ({:.0}%), {} messages, revealed: {}",
                        current.stage(),
                        reveal_at,
                        current.progress(reveal_at) * 100.0,
                        current.messages().len(),
                        current.is_revealed()
                    );
                }
                None => println!("No date in progress."),
            },
            "end" => match session.as_mut() {
                Some(current) => match engine.end_session_early(current) {
                    Ok(()) => print_reveal(current),
                    Err(e) => println!("{}", e),
                },
                None => println!("No date in progress."),
            },
            "rate" => {
                let Some(current) = session.as_ref() else {
                    println!("No date in progress.");
                    continue;
                };
                if !current.is_revealed() {
                    println!("Finish the date before rating it.");
                    continue;
                }
                let stars = parts.get(1).and_then(|s| s.parse::<u8>().ok()).unwrap_or(0);
                match Rating::new(stars) {
                    Ok(r) => {
                        rating = Some(r);
                        print_rating(current, r);
                    }
                    Err(e) => println!("{}", e),
                }
            }
            "save" => {
                let (Some(current), Some(r)) = (session.as_ref(), rating) else {
                    println!("Rate the date before saving the transcript.");
                    continue;
                };
                let path = parts
                    .get(1)
                    .map(|p| p.to_string())
                    .unwrap_or_else(|| reveal::transcript_file_name(current));
                match std::fs::write(&path, reveal::render_transcript(current, r)) {
                    Ok(()) => println!("Saved transcript to {}", path),
                    Err(e) => println!("ERROR: Failed to write {}: {}", path, e),
                }
            }
            _ => println!("Unknown command: /{}. Type /help for commands.", cmd),
        }
    }
}

/// Next line from the terminal, `None` at end of input or on a read error.
async fn read_input<R: AsyncBufRead + Unpin>(lines: &mut Lines<R>) -> Option<String> {
    match lines.next_line().await {
        Ok(Some(line)) => Some(line.trim_end_matches('\r').to_string()),
        Ok(None) => None,
        Err(e) => {
            eprintln!("ERROR: Failed to read input: {}", e);
            None
        }
    }
}

async fn send(engine: &ConversationOrchestrator, session: &mut Session, text: &str) {
    let was_revealed = session.is_revealed();
    match engine.submit_user_turn(session, text).await {
        Ok(outcome) => {
            if let Some(advisory) = outcome.advisory {
                println!("  ({})", advisory.message());
            }
            let origin = match &outcome.source {
                ReplySource::Provider { name, .. } => name.as_str(),
                ReplySource::Fallback => "scripted",
            };
            println!(
                "{} {} [{} {}, {}]: {}",
                session.persona().avatar,
                session.persona().name,
                outcome.response.mood.icon(),
                outcome.response.mood,
                origin,
                outcome.response.content
            );
            if outcome.revealed && !was_revealed {
                print_reveal(session);
            } else if engine.stages().can_end_early(outcome.stage) && !outcome.revealed {
                println!("  (You can /end the date whenever you like.)");
            }
        }
        Err(e) => println!("ERROR: {}", e),
    }
}

fn print_opening(session: &Session) {
    let persona = session.persona();
    println!("\n--- Blind date with {} ---", persona.avatar);
    println!("{}\n", persona.description);
    if let Some(opening) = session.last_message() {
        println!("{} {}: {}", persona.avatar, persona.name, opening.content());
    }
}

fn print_reveal(session: &Session) {
    let summary = DateSummary::from_session(session);
    println!("\n=== The Reveal ===\n");
    println!("{}  Meet {}!", summary.reveal_glyph, summary.persona_name);
    println!("{}", session.persona().description);
    if let Some(fact) = &summary.fun_fact {
        println!("Fun fact: {}", fact);
    }
    println!(
        "\n{} messages ({} from you), about {}",
        summary.total_messages,
        summary.user_messages,
        summary.duration_label()
    );
    println!("Rate your date with /rate <1-5>.\n");
}

fn print_rating(session: &Session, rating: Rating) {
    let score = reveal::compatibility_score(session, Some(rating));
    println!("\n{}/5 stars: {}", rating.stars(), rating.compatibility());
    println!("{}", rating.closing_line());
    println!("Compatibility score: {}% {}", score, reveal::score_message(score));
    println!("Save the transcript with /save [path].\n");
}

fn print_personas(engine: &ConversationOrchestrator) {
    println!("Available dates:");
    for persona in engine.personas().iter() {
        println!("  {:<15} {} {}", persona.id.as_str(), persona.avatar, persona.description);
    }
    println!();
}

fn print_usage() {
    println!("Usage: date_shell [--config <path>] [--personas <path>] [--fallbacks <path>] [--seed <n>] [--offline]");
}

fn print_help() {
    println!("Type anything to talk to your date. Commands:");
    println!("  /personas        list available personas");
    println!("  /date <id>       start a date with a persona");
    println!("  /status          show stage and reveal progress");
    println!("  /end             end the date early");
    println!("  /rate <1-5>      rate the date after the reveal");
    println!("  /save [path]     save the transcript of a rated date");
    println!("  /restart         start over with the same persona");
    println!("  /quit            exit");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reads_lines_until_end_of_input() {
        let input: &[u8] = b"hello there\r\n\n/end\n";
        let mut lines = BufReader::new(input).lines();
        assert_eq!(read_input(&mut lines).await.as_deref(), Some("hello there"));
        assert_eq!(read_input(&mut lines).await.as_deref(), Some(""));
        assert_eq!(read_input(&mut lines).await.as_deref(), Some("/end"));
        assert_eq!(read_input(&mut lines).await, None);
    }
}
