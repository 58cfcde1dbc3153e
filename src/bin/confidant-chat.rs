//! Interactive practice sessions with simulated counseling clients.
//!
//! This binary provides a REPL in front of a [`SessionController`] talking to
//! a chat gateway.
//!
//! # Usage
//!
//! ```bash
//! # Personas from the gateway on localhost:8000
//! confidant-chat
//!
//! # Start with a specific client
//! confidant-chat --gateway https://chat.example.com --persona anxious-student
//!
//! # Personas from a local file, API key kept in memory only
//! confidant-chat --persona-file personas.yaml --no-keyring
//!
//! # One fixed instruction text, no persona switching
//! confidant-chat --instructions prompt.txt
//! ```
//!
//! Logging goes to stderr and is controlled by `CONFIDANT_LOG` (falling back
//! to `RUST_LOG`); the default is `confidant=warn`.
//!
//! # Commands
//!
//! - `/personas` - List available clients
//! - `/persona <id>` - Start a session with a client
//! - `/clear` - Start over with the current client
//! - `/key <api-key>` - Replace the stored API key
//! - `/stats` - Show session statistics
//! - `/quit` - Exit the application

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use arrrg::CommandLine;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use confidant::chat::{
    ChatArgs, ChatCommand, ChatConfig, PersonaSource, PlainTextRenderer, Renderer, help_text,
    parse_command,
};
use confidant::persona::FIXED_PERSONA_ID;
use confidant::{
    CredentialStore, FixedInstructions, HttpPersonaDirectory, KeyringCredentialStore, LengthHint,
    MemoryCredentialStore, MessageRole, PersonaDirectory, Recovery, RemoteChatClient,
    SessionController, SubmitOutcome, YamlPersonaDirectory,
};

type Session = SessionController<RemoteChatClient>;

/// Main entry point for the confidant-chat application.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let (args, _) = ChatArgs::from_command_line_relaxed("confidant-chat [OPTIONS]");
    let config = ChatConfig::from(args);
    let mut renderer = PlainTextRenderer::with_color(config.use_color);

    let client = RemoteChatClient::new(&config.gateway)?;
    let fixed = matches!(
        config.persona_source,
        PersonaSource::Instructions(_) | PersonaSource::InstructionsUrl(_)
    );
    let directory: Box<dyn PersonaDirectory> = match &config.persona_source {
        PersonaSource::Gateway => Box::new(HttpPersonaDirectory::from_client(&client)),
        PersonaSource::File(path) => Box::new(YamlPersonaDirectory::from_path(path)?),
        PersonaSource::Instructions(path) => Box::new(FixedInstructions::from_path(path)?),
        PersonaSource::InstructionsUrl(url) => Box::new(FixedInstructions::fetch(url).await?),
    };
    let store: Arc<dyn CredentialStore> = if config.use_keyring {
        Arc::new(KeyringCredentialStore::new())
    } else {
        Arc::new(MemoryCredentialStore::new())
    };

    let session = SessionController::new(client, store, config.session_config());
    if let Err(err) = session.load_credential() {
        renderer.print_error(&format!("Could not read the stored API key: {err}"));
    }

    let mut rl = DefaultEditor::new()?;

    // A first Ctrl+C during a request warns; a second one exits.
    let interrupted = Arc::new(AtomicBool::new(false));
    let interrupted_clone = interrupted.clone();
    ctrlc::set_handler(move || {
        if interrupted_clone.swap(true, Ordering::Relaxed) {
            std::process::exit(130);
        }
    })?;

    println!("Confidant (gateway: {})", config.gateway);
    println!("Type /help for commands, /quit to exit\n");

    if !ensure_credential(&session, &mut rl, &mut renderer)? {
        return Ok(());
    }

    let initial = if fixed {
        Some(FIXED_PERSONA_ID.to_string())
    } else {
        config.persona.clone()
    };
    match initial {
        Some(id) => select_persona(&session, &*directory, &id, &mut renderer).await,
        None if config.require_persona => {
            list_personas(&*directory, &mut renderer).await;
            renderer.print_info("Choose a client with /persona <id>.");
        }
        None => {}
    }

    loop {
        interrupted.store(false, Ordering::Relaxed);

        let readline = rl.readline("You: ");
        let line = match readline {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => {
                println!();
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("\nGoodbye!");
                break;
            }
            Err(err) => {
                renderer.print_error(&format!("Input error: {}", err));
                break;
            }
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(cmd) = parse_command(line) {
            if !matches!(cmd, ChatCommand::Key(_)) {
                let _ = rl.add_history_entry(line);
            }
            match cmd {
                ChatCommand::Quit => {
                    println!("Goodbye!");
                    break;
                }
                ChatCommand::Clear => match session.reset() {
                    Ok(()) => {
                        renderer.print_info("Started a new session.");
                        print_entries_from(&session, 0, &mut renderer);
                    }
                    Err(err) => renderer.print_error(&err.to_string()),
                },
                ChatCommand::Personas => list_personas(&*directory, &mut renderer).await,
                ChatCommand::Persona(id) => {
                    if fixed {
                        renderer.print_error("This deployment uses a fixed client.");
                    } else {
                        select_persona(&session, &*directory, &id, &mut renderer).await;
                    }
                }
                ChatCommand::Key(key) => match session.set_credential(&key) {
                    Ok(()) => renderer.print_info("API key saved."),
                    Err(err) => renderer.print_error(err.message()),
                },
                ChatCommand::Logout => match session.clear_credential() {
                    Ok(()) => renderer.print_info("API key forgotten."),
                    Err(err) => renderer.print_error(&err.to_string()),
                },
                ChatCommand::Stats => print_stats(&session),
                ChatCommand::Status => renderer.print_status(
                    &session.participant_name(MessageRole::Assistant),
                    session.status(),
                ),
                ChatCommand::Help => {
                    for line in help_text().lines() {
                        println!("    {}", line);
                    }
                }
                ChatCommand::Invalid(message) => renderer.print_error(&message),
            }
            continue;
        }

        let _ = rl.add_history_entry(line);
        let length = line.chars().count();
        renderer.print_length_hint(LengthHint::for_text(line), length);

        let before = session.message_count();
        let outcome = session.submit(line).await;
        if interrupted.load(Ordering::Relaxed) {
            renderer.print_info("Requests cannot be cancelled; press Ctrl+C again to exit.");
        }
        match outcome {
            SubmitOutcome::Replied(_) => print_entries_from(&session, before + 1, &mut renderer),
            SubmitOutcome::Failed(classification) => {
                print_entries_from(&session, before + 1, &mut renderer);
                if let Recovery::ResetCredential { reprompt_after } = classification.recovery {
                    tokio::time::sleep(reprompt_after).await;
                    if !ensure_credential(&session, &mut rl, &mut renderer)? {
                        break;
                    }
                }
            }
            SubmitOutcome::Busy => renderer.print_info("Still waiting for the last reply."),
            SubmitOutcome::Empty => {}
            SubmitOutcome::NeedsCredential => {
                if !ensure_credential(&session, &mut rl, &mut renderer)? {
                    break;
                }
                renderer.print_info("Send your message again.");
            }
            SubmitOutcome::NeedsPersona => {
                list_personas(&*directory, &mut renderer).await;
                renderer.print_info("Choose a client with /persona <id> first.");
            }
        }
    }

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("CONFIDANT_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("confidant=warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Prompt until the session holds a credential.  Returns false on EOF.
fn ensure_credential(
    session: &Session,
    rl: &mut DefaultEditor,
    renderer: &mut dyn Renderer,
) -> Result<bool, ReadlineError> {
    while !session.has_credential() {
        renderer.print_info("Enter your API key (it starts with \"sk-ant-\").");
        let raw = match rl.readline("API key: ") {
            Ok(raw) => raw,
            Err(ReadlineError::Eof) | Err(ReadlineError::Interrupted) => return Ok(false),
            Err(err) => return Err(err),
        };
        match session.set_credential(&raw) {
            Ok(()) => renderer.print_info("API key saved."),
            Err(err) => renderer.print_error(err.message()),
        }
    }
    Ok(true)
}

async fn select_persona(
    session: &Session,
    directory: &dyn PersonaDirectory,
    id: &str,
    renderer: &mut dyn Renderer,
) {
    let profile = match directory.load(id).await {
        Ok(profile) => profile,
        Err(err) => {
            tracing::warn!(id, error = %err, "could not load persona");
            renderer.print_error("Failed to load selected client. Please try again.");
            return;
        }
    };
    let name = profile.display_name().to_string();
    match session.switch_persona(profile) {
        Ok(()) => {
            renderer.print_info(&format!("Chat with {name}"));
            print_entries_from(session, 0, renderer);
        }
        Err(err) => renderer.print_error(&err.to_string()),
    }
}

async fn list_personas(directory: &dyn PersonaDirectory, renderer: &mut dyn Renderer) {
    match directory.list().await {
        Ok(personas) if personas.is_empty() => renderer.print_info("No clients available."),
        Ok(personas) => {
            println!("    Available clients:");
            for persona in personas {
                println!("      {:<20} {}", persona.id, persona.describe());
                if !persona.background.is_empty() {
                    println!("      {:<20} {}", "", persona.background);
                }
            }
        }
        Err(err) => {
            tracing::warn!(error = %err, "could not list personas");
            renderer.print_error("Failed to load clients.");
        }
    }
}

fn print_entries_from(session: &Session, start: usize, renderer: &mut dyn Renderer) {
    for entry in session.transcript().iter().skip(start) {
        let speaker = session.participant_name(entry.role());
        renderer.print_entry(&speaker, entry);
    }
}

fn print_stats(session: &Session) {
    let stats = session.stats();
    println!("    Session Statistics:");
    println!("      Model: {}", stats.model);
    println!(
        "      Client: {}",
        stats.persona.as_deref().unwrap_or("(none)")
    );
    println!("      Status: {}", session.status());
    println!("      Messages: {}", stats.message_count);
    println!(
        "      Turns: {} replied / {} failed ({} requests)",
        stats.replies, stats.failures, stats.total_requests
    );
    println!(
        "      Total tokens: {} in / {} out",
        stats.total_usage.input_tokens, stats.total_usage.output_tokens
    );
    if let Some(usage) = stats.last_turn_usage {
        println!(
            "      Last turn tokens: {} in / {} out",
            usage.input_tokens, usage.output_tokens
        );
    }
}
