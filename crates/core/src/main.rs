use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;

use banter_core::broadcast::{InMemoryRegistry, RecipientRegistry, TargetFilter};
use banter_core::config::BanterCfg;
use banter_core::io::input::{self, InputSender};
use banter_core::io::output::OutputReceiver;
use banter_core::persona::PersonaConfig;
use banter_core::runtime::Runtime;
use banter_core::types::{ConversationId, InboundMessage};
use banter_llm::provider::LlmProvider;
use rustyline::error::ReadlineError;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("banter=warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cfg = Arc::new(BanterCfg::from_env());
    let persona = PersonaConfig::from_env();
    // An unbranded bot is a deployment mistake; refuse to start.
    persona.validate().map_err(|e| anyhow::anyhow!("refusing to start: {e}"))?;
    let bot_name = persona.bot_name.clone();

    let provider: Option<Arc<dyn LlmProvider>> =
        banter_llm::http::from_env().map(|p| Arc::new(p) as _);
    let startup_notice = provider.is_none().then(|| {
        "note: BANTER_LLM_MODEL / BANTER_LLM_API_KEY not set — serving canned fallback replies."
            .to_owned()
    });

    let registry: Arc<dyn RecipientRegistry> = Arc::new(InMemoryRegistry::new());
    let (mut runtime, event_tx, output_rx) = Runtime::new(cfg, persona, provider, registry);
    let token = runtime.token();

    let repl_token = token.clone();
    let runtime_fut = runtime.run();
    let repl_fut = run_repl(event_tx, output_rx, repl_token, bot_name, startup_notice);
    tokio::pin!(runtime_fut);
    tokio::pin!(repl_fut);

    tokio::select! {
        _ = &mut runtime_fut => {
            token.cancel();
            (&mut repl_fut).await
        }
        result = &mut repl_fut => {
            token.cancel();
            (&mut runtime_fut).await;
            result
        }
    }
}

async fn run_repl(
    event_tx: InputSender,
    mut output_rx: OutputReceiver,
    token: CancellationToken,
    bot_name: String,
    startup_notice: Option<String>,
) -> anyhow::Result<()> {
    const SPINNER: [&str; 4] = ["-", "\\", "|", "/"];

    if let Some(notice) = startup_notice {
        println!("{notice}");
    }
    println!("chatting with {bot_name} — /broadcast, /stats, /q to quit");

    let user = std::env::var("USER").unwrap_or_else(|_| "you".to_owned());
    let me = ConversationId::pair("repl", &user);

    let (line_tx, mut line_rx) = mpsc::unbounded_channel::<InputEvent>();
    let (ready_tx, ready_rx) = std::sync::mpsc::channel::<()>();
    spawn_input_thread(line_tx, ready_rx);
    request_next_prompt(&ready_tx);

    let mut waiting_for_reply = false;
    let mut spinner_idx: usize = 0;
    let mut spinner_interval = tokio::time::interval(Duration::from_millis(100));
    spinner_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = token.cancelled() => {
                break;
            }
            _ = spinner_interval.tick(), if waiting_for_reply => {
                spinner_idx = (spinner_idx + 1) % SPINNER.len();
                draw_thinking_frame(SPINNER[spinner_idx])?;
            }
            line = line_rx.recv() => {
                let Some(line) = line else { break };
                match line {
                    InputEvent::Line(line) => {
                        let text = line.trim();
                        if text.is_empty() {
                            request_next_prompt(&ready_tx);
                            continue;
                        }
                        if matches!(text, "/q" | "/exit" | "/quit") {
                            break;
                        }
                        let submitted = submit_line(&event_tx, text, &me).await;
                        match submitted {
                            Ok(true) => {
                                if !waiting_for_reply {
                                    spinner_idx = 0;
                                    draw_thinking_frame(SPINNER[spinner_idx])?;
                                    waiting_for_reply = true;
                                }
                            }
                            Ok(false) => request_next_prompt(&ready_tx),
                            Err(()) => break,
                        }
                    }
                    InputEvent::Interrupted => {
                        token.cancel();
                        break;
                    }
                    InputEvent::Eof => break,
                    InputEvent::Error(err) => {
                        eprintln!("input error: {err}");
                        break;
                    }
                }
            }
            reply = output_rx.recv() => {
                let Some(reply) = reply else { break };
                if waiting_for_reply {
                    waiting_for_reply = false;
                    clear_current_line()?;
                    println!("{bot_name}> {}", reply.text);
                    request_next_prompt(&ready_tx);
                } else {
                    // Late arrivals (e.g. extra broadcast deliveries)
                    println!("\r{bot_name}> {}", reply.text);
                }
            }
        }
    }
    drop(ready_tx);

    if waiting_for_reply {
        clear_current_line()?;
    }
    println!();
    Ok(())
}

/// Route a REPL line to the runtime. Returns Ok(true) when a reply is
/// expected, Ok(false) when the line was consumed locally.
async fn submit_line(
    event_tx: &InputSender,
    text: &str,
    me: &ConversationId,
) -> Result<bool, ()> {
    if let Some(rest) = text.strip_prefix("/broadcast") {
        let rest = rest.trim();
        let (filter, body) = match rest.split_once(' ').map(|(first, tail)| (TargetFilter::parse(first), tail)) {
            Some((Some(filter), tail)) => (filter, tail.trim()),
            _ => (TargetFilter::All, rest),
        };
        if body.is_empty() {
            println!("usage: /broadcast [all|users|groups] <message>");
            return Ok(false);
        }
        return input::submit_broadcast(event_tx, body, filter, me.clone())
            .await
            .map(|_| true)
            .map_err(|_| ());
    }
    if text == "/stats" {
        return input::submit_stats(event_tx, me.clone()).await.map(|_| true).map_err(|_| ());
    }

    let msg = InboundMessage::private(me.clone(), Some(display_name(me)), text);
    input::submit_message(event_tx, msg).await.map(|_| true).map_err(|_| ())
}

/// "repl:ana" → "ana"
fn display_name(id: &ConversationId) -> String {
    id.as_str().split_once(':').map(|(_, name)| name).unwrap_or(id.as_str()).to_owned()
}

fn draw_thinking_frame(frame: &str) -> anyhow::Result<()> {
    print!("\rthinking... {frame}");
    io::stdout().flush()?;
    Ok(())
}

fn clear_current_line() -> anyhow::Result<()> {
    print!("\r\x1b[2K");
    io::stdout().flush()?;
    Ok(())
}

fn request_next_prompt(ready_tx: &std::sync::mpsc::Sender<()>) {
    let _ = ready_tx.send(());
}

fn spawn_input_thread(
    line_tx: mpsc::UnboundedSender<InputEvent>,
    ready_rx: std::sync::mpsc::Receiver<()>,
) {
    std::thread::spawn(move || {
        let mut editor = match rustyline::DefaultEditor::new() {
            Ok(editor) => editor,
            Err(e) => {
                let _ = line_tx.send(InputEvent::Error(e.to_string()));
                return;
            }
        };

        while ready_rx.recv().is_ok() {
            match editor.readline("You> ") {
                Ok(line) => {
                    if line_tx.send(InputEvent::Line(line)).is_err() {
                        break;
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    let _ = line_tx.send(InputEvent::Interrupted);
                    break;
                }
                Err(ReadlineError::Eof) => {
                    let _ = line_tx.send(InputEvent::Eof);
                    break;
                }
                Err(e) => {
                    let _ = line_tx.send(InputEvent::Error(e.to_string()));
                    break;
                }
            }
        }
    });
}

enum InputEvent {
    Line(String),
    Interrupted,
    Eof,
    Error(String),
}
