//! Line-oriented terminal front end for the chat client.
//!
//! Plain lines are sent as messages. Slash commands manage conversations,
//! the account and the theme. Output is driven by subscribers of the
//! session and notification stores, not by the command loop.

use std::process::ExitCode;

use anyhow::{Context, bail};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::watch;

use crate::api::{ConversationId, Role, UserCreate, UserLogin};
use crate::chat::{ChatClient, DeleteOutcome, SendOutcome};
use crate::config::ClientConfig;
use crate::notifications::{Notification, NotificationId, Severity};
use crate::session::SessionState;

const HELP: &str = "\
commands:
  /new                         start a new conversation
  /list                        reload and show conversations
  /open <id>                   open a conversation
  /delete <id>                 delete a conversation
  /login <email> <password>    sign in
  /register <email> <password> <full name>
  /logout                      sign out
  /theme                       toggle light/dark
  /help                        show this text
  /quit                        exit
anything else is sent as a message";

/// Run the terminal client until `/quit` or end of input.
///
/// # Returns
/// `ExitCode::SUCCESS` on a clean exit, `1` on failure.
#[must_use]
pub fn run() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("Starting traffic chat v{}", env!("CARGO_PKG_VERSION"));

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!("Failed to create runtime: {e}");
            return ExitCode::from(1);
        }
    };

    if let Err(e) = rt.block_on(start()) {
        tracing::error!("Chat client error: {e:#}");
        return ExitCode::from(1);
    }

    ExitCode::SUCCESS
}

async fn start() -> anyhow::Result<()> {
    let config = ClientConfig::from_env().context("invalid configuration")?;
    let client = ChatClient::from_config(&config).context("failed to build chat client")?;
    tracing::info!(base_url = %config.base_url, "Using chat service");

    let renderers = [
        tokio::spawn(render_session(client.session().subscribe())),
        tokio::spawn(render_notifications(client.notifications().subscribe())),
    ];

    if client.restore().await {
        say("session restored; /list to show conversations").await?;
    } else {
        say("not signed in; /login <email> <password> or /register").await?;
    }

    let result = repl(&client).await;
    for renderer in &renderers {
        renderer.abort();
    }
    result
}

async fn repl(client: &ChatClient) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("failed to read stdin")? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match Command::parse(line) {
            Ok(Command::Quit) => break,
            Ok(command) => command.execute(client).await?,
            Err(e) => say(&format!("error: {e}")).await?,
        }
    }
    Ok(())
}

/// One parsed input line.
#[derive(Debug, PartialEq, Eq)]
enum Command {
    Send(String),
    New,
    List,
    Open(ConversationId),
    Delete(ConversationId),
    Login(UserLoginInput),
    Register(UserLoginInput, String),
    Logout,
    Theme,
    Help,
    Quit,
}

#[derive(Debug, PartialEq, Eq)]
struct UserLoginInput {
    email: String,
    password: String,
}

impl Command {
    fn parse(line: &str) -> anyhow::Result<Self> {
        let Some(rest) = line.strip_prefix('/') else {
            return Ok(Self::Send(line.to_string()));
        };
        let mut parts = rest.split_whitespace();
        let name = parts.next().unwrap_or_default();
        let command = match name {
            "new" => Self::New,
            "list" => Self::List,
            "open" => Self::Open(ConversationId::new(required(parts.next(), "open <id>")?)),
            "delete" => Self::Delete(ConversationId::new(required(parts.next(), "delete <id>")?)),
            "login" => Self::Login(UserLoginInput {
                email: required(parts.next(), "login <email> <password>")?.to_string(),
                password: required(parts.next(), "login <email> <password>")?.to_string(),
            }),
            "register" => {
                let usage = "register <email> <password> <full name>";
                let input = UserLoginInput {
                    email: required(parts.next(), usage)?.to_string(),
                    password: required(parts.next(), usage)?.to_string(),
                };
                let full_name = parts.collect::<Vec<_>>().join(" ");
                if full_name.is_empty() {
                    bail!("usage: /{usage}");
                }
                Self::Register(input, full_name)
            }
            "logout" => Self::Logout,
            "theme" => Self::Theme,
            "help" => Self::Help,
            "quit" | "exit" => Self::Quit,
            other => bail!("unknown command /{other}; /help lists commands"),
        };
        Ok(command)
    }

    async fn execute(self, client: &ChatClient) -> anyhow::Result<()> {
        match self {
            Self::Send(text) => match client.send_message(&text).await {
                SendOutcome::Busy => say("still waiting for the previous answer").await?,
                SendOutcome::TooLong { max, got } => {
                    say(&format!("message too long ({got}/{max} characters)")).await?;
                }
                SendOutcome::Delivered(_) | SendOutcome::Failed(_) | SendOutcome::Empty => {}
            },
            Self::New => {
                client.start_new_conversation();
                say("new conversation; type your question").await?;
            }
            Self::List => {
                client.load_conversations().await;
                say(&format_conversations(&client.session().snapshot())).await?;
            }
            Self::Open(id) => {
                client.select_conversation(&id).await;
            }
            Self::Delete(id) => {
                if client.delete_conversation(&id).await == DeleteOutcome::Deleted {
                    say(&format_conversations(&client.session().snapshot())).await?;
                }
            }
            Self::Login(UserLoginInput { email, password }) => {
                client.login(&UserLogin { email, password }).await;
            }
            Self::Register(UserLoginInput { email, password }, full_name) => {
                let user = UserCreate {
                    email,
                    full_name,
                    password,
                };
                client.register(&user).await;
            }
            Self::Logout => client.logout().await,
            Self::Theme => {
                let theme = client.preferences().toggle_theme();
                say(&format!("theme: {theme}")).await?;
            }
            Self::Help => say(HELP).await?,
            Self::Quit => {}
        }
        Ok(())
    }
}

fn required<'a>(part: Option<&'a str>, usage: &str) -> anyhow::Result<&'a str> {
    match part {
        Some(part) => Ok(part),
        None => bail!("usage: /{usage}"),
    }
}

fn format_conversations(state: &SessionState) -> String {
    if state.conversations.is_empty() {
        return "no conversations".to_string();
    }
    let active = state.current_id();
    state
        .conversations
        .iter()
        .map(|c| {
            let marker = if Some(&c.id) == active { '*' } else { ' ' };
            format!(
                "{marker} {}  {}  ({} messages, {})",
                c.id,
                c.title,
                c.message_count,
                c.updated_at.format("%Y-%m-%d %H:%M")
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Print messages and error banners as the session changes.
async fn render_session(mut rx: watch::Receiver<SessionState>) {
    let mut shown_conversation: Option<ConversationId> = None;
    let mut shown_messages = 0usize;
    let mut shown_error: Option<String> = None;

    while rx.changed().await.is_ok() {
        let state = rx.borrow_and_update().clone();
        let mut out = Vec::new();

        let current = state.current_id().cloned();
        if current != shown_conversation {
            if let Some(conversation) = &state.current {
                if !conversation.id().is_empty() {
                    out.push(format!("== {} ({}) ==", conversation.conversation.title, conversation.id()));
                }
            }
            // A draft promoted to its server id keeps the lines already printed.
            let promoted = shown_conversation.as_ref().is_some_and(ConversationId::is_empty);
            if !promoted {
                shown_messages = 0;
            }
            shown_conversation = current;
        }

        if let Some(conversation) = &state.current {
            for message in conversation.messages.iter().skip(shown_messages) {
                let who = match message.role {
                    Role::User => "you",
                    Role::Assistant => "assistant",
                };
                out.push(format!("[{who}] {}", message.content));
            }
            shown_messages = conversation.messages.len();
        } else {
            shown_messages = 0;
        }

        if state.is_typing {
            out.push("... thinking".to_string());
        }
        if state.error != shown_error {
            if let Some(error) = &state.error {
                out.push(format!("! {error}"));
            }
            shown_error = state.error.clone();
        }

        if !out.is_empty() && say(&out.join("\n")).await.is_err() {
            break;
        }
    }
}

/// Print each notice once, when it first appears.
async fn render_notifications(mut rx: watch::Receiver<Vec<Notification>>) {
    let mut last_seen = NotificationId(0);
    while rx.changed().await.is_ok() {
        let fresh: Vec<Notification> = rx
            .borrow_and_update()
            .iter()
            .filter(|n| n.id > last_seen)
            .cloned()
            .collect();
        for notice in fresh {
            last_seen = notice.id;
            let tag = match notice.severity {
                Severity::Success => "ok",
                Severity::Error => "error",
                Severity::Warning => "warning",
                Severity::Info => "info",
            };
            if say(&format!("({tag}) {}", notice.message)).await.is_err() {
                return;
            }
        }
    }
}

async fn say(text: &str) -> std::io::Result<()> {
    let mut stdout = tokio::io::stdout();
    stdout.write_all(format!("{text}\n").as_bytes()).await?;
    stdout.flush().await
}
