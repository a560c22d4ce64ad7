//! Line-based transport on stdin/stdout. Every line belongs to one
//! configured owner.

use std::{io::BufRead, sync::Arc, thread};

use anyhow::{Context, Result};
use async_trait::async_trait;
use log::{debug, info, warn};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, Mutex};

use crate::{
    db::OwnerId,
    intake::{Command, Inbound, IntakeController, Reply},
};

use super::MessageSink;

const PICK_COMMAND: &str = "/pick";
const INPUT_BUFFER: usize = 32;

/// Reads stdin on its own OS thread. The thread is never joined, so a
/// pending read cannot hold up runtime shutdown. The channel closes on EOF
/// or a read error.
pub fn spawn_stdin_reader() -> Result<mpsc::Receiver<String>> {
    let (tx, rx) = mpsc::channel(INPUT_BUFFER);

    thread::Builder::new()
        .name("flatwatch-stdin".into())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let line = match line {
                    Ok(line) => line,
                    Err(err) => {
                        warn!("failed to read stdin: {err}");
                        break;
                    }
                };
                if tx.blocking_send(line).is_err() {
                    break;
                }
            }
        })
        .context("failed to spawn stdin reader thread")?;

    Ok(rx)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleLine {
    Blank,
    Message(Inbound),
    Unknown(String),
}

pub fn classify_line(line: &str) -> ConsoleLine {
    let line = line.trim();
    if line.is_empty() {
        return ConsoleLine::Blank;
    }

    if let Some(rest) = line.strip_prefix(PICK_COMMAND) {
        if rest.is_empty() || rest.starts_with(char::is_whitespace) {
            return ConsoleLine::Message(Inbound::Selection(rest.trim().to_string()));
        }
    }

    if line.starts_with('/') {
        return match Command::parse(line) {
            Some(command) => ConsoleLine::Message(Inbound::Command(command)),
            None => ConsoleLine::Unknown(line.to_string()),
        };
    }

    ConsoleLine::Message(Inbound::Text(line.to_string()))
}

pub fn render(reply: &Reply) -> String {
    match reply {
        Reply::Text(text) => text.clone(),
        Reply::Choices { prompt, options } => {
            let mut out = prompt.clone();
            for option in options {
                out.push_str(&format!("\n  [{}] {}", option.token, option.label));
            }
            out.push_str(&format!("\n(answer with {PICK_COMMAND} <token>)"));
            out
        }
    }
}

/// Writes rendered replies to any async writer, stdout by default.
pub struct ConsoleSink<W> {
    out: Mutex<W>,
}

impl ConsoleSink<tokio::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(tokio::io::stdout())
    }
}

impl<W> ConsoleSink<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner()
    }
}

#[async_trait]
impl<W> MessageSink for ConsoleSink<W>
where
    W: AsyncWrite + Unpin + Send,
{
    async fn send(&self, owner_id: OwnerId, reply: Reply) -> Result<()> {
        let text = format!("[{owner_id}] {}\n", render(&reply));
        let mut out = self.out.lock().await;
        out.write_all(text.as_bytes())
            .await
            .context("failed to write reply")?;
        out.flush().await.context("failed to flush reply")?;
        Ok(())
    }
}

pub struct ConsoleTransport {
    owner_id: OwnerId,
    controller: Arc<IntakeController>,
    sink: Arc<dyn MessageSink>,
}

impl ConsoleTransport {
    pub fn new(
        owner_id: OwnerId,
        controller: Arc<IntakeController>,
        sink: Arc<dyn MessageSink>,
    ) -> Self {
        Self {
            owner_id,
            controller,
            sink,
        }
    }

    /// Feeds lines into the intake controller until the input channel
    /// closes.
    pub async fn serve(&self, mut lines: mpsc::Receiver<String>) -> Result<()> {
        info!("console transport ready for owner {}", self.owner_id);

        while let Some(line) = lines.recv().await {
            let reply = match classify_line(&line) {
                ConsoleLine::Blank => continue,
                ConsoleLine::Unknown(command) => {
                    debug!("unknown console command {command}");
                    Reply::text("Unknown command, try /help")
                }
                ConsoleLine::Message(inbound) => self.controller.handle(self.owner_id, inbound).await,
            };
            self.sink.send(self.owner_id, reply).await?;
        }

        info!("console input closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::{
        db::{test_support::temp_database, Location},
        intake::{ChoiceOption, SessionStore},
        rate_guard::RateGuard,
        source::fake::FakeSource,
        transport::recording::RecordingSink,
    };

    #[test]
    fn test_classify_line() {
        assert_eq!(classify_line("   "), ConsoleLine::Blank);
        assert_eq!(
            classify_line("/pick 42"),
            ConsoleLine::Message(Inbound::Selection("42".into()))
        );
        assert_eq!(
            classify_line("/list"),
            ConsoleLine::Message(Inbound::Command(Command::List))
        );
        assert_eq!(
            classify_line("only 500€"),
            ConsoleLine::Message(Inbound::Text("only 500€".into()))
        );
        assert_eq!(classify_line("/pickle"), ConsoleLine::Unknown("/pickle".into()));
        assert_eq!(classify_line("/nope"), ConsoleLine::Unknown("/nope".into()));
    }

    #[test]
    fn test_render_choices() {
        let reply = Reply::Choices {
            prompt: "Please choose:".into(),
            options: vec![
                ChoiceOption {
                    label: "Berlin".into(),
                    token: "b".into(),
                },
                ChoiceOption {
                    label: "Bern".into(),
                    token: "c".into(),
                },
            ],
        };
        assert_eq!(
            render(&reply),
            "Please choose:\n  [b] Berlin\n  [c] Bern\n(answer with /pick <token>)"
        );
    }

    #[tokio::test]
    async fn test_console_sink_writes_lines() {
        let sink = ConsoleSink::new(Vec::new());
        sink.send(3, Reply::text("hello")).await.unwrap();
        let written = String::from_utf8(sink.into_inner()).unwrap();
        assert_eq!(written, "[3] hello\n");
    }

    #[tokio::test]
    async fn test_serve_returns_once_input_closes() {
        let (_dir, db) = temp_database();
        let controller = IntakeController::new(
            db,
            Arc::new(FakeSource::new()),
            SessionStore::new(),
            Arc::new(RateGuard::new(Duration::ZERO)),
        )
        .unwrap();
        let sink = Arc::new(RecordingSink::default());
        let transport = ConsoleTransport::new(1, Arc::new(controller), sink.clone());

        let (tx, rx) = mpsc::channel::<String>(1);
        drop(tx);
        tokio::time::timeout(Duration::from_secs(5), transport.serve(rx))
            .await
            .unwrap()
            .unwrap();
        assert!(sink.sent().is_empty());
    }

    #[tokio::test]
    async fn test_serve_runs_a_whole_conversation() {
        let (_dir, db) = temp_database();
        let source = FakeSource::new().with_locations(
            "Berlin",
            vec![
                Location::new("Berlin", "b1"),
                Location::new("Berlin-Mitte", "b2"),
            ],
        );
        let controller = IntakeController::new(
            db.clone(),
            Arc::new(source),
            SessionStore::new(),
            Arc::new(RateGuard::new(Duration::ZERO)),
        )
        .unwrap();
        let sink = Arc::new(RecordingSink::default());
        let transport = ConsoleTransport::new(9, Arc::new(controller), sink.clone());

        let (tx, rx) = mpsc::channel(8);
        for line in ["/add Berlin", "/pick b2", "", "3 rooms", "/teleport", "/done"] {
            tx.send(line.to_string()).await.unwrap();
        }
        drop(tx);
        transport.serve(rx).await.unwrap();

        let sent = sink.sent();
        assert_eq!(sent.len(), 5);
        assert!(sent.iter().all(|(owner, _)| *owner == 9));
        assert!(matches!(sent[0].1, Reply::Choices { .. }));
        assert_eq!(sent[3].1, Reply::text("Unknown command, try /help"));

        let stored = db.list_watches_for_owner(9).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].location, Location::new("Berlin-Mitte", "b2"));
        assert_eq!(stored[0].filters.rooms, Some(3));
    }
}
