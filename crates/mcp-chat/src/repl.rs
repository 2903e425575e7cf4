//! Interactive Loop
//!
//! `awaiting-input → processing → printing → awaiting-input` until the user
//! types `quit`, input ends, or the interrupt fires. Queries are answered one
//! at a time in the order they were typed.

use std::future::Future;
use std::io::BufRead;

use agent_core::{
    conversation::Conversation,
    error::Result,
    reasoning::Agent,
    tool::CapabilityRegistry,
};
use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncWrite, AsyncWriteExt, Lines};
use tokio::sync::mpsc;

const QUIT: &str = "quit";

/// Where typed lines come from; `None` once input is exhausted
#[async_trait]
pub trait LineSource: Send {
    async fn next_line(&mut self) -> std::io::Result<Option<String>>;
}

#[async_trait]
impl<R: AsyncBufRead + Unpin + Send> LineSource for Lines<R> {
    async fn next_line(&mut self) -> std::io::Result<Option<String>> {
        Lines::next_line(self).await
    }
}

#[async_trait]
impl LineSource for mpsc::Receiver<std::io::Result<String>> {
    async fn next_line(&mut self) -> std::io::Result<Option<String>> {
        self.recv().await.transpose()
    }
}

/// Stdin lines read on a detached OS thread.
///
/// Tokio's stdin read cannot be cancelled and would hold the runtime open
/// after an interrupt until another line is typed.
pub fn stdin_lines() -> mpsc::Receiver<std::io::Result<String>> {
    let (tx, rx) = mpsc::channel(1);
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            if tx.blocking_send(line).is_err() {
                break;
            }
        }
    });
    rx
}

/// Anything that can answer one query at a time
#[async_trait]
pub trait Responder: Send {
    async fn respond(&mut self, query: &str) -> Result<String>;
}

/// Answers through an agent, holding the history a session-scoped agent threads
pub struct AgentResponder<'a, R: CapabilityRegistry> {
    agent: &'a Agent<R>,
    history: Conversation,
}

impl<'a, R: CapabilityRegistry> AgentResponder<'a, R> {
    pub fn new(agent: &'a Agent<R>) -> Self {
        Self {
            agent,
            history: Conversation::new(),
        }
    }
}

#[async_trait]
impl<R: CapabilityRegistry> Responder for AgentResponder<'_, R> {
    async fn respond(&mut self, query: &str) -> Result<String> {
        self.agent.respond(&mut self.history, query).await
    }
}

fn is_quit(line: &str) -> bool {
    line.trim().eq_ignore_ascii_case(QUIT)
}

/// Run the prompt loop until `quit`, end of input, or `interrupt` resolves.
///
/// The interrupt is honoured both while waiting for input and while a query
/// is in flight; the in-flight query is abandoned. A failed query is reported
/// and the loop continues, unless `continue_on_error` is off, in which case
/// the error ends the loop.
pub async fn run<Q, L, O, F>(
    responder: &mut Q,
    continue_on_error: bool,
    mut input: L,
    mut output: O,
    interrupt: F,
) -> anyhow::Result<()>
where
    Q: Responder + ?Sized,
    L: LineSource,
    O: AsyncWrite + Unpin,
    F: Future<Output = ()>,
{
    tokio::pin!(interrupt);

    output
        .write_all(b"\nMCP Client Started!\nType your queries or 'quit' to exit.\n")
        .await?;

    loop {
        output.write_all(b"\nQuery: ").await?;
        output.flush().await?;

        let line = tokio::select! {
            line = input.next_line() => line?,
            () = &mut interrupt => {
                tracing::info!("Interrupted while waiting for input");
                break;
            }
        };

        let Some(line) = line else {
            tracing::debug!("Input closed");
            break;
        };

        if is_quit(&line) {
            break;
        }

        let outcome = tokio::select! {
            outcome = responder.respond(&line) => outcome,
            () = &mut interrupt => {
                tracing::info!("Interrupted while answering a query");
                break;
            }
        };

        match outcome {
            Ok(answer) => {
                output.write_all(format!("\n{answer}\n").as_bytes()).await?;
            }
            Err(e) => {
                tracing::error!(error = %e, "Query failed");
                output
                    .write_all(format!("\nError: {}\n", e.user_message()).as_bytes())
                    .await?;

                if !continue_on_error {
                    output.flush().await?;
                    return Err(e.into());
                }
            }
        }
    }

    output.flush().await?;
    Ok(())
}
