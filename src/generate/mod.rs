//! Answer generation
//!
//! This module provides:
//! - A trait for text generation backends
//! - `GenerationStream`, a bounded, ordered channel of answer fragments
//! - An HTTP chat-completion backend that streams server-sent events
//!
//! A stream that closes early (deadline, cancellation, dropped connection)
//! is a finished answer, not an error.

mod cancel;
mod http_backend;

pub use cancel::*;
pub use http_backend::*;

use crate::config::GenerationConfig;
use crate::error::Result;
use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::fmt;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::debug;

/// Chat message author
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// A single generation call
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Trait for generation providers
#[async_trait]
pub trait Generator: Send + Sync {
    /// Start generating; fragments arrive on the returned stream in order
    async fn generate(&self, request: GenerationRequest) -> Result<GenerationStream>;

    /// Get the model name
    fn model_name(&self) -> &str;
}

/// Create a generator based on configuration
pub fn create_generator(config: &GenerationConfig) -> Result<Box<dyn Generator>> {
    let generator = HttpGenerator::new(config)?;
    Ok(Box::new(generator))
}

/// Producer half of a [`GenerationStream`]
#[derive(Debug, Clone)]
pub struct FragmentSender {
    tx: mpsc::Sender<String>,
    cancel: CancellationToken,
}

impl FragmentSender {
    /// Deliver a fragment, waiting for channel capacity.
    ///
    /// Returns `false` once the consumer is gone or the stream was
    /// cancelled; the producer should stop then.
    pub async fn send(&self, fragment: String) -> bool {
        if self.cancel.is_cancelled() {
            return false;
        }
        tokio::select! {
            sent = self.tx.send(fragment) => sent.is_ok(),
            _ = self.cancel.cancelled() => false,
        }
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }
}

type FinishHook = Box<dyn FnOnce() + Send>;

/// Ordered stream of answer fragments over a bounded channel.
///
/// Dropping the stream cancels its producer.
pub struct GenerationStream {
    receiver: mpsc::Receiver<String>,
    cancel: CancellationToken,
    on_finish: Option<FinishHook>,
}

impl fmt::Debug for GenerationStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenerationStream")
            .field("cancel", &self.cancel)
            .field("on_finish", &self.on_finish.is_some())
            .finish()
    }
}

impl GenerationStream {
    /// Create a connected sender/stream pair with room for `capacity`
    /// undelivered fragments
    pub fn channel(capacity: usize) -> (FragmentSender, Self) {
        let (tx, receiver) = mpsc::channel(capacity.max(1));
        let cancel = CancellationToken::new();
        (
            FragmentSender {
                tx,
                cancel: cancel.clone(),
            },
            Self {
                receiver,
                cancel,
                on_finish: None,
            },
        )
    }

    /// A stream that yields the given fragments and then ends
    pub fn from_fragments<I>(fragments: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let fragments: Vec<String> = fragments.into_iter().map(Into::into).collect();
        let (sender, stream) = Self::channel(fragments.len());
        for fragment in fragments {
            // Capacity equals the fragment count, so this cannot fill up
            let _ = sender.tx.try_send(fragment);
        }
        stream
    }

    /// Run `hook` once, when the answer ends or the stream is dropped
    pub fn on_finish(mut self, hook: impl FnOnce() + Send + 'static) -> Self {
        self.on_finish = Some(Box::new(hook));
        self
    }

    fn finish(&mut self) {
        if let Some(hook) = self.on_finish.take() {
            hook();
        }
    }

    /// Receive the next fragment; `None` marks the end of the answer
    pub async fn next_fragment(&mut self) -> Option<String> {
        let fragment = self.receiver.recv().await;
        if fragment.is_none() {
            self.finish();
        }
        fragment
    }

    /// Stop the producer; fragments already buffered can still be read
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Drain the stream into a single string
    pub async fn collect_text(mut self) -> String {
        let mut text = String::new();
        while let Some(fragment) = self.next_fragment().await {
            text.push_str(&fragment);
        }
        text
    }
}

impl Stream for GenerationStream {
    type Item = String;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<String>> {
        let this = self.get_mut();
        let polled = this.receiver.poll_recv(cx);
        if let Poll::Ready(None) = polled {
            this.finish();
        }
        polled
    }
}

impl Drop for GenerationStream {
    fn drop(&mut self) {
        self.cancel.cancel();
        self.finish();
    }
}

/// Run `produce` on a background task feeding a new stream.
///
/// The producer is abandoned once the `deadline` instant passes or the
/// stream is cancelled; either way the consumer just sees the stream end.
pub fn spawn_producer<F, Fut>(capacity: usize, deadline: Instant, produce: F) -> GenerationStream
where
    F: FnOnce(FragmentSender) -> Fut,
    Fut: Future<Output = ()> + Send + 'static,
{
    let (sender, stream) = GenerationStream::channel(capacity);
    let cancel = sender.cancellation_token().clone();
    let producer = produce(sender);

    tokio::spawn(async move {
        tokio::select! {
            _ = producer => {}
            _ = tokio::time::sleep_until(deadline) => {
                debug!("Generation deadline reached, closing stream");
            }
            _ = cancel.cancelled() => {
                debug!("Generation cancelled, closing stream");
            }
        }
    });

    stream
}
