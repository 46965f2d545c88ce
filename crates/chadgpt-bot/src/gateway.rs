//! Asynchronous completion requests.
//!
//! Every addressed message gets its own task. The task posts its outcome back
//! onto the dispatcher's event stream, so replies are delivered by the same
//! loop that handles protocol events, in whatever order backends finish.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use chadgpt_agent::{ChatRequest, ChatResponse, LlmProvider, Message, ProviderError, SamplingParams};

use crate::dispatcher::DispatchEvent;

/// Result of one completion, tagged with where the reply belongs.
///
/// Sender and target are captured when the message is dispatched, never
/// re-read later.
#[derive(Debug)]
pub struct CompletionOutcome {
    pub sender_nick: String,
    pub reply_target: String,
    pub result: Result<ChatResponse, ProviderError>,
}

pub struct CompletionGateway {
    provider: Arc<dyn LlmProvider>,
    model: String,
    sampling: SamplingParams,
    outcomes: mpsc::UnboundedSender<DispatchEvent>,
}

impl CompletionGateway {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        model: String,
        sampling: SamplingParams,
        outcomes: mpsc::UnboundedSender<DispatchEvent>,
    ) -> Self {
        Self {
            provider,
            model,
            sampling,
            outcomes,
        }
    }

    /// Name used in channel error notices.
    pub fn backend_name(&self) -> &str {
        self.provider.display_name()
    }

    /// Start a completion without waiting for it.
    ///
    /// No deduplication, concurrency cap, timeout or retry is applied.
    pub fn complete(
        &self,
        sender_nick: String,
        reply_target: String,
        messages: Vec<Message>,
    ) -> JoinHandle<()> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages,
            sampling: self.sampling.clone(),
        };
        let provider = Arc::clone(&self.provider);
        let outcomes = self.outcomes.clone();

        tokio::spawn(async move {
            let result = provider.send(&request).await;
            debug!(
                sender = %sender_nick,
                target = %reply_target,
                ok = result.is_ok(),
                "completion finished"
            );
            let outcome = CompletionOutcome {
                sender_nick,
                reply_target,
                result,
            };
            if outcomes.send(DispatchEvent::Completed(outcome)).is_err() {
                debug!("dispatcher stopped; dropping completion");
            }
        })
    }
}
