//! The single ordered event loop.
//!
//! Protocol events and completion outcomes share one stream and are handled
//! one at a time in arrival order. Handling a channel message never waits on
//! the backend; it only spawns the completion task.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use chadgpt_agent::{LlmProvider, PromptBuilder, PromptVars, SamplingParams};
use chadgpt_core::ChadConfig;
use chadgpt_irc::event::is_channel_name;
use chadgpt_irc::{IrcEvent, IrcSender};

use crate::error::BotError;
use crate::format::ResponseFormatter;
use crate::gateway::{CompletionGateway, CompletionOutcome};
use crate::identity::IdentityManager;
use crate::ignore::IgnoreFilter;
use crate::report;
use crate::session::Session;

#[derive(Debug)]
pub enum DispatchEvent {
    Irc(IrcEvent),
    Completed(CompletionOutcome),
}

pub struct Dispatcher {
    session: Session,
    identity: IdentityManager,
    ignore: IgnoreFilter,
    prompts: PromptBuilder,
    gateway: CompletionGateway,
    formatter: ResponseFormatter,
    irc: Arc<dyn IrcSender>,
    events_tx: mpsc::UnboundedSender<DispatchEvent>,
    events_rx: mpsc::UnboundedReceiver<DispatchEvent>,
}

impl Dispatcher {
    pub fn new(
        config: &ChadConfig,
        provider: Arc<dyn LlmProvider>,
        irc: Arc<dyn IrcSender>,
    ) -> Result<Self, BotError> {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let gateway = CompletionGateway::new(
            provider,
            config.completion.model.clone(),
            SamplingParams::from(&config.completion),
            events_tx.clone(),
        );

        Ok(Self {
            session: Session::new(),
            identity: IdentityManager::new(&config.irc),
            ignore: IgnoreFilter::new(&config.irc.ignored_nicks)?,
            prompts: PromptBuilder::new(&config.completion.messages)?,
            gateway,
            formatter: ResponseFormatter::new(config.reply.max_lines),
            irc,
            events_tx,
            events_rx,
        })
    }

    /// Sender for feeding events into the loop.
    pub fn handle(&self) -> mpsc::UnboundedSender<DispatchEvent> {
        self.events_tx.clone()
    }

    /// Process events until the protocol connection ends.
    pub async fn run(mut self) -> Result<(), BotError> {
        while let Some(event) = self.events_rx.recv().await {
            if let Some(reason) = self.handle_event(event) {
                return Err(BotError::Disconnected(reason));
            }
        }
        Ok(())
    }

    /// Handle one event. Returns the disconnect reason when the connection ended.
    pub fn handle_event(&mut self, event: DispatchEvent) -> Option<String> {
        match event {
            DispatchEvent::Irc(event) => return self.handle_irc(event),
            DispatchEvent::Completed(outcome) => self.handle_completion(outcome),
        }
        None
    }

    fn handle_irc(&mut self, event: IrcEvent) -> Option<String> {
        let irc = self.irc.as_ref();
        match event {
            IrcEvent::Registered { nick } => {
                self.identity.on_registered(&nick, &mut self.session, irc)
            }
            IrcEvent::NickInUse { nick } => {
                self.identity.on_nick_in_use(&nick, &self.session, irc)
            }
            IrcEvent::NickChanged { nick, new_nick } => {
                self.identity
                    .on_nick_changed(&nick, &new_nick, &mut self.session, irc)
            }
            IrcEvent::ParticipantQuit { nick } => {
                self.identity.on_participant_quit(&nick, &self.session, irc)
            }
            IrcEvent::ChannelMessage {
                nick,
                target,
                message,
            } => self.handle_channel_message(nick, target, message),
            IrcEvent::Disconnected { reason } => return Some(reason),
        }
        None
    }

    fn handle_channel_message(&mut self, nick: String, target: String, message: String) {
        debug!(nick = %nick, target = %target, message = %message, "message");

        if self.ignore.is_ignored(&nick) {
            debug!(nick = %nick, "ignoring message from ignored nick");
            return;
        }

        let Some(payload) = self.session.addressed_payload(&message) else {
            return;
        };

        let vars = PromptVars {
            nick: nick.clone(),
            channel: target.clone(),
            message: payload.to_string(),
            raw_message: message.clone(),
            now: Utc::now(),
        };
        let messages = self.prompts.render(&vars);

        // Private messages are answered to the sender.
        let reply_target = if is_channel_name(&target) {
            target
        } else {
            nick.clone()
        };

        info!(nick = %nick, target = %reply_target, "requesting completion");
        self.gateway.complete(nick, reply_target, messages);
    }

    fn handle_completion(&mut self, outcome: CompletionOutcome) {
        let CompletionOutcome {
            sender_nick,
            reply_target,
            result,
        } = outcome;

        match result {
            Ok(response) => {
                let lines = self.formatter.format(&sender_nick, &response);
                if lines.is_empty() {
                    debug!(
                        nick = %sender_nick,
                        blocks = response.blocks.len(),
                        "completion returned no content; nothing to send"
                    );
                    return;
                }
                for line in &lines {
                    self.irc.say(&reply_target, line);
                }
            }
            Err(e) => {
                let backend = self.gateway.backend_name();
                warn!(nick = %sender_nick, target = %reply_target, backend, error = %e, "completion failed");
                self.irc
                    .say(&reply_target, &report::error_notice(&sender_nick, backend, &e));
            }
        }
    }
}

/// Pump protocol events into the dispatcher until either side closes.
pub async fn forward_irc_events(
    mut irc_events: mpsc::UnboundedReceiver<IrcEvent>,
    dispatch: mpsc::UnboundedSender<DispatchEvent>,
) {
    while let Some(event) = irc_events.recv().await {
        if dispatch.send(DispatchEvent::Irc(event)).is_err() {
            break;
        }
    }
}
