//! Minimal IRC client: line framing, registration, PING/PONG and the handful
//! of events the bot reacts to.

pub mod client;
pub mod codec;
pub mod error;
pub mod event;
pub mod message;
pub mod sender;
pub mod split;

pub use client::{IrcClient, IrcHandle};
pub use error::IrcError;
pub use event::IrcEvent;
pub use message::Message;
pub use sender::IrcSender;
