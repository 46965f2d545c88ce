//! Message dispatch and reply shaping for the chadgpt IRC bot.

pub mod dispatcher;
pub mod error;
pub mod format;
pub mod gateway;
pub mod identity;
pub mod ignore;
pub mod report;
pub mod session;

pub use dispatcher::{forward_irc_events, DispatchEvent, Dispatcher};
pub use error::BotError;
pub use format::ResponseFormatter;
pub use gateway::{CompletionGateway, CompletionOutcome};
pub use identity::IdentityManager;
pub use ignore::IgnoreFilter;
pub use session::{Phase, Session};
