//! Nickname lifecycle: collision fallback, registration, renames and reclaim.

use tracing::{error, info, warn};

use chadgpt_core::config::IrcConfig;
use chadgpt_irc::IrcSender;

use crate::session::{Phase, Session};

/// Appended to a rejected nickname.
pub const COLLISION_SUFFIX: char = '_';

pub struct IdentityManager {
    preferred: String,
    keep_nick: bool,
    channels: Vec<String>,
    retry_limit: Option<u32>,
    collisions: u32,
}

impl IdentityManager {
    pub fn new(config: &IrcConfig) -> Self {
        Self {
            preferred: config.nick.clone(),
            keep_nick: config.keep_nick,
            channels: config.channels.clone(),
            retry_limit: config.nick_retry_limit,
            collisions: 0,
        }
    }

    /// The server rejected `nick`; ask for `nick_` instead.
    ///
    /// Only collisions during registration count toward the retry limit. A
    /// rejected reclaim after registration leaves the current nick in place.
    pub fn on_nick_in_use(&mut self, nick: &str, session: &Session, irc: &dyn IrcSender) {
        if session.phase() == Phase::Connecting {
            self.collisions += 1;
            if let Some(limit) = self.retry_limit {
                if self.collisions > limit {
                    error!(nick, limit, "nickname still in use after retry limit; giving up");
                    return;
                }
            }
        }

        let fallback = format!("{nick}{COLLISION_SUFFIX}");
        info!(nick, fallback = %fallback, "nickname is already in use; switching");
        irc.change_nick(&fallback);
    }

    pub fn on_registered(&mut self, nick: &str, session: &mut Session, irc: &dyn IrcSender) {
        info!(nick, "connected and registered");
        self.confirm(nick, session);

        for channel in &self.channels {
            info!(channel = %channel, "joining channel");
            irc.join(channel);
        }
    }

    pub fn on_nick_changed(
        &mut self,
        nick: &str,
        new_nick: &str,
        session: &mut Session,
        irc: &dyn IrcSender,
    ) {
        if session.is_self(nick) {
            info!(new_nick, "changed own nickname");
            self.confirm(new_nick, session);
            return;
        }

        info!(nick, new_nick, "participant changed nickname");
        if self.should_reclaim(nick, session) {
            info!(nick, new_nick, "preferred nickname released by rename; reclaiming");
            irc.change_nick(&self.preferred);
        }
    }

    pub fn on_participant_quit(&mut self, nick: &str, session: &Session, irc: &dyn IrcSender) {
        if self.should_reclaim(nick, session) {
            info!(nick, "holder of preferred nickname quit; reclaiming");
            irc.change_nick(&self.preferred);
        }
    }

    fn should_reclaim(&self, departed: &str, session: &Session) -> bool {
        self.keep_nick && departed == self.preferred && !session.is_self(&self.preferred)
    }

    fn confirm(&mut self, nick: &str, session: &mut Session) {
        self.collisions = 0;
        if let Err(e) = session.confirm(nick) {
            warn!(nick, error = %e, "cannot build highlight pattern; ignoring addressed lines");
        }
    }
}
