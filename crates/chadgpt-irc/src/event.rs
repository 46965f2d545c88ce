use crate::message::Message;

/// Protocol events the bot reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IrcEvent {
    /// RPL_WELCOME: registration confirmed under `nick`.
    Registered { nick: String },
    /// ERR_NICKNAMEINUSE for the nickname we tried.
    NickInUse { nick: String },
    /// Someone (possibly us) changed nickname from `nick` to `new_nick`.
    NickChanged { nick: String, new_nick: String },
    /// A PRIVMSG addressed to a channel or to us.
    ChannelMessage {
        nick: String,
        target: String,
        message: String,
    },
    ParticipantQuit { nick: String },
    /// The connection ended; no further events follow.
    Disconnected { reason: String },
}

impl IrcEvent {
    /// Extract the bot-relevant event from a protocol line, if any.
    ///
    /// CTCP requests (`\x01...\x01`) are not channel messages.
    pub fn from_message(msg: &Message) -> Option<Self> {
        match msg.command.as_str() {
            "001" => Some(IrcEvent::Registered {
                nick: msg.param(0)?.to_string(),
            }),
            "433" => {
                let nick = msg.param(1).or_else(|| msg.param(0))?;
                Some(IrcEvent::NickInUse {
                    nick: nick.to_string(),
                })
            }
            "NICK" => Some(IrcEvent::NickChanged {
                nick: msg.source_nick()?.to_string(),
                new_nick: msg.param(0)?.to_string(),
            }),
            "PRIVMSG" => {
                let text = msg.param(1)?;
                if text.starts_with('\u{1}') {
                    return None;
                }
                Some(IrcEvent::ChannelMessage {
                    nick: msg.source_nick()?.to_string(),
                    target: msg.param(0)?.to_string(),
                    message: text.to_string(),
                })
            }
            "QUIT" => Some(IrcEvent::ParticipantQuit {
                nick: msg.source_nick()?.to_string(),
            }),
            _ => None,
        }
    }
}

/// Channel names start with one of the RFC 2811 prefixes.
pub fn is_channel_name(target: &str) -> bool {
    target.starts_with(['#', '&', '+', '!'])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(line: &str) -> Option<IrcEvent> {
        IrcEvent::from_message(&Message::parse(line).unwrap())
    }

    #[test]
    fn welcome_is_registration() {
        assert_eq!(
            event(":irc.example.net 001 chadgpt_ :Welcome to the network"),
            Some(IrcEvent::Registered {
                nick: "chadgpt_".into()
            })
        );
    }

    #[test]
    fn nick_in_use_reports_rejected_nick() {
        assert_eq!(
            event(":irc.example.net 433 * chadgpt :Nickname is already in use"),
            Some(IrcEvent::NickInUse {
                nick: "chadgpt".into()
            })
        );
    }

    #[test]
    fn nick_change_carries_old_and_new() {
        assert_eq!(
            event(":chadgpt!u@h NICK :chadgpt_"),
            Some(IrcEvent::NickChanged {
                nick: "chadgpt".into(),
                new_nick: "chadgpt_".into()
            })
        );
    }

    #[test]
    fn privmsg_is_channel_message() {
        assert_eq!(
            event(":alice!a@h PRIVMSG #rust :BotName: hi"),
            Some(IrcEvent::ChannelMessage {
                nick: "alice".into(),
                target: "#rust".into(),
                message: "BotName: hi".into()
            })
        );
    }

    #[test]
    fn ctcp_is_ignored() {
        assert_eq!(event(":alice!a@h PRIVMSG #rust :\u{1}VERSION\u{1}"), None);
    }

    #[test]
    fn quit_is_participant_quit() {
        assert_eq!(
            event(":chadgpt!u@h QUIT :Ping timeout"),
            Some(IrcEvent::ParticipantQuit {
                nick: "chadgpt".into()
            })
        );
    }

    #[test]
    fn unrelated_commands_yield_nothing() {
        assert_eq!(event(":alice!a@h JOIN #rust"), None);
        assert_eq!(event("PING :token"), None);
    }

    #[test]
    fn channel_prefixes() {
        assert!(is_channel_name("#rust"));
        assert!(is_channel_name("&local"));
        assert!(!is_channel_name("alice"));
    }
}
