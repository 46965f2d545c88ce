use std::fmt;

use crate::error::IrcError;

/// One protocol line: `[:prefix] COMMAND param* [:trailing]`.
///
/// IRCv3 message tags are accepted on input and dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub prefix: Option<String>,
    pub command: String,
    pub params: Vec<String>,
}

impl Message {
    pub fn new(command: &str, params: Vec<String>) -> Self {
        Self {
            prefix: None,
            command: command.to_string(),
            params,
        }
    }

    pub fn nick(nick: &str) -> Self {
        Self::new("NICK", vec![nick.to_string()])
    }

    pub fn user(username: &str, realname: &str) -> Self {
        Self::new(
            "USER",
            vec![
                username.to_string(),
                "0".to_string(),
                "*".to_string(),
                realname.to_string(),
            ],
        )
    }

    pub fn pass(password: &str) -> Self {
        Self::new("PASS", vec![password.to_string()])
    }

    pub fn join(channel: &str) -> Self {
        Self::new("JOIN", vec![channel.to_string()])
    }

    pub fn privmsg(target: &str, text: &str) -> Self {
        Self::new("PRIVMSG", vec![target.to_string(), text.to_string()])
    }

    pub fn pong(token: &str) -> Self {
        Self::new("PONG", vec![token.to_string()])
    }

    pub fn quit(reason: Option<&str>) -> Self {
        Self::new("QUIT", reason.map(str::to_string).into_iter().collect())
    }

    /// Nickname part of a `nick!user@host` prefix.
    pub fn source_nick(&self) -> Option<&str> {
        let prefix = self.prefix.as_deref()?;
        let nick = prefix.split(['!', '@']).next().unwrap_or(prefix);
        if nick.is_empty() {
            None
        } else {
            Some(nick)
        }
    }

    pub fn param(&self, index: usize) -> Option<&str> {
        self.params.get(index).map(String::as_str)
    }

    /// Parse a single line (without the trailing CR/LF).
    pub fn parse(line: &str) -> Result<Self, IrcError> {
        let mut rest = line.trim_end_matches(['\r', '\n']);

        if let Some(tagged) = rest.strip_prefix('@') {
            rest = tagged
                .split_once(' ')
                .map(|(_, r)| r)
                .ok_or_else(|| IrcError::Parse(format!("tags without command: {line}")))?;
        }
        rest = rest.trim_start_matches(' ');

        let prefix = match rest.strip_prefix(':') {
            Some(prefixed) => {
                let (prefix, r) = prefixed
                    .split_once(' ')
                    .ok_or_else(|| IrcError::Parse(format!("prefix without command: {line}")))?;
                rest = r.trim_start_matches(' ');
                Some(prefix.to_string())
            }
            None => None,
        };

        let (command, mut rest) = match rest.split_once(' ') {
            Some((c, r)) => (c, r),
            None => (rest, ""),
        };
        if command.is_empty() {
            return Err(IrcError::Parse(format!("missing command: {line}")));
        }

        let mut params = Vec::new();
        loop {
            rest = rest.trim_start_matches(' ');
            if rest.is_empty() {
                break;
            }
            if let Some(trailing) = rest.strip_prefix(':') {
                params.push(trailing.to_string());
                break;
            }
            match rest.split_once(' ') {
                Some((param, r)) => {
                    params.push(param.to_string());
                    rest = r;
                }
                None => {
                    params.push(rest.to_string());
                    break;
                }
            }
        }

        Ok(Self {
            prefix,
            command: command.to_ascii_uppercase(),
            params,
        })
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(prefix) = &self.prefix {
            write!(f, ":{prefix} ")?;
        }
        f.write_str(&self.command)?;
        if let Some((last, middle)) = self.params.split_last() {
            for param in middle {
                write!(f, " {param}")?;
            }
            if last.is_empty() || last.contains(' ') || last.starts_with(':') {
                write!(f, " :{last}")?;
            } else {
                write!(f, " {last}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_privmsg_with_prefix_and_trailing() {
        let msg = Message::parse(":alice!a@host PRIVMSG #rust :BotName: what time is it?").unwrap();
        assert_eq!(msg.command, "PRIVMSG");
        assert_eq!(msg.source_nick(), Some("alice"));
        assert_eq!(msg.params, vec!["#rust", "BotName: what time is it?"]);
    }

    #[test]
    fn parses_numeric_reply() {
        let msg = Message::parse(":irc.example.net 433 * chadgpt :Nickname is already in use").unwrap();
        assert_eq!(msg.command, "433");
        assert_eq!(msg.param(1), Some("chadgpt"));
        assert_eq!(msg.source_nick(), Some("irc.example.net"));
    }

    #[test]
    fn parses_without_prefix_or_trailing() {
        let msg = Message::parse("PING irc.example.net\r\n").unwrap();
        assert_eq!(msg.prefix, None);
        assert_eq!(msg.command, "PING");
        assert_eq!(msg.params, vec!["irc.example.net"]);
    }

    #[test]
    fn drops_ircv3_tags() {
        let msg = Message::parse("@time=2026-10-19T12:00:00Z :bob!b@h QUIT :bye").unwrap();
        assert_eq!(msg.command, "QUIT");
        assert_eq!(msg.source_nick(), Some("bob"));
        assert_eq!(msg.params, vec!["bye"]);
    }

    #[test]
    fn lowercase_commands_are_normalized() {
        assert_eq!(Message::parse("nick foo").unwrap().command, "NICK");
    }

    #[test]
    fn empty_line_is_an_error() {
        assert!(Message::parse("").is_err());
        assert!(Message::parse(":prefix-only").is_err());
    }

    #[test]
    fn display_adds_colon_to_trailing_when_needed() {
        assert_eq!(
            Message::privmsg("#rust", "alice: It is noon.").to_string(),
            "PRIVMSG #rust :alice: It is noon."
        );
        assert_eq!(Message::nick("chadgpt_").to_string(), "NICK chadgpt_");
        assert_eq!(
            Message::user("chadgpt", "chad bot").to_string(),
            "USER chadgpt 0 * :chad bot"
        );
        assert_eq!(Message::quit(None).to_string(), "QUIT");
        assert_eq!(Message::privmsg("#x", "").to_string(), "PRIVMSG #x :");
    }
}
