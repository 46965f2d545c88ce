//! Connection phase and confirmed identity.
//!
//! The highlight pattern is stored next to the nickname it was built from, so
//! the two are always replaced together. Before the first registration there
//! is no identity and nothing matches.

use regex::Regex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Connecting,
    Registered,
}

/// Recognizes `<nick>: payload` and `<nick>, payload`.
#[derive(Debug, Clone)]
pub struct HighlightPattern {
    regex: Regex,
}

impl HighlightPattern {
    pub fn for_nick(nick: &str) -> Result<Self, regex::Error> {
        let regex = Regex::new(&format!(r"^{}[,:] (?<msg>.*)", regex::escape(nick)))?;
        Ok(Self { regex })
    }

    /// The payload after the address prefix, if the line is addressed to us.
    pub fn extract<'a>(&self, line: &'a str) -> Option<&'a str> {
        self.regex
            .captures(line)
            .and_then(|caps| caps.name("msg"))
            .map(|m| m.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct Identity {
    nickname: String,
    highlight: HighlightPattern,
}

impl Identity {
    pub fn nickname(&self) -> &str {
        &self.nickname
    }
}

#[derive(Debug)]
pub struct Session {
    phase: Phase,
    identity: Option<Identity>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            phase: Phase::Connecting,
            identity: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn nickname(&self) -> Option<&str> {
        self.identity.as_ref().map(Identity::nickname)
    }

    pub fn is_self(&self, nick: &str) -> bool {
        self.nickname() == Some(nick)
    }

    /// Record a server-confirmed nickname and rebuild the highlight pattern.
    ///
    /// If the pattern cannot be built the identity is cleared, so no line
    /// matches until the next confirmation.
    pub fn confirm(&mut self, nick: &str) -> Result<(), regex::Error> {
        self.phase = Phase::Registered;
        match HighlightPattern::for_nick(nick) {
            Ok(highlight) => {
                self.identity = Some(Identity {
                    nickname: nick.to_string(),
                    highlight,
                });
                Ok(())
            }
            Err(e) => {
                self.identity = None;
                Err(e)
            }
        }
    }

    /// Payload of a line addressed to the current nickname.
    pub fn addressed_payload<'a>(&self, line: &'a str) -> Option<&'a str> {
        self.identity.as_ref()?.highlight.extract(line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registered(nick: &str) -> Session {
        let mut session = Session::new();
        session.confirm(nick).unwrap();
        session
    }

    #[test]
    fn colon_and_comma_forms_match() {
        let session = registered("BotName");
        assert_eq!(session.addressed_payload("BotName: hello"), Some("hello"));
        assert_eq!(session.addressed_payload("BotName, hello"), Some("hello"));
    }

    #[test]
    fn near_misses_do_not_match() {
        let session = registered("BotName");
        assert_eq!(session.addressed_payload("BotNamex: hello"), None);
        assert_eq!(session.addressed_payload("hey BotName: hello"), None);
        assert_eq!(session.addressed_payload("BotName:hello"), None);
        assert_eq!(session.addressed_payload("botname: hello"), None);
    }

    #[test]
    fn payload_keeps_later_addresses() {
        let session = registered("bot");
        assert_eq!(
            session.addressed_payload("bot: tell bot: hi"),
            Some("tell bot: hi")
        );
    }

    #[test]
    fn nick_metacharacters_match_literally() {
        let session = registered("c[h]ad|gpt^");
        assert_eq!(session.addressed_payload("c[h]ad|gpt^: yo"), Some("yo"));
        assert_eq!(session.addressed_payload("chad: yo"), None);
    }

    #[test]
    fn nothing_matches_before_registration() {
        let session = Session::new();
        assert_eq!(session.phase(), Phase::Connecting);
        assert_eq!(session.nickname(), None);
        assert_eq!(session.addressed_payload("BotName: hello"), None);
    }

    #[test]
    fn rename_replaces_pattern() {
        let mut session = registered("chadgpt");
        session.confirm("chadgpt_").unwrap();
        assert_eq!(session.phase(), Phase::Registered);
        assert!(session.is_self("chadgpt_"));
        assert_eq!(session.addressed_payload("chadgpt: hi"), None);
        assert_eq!(session.addressed_payload("chadgpt_: hi"), Some("hi"));
    }
}
