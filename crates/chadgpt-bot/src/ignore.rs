//! Sender deny-list.
//!
//! Patterns are case-sensitive globs over the whole nickname: `*` matches any
//! run of characters and `?` exactly one. Brackets are literal because they
//! are common in nicknames (`bridge[m]`).

use glob::Pattern;

#[derive(Debug, Clone, Default)]
pub struct IgnoreFilter {
    patterns: Vec<Pattern>,
}

impl IgnoreFilter {
    pub fn new(globs: &[String]) -> Result<Self, glob::PatternError> {
        let patterns = globs
            .iter()
            .map(|g| Pattern::new(&translate(g)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    pub fn is_ignored(&self, nick: &str) -> bool {
        self.patterns.iter().any(|p| p.matches(nick))
    }
}

/// Rewrite a nickname glob into `glob::Pattern` syntax.
fn translate(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '[' => out.push_str("[[]"),
            ']' => out.push_str("[]]"),
            // `**` is a path wildcard in glob::Pattern and rejected mid-component.
            '*' if out.ends_with('*') => {}
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter(globs: &[&str]) -> IgnoreFilter {
        let globs: Vec<String> = globs.iter().map(|s| s.to_string()).collect();
        IgnoreFilter::new(&globs).unwrap()
    }

    #[test]
    fn prefix_glob() {
        let f = filter(&["bad*"]);
        assert!(f.is_ignored("badguy"));
        assert!(!f.is_ignored("goodguy"));
    }

    #[test]
    fn whole_nick_must_match() {
        let f = filter(&["bot"]);
        assert!(f.is_ignored("bot"));
        assert!(!f.is_ignored("robot"));
        assert!(!f.is_ignored("bot2"));
    }

    #[test]
    fn question_mark_is_one_char() {
        let f = filter(&["user?"]);
        assert!(f.is_ignored("user1"));
        assert!(!f.is_ignored("user"));
        assert!(!f.is_ignored("user12"));
    }

    #[test]
    fn case_sensitive() {
        let f = filter(&["Spam*"]);
        assert!(!f.is_ignored("spammer"));
    }

    #[test]
    fn brackets_are_literal() {
        let f = filter(&["*[m]"]);
        assert!(f.is_ignored("alice[m]"));
        assert!(!f.is_ignored("alicem"));
    }

    #[test]
    fn repeated_stars_are_accepted() {
        let f = filter(&["a**z"]);
        assert!(f.is_ignored("abcz"));
    }

    #[test]
    fn empty_list_ignores_nobody() {
        assert!(!IgnoreFilter::default().is_ignored("anyone"));
    }
}
