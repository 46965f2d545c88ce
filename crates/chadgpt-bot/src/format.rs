//! Backend reply shaping: markdown to plain text, blank-line collapsing and
//! the per-reply line cap.

use once_cell::sync::Lazy;
use regex::Regex;

use chadgpt_agent::ChatResponse;

static FENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*(```|~~~)").expect("fence regex"));
static HEADING: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*#{1,6}\s+").expect("heading regex"));
static QUOTE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*>\s?").expect("quote regex"));
static RULE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(?:-{3,}|\*{3,}|_{3,})\s*$").expect("rule regex"));
static BULLET: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\s*)[*+-]\s+").expect("bullet regex"));
static IMAGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"!\[([^\]]*)\]\([^)]*\)").expect("image regex"));
static LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[([^\]]+)\]\(([^)\s]+)[^)]*\)").expect("link regex"));
static BOLD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\*\*([^*\n]+)\*\*|\b__([^_\n]+)__\b").expect("bold regex"));
static ITALIC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\*([^*\s][^*\n]*)\*|\b_([^_\n]+)_\b").expect("italic regex"));
static STRIKE: Lazy<Regex> = Lazy::new(|| Regex::new(r"~~([^~\n]+)~~").expect("strike regex"));
static CODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"`([^`\n]+)`").expect("code regex"));

/// Strip markdown formatting, leaving readable plain text.
///
/// Fenced code keeps its contents verbatim without the fences. Links become
/// `text (url)`, list items keep a `- ` bullet.
pub fn markdown_to_text(markdown: &str) -> String {
    let mut out = Vec::new();
    let mut in_fence = false;

    for line in markdown.lines() {
        if FENCE.is_match(line) {
            in_fence = !in_fence;
            continue;
        }
        if in_fence {
            out.push(line.to_string());
            continue;
        }
        if RULE.is_match(line) {
            out.push(String::new());
            continue;
        }

        let line = HEADING.replace(line, "");
        let line = QUOTE.replace(&line, "");
        let line = BULLET.replace(&line, "$1- ");
        let line = IMAGE.replace_all(&line, "$1");
        let line = LINK.replace_all(&line, "$1 ($2)");
        let line = BOLD.replace_all(&line, "$1$2");
        let line = ITALIC.replace_all(&line, "$1$2");
        let line = STRIKE.replace_all(&line, "$1");
        let line = CODE.replace_all(&line, "$1");
        out.push(line.into_owned());
    }

    out.join("\n")
}

/// Collapse each run of blank (or whitespace-only) lines into one empty line.
pub fn collapse_blank_lines(text: &str) -> String {
    let mut out: Vec<&str> = Vec::new();
    let mut previous_blank = false;
    for line in text.lines() {
        let blank = line.trim().is_empty();
        if blank && previous_blank {
            continue;
        }
        out.push(if blank { "" } else { line });
        previous_blank = blank;
    }
    out.join("\n")
}

/// Turns a backend reply into the lines sent to the channel.
#[derive(Debug, Clone, Copy)]
pub struct ResponseFormatter {
    max_lines: usize,
}

impl ResponseFormatter {
    pub fn new(max_lines: usize) -> Self {
        Self { max_lines }
    }

    /// Lines for `sender`, or nothing when the response has no content.
    pub fn format(&self, sender: &str, response: &ChatResponse) -> Vec<String> {
        match response.first_block() {
            Some(block) => self.format_text(sender, block),
            None => Vec::new(),
        }
    }

    pub fn format_text(&self, sender: &str, text: &str) -> Vec<String> {
        let plain = collapse_blank_lines(&markdown_to_text(text));
        let plain = plain.trim();
        if plain.is_empty() {
            return Vec::new();
        }

        let lines: Vec<&str> = plain.lines().collect();
        let mut reply: Vec<String> = lines
            .iter()
            .take(self.max_lines)
            .map(|line| format!("{sender}: {line}"))
            .collect();

        if lines.len() > self.max_lines {
            let truncated = lines.len() - self.max_lines;
            reply.push(format!(
                "{sender}: .. ({truncated} lines truncated from response)"
            ));
        }
        reply
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(blocks: &[&str]) -> ChatResponse {
        ChatResponse {
            blocks: blocks.iter().map(|b| b.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn three_plain_lines_fit() {
        let f = ResponseFormatter::new(7);
        let out = f.format("alice", &response(&["one\ntwo\nthree"]));
        assert_eq!(out, vec!["alice: one", "alice: two", "alice: three"]);
    }

    #[test]
    fn nine_lines_are_truncated_to_seven_plus_notice() {
        let f = ResponseFormatter::new(7);
        let text = (1..=9).map(|i| format!("line {i}")).collect::<Vec<_>>().join("\n");
        let out = f.format("alice", &response(&[&text]));
        assert_eq!(out.len(), 8);
        assert_eq!(out[0], "alice: line 1");
        assert_eq!(out[6], "alice: line 7");
        assert_eq!(out[7], "alice: .. (2 lines truncated from response)");
    }

    #[test]
    fn only_first_block_is_used() {
        let f = ResponseFormatter::new(7);
        let out = f.format("bob", &response(&["first", "second"]));
        assert_eq!(out, vec!["bob: first"]);
    }

    #[test]
    fn no_blocks_no_output() {
        let f = ResponseFormatter::new(7);
        assert!(f.format("bob", &response(&[])).is_empty());
        assert!(f.format("bob", &response(&["  \n\n "])).is_empty());
    }

    #[test]
    fn blank_runs_collapse_and_edges_trim() {
        let f = ResponseFormatter::new(7);
        let out = f.format("bob", &response(&["\n\nHello\n\n\n\n  \nWorld\n\n"]));
        assert_eq!(out, vec!["bob: Hello", "bob: ", "bob: World"]);
    }

    #[test]
    fn markdown_is_flattened() {
        let md = "# Title\n\nSome **bold** and *italic* and `code`.\n\n* item one\n- item two\n\n> quoted\n\nSee [docs](https://example.com).";
        assert_eq!(
            markdown_to_text(md),
            "Title\n\nSome bold and italic and code.\n\n- item one\n- item two\n\nquoted\n\nSee docs (https://example.com)."
        );
    }

    #[test]
    fn fenced_code_is_kept_verbatim() {
        let md = "Run:\n```rust\nlet x = **y**;\n```\ndone";
        assert_eq!(markdown_to_text(md), "Run:\nlet x = **y**;\ndone");
    }

    #[test]
    fn snake_case_is_not_italic() {
        assert_eq!(markdown_to_text("use snake_case_names"), "use snake_case_names");
        assert_eq!(markdown_to_text("an _emphasised_ word"), "an emphasised word");
    }

    #[test]
    fn horizontal_rule_becomes_blank() {
        assert_eq!(markdown_to_text("a\n---\nb"), "a\n\nb");
    }

    #[test]
    fn collapse_keeps_single_blank() {
        assert_eq!(collapse_blank_lines("a\n\nb"), "a\n\nb");
        assert_eq!(collapse_blank_lines("a\n\n\n\nb"), "a\n\nb");
    }
}
