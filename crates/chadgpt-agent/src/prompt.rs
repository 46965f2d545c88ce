//! Prompt templates rendered per addressed message.
//!
//! Templates use mustache tags: `{{name}}`, `{{{name}}}` and `{{&name}}` all
//! substitute a variable, `{{! ... }}` is a comment, `{{#name}}..{{/name}}`
//! and `{{^name}}..{{/name}}` render their body when the variable is set or
//! unset. Output is plain text for the backend, so nothing is escaped, and
//! unknown variables render as empty. Text outside tags is literal.

use std::collections::HashMap;

use chrono::{DateTime, Local, SecondsFormat, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use chadgpt_core::config::PromptTemplateConfig;

use crate::provider::{Message, Role};

static TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\{\{\{\s*(?P<raw>[^{}]*?)\s*\}\}\}|\{\{\s*(?P<sigil>[!&#^/>=]?)\s*(?P<name>[^{}]*?)\s*\}\}",
    )
    .expect("tag regex")
});

#[derive(Debug, thiserror::Error)]
#[error("{message} at byte {offset}")]
pub struct TemplateError {
    pub offset: usize,
    pub message: String,
}

impl TemplateError {
    fn new(offset: usize, message: impl Into<String>) -> Self {
        Self {
            offset,
            message: message.into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PromptError {
    #[error("prompt template #{index} ({role}) is invalid: {source}")]
    Syntax {
        index: usize,
        role: Role,
        #[source]
        source: TemplateError,
    },
}

/// Context captured at the moment a message is dispatched.
#[derive(Debug, Clone)]
pub struct PromptVars {
    pub nick: String,
    pub channel: String,
    /// Payload extracted from the addressed line.
    pub message: String,
    /// The full line as received.
    pub raw_message: String,
    pub now: DateTime<Utc>,
}

impl PromptVars {
    fn to_context(&self) -> HashMap<&'static str, String> {
        let local = self.now.with_timezone(&Local);
        HashMap::from([
            ("nick", self.nick.clone()),
            ("channel", self.channel.clone()),
            ("message", self.message.clone()),
            ("rawMessage", self.raw_message.clone()),
            (
                "dateString",
                local.format("%a %b %d %Y %H:%M:%S GMT%z").to_string(),
            ),
            (
                "dateISOString",
                self.now.to_rfc3339_opts(SecondsFormat::Millis, true),
            ),
            (
                "dateUTCString",
                self.now.format("%a, %d %b %Y %H:%M:%S GMT").to_string(),
            ),
        ])
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Text(String),
    Var(String),
    Section {
        name: String,
        inverted: bool,
        body: Vec<Node>,
    },
}

struct OpenSection {
    name: String,
    inverted: bool,
    offset: usize,
    body: Vec<Node>,
}

fn current<'a>(root: &'a mut Vec<Node>, open: &'a mut [OpenSection]) -> &'a mut Vec<Node> {
    match open.last_mut() {
        Some(section) => &mut section.body,
        None => root,
    }
}

fn push_text(nodes: &mut Vec<Node>, text: &str, offset: usize) -> Result<(), TemplateError> {
    if let Some(pos) = text.find("{{") {
        return Err(TemplateError::new(offset + pos, "unclosed tag"));
    }
    if !text.is_empty() {
        nodes.push(Node::Text(text.to_string()));
    }
    Ok(())
}

fn parse(src: &str) -> Result<Vec<Node>, TemplateError> {
    let mut root = Vec::new();
    let mut open: Vec<OpenSection> = Vec::new();
    let mut last = 0;

    for caps in TAG.captures_iter(src) {
        let Some(whole) = caps.get(0) else { continue };
        push_text(current(&mut root, &mut open), &src[last..whole.start()], last)?;
        last = whole.end();

        if let Some(raw) = caps.name("raw") {
            if raw.as_str().is_empty() {
                return Err(TemplateError::new(whole.start(), "empty tag"));
            }
            current(&mut root, &mut open).push(Node::Var(raw.as_str().to_string()));
            continue;
        }

        let sigil = caps.name("sigil").map_or("", |m| m.as_str());
        let name = caps.name("name").map_or("", |m| m.as_str());
        if name.is_empty() && sigil != "!" {
            return Err(TemplateError::new(whole.start(), "empty tag"));
        }

        match sigil {
            "!" => {}
            // No partials are configured, so they render as nothing.
            ">" => {}
            "=" => {
                return Err(TemplateError::new(
                    whole.start(),
                    "custom delimiters are not supported",
                ))
            }
            "#" | "^" => open.push(OpenSection {
                name: name.to_string(),
                inverted: sigil == "^",
                offset: whole.start(),
                body: Vec::new(),
            }),
            "/" => {
                let Some(section) = open.pop() else {
                    return Err(TemplateError::new(
                        whole.start(),
                        format!("closing tag `{name}' without an open section"),
                    ));
                };
                if section.name != name {
                    return Err(TemplateError::new(
                        whole.start(),
                        format!("expected {{{{/{}}}}}, found {{{{/{name}}}}}", section.name),
                    ));
                }
                current(&mut root, &mut open).push(Node::Section {
                    name: section.name,
                    inverted: section.inverted,
                    body: section.body,
                });
            }
            _ => current(&mut root, &mut open).push(Node::Var(name.to_string())),
        }
    }

    push_text(current(&mut root, &mut open), &src[last..], last)?;
    if let Some(section) = open.last() {
        return Err(TemplateError::new(
            section.offset,
            format!("unclosed section `{}'", section.name),
        ));
    }
    Ok(root)
}

fn render_nodes(nodes: &[Node], ctx: &HashMap<&'static str, String>, out: &mut String) {
    for node in nodes {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::Var(name) => {
                if let Some(value) = ctx.get(name.as_str()) {
                    out.push_str(value);
                }
            }
            Node::Section {
                name,
                inverted,
                body,
            } => {
                let set = ctx.get(name.as_str()).is_some_and(|v| !v.is_empty());
                if set != *inverted {
                    render_nodes(body, ctx, out);
                }
            }
        }
    }
}

struct CompiledTemplate {
    role: Role,
    nodes: Vec<Node>,
}

/// Ordered list of role-tagged templates, parsed once at construction.
pub struct PromptBuilder {
    templates: Vec<CompiledTemplate>,
}

impl PromptBuilder {
    pub fn new(templates: &[PromptTemplateConfig]) -> Result<Self, PromptError> {
        let templates = templates
            .iter()
            .enumerate()
            .map(|(index, template)| {
                let nodes = parse(&template.content).map_err(|source| PromptError::Syntax {
                    index,
                    role: template.role,
                    source,
                })?;
                Ok(CompiledTemplate {
                    role: template.role,
                    nodes,
                })
            })
            .collect::<Result<Vec<_>, PromptError>>()?;

        Ok(Self { templates })
    }

    /// Render every template in declared order.
    pub fn render(&self, vars: &PromptVars) -> Vec<Message> {
        let ctx = vars.to_context();
        let messages: Vec<Message> = self
            .templates
            .iter()
            .map(|template| {
                let mut content = String::new();
                render_nodes(&template.nodes, &ctx, &mut content);
                Message {
                    role: template.role,
                    content,
                }
            })
            .collect();

        debug!(?messages, "rendered prompt templates");
        messages
    }
}
