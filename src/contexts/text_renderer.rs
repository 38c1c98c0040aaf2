//! Plain-text rendering of a [`Spec`] for the terminal.
//!
//! [`render_message`] is the per-message boundary: a tree that cannot be
//! rendered turns into a placeholder for that message alone.

use crate::data::{Element, Spec};
use std::fmt;

pub const RENDER_FAILED_PLACEHOLDER: &str = "Couldn't display response.";

const MAX_DEPTH: usize = 64;
const INDENT: &str = "  ";

/// Errors that can occur while rendering a tree
#[derive(Debug, Clone, PartialEq)]
pub enum RenderError {
    MissingElement(String),
    TooDeep(usize),
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RenderError::MissingElement(key) => {
                write!(f, "Element '{}' is referenced but not defined", key)
            }
            RenderError::TooDeep(depth) => write!(f, "Tree is nested deeper than {}", depth),
        }
    }
}

impl std::error::Error for RenderError {}

/// Renders the tree from its root
pub fn render(spec: &Spec) -> Result<String, RenderError> {
    let mut lines = Vec::new();
    render_element(spec, &spec.root, Depth::default(), &mut lines)?;
    Ok(lines.join("\n"))
}

/// Renders one message, substituting a placeholder when rendering fails
pub fn render_message(spec: &Spec) -> String {
    match render(spec) {
        Ok(text) => text,
        Err(e) => {
            tracing::warn!(error = %e, root = %spec.root, "failed to render message");
            RENDER_FAILED_PLACEHOLDER.to_string()
        }
    }
}

fn lookup<'a>(spec: &'a Spec, key: &str) -> Result<&'a Element, RenderError> {
    spec.get(key)
        .ok_or_else(|| RenderError::MissingElement(key.to_string()))
}

/// Indentation level and recursion depth; only cards indent their content
#[derive(Debug, Clone, Copy, Default)]
struct Depth {
    indent: usize,
    nesting: usize,
}

impl Depth {
    fn inner(self) -> Self {
        Self {
            indent: self.indent,
            nesting: self.nesting + 1,
        }
    }

    fn indented(self) -> Self {
        Self {
            indent: self.indent + 1,
            nesting: self.nesting + 1,
        }
    }
}

fn render_element(
    spec: &Spec,
    key: &str,
    depth: Depth,
    lines: &mut Vec<String>,
) -> Result<(), RenderError> {
    if depth.nesting > MAX_DEPTH {
        return Err(RenderError::TooDeep(MAX_DEPTH));
    }
    let element = lookup(spec, key)?;
    let pad = INDENT.repeat(depth.indent);
    let text = |name: &str| element.prop_str(name).unwrap_or_default();

    match element.element_type.as_str() {
        "Card" => {
            if !text("title").is_empty() {
                lines.push(format!("{}== {} ==", pad, text("title")));
            }
            if !text("subtitle").is_empty() {
                lines.push(format!("{}{}", pad, text("subtitle")));
            }
            render_children(spec, element, depth.indented(), lines)?;
        }
        "Heading" => {
            let marks = match text("level") {
                "h2" => "##",
                "h4" => "####",
                _ => "###",
            };
            lines.push(format!("{}{} {}", pad, marks, text("text")));
        }
        "Text" => match text("variant") {
            "muted" | "caption" => lines.push(format!("{}({})", pad, text("content"))),
            _ => lines.push(format!("{}{}", pad, text("content"))),
        },
        "List" => render_children(spec, element, depth.inner(), lines)?,
        "ListItem" => {
            let mut line = format!("{}- {}", pad, text("content"));
            if !text("meta").is_empty() && text("meta") != text("content") {
                line.push_str(&format!(" ({})", text("meta")));
            }
            if !text("href").is_empty() && text("href") != text("meta") {
                line.push_str(&format!(" <{}>", text("href")));
            }
            lines.push(line);
        }
        "Link" => lines.push(format!("{}{} <{}>", pad, text("label"), text("href"))),
        "TagRow" => {
            let tags = element
                .children
                .iter()
                .map(|child| lookup(spec, child).map(inline_tag))
                .collect::<Result<Vec<_>, _>>()?;
            lines.push(format!("{}{}", pad, tags.join(" ")));
        }
        "Tag" => lines.push(format!("{}{}", pad, inline_tag(element))),
        "Divider" => match text("label") {
            "" => lines.push(format!("{}---", pad)),
            label => lines.push(format!("{}--- {} ---", pad, label)),
        },
        "Resume" => {
            let title = match text("title") {
                "" => "Resume",
                title => title,
            };
            lines.push(format!("{}[{}] {}", pad, title, text("href")));
        }
        "InterestGrid" => {
            if !text("title").is_empty() {
                lines.push(format!("{}{}", pad, text("title")));
            }
            let items = element
                .props
                .get("items")
                .and_then(|items| items.as_array())
                .into_iter()
                .flatten()
                .filter_map(|item| item.as_str());
            for item in items {
                lines.push(format!("{}{}* {}", pad, INDENT, item));
            }
        }
        _ => render_children(spec, element, depth.inner(), lines)?,
    }

    Ok(())
}

fn render_children(
    spec: &Spec,
    element: &Element,
    depth: Depth,
    lines: &mut Vec<String>,
) -> Result<(), RenderError> {
    for child in &element.children {
        render_element(spec, child, depth, lines)?;
    }
    Ok(())
}

fn inline_tag(element: &Element) -> String {
    format!("[{}]", element.prop_str("text").unwrap_or_default())
}
