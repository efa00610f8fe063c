//! Deterministic transcript markup. Rebuilding from stored messages must give
//! the same output every time, so nothing here reads clocks or counters.

use crate::api::ResponseBlock;

use super::{Message, Role};

pub fn render_message(message: &Message) -> String {
    format!(
        "<div class=\"msg msg-{}\">{}</div>",
        message.role.as_str(),
        text_to_html(&message.content)
    )
}

/// Richer assistant markup for replies that arrived as typed blocks. Only
/// lives in the session snapshot; after a reload the flattened text is
/// rendered through [`render_message`] instead.
pub fn render_blocks(blocks: &[ResponseBlock]) -> String {
    let mut out = String::from("<div class=\"msg msg-assistant msg-blocks\">");
    for block in blocks {
        out.push_str(&format!(
            "<section class=\"block block-{}\" data-block=\"{}\">",
            escape_attr(&block.kind),
            escape_attr(&block.id)
        ));
        if !block.title.is_empty() {
            out.push_str(&format!("<h4>{}</h4>", escape_html(&block.title)));
        }
        if !block.content.is_empty() {
            out.push_str("<ul>");
            for line in &block.content {
                out.push_str(&format!("<li>{}</li>", escape_html(line)));
            }
            out.push_str("</ul>");
        }
        if !block.relations.is_empty() {
            out.push_str("<p class=\"refs\">");
            for (relation, targets) in &block.relations {
                for target in targets {
                    out.push_str(&format!(
                        "<a class=\"ref\" data-rel=\"{}\" data-ref=\"{}\">{}</a>",
                        escape_attr(relation),
                        escape_attr(target),
                        escape_html(target)
                    ));
                }
            }
            out.push_str("</p>");
        }
        out.push_str("</section>");
    }
    out.push_str("</div>");
    out
}

/// Plain-text form of a block reply, used as the durable message content.
pub fn flatten_blocks(blocks: &[ResponseBlock]) -> String {
    let mut parts = Vec::with_capacity(blocks.len());
    for block in blocks {
        let mut part = String::new();
        if !block.title.is_empty() {
            part.push_str(&block.title);
        }
        for line in &block.content {
            if !part.is_empty() {
                part.push('\n');
            }
            part.push_str("- ");
            part.push_str(line);
        }
        if !part.is_empty() {
            parts.push(part);
        }
    }
    parts.join("\n\n")
}

fn text_to_html(input: &str) -> String {
    escape_html(input).replace('\n', "<br>")
}

pub(crate) fn escape_html(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

pub(crate) fn escape_attr(input: &str) -> String {
    escape_html(input)
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// Role encoded in a rendered entry, if it is one of ours.
pub fn role_of_markup(markup: &str) -> Option<Role> {
    if markup.starts_with("<div class=\"msg msg-user") {
        Some(Role::User)
    } else if markup.starts_with("<div class=\"msg msg-assistant") {
        Some(Role::Assistant)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn block() -> ResponseBlock {
        let mut relations = BTreeMap::new();
        relations.insert("CAUSES".to_string(), vec!["Heat".to_string()]);
        ResponseBlock {
            id: "b1".to_string(),
            kind: "mechanism".to_string(),
            title: "How it works".to_string(),
            content: vec!["Energy spreads".to_string(), "a < b".to_string()],
            relations,
        }
    }

    #[test]
    fn message_markup_escapes_and_keeps_role() {
        let markup = render_message(&Message::user("1 < 2\nok"));
        assert_eq!(markup, "<div class=\"msg msg-user\">1 &lt; 2<br>ok</div>");
        assert_eq!(role_of_markup(&markup), Some(Role::User));
    }

    #[test]
    fn block_markup_is_deterministic() {
        let blocks = vec![block()];
        assert_eq!(render_blocks(&blocks), render_blocks(&blocks));
        let markup = render_blocks(&blocks);
        assert!(markup.contains("a &lt; b"));
        assert!(markup.contains("data-ref=\"Heat\""));
        assert_eq!(role_of_markup(&markup), Some(Role::Assistant));
    }

    #[test]
    fn flattened_blocks_read_as_text() {
        assert_eq!(
            flatten_blocks(&[block()]),
            "How it works\n- Energy spreads\n- a < b"
        );
    }
}
