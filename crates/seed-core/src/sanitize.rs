//! # Sanitization
//!
//! Every piece of message text passes through a [`Sanitizer`] before it
//! reaches the transcript. The default implementation interprets markdown and
//! produces plain terminal text with raw HTML, control characters and escape
//! sequences removed.

use pulldown_cmark::{Event, Options, Parser, Tag, TagEnd};

/// Turns untrusted markup into text that is safe to display.
pub trait Sanitizer: Send + Sync {
    fn sanitize(&self, markup: &str) -> String;
}

/// Markdown to terminal text.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkdownSanitizer;

impl MarkdownSanitizer {
    pub fn new() -> Self {
        Self
    }

    fn options() -> Options {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TASKLISTS);
        options
    }
}

impl Sanitizer for MarkdownSanitizer {
    fn sanitize(&self, markup: &str) -> String {
        let mut out = String::with_capacity(markup.len());
        // Ordered-list counters, `None` for bullet lists.
        let mut lists: Vec<Option<u64>> = Vec::new();
        let mut link_targets: Vec<String> = Vec::new();
        let mut in_code_block = false;

        for event in Parser::new_ext(markup, Self::options()) {
            match event {
                Event::Start(Tag::Heading { level, .. }) => {
                    start_block(&mut out);
                    out.push_str(&"#".repeat(level as usize));
                    out.push(' ');
                }
                Event::Start(Tag::Paragraph { .. }) => {
                    if lists.is_empty() {
                        start_block(&mut out);
                    }
                }
                Event::Start(Tag::BlockQuote { .. }) => {
                    start_block(&mut out);
                    out.push_str("│ ");
                }
                Event::Start(Tag::CodeBlock { .. }) => {
                    start_block(&mut out);
                    in_code_block = true;
                }
                Event::Start(Tag::List(start)) => {
                    if lists.is_empty() {
                        start_block(&mut out);
                    }
                    lists.push(start);
                }
                Event::Start(Tag::Item { .. }) => {
                    if !out.is_empty() && !out.ends_with('\n') {
                        out.push('\n');
                    }
                    out.push_str(&"  ".repeat(lists.len().saturating_sub(1)));
                    match lists.last_mut() {
                        Some(Some(n)) => {
                            out.push_str(&format!("{}. ", n));
                            *n += 1;
                        }
                        _ => out.push_str("• "),
                    }
                }
                Event::Start(Tag::Link { dest_url, .. }) => {
                    link_targets.push(dest_url.to_string());
                }
                Event::End(TagEnd::Link { .. }) => {
                    if let Some(url) = link_targets.pop() {
                        if !url.is_empty() {
                            out.push_str(&format!(" ({})", url));
                        }
                    }
                }
                Event::Start(Tag::Image { .. }) => out.push_str("[image: "),
                Event::End(TagEnd::Image { .. }) => out.push(']'),
                Event::End(TagEnd::List { .. }) => {
                    lists.pop();
                }
                Event::End(TagEnd::CodeBlock { .. }) => in_code_block = false,
                Event::End(TagEnd::TableCell { .. }) => out.push_str(" | "),
                Event::End(TagEnd::TableRow { .. }) | Event::End(TagEnd::TableHead { .. }) => {
                    out.push('\n')
                }
                Event::Text(text) => {
                    if in_code_block {
                        for line in text.lines() {
                            out.push_str("    ");
                            out.push_str(line);
                            out.push('\n');
                        }
                    } else {
                        out.push_str(&text);
                    }
                }
                Event::Code(code) => {
                    out.push('`');
                    out.push_str(&code);
                    out.push('`');
                }
                Event::SoftBreak | Event::HardBreak => out.push('\n'),
                Event::Rule => {
                    start_block(&mut out);
                    out.push_str("────────");
                }
                Event::TaskListMarker(done) => out.push_str(if done { "[x] " } else { "[ ] " }),
                // Raw HTML never reaches the surface.
                Event::Html(_) | Event::InlineHtml(_) => {}
                _ => {}
            }
        }

        strip_unsafe_chars(out.trim_end())
    }
}

fn start_block(out: &mut String) {
    if out.is_empty() {
        return;
    }
    while !out.ends_with("\n\n") {
        out.push('\n');
    }
}

/// Drop control characters (ESC and friends) and bidi overrides; tabs become
/// spaces, newlines survive.
pub fn strip_unsafe_chars(text: &str) -> String {
    text.chars()
        .filter_map(|c| match c {
            '\n' => Some('\n'),
            '\t' => Some(' '),
            '\u{202A}'..='\u{202E}' | '\u{2066}'..='\u{2069}' => None,
            c if c.is_control() => None,
            c => Some(c),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_passes_through() {
        assert_eq!(MarkdownSanitizer.sanitize("Hi there!"), "Hi there!");
    }

    #[test]
    fn test_raw_html_is_dropped() {
        let out = MarkdownSanitizer.sanitize("hello <script>alert(1)</script> world");
        assert!(!out.contains("<script>"));
        assert!(out.contains("hello"));
        assert!(out.contains("world"));
    }

    #[test]
    fn test_escape_sequences_are_stripped() {
        let out = MarkdownSanitizer.sanitize("red \u{1b}[31malert\u{1b}[0m \u{202E}txt");
        assert!(!out.contains('\u{1b}'));
        assert!(!out.contains('\u{202E}'));
    }

    #[test]
    fn test_markdown_structure() {
        let out = MarkdownSanitizer.sanitize("# Title\n\n- one\n- two\n\n1. first\n2. second");
        assert!(out.starts_with("# Title"));
        assert!(out.contains("• one\n• two"));
        assert!(out.contains("1. first\n2. second"));
    }

    #[test]
    fn test_soft_breaks_become_newlines() {
        assert_eq!(MarkdownSanitizer.sanitize("line one\nline two"), "line one\nline two");
    }

    #[test]
    fn test_cursor_glyph_survives() {
        assert_eq!(MarkdownSanitizer.sanitize("Hi▌"), "Hi▌");
    }

    #[test]
    fn test_links_show_target() {
        let out = MarkdownSanitizer.sanitize("[docs](https://example.com)");
        assert_eq!(out, "docs (https://example.com)");
    }
}
