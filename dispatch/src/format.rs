//! Usage listings: two-column command overviews.

use crate::entry::CommandEntry;
use crate::router::{GroupFilter, Router};

/// Layout of a usage listing.
#[derive(Debug, Clone, Copy)]
pub struct UsageOptions {
    /// Render parameter placeholders after the command names.
    pub show_params: bool,
    /// Wrap column for documentation text.
    pub width: usize,
    /// Column where documentation starts; longer signatures push the
    /// documentation to the next line.
    pub doc_indent: usize,
}

impl Default for UsageOptions {
    fn default() -> Self {
        UsageOptions {
            show_params: true,
            width: 120,
            doc_indent: 20,
        }
    }
}

impl<H> Router<H> {
    /// Render the admitted, visible entries as a usage listing, sorted
    /// ascending by entry order.
    pub fn usage_text(&self, filter: GroupFilter<'_>, options: UsageOptions) -> String {
        let mut entries = self.list(filter, false);
        entries.sort_by(|a, b| a.order_key().total_cmp(&b.order_key()));

        let mut lines = Vec::with_capacity(entries.len());
        for entry in entries {
            lines.push(render_row(entry, options));
        }
        lines.join("\n")
    }
}

impl<H> CommandEntry<H> {
    fn order_key(&self) -> f64 {
        self.order
    }

    fn signature(&self, show_params: bool) -> String {
        if let Some(usage) = &self.usage {
            return usage.clone();
        }
        let mut out = self.command.clone();
        if !self.aliases.is_empty() {
            out.push_str(&format!(" ({})", self.aliases.join(", ")));
        }
        if show_params {
            for param in &self.params {
                let name = param.name().to_uppercase();
                if param.variadic {
                    out.push_str(&format!(" {name}..."));
                } else if param.optional {
                    out.push_str(&format!(" [{name}]"));
                } else {
                    out.push_str(&format!(" {name}"));
                }
            }
        }
        out
    }
}

fn render_row<H>(entry: &CommandEntry<H>, options: UsageOptions) -> String {
    let signature = entry.signature(options.show_params);
    let doc = entry.doc.as_deref().map(first_sentence).unwrap_or_default();
    if doc.is_empty() {
        return signature;
    }

    let indent = options.doc_indent;
    let mut row = if signature.len() >= indent {
        format!("{signature}\n{:indent$}", "")
    } else {
        format!("{signature:<indent$}")
    };
    row.push_str(&wrap(doc, options.width, indent));
    row
}

/// The first sentence of a documentation block, period included.
fn first_sentence(doc: &str) -> &str {
    let paragraph = doc.trim().split('\n').next().unwrap_or("").trim();
    match paragraph.find(". ") {
        Some(end) => &paragraph[..=end],
        None => paragraph,
    }
}

/// Word-wrap at `width`, continuation lines hanging at `indent`.
fn wrap(text: &str, width: usize, indent: usize) -> String {
    let mut out = String::new();
    let mut column = indent;
    let mut first = true;
    for word in text.split_whitespace() {
        let needed = word.len() + usize::from(!first);
        if !first && column + needed > width {
            out.push('\n');
            out.push_str(&" ".repeat(indent));
            column = indent;
            out.push_str(word);
            column += word.len();
        } else {
            if !first {
                out.push(' ');
                column += 1;
            }
            out.push_str(word);
            column += word.len();
            first = false;
        }
    }
    out
}
