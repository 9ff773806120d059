use mdui_core::model::Inline;

use crate::parser::RawInline;

/// Convert raw phrasing nodes to IR inlines. Inline HTML becomes literal text;
/// adjacent text nodes are merged.
pub fn to_inlines(raw: &[RawInline]) -> Vec<Inline> {
    let mut out: Vec<Inline> = Vec::with_capacity(raw.len());
    for node in raw {
        let converted = match node {
            RawInline::Text(value) | RawInline::Html(value) => Inline::Text { value: value.clone() },
            RawInline::Strong(children) => Inline::Strong { children: to_inlines(children) },
            RawInline::Emphasis(children) => Inline::Emphasis { children: to_inlines(children) },
            RawInline::Strikethrough(children) => Inline::Delete { children: to_inlines(children) },
            RawInline::Link { url, title, children } => Inline::Link {
                url: url.clone(),
                title: title.clone(),
                children: to_inlines(children),
            },
            RawInline::Image { url, title, alt } => Inline::Image {
                url: url.clone(),
                alt: Inline::plain_text_of(&to_inlines(alt)),
                title: title.clone(),
            },
            RawInline::Code(value) => Inline::Code { value: value.clone() },
            RawInline::Break => Inline::Break,
        };
        match (out.last_mut(), converted) {
            (Some(Inline::Text { value: prev }), Inline::Text { value }) => prev.push_str(&value),
            (_, converted) => out.push(converted),
        }
    }
    out
}

/// Link targets of the form `#target`, in document order.
pub fn fragment_links(inlines: &[Inline]) -> Vec<String> {
    let mut out = Vec::new();
    collect_links(inlines, &mut out);
    out
}

fn collect_links(inlines: &[Inline], out: &mut Vec<String>) {
    for node in inlines {
        match node {
            Inline::Link { url, children, .. } => {
                if let Some(target) = url.strip_prefix('#').filter(|t| !t.is_empty()) {
                    out.push(target.to_string());
                }
                collect_links(children, out);
            }
            Inline::Strong { children } | Inline::Emphasis { children } | Inline::Delete { children } => {
                collect_links(children, out)
            }
            _ => {}
        }
    }
}
