//! Extension parser: base Markdown (via `pulldown-cmark`) plus frontmatter and
//! `ui:<type>` fenced blocks, producing a raw syntax tree.

use std::collections::BTreeMap;
use std::ops::Range;

use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag};
use serde_json::{Map, Value};

use mdui_core::diagnostics::{Diagnostic, DiagnosticCode, DiagnosticSource};
use mdui_core::model::{Layout, Point, Span, block_types};

/// Frontmatter delimiter line.
pub const FRONTMATTER_MARKER: &str = "---";

/// Byte offset → line/column mapping over the full source text.
#[derive(Debug, Clone)]
pub struct LineIndex {
    text: String,
    line_starts: Vec<usize>,
}

impl LineIndex {
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![0];
        for (i, b) in text.bytes().enumerate() {
            if b == b'\n' {
                line_starts.push(i + 1);
            }
        }
        Self { text: text.to_string(), line_starts }
    }

    pub fn point(&self, offset: usize) -> Point {
        let mut offset = offset.min(self.text.len());
        while !self.text.is_char_boundary(offset) {
            offset -= 1;
        }
        let line = self.line_starts.partition_point(|&s| s <= offset).saturating_sub(1);
        let start = self.line_starts[line];
        let column = self.text[start..offset].chars().count() + 1;
        Point::new(line as u32 + 1, column as u32)
    }

    /// Span of a byte range; trailing line breaks do not extend the end.
    pub fn span(&self, range: Range<usize>) -> Span {
        let start = range.start.min(self.text.len());
        let mut end = range.end.min(self.text.len()).max(start);
        while end > start && matches!(self.text.as_bytes()[end - 1], b'\n' | b'\r') {
            end -= 1;
        }
        Span::new(self.point(start), self.point(end))
    }
}

/// Phrasing node of the raw tree.
#[derive(Debug, Clone, PartialEq)]
pub enum RawInline {
    Text(String),
    Strong(Vec<RawInline>),
    Emphasis(Vec<RawInline>),
    Strikethrough(Vec<RawInline>),
    Link { url: String, title: Option<String>, children: Vec<RawInline> },
    Image { url: String, title: Option<String>, alt: Vec<RawInline> },
    Code(String),
    Break,
    /// Raw inline HTML, kept verbatim.
    Html(String),
}

/// A fenced `ui:<type>` block before payload parsing.
#[derive(Debug, Clone, PartialEq)]
pub struct TypedBlockNode {
    pub type_name: String,
    pub payload: String,
    /// Absolute byte offset of the payload's first character.
    pub payload_offset: usize,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RawNode {
    Paragraph { inlines: Vec<RawInline>, span: Span },
    Heading { level: u8, explicit_id: Option<String>, inlines: Vec<RawInline>, span: Span },
    Code { language: Option<String>, code: String, span: Span },
    Typed(TypedBlockNode),
    List { ordered: bool, start: Option<u64>, items: Vec<Vec<RawInline>>, span: Span },
    Quote { inlines: Vec<RawInline>, span: Span },
    Rule { span: Span },
    Html { html: String, span: Span },
}

impl RawNode {
    /// The IR block type this node translates to.
    pub fn block_type(&self) -> &str {
        match self {
            RawNode::Paragraph { .. } => block_types::TEXT,
            RawNode::Heading { .. } => block_types::HEADING,
            RawNode::Code { .. } => block_types::CODE,
            RawNode::Typed(t) => &t.type_name,
            RawNode::List { .. } => block_types::LIST,
            RawNode::Quote { .. } => block_types::QUOTE,
            RawNode::Rule { .. } => block_types::DIVIDER,
            RawNode::Html { .. } => block_types::HTML,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            RawNode::Paragraph { span, .. }
            | RawNode::Heading { span, .. }
            | RawNode::Code { span, .. }
            | RawNode::List { span, .. }
            | RawNode::Quote { span, .. }
            | RawNode::Rule { span }
            | RawNode::Html { span, .. } => *span,
            RawNode::Typed(t) => t.span,
        }
    }
}

/// Reserved frontmatter keys are lifted out of `metadata`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frontmatter {
    pub metadata: BTreeMap<String, Value>,
    pub document_id: Option<String>,
    pub layout: Layout,
}

#[derive(Debug, Clone)]
pub struct RawDocument {
    pub frontmatter: Frontmatter,
    pub nodes: Vec<RawNode>,
    pub diagnostics: Vec<Diagnostic>,
    pub index: LineIndex,
}

/// Parse a full source text.
pub fn parse(source: &str) -> RawDocument {
    let index = LineIndex::new(source);
    let (frontmatter, body_offset, mut diagnostics) = split_frontmatter(source, &index);
    let (nodes, body_diags) = parse_fragment(&source[body_offset..], body_offset, &index);
    diagnostics.extend(body_diags);
    RawDocument { frontmatter, nodes, diagnostics, index }
}

/// Parse a YAML (or JSON) payload that must be a mapping.
pub(crate) fn yaml_mapping(text: &str) -> Result<Map<String, Value>, String> {
    if text.trim().is_empty() {
        return Ok(Map::new());
    }
    let yaml: serde_yaml::Value = serde_yaml::from_str(text).map_err(|e| e.to_string())?;
    match serde_json::to_value(&yaml).map_err(|e| e.to_string())? {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        other => Err(format!("expected a mapping, got {}", describe(&other))),
    }
}

fn describe(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a sequence",
        Value::Object(_) => "a mapping",
    }
}

fn split_frontmatter(source: &str, index: &LineIndex) -> (Frontmatter, usize, Vec<Diagnostic>) {
    let mut diagnostics = Vec::new();
    let mut lines = source.split_inclusive('\n');

    let Some(first) = lines.next() else {
        return (Frontmatter::default(), 0, diagnostics);
    };
    if first.trim_end_matches(['\n', '\r']) != FRONTMATTER_MARKER {
        return (Frontmatter::default(), 0, diagnostics);
    }

    let yaml_start = first.len();
    let mut offset = yaml_start;
    let mut closing = None;
    for line in lines {
        let bare = line.trim_end_matches(['\n', '\r']);
        if bare == FRONTMATTER_MARKER || bare == "..." {
            closing = Some((offset, offset + line.len()));
            break;
        }
        offset += line.len();
    }

    let Some((yaml_end, body_offset)) = closing else {
        diagnostics.push(
            Diagnostic::warning(
                DiagnosticCode::FrontmatterUnterminated,
                DiagnosticSource::Parser,
                "frontmatter opened with '---' is never closed; treating the document as having no frontmatter",
            )
            .with_position(index.span(0..first.len())),
        );
        return (Frontmatter::default(), 0, diagnostics);
    };

    let span = index.span(0..body_offset);
    let mut metadata = match yaml_mapping(&source[yaml_start..yaml_end]) {
        Ok(map) => map,
        Err(e) => {
            diagnostics.push(
                Diagnostic::error(
                    DiagnosticCode::FrontmatterMalformed,
                    DiagnosticSource::Parser,
                    format!("malformed frontmatter: {e}"),
                )
                .with_position(span),
            );
            return (Frontmatter::default(), body_offset, diagnostics);
        }
    };

    let document_id = match metadata.remove("id") {
        Some(Value::String(id)) if !id.trim().is_empty() => Some(id),
        Some(other) => {
            metadata.insert("id".to_string(), other);
            None
        }
        None => None,
    };

    let layout = match metadata.remove("layout") {
        None => Layout::default(),
        Some(v) => match layout_from_frontmatter(&v) {
            Ok(layout) => layout,
            Err(problems) => {
                for (path, message) in problems {
                    diagnostics.push(
                        Diagnostic::error(DiagnosticCode::InvalidLayout, DiagnosticSource::Parser, message)
                            .with_path(path)
                            .with_position(span),
                    );
                }
                Layout::default()
            }
        },
    };

    let frontmatter = Frontmatter {
        metadata: metadata.into_iter().collect(),
        document_id,
        layout,
    };
    (frontmatter, body_offset, diagnostics)
}

fn layout_from_frontmatter(v: &Value) -> Result<Layout, Vec<(&'static str, String)>> {
    let Some(map) = v.as_object() else {
        return Err(vec![("layout", "layout must be a mapping".to_string())]);
    };
    let mut layout = Layout::default();
    let mut problems = Vec::new();
    for (key, value) in map {
        match (key.as_str(), value) {
            ("mode", Value::String(s)) => layout.mode = s.clone(),
            ("spacing", Value::String(s)) => layout.spacing = s.clone(),
            ("maxWidth", v) if v.is_number() => layout.max_width = v.as_f64(),
            ("mode" | "spacing", _) => problems.push(("layout", format!("layout.{key} must be a string"))),
            ("maxWidth", _) => problems.push(("layout.maxWidth", "layout.maxWidth must be a number".to_string())),
            _ => problems.push(("layout", format!("unknown layout hint '{key}'"))),
        }
    }
    problems.extend(layout.problems());
    if problems.is_empty() { Ok(layout) } else { Err(problems) }
}

/// Parse a Markdown fragment (no frontmatter). `base` is the absolute offset
/// of the fragment's first byte, used for source spans.
pub fn parse_fragment(fragment: &str, base: usize, index: &LineIndex) -> (Vec<RawNode>, Vec<Diagnostic>) {
    let mut builder = FragmentBuilder {
        fragment,
        base,
        index,
        nodes: Vec::new(),
        diagnostics: Vec::new(),
        frame: None,
        pending_html: None,
    };

    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_HEADING_ATTRIBUTES);

    for (event, range) in Parser::new_ext(fragment, options).into_offset_iter() {
        builder.event(event, range);
    }
    builder.finish()
}

#[derive(Debug, Clone)]
enum OpenInline {
    Strong,
    Emphasis,
    Strikethrough,
    Link { url: String, title: Option<String> },
    Image { url: String, title: Option<String> },
}

/// Builds nested phrasing content from start/end events.
#[derive(Debug, Default)]
struct InlineCollector {
    stack: Vec<(OpenInline, Vec<RawInline>)>,
    done: Vec<RawInline>,
}

impl InlineCollector {
    fn is_empty(&self) -> bool {
        self.stack.is_empty() && self.done.is_empty()
    }

    fn open(&mut self, kind: OpenInline) {
        self.stack.push((kind, Vec::new()));
    }

    fn close(&mut self) {
        let Some((kind, children)) = self.stack.pop() else { return };
        let node = match kind {
            OpenInline::Strong => RawInline::Strong(children),
            OpenInline::Emphasis => RawInline::Emphasis(children),
            OpenInline::Strikethrough => RawInline::Strikethrough(children),
            OpenInline::Link { url, title } => RawInline::Link { url, title, children },
            OpenInline::Image { url, title } => RawInline::Image { url, title, alt: children },
        };
        self.push(node);
    }

    fn target(&mut self) -> &mut Vec<RawInline> {
        match self.stack.last_mut() {
            Some((_, children)) => children,
            None => &mut self.done,
        }
    }

    fn push(&mut self, node: RawInline) {
        self.target().push(node);
    }

    /// Adjacent text is merged (the tokenizer splits text at special characters).
    fn push_text(&mut self, text: &str) {
        let target = self.target();
        if let Some(RawInline::Text(prev)) = target.last_mut() {
            prev.push_str(text);
        } else {
            target.push(RawInline::Text(text.to_string()));
        }
    }

    fn separate(&mut self) {
        let target = self.target();
        if !target.is_empty() && target.last() != Some(&RawInline::Break) {
            target.push(RawInline::Break);
        }
    }

    /// Consume an inline event. Returns false when the event is not phrasing content.
    fn event(&mut self, event: &Event<'_>) -> bool {
        match event {
            Event::Start(Tag::Emphasis) => self.open(OpenInline::Emphasis),
            Event::Start(Tag::Strong) => self.open(OpenInline::Strong),
            Event::Start(Tag::Strikethrough) => self.open(OpenInline::Strikethrough),
            Event::Start(Tag::Link(_, dest, title)) => self.open(OpenInline::Link {
                url: dest.to_string(),
                title: non_empty(title),
            }),
            Event::Start(Tag::Image(_, dest, title)) => self.open(OpenInline::Image {
                url: dest.to_string(),
                title: non_empty(title),
            }),
            Event::End(Tag::Emphasis | Tag::Strong | Tag::Strikethrough | Tag::Link(..) | Tag::Image(..)) => {
                self.close()
            }
            Event::Text(t) => self.push_text(t),
            Event::Code(t) => self.push(RawInline::Code(t.to_string())),
            Event::SoftBreak => self.push_text("\n"),
            Event::HardBreak => self.push(RawInline::Break),
            Event::Html(h) => self.push(RawInline::Html(h.to_string())),
            Event::FootnoteReference(label) => self.push_text(&format!("[^{label}]")),
            Event::TaskListMarker(done) => self.push_text(if *done { "[x] " } else { "[ ] " }),
            _ => return false,
        }
        true
    }

    fn finish(mut self) -> Vec<RawInline> {
        while !self.stack.is_empty() {
            self.close();
        }
        self.done
    }
}

fn non_empty(s: &str) -> Option<String> {
    if s.is_empty() { None } else { Some(s.to_string()) }
}

#[derive(Debug)]
enum CompoundKind {
    List { ordered: bool, start: Option<u64> },
    Quote,
}

/// A fenced or indented code block opened inside a list or block quote.
#[derive(Debug)]
struct NestedCode {
    range: Range<usize>,
    info: Option<String>,
    text: String,
    text_start: Option<usize>,
}

/// Block-level state while a top-level construct is open.
#[derive(Debug)]
enum Frame {
    Paragraph {
        range: Range<usize>,
        inlines: InlineCollector,
    },
    Heading {
        range: Range<usize>,
        level: u8,
        explicit_id: Option<String>,
        inlines: InlineCollector,
    },
    Code {
        range: Range<usize>,
        info: Option<String>,
        text: String,
        text_start: Option<usize>,
    },
    /// Lists and block quotes. Nested block structure is flattened into
    /// phrasing content separated by line breaks. A `ui:` fence splits the
    /// construct: the part before it, the typed block, then the rest.
    Compound {
        range: Range<usize>,
        kind: CompoundKind,
        depth: usize,
        items: Vec<Vec<RawInline>>,
        current: InlineCollector,
        code: Option<NestedCode>,
        split: bool,
    },
}

struct FragmentBuilder<'f, 'i> {
    fragment: &'f str,
    base: usize,
    index: &'i LineIndex,
    nodes: Vec<RawNode>,
    diagnostics: Vec<Diagnostic>,
    frame: Option<Frame>,
    pending_html: Option<(Range<usize>, String)>,
}

impl FragmentBuilder<'_, '_> {
    fn span(&self, range: &Range<usize>) -> Span {
        self.index.span(self.base + range.start..self.base + range.end)
    }

    fn flush_html(&mut self) {
        if let Some((range, html)) = self.pending_html.take() {
            let span = self.span(&range);
            self.nodes.push(RawNode::Html { html, span });
        }
    }

    fn event(&mut self, event: Event<'_>, range: Range<usize>) {
        match self.frame.take() {
            None => self.top_level(event, range),
            Some(frame) => self.frame = self.in_frame(frame, event, range),
        }
    }

    fn top_level(&mut self, event: Event<'_>, range: Range<usize>) {
        if let Event::Html(html) = &event {
            match &mut self.pending_html {
                Some((r, buf)) => {
                    r.end = range.end;
                    buf.push_str(html);
                }
                None => self.pending_html = Some((range, html.to_string())),
            }
            return;
        }
        self.flush_html();

        self.frame = match event {
            Event::Start(Tag::Paragraph) => Some(Frame::Paragraph { range, inlines: InlineCollector::default() }),
            Event::Start(Tag::Heading(level, id, _)) => Some(Frame::Heading {
                range,
                level: heading_level(level),
                explicit_id: id.map(str::to_string),
                inlines: InlineCollector::default(),
            }),
            Event::Start(Tag::CodeBlock(kind)) => Some(Frame::Code {
                range,
                info: match kind {
                    CodeBlockKind::Fenced(info) => Some(info.to_string()),
                    CodeBlockKind::Indented => None,
                },
                text: String::new(),
                text_start: None,
            }),
            Event::Start(Tag::List(start)) => Some(Frame::Compound {
                range,
                kind: CompoundKind::List { ordered: start.is_some(), start },
                depth: 0,
                items: Vec::new(),
                current: InlineCollector::default(),
                code: None,
                split: false,
            }),
            Event::Start(Tag::BlockQuote) => Some(Frame::Compound {
                range,
                kind: CompoundKind::Quote,
                depth: 0,
                items: Vec::new(),
                current: InlineCollector::default(),
                code: None,
                split: false,
            }),
            Event::Rule => {
                let span = self.span(&range);
                self.nodes.push(RawNode::Rule { span });
                None
            }
            _ => None,
        };
    }

    /// Feed an event to the open frame; returns the frame if it stays open.
    fn in_frame(&mut self, frame: Frame, event: Event<'_>, event_range: Range<usize>) -> Option<Frame> {
        match frame {
            Frame::Paragraph { range, mut inlines } => {
                if let Event::End(Tag::Paragraph) = event {
                    let span = self.span(&range);
                    self.nodes.push(RawNode::Paragraph { inlines: inlines.finish(), span });
                    return None;
                }
                inlines.event(&event);
                Some(Frame::Paragraph { range, inlines })
            }
            Frame::Heading { range, level, explicit_id, mut inlines } => {
                if let Event::End(Tag::Heading(..)) = event {
                    let span = self.span(&range);
                    self.nodes.push(RawNode::Heading { level, explicit_id, inlines: inlines.finish(), span });
                    return None;
                }
                inlines.event(&event);
                Some(Frame::Heading { range, level, explicit_id, inlines })
            }
            Frame::Code { range, info, mut text, mut text_start } => match event {
                Event::Text(t) => {
                    // Offsets of text inside a code block are fragment-relative.
                    if text_start.is_none() {
                        text_start = Some(self.text_offset(&range, &t));
                    }
                    text.push_str(&t);
                    Some(Frame::Code { range, info, text, text_start })
                }
                Event::End(Tag::CodeBlock(_)) => {
                    self.finish_code(range, info, text, text_start);
                    None
                }
                _ => Some(Frame::Code { range, info, text, text_start }),
            },
            Frame::Compound { mut range, kind, mut depth, mut items, mut current, mut code, mut split } => {
                match event {
                    Event::End(Tag::List(_) | Tag::BlockQuote) if depth == 0 => {
                        self.push_compound(&kind, range, items, current, split);
                        return None;
                    }
                    Event::Start(Tag::List(_) | Tag::BlockQuote) => {
                        depth += 1;
                        current.separate();
                    }
                    Event::End(Tag::List(_) | Tag::BlockQuote) => depth -= 1,
                    Event::Start(Tag::Item) if depth == 0 && matches!(kind, CompoundKind::List { .. }) => {
                        current = InlineCollector::default();
                    }
                    Event::End(Tag::Item) if depth == 0 && matches!(kind, CompoundKind::List { .. }) => {
                        // an item emptied by a lifted fence is not repeated after it
                        if !(split && current.is_empty()) {
                            items.push(std::mem::take(&mut current).finish());
                        }
                    }
                    Event::Start(Tag::Item | Tag::Paragraph | Tag::Heading(..)) | Event::Rule => current.separate(),
                    Event::Start(Tag::CodeBlock(block_kind)) => {
                        code = Some(NestedCode {
                            range: event_range,
                            info: match block_kind {
                                CodeBlockKind::Fenced(info) => Some(info.to_string()),
                                CodeBlockKind::Indented => None,
                            },
                            text: String::new(),
                            text_start: None,
                        });
                    }
                    Event::End(Tag::CodeBlock(_)) => {
                        if let Some(nested) = code.take() {
                            let block_range = nested.range.clone();
                            match self.finish_nested_code(nested) {
                                Some(RawNode::Typed(typed)) => {
                                    let before = range.start..block_range.start;
                                    self.push_compound(
                                        &kind,
                                        before,
                                        std::mem::take(&mut items),
                                        std::mem::take(&mut current),
                                        true,
                                    );
                                    self.nodes.push(RawNode::Typed(typed));
                                    range.start = block_range.end.min(range.end);
                                    split = true;
                                }
                                Some(RawNode::Code { code: text, .. }) => {
                                    current.separate();
                                    current.push(RawInline::Code(text));
                                }
                                _ => {}
                            }
                        }
                    }
                    Event::Text(t) if code.is_some() => {
                        if let Some(nested) = code.as_mut() {
                            if nested.text_start.is_none() {
                                nested.text_start = Some(self.text_offset(&nested.range, &t));
                            }
                            nested.text.push_str(&t);
                        }
                    }
                    other => {
                        current.event(&other);
                    }
                }
                Some(Frame::Compound { range, kind, depth, items, current, code, split })
            }
        }
    }

    /// Emit one part of a list or block quote. After a split, parts left
    /// without content are skipped.
    fn push_compound(
        &mut self,
        kind: &CompoundKind,
        range: Range<usize>,
        mut items: Vec<Vec<RawInline>>,
        current: InlineCollector,
        skip_empty: bool,
    ) {
        let span = self.span(&range);
        let node = match *kind {
            CompoundKind::List { ordered, start } => {
                if !current.is_empty() {
                    items.push(current.finish());
                }
                if skip_empty && items.is_empty() {
                    return;
                }
                RawNode::List { ordered, start, items, span }
            }
            CompoundKind::Quote => {
                let inlines = current.finish();
                if skip_empty && inlines.is_empty() {
                    return;
                }
                RawNode::Quote { inlines, span }
            }
        };
        self.nodes.push(node);
    }

    /// Close a code block found inside a list or block quote. Returns a
    /// typed node to lift out, a code node to inline, or nothing when an
    /// unterminated fence was discarded.
    fn finish_nested_code(&mut self, nested: NestedCode) -> Option<RawNode> {
        let span = self.span(&nested.range);
        let Some(info) = nested.info else {
            return Some(RawNode::Code { language: None, code: nested.text, span });
        };
        let tag = info.split_whitespace().next().unwrap_or("").to_string();
        if !nested_fence_is_closed(&self.fragment[nested.range.clone()]) {
            self.unterminated_fence(&tag, span);
            return None;
        }
        if !block_types::is_typed(&tag) {
            return Some(RawNode::Code {
                language: if tag.is_empty() { None } else { Some(tag) },
                code: nested.text,
                span,
            });
        }
        self.diagnostics.push(
            Diagnostic::warning(
                DiagnosticCode::TypedBlockLifted,
                DiagnosticSource::Parser,
                format!("'{tag}' block inside a list or block quote is moved out to the top level"),
            )
            .with_position(span),
        );
        Some(RawNode::Typed(TypedBlockNode {
            type_name: tag,
            payload: nested.text,
            payload_offset: nested.text_start.unwrap_or(self.base + nested.range.end),
            span,
        }))
    }

    /// Locate a code text event inside its block. The offset iterator reports
    /// the text's own range only through the event stream, so search the block
    /// source for its first line after the opening line. Inside lists and
    /// quotes the text has its container prefix removed, hence one line.
    fn text_offset(&self, block: &Range<usize>, text: &str) -> usize {
        let src = &self.fragment[block.clone()];
        let after_open = src.find('\n').map_or(src.len(), |i| i + 1);
        let first_line = text.lines().next().unwrap_or("");
        let found = src[after_open..].find(first_line).map_or(after_open, |i| after_open + i);
        self.base + block.start + found
    }

    fn unterminated_fence(&mut self, tag: &str, span: Span) {
        self.diagnostics.push(
            Diagnostic::error(
                DiagnosticCode::UnterminatedFence,
                DiagnosticSource::Parser,
                if tag.is_empty() {
                    "unterminated code fence; block discarded".to_string()
                } else {
                    format!("unterminated '{tag}' fence; block discarded")
                },
            )
            .with_position(span),
        );
    }

    fn finish_code(&mut self, range: Range<usize>, info: Option<String>, text: String, text_start: Option<usize>) {
        let span = self.span(&range);
        let Some(info) = info else {
            self.nodes.push(RawNode::Code { language: None, code: text, span });
            return;
        };

        let tag = info.split_whitespace().next().unwrap_or("").to_string();
        if !fence_is_closed(&self.fragment[range.clone()]) {
            self.unterminated_fence(&tag, span);
            return;
        }

        if block_types::is_typed(&tag) {
            self.nodes.push(RawNode::Typed(TypedBlockNode {
                type_name: tag,
                payload: text,
                payload_offset: text_start.unwrap_or(self.base + range.end),
                span,
            }));
        } else {
            self.nodes.push(RawNode::Code {
                language: if tag.is_empty() { None } else { Some(tag) },
                code: text,
                span,
            });
        }
    }

    fn finish(mut self) -> (Vec<RawNode>, Vec<Diagnostic>) {
        // The event stream always closes what it opens; a frame left here
        // means the input ended inside it.
        if let Some(frame) = self.frame.take() {
            let end = Event::End(match &frame {
                Frame::Paragraph { .. } => Tag::Paragraph,
                Frame::Heading { .. } => Tag::Heading(HeadingLevel::H1, None, Vec::new()),
                Frame::Code { .. } => Tag::CodeBlock(CodeBlockKind::Indented),
                Frame::Compound { .. } => Tag::BlockQuote,
            });
            let at = self.fragment.len();
            self.frame = self.in_frame(frame, end, at..at);
        }
        self.flush_html();
        (self.nodes, self.diagnostics)
    }
}

fn heading_level(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

/// Whether a fenced block's source ends with a closing fence of the same
/// character and at least the opening length.
fn fence_is_closed(block_src: &str) -> bool {
    fence_lines_closed(block_src.trim_start().lines())
}

/// [`fence_is_closed`] for a fence inside block quotes or list items, whose
/// lines carry `>` markers and indentation.
fn nested_fence_is_closed(block_src: &str) -> bool {
    fence_lines_closed(block_src.lines().map(strip_quote_markers))
}

fn strip_quote_markers(line: &str) -> &str {
    let mut rest = line.trim_start();
    while let Some(inner) = rest.strip_prefix('>') {
        rest = inner.trim_start();
    }
    rest
}

fn fence_lines_closed<'a>(mut lines: impl Iterator<Item = &'a str>) -> bool {
    let Some(opening) = lines.next() else {
        return false;
    };
    let opening = opening.trim_start();
    let Some(fence_char) = opening.chars().next().filter(|c| *c == '`' || *c == '~') else {
        return false;
    };
    let open_len = opening.chars().take_while(|c| *c == fence_char).count();

    let last = lines.filter(|l| !l.trim().is_empty()).last();
    match last {
        Some(line) => {
            let t = line.trim();
            t.chars().count() >= open_len && t.chars().all(|c| c == fence_char)
        }
        None => false,
    }
}
