use article::{Block, Document, Span};
use pulldown_cmark::{CodeBlockKind, CowStr, Event, HeadingLevel, LinkType, Tag, TagEnd};

use crate::config::RenderConfig;

/// An open list and the depth of its items.
struct OpenList {
    ordered: bool,
    depth: u8,
}

/// Translates a Document into the pulldown-cmark event stream that the
/// HTML writer consumes.
pub struct EventBuilder<'a, 'c> {
    config: &'c RenderConfig,
    events: Vec<Event<'a>>,
    /// Lists whose last item is still open, outermost first.
    lists: Vec<OpenList>,
}

impl<'a, 'c> EventBuilder<'a, 'c> {
    pub fn new(config: &'c RenderConfig) -> Self {
        EventBuilder {
            config,
            events: Vec::new(),
            lists: Vec::new(),
        }
    }

    /// Build the events for the whole document.
    pub fn build(mut self, doc: &'a Document) -> Vec<Event<'a>> {
        if self.config.standalone {
            self.header(doc);
        }

        let mut anchors = doc.outline().into_iter().map(|entry| entry.anchor);
        for block in doc.blocks() {
            if !block.is_list_item() {
                self.close_all_lists();
            }
            match block {
                Block::Heading { level, text } => {
                    let id = anchors
                        .next()
                        .filter(|_| self.config.heading_anchors)
                        .map(CowStr::from);
                    self.heading(*level, text, id);
                }
                Block::Paragraph { spans } => {
                    self.events.push(Event::Start(Tag::Paragraph));
                    self.spans(spans);
                    self.events.push(Event::End(TagEnd::Paragraph));
                }
                Block::CodeFence { language, raw_text } => {
                    let lang = language.as_deref().unwrap_or("");
                    self.events.push(Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(
                        lang.into(),
                    ))));
                    if !raw_text.is_empty() {
                        self.events.push(Event::Text(raw_text.as_str().into()));
                    }
                    self.events.push(Event::End(TagEnd::CodeBlock));
                }
                Block::ListItem {
                    ordered,
                    depth,
                    number,
                    spans,
                } => {
                    self.list_item(*ordered, *depth, *number);
                    self.spans(spans);
                }
                Block::Quote { spans } => {
                    self.events.push(Event::Start(Tag::BlockQuote(None)));
                    self.events.push(Event::Start(Tag::Paragraph));
                    self.spans(spans);
                    self.events.push(Event::End(TagEnd::Paragraph));
                    self.events.push(Event::End(TagEnd::BlockQuote(None)));
                }
                Block::Link { text, url } => {
                    self.events.push(Event::Start(Tag::Paragraph));
                    self.link(text, url);
                    self.events.push(Event::End(TagEnd::Paragraph));
                }
                Block::Rule => self.events.push(Event::Rule),
            }
        }
        self.close_all_lists();

        if self.config.standalone {
            self.events.push(Event::Html("</article>\n".into()));
        }
        self.events
    }

    fn header(&mut self, doc: &'a Document) {
        self.events.push(Event::Html("<article>\n<header>\n".into()));
        self.heading(1, doc.title(), None);
        let date = doc.date().format("%Y-%m-%d").to_string();
        self.events.push(Event::Html(
            format!("<time datetime=\"{}\">{}</time>\n", date, date).into(),
        ));
        if let Some(description) = doc.description() {
            self.events
                .push(Event::Html("<p class=\"description\">".into()));
            self.events.push(Event::Text(description.into()));
            self.events.push(Event::Html("</p>\n".into()));
        }
        self.events.push(Event::Html("</header>\n".into()));
    }

    fn heading(&mut self, level: u8, text: &'a str, id: Option<CowStr<'a>>) {
        let level = HeadingLevel::try_from(level as usize).unwrap_or(HeadingLevel::H6);
        self.events.push(Event::Start(Tag::Heading {
            level,
            id,
            classes: Vec::new(),
            attrs: Vec::new(),
        }));
        self.events.push(Event::Text(text.into()));
        self.events.push(Event::End(TagEnd::Heading(level)));
    }

    fn spans(&mut self, spans: &'a [Span]) {
        for span in spans {
            match span {
                Span::Text { value } => self.events.push(Event::Text(value.as_str().into())),
                Span::Emphasis { value, strong } => {
                    let (start, end) = if *strong {
                        (Tag::Strong, TagEnd::Strong)
                    } else {
                        (Tag::Emphasis, TagEnd::Emphasis)
                    };
                    self.events.push(Event::Start(start));
                    self.events.push(Event::Text(value.as_str().into()));
                    self.events.push(Event::End(end));
                }
                Span::InlineCode { value } => self.events.push(Event::Code(value.as_str().into())),
                Span::Hyperlink { text, url } => self.link(text, url),
            }
        }
    }

    fn link(&mut self, text: &'a str, url: &'a str) {
        let dest_url = match self.config.resolve_url(url) {
            Some(resolved) => CowStr::from(resolved),
            None => CowStr::from(url),
        };
        self.events.push(Event::Start(Tag::Link {
            link_type: LinkType::Inline,
            dest_url,
            title: "".into(),
            id: "".into(),
        }));
        self.events.push(Event::Text(text.into()));
        self.events.push(Event::End(TagEnd::Link));
    }

    /// Open an item, grouping it with the list at the same depth and kind.
    fn list_item(&mut self, ordered: bool, depth: u8, number: Option<u64>) {
        while let Some(top) = self.lists.last() {
            if top.depth > depth || (top.depth == depth && top.ordered != ordered) {
                self.close_list();
            } else {
                break;
            }
        }

        let sibling = self.lists.last().is_some_and(|top| top.depth == depth);
        if sibling {
            self.events.push(Event::End(TagEnd::Item));
        } else {
            let start = ordered.then(|| number.unwrap_or(1));
            self.events.push(Event::Start(Tag::List(start)));
            self.lists.push(OpenList { ordered, depth });
        }
        self.events.push(Event::Start(Tag::Item));
    }

    fn close_list(&mut self) {
        if let Some(list) = self.lists.pop() {
            self.events.push(Event::End(TagEnd::Item));
            self.events.push(Event::End(TagEnd::List(list.ordered)));
        }
    }

    fn close_all_lists(&mut self) {
        while !self.lists.is_empty() {
            self.close_list();
        }
    }
}
