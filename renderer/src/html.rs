use std::io::{self, Write};

use article::Document;
use pulldown_cmark::{Event, html};

use crate::config::RenderConfig;
use crate::events::EventBuilder;

/// Renders Documents to HTML fragments (or standalone `<article>`s).
#[derive(Debug, Clone, Default)]
pub struct HtmlRenderer {
    config: RenderConfig,
}

impl HtmlRenderer {
    pub fn new(config: RenderConfig) -> Self {
        HtmlRenderer { config }
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// The event stream for `doc`, in block order.
    pub fn events<'a>(&self, doc: &'a Document) -> Vec<Event<'a>> {
        EventBuilder::new(&self.config).build(doc)
    }

    pub fn render(&self, doc: &Document) -> String {
        let events = self.events(doc);
        let count = events.len();
        let mut out = String::new();
        html::push_html(&mut out, events.into_iter());
        tracing::debug!(slug = doc.slug(), events = count, bytes = out.len(), "rendered html");
        out
    }

    pub fn render_to<W: Write>(&self, doc: &Document, mut out: W) -> io::Result<()> {
        out.write_all(self.render(doc).as_bytes())?;
        out.flush()
    }
}
