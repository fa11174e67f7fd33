//! HTML rendering for parsed articles.
//!
//! Blocks are translated into pulldown-cmark events and written with its
//! HTML writer, which takes care of escaping.

pub mod config;
pub mod events;
pub mod html;

pub use config::RenderConfig;
pub use html::HtmlRenderer;

use article::Document;

/// Render `doc` with the given configuration.
pub fn render_html(doc: &Document, config: &RenderConfig) -> String {
    HtmlRenderer::new(config.clone()).render(doc)
}
