use serde::Deserialize;

/// Site-level rendering options, passed explicitly to the renderer.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RenderConfig {
    /// Wrap the body in an `<article>` with a title header.
    pub standalone: bool,
    /// Prefix for relative link targets.
    pub base_url: Option<String>,
    /// Emit `id` attributes on headings.
    pub heading_anchors: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        RenderConfig {
            standalone: false,
            base_url: None,
            heading_anchors: true,
        }
    }
}

impl RenderConfig {
    /// Resolve `url` against `base_url`. Absolute URLs, fragments and
    /// protocol-relative links pass through unchanged.
    pub fn resolve_url(&self, url: &str) -> Option<String> {
        let base = self.base_url.as_deref()?;
        let absolute = url.contains("://")
            || url.starts_with('#')
            || url.starts_with("//")
            || url.starts_with("mailto:");
        if absolute {
            return None;
        }
        let path = url.strip_prefix("./").unwrap_or(url).trim_start_matches('/');
        Some(format!("{}/{}", base.trim_end_matches('/'), path))
    }
}
