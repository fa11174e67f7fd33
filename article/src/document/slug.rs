/// URL-safe anchor for `text`: lowercase alphanumerics joined by single `-`.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_dash = false;
    for c in text.chars() {
        if c.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(c.to_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}

/// A slug must be non-empty and free of whitespace.
pub fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty() && !slug.contains(char::is_whitespace)
}
