/// URL-safe slug: ASCII letters and digits are lowercased and kept along
/// with underscores. Runs of whitespace and hyphens collapse to one hyphen,
/// never at either end. Punctuation and non-ASCII characters are dropped.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_dash = false;

    for c in text.chars() {
        if c.is_ascii_alphanumeric() || c == '_' {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else if c.is_whitespace() || c == '-' {
            pending_dash = true;
        }
        // Anything else (punctuation, non-ASCII) is dropped.
    }
    slug
}

/// Slugs typed by users must already be URL-safe.
pub fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty()
        && slug
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}
