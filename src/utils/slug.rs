//! Slugification and identifier sanitization.
//!
//! Converts arbitrary plugin-supplied strings to URL slugs and to valid
//! GraphQL identifiers.

use deunicode::deunicode;
use regex::Regex;
use std::borrow::Cow;
use std::sync::LazyLock;

/// Runs of characters that are not allowed in a slug
static NON_SLUG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9]+").expect("slug pattern is valid"));

// ============================================================================
// Slugification
// ============================================================================

/// Convert text to a URL slug.
///
/// Non-ASCII text is transliterated first, so the result does not depend on
/// the process locale. Idempotent: `slugify(&slugify(x)) == slugify(x)`.
///
/// | Input | Output |
/// |-------|--------|
/// | `"Héllo World!"` | `"hello-world"` |
/// | `"  Rust & Go  "` | `"rust-go"` |
/// | `"你好"` | `"ni-hao"` |
pub fn slugify(text: &str) -> String {
    let ascii = deunicode(text).to_ascii_lowercase();
    NON_SLUG.replace_all(&ascii, "-").trim_matches('-').to_owned()
}

// ============================================================================
// Identifiers
// ============================================================================

/// Whether `c` may appear in a GraphQL identifier
#[inline]
const fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Sanitize a raw data key into a valid GraphQL identifier.
///
/// Prefixes `_` when the key starts with a digit and replaces every character
/// outside `[A-Za-z0-9_]` with `_`. Keys that are already valid are borrowed.
///
/// | Raw key | Identifier |
/// |---------|------------|
/// | `"title"` | `"title"` |
/// | `"123"` | `"_123"` |
/// | `"456-test"` | `"_456_test"` |
/// | `"föo bar"` | `"f_o_bar"` |
pub fn sanitize_identifier(raw: &str) -> Cow<'_, str> {
    let leading_digit = raw.starts_with(|c: char| c.is_ascii_digit());
    if !raw.is_empty() && !leading_digit && raw.chars().all(is_ident_char) {
        return Cow::Borrowed(raw);
    }

    let mut ident = String::with_capacity(raw.len() + 1);
    if leading_digit || raw.is_empty() {
        ident.push('_');
    }
    ident.extend(raw.chars().map(|c| if is_ident_char(c) { c } else { '_' }));
    Cow::Owned(ident)
}

/// Create a content type name from an arbitrary string.
pub fn create_type_name(raw: &str) -> String {
    sanitize_identifier(raw.trim()).into_owned()
}

/// Upper-case the first character: `"meta"` → `"Meta"`.
pub fn pascal_case(ident: &str) -> String {
    let mut chars = ident.chars();
    match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}

/// Lower-case the first character: `"BlogPost"` → `"blogPost"`.
pub fn camel_case(ident: &str) -> String {
    let mut chars = ident.chars();
    match chars.next() {
        Some(first) => first.to_ascii_lowercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}
