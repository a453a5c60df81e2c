// src/utils/html.rs

/// Clean HTML content using the ammonia library.
///
/// Whitelist-based: safe inline tags (like <b>) survive, <script> and its
/// content, event-handler attributes and similar are stripped. Question and
/// choice text goes through this before it is stored, since admin clients
/// render it as markup.
///
/// The output is HTML, not plain text: a literal `<`, `>` or `&` comes back
/// entity-escaped (`V < 3.0` is stored as `V &lt; 3.0`).
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}
