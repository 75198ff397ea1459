// src/utils/html.rs

/// Whitelist-based sanitization of admin-authored question text.
///
/// Keeps safe inline markup while stripping script-capable tags and event
/// attributes before the text is stored. Clients rendering question content
/// get markup that is already safe to inject.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}
