//! Query tokenization for the full-text tier.

/// Tokens beyond this are ignored.
pub const MAX_QUERY_TOKENS: usize = 8;

/// Lower-case the query and split it on runs of non-alphanumerics.
pub fn tokenize(query: &str) -> Vec<String> {
    query
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .take(MAX_QUERY_TOKENS)
        .map(str::to_string)
        .collect()
}

/// FTS5 expression AND-combining a prefix term per token.
///
/// Tokens only contain alphanumerics, so quoting them is enough to keep
/// FTS5 operators out of the expression.
pub fn match_expression(tokens: &[String]) -> Option<String> {
    if tokens.is_empty() {
        return None;
    }
    Some(
        tokens
            .iter()
            .map(|t| format!("\"{}\"*", t))
            .collect::<Vec<_>>()
            .join(" AND "),
    )
}
