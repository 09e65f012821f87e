//! Lexical helpers shared by the backends' shader reflection

/// Replaces `//` and `/* */` comments with whitespace
pub fn strip_comments(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut rest = source;
    while !rest.is_empty() {
        if let Some(after) = rest.strip_prefix("//") {
            rest = after.find('\n').map_or("", |i| &after[i..]);
        } else if let Some(after) = rest.strip_prefix("/*") {
            rest = after.find("*/").map_or("", |i| &after[i + 2..]);
            out.push(' ');
        } else {
            let mut chars = rest.chars();
            if let Some(c) = chars.next() {
                out.push(c);
            }
            rest = chars.as_str();
        }
    }
    out
}

pub fn is_identifier_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

pub fn is_identifier(token: &str) -> bool {
    !token.is_empty() && token.chars().all(is_identifier_char)
}

/// Every identifier-like token in `source`
pub fn identifiers(source: &str) -> impl Iterator<Item = &str> {
    source
        .split(|c: char| !is_identifier_char(c))
        .filter(|token| !token.is_empty())
}

/// Byte offset of the first whole-word occurrence of `keyword`
pub fn find_keyword(source: &str, keyword: &str) -> Option<usize> {
    source.match_indices(keyword).map(|(i, _)| i).find(|&i| {
        let before = source[..i].chars().next_back().map_or(true, |c| !is_identifier_char(c));
        let after = source[i + keyword.len()..]
            .chars()
            .next()
            .map_or(true, |c| !is_identifier_char(c));
        before && after
    })
}

/// Index of the bracket closing the one at `open`, honouring nesting
pub fn matching_close(source: &str, open: usize, open_char: char, close_char: char) -> Option<usize> {
    let mut depth = 0usize;
    for (i, c) in source[open..].char_indices() {
        if c == open_char {
            depth += 1;
        } else if c == close_char {
            depth = depth.checked_sub(1)?;
            if depth == 0 {
                return Some(open + i);
            }
        }
    }
    None
}

/// Splits on commas that are not nested inside `<>`, `()` or `[]`
pub fn split_top_level(source: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    for (i, c) in source.char_indices() {
        match c {
            '<' | '(' | '[' => depth += 1,
            '>' | ')' | ']' => depth -= 1,
            ',' if depth == 0 => {
                parts.push(&source[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&source[start..]);
    parts
        .into_iter()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect()
}
