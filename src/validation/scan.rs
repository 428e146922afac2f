//! Low-level text scanning shared by the rules.

/// Copy of `text` with the contents of double-quoted strings blanked out.
///
/// Byte offsets are preserved: every byte inside a string (quotes excluded)
/// becomes a space. An unterminated string is blanked to the end of text.
pub fn mask_strings(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_string = false;
    let mut escaped = false;

    for c in text.chars() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
                out.push('"');
                continue;
            }
            out.extend(std::iter::repeat(' ').take(c.len_utf8()));
        } else {
            if c == '"' {
                in_string = true;
            }
            out.push(c);
        }
    }
    out
}

/// Offset of the bracket closing the one opened at `open`.
pub fn matching_close(text: &str, open: usize) -> Option<usize> {
    let opener = text[open..].chars().next()?;
    let closer = match opener {
        '(' => ')',
        '[' => ']',
        '{' => '}',
        _ => return None,
    };

    let mut depth = 0usize;
    for (i, c) in text[open..].char_indices() {
        if c == opener {
            depth += 1;
        } else if c == closer {
            depth -= 1;
            if depth == 0 {
                return Some(open + i);
            }
        }
    }
    None
}

/// `(start, end)` byte spans of `{...}` blocks, unclosed blocks running to
/// the end of text.
pub fn brace_blocks(text: &str) -> Vec<(usize, usize)> {
    let mut blocks = Vec::new();
    let mut cursor = 0;
    while let Some(found) = text[cursor..].find('{') {
        let open = cursor + found;
        let end = text[open..]
            .find('}')
            .map(|i| open + i + 1)
            .unwrap_or(text.len());
        blocks.push((open, end));
        cursor = end;
    }
    blocks
}

/// Split `text` on commas, using `masked` (same length, strings blanked) to
/// decide where the commas are. Yields `(offset, entry)` pairs.
pub fn split_commas<'a>(text: &'a str, masked: &str) -> Vec<(usize, &'a str)> {
    debug_assert_eq!(text.len(), masked.len());
    let mut entries = Vec::new();
    let mut start = 0;
    for (i, c) in masked.char_indices() {
        if c == ',' {
            entries.push((start, &text[start..i]));
            start = i + 1;
        }
    }
    entries.push((start, &text[start..]));
    entries
}

/// `(start, word)` for every identifier-like word.
pub fn words(text: &str) -> Vec<(usize, &str)> {
    let mut out = Vec::new();
    let mut start = None;
    for (i, c) in text.char_indices() {
        let ident = c == '_' || c == ':' || c.is_ascii_alphanumeric();
        match (ident, start) {
            (true, None) => start = Some(i),
            (false, Some(s)) => {
                out.push((s, &text[s..i]));
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        out.push((s, &text[s..]));
    }
    out
}

/// Offset of the first non-whitespace char at or after `from`.
pub fn skip_whitespace(text: &str, from: usize) -> usize {
    text[from..]
        .char_indices()
        .find(|(_, c)| !c.is_whitespace())
        .map(|(i, _)| from + i)
        .unwrap_or(text.len())
}
