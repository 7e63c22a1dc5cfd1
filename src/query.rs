//! Lexical checks on lookup query text.
//!
//! SQLite compiles `:name`, `@name` and `$name` placeholders, but sqlx can
//! only bind positional ones (`?`, `?NNN`, `$NNN`). These helpers scan the
//! query outside string literals, quoted identifiers and comments so such
//! queries are rejected before they reach the request path.

use std::iter::Peekable;
use std::str::CharIndices;

/// Byte offset and char of everything in `sql` that is SQL code rather than
/// a literal, quoted identifier or comment.
fn code_chars(sql: &str) -> Vec<(usize, char)> {
    let mut out = Vec::new();
    let mut chars = sql.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        match c {
            '\'' | '"' | '`' => skip_past(&mut chars, c),
            '[' => skip_past(&mut chars, ']'),
            '-' if next_is(&mut chars, '-') => skip_past(&mut chars, '\n'),
            '/' if next_is(&mut chars, '*') => {
                chars.next();
                let mut prev = '\0';
                for (_, c) in chars.by_ref() {
                    if prev == '*' && c == '/' {
                        break;
                    }
                    prev = c;
                }
            }
            _ => out.push((i, c)),
        }
    }

    out
}

fn next_is(chars: &mut Peekable<CharIndices<'_>>, expected: char) -> bool {
    chars.peek().is_some_and(|&(_, c)| c == expected)
}

fn skip_past(chars: &mut Peekable<CharIndices<'_>>, end: char) {
    for (_, c) in chars.by_ref() {
        if c == end {
            break;
        }
    }
}

fn is_ident(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// The first placeholder sqlx cannot bind, e.g. `:domain`.
#[must_use]
pub fn named_parameter(sql: &str) -> Option<&str> {
    code_chars(sql).into_iter().find_map(|(i, c)| {
        if !matches!(c, ':' | '@' | '$') {
            return None;
        }
        let rest = &sql[i + c.len_utf8()..];
        let len = rest
            .char_indices()
            .find(|&(_, c)| !is_ident(c))
            .map_or(rest.len(), |(n, _)| n);
        let name = &rest[..len];

        if name.is_empty() || (c == '$' && name.bytes().all(|b| b.is_ascii_digit())) {
            None
        } else {
            Some(&sql[i..i + c.len_utf8() + len])
        }
    })
}

/// Number of non-empty `;`-separated statements.
#[must_use]
pub fn statement_count(sql: &str) -> usize {
    let mut count = 0;
    let mut pending = false;

    for (_, c) in code_chars(sql) {
        if c == ';' {
            count += usize::from(pending);
            pending = false;
        } else if !c.is_whitespace() {
            pending = true;
        }
    }

    count + usize::from(pending)
}

/// First keyword of the query, skipping leading whitespace and comments.
#[must_use]
pub fn leading_keyword(sql: &str) -> Option<&str> {
    let code = code_chars(sql);
    let &(start, _) = code.iter().find(|(_, c)| !c.is_whitespace())?;
    let word = &sql[start..];
    let len = word
        .char_indices()
        .find(|&(_, c)| !is_ident(c))
        .map_or(word.len(), |(n, _)| n);
    Some(&word[..len]).filter(|w| !w.is_empty())
}
