use std::cmp::Ordering;

#[derive(Debug, PartialEq, Eq)]
enum Chunk<'a> {
    Text(String),
    Number(&'a str),
}

fn chunks(s: &str) -> Vec<Chunk<'_>> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut in_digits = false;
    for (idx, ch) in s.char_indices() {
        let is_digit = ch.is_ascii_digit();
        if idx > start && is_digit != in_digits {
            out.push(chunk(&s[start..idx], in_digits));
            start = idx;
        }
        in_digits = is_digit;
    }
    if start < s.len() {
        out.push(chunk(&s[start..], in_digits));
    }
    out
}

fn chunk(part: &str, digits: bool) -> Chunk<'_> {
    if digits {
        Chunk::Number(part)
    } else {
        Chunk::Text(part.to_lowercase())
    }
}

fn cmp_numeric(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

fn cmp_chunk(a: &Chunk<'_>, b: &Chunk<'_>) -> Ordering {
    match (a, b) {
        (Chunk::Number(a), Chunk::Number(b)) => cmp_numeric(a, b),
        (Chunk::Text(a), Chunk::Text(b)) => a.cmp(b),
        (Chunk::Number(_), Chunk::Text(_)) => Ordering::Less,
        (Chunk::Text(_), Chunk::Number(_)) => Ordering::Greater,
    }
}

/// Human ordering: digit runs compare by value, text compares case-insensitively.
/// Names that tie that way fall back to a plain byte comparison.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let left = chunks(a);
    let right = chunks(b);
    left.iter()
        .zip(right.iter())
        .map(|(l, r)| cmp_chunk(l, r))
        .find(|ord| ord.is_ne())
        .unwrap_or_else(|| left.len().cmp(&right.len()))
        .then_with(|| a.cmp(b))
}
