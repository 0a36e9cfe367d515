/// Decode the small, fixed subset of HTML character references that shows up
/// in attribute payloads which were escaped twice on the way into the page.
///
/// Contract:
/// - Named references decoded: `&amp;`, `&lt;`, `&gt;`, `&quot;`, `&apos;`, `&nbsp;`.
/// - Numeric references decoded only when semicolon-terminated: `&#34;`, `&#x22;`.
/// - Anything else (unknown names, missing `;`, invalid scalars) passes through unchanged.
pub fn decode_entities(s: &str) -> String {
    const NAMED: &[(&str, char)] = &[
        ("&amp;", '&'),
        ("&lt;", '<'),
        ("&gt;", '>'),
        ("&quot;", '"'),
        ("&apos;", '\''),
        ("&nbsp;", '\u{a0}'),
    ];
    const MAX_DIGITS: usize = 7;

    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];

        if let Some((entity, ch)) = NAMED.iter().find(|(e, _)| rest.starts_with(e)) {
            out.push(*ch);
            rest = &rest[entity.len()..];
            continue;
        }

        if let Some((ch, consumed)) = numeric_reference(rest, MAX_DIGITS) {
            out.push(ch);
            rest = &rest[consumed..];
            continue;
        }

        out.push('&');
        rest = &rest[1..];
    }
    out.push_str(rest);
    out
}

// `s` starts with '&'. Returns the decoded char and bytes consumed.
fn numeric_reference(s: &str, max_digits: usize) -> Option<(char, usize)> {
    let body = s.strip_prefix("&#")?;
    let (digits_start, radix) = match body.as_bytes().first() {
        Some(b'x') | Some(b'X') => (1, 16),
        _ => (0, 10),
    };
    let digits = &body[digits_start..];
    let end = digits.find(';')?;
    if end == 0 || end > max_digits || !digits[..end].chars().all(|c| c.is_digit(radix)) {
        return None;
    }
    let value = u32::from_str_radix(&digits[..end], radix).ok()?;
    let ch = char::from_u32(value)?;
    Some((ch, 2 + digits_start + end + 1))
}
