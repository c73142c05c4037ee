use std::borrow::Cow;

const NAMED: &[(&str, char)] = &[
    ("amp", '&'),
    ("lt", '<'),
    ("gt", '>'),
    ("quot", '"'),
    ("apos", '\''),
    ("nbsp", '\u{a0}'),
];

/// Named references that browsers also accept without the closing `;`.
const LEGACY_NAMED: &[&str] = &["amp", "lt", "gt", "quot", "nbsp"];

/// Decodes the character references that appear in hand-written fragments.
/// Unknown references are kept as written.
pub fn decode_entities(input: &str) -> Cow<'_, str> {
    if !input.contains('&') {
        return Cow::Borrowed(input);
    }
    let mut output = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(position) = rest.find('&') {
        output.push_str(&rest[..position]);
        rest = &rest[position + 1..];
        match decode_reference(rest) {
            Some((character, consumed)) => {
                output.push(character);
                rest = &rest[consumed..];
            }
            None => output.push('&'),
        }
    }
    output.push_str(rest);
    Cow::Owned(output)
}

/// The character referenced right after an `&`, and the bytes it spans.
fn decode_reference(reference: &str) -> Option<(char, usize)> {
    if let Some(number) = reference.strip_prefix('#') {
        let (digits, radix, prefix) = match number.strip_prefix(['x', 'X']) {
            Some(hex) => (hex, 16, 2),
            None => (number, 10, 1),
        };
        let length = digits
            .find(|character: char| !character.is_digit(radix))
            .unwrap_or(digits.len());
        if length == 0 {
            return None;
        }
        let code = u32::from_str_radix(&digits[..length], radix).ok()?;
        let character = char::from_u32(code)?;
        let terminated = digits[length..].starts_with(';');
        return Some((character, prefix + length + usize::from(terminated)));
    }
    NAMED.iter().find_map(|(name, character)| {
        let after = reference.strip_prefix(*name)?;
        if after.starts_with(';') {
            Some((*character, name.len() + 1))
        } else if LEGACY_NAMED.contains(name) {
            Some((*character, name.len()))
        } else {
            None
        }
    })
}

/// Escapes text content.
pub fn escape_text(input: &str) -> Cow<'_, str> {
    escape(input, false)
}

/// Escapes a double-quoted attribute value.
pub fn escape_attribute(input: &str) -> Cow<'_, str> {
    escape(input, true)
}

fn escape(input: &str, attribute: bool) -> Cow<'_, str> {
    let needs_escape = |character: char| {
        matches!(character, '&' | '<' | '>') || (attribute && character == '"')
    };
    if !input.chars().any(needs_escape) {
        return Cow::Borrowed(input);
    }
    let mut output = String::with_capacity(input.len() + 8);
    for character in input.chars() {
        match character {
            '&' => output.push_str("&amp;"),
            '<' => output.push_str("&lt;"),
            '>' => output.push_str("&gt;"),
            '"' if attribute => output.push_str("&quot;"),
            _ => output.push(character),
        }
    }
    Cow::Owned(output)
}
