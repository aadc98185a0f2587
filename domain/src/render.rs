//! Outgoing link construction.
//!
//! Builds the final outbound URL for a stored resource: entity decoding,
//! character encoding, contextual parameter substitution, and the trailing
//! `&` -> `&amp;` pass. The output targets HTML attribute context; callers
//! that need a raw URL (redirects) must go through [`raw_url`].

use crate::context::ContextValues;
use crate::validate::has_known_prefix;
use crate::UrlResource;

/// Decode the HTML entities a stored URI may carry: the named forms produced
/// by attribute escaping (`amp`, `lt`, `gt`, `quot`, `apos`, `nbsp`) plus
/// numeric `&#NN;` / `&#xHH;` references. This is deliberately narrower than
/// a full named-entity table: other named entities (`&eacute;` and friends)
/// are left literal and later encode as `&amp;eacute;`.
pub fn html_entity_decode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(pos) = rest.find('&') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        match decode_entity(tail) {
            Some((ch, len)) => {
                out.push(ch);
                rest = &tail[len..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// Decode one entity at the start of `s` (which begins with `&`).
/// Returns the character and the byte length consumed including `;`.
fn decode_entity(s: &str) -> Option<(char, usize)> {
    let end = s.find(';')?;
    if end > 10 {
        // entities are short; a distant ';' means this '&' is literal
        return None;
    }
    let body = &s[1..end];
    let ch = match body {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => '\u{a0}',
        _ => {
            let num = body.strip_prefix('#')?;
            let code = match num.strip_prefix('x').or_else(|| num.strip_prefix('X')) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => num.parse::<u32>().ok()?,
            };
            char::from_u32(code)?
        }
    };
    Some((ch, end + 1))
}

/// RFC 3986 percent-encoding of a parameter name or value.
pub fn rawurlencode(s: &str) -> String {
    urlencoding::encode(s).into_owned()
}

/// Characters left untouched when encoding an absolute URL. Keeping `%` in
/// the set makes the pass idempotent on already-encoded input.
fn is_allowed_url_char(c: char) -> bool {
    c.is_ascii_alphanumeric()
        || matches!(
            c,
            ';' | '/'
                | '?'
                | ':'
                | '@'
                | '='
                | '&'
                | '$'
                | '_'
                | '.'
                | '+'
                | '!'
                | '*'
                | '('
                | ')'
                | ','
                | '-'
                | '#'
                | '%'
        )
}

/// Return the full outbound link with all extra parameters, `&` encoded as
/// `&amp;`.
pub fn full_url<C: ContextValues + ?Sized>(resource: &UrlResource, context: &C) -> String {
    // make sure there are no encoded entities, it is ok to do this twice
    let decoded = html_entity_decode(&resource.external_url);

    let mut url = if has_known_prefix(&decoded) {
        // encode extra chars - this does not make the URL always valid, but
        // it helps with some UTF-8 problems
        let mut buf = String::with_capacity(decoded.len());
        for c in decoded.chars() {
            if is_allowed_url_char(c) {
                buf.push(c);
            } else {
                buf.push_str(&rawurlencode(&c.to_string()));
            }
        }
        buf
    } else {
        // unknown scheme, encode special chars only
        decoded
            .replace('"', "%22")
            .replace('\'', "%27")
            .replace(' ', "%20")
            .replace('<', "%3C")
            .replace('>', "%3E")
    };

    // add variable link parameters; unresolved variables are dropped
    let mut pairs = Vec::new();
    for (name, variable) in &resource.parameters {
        if let Some(value) = context.resolve(variable) {
            pairs.push(format!("{}={}", rawurlencode(name), rawurlencode(&value)));
        }
    }
    if !pairs.is_empty() {
        if url.to_ascii_lowercase().starts_with("teamspeak://") {
            // teamspeak joins every parameter with '?'
            url.push('?');
            url.push_str(&pairs.join("?"));
        } else {
            url.push(if url.contains('?') { '&' } else { '?' });
            url.push_str(&pairs.join("&"));
        }
    }

    url.replace('&', "&amp;")
}

/// Reverse the `&amp;` pass of [`full_url`] for non-HTML use (redirects).
pub fn raw_url(full: &str) -> String {
    full.replace("&amp;", "&")
}
