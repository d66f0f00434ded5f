//! Step and transform pattern compilation.
//!
//! Two pattern flavours are accepted:
//!
//! - a pattern starting with `^` is a regular expression, anchored at both ends
//!   regardless of whether it ends in `$`;
//! - anything else is a placeholder pattern: literal text with `{name}` or
//!   `{name:type}` placeholders. Integer and float type hints narrow the
//!   capture; any other hint (or none) captures lazily. `{{` and `}}` produce
//!   literal braces and `\` escapes the following character.
//!
//! ```
//! use stepwright::registry::Pattern;
//!
//! let pattern = Pattern::compile("I have {count:u32} {fruit}").expect("valid pattern");
//! assert_eq!(
//!     pattern.captures("I have 3 apples"),
//!     Some(vec![String::from("3"), String::from("apples")])
//! );
//! assert_eq!(pattern.captures("I have many apples"), None);
//! ```

use std::fmt;
use std::iter::Peekable;
use std::str::Chars;

use regex::Regex;

use crate::error::RegistrationError;

/// A compiled, fully anchored, case-sensitive pattern.
#[derive(Clone)]
pub struct Pattern {
    source: String,
    regex: Regex,
}

impl Pattern {
    /// Compiles a regex or placeholder pattern.
    ///
    /// # Errors
    ///
    /// Returns [`RegistrationError::InvalidPattern`] when the placeholder
    /// syntax is malformed or the resulting regular expression is invalid.
    pub fn compile(source: &str) -> Result<Self, RegistrationError> {
        let anchored = if source.starts_with('^') {
            format!("^(?:{source})$")
        } else {
            placeholder_regex(source).map_err(|reason| invalid(source, reason))?
        };
        let regex = Regex::new(&anchored).map_err(|err| invalid(source, err.to_string()))?;
        Ok(Self {
            source: source.to_owned(),
            regex,
        })
    }

    /// Returns the pattern as registered.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Returns the anchored regular expression the pattern compiled to.
    #[must_use]
    pub fn as_regex(&self) -> &Regex {
        &self.regex
    }

    /// Returns whether `text` matches the whole pattern.
    #[must_use]
    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }

    /// Returns the capture groups for `text` in positional order, or `None`
    /// when the text does not match.
    ///
    /// Named groups are included in position. A group that did not take part
    /// in the match yields an empty string.
    #[must_use]
    pub fn captures(&self, text: &str) -> Option<Vec<String>> {
        let caps = self.regex.captures(text)?;
        Some(
            caps.iter()
                .skip(1)
                .map(|group| group.map_or_else(String::new, |m| m.as_str().to_owned()))
                .collect(),
        )
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Pattern").field(&self.source).finish()
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

fn invalid(source: &str, reason: impl Into<String>) -> RegistrationError {
    RegistrationError::InvalidPattern {
        pattern: source.to_owned(),
        reason: reason.into(),
    }
}

fn type_hint_regex(hint: Option<&str>) -> &'static str {
    match hint {
        Some("u8" | "u16" | "u32" | "u64" | "u128" | "usize") => r"\d+",
        Some("i8" | "i16" | "i32" | "i64" | "i128" | "isize") => r"[+-]?\d+",
        Some("f32" | "f64") => {
            r"(?i:(?:[+-]?(?:\d+\.\d*|\.\d+|\d+)(?:[eE][+-]?\d+)?|nan|inf|infinity))"
        }
        _ => r".+?",
    }
}

fn placeholder_regex(source: &str) -> Result<String, String> {
    let mut chars = source.chars().peekable();
    let mut output = String::with_capacity(source.len().saturating_mul(2).saturating_add(2));
    output.push('^');

    while let Some(ch) = chars.next() {
        match ch {
            '\\' => {
                let escaped = chars.next().unwrap_or('\\');
                push_literal(&mut output, escaped);
            }
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                push_literal(&mut output, '{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                push_literal(&mut output, '}');
            }
            '{' => {
                let hint = parse_placeholder(&mut chars)?;
                output.push('(');
                output.push_str(type_hint_regex(hint.as_deref()));
                output.push(')');
            }
            '}' => return Err(String::from("unmatched '}'; use '}}' for a literal brace")),
            other => push_literal(&mut output, other),
        }
    }

    output.push('$');
    Ok(output)
}

/// Consumes `name[:type]}` after an opening brace and returns the type hint.
fn parse_placeholder(chars: &mut Peekable<Chars<'_>>) -> Result<Option<String>, String> {
    let mut name = String::new();
    while let Some(&ch) = chars.peek() {
        if ch.is_ascii_alphanumeric() || ch == '_' {
            name.push(ch);
            chars.next();
        } else {
            break;
        }
    }
    if !name.starts_with(|ch: char| ch.is_ascii_alphabetic() || ch == '_') {
        return Err(String::from(
            "placeholder name must start with a letter or '_'; use '{{' for a literal brace",
        ));
    }

    match chars.next() {
        Some('}') => Ok(None),
        Some(':') => {
            let mut hint = String::new();
            for ch in chars.by_ref() {
                if ch == '}' {
                    if hint.is_empty() || hint.contains(char::is_whitespace) {
                        return Err(format!("invalid type hint for placeholder '{name}'"));
                    }
                    return Ok(Some(hint));
                }
                hint.push(ch);
            }
            Err(format!("missing closing '}}' for placeholder '{name}'"))
        }
        Some(_) => Err(format!("invalid character in placeholder '{name}'")),
        None => Err(format!("missing closing '}}' for placeholder '{name}'")),
    }
}

fn push_literal(output: &mut String, ch: char) {
    let mut buffer = [0_u8; 4];
    output.push_str(&regex::escape(ch.encode_utf8(&mut buffer)));
}
