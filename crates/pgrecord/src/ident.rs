//! SQL identifier validation.
//!
//! Table and column names are concatenated into SQL text (identifiers cannot
//! be bound as parameters), so every configured name goes through [`Ident`]
//! first.
//!
//! - Unquoted parts must match `[A-Za-z_][A-Za-z0-9_$]*`
//! - Quoted parts (`"CamelCase"`) allow anything except NUL; `""` escapes a quote
//! - Parts may be dotted: `public.demo`, `public."Demo"`

use crate::error::{OrmError, OrmResult};
use std::fmt;

/// A validated SQL identifier, kept in the exact form it was written.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Ident(String);

impl Ident {
    /// Validate an identifier string.
    pub fn parse(s: &str) -> OrmResult<Self> {
        if s.is_empty() {
            return Err(OrmError::validation("Identifier cannot be empty"));
        }
        if s.contains('\0') {
            return Err(OrmError::validation(
                "Identifier cannot contain NUL character",
            ));
        }

        let mut chars = s.chars().peekable();
        loop {
            if chars.peek() == Some(&'"') {
                chars.next();
                let mut len = 0usize;
                loop {
                    match chars.next() {
                        Some('"') if chars.peek() == Some(&'"') => {
                            chars.next();
                            len += 1;
                        }
                        Some('"') => break,
                        Some(_) => len += 1,
                        None => {
                            return Err(OrmError::validation(format!(
                                "Unclosed quoted identifier: {s}"
                            )));
                        }
                    }
                }
                if len == 0 {
                    return Err(OrmError::validation("Empty quoted identifier"));
                }
            } else {
                let mut len = 0usize;
                while let Some(&c) = chars.peek() {
                    if c == '.' {
                        break;
                    }
                    let ok = if len == 0 {
                        c == '_' || c.is_ascii_alphabetic()
                    } else {
                        c == '_' || c == '$' || c.is_ascii_alphanumeric()
                    };
                    if !ok {
                        return Err(OrmError::validation(format!(
                            "Invalid character '{c}' in identifier: {s}"
                        )));
                    }
                    len += 1;
                    chars.next();
                }
                if len == 0 {
                    return Err(OrmError::validation(format!(
                        "Empty identifier segment: {s}"
                    )));
                }
            }

            match chars.next() {
                None => break,
                Some('.') if chars.peek().is_some() => continue,
                Some('.') => {
                    return Err(OrmError::validation(format!(
                        "Trailing '.' in identifier: {s}"
                    )));
                }
                Some(c) => {
                    return Err(OrmError::validation(format!(
                        "Expected '.' between identifier parts, got '{c}': {s}"
                    )));
                }
            }
        }

        Ok(Self(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Validate every name in `names`, returning them as owned strings.
pub(crate) fn validate_all<I, S>(names: I) -> OrmResult<Vec<String>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    names
        .into_iter()
        .map(|n| Ident::parse(n.as_ref()).map(Ident::into_string))
        .collect()
}
