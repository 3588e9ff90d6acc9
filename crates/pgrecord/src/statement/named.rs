//! Named placeholder compilation (`:name` -> `$n`).

use super::Params;
use crate::error::{OrmError, OrmResult};
use crate::value::Value;

/// A statement ready for `tokio-postgres`: positional SQL plus values in order.
#[derive(Debug)]
pub struct Compiled<'a> {
    pub sql: String,
    pub params: Vec<&'a Value>,
}

pub(crate) fn is_placeholder_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c == '_' || c.is_ascii_alphabetic())
        && chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
}

/// Rewrite `:name` placeholders in `sql` to `$1, $2, ...`.
///
/// Each distinct name gets one position, so a name used twice binds one value.
/// Quoted strings, quoted identifiers, `--` comments and `::` casts are copied
/// as-is. Every placeholder must have a bound value and every bound value must
/// be used.
pub fn compile<'a>(sql: &str, params: &'a Params) -> OrmResult<Compiled<'a>> {
    let mut out = String::with_capacity(sql.len());
    let mut used: Vec<(String, &'a Value)> = Vec::new();
    let mut chars = sql.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\'' | '"' => {
                out.push(c);
                while let Some(ch) = chars.next() {
                    out.push(ch);
                    if ch == c {
                        // Doubled quote is an escape, stay inside the literal.
                        if chars.peek() == Some(&c) {
                            out.push(c);
                            chars.next();
                        } else {
                            break;
                        }
                    }
                }
            }
            '-' if chars.peek() == Some(&'-') => {
                out.push(c);
                for ch in chars.by_ref() {
                    out.push(ch);
                    if ch == '\n' {
                        break;
                    }
                }
            }
            ':' if chars.peek() == Some(&':') => {
                chars.next();
                out.push_str("::");
            }
            ':' if chars
                .peek()
                .is_some_and(|ch| *ch == '_' || ch.is_ascii_alphabetic()) =>
            {
                let mut name = String::new();
                while let Some(&ch) = chars.peek() {
                    if ch == '_' || ch.is_ascii_alphanumeric() {
                        name.push(ch);
                        chars.next();
                    } else {
                        break;
                    }
                }

                let position = match used.iter().position(|(n, _)| *n == name) {
                    Some(i) => i + 1,
                    None => {
                        let value = params.get(&name).ok_or_else(|| {
                            OrmError::validation(format!("no value bound for placeholder :{name}"))
                        })?;
                        used.push((name, value));
                        used.len()
                    }
                };
                out.push('$');
                out.push_str(&position.to_string());
            }
            _ => out.push(c),
        }
    }

    if let Some((key, _)) = params
        .iter()
        .find(|(key, _)| !used.iter().any(|(n, _)| n.as_str() == *key))
    {
        return Err(OrmError::validation(format!(
            "parameter :{key} is bound but not used in the statement"
        )));
    }

    Ok(Compiled {
        sql: out,
        params: used.into_iter().map(|(_, v)| v).collect(),
    })
}
