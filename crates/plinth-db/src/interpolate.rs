//! Diagnostic substitution of parameters into statement text.
//!
//! Produces a human-readable approximation of what the database ran.
//! The output is for logs only and is never executed, so no injection
//! hardening is attempted beyond basic quote escaping.

use crate::value::{Params, SqlValue};

/// Substitutes parameters into `query` for display.
///
/// Positional parameters replace `?` placeholders left-to-right; named
/// parameters replace their `:key` occurrences. Numeric values stay
/// unquoted, everything else is single-quoted with internal quotes
/// doubled. Leftover placeholders are kept as-is.
pub fn interpolate(query: &str, params: &Params) -> String {
    match params {
        Params::Positional(values) => {
            let mut out = String::with_capacity(query.len());
            let mut next = values.iter();
            for ch in query.chars() {
                if ch == '?' {
                    match next.next() {
                        Some(value) => out.push_str(&render(value)),
                        None => out.push('?'),
                    }
                } else {
                    out.push(ch);
                }
            }
            out
        }
        Params::Named(pairs) => {
            // Longest keys first, so :limit is not clobbered by :li.
            let mut ordered: Vec<&(String, SqlValue)> = pairs.iter().collect();
            ordered.sort_by_key(|(key, _)| std::cmp::Reverse(key.len()));

            let mut out = query.to_string();
            for (key, value) in ordered {
                out = out.replace(&format!(":{key}"), &render(value));
            }
            out
        }
    }
}

fn render(value: &SqlValue) -> String {
    match value {
        SqlValue::Integer(i) => i.to_string(),
        SqlValue::Text(s) if s.parse::<f64>().is_ok() => s.clone(),
        SqlValue::Text(s) => quote(s),
        SqlValue::Json(v) => quote(&v.to_string()),
        SqlValue::Null => "NULL".to_string(),
    }
}

fn quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn positional_placeholders_fill_left_to_right() {
        let params = Params::positional([SqlValue::Integer(1), SqlValue::from("a")]);
        let out = interpolate("SELECT * FROM t WHERE id = ? AND name = ?", &params);
        assert_eq!(out, "SELECT * FROM t WHERE id = 1 AND name = 'a'");
    }

    #[test]
    fn numeric_text_stays_unquoted() {
        let params = Params::positional([SqlValue::from("3.5")]);
        assert_eq!(interpolate("v = ?", &params), "v = 3.5");
    }

    #[test]
    fn internal_quotes_are_escaped() {
        let params = Params::positional([SqlValue::from("it's")]);
        assert_eq!(interpolate("v = ?", &params), "v = 'it''s'");
    }

    #[test]
    fn surplus_placeholders_are_left_alone() {
        let params = Params::positional([SqlValue::Integer(1)]);
        assert_eq!(interpolate("a = ? AND b = ?", &params), "a = 1 AND b = ?");
    }

    #[test]
    fn named_parameters_replace_longest_first() {
        let params = Params::named([
            ("key", SqlValue::from("k")),
            ("keyExtra", SqlValue::Integer(2)),
        ]);
        let out = interpolate("a = :key AND b = :keyExtra", &params);
        assert_eq!(out, "a = 'k' AND b = 2");
    }

    #[test]
    fn null_and_json_render() {
        let params = Params::positional([SqlValue::Null, SqlValue::Json(json!(["x"]))]);
        assert_eq!(interpolate("a = ?, b = ?", &params), "a = NULL, b = '[\"x\"]'");
    }
}
