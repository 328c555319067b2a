//! Token-based SQL template rendering.
//!
//! Templates use positional placeholders (`{0}`, `{1}`, or `{}` for the next
//! argument). What a placeholder turns into depends on the token passed for
//! it, so templates stay dialect-agnostic while quoting and literal escaping
//! come from the [`Dialect`].

use crate::dialect::Dialect;
use crate::error::{MigrationError, Result};
use crate::schema::Value;

/// A template argument.
#[derive(Debug, Clone, PartialEq)]
pub enum Token<'a> {
    /// Quoted identifier.
    Identifier(&'a str),
    /// Comma-joined list of quoted identifiers.
    IdentifierList(Vec<&'a str>),
    /// SQL literal.
    Literal(Value),
    /// Value inserted as-is.
    Plain(String),
}

impl<'a> Token<'a> {
    /// Identifier list from any string slice collection.
    pub fn idents<S: AsRef<str> + 'a>(names: &'a [S]) -> Self {
        Self::IdentifierList(names.iter().map(|n| n.as_ref()).collect())
    }

    /// Literal from anything convertible to a [`Value`].
    pub fn literal(value: impl Into<Value>) -> Self {
        Self::Literal(value.into())
    }

    /// Plain text using its `Display` rendering.
    pub fn plain(value: impl std::fmt::Display) -> Self {
        Self::Plain(value.to_string())
    }
}

/// Renders templates for one dialect.
#[derive(Debug, Clone, Copy)]
pub struct SqlFormatter<'d> {
    dialect: &'d Dialect,
}

impl<'d> SqlFormatter<'d> {
    /// Create a formatter for a dialect.
    #[must_use]
    pub fn new(dialect: &'d Dialect) -> Self {
        Self { dialect }
    }

    /// The dialect escaping is delegated to.
    #[must_use]
    pub fn dialect(&self) -> &'d Dialect {
        self.dialect
    }

    /// Quote one identifier.
    #[must_use]
    pub fn quote(&self, name: &str) -> String {
        self.dialect.quote_identifier(name)
    }

    /// Quote and comma-join identifiers.
    #[must_use]
    pub fn quote_list<S: AsRef<str>>(&self, names: &[S]) -> String {
        names
            .iter()
            .map(|n| self.dialect.quote_identifier(n.as_ref()))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Render a value as a SQL literal.
    #[must_use]
    pub fn literal(&self, value: &Value) -> String {
        self.dialect.literal(value)
    }

    /// Render a value as a comparison-safe text literal, for catalog lookups.
    #[must_use]
    pub fn text(&self, value: &str) -> String {
        self.dialect.literal(&Value::Text(value.to_string()))
    }

    /// Render `a = 'x', b = 'y'` pairs for an UPDATE.
    pub fn join_columns_and_values<S: AsRef<str>>(
        &self,
        columns: &[S],
        values: &[Value],
    ) -> Result<String> {
        check_arity(columns.len(), values.len())?;
        check_values(values)?;
        Ok(columns
            .iter()
            .zip(values)
            .map(|(c, v)| format!("{} = {}", self.quote(c.as_ref()), self.literal(v)))
            .collect::<Vec<_>>()
            .join(", "))
    }

    /// Render a template.
    pub fn format(&self, template: &str, tokens: &[Token<'_>]) -> Result<String> {
        for token in tokens {
            if let Token::Literal(value) = token {
                check_value(value)?;
            }
        }
        let mut out = String::with_capacity(template.len());
        let mut chars = template.chars().peekable();
        let mut next_auto = 0usize;

        while let Some(c) = chars.next() {
            match c {
                '{' if chars.peek() == Some(&'{') => {
                    chars.next();
                    out.push('{');
                }
                '{' => {
                    let mut placeholder = String::new();
                    loop {
                        match chars.next() {
                            Some('}') => break,
                            Some(ch) => placeholder.push(ch),
                            None => {
                                return Err(MigrationError::invalid_input(format!(
                                    "Unterminated placeholder in template: {template}"
                                )))
                            }
                        }
                    }
                    let index = if placeholder.trim().is_empty() {
                        next_auto += 1;
                        next_auto - 1
                    } else {
                        placeholder.trim().parse::<usize>().map_err(|_| {
                            MigrationError::invalid_input(format!("Invalid placeholder {{{placeholder}}}"))
                        })?
                    };
                    let token = tokens.get(index).ok_or_else(|| {
                        MigrationError::invalid_input(format!(
                            "Placeholder {{{index}}} has no argument ({} given)",
                            tokens.len()
                        ))
                    })?;
                    self.render_token(&mut out, token);
                }
                '}' if chars.peek() == Some(&'}') => {
                    chars.next();
                    out.push('}');
                }
                '}' => {
                    return Err(MigrationError::invalid_input(format!(
                        "Unmatched '}}' in template: {template}"
                    )))
                }
                _ => out.push(c),
            }
        }

        Ok(out)
    }

    fn render_token(&self, out: &mut String, token: &Token<'_>) {
        match token {
            Token::Identifier(name) => out.push_str(&self.quote(name)),
            Token::IdentifierList(names) => out.push_str(&self.quote_list(names)),
            Token::Literal(value) => out.push_str(&self.literal(value)),
            Token::Plain(text) => out.push_str(text),
        }
    }
}

pub(crate) fn check_arity(columns: usize, values: usize) -> Result<()> {
    if columns == values {
        Ok(())
    } else {
        Err(MigrationError::invalid_input(format!(
            "{columns} column(s) but {values} value(s)"
        )))
    }
}

/// Reject values that have no SQL literal form.
pub(crate) fn check_value(value: &Value) -> Result<()> {
    match value {
        Value::Float(f) if !f.is_finite() => Err(MigrationError::invalid_input(format!(
            "{f} has no SQL literal"
        ))),
        _ => Ok(()),
    }
}

pub(crate) fn check_values(values: &[Value]) -> Result<()> {
    values.iter().try_for_each(check_value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::Dialect;

    #[test]
    fn test_identifier_tokens() {
        let dialect = Dialect::sqlite();
        let fmt = dialect.formatter();
        let sql = fmt
            .format(
                "SELECT {0} FROM {1} ORDER BY {0}",
                &[Token::Identifier("TestId"), Token::Identifier("TestTwo")],
            )
            .unwrap();
        assert_eq!(sql, r#"SELECT "TestId" FROM "TestTwo" ORDER BY "TestId""#);
    }

    #[test]
    fn test_list_literal_and_plain_tokens() {
        let dialect = Dialect::sqlite();
        let fmt = dialect.formatter();
        let cols = ["a", "b"];
        let sql = fmt
            .format(
                "SELECT {} FROM t WHERE x = {} AND y = {} LIMIT {}",
                &[
                    Token::idents(&cols),
                    Token::literal("Muad'Dib"),
                    Token::literal(None::<i64>),
                    Token::plain(5),
                ],
            )
            .unwrap();
        assert_eq!(
            sql,
            r#"SELECT "a", "b" FROM t WHERE x = 'Muad''Dib' AND y = NULL LIMIT 5"#
        );
    }

    #[test]
    fn test_escaped_braces() {
        let dialect = Dialect::sqlite();
        let sql = dialect
            .formatter()
            .format("SELECT '{{}}', {0}", &[Token::plain(1)])
            .unwrap();
        assert_eq!(sql, "SELECT '{}', 1");
    }

    #[test]
    fn test_missing_argument_is_rejected() {
        let dialect = Dialect::sqlite();
        let err = dialect
            .formatter()
            .format("{0} {1}", &[Token::plain(1)])
            .unwrap_err();
        assert!(matches!(err, MigrationError::InvalidInput(_)));
    }

    #[test]
    fn test_join_columns_and_values() {
        let dialect = Dialect::sqlite();
        let result = dialect
            .formatter()
            .join_columns_and_values(&["foo", "bar"], &["123".into(), "456".into()])
            .unwrap();
        assert_eq!(result, r#""foo" = '123', "bar" = '456'"#);

        assert!(dialect
            .formatter()
            .join_columns_and_values(&["foo"], &[])
            .is_err());
    }

    #[test]
    fn test_nan_literal_is_rejected() {
        let dialect = Dialect::sqlite();
        let err = dialect
            .formatter()
            .format("SELECT {0}", &[Token::Literal(Value::Float(f64::NAN))])
            .unwrap_err();
        assert!(matches!(err, MigrationError::InvalidInput(_)));
    }
}
