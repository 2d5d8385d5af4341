//! Identifier quoting for names that cannot be bound as parameters.
//!
//! Database and table names arrive from HTTP callers and end up in identifier
//! position (`SHOW TABLES FROM ...`, `SELECT * FROM ...`, `USE ...`), where
//! `?` placeholders are not allowed. Every such name goes through
//! [`Identifier::parse`]; nothing else is ever interpolated into SQL text.
//!
//! Quoting follows MySQL: the name is wrapped in backticks and every embedded
//! backtick is doubled. Inside a quoted identifier no other character is
//! special, so the quoted form is always exactly one identifier token. Dots
//! are not qualifier separators here: `a.b` is a single name.

use crate::{DatabaseError, DatabaseResult};
use std::fmt;

/// MySQL's limit on database and table name length, in characters.
pub const MAX_IDENTIFIER_LEN: usize = 64;

/// A validated identifier, rendered in quoted form by `Display`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identifier {
    name: String,
}

impl Identifier {
    /// Validate a caller-supplied name.
    ///
    /// Rejects empty names, names containing NUL, and names longer than
    /// [`MAX_IDENTIFIER_LEN`] characters. Whether the object exists is left
    /// to the server.
    pub fn parse(name: &str) -> DatabaseResult<Self> {
        if name.is_empty() {
            return Err(DatabaseError::InvalidIdentifier(
                "identifier must not be empty".to_string(),
            ));
        }
        if name.contains('\0') {
            return Err(DatabaseError::InvalidIdentifier(
                "identifier must not contain NUL".to_string(),
            ));
        }
        let len = name.chars().count();
        if len > MAX_IDENTIFIER_LEN {
            return Err(DatabaseError::InvalidIdentifier(format!(
                "identifier is {} characters long, the limit is {}",
                len, MAX_IDENTIFIER_LEN
            )));
        }
        Ok(Self {
            name: name.to_string(),
        })
    }

    /// The unquoted name as supplied.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The backtick-quoted form, safe to interpolate in identifier position.
    pub fn quoted(&self) -> String {
        escape_identifier(&self.name)
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.quoted())
    }
}

/// A table qualified by its database: `` `db`.`table` ``.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QualifiedTable {
    pub database: Identifier,
    pub table: Identifier,
}

impl QualifiedTable {
    pub fn parse(database: &str, table: &str) -> DatabaseResult<Self> {
        Ok(Self {
            database: Identifier::parse(database)?,
            table: Identifier::parse(table)?,
        })
    }
}

impl fmt::Display for QualifiedTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.database, self.table)
    }
}

/// Quote a raw name with backticks, doubling embedded backticks.
///
/// Prefer [`Identifier::parse`], which also rejects unusable names.
pub fn escape_identifier(name: &str) -> String {
    let mut quoted = String::with_capacity(name.len() + 2);
    quoted.push('`');
    for ch in name.chars() {
        if ch == '`' {
            quoted.push('`');
        }
        quoted.push(ch);
    }
    quoted.push('`');
    quoted
}

/// Reverse of [`escape_identifier`]: read one quoted identifier from the start
/// of `input`, returning the name and the remaining text.
pub fn unquote_identifier(input: &str) -> Option<(String, &str)> {
    let rest = input.strip_prefix('`')?;
    let mut name = String::new();
    let mut chars = rest.char_indices().peekable();
    while let Some((idx, ch)) = chars.next() {
        if ch == '`' {
            if let Some((_, '`')) = chars.peek() {
                chars.next();
                name.push('`');
                continue;
            }
            return Some((name, &rest[idx + 1..]));
        }
        name.push(ch);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_names_are_wrapped() {
        assert_eq!(escape_identifier("shop"), "`shop`");
        assert_eq!(Identifier::parse("order items").unwrap().quoted(), "`order items`");
    }

    #[test]
    fn embedded_backticks_are_doubled() {
        assert_eq!(escape_identifier("a`b"), "`a``b`");
        assert_eq!(escape_identifier("``"), "``````");
    }

    #[test]
    fn injection_attempts_stay_one_identifier() {
        let hostile = [
            "users`; DROP TABLE users; --",
            "x` UNION SELECT password_hash FROM admins WHERE `1",
            "db`.`other",
            "name' OR '1'='1",
            "t\"; DELETE FROM t; --",
            "tab\\`le",
        ];
        for raw in hostile {
            let quoted = Identifier::parse(raw).unwrap().quoted();
            let (name, rest) = unquote_identifier(&quoted).unwrap();
            assert_eq!(name, raw, "round trip for {raw:?}");
            assert!(rest.is_empty(), "nothing escapes the quotes for {raw:?}");
            // Every backtick inside the outer pair is doubled.
            let inner = &quoted[1..quoted.len() - 1];
            assert_eq!(inner.replace("``", "").matches('`').count(), 0);
        }
    }

    #[test]
    fn dots_are_not_qualifiers() {
        assert_eq!(Identifier::parse("a.b").unwrap().quoted(), "`a.b`");
    }

    #[test]
    fn rejects_unusable_names() {
        assert!(matches!(
            Identifier::parse(""),
            Err(DatabaseError::InvalidIdentifier(_))
        ));
        assert!(Identifier::parse("bad\0name").is_err());
        assert!(Identifier::parse(&"x".repeat(MAX_IDENTIFIER_LEN)).is_ok());
        assert!(Identifier::parse(&"x".repeat(MAX_IDENTIFIER_LEN + 1)).is_err());
    }

    #[test]
    fn length_counts_characters_not_bytes() {
        assert!(Identifier::parse(&"資".repeat(MAX_IDENTIFIER_LEN)).is_ok());
    }

    #[test]
    fn qualified_table_display() {
        let table = QualifiedTable::parse("shop", "order`s").unwrap();
        assert_eq!(table.to_string(), "`shop`.`order``s`");
    }

    #[test]
    fn unquote_reads_prefix() {
        let (db, rest) = unquote_identifier("`shop`.`items` LIMIT 100").unwrap();
        assert_eq!(db, "shop");
        let (table, rest) = unquote_identifier(rest.strip_prefix('.').unwrap()).unwrap();
        assert_eq!(table, "items");
        assert_eq!(rest, " LIMIT 100");
        assert!(unquote_identifier("`unterminated").is_none());
        assert!(unquote_identifier("bare").is_none());
    }
}
