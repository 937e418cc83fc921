//! Kerberos principal names.
//!
//! A name is a list of components plus a realm: `primary/instance@REALM`.
//! Parsing follows the Kerberos string syntax, including backslash escapes
//! for the separator characters and a few control characters.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};

/// Name used for the template principal holding realm defaults.
pub const DEFAULT_TEMPLATE: &str = "default";

/// Instance every administrative client identity carries.
pub const ADMIN_INSTANCE: &str = "admin";

const COMPONENT_SEPARATOR: char = '/';
const REALM_SEPARATOR: char = '@';
const ESCAPE: char = '\\';

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "NameParts")]
pub struct PrincipalName {
    components: Vec<String>,
    realm: String,
}

/// Unvalidated wire form, checked through [`PrincipalName::new`]
#[derive(Deserialize)]
struct NameParts {
    components: Vec<String>,
    realm: String,
}

impl TryFrom<NameParts> for PrincipalName {
    type Error = Error;

    fn try_from(parts: NameParts) -> Result<Self> {
        Self::new(parts.components, parts.realm)
    }
}

impl PrincipalName {
    pub fn new<I, S>(components: I, realm: impl Into<String>) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let components: Vec<String> = components.into_iter().map(Into::into).collect();
        let realm = realm.into();

        if components.is_empty() || components[0].is_empty() || realm.is_empty() {
            return Err(Error::malformed_name());
        }

        Ok(Self { components, realm })
    }

    /// Parse `text`, appending `default_realm` when no realm is given.
    pub fn parse(text: &str, default_realm: &str) -> Result<Self> {
        let mut components = Vec::new();
        let mut current = String::new();
        let mut realm: Option<String> = None;
        let mut chars = text.chars();

        while let Some(c) = chars.next() {
            match c {
                ESCAPE => {
                    let escaped = chars.next().ok_or_else(Error::malformed_name)?;
                    current.push(unescape(escaped));
                }
                COMPONENT_SEPARATOR if realm.is_none() => {
                    components.push(std::mem::take(&mut current));
                }
                REALM_SEPARATOR if realm.is_none() => {
                    components.push(std::mem::take(&mut current));
                    realm = Some(String::new());
                }
                // A second '@', or a '/' inside the realm
                COMPONENT_SEPARATOR | REALM_SEPARATOR => return Err(Error::malformed_name()),
                _ => current.push(c),
            }
        }

        let realm = match realm {
            Some(_) => current,
            None => {
                components.push(current);
                default_realm.to_string()
            }
        };

        Self::new(components, realm)
    }

    /// The template principal (`default@REALM`) holding realm defaults.
    pub fn default_template(realm: &str) -> Result<Self> {
        Self::new([DEFAULT_TEMPLATE], realm)
    }

    pub fn components(&self) -> &[String] {
        &self.components
    }

    pub fn primary(&self) -> &str {
        &self.components[0]
    }

    pub fn instance(&self) -> Option<&str> {
        self.components.get(1).map(String::as_str)
    }

    pub fn realm(&self) -> &str {
        &self.realm
    }

    /// Same primary and realm with `instance` as the only other component.
    pub fn with_instance(&self, instance: &str) -> Self {
        Self {
            components: vec![self.components[0].clone(), instance.to_string()],
            realm: self.realm.clone(),
        }
    }

    pub fn with_realm(&self, realm: &str) -> Self {
        Self {
            components: self.components.clone(),
            realm: realm.to_string(),
        }
    }
}

impl fmt::Display for PrincipalName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, component) in self.components.iter().enumerate() {
            if i > 0 {
                f.write_str("/")?;
            }
            write_escaped(f, component, true)?;
        }
        f.write_str("@")?;
        write_escaped(f, &self.realm, false)
    }
}

fn unescape(c: char) -> char {
    match c {
        'n' => '\n',
        't' => '\t',
        'b' => '\u{8}',
        '0' => '\0',
        other => other,
    }
}

fn write_escaped(f: &mut fmt::Formatter<'_>, text: &str, in_component: bool) -> fmt::Result {
    for c in text.chars() {
        match c {
            '/' if in_component => f.write_str("\\/")?,
            '@' => f.write_str("\\@")?,
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\t' => f.write_str("\\t")?,
            '\u{8}' => f.write_str("\\b")?,
            '\0' => f.write_str("\\0")?,
            _ => write!(f, "{}", c)?,
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ParameterKind;

    #[test]
    fn test_parse_with_default_realm() {
        let name = PrincipalName::parse("jdoe", "EXAMPLE.COM").unwrap();
        assert_eq!(name.primary(), "jdoe");
        assert_eq!(name.instance(), None);
        assert_eq!(name.realm(), "EXAMPLE.COM");
        assert_eq!(name.to_string(), "jdoe@EXAMPLE.COM");
    }

    #[test]
    fn test_parse_full_name() {
        let name = PrincipalName::parse("host/www.example.com@OTHER.REALM", "EXAMPLE.COM").unwrap();
        assert_eq!(name.components(), &["host".to_string(), "www.example.com".to_string()]);
        assert_eq!(name.realm(), "OTHER.REALM");
    }

    #[test]
    fn test_escapes_round_trip() {
        let name = PrincipalName::parse("we\\/ird\\@name@EXAMPLE.COM", "X").unwrap();
        assert_eq!(name.components(), &["we/ird@name".to_string()]);
        assert_eq!(name.to_string(), "we\\/ird\\@name@EXAMPLE.COM");
    }

    #[test]
    fn test_malformed_names() {
        for text in ["", "@EXAMPLE.COM", "jdoe@", "a@B@C", "a@B/C", "trailing\\"] {
            let err = PrincipalName::parse(text, "EXAMPLE.COM").unwrap_err();
            assert!(
                matches!(err, Error::BadParameter { kind: ParameterKind::BadPrincipal, .. }),
                "expected bad principal for {:?}",
                text
            );
        }
    }

    #[test]
    fn test_with_instance_replaces_all_instances() {
        let name = PrincipalName::parse("jdoe/other/extra@EXAMPLE.COM", "X").unwrap();
        assert_eq!(name.with_instance(ADMIN_INSTANCE).to_string(), "jdoe/admin@EXAMPLE.COM");
    }

    #[test]
    fn test_default_template() {
        let name = PrincipalName::default_template("EXAMPLE.COM").unwrap();
        assert_eq!(name.to_string(), "default@EXAMPLE.COM");
    }

    #[test]
    fn test_deserialize_validates() {
        let name: PrincipalName =
            serde_json::from_str(r#"{"components":["jdoe","admin"],"realm":"EXAMPLE.COM"}"#).unwrap();
        assert_eq!(name.to_string(), "jdoe/admin@EXAMPLE.COM");

        for bad in [
            r#"{"components":[],"realm":"EXAMPLE.COM"}"#,
            r#"{"components":[""],"realm":"EXAMPLE.COM"}"#,
            r#"{"components":["jdoe"],"realm":""}"#,
        ] {
            assert!(serde_json::from_str::<PrincipalName>(bad).is_err(), "{}", bad);
        }
    }
}
