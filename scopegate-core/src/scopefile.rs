//! Scope files
//!
//! A scope file lists scope definitions either as a JSON array:
//!
//! ```json
//! [{"name": "docs.read", "method": "GET", "uri": "/docs/*"}]
//! ```
//!
//! or as TOML tables:
//!
//! ```toml
//! [[scope]]
//! name = "docs.read"
//! method = "GET"
//! uri = "/docs/*"
//! ```

use crate::error::{Result, ScopeGateError};
use crate::types::ScopeDefinition;
use serde::Deserialize;
use std::path::Path;

/// Scope file format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeFileFormat {
    /// JSON array of scope definitions
    Json,
    /// TOML with `[[scope]]` tables
    Toml,
}

impl ScopeFileFormat {
    /// Guess the format from a file extension; anything but `.toml` is JSON
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => ScopeFileFormat::Toml,
            _ => ScopeFileFormat::Json,
        }
    }
}

#[derive(Deserialize)]
struct TomlScopeFile {
    #[serde(default)]
    scope: Vec<ScopeDefinition>,
}

/// Parse scope definitions
pub fn parse_scopes(content: &str, format: ScopeFileFormat) -> Result<Vec<ScopeDefinition>> {
    match format {
        ScopeFileFormat::Json => Ok(serde_json::from_str(content)?),
        ScopeFileFormat::Toml => toml::from_str::<TomlScopeFile>(content)
            .map(|file| file.scope)
            .map_err(|e| ScopeGateError::ConfigError(e.to_string())),
    }
}

/// Read and parse a scope file, picking the format from its extension
pub fn load_scopes(path: impl AsRef<Path>) -> Result<Vec<ScopeDefinition>> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)?;
    parse_scopes(&content, ScopeFileFormat::from_path(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_json() {
        let scopes = parse_scopes(
            r#"[{"name": "docs.read", "method": "GET", "uri": "/docs/*"}]"#,
            ScopeFileFormat::Json,
        )
        .unwrap();
        assert_eq!(scopes, vec![ScopeDefinition::new("docs.read", "GET", "/docs/*", "")]);
    }

    #[test]
    fn test_parse_toml() {
        let scopes = parse_scopes(
            r#"
[[scope]]
name = "docs.read"
method = "GET"
uri = "/docs/*"
description = "Read docs"

[[scope]]
name = "docs.write"
method = "POST"
uri = "/docs"
"#,
            ScopeFileFormat::Toml,
        )
        .unwrap();
        assert_eq!(scopes.len(), 2);
        assert_eq!(scopes[0].description, "Read docs");
        assert_eq!(scopes[1].method, "POST");
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            parse_scopes("{", ScopeFileFormat::Json),
            Err(ScopeGateError::SerializationError(_))
        ));
        assert!(matches!(
            parse_scopes("[[scope]]\nname = 1", ScopeFileFormat::Toml),
            Err(ScopeGateError::ConfigError(_))
        ));
    }

    #[test]
    fn test_load_by_extension() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[[scope]]\nname = \"docs.read\"\nmethod = \"GET\"\nuri = \"/docs\""
        )
        .unwrap();

        let scopes = load_scopes(file.path()).unwrap();
        assert_eq!(scopes[0].name, "docs.read");
        assert!(matches!(
            load_scopes("/nonexistent/scopes.json"),
            Err(ScopeGateError::IoError(_))
        ));
    }
}
