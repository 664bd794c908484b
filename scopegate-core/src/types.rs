//! Type system for ScopeGate

use crate::error::{Result, ScopeGateError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Minimum length of a scope name, checked before lowercasing
pub const MIN_SCOPE_NAME_LEN: usize = 4;

/// HTTP methods a scope can be registered for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    /// GET
    Get,
    /// HEAD
    Head,
    /// POST
    Post,
    /// PUT
    Put,
    /// DELETE
    Delete,
    /// CONNECT
    Connect,
    /// OPTIONS
    Options,
    /// TRACE
    Trace,
    /// PATCH
    Patch,
}

impl Method {
    /// Every method, in bit order
    pub const ALL: [Method; 9] = [
        Method::Get,
        Method::Head,
        Method::Post,
        Method::Put,
        Method::Delete,
        Method::Connect,
        Method::Options,
        Method::Trace,
        Method::Patch,
    ];

    /// Bit of this method inside a [`MethodMask`]
    pub const fn bit(self) -> u16 {
        1 << (self as u16)
    }

    /// Canonical upper-case name
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Head => "HEAD",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Connect => "CONNECT",
            Method::Options => "OPTIONS",
            Method::Trace => "TRACE",
            Method::Patch => "PATCH",
        }
    }
}

impl FromStr for Method {
    type Err = ScopeGateError;

    fn from_str(s: &str) -> Result<Self> {
        let upper = s.trim().to_ascii_uppercase();
        Method::ALL
            .into_iter()
            .find(|m| m.as_str() == upper)
            .ok_or_else(|| ScopeGateError::validation("scope: invalid HTTP method"))
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Set of HTTP methods packed into a `u16`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct MethodMask(u16);

impl MethodMask {
    /// Empty mask
    pub const fn empty() -> Self {
        MethodMask(0)
    }

    /// Add a method
    pub fn insert(&mut self, method: Method) {
        self.0 |= method.bit();
    }

    /// Whether the method is present
    pub fn contains(self, method: Method) -> bool {
        self.0 & method.bit() != 0
    }

    /// Whether no method is present
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Raw bits
    pub fn bits(self) -> u16 {
        self.0
    }

    /// Methods present, in bit order
    pub fn iter(self) -> impl Iterator<Item = Method> {
        Method::ALL.into_iter().filter(move |m| self.contains(*m))
    }
}

impl FromIterator<Method> for MethodMask {
    fn from_iter<I: IntoIterator<Item = Method>>(iter: I) -> Self {
        let mut mask = MethodMask::empty();
        for method in iter {
            mask.insert(method);
        }
        mask
    }
}

/// Dense handle of a registered scope. Index `i` is the `i`-th registered scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ScopeIndex(pub usize);

impl fmt::Display for ScopeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Unvalidated scope as received from a caller or a scope file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeDefinition {
    /// Unique name
    pub name: String,
    /// HTTP method
    pub method: String,
    /// URI pattern
    pub uri: String,
    /// Human readable description
    #[serde(default)]
    pub description: String,
}

impl ScopeDefinition {
    /// Create a new scope definition
    pub fn new(
        name: impl Into<String>,
        method: impl Into<String>,
        uri: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        ScopeDefinition {
            name: name.into(),
            method: method.into(),
            uri: uri.into(),
            description: description.into(),
        }
    }

    /// Validate into a [`Scope`]
    pub fn validate(self) -> Result<Scope> {
        if self.name.len() < MIN_SCOPE_NAME_LEN {
            return Err(ScopeGateError::validation("scope: invalid name for scope"));
        }

        let action = Action::new(self.method, self.uri).validate()?;

        Ok(Scope {
            name: self.name.to_lowercase(),
            method: action.method,
            uri: action.uri,
            description: self.description,
        })
    }
}

/// A registered, validated scope. Identity is `name`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scope {
    /// Unique lowercase name
    pub name: String,
    /// HTTP method
    pub method: Method,
    /// URI pattern
    pub uri: String,
    /// Human readable description
    pub description: String,
}

/// Method and URI of a request to authorize
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    /// HTTP method, unvalidated
    pub method: String,
    /// Request URI, unvalidated
    pub uri: String,
}

impl Action {
    /// Create a new action
    pub fn new(method: impl Into<String>, uri: impl Into<String>) -> Self {
        Action {
            method: method.into(),
            uri: uri.into(),
        }
    }

    /// Check the method is known and the URI is an absolute, non-root path
    pub fn validate(&self) -> Result<ValidAction> {
        let method: Method = self.method.parse()?;
        let uri = self.uri.trim();

        if !uri.starts_with('/') || uri.trim_matches('/').trim().is_empty() {
            return Err(ScopeGateError::validation("scope: invalid URI for scope"));
        }

        Ok(ValidAction {
            method,
            uri: uri.to_string(),
        })
    }
}

/// An [`Action`] that passed validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidAction {
    /// Parsed method
    pub method: Method,
    /// Trimmed URI
    pub uri: String,
}

/// Access information (scopes) for a set of members
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Role {
    /// Unique lowercase id
    #[serde(rename = "name")]
    pub id: String,
    /// Human readable description
    #[serde(default)]
    pub description: String,
    /// User IDs holding this role
    #[serde(default)]
    pub members: Vec<String>,
    /// Scope names granted by this role
    #[serde(default)]
    pub scopes: Vec<String>,
}

impl Role {
    /// Create a new role
    pub fn new(id: impl Into<String>, description: impl Into<String>) -> Self {
        Role {
            id: id.into(),
            description: description.into(),
            members: Vec::new(),
            scopes: Vec::new(),
        }
    }

    /// Add a member
    pub fn with_member(mut self, member: impl Into<String>) -> Self {
        self.members.push(member.into());
        self
    }

    /// Add a scope
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scopes.push(scope.into());
        self
    }

    /// Whether the role grants `scope` to `subject`
    pub fn grants(&self, subject: &str, scope: &str) -> bool {
        self.members.iter().any(|m| m == subject) && self.scopes.iter().any(|s| s == scope)
    }
}

/// Credentials of the OAuth2 client registered for the scope set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientCredentials {
    /// Client id
    pub client_id: String,
    /// Client secret (may be empty)
    #[serde(default)]
    pub client_secret: String,
}

/// A user known to the user directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryUser {
    /// User id
    pub id: String,
    /// Email, if known
    #[serde(default)]
    pub email: Option<String>,
}
