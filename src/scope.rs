use oauth2::Scope as OAuth2Scope;
use std::fmt;
use std::iter::FromIterator;
use std::str::FromStr;

/// Represents permission level for a scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    ReadWrite,
    ReadOnly,
}

/// Accounting API scopes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScopeType {
    Transactions(Permission),
    Contacts(Permission),
    Settings(Permission),
    Attachments(Permission),
    Reports,
}

impl ScopeType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Transactions(Permission::ReadWrite) => "accounting.transactions",
            Self::Transactions(Permission::ReadOnly) => "accounting.transactions.read",
            Self::Contacts(Permission::ReadWrite) => "accounting.contacts",
            Self::Contacts(Permission::ReadOnly) => "accounting.contacts.read",
            Self::Settings(Permission::ReadWrite) => "accounting.settings",
            Self::Settings(Permission::ReadOnly) => "accounting.settings.read",
            Self::Attachments(Permission::ReadWrite) => "accounting.attachments",
            Self::Attachments(Permission::ReadOnly) => "accounting.attachments.read",
            Self::Reports => "accounting.reports.read",
        }
    }
}

impl fmt::Display for ScopeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a scope string is not an accounting scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseScopeError(String);

impl fmt::Display for ParseScopeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown accounting scope: {}", self.0)
    }
}

impl std::error::Error for ParseScopeError {}

impl FromStr for ScopeType {
    type Err = ParseScopeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let scope = match s {
            "accounting.transactions" => Self::Transactions(Permission::ReadWrite),
            "accounting.transactions.read" => Self::Transactions(Permission::ReadOnly),
            "accounting.contacts" => Self::Contacts(Permission::ReadWrite),
            "accounting.contacts.read" => Self::Contacts(Permission::ReadOnly),
            "accounting.settings" => Self::Settings(Permission::ReadWrite),
            "accounting.settings.read" => Self::Settings(Permission::ReadOnly),
            "accounting.attachments" => Self::Attachments(Permission::ReadWrite),
            "accounting.attachments.read" => Self::Attachments(Permission::ReadOnly),
            "accounting.reports.read" => Self::Reports,
            other => return Err(ParseScopeError(other.to_string())),
        };
        Ok(scope)
    }
}

/// A set of scopes requested during the client-credentials exchange.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scope(Vec<ScopeType>);

impl Scope {
    #[must_use]
    pub fn new(scope_types: Vec<ScopeType>) -> Self {
        scope_types.into_iter().collect()
    }

    #[must_use]
    pub fn add(mut self, scope_type: ScopeType) -> Self {
        if !self.0.contains(&scope_type) {
            self.0.push(scope_type);
        }
        self
    }

    /// Read and write access to invoices, credit notes and contacts.
    #[must_use]
    pub fn accounting() -> Self {
        Self::new(vec![
            ScopeType::Transactions(Permission::ReadWrite),
            ScopeType::Contacts(Permission::ReadWrite),
            ScopeType::Settings(Permission::ReadOnly),
        ])
    }

    /// Read-only access to invoices, credit notes and contacts.
    #[must_use]
    pub fn accounting_read() -> Self {
        Self::new(vec![
            ScopeType::Transactions(Permission::ReadOnly),
            ScopeType::Contacts(Permission::ReadOnly),
            ScopeType::Settings(Permission::ReadOnly),
        ])
    }

    #[must_use]
    pub fn into_oauth2_scopes(self) -> Vec<OAuth2Scope> {
        self.0
            .into_iter()
            .map(|scope| OAuth2Scope::new(scope.as_str().to_string()))
            .collect()
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined = self
            .0
            .iter()
            .map(|scope| scope.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        f.write_str(&joined)
    }
}

impl From<ScopeType> for Scope {
    fn from(scope_type: ScopeType) -> Self {
        Self(vec![scope_type])
    }
}

impl FromIterator<ScopeType> for Scope {
    fn from_iter<I: IntoIterator<Item = ScopeType>>(iter: I) -> Self {
        iter.into_iter().fold(Self::default(), Self::add)
    }
}
