//! Sessions and the session guard
//!
//! The guard is the only authentication this crate performs: a request is
//! allowed when its session carries an account, and denied otherwise.

use crate::core::error::{NoteError, NoteResult};
use crate::core::item::{KeySchema, PrimaryKey, Record};
use serde::{Deserialize, Serialize};

/// Where denied requests are sent by default
pub const HOME_REDIRECT: &str = "/";

/// A signed-up account
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Account {
    #[serde(rename = "accountID")]
    pub account_id: String,
}

impl Account {
    pub fn new(account_id: impl Into<String>) -> Self {
        Self {
            account_id: account_id.into(),
        }
    }
}

impl Record for Account {
    fn table() -> &'static str {
        "accounts"
    }

    fn key_schema() -> KeySchema {
        KeySchema::new("accountID")
    }

    fn primary_key(&self) -> PrimaryKey {
        PrimaryKey::partition(self.account_id.clone())
    }
}

/// Per-request session state
///
/// Persisting sessions is the transport's business; this type only carries
/// what the guard needs to see.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account: Option<Account>,
}

impl Session {
    /// A session with no signed-in account
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn for_account(account: Account) -> Self {
        Self {
            account: Some(account),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.account.is_some()
    }
}

/// Verdict of the session guard
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// The session is signed in as this account
    Allow(Account),
    /// The session has no account; send the client to `redirect`
    Deny { redirect: String },
}

impl GuardDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, GuardDecision::Allow(_))
    }

    /// Surface a denial as `Unauthorized` for API-style callers
    pub fn into_result(self) -> NoteResult<Account> {
        match self {
            GuardDecision::Allow(account) => Ok(account),
            GuardDecision::Deny { redirect } => Err(NoteError::Unauthorized {
                message: "session has no account".to_string(),
                redirect: Some(redirect),
            }),
        }
    }
}

/// Gate that admits sessions carrying an account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionGuard {
    redirect: String,
}

impl Default for SessionGuard {
    fn default() -> Self {
        Self::new(HOME_REDIRECT)
    }
}

impl SessionGuard {
    /// A guard that sends denied requests to `redirect`
    pub fn new(redirect: impl Into<String>) -> Self {
        Self {
            redirect: redirect.into(),
        }
    }

    pub fn redirect(&self) -> &str {
        &self.redirect
    }

    /// Pure function of the session: no I/O, no mutation
    pub fn check(&self, session: &Session) -> GuardDecision {
        match &session.account {
            Some(account) => GuardDecision::Allow(account.clone()),
            None => GuardDecision::Deny {
                redirect: self.redirect.clone(),
            },
        }
    }
}

/// Check a session with the default guard (denials redirect home)
pub fn guard(session: &Session) -> GuardDecision {
    SessionGuard::default().check(session)
}
