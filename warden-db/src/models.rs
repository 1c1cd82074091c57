use serde::{Deserialize, Serialize};

/// A schemaless document body, as stored.
pub type Document = serde_json::Map<String, serde_json::Value>;

/// A managed game server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Server {
  /// Server IP (document id)
  pub ip: String,
  /// Display name
  pub name: String,
  /// Unix timestamp when the server document was created
  pub created_at: i64,
}

/// A Steam account seen connecting from a player's IP.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
  pub steam64: String,
  pub name: String,
}

impl Account {
  /// Build an account, falling back to the Steam64 ID when no name is given.
  pub fn new(steam64: impl Into<String>, name: Option<&str>) -> Self {
    let steam64 = steam64.into();
    let name = match name {
      Some(n) if !n.is_empty() => n.to_string(),
      _ => steam64.clone(),
    };
    Self { steam64, name }
  }
}

/// A player, keyed by IP within one server.
///
/// `bans` and `warnings` mirror the reserved subcollections of the store
/// layout. Nothing reads or writes them yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
  pub ip: String,
  pub accounts: Vec<Account>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub bans: Vec<Document>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub warnings: Vec<Document>,
}

impl Player {
  pub fn new(ip: impl Into<String>, accounts: Vec<Account>) -> Self {
    Self {
      ip: ip.into(),
      accounts,
      bans: Vec::new(),
      warnings: Vec::new(),
    }
  }

  pub fn has_account(&self, steam64: &str) -> bool {
    self.accounts.iter().any(|a| a.steam64 == steam64)
  }
}
