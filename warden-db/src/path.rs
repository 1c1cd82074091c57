//! Addressing for the hierarchical document layout:
//!
//! ```text
//! servers/{server_ip}
//! servers/{server_ip}/players/{player_ip}
//! servers/{server_ip}/players/{player_ip}/accounts/{steam64}
//! servers/{server_ip}/players/{player_ip}/bans/{id}
//! servers/{server_ip}/players/{player_ip}/warnings/{id}
//! ```

use std::fmt;

use crate::error::{DbError, Result};

pub const SERVERS: &str = "servers";
pub const PLAYERS: &str = "players";
pub const ACCOUNTS: &str = "accounts";
pub const BANS: &str = "bans";
pub const WARNINGS: &str = "warnings";

/// Path of a collection, e.g. `servers/1.2.3.4/players`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Collection(String);

/// Path of a single document: its parent collection plus its id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocPath {
  collection: Collection,
  id: String,
}

impl Collection {
  /// A top-level collection.
  pub fn root(name: &str) -> Self {
    Self(name.to_string())
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }

  /// Address a document in this collection.
  /// Ids must be non-empty and cannot contain `/`.
  pub fn doc(&self, id: &str) -> Result<DocPath> {
    if id.is_empty() || id.contains('/') {
      return Err(DbError::InvalidDocumentId(id.to_string()));
    }
    Ok(DocPath {
      collection: self.clone(),
      id: id.to_string(),
    })
  }
}

impl DocPath {
  pub fn collection(&self) -> &Collection {
    &self.collection
  }

  pub fn id(&self) -> &str {
    &self.id
  }

  /// A subcollection nested under this document.
  pub fn subcollection(&self, name: &str) -> Collection {
    Collection(format!("{}/{}/{}", self.collection.0, self.id, name))
  }
}

impl fmt::Display for Collection {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl fmt::Display for DocPath {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}/{}", self.collection, self.id)
  }
}

pub fn servers() -> Collection {
  Collection::root(SERVERS)
}

pub fn server(server_ip: &str) -> Result<DocPath> {
  servers().doc(server_ip)
}

pub fn players(server_ip: &str) -> Result<Collection> {
  Ok(server(server_ip)?.subcollection(PLAYERS))
}

pub fn player(server_ip: &str, player_ip: &str) -> Result<DocPath> {
  players(server_ip)?.doc(player_ip)
}

pub fn accounts(server_ip: &str, player_ip: &str) -> Result<Collection> {
  Ok(player(server_ip, player_ip)?.subcollection(ACCOUNTS))
}

pub fn account(server_ip: &str, player_ip: &str, steam64: &str) -> Result<DocPath> {
  accounts(server_ip, player_ip)?.doc(steam64)
}

pub fn bans(server_ip: &str, player_ip: &str) -> Result<Collection> {
  Ok(player(server_ip, player_ip)?.subcollection(BANS))
}

pub fn warnings(server_ip: &str, player_ip: &str) -> Result<Collection> {
  Ok(player(server_ip, player_ip)?.subcollection(WARNINGS))
}
