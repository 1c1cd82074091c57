mod error;
mod models;
pub mod path;

pub use error::{DbError, Result};
pub use models::{Account, Document, Player, Server};

use path::DocPath;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio_rusqlite::Connection;
use tokio_rusqlite::rusqlite::{self, OptionalExtension, params};
use tracing::{debug, info};

/// Client for the hierarchical document store.
///
/// Every document lives in one table keyed by its parent collection path and
/// its id. Deleting a document leaves its subcollections in place, so callers
/// remove children first.
#[derive(Clone)]
pub struct Database {
  conn: Connection,
}

impl Database {
  /// Open or create a store at the given path.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = Connection::open(path).await.map_err(DbError::Sqlite)?;
    let db = Self { conn };
    db.initialize().await?;
    Ok(db)
  }

  /// Create an in-memory store (useful for testing).
  pub async fn open_in_memory() -> Result<Self> {
    let conn = Connection::open_in_memory()
      .await
      .map_err(DbError::Sqlite)?;
    let db = Self { conn };
    db.initialize().await?;
    Ok(db)
  }

  async fn initialize(&self) -> Result<()> {
    self.conn
            .call(|conn| {
                conn.pragma_update(None, "journal_mode", "WAL")?;

                conn.execute_batch(
                    r#"
                    CREATE TABLE IF NOT EXISTS documents (
                        collection TEXT NOT NULL,
                        id TEXT NOT NULL,
                        data TEXT NOT NULL,
                        PRIMARY KEY (collection, id)
                    );
                    "#,
                )?;
                Ok::<_, rusqlite::Error>(())
            })
            .await?;

    info!("document store initialized");
    Ok(())
  }

  // ========================================================================
  // Documents
  // ========================================================================

  pub async fn document_exists(&self, path: &DocPath) -> Result<bool> {
    let (collection, id) = key(path);
    let exists = self
      .conn
      .call(move |conn| {
        let exists: bool = conn
          .prepare_cached("SELECT EXISTS(SELECT 1 FROM documents WHERE collection = ?1 AND id = ?2)")?
          .query_row(params![&collection, &id], |row| row.get(0))?;
        Ok::<_, rusqlite::Error>(exists)
      })
      .await?;

    Ok(exists)
  }

  /// Get a document body. Returns None if not found.
  pub async fn get_document(&self, path: &DocPath) -> Result<Option<Document>> {
    let (collection, id) = key(path);
    let data: Option<String> = self
      .conn
      .call(move |conn| {
        conn
          .prepare_cached("SELECT data FROM documents WHERE collection = ?1 AND id = ?2")?
          .query_row(params![&collection, &id], |row| row.get(0))
          .optional()
      })
      .await?;

    data.map(|d| serde_json::from_str(&d)).transpose().map_err(Into::into)
  }

  /// Write a document, replacing any existing body.
  pub async fn set_document(&self, path: &DocPath, doc: &Document) -> Result<()> {
    let (collection, id) = key(path);
    let data = serde_json::to_string(doc)?;
    self
      .conn
      .call(move |conn| {
        conn
          .prepare_cached(
            "INSERT INTO documents (collection, id, data) VALUES (?1, ?2, ?3)
             ON CONFLICT (collection, id) DO UPDATE SET data = excluded.data",
          )?
          .execute(params![&collection, &id, &data])?;
        Ok::<_, rusqlite::Error>(())
      })
      .await?;

    debug!(%path, "set document");
    Ok(())
  }

  /// Write a document only if none exists at `path`.
  /// The check and the write are a single atomic statement.
  /// Returns whether the document was created.
  pub async fn create_document(&self, path: &DocPath, doc: &Document) -> Result<bool> {
    let (collection, id) = key(path);
    let data = serde_json::to_string(doc)?;
    let created = self
      .conn
      .call(move |conn| {
        let inserted = conn
          .prepare_cached(
            "INSERT INTO documents (collection, id, data) VALUES (?1, ?2, ?3)
             ON CONFLICT (collection, id) DO NOTHING",
          )?
          .execute(params![&collection, &id, &data])?;
        Ok::<_, rusqlite::Error>(inserted == 1)
      })
      .await?;

    if created {
      debug!(%path, "created document");
    }
    Ok(created)
  }

  /// Delete a single document (not its subcollections).
  /// Returns whether a document was removed.
  pub async fn delete_document(&self, path: &DocPath) -> Result<bool> {
    let (collection, id) = key(path);
    let deleted = self
      .conn
      .call(move |conn| {
        let deleted = conn
          .prepare_cached("DELETE FROM documents WHERE collection = ?1 AND id = ?2")?
          .execute(params![&collection, &id])?;
        Ok::<_, rusqlite::Error>(deleted > 0)
      })
      .await?;

    if deleted {
      debug!(%path, "deleted document");
    }
    Ok(deleted)
  }

  /// List every document directly inside a collection, ordered by id.
  pub async fn list_documents(&self, collection: &path::Collection) -> Result<Vec<(String, Document)>> {
    let collection = collection.as_str().to_string();
    let rows: Vec<(String, String)> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn
          .prepare_cached("SELECT id, data FROM documents WHERE collection = ?1 ORDER BY id")?;

        let rows = stmt
          .query_map(params![&collection], |row| Ok((row.get(0)?, row.get(1)?)))?
          .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok::<_, rusqlite::Error>(rows)
      })
      .await?;

    rows
      .into_iter()
      .map(|(id, data)| -> Result<(String, Document)> { Ok((id, serde_json::from_str(&data)?)) })
      .collect()
  }

  // ========================================================================
  // Servers
  // ========================================================================

  pub async fn server_exists(&self, server_ip: &str) -> Result<bool> {
    self.document_exists(&path::server(server_ip)?).await
  }

  /// Create a server document unless one already exists at this IP.
  /// Returns whether it was created; an existing server is left untouched.
  pub async fn create_server(&self, server_ip: &str, name: &str, now: i64) -> Result<bool> {
    let doc = to_document(&ServerDoc {
      name: name.to_string(),
      created_at: now,
    })?;
    let created = self.create_document(&path::server(server_ip)?, &doc).await?;

    if created {
      info!(server_ip, name, "created server");
    } else {
      debug!(server_ip, "server already exists");
    }
    Ok(created)
  }

  pub async fn get_server(&self, server_ip: &str) -> Result<Option<Server>> {
    let doc = self.get_document(&path::server(server_ip)?).await?;
    doc
      .map(|d| server_from_document(server_ip.to_string(), d))
      .transpose()
  }

  /// All servers, ordered by IP.
  pub async fn list_servers(&self) -> Result<Vec<Server>> {
    self
      .list_documents(&path::servers())
      .await?
      .into_iter()
      .map(|(ip, doc)| server_from_document(ip, doc))
      .collect()
  }

  // ========================================================================
  // Players
  // ========================================================================

  pub async fn player_exists(&self, server_ip: &str, player_ip: &str) -> Result<bool> {
    self.document_exists(&path::player(server_ip, player_ip)?).await
  }

  /// Create a player document if absent. Returns whether it was created.
  pub async fn create_player(&self, server_ip: &str, player_ip: &str) -> Result<bool> {
    let doc = to_document(&PlayerDoc {
      ip: player_ip.to_string(),
    })?;
    self
      .create_document(&path::player(server_ip, player_ip)?, &doc)
      .await
  }

  /// Delete the player document only. Accounts must be removed first.
  pub async fn delete_player(&self, server_ip: &str, player_ip: &str) -> Result<bool> {
    self
      .delete_document(&path::player(server_ip, player_ip)?)
      .await
  }

  /// IPs of every player under a server, ordered by IP.
  pub async fn list_players(&self, server_ip: &str) -> Result<Vec<String>> {
    let players = self
      .list_documents(&path::players(server_ip)?)
      .await?
      .into_iter()
      .map(|(ip, _)| ip)
      .collect();
    Ok(players)
  }

  // ========================================================================
  // Accounts
  // ========================================================================

  pub async fn account_exists(&self, server_ip: &str, player_ip: &str, steam64: &str) -> Result<bool> {
    self
      .document_exists(&path::account(server_ip, player_ip, steam64)?)
      .await
  }

  /// Create an account document if absent. Returns whether it was created.
  pub async fn create_account(&self, server_ip: &str, player_ip: &str, account: &Account) -> Result<bool> {
    let doc = to_document(account)?;
    self
      .create_document(&path::account(server_ip, player_ip, &account.steam64)?, &doc)
      .await
  }

  pub async fn delete_account(&self, server_ip: &str, player_ip: &str, steam64: &str) -> Result<bool> {
    self
      .delete_document(&path::account(server_ip, player_ip, steam64)?)
      .await
  }

  /// Accounts of a player, ordered by Steam64.
  pub async fn list_accounts(&self, server_ip: &str, player_ip: &str) -> Result<Vec<Account>> {
    self
      .list_documents(&path::accounts(server_ip, player_ip)?)
      .await?
      .into_iter()
      .map(|(id, doc)| account_from_document(id, doc))
      .collect()
  }
}

fn key(path: &DocPath) -> (String, String) {
  (path.collection().as_str().to_string(), path.id().to_string())
}

fn to_document<T: Serialize>(value: &T) -> Result<Document> {
  Ok(serde_json::from_value(serde_json::to_value(value)?)?)
}

#[derive(Serialize, Deserialize)]
struct ServerDoc {
  name: String,
  created_at: i64,
}

#[derive(Serialize)]
struct PlayerDoc {
  ip: String,
}

/// Account documents are schemaless. The Steam64 is always the document id;
/// a `steam64` field in the body is ignored and a missing name falls back to it.
#[derive(Deserialize)]
struct AccountDoc {
  #[serde(default)]
  name: Option<String>,
}

fn server_from_document(ip: String, doc: Document) -> Result<Server> {
  let ServerDoc { name, created_at } = serde_json::from_value(doc.into())?;
  Ok(Server {
    ip,
    name,
    created_at,
  })
}

fn account_from_document(id: String, doc: Document) -> Result<Account> {
  let AccountDoc { name } = serde_json::from_value(doc.into())?;
  Ok(Account::new(id, name.as_deref()))
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn now() -> i64 {
    1700000000 // Fixed timestamp for testing
  }

  fn doc(value: serde_json::Value) -> Document {
    serde_json::from_value(value).unwrap()
  }

  #[tokio::test]
  async fn test_document_lifecycle() {
    let db = Database::open_in_memory().await.unwrap();
    let path = path::server("1.2.3.4").unwrap();

    assert!(!db.document_exists(&path).await.unwrap());
    assert!(db.get_document(&path).await.unwrap().is_none());

    db.set_document(&path, &doc(json!({ "name": "a" })))
      .await
      .unwrap();
    assert!(db.document_exists(&path).await.unwrap());

    // set replaces
    db.set_document(&path, &doc(json!({ "name": "b" })))
      .await
      .unwrap();
    let body = db.get_document(&path).await.unwrap().unwrap();
    assert_eq!(body["name"], "b");

    assert!(db.delete_document(&path).await.unwrap());
    assert!(!db.delete_document(&path).await.unwrap());
    assert!(!db.document_exists(&path).await.unwrap());
  }

  #[tokio::test]
  async fn test_conditional_create_keeps_first_body() {
    let db = Database::open_in_memory().await.unwrap();
    let path = path::server("1.2.3.4").unwrap();

    assert!(db.create_document(&path, &doc(json!({ "name": "first" }))).await.unwrap());
    assert!(!db.create_document(&path, &doc(json!({ "name": "second" }))).await.unwrap());

    let body = db.get_document(&path).await.unwrap().unwrap();
    assert_eq!(body["name"], "first");
  }

  #[tokio::test]
  async fn test_server_lifecycle() {
    let db = Database::open_in_memory().await.unwrap();

    assert!(!db.server_exists("104.255.228.100").await.unwrap());
    assert!(db.create_server("104.255.228.100", "vanilla+", now()).await.unwrap());
    assert!(db.server_exists("104.255.228.100").await.unwrap());

    // Creating again is a no-op
    assert!(!db.create_server("104.255.228.100", "renamed", now() + 60).await.unwrap());
    let server = db.get_server("104.255.228.100").await.unwrap().unwrap();
    assert_eq!(server.name, "vanilla+");
    assert_eq!(server.created_at, now());

    db.create_server("10.0.0.1", "modded", now()).await.unwrap();
    let servers = db.list_servers().await.unwrap();
    let ips: Vec<&str> = servers.iter().map(|s| s.ip.as_str()).collect();
    assert_eq!(ips, vec!["10.0.0.1", "104.255.228.100"]);
  }

  #[tokio::test]
  async fn test_player_and_account_lifecycle() {
    let db = Database::open_in_memory().await.unwrap();
    let server = "104.255.228.100";

    assert!(db.create_player(server, "5.6.7.8").await.unwrap());
    assert!(!db.create_player(server, "5.6.7.8").await.unwrap());
    assert!(db.player_exists(server, "5.6.7.8").await.unwrap());

    let bob = Account::new("76561198000000001", Some("Bob"));
    let alt = Account::new("76561198000000002", None);
    assert!(db.create_account(server, "5.6.7.8", &bob).await.unwrap());
    assert!(db.create_account(server, "5.6.7.8", &alt).await.unwrap());
    assert!(!db.create_account(server, "5.6.7.8", &bob).await.unwrap());
    assert!(db.account_exists(server, "5.6.7.8", &bob.steam64).await.unwrap());

    let accounts = db.list_accounts(server, "5.6.7.8").await.unwrap();
    assert_eq!(accounts, vec![bob.clone(), alt.clone()]);

    assert!(db.delete_account(server, "5.6.7.8", &alt.steam64).await.unwrap());
    assert!(!db.account_exists(server, "5.6.7.8", &alt.steam64).await.unwrap());

    assert_eq!(db.list_players(server).await.unwrap(), vec!["5.6.7.8"]);
    assert!(db.delete_player(server, "5.6.7.8").await.unwrap());
    assert!(db.list_players(server).await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn test_deleting_parent_leaves_subcollection() {
    let db = Database::open_in_memory().await.unwrap();
    let server = "104.255.228.100";

    db.create_player(server, "5.6.7.8").await.unwrap();
    db.create_account(server, "5.6.7.8", &Account::new("765", None))
      .await
      .unwrap();
    db.delete_player(server, "5.6.7.8").await.unwrap();

    assert!(!db.player_exists(server, "5.6.7.8").await.unwrap());
    assert!(db.account_exists(server, "5.6.7.8", "765").await.unwrap());
  }

  #[tokio::test]
  async fn test_players_are_scoped_per_server() {
    let db = Database::open_in_memory().await.unwrap();

    db.create_player("10.0.0.1", "5.6.7.8").await.unwrap();
    db.create_player("10.0.0.2", "9.9.9.9").await.unwrap();

    assert_eq!(db.list_players("10.0.0.1").await.unwrap(), vec!["5.6.7.8"]);
    assert!(!db.player_exists("10.0.0.1", "9.9.9.9").await.unwrap());
  }

  #[tokio::test]
  async fn test_account_documents_missing_fields() {
    let db = Database::open_in_memory().await.unwrap();
    let path = path::account("10.0.0.1", "5.6.7.8", "765").unwrap();

    db.set_document(&path, &Document::new()).await.unwrap();

    let accounts = db.list_accounts("10.0.0.1", "5.6.7.8").await.unwrap();
    assert_eq!(accounts, vec![Account::new("765", Some("765"))]);
  }

  #[tokio::test]
  async fn test_accounts_are_keyed_by_document_id() {
    let db = Database::open_in_memory().await.unwrap();
    let path = path::account("10.0.0.1", "5.6.7.8", "765").unwrap();

    // Body disagrees with the id it is stored under
    db.set_document(&path, &doc(json!({ "steam64": "999", "name": "Bob" })))
      .await
      .unwrap();

    let accounts = db.list_accounts("10.0.0.1", "5.6.7.8").await.unwrap();
    assert_eq!(accounts, vec![Account::new("765", Some("Bob"))]);
    assert!(db.delete_account("10.0.0.1", "5.6.7.8", &accounts[0].steam64).await.unwrap());
  }

  #[tokio::test]
  async fn test_invalid_ids_are_rejected() {
    let db = Database::open_in_memory().await.unwrap();

    let result = db.create_player("10.0.0.1", "").await;
    assert!(matches!(result, Err(DbError::InvalidDocumentId(_))));

    let result = db.account_exists("10.0.0.1", "5.6.7.8", "7/65").await;
    assert!(matches!(result, Err(DbError::InvalidDocumentId(_))));
  }
}
