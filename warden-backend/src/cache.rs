//! In-memory cache of one server's players.
//!
//! The store is the source of truth. A cache is built by a full scan when a
//! server is selected and is only correct as of that scan; the roster
//! operations patch it as they write, and nothing else keeps it fresh.

use std::sync::Arc;

use scc::HashMap;
use tokio::sync::Mutex;
use tracing::{debug, info};
use warden_db::{Account, Database, DbError, Player};

/// Players of a single server, in the order the store listed them.
#[derive(Debug, Clone)]
pub struct PlayerCache {
    server_ip: String,
    /// Using Vec for cheap in-order iteration; lookups are linear.
    players: Vec<Player>,
    /// Whether this cache came from a store scan.
    loaded: bool,
}

impl PlayerCache {
    /// Create an empty cache for a server.
    pub fn new(server_ip: impl Into<String>) -> Self {
        Self {
            server_ip: server_ip.into(),
            players: Vec::new(),
            loaded: false,
        }
    }

    /// Build a cache by scanning every player of the server and, for each,
    /// its full account list.
    pub async fn load(db: &Database, server_ip: &str) -> Result<Self, DbError> {
        let mut cache = Self::new(server_ip);
        for player_ip in db.list_players(server_ip).await? {
            let accounts = db.list_accounts(server_ip, &player_ip).await?;
            cache.players.push(Player::new(player_ip, accounts));
        }

        cache.loaded = true;
        info!(server_ip, players = cache.len(), "loaded player cache");
        Ok(cache)
    }

    pub fn server_ip(&self) -> &str {
        &self.server_ip
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn get(&self, player_ip: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.ip == player_ip)
    }

    /// Add an account, creating the player entry if needed.
    /// Returns false if the player already had an account with this Steam64.
    pub fn insert_account(&mut self, player_ip: &str, account: Account) -> bool {
        let idx = match self.players.iter().position(|p| p.ip == player_ip) {
            Some(idx) => idx,
            None => {
                self.players.push(Player::new(player_ip, Vec::new()));
                self.players.len() - 1
            }
        };

        let player = &mut self.players[idx];
        if player.has_account(&account.steam64) {
            return false;
        }
        player.accounts.push(account);
        true
    }

    /// Remove a player entry. Keeps the order of the remaining players.
    pub fn remove_player(&mut self, player_ip: &str) -> Option<Player> {
        let idx = self.players.iter().position(|p| p.ip == player_ip)?;
        Some(self.players.remove(idx))
    }

    /// Drop one account from a cached player.
    /// Returns the number of accounts left, or None if the player isn't cached.
    pub fn remove_account(&mut self, player_ip: &str, steam64: &str) -> Option<usize> {
        let player = self.players.iter_mut().find(|p| p.ip == player_ip)?;
        player.accounts.retain(|a| a.steam64 != steam64);
        Some(player.accounts.len())
    }
}

/// A server's cache, shared between requests.
pub type SharedCache = Arc<Mutex<PlayerCache>>;

/// Caches of every server selected so far, keyed by server IP.
pub struct Sessions {
    caches: HashMap<String, SharedCache>,
}

impl Sessions {
    pub fn new() -> Self {
        Self {
            caches: HashMap::new(),
        }
    }

    /// The one shared cache registered for a server, created empty if absent.
    async fn slot(&self, server_ip: &str) -> SharedCache {
        self.caches
            .entry_async(server_ip.to_string())
            .await
            .or_insert_with(|| Arc::new(Mutex::new(PlayerCache::new(server_ip))))
            .get()
            .clone()
    }

    /// Rebuild a server's cache from the store.
    ///
    /// The rebuild happens in place under the cache's lock, so a roster
    /// operation already holding the cache finishes first and is visible in
    /// the rebuilt copy.
    pub async fn reload(&self, db: &Database, server_ip: &str) -> Result<SharedCache, DbError> {
        let shared = self.slot(server_ip).await;
        {
            let mut cache = shared.lock().await;
            *cache = PlayerCache::load(db, server_ip).await?;
        }
        Ok(shared)
    }

    /// The cached players of a server, loading them on first use.
    pub async fn get_or_load(&self, db: &Database, server_ip: &str) -> Result<SharedCache, DbError> {
        let shared = self.slot(server_ip).await;
        {
            let mut cache = shared.lock().await;
            if !cache.is_loaded() {
                debug!(server_ip, "cache miss");
                *cache = PlayerCache::load(db, server_ip).await?;
            }
        }
        Ok(shared)
    }
}

impl Default for Sessions {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bob() -> Account {
        Account::new("76561198000000001", Some("Bob"))
    }

    #[test]
    fn test_insert_account_creates_player_and_skips_duplicates() {
        let mut cache = PlayerCache::new("10.0.0.1");

        assert!(cache.insert_account("1.2.3.4", bob()));
        assert!(!cache.insert_account("1.2.3.4", bob()));
        assert!(cache.insert_account("1.2.3.4", Account::new("76561198000000002", None)));

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("1.2.3.4").unwrap().accounts.len(), 2);
    }

    #[test]
    fn test_remove_player_keeps_order() {
        let mut cache = PlayerCache::new("10.0.0.1");
        for ip in ["1.1.1.1", "2.2.2.2", "3.3.3.3"] {
            cache.insert_account(ip, bob());
        }

        assert!(cache.remove_player("2.2.2.2").is_some());
        assert!(cache.remove_player("2.2.2.2").is_none());

        let ips: Vec<&str> = cache.players().iter().map(|p| p.ip.as_str()).collect();
        assert_eq!(ips, vec!["1.1.1.1", "3.3.3.3"]);
    }

    #[test]
    fn test_remove_account_reports_remaining() {
        let mut cache = PlayerCache::new("10.0.0.1");
        cache.insert_account("1.2.3.4", bob());
        cache.insert_account("1.2.3.4", Account::new("76561198000000002", None));

        assert_eq!(cache.remove_account("1.2.3.4", "76561198000000002"), Some(1));
        assert_eq!(cache.remove_account("1.2.3.4", "76561198000000001"), Some(0));
        assert_eq!(cache.remove_account("9.9.9.9", "76561198000000001"), None);
    }

    #[tokio::test]
    async fn test_load_scans_players_and_accounts() {
        let db = Database::open_in_memory().await.unwrap();
        db.create_player("10.0.0.1", "1.2.3.4").await.unwrap();
        db.create_account("10.0.0.1", "1.2.3.4", &bob()).await.unwrap();
        db.create_player("10.0.0.1", "5.6.7.8").await.unwrap();
        // Another server's players stay out
        db.create_player("10.0.0.2", "9.9.9.9").await.unwrap();

        let cache = PlayerCache::load(&db, "10.0.0.1").await.unwrap();
        assert_eq!(cache.server_ip(), "10.0.0.1");
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("1.2.3.4").unwrap().accounts, vec![bob()]);
        assert!(cache.get("5.6.7.8").unwrap().accounts.is_empty());
        assert!(cache.get("9.9.9.9").is_none());
    }

    #[tokio::test]
    async fn test_sessions_reload_rebuilds_in_place() {
        let db = Database::open_in_memory().await.unwrap();
        let sessions = Sessions::new();

        let first = sessions.get_or_load(&db, "10.0.0.1").await.unwrap();
        assert!(first.lock().await.is_empty());

        // Written behind the cache's back
        db.create_player("10.0.0.1", "1.2.3.4").await.unwrap();
        let same = sessions.get_or_load(&db, "10.0.0.1").await.unwrap();
        assert!(same.lock().await.is_empty());

        let fresh = sessions.reload(&db, "10.0.0.1").await.unwrap();
        assert_eq!(fresh.lock().await.len(), 1);
        let cached = sessions.get_or_load(&db, "10.0.0.1").await.unwrap();
        assert_eq!(cached.lock().await.len(), 1);

        // Same shared cache throughout
        assert!(Arc::ptr_eq(&first, &fresh));
        assert!(Arc::ptr_eq(&first, &cached));
    }

    #[tokio::test]
    async fn test_concurrent_first_use_shares_one_cache() {
        let db = Database::open_in_memory().await.unwrap();
        db.create_player("10.0.0.1", "1.2.3.4").await.unwrap();
        let sessions = Sessions::new();

        let (a, b, c) = tokio::join!(
            sessions.get_or_load(&db, "10.0.0.1"),
            sessions.get_or_load(&db, "10.0.0.1"),
            sessions.reload(&db, "10.0.0.1"),
        );
        let (a, b, c) = (a.unwrap(), b.unwrap(), c.unwrap());
        assert!(Arc::ptr_eq(&a, &b));
        assert!(Arc::ptr_eq(&a, &c));

        // A write through one handle is seen through the others
        a.lock().await.insert_account("5.6.7.8", bob());
        assert_eq!(b.lock().await.len(), 2);
        assert!(c.lock().await.is_loaded());
    }
}
