//! Add and remove players and accounts, keeping a server's cache in step
//! with the store.
//!
//! Nothing here is transactional. A store failure partway through a
//! multi-document operation leaves the store and the cache out of step
//! until the next reload.

use thiserror::Error;
use tracing::{error, info, warn};
use warden_db::{Account, Database, DbError};

use crate::cache::PlayerCache;
use crate::helpers::now;

#[derive(Debug, Error)]
pub enum RosterError {
    #[error("player {0} does not exist")]
    PlayerNotFound(String),

    #[error("account {steam64} does not exist for player {player_ip}")]
    AccountNotFound { player_ip: String, steam64: String },

    #[error("account {steam64} already exists for player {player_ip}")]
    AccountAlreadyExists { player_ip: String, steam64: String },

    #[error(transparent)]
    Store(#[from] DbError),
}

/// Create a server document unless one exists. Returns whether it was created.
pub async fn ensure_server(db: &Database, server_ip: &str, name: &str) -> Result<bool, RosterError> {
    let created = db
        .create_server(server_ip, name, now())
        .await
        .inspect_err(|err| error!(?err, server_ip, "failed to create server"))?;
    Ok(created)
}

/// Record a Steam account seen on a player's IP, on the cache's server.
///
/// The player is created if this is its first account. The account name
/// falls back to the Steam64 ID when `name` is absent or empty. Fails with
/// `AccountAlreadyExists` if the player already has this Steam64, leaving
/// the store and cache untouched.
pub async fn add_player(
    db: &Database,
    cache: &mut PlayerCache,
    player_ip: &str,
    steam64: &str,
    name: Option<&str>,
) -> Result<Account, RosterError> {
    let server_ip = cache.server_ip().to_string();
    let account = Account::new(steam64, name);

    let player_created = db
        .create_player(&server_ip, player_ip)
        .await
        .inspect_err(|err| error!(?err, player_ip, "failed to create player"))?;
    if player_created {
        info!(%server_ip, player_ip, "new player created");
    }

    let account_created = db
        .create_account(&server_ip, player_ip, &account)
        .await
        .inspect_err(|err| error!(?err, player_ip, steam64, "failed to add account"))?;
    if !account_created {
        warn!(%server_ip, player_ip, steam64, "account already exists");
        return Err(RosterError::AccountAlreadyExists {
            player_ip: player_ip.to_string(),
            steam64: steam64.to_string(),
        });
    }

    cache.insert_account(player_ip, account.clone());
    info!(%server_ip, player_ip, steam64, name = %account.name, "added account");
    Ok(account)
}

/// Delete a player with all of its accounts.
///
/// The existence check and the deletes are separate round trips. An account
/// listed but gone by the time it is deleted fails the whole call with
/// `AccountNotFound` and leaves the player document in place.
pub async fn delete_player(db: &Database, cache: &mut PlayerCache, player_ip: &str) -> Result<(), RosterError> {
    let server_ip = cache.server_ip().to_string();

    if !db.player_exists(&server_ip, player_ip).await? {
        warn!(%server_ip, player_ip, "player does not exist");
        return Err(RosterError::PlayerNotFound(player_ip.to_string()));
    }

    let accounts = db.list_accounts(&server_ip, player_ip).await?;
    for account in &accounts {
        let deleted = db
            .delete_account(&server_ip, player_ip, &account.steam64)
            .await
            .inspect_err(|err| error!(?err, player_ip, "failed to delete account"))?;
        if !deleted {
            error!(%server_ip, player_ip, steam64 = %account.steam64, "listed account was not deleted");
            return Err(RosterError::AccountNotFound {
                player_ip: player_ip.to_string(),
                steam64: account.steam64.clone(),
            });
        }
    }
    db.delete_player(&server_ip, player_ip)
        .await
        .inspect_err(|err| error!(?err, player_ip, "failed to delete player"))?;

    cache.remove_player(player_ip);
    info!(%server_ip, player_ip, accounts = accounts.len(), "deleted player");
    Ok(())
}

/// Delete one account. A player left with no accounts is deleted too.
///
/// Whether accounts remain is read from the cache; if the player isn't
/// cached, the store is asked instead. A cached count can be stale: if
/// another operator added an account after this cache was loaded, the count
/// still reaches zero and the player document is deleted, leaving that
/// account under a missing player until the next reload.
pub async fn delete_account(
    db: &Database,
    cache: &mut PlayerCache,
    player_ip: &str,
    steam64: &str,
) -> Result<(), RosterError> {
    let server_ip = cache.server_ip().to_string();

    if !db.player_exists(&server_ip, player_ip).await? {
        warn!(%server_ip, player_ip, "player does not exist");
        return Err(RosterError::PlayerNotFound(player_ip.to_string()));
    }

    let deleted = db
        .delete_account(&server_ip, player_ip, steam64)
        .await
        .inspect_err(|err| error!(?err, player_ip, steam64, "failed to delete account"))?;
    if !deleted {
        warn!(%server_ip, player_ip, steam64, "account does not exist");
        return Err(RosterError::AccountNotFound {
            player_ip: player_ip.to_string(),
            steam64: steam64.to_string(),
        });
    }
    info!(%server_ip, player_ip, steam64, "deleted account");

    let remaining = match cache.remove_account(player_ip, steam64) {
        Some(remaining) => remaining,
        None => db.list_accounts(&server_ip, player_ip).await?.len(),
    };
    if remaining == 0 {
        db.delete_player(&server_ip, player_ip)
            .await
            .inspect_err(|err| error!(?err, player_ip, "failed to delete empty player"))?;
        cache.remove_player(player_ip);
        info!(%server_ip, player_ip, "no accounts left, deleted player");
    }
    Ok(())
}
