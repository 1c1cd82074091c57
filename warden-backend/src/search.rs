//! Linear search over a player cache.

use warden_db::Player;

use crate::cache::PlayerCache;

/// Find players matching `query`, case-insensitively.
///
/// A player matches when the query is a substring of its IP, or of any of
/// its accounts' Steam64 or name. Matches always carry the player's full
/// account list. An empty query matches every player. Results keep cache
/// order.
pub fn search<'a>(query: &str, cache: &'a PlayerCache) -> Vec<&'a Player> {
    let query = query.to_lowercase();

    let found: Vec<&Player> = cache
        .players()
        .iter()
        .filter(|player| matches(&query, player))
        .collect();

    tracing::debug!(
        server_ip = cache.server_ip(),
        %query,
        found = found.len(),
        "searched players"
    );
    found
}

fn matches(query: &str, player: &Player) -> bool {
    if contains(&player.ip, query) {
        return true;
    }
    player
        .accounts
        .iter()
        .any(|a| contains(&a.steam64, query) || contains(&a.name, query))
}

/// `query` must already be lowercase.
fn contains(haystack: &str, query: &str) -> bool {
    haystack.to_lowercase().contains(query)
}
