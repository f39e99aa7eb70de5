//! Parsers for the `/players` and `/admins` console responses.

use crate::types::Player;

const ONLINE_MARKER: &str = "(online)";

/// Parse `/players` output: a header line (`Players (N):`) followed by
/// one `username[ (online)]` line per known player.
pub fn parse_players(raw: &[u8]) -> Vec<Player> {
    let text = String::from_utf8_lossy(raw);
    text.lines()
        .skip(1)
        .filter_map(|line| {
            let line = line.trim();
            if line.is_empty() {
                return None;
            }
            let (username, extra) = line.split_once(' ').unwrap_or((line, ""));
            Some(Player {
                username: username.to_string(),
                is_online: extra.split_whitespace().any(|word| word == ONLINE_MARKER),
            })
        })
        .collect()
}

/// Parse `/admins` output (one username per line).
///
/// Admins that appear in `known_players` reuse that record, so their online
/// state follows the player list. Anyone else is reported offline.
pub fn parse_admins(raw: &[u8], known_players: &[Player]) -> Vec<Player> {
    let text = String::from_utf8_lossy(raw);
    text.lines()
        .map(str::trim)
        .filter(|username| !username.is_empty())
        .map(|username| {
            known_players
                .iter()
                .find(|player| player.username == username)
                .cloned()
                .unwrap_or_else(|| Player::offline(username))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn players_online_and_offline() {
        let players = parse_players(b"Online players (2):\nalice (online)\nbob\n");
        assert_eq!(players, vec![Player::online("alice"), Player::offline("bob")]);
    }

    #[test]
    fn players_indented_lines() {
        let players = parse_players(b"Players (2):\n  alice (online)\n  bob");
        assert_eq!(players, vec![Player::online("alice"), Player::offline("bob")]);
    }

    #[test]
    fn players_header_only() {
        assert!(parse_players(b"Players (0):").is_empty());
        assert!(parse_players(b"").is_empty());
    }

    #[test]
    fn players_marker_must_be_a_separate_word() {
        let players = parse_players(b"Players (1):\nbob (online)x");
        assert_eq!(players, vec![Player::offline("bob")]);
    }

    #[test]
    fn admins_join_known_players() {
        let known = vec![Player::online("alice")];
        let admins = parse_admins(b"alice\ncarol\n", &known);
        assert_eq!(admins, vec![Player::online("alice"), Player::offline("carol")]);
    }

    #[test]
    fn admins_without_known_players_are_offline() {
        let admins = parse_admins(b"dave\r\n\r\n", &[]);
        assert_eq!(admins, vec![Player::offline("dave")]);
    }
}
