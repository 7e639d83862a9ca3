//! Persisted record types. Distinct from chirpy-types API models so the
//! password hash stays inside the store layer.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use chirpy_types::models::{Chirp, User};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChirpRow {
    pub id: u64,
    pub author_id: u64,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRow {
    pub id: u64,
    pub email: String,
    #[serde(rename = "password")]
    pub password_hash: String,
    #[serde(default)]
    pub is_chirpy_red: bool,
}

/// Next id to hand out per map. Zero means "never recorded", which is the
/// case for files written before the counters existed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NextIds {
    pub chirps: u64,
    pub users: u64,
}

/// The full persisted aggregate; the unit of every load and write.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DbStructure {
    pub chirps: BTreeMap<u64, ChirpRow>,
    pub users: BTreeMap<u64, UserRow>,
    pub revocations: BTreeMap<String, DateTime<Utc>>,
    pub next_ids: NextIds,
}

impl DbStructure {
    pub fn allocate_chirp_id(&mut self) -> u64 {
        let id = next_id(self.next_ids.chirps, &self.chirps);
        self.next_ids.chirps = id + 1;
        id
    }

    pub fn allocate_user_id(&mut self) -> u64 {
        let id = next_id(self.next_ids.users, &self.users);
        self.next_ids.users = id + 1;
        id
    }

    pub fn find_user_by_email(&self, email: &str) -> Option<&UserRow> {
        self.users.values().find(|u| u.email == email)
    }
}

// Never below the highest live id, so counters lost or absent on disk
// cannot cause a collision.
fn next_id<V>(counter: u64, map: &BTreeMap<u64, V>) -> u64 {
    let after_last = map.keys().next_back().map_or(1, |last| last + 1);
    counter.max(after_last).max(1)
}

impl From<ChirpRow> for Chirp {
    fn from(row: ChirpRow) -> Self {
        Self {
            id: row.id,
            author_id: row.author_id,
            body: row.body,
        }
    }
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            email: row.email,
            is_chirpy_red: row.is_chirpy_red,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_start_at_one() {
        let mut s = DbStructure::default();
        assert_eq!(s.allocate_chirp_id(), 1);
        assert_eq!(s.allocate_chirp_id(), 2);
        assert_eq!(s.allocate_user_id(), 1);
    }

    #[test]
    fn legacy_layout_continues_after_highest_id() {
        let raw = r#"{
            "chirps": {
                "1": {"id": 1, "author_id": 1, "body": "a"},
                "4": {"id": 4, "author_id": 1, "body": "b"}
            },
            "users": {
                "1": {"id": 1, "email": "a@b.com", "password": "hash"}
            }
        }"#;
        let mut s: DbStructure = serde_json::from_str(raw).unwrap();

        assert!(s.revocations.is_empty());
        assert!(!s.users[&1].is_chirpy_red);
        assert_eq!(s.allocate_chirp_id(), 5);
        assert_eq!(s.allocate_user_id(), 2);
    }

    #[test]
    fn persisted_field_names_match_layout() {
        let mut s = DbStructure::default();
        s.users.insert(
            1,
            UserRow {
                id: 1,
                email: "a@b.com".into(),
                password_hash: "hash".into(),
                is_chirpy_red: true,
            },
        );

        let value = serde_json::to_value(&s).unwrap();
        assert_eq!(value["users"]["1"]["password"], "hash");
        assert_eq!(value["users"]["1"]["is_chirpy_red"], true);
        assert!(value["chirps"].as_object().unwrap().is_empty());
        assert!(value["revocations"].as_object().unwrap().is_empty());
    }
}
