use chrono::{DateTime, Utc};
use tracing::debug;

use crate::models::{ChirpRow, DbStructure, UserRow};
use crate::{Database, DbError, Result};

impl Database {
    // -- Chirps --

    pub fn create_chirp(&self, body: &str, author_id: u64) -> Result<ChirpRow> {
        self.with_write(|db| {
            let id = db.allocate_chirp_id();
            let chirp = ChirpRow {
                id,
                author_id,
                body: body.to_string(),
            };
            db.chirps.insert(id, chirp.clone());
            Ok(chirp)
        })
    }

    /// All chirps. Callers own ordering and filtering.
    pub fn list_chirps(&self) -> Result<Vec<ChirpRow>> {
        self.with_read(|db| Ok(db.chirps.values().cloned().collect()))
    }

    pub fn get_chirp(&self, id: u64) -> Result<ChirpRow> {
        self.with_read(|db| {
            db.chirps
                .get(&id)
                .cloned()
                .ok_or_else(|| DbError::NotFound(format!("chirp {}", id)))
        })
    }

    /// Deleting an absent chirp is not an error. Returns whether a record was removed.
    pub fn delete_chirp(&self, id: u64) -> Result<bool> {
        let removed = self.with_write(|db| Ok(db.chirps.remove(&id).is_some()))?;
        if !removed {
            debug!("Delete of absent chirp {} ignored", id);
        }
        Ok(removed)
    }

    // -- Users --

    pub fn create_user(&self, email: &str, password_hash: &str) -> Result<UserRow> {
        self.with_write(|db| {
            if db.find_user_by_email(email).is_some() {
                return Err(DbError::Conflict(format!("email {} already registered", email)));
            }

            let id = db.allocate_user_id();
            let user = UserRow {
                id,
                email: email.to_string(),
                password_hash: password_hash.to_string(),
                is_chirpy_red: false,
            };
            db.users.insert(id, user.clone());
            Ok(user)
        })
    }

    pub fn get_user(&self, id: u64) -> Result<UserRow> {
        self.with_read(|db| {
            db.users
                .get(&id)
                .cloned()
                .ok_or_else(|| DbError::NotFound(format!("user {}", id)))
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<UserRow> {
        self.with_read(|db| {
            db.find_user_by_email(email)
                .cloned()
                .ok_or_else(|| DbError::NotFound(format!("user with email {}", email)))
        })
    }

    /// Replace a user's email and password hash. The premium flag is kept.
    pub fn update_user(&self, id: u64, email: &str, password_hash: &str) -> Result<UserRow> {
        self.with_write(|db| {
            if let Some(other) = db.find_user_by_email(email) {
                if other.id != id {
                    return Err(DbError::Conflict(format!("email {} already registered", email)));
                }
            }

            let user = db
                .users
                .get_mut(&id)
                .ok_or_else(|| DbError::NotFound(format!("user {}", id)))?;
            user.email = email.to_string();
            user.password_hash = password_hash.to_string();
            Ok(user.clone())
        })
    }

    pub fn upgrade_user(&self, id: u64) -> Result<()> {
        self.with_write(|db| {
            let user = db
                .users
                .get_mut(&id)
                .ok_or_else(|| DbError::NotFound(format!("user {}", id)))?;
            user.is_chirpy_red = true;
            Ok(())
        })
    }

    // -- Revocations --

    pub fn is_token_revoked(&self, token: &str) -> Result<bool> {
        self.with_read(|db| Ok(db.revocations.contains_key(token)))
    }

    /// Record `token` as revoked at `at`. Revoking twice overwrites the timestamp.
    pub fn revoke_token(&self, token: &str, at: DateTime<Utc>) -> Result<()> {
        self.with_write(|db| {
            db.revocations.insert(token.to_string(), at);
            Ok(())
        })
    }

    /// Drop every revocation record `is_stale` selects. The store cannot
    /// read token contents, so the caller decides which records are dead.
    /// Returns how many were removed.
    pub fn prune_revocations<F>(&self, is_stale: F) -> Result<usize>
    where
        F: Fn(&str, &DateTime<Utc>) -> bool,
    {
        self.with_write(|db| {
            let len = db.revocations.len();
            db.revocations
                .retain(|token, revoked_at| !is_stale(token, revoked_at));
            Ok(len - db.revocations.len())
        })
    }

    // -- Whole aggregate --

    pub fn snapshot(&self) -> Result<DbStructure> {
        self.with_read(|db| Ok(db.clone()))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;

    use chrono::Duration;
    use tempfile::TempDir;

    use super::*;

    fn open_temp() -> (TempDir, Database) {
        let dir = TempDir::new().unwrap();
        let db = Database::open(&dir.path().join("database.json")).unwrap();
        (dir, db)
    }

    #[test]
    fn created_chirp_is_returned_by_id() {
        let (_dir, db) = open_temp();

        let chirp = db.create_chirp("hello world", 1).unwrap();
        assert_eq!(chirp.id, 1);
        assert_eq!(chirp.author_id, 1);

        assert_eq!(db.get_chirp(chirp.id).unwrap(), chirp);
        assert!(matches!(db.get_chirp(42), Err(DbError::NotFound(_))));
    }

    #[test]
    fn list_returns_every_chirp() {
        let (_dir, db) = open_temp();
        db.create_chirp("Test1", 1).unwrap();
        db.create_chirp("Test2", 2).unwrap();

        let chirps = db.list_chirps().unwrap();
        assert_eq!(chirps.len(), 2);
    }

    #[test]
    fn delete_is_idempotent() {
        let (_dir, db) = open_temp();
        let chirp = db.create_chirp("bye", 1).unwrap();

        assert!(db.delete_chirp(chirp.id).unwrap());
        assert!(!db.delete_chirp(chirp.id).unwrap());
        assert!(matches!(db.get_chirp(chirp.id), Err(DbError::NotFound(_))));
    }

    #[test]
    fn ids_are_not_reused_after_delete() {
        let (_dir, db) = open_temp();
        db.create_chirp("one", 1).unwrap();
        let second = db.create_chirp("two", 1).unwrap();
        db.delete_chirp(second.id).unwrap();

        let third = db.create_chirp("three", 1).unwrap();
        assert_eq!(third.id, 3);
    }

    #[test]
    fn duplicate_email_conflicts() {
        let (_dir, db) = open_temp();
        let user = db.create_user("a@b.com", "hash").unwrap();
        assert_eq!(user.id, 1);
        assert!(!user.is_chirpy_red);

        let result = db.create_user("a@b.com", "hash2");
        assert!(matches!(result, Err(DbError::Conflict(_))));
        assert_eq!(db.create_user("c@d.com", "hash").unwrap().id, 2);
    }

    #[test]
    fn user_lookup_by_email() {
        let (_dir, db) = open_temp();
        db.create_user("a@b.com", "hash").unwrap();

        assert_eq!(db.get_user_by_email("a@b.com").unwrap().id, 1);
        assert!(matches!(
            db.get_user_by_email("nobody@b.com"),
            Err(DbError::NotFound(_))
        ));
    }

    #[test]
    fn update_user_replaces_credentials() {
        let (_dir, db) = open_temp();
        let user = db.create_user("a@b.com", "old").unwrap();
        db.upgrade_user(user.id).unwrap();

        let updated = db.update_user(user.id, "new@b.com", "new").unwrap();
        assert_eq!(updated.email, "new@b.com");
        assert_eq!(updated.password_hash, "new");
        assert!(updated.is_chirpy_red);
        assert!(db.get_user_by_email("a@b.com").is_err());
    }

    #[test]
    fn update_user_rejects_taken_email_and_unknown_id() {
        let (_dir, db) = open_temp();
        db.create_user("a@b.com", "hash").unwrap();
        let other = db.create_user("c@d.com", "hash").unwrap();

        assert!(matches!(
            db.update_user(other.id, "a@b.com", "hash"),
            Err(DbError::Conflict(_))
        ));
        // Keeping your own email is fine.
        assert!(db.update_user(other.id, "c@d.com", "hash2").is_ok());
        assert!(matches!(
            db.update_user(99, "x@y.com", "hash"),
            Err(DbError::NotFound(_))
        ));
    }

    #[test]
    fn upgrade_sets_premium_flag() {
        let (_dir, db) = open_temp();
        let user = db.create_user("a@b.com", "hash").unwrap();

        db.upgrade_user(user.id).unwrap();
        assert!(db.get_user(user.id).unwrap().is_chirpy_red);
        assert!(matches!(db.upgrade_user(7), Err(DbError::NotFound(_))));
    }

    #[test]
    fn revocation_round_trip() {
        let (_dir, db) = open_temp();
        let now = Utc::now();

        assert!(!db.is_token_revoked("tok").unwrap());
        db.revoke_token("tok", now).unwrap();
        db.revoke_token("tok", now).unwrap();
        assert!(db.is_token_revoked("tok").unwrap());
        assert_eq!(db.snapshot().unwrap().revocations.len(), 1);
    }

    #[test]
    fn prune_drops_only_selected_revocations() {
        let (_dir, db) = open_temp();
        let now = Utc::now();
        db.revoke_token("dead", now - Duration::days(90)).unwrap();
        db.revoke_token("live", now - Duration::days(90)).unwrap();

        let pruned = db.prune_revocations(|token, _| token == "dead").unwrap();
        assert_eq!(pruned, 1);
        assert!(!db.is_token_revoked("dead").unwrap());
        assert!(db.is_token_revoked("live").unwrap());

        assert_eq!(db.prune_revocations(|_, _| false).unwrap(), 0);
    }

    #[test]
    fn aggregate_survives_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("database.json");
        let db = Database::open(&path).unwrap();

        let user = db.create_user("a@b.com", "hash").unwrap();
        db.create_chirp("persisted", user.id).unwrap();
        db.revoke_token("tok", Utc::now()).unwrap();
        let before = db.snapshot().unwrap();
        drop(db);

        let reopened = Database::open(&path).unwrap();
        assert_eq!(reopened.snapshot().unwrap(), before);
    }

    #[test]
    fn concurrent_creates_lose_nothing() {
        let (_dir, db) = open_temp();
        let db = Arc::new(db);
        const WRITERS: usize = 16;

        let handles: Vec<_> = (0..WRITERS)
            .map(|i| {
                let db = Arc::clone(&db);
                std::thread::spawn(move || db.create_chirp(&format!("chirp {i}"), i as u64).unwrap())
            })
            .collect();

        let ids: HashSet<u64> = handles.into_iter().map(|h| h.join().unwrap().id).collect();
        assert_eq!(ids.len(), WRITERS);
        assert_eq!(db.list_chirps().unwrap().len(), WRITERS);
    }
}
