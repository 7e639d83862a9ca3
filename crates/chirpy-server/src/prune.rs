use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{info, warn};

use chirpy_api::tokens::unverified_expiry;
use chirpy_db::Database;

/// Background task that prunes dead revocation records.
///
/// A record is dead once its token can no longer pass validation anyway:
/// its own `exp` has passed, or it does not decode at all.
pub async fn run_prune_loop(db: Arc<Database>, interval_secs: u64) {
    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));

    loop {
        interval.tick().await;

        match prune_once(db.clone()).await {
            Ok(count) => {
                if count > 0 {
                    info!("Prune: dropped {} dead revocations", count);
                }
            }
            Err(e) => {
                warn!("Prune error: {}", e);
            }
        }
    }
}

pub async fn prune_once(db: Arc<Database>) -> anyhow::Result<usize> {
    let now = Utc::now();
    let count = tokio::task::spawn_blocking(move || {
        db.prune_revocations(|token, _| unverified_expiry(token).is_none_or(|exp| exp <= now))
    })
    .await??;
    Ok(count)
}
