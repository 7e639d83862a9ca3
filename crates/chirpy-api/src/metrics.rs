use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{Html, Response},
};
use tracing::info;

use crate::auth::AppState;

/// Counts requests to the static file server. Owned by the app state.
#[derive(Debug, Clone, Default)]
pub struct HitCounter {
    hits: Arc<AtomicUsize>,
}

impl HitCounter {
    pub fn increment(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get(&self) -> usize {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn reset(&self) {
        self.hits.store(0, Ordering::Relaxed);
    }
}

pub async fn count_hits(State(state): State<AppState>, req: Request, next: Next) -> Response {
    state.hits.increment();
    next.run(req).await
}

/// GET /admin/metrics
pub async fn metrics_page(State(state): State<AppState>) -> Html<String> {
    Html(format!(
        "<html>\n  <body>\n    <h1>Welcome, Chirpy Admin</h1>\n    <p>Chirpy has been visited {} times!</p>\n  </body>\n</html>\n",
        state.hits.get()
    ))
}

/// POST /admin/reset
///
/// Unauthenticated. It only zeroes the in-memory hit counter and touches no
/// stored data.
pub async fn reset_metrics(State(state): State<AppState>) -> &'static str {
    state.hits.reset();
    info!("Hit counter reset");
    "OK"
}
