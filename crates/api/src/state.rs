//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::ApiConfig;
use crate::services::{Mailer, SessionCodec, StripeGateway};

/// Application state shared across all handlers. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ApiConfig,
    pool: PgPool,
    sessions: SessionCodec,
    gateway: StripeGateway,
    mailer: Mailer,
}

impl AppState {
    /// Assemble the shared state.
    #[must_use]
    pub fn new(
        config: ApiConfig,
        pool: PgPool,
        sessions: SessionCodec,
        gateway: StripeGateway,
        mailer: Mailer,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                sessions,
                gateway,
                mailer,
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &ApiConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    #[must_use]
    pub fn sessions(&self) -> &SessionCodec {
        &self.inner.sessions
    }

    #[must_use]
    pub fn gateway(&self) -> &StripeGateway {
        &self.inner.gateway
    }

    #[must_use]
    pub fn mailer(&self) -> &Mailer {
        &self.inner.mailer
    }
}
