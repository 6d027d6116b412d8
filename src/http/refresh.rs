//! Single-flight token refresh.
//!
//! Every request that fails with a 401 lands here. The first caller of an
//! idle cycle becomes the leader: it runs the refresh operation exactly once
//! and then settles every queued ticket. Followers only enqueue and wait.
//! The in-flight flag clears only after the full queue drain, so cycles are
//! strictly sequential and no queued request is ever retried against a token
//! older than the one its cycle obtained.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;

use crate::auth::storage::CredentialStore;
use crate::auth::{LoginRedirect, SESSION_EXPIRED_MESSAGE};
use crate::error::ClientError;
use crate::http::envelope::ApiResponse;
use crate::http::{AuthMode, RequestConfig, ServiceClient};

/// The refresh operation itself: exchange the stored refresh token for a new
/// one and store it. Implemented by the user session.
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    async fn refresh_token(&self) -> Result<(), ClientError>;
}

/// One HTTP call suspended while a refresh is in flight. Owned exclusively
/// by the coordinator's queue; settled exactly once, within its own cycle.
struct PendingTicket {
    config: RequestConfig,
    client: ServiceClient,
    tx: oneshot::Sender<Result<ApiResponse, ClientError>>,
}

#[derive(Default)]
struct RefreshState {
    in_flight: bool,
    queue: Vec<PendingTicket>,
}

/// Coordinates concurrent 401 recoveries into one refresh network call.
/// All internal state is private; the only entry point is
/// [`retry_with_refresh`](RefreshCoordinator::retry_with_refresh).
pub struct RefreshCoordinator {
    refresher: Arc<dyn TokenRefresher>,
    store: Arc<CredentialStore>,
    redirect: Arc<dyn LoginRedirect>,
    state: Mutex<RefreshState>,
}

impl RefreshCoordinator {
    pub fn new(
        refresher: Arc<dyn TokenRefresher>,
        store: Arc<CredentialStore>,
        redirect: Arc<dyn LoginRedirect>,
    ) -> Self {
        Self {
            refresher,
            store,
            redirect,
            state: Mutex::new(RefreshState::default()),
        }
    }

    /// Queue `config` for replay after a token refresh. If no refresh is in
    /// flight this call leads the cycle; otherwise its ticket waits for the
    /// current leader to settle it.
    pub async fn retry_with_refresh(
        &self,
        config: RequestConfig,
        client: &ServiceClient,
    ) -> Result<ApiResponse, ClientError> {
        let (tx, rx) = oneshot::channel();

        let leader = {
            let mut state = self.state.lock().expect("refresh state lock poisoned");
            state.queue.push(PendingTicket {
                config,
                client: client.clone(),
                tx,
            });
            if state.in_flight {
                false
            } else {
                state.in_flight = true;
                true
            }
        };

        if leader {
            self.run_cycles().await;
        }

        rx.await.unwrap_or(Err(ClientError::TokenRefreshFailed))
    }

    /// Leader loop. A 401 arriving while a drain is underway enqueues behind
    /// the in-flight flag; those stragglers get a fresh cycle of their own
    /// instead of a token they did not wait for.
    async fn run_cycles(&self) {
        loop {
            self.run_one_cycle().await;

            let drained = {
                let mut state = self.state.lock().expect("refresh state lock poisoned");
                if state.queue.is_empty() {
                    state.in_flight = false;
                    true
                } else {
                    false
                }
            };
            if drained {
                return;
            }
        }
    }

    async fn run_one_cycle(&self) {
        let outcome = self.refresher.refresh_token().await;

        let tickets = {
            let mut state = self.state.lock().expect("refresh state lock poisoned");
            std::mem::take(&mut state.queue)
        };

        match outcome {
            Ok(()) => {
                let token = self.store.access_token();
                tracing::info!(queued = tickets.len(), "refresh succeeded, replaying queued requests");

                let replays = tickets.into_iter().map(|ticket| {
                    let token = token.clone();
                    async move {
                        let mut config = ticket.config;
                        // Pin bearer requests to this cycle's token so the
                        // replay can never race a later refresh. Requests on
                        // other auth modes read the store, which holds this
                        // cycle's token until the drain completes.
                        if config.auth == AuthMode::Bearer {
                            if let Some(token) = token {
                                config.auth = AuthMode::Explicit(token);
                            }
                        }
                        let result = ticket.client.replay(config).await;
                        let _ = ticket.tx.send(result);
                    }
                });
                futures::future::join_all(replays).await;
            }
            Err(err) => {
                tracing::warn!(queued = tickets.len(), "token refresh failed: {err}");
                for ticket in tickets {
                    let _ = ticket.tx.send(Err(ClientError::TokenRefreshFailed));
                }
                self.redirect
                    .redirect_to_login(Some(SESSION_EXPIRED_MESSAGE))
                    .await;
            }
        }
    }
}
