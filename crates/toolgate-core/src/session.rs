// crates/toolgate-core/src/session.rs
// ============================================================================
// Module: Session
// Description: Lazily-initialized backing client with readiness tracking.
// Purpose: Gate every non-init tool on a successful init call.
// Dependencies: std
// ============================================================================

//! ## Overview
//! A [`Session`] starts uninitialized and becomes ready only after an init
//! attempt succeeds. Re-initialization replaces the client (last write wins);
//! a failed re-initialization leaves the previous client in place. Handlers
//! receive a cloned `Arc` so an in-flight call keeps using the client it
//! started with even if a concurrent init swaps it.

use std::future::Future;
use std::sync::Arc;
use std::sync::PoisonError;
use std::sync::RwLock;

use crate::backend::Connected;
use crate::envelope::ToolOutput;
use crate::error::GatewayError;

/// Process-local backing client slot.
///
/// # Invariants
/// - `is_initialized()` is true iff a client is installed.
/// - The client is replaced only by a successful init attempt.
#[derive(Debug)]
pub struct Session<C> {
    /// Backing service display name.
    service: &'static str,
    /// Installed client, if any.
    client: RwLock<Option<Arc<C>>>,
}

impl<C: Send + Sync + 'static> Session<C> {
    /// Creates an uninitialized session.
    #[must_use]
    pub const fn new(service: &'static str) -> Self {
        Self {
            service,
            client: RwLock::new(None),
        }
    }

    /// Returns the backing service display name.
    #[must_use]
    pub const fn service(&self) -> &'static str {
        self.service
    }

    /// Returns true once a client is installed.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.client.read().unwrap_or_else(PoisonError::into_inner).is_some()
    }

    /// Runs an init attempt and installs the resulting client on success.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InitFailed`] wrapping the attempt's failure.
    pub async fn initialize<F>(&self, attempt: F) -> Result<ToolOutput, GatewayError>
    where
        F: Future<Output = Result<Connected<C>, GatewayError>> + Send,
    {
        match attempt.await {
            Ok(connected) => {
                self.install(connected.client);
                Ok(connected.summary)
            }
            Err(err) => Err(GatewayError::InitFailed {
                service: self.service,
                message: err.to_string(),
            }),
        }
    }

    /// Returns the installed client.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::NotInitialized`] before a successful init.
    pub fn require_ready(&self) -> Result<Arc<C>, GatewayError> {
        self.client.read().unwrap_or_else(PoisonError::into_inner).clone().ok_or(
            GatewayError::NotInitialized {
                service: self.service,
            },
        )
    }

    /// Replaces the installed client.
    fn install(&self, client: C) {
        let mut slot = self.client.write().unwrap_or_else(PoisonError::into_inner);
        *slot = Some(Arc::new(client));
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
