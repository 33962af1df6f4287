//! Home screen: the user's MCCs.

use std::sync::Arc;

use awrc_client::{Mcc, Session};
use awrc_core::{ApiFailure, Ccid};

use crate::error::ViewError;
use crate::routes::Route;

pub struct AccountsListScreen {
    session: Arc<Session>,
    mccs: Vec<Mcc>,
    error_text: Option<String>,
}

impl AccountsListScreen {
    #[must_use]
    pub fn new(session: Arc<Session>) -> Self {
        Self {
            session,
            mccs: Vec::new(),
            error_text: None,
        }
    }

    #[must_use]
    pub fn mccs(&self) -> &[Mcc] {
        &self.mccs
    }

    #[must_use]
    pub fn error_text(&self) -> Option<&str> {
        self.error_text.as_deref()
    }

    /// # Errors
    ///
    /// Returns [`ViewError::Client`] when the list cannot be fetched; the
    /// banner reads `Unable to load your MCCs (<code>: <message>)`.
    pub async fn load(&mut self) -> Result<&[Mcc], ViewError> {
        match self.session.list_mccs().await {
            Ok(mccs) => {
                self.error_text = None;
                self.mccs = mccs;
                Ok(&self.mccs)
            }
            Err(e) => {
                self.error_text = Some(e.failure().describe("Unable to load your MCCs"));
                Err(e.into())
            }
        }
    }

    /// Route for the chosen MCC.
    ///
    /// # Errors
    ///
    /// Returns `no_such_mcc` when `id` is not in the loaded list.
    pub fn select(&self, id: Ccid) -> Result<Route, ViewError> {
        self.mccs
            .iter()
            .find(|m| m.top_account_id == id)
            .map(|m| Route::Account(m.top_account_id))
            .ok_or_else(|| ViewError::Client(ApiFailure::no_such_mcc().into()))
    }

    /// # Errors
    ///
    /// Propagates [`ViewError::Client`] from the delete request.
    pub async fn delete(&mut self, id: Ccid) -> Result<(), ViewError> {
        self.session.delete_mcc(id).await?;
        self.mccs.retain(|m| m.top_account_id != id);
        Ok(())
    }
}
