//! Home screen: report templates.

use std::sync::Arc;

use awrc_client::{Session, Template};

use crate::error::ViewError;
use crate::routes::Route;

pub struct TemplatesListScreen {
    session: Arc<Session>,
    templates: Vec<Template>,
    error_text: Option<String>,
}

impl TemplatesListScreen {
    #[must_use]
    pub fn new(session: Arc<Session>) -> Self {
        Self {
            session,
            templates: Vec::new(),
            error_text: None,
        }
    }

    #[must_use]
    pub fn templates(&self) -> &[Template] {
        &self.templates
    }

    #[must_use]
    pub fn error_text(&self) -> Option<&str> {
        self.error_text.as_deref()
    }

    /// Loads the shared template list.
    ///
    /// # Errors
    ///
    /// Returns [`ViewError::Client`] when the list cannot be fetched; the
    /// banner reads `Unable to load your Templates (<code>: <message>)`.
    pub async fn load(&mut self) -> Result<&[Template], ViewError> {
        match self.session.list_templates(true).await {
            Ok(templates) => {
                self.error_text = None;
                self.templates = templates;
                Ok(&self.templates)
            }
            Err(e) => {
                self.error_text = Some(e.failure().describe("Unable to load your Templates"));
                Err(e.into())
            }
        }
    }

    #[must_use]
    pub fn create() -> Route {
        Route::NewTemplate
    }

    #[must_use]
    pub fn edit(id: i64) -> Route {
        Route::Template(id.to_string())
    }

    #[must_use]
    pub fn copy(id: i64) -> Route {
        Route::Template(format!("+{id}"))
    }
}
