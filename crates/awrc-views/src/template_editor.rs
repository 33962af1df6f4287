//! Template editor: create, edit, or copy an HTML report template.

use std::path::Path;
use std::sync::Arc;

use awrc_client::{Session, TemplateDraft};

use crate::busy::BusyFlag;
use crate::error::ViewError;
use crate::routes::Route;

/// How the editor was opened, from the route's template parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorMode {
    New,
    Edit(i64),
    /// New template initialised from an existing one.
    CopyOf(i64),
}

impl EditorMode {
    /// `None`/empty → new, `"<id>"` → edit, `"+<id>"` → copy. Returns `None`
    /// for a parameter that is not a template id.
    #[must_use]
    pub fn from_param(param: Option<&str>) -> Option<Self> {
        let param = param.map(str::trim).unwrap_or_default();
        if param.is_empty() {
            return Some(EditorMode::New);
        }
        match param.strip_prefix('+') {
            Some(id) => id.parse().ok().map(EditorMode::CopyOf),
            None => param.parse().ok().map(EditorMode::Edit),
        }
    }

    #[must_use]
    pub fn title(self) -> &'static str {
        match self {
            EditorMode::New => "Create New Template",
            EditorMode::Edit(_) => "Edit Template",
            EditorMode::CopyOf(_) => "Create New Template (from existing)",
        }
    }
}

pub struct TemplateEditor {
    session: Arc<Session>,
    mode: EditorMode,
    id: Option<i64>,
    draft: TemplateDraft,
    waiting: bool,
    load_error: Option<String>,
    save_error: Option<String>,
}

impl TemplateEditor {
    #[must_use]
    pub fn new(session: Arc<Session>, mode: EditorMode) -> Self {
        Self {
            session,
            mode,
            id: None,
            draft: TemplateDraft::default(),
            waiting: false,
            load_error: None,
            save_error: None,
        }
    }

    #[must_use]
    pub fn mode(&self) -> EditorMode {
        self.mode
    }

    #[must_use]
    pub fn title(&self) -> &'static str {
        self.mode.title()
    }

    /// Id the next save will update; `None` creates.
    #[must_use]
    pub fn id(&self) -> Option<i64> {
        self.id
    }

    #[must_use]
    pub fn draft(&self) -> &TemplateDraft {
        &self.draft
    }

    pub fn draft_mut(&mut self) -> &mut TemplateDraft {
        &mut self.draft
    }

    /// Whether the public flag will be honoured on save.
    #[must_use]
    pub fn can_save_public(&self) -> bool {
        self.session.can_edit_public_templates()
    }

    #[must_use]
    pub fn is_waiting(&self) -> bool {
        self.waiting
    }

    #[must_use]
    pub fn load_error(&self) -> Option<&str> {
        self.load_error.as_deref()
    }

    #[must_use]
    pub fn save_error(&self) -> Option<&str> {
        self.save_error.as_deref()
    }

    /// Fetches the source template for edit and copy modes.
    ///
    /// # Errors
    ///
    /// Returns [`ViewError::Client`] when the template cannot be fetched;
    /// the banner reads `Unable to load the specified template (...)`.
    pub async fn load(&mut self) -> Result<(), ViewError> {
        let source_id = match self.mode {
            EditorMode::New => return Ok(()),
            EditorMode::Edit(id) | EditorMode::CopyOf(id) => id,
        };

        let template = match self.session.get_template(source_id).await {
            Ok(t) => t,
            Err(e) => {
                self.load_error =
                    Some(e.failure().describe("Unable to load the specified template"));
                return Err(e.into());
            }
        };

        self.draft = TemplateDraft::from(&template);
        if let EditorMode::CopyOf(_) = self.mode {
            self.id = None;
            self.draft.name = format!("Copy of {}", template.template_name);
            self.draft.is_public = true;
        } else {
            self.id = template.id.or(Some(source_id));
        }
        Ok(())
    }

    /// Replaces the HTML body with a file's contents.
    ///
    /// # Errors
    ///
    /// Returns [`ViewError::Io`] if the file cannot be read as UTF-8 text.
    pub async fn read_template_file(&mut self, path: &Path) -> Result<(), ViewError> {
        self.draft.html = read_template_file(path).await?;
        Ok(())
    }

    /// Saves the draft; on success the caller navigates to the template list.
    ///
    /// # Errors
    ///
    /// Returns [`ViewError::Busy`] while a save is in flight, or
    /// [`ViewError::Client`] with the user-facing text in
    /// [`TemplateEditor::save_error`].
    pub async fn save(&mut self) -> Result<Route, ViewError> {
        let result = {
            let _waiting = BusyFlag::acquire(&mut self.waiting)?;
            self.save_error = None;
            self.session.save_template(self.id, &self.draft).await
        };

        match result {
            Ok(_) => Ok(Route::Templates),
            Err(e) => {
                self.save_error = Some(e.failure().template_save_message());
                Err(e.into())
            }
        }
    }
}

/// Reads a template file as text.
///
/// # Errors
///
/// Returns [`ViewError::Io`] if the file cannot be read as UTF-8 text.
pub async fn read_template_file(path: &Path) -> Result<String, ViewError> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|source| ViewError::Io {
            path: path.to_path_buf(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_from_route_parameter() {
        assert_eq!(EditorMode::from_param(None), Some(EditorMode::New));
        assert_eq!(EditorMode::from_param(Some("")), Some(EditorMode::New));
        assert_eq!(EditorMode::from_param(Some("12")), Some(EditorMode::Edit(12)));
        assert_eq!(
            EditorMode::from_param(Some("+12")),
            Some(EditorMode::CopyOf(12))
        );
        assert_eq!(EditorMode::from_param(Some("abc")), None);
        assert_eq!(EditorMode::from_param(Some("+")), None);
    }

    #[test]
    fn titles_per_mode() {
        assert_eq!(EditorMode::New.title(), "Create New Template");
        assert_eq!(EditorMode::Edit(1).title(), "Edit Template");
        assert_eq!(
            EditorMode::CopyOf(1).title(),
            "Create New Template (from existing)"
        );
    }

    #[tokio::test]
    async fn read_template_file_returns_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.html");
        std::fs::write(&path, "<h1>{{ accountName }}</h1>").unwrap();

        let html = read_template_file(&path).await.unwrap();
        assert_eq!(html, "<h1>{{ accountName }}</h1>");
    }

    #[tokio::test]
    async fn read_template_file_reports_missing_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.html");
        let err = read_template_file(&path).await.unwrap_err();
        assert!(matches!(err, ViewError::Io { .. }), "got {err:?}");
    }
}
