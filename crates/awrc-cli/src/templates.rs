//! Template command handlers.

use std::path::PathBuf;
use std::sync::Arc;

use awrc_client::Session;
use awrc_views::{EditorMode, TemplateEditor, TemplatesListScreen};
use clap::Subcommand;

use crate::screen_error;

/// Sub-commands available under `templates`.
#[derive(Debug, Subcommand)]
pub enum TemplateCommands {
    /// List shared templates
    List,
    /// Print one template, HTML included
    Show { id: i64 },
    /// Create a template, update one (`--id`), or copy one (`--copy-of`)
    Save {
        #[arg(long, conflicts_with = "copy_of")]
        id: Option<i64>,
        #[arg(long)]
        copy_of: Option<i64>,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
        /// File whose contents become the template HTML
        #[arg(long)]
        html_file: Option<PathBuf>,
        /// Share the template (honoured only with AWRC_PUBLIC_TEMPLATES)
        #[arg(long)]
        public: Option<bool>,
    },
}

pub(crate) async fn run_templates(
    session: &Arc<Session>,
    command: TemplateCommands,
) -> anyhow::Result<()> {
    match command {
        TemplateCommands::List => list(session).await,
        TemplateCommands::Show { id } => show(session, id).await,
        TemplateCommands::Save {
            id,
            copy_of,
            name,
            description,
            html_file,
            public,
        } => {
            let mode = match (id, copy_of) {
                (Some(id), _) => EditorMode::Edit(id),
                (None, Some(source)) => EditorMode::CopyOf(source),
                (None, None) => EditorMode::New,
            };
            let edits = TemplateEdits {
                name,
                description,
                html_file,
                public,
            };
            save(session, mode, edits).await
        }
    }
}

async fn list(session: &Arc<Session>) -> anyhow::Result<()> {
    let mut screen = TemplatesListScreen::new(Arc::clone(session));
    let templates = match screen.load().await {
        Ok(templates) => templates,
        Err(e) => return Err(screen_error(screen.error_text(), e)),
    };
    if templates.is_empty() {
        println!("no templates yet; create one with `awrc templates save`");
        return Ok(());
    }
    println!("{:<7}{:<8}{:<30}DESCRIPTION", "ID", "PUBLIC", "NAME");
    for template in templates {
        println!(
            "{:<7}{:<8}{:<30}{}",
            template.id.map_or_else(|| "-".to_string(), |id| id.to_string()),
            if template.is_public { "yes" } else { "no" },
            template.template_name,
            template.template_description
        );
    }
    Ok(())
}

async fn show(session: &Arc<Session>, id: i64) -> anyhow::Result<()> {
    let mut editor = TemplateEditor::new(Arc::clone(session), EditorMode::Edit(id));
    if let Err(e) = editor.load().await {
        return Err(screen_error(editor.load_error(), e));
    }
    let draft = editor.draft();
    println!("{} ({})", draft.name, if draft.is_public { "public" } else { "private" });
    println!("{}", draft.description);
    println!();
    println!("{}", draft.html);
    Ok(())
}

/// Field overrides applied on top of the loaded template.
struct TemplateEdits {
    name: Option<String>,
    description: Option<String>,
    html_file: Option<PathBuf>,
    public: Option<bool>,
}

async fn save(
    session: &Arc<Session>,
    mode: EditorMode,
    edits: TemplateEdits,
) -> anyhow::Result<()> {
    let mut editor = TemplateEditor::new(Arc::clone(session), mode);
    if let Err(e) = editor.load().await {
        return Err(screen_error(editor.load_error(), e));
    }

    if let Some(path) = &edits.html_file {
        editor.read_template_file(path).await?;
    }
    let draft = editor.draft_mut();
    if let Some(name) = edits.name {
        draft.name = name;
    }
    if let Some(description) = edits.description {
        draft.description = description;
    }
    if let Some(public) = edits.public {
        draft.is_public = public;
    }
    if edits.public == Some(true) && !editor.can_save_public() {
        tracing::warn!("public flag ignored without the privileged role");
    }

    match editor.save().await {
        Ok(route) => {
            println!("{}: saved \"{}\" ({route})", editor.title(), editor.draft().name);
            Ok(())
        }
        Err(e) => Err(screen_error(editor.save_error(), e)),
    }
}
