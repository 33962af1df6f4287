//! Template endpoints.

use reqwest::Method;
use serde_json::Value;

use crate::client::ReportingClient;
use crate::error::ClientError;
use crate::types::{Template, TemplateDraft, TemplatePayload};

impl ReportingClient {
    /// Lists templates visible to the user; `public_only` restricts the list
    /// to shared templates.
    ///
    /// # Errors
    ///
    /// - [`ClientError::Api`] if the backend reports a failure.
    /// - [`ClientError::Http`] on network failure.
    /// - [`ClientError::Deserialize`] if the body is not a template array.
    pub async fn list_templates(&self, public_only: bool) -> Result<Vec<Template>, ClientError> {
        let query: &[(&str, &str)] = if public_only {
            &[("public", "true")]
        } else {
            &[]
        };
        let url = self.build_url(&["template"], query)?;
        self.get_json(url, "list templates").await
    }

    /// Fetches one template. The backend answers with a one-element array.
    ///
    /// # Errors
    ///
    /// - [`ClientError::EmptyResponse`] when the array is empty.
    /// - [`ClientError::Api`], [`ClientError::Http`] or
    ///   [`ClientError::Deserialize`] as for any other call.
    pub async fn get_template(&self, id: i64) -> Result<Template, ClientError> {
        let context = format!("get template {id}");
        let url = self.build_url(&["template", &id.to_string()], &[])?;
        let body: Value = self.get_json(url, &context).await?;

        // Tolerate a bare object too.
        let first = match body {
            Value::Array(items) => items.into_iter().next(),
            Value::Null => None,
            other => Some(other),
        };
        let first = first.ok_or_else(|| ClientError::EmptyResponse {
            context: context.clone(),
        })?;
        serde_json::from_value(first).map_err(|e| ClientError::Deserialize { context, source: e })
    }

    /// Saves a template: `POST` updates an existing id, `PUT` creates.
    ///
    /// `isPublic` is only sent when `privileged` is set. This performs no
    /// validation; see [`crate::Session::save_template`].
    ///
    /// # Errors
    ///
    /// - [`ClientError::Api`] if the backend rejects the template.
    /// - [`ClientError::Http`] on network failure.
    pub async fn save_template(
        &self,
        id: Option<i64>,
        draft: &TemplateDraft,
        privileged: bool,
    ) -> Result<Value, ClientError> {
        let payload = TemplatePayload {
            id,
            template_name: &draft.name,
            template_description: &draft.description,
            template_html: &draft.html,
            is_public: privileged.then_some(draft.is_public),
        };
        let method = if id.is_some() { Method::POST } else { Method::PUT };
        let url = self.build_url(&["template"], &[])?;
        self.send_value(method, url, Some(&payload), "save template")
            .await
    }
}
