//! Path routing for the console's screens.

use std::fmt;

use awrc_client::Session;
use awrc_core::Ccid;

/// A resolved console location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Accounts,
    Templates,
    NewTemplate,
    /// Raw template parameter: `<id>` edits, `+<id>` copies.
    Template(String),
    TemplateHelp,
    Account(Ccid),
    Export(Ccid),
    RawData(Ccid),
    HealthCheck,
    NewMcc(Ccid),
    Error(String),
    NotFound,
}

/// Outcome of resolving a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved {
    Page(Route),
    Redirect(Route),
}

/// Either a ready screen or a redirect that replaces it.
#[derive(Debug)]
pub enum Entry<S> {
    Screen(S),
    Redirect(Route),
}

impl<S> Entry<S> {
    /// The screen, if entry was not redirected.
    pub fn screen(self) -> Option<S> {
        match self {
            Entry::Screen(s) => Some(s),
            Entry::Redirect(_) => None,
        }
    }
}

impl Route {
    /// Resolves a path. `/` goes to the accounts list; unknown paths and
    /// invalid MCC ids go back to `/`, which in turn lands on the list.
    #[must_use]
    pub fn parse(path: &str) -> Resolved {
        let path = path.split(['?', '#']).next().unwrap_or("");
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        let page = match segments.as_slice() {
            [] => return Resolved::Redirect(Route::Accounts),
            ["accounts"] => Some(Route::Accounts),
            ["templates"] => Some(Route::Templates),
            ["template"] => Some(Route::NewTemplate),
            ["template", id] => Some(Route::Template((*id).to_string())),
            ["template_help"] => Some(Route::TemplateHelp),
            ["account", id] => Ccid::parse(id).ok().map(Route::Account),
            ["account", id, "export"] => Ccid::parse(id).ok().map(Route::Export),
            ["account", id, "rawdata"] => Ccid::parse(id).ok().map(Route::RawData),
            ["healthcheck"] => Some(Route::HealthCheck),
            ["new_mcc", id] => Ccid::parse(id).ok().map(Route::NewMcc),
            ["error", code] => Some(Route::Error((*code).to_string())),
            ["404_page"] => Some(Route::NotFound),
            _ => None,
        };

        match page {
            Some(route) => Resolved::Page(route),
            None => {
                tracing::debug!(path, "unknown route, redirecting home");
                Resolved::Redirect(Route::Accounts)
            }
        }
    }

    /// Canonical path, with MCC ids in dashed form.
    #[must_use]
    pub fn path(&self) -> String {
        match self {
            Route::Accounts => "/accounts".to_string(),
            Route::Templates => "/templates".to_string(),
            Route::NewTemplate => "/template".to_string(),
            Route::Template(id) => format!("/template/{id}"),
            Route::TemplateHelp => "/template_help".to_string(),
            Route::Account(id) => format!("/account/{id}"),
            Route::Export(id) => format!("/account/{id}/export"),
            Route::RawData(id) => format!("/account/{id}/rawdata"),
            Route::HealthCheck => "/healthcheck".to_string(),
            Route::NewMcc(id) => format!("/new_mcc/{id}"),
            Route::Error(code) => format!("/error/{code}"),
            Route::NotFound => "/404_page".to_string(),
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

/// Export and raw-data screens need the MCC's data loaded first; anything
/// else passes through.
#[must_use]
pub fn guard_verified(route: Route, session: &Session) -> Resolved {
    match route {
        Route::Export(id) | Route::RawData(id) if !session.is_verified(id) => {
            Resolved::Redirect(Route::Account(id))
        }
        other => Resolved::Page(other),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use awrc_client::ReportingClient;

    use super::*;

    fn ccid() -> Ccid {
        Ccid::parse("1234567890").unwrap()
    }

    #[test]
    fn root_redirects_to_accounts() {
        assert_eq!(Route::parse("/"), Resolved::Redirect(Route::Accounts));
        assert_eq!(Route::parse(""), Resolved::Redirect(Route::Accounts));
    }

    #[test]
    fn known_pages_resolve() {
        let cases = [
            ("/accounts", Route::Accounts),
            ("/templates", Route::Templates),
            ("/template", Route::NewTemplate),
            ("/template/+12", Route::Template("+12".to_string())),
            ("/template_help", Route::TemplateHelp),
            ("/account/123-456-7890", Route::Account(ccid())),
            ("/account/1234567890/export", Route::Export(ccid())),
            ("/account/1234567890/rawdata/", Route::RawData(ccid())),
            ("/healthcheck", Route::HealthCheck),
            ("/new_mcc/1234567890?x=1", Route::NewMcc(ccid())),
            ("/error/no_such_mcc", Route::Error("no_such_mcc".to_string())),
            ("/404_page", Route::NotFound),
        ];
        for (path, expected) in cases {
            assert_eq!(Route::parse(path), Resolved::Page(expected), "{path}");
        }
    }

    #[test]
    fn unknown_paths_and_bad_ids_redirect_home() {
        for path in ["/nope", "/account/12345", "/account/1234567890/other"] {
            assert_eq!(
                Route::parse(path),
                Resolved::Redirect(Route::Accounts),
                "{path}"
            );
        }
    }

    #[test]
    fn path_round_trips_through_parse() {
        let routes = [
            Route::Accounts,
            Route::Template("7".to_string()),
            Route::Account(ccid()),
            Route::Export(ccid()),
            Route::RawData(ccid()),
            Route::NewMcc(ccid()),
        ];
        for route in routes {
            assert_eq!(Route::parse(&route.path()), Resolved::Page(route.clone()));
        }
        assert_eq!(Route::Export(ccid()).to_string(), "/account/123-456-7890/export");
    }

    #[test]
    fn guard_sends_unverified_mccs_to_account_page() {
        let client = ReportingClient::with_base_url("http://127.0.0.1:9").unwrap();
        let session = Session::new(Arc::new(client));

        assert_eq!(
            guard_verified(Route::Export(ccid()), &session),
            Resolved::Redirect(Route::Account(ccid()))
        );
        assert_eq!(
            guard_verified(Route::Accounts, &session),
            Resolved::Page(Route::Accounts)
        );

        session.mark_verified(ccid());
        assert_eq!(
            guard_verified(Route::RawData(ccid()), &session),
            Resolved::Page(Route::RawData(ccid()))
        );
    }
}
