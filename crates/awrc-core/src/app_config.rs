/// Page sizes the raw data browser offers.
pub const ALLOWED_PAGE_SIZES: [usize; 3] = [10, 25, 50];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub base_url: String,
    pub log_level: String,
    /// Value sent in the `Cookie` header after the OAuth sign-in.
    pub auth_cookie: Option<String>,
    /// Privileged-role flag that unlocks saving public templates.
    pub public_templates: bool,
    pub request_timeout_secs: u64,
    pub user_agent: String,
    pub poll_interval_ms: u64,
    pub page_size: usize,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("base_url", &self.base_url)
            .field("log_level", &self.log_level)
            .field(
                "auth_cookie",
                &self.auth_cookie.as_ref().map(|_| "[redacted]"),
            )
            .field("public_templates", &self.public_templates)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("user_agent", &self.user_agent)
            .field("poll_interval_ms", &self.poll_interval_ms)
            .field("page_size", &self.page_size)
            .finish()
    }
}
