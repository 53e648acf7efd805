pub mod api;
pub mod cache;
pub mod domain;
pub mod format;
pub mod query;
pub mod validation;

#[cfg(test)]
mod testing;

pub mod config {
    use anyhow::Context;

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub api_url: Option<String>,
        pub api_token: Option<String>,
        pub sentry_dsn: Option<String>,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            Ok(Self {
                api_url: non_empty_var("RECODASH_API_URL"),
                api_token: non_empty_var("RECODASH_API_TOKEN"),
                sentry_dsn: non_empty_var("SENTRY_DSN"),
            })
        }

        pub fn require_api_url(&self) -> anyhow::Result<&str> {
            self.api_url
                .as_deref()
                .context("RECODASH_API_URL is required")
        }

        pub fn require_api_token(&self) -> anyhow::Result<&str> {
            self.api_token
                .as_deref()
                .context("RECODASH_API_TOKEN is required (run `recodash login` first)")
        }
    }

    fn non_empty_var(name: &str) -> Option<String> {
        std::env::var(name)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

}
