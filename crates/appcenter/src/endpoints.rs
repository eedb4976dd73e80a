//! App Center API URL construction

use reqwest::Url;

use crate::error::{AppCenterError, Result};
use crate::types::App;

/// Public App Center API host
pub const DEFAULT_API_URL: &str = "https://api.appcenter.ms";

/// Builds `/v0.1/apps/{owner}/{app}/...` URLs with each segment percent-encoded
#[derive(Debug, Clone)]
pub(crate) struct Endpoints {
    base: Url,
}

impl Endpoints {
    pub fn new(base: &str) -> Result<Self> {
        let base = Url::parse(base)?;
        if base.cannot_be_a_base() {
            return Err(AppCenterError::Configuration(format!(
                "API URL is not a base URL: {}",
                base
            )));
        }
        Ok(Self { base })
    }

    pub fn app(&self, app: &App, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty()
                .extend(["v0.1", "apps", app.owner.as_str(), app.name.as_str()])
                .extend(segments);
        }
        url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_url() {
        let endpoints = Endpoints::new(DEFAULT_API_URL).unwrap();
        let app = App::new("acme", "Field-Service");

        let url = endpoints.app(&app, &["uploads", "releases"]);
        assert_eq!(
            url.as_str(),
            "https://api.appcenter.ms/v0.1/apps/acme/Field-Service/uploads/releases"
        );
    }

    #[test]
    fn test_segments_are_encoded() {
        let endpoints = Endpoints::new("http://127.0.0.1:8080/").unwrap();
        let app = App::new("acme", "app");

        let url = endpoints.app(&app, &["distribution_groups", "Beta Testers"]);
        assert_eq!(
            url.path(),
            "/v0.1/apps/acme/app/distribution_groups/Beta%20Testers"
        );
    }

    #[test]
    fn test_rejects_non_base_url() {
        assert!(Endpoints::new("mailto:qa@example.com").is_err());
        assert!(Endpoints::new("not a url").is_err());
    }
}
