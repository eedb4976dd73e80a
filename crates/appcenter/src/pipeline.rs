//! Full deploy run: publish, attach, collect outputs
//!
//! Steps run strictly in order and the first failure ends the run. Nothing
//! done before the failure is rolled back.

use std::collections::BTreeMap;
use std::fmt;

use tracing::{info, instrument};

use crate::app::{AppClient, PublishedRelease};
use crate::error::Result;
use crate::types::{App, ReleaseOptions};

pub const STATUS_KEY: &str = "APPCENTER_DEPLOY_STATUS";
pub const INSTALL_URL_KEY: &str = "APPCENTER_DEPLOY_INSTALL_URL";
pub const DOWNLOAD_URL_KEY: &str = "APPCENTER_DEPLOY_DOWNLOAD_URL";
pub const RELEASE_ID_KEY: &str = "APPCENTER_DEPLOY_RELEASE_ID";
pub const RELEASE_PAGE_URL_KEY: &str = "APPCENTER_RELEASE_PAGE_URL";
pub const PUBLIC_INSTALL_PAGE_URL_KEY: &str = "APPCENTER_PUBLIC_INSTALL_PAGE_URL";
pub const PUBLIC_INSTALL_PAGE_URLS_KEY: &str = "APPCENTER_PUBLIC_INSTALL_PAGE_URLS";

pub const STATUS_SUCCESS: &str = "success";
pub const STATUS_FAILED: &str = "failed";

/// Progress notification emitted before each step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployStep<'a> {
    UploadingBinary,
    AddingGroup(&'a str),
    UploadingSymbols,
    SettingReleaseNotes,
    AddingStore(&'a str),
    AddingTester(&'a str),
}

impl fmt::Display for DeployStep<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeployStep::UploadingBinary => write!(f, "Uploading binary"),
            DeployStep::AddingGroup(name) => write!(f, "Adding distribution group {}", name),
            DeployStep::UploadingSymbols => write!(f, "Uploading symbol file"),
            DeployStep::SettingReleaseNotes => write!(f, "Setting release notes"),
            DeployStep::AddingStore(name) => write!(f, "Adding distribution store {}", name),
            DeployStep::AddingTester(email) => write!(f, "Adding tester {}", email),
        }
    }
}

/// Result of a successful run
#[derive(Debug, Clone)]
pub struct DeployOutcome {
    pub published: PublishedRelease,
    /// Names of the public groups the release was added to, in input order
    pub public_groups: Vec<String>,
}

impl DeployOutcome {
    /// Variables exported to the CI environment
    pub fn outputs(&self, app: &App) -> BTreeMap<String, String> {
        let release = &self.published.release;
        let mut outputs = BTreeMap::new();

        outputs.insert(STATUS_KEY.to_string(), STATUS_SUCCESS.to_string());
        outputs.insert(
            INSTALL_URL_KEY.to_string(),
            release.install_url.clone().unwrap_or_default(),
        );
        outputs.insert(
            DOWNLOAD_URL_KEY.to_string(),
            release.download_url.clone().unwrap_or_default(),
        );
        outputs.insert(RELEASE_ID_KEY.to_string(), release.id.to_string());
        outputs.insert(
            RELEASE_PAGE_URL_KEY.to_string(),
            release_page_url(app, release.id),
        );

        match self.public_groups.as_slice() {
            [] => {}
            [group] => {
                outputs.insert(
                    PUBLIC_INSTALL_PAGE_URL_KEY.to_string(),
                    public_install_page_url(app, group),
                );
            }
            groups => {
                let urls: Vec<String> = groups
                    .iter()
                    .map(|g| public_install_page_url(app, g))
                    .collect();
                outputs.insert(PUBLIC_INSTALL_PAGE_URLS_KEY.to_string(), urls.join(", "));
            }
        }

        outputs
    }
}

pub fn release_page_url(app: &App, release_id: u64) -> String {
    format!(
        "https://appcenter.ms/orgs/{}/apps/{}/distribute/releases/{}",
        app.owner, app.name, release_id
    )
}

pub fn public_install_page_url(app: &App, group: &str) -> String {
    format!(
        "https://install.appcenter.ms/users/{}/apps/{}/distribution_groups/{}",
        app.owner, app.name, group
    )
}

/// Split a newline separated list, trimming entries and dropping blanks
pub fn split_list(input: &str) -> Vec<String> {
    input
        .lines()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn non_blank(items: &[String]) -> impl Iterator<Item = &str> {
    items.iter().map(|s| s.trim()).filter(|s| !s.is_empty())
}

/// Run every step of a deploy for `options`
///
/// Order: publish, groups, symbols, release notes, stores, testers.
#[instrument(skip_all, fields(owner = %options.app.owner, app = %options.app.name))]
pub async fn deploy<F>(
    client: &AppClient,
    options: &ReleaseOptions,
    mut on_step: F,
) -> Result<DeployOutcome>
where
    F: FnMut(DeployStep<'_>),
{
    on_step(DeployStep::UploadingBinary);
    let published = client.publish_release(options).await?;
    let release = client.release(published.release.id);

    let mut public_groups = Vec::new();
    for name in non_blank(&options.group_names) {
        on_step(DeployStep::AddingGroup(name));
        let group = client.get_group(name).await?;
        release.add_group(&group, options).await?;
        if group.is_public {
            public_groups.push(name.to_string());
        }
    }

    if let Some(ref path) = options.symbol_path {
        on_step(DeployStep::UploadingSymbols);
        release.upload_symbol(&published.release, path).await?;
    }

    if let Some(notes) = options.release_notes.as_deref().filter(|n| !n.is_empty()) {
        on_step(DeployStep::SettingReleaseNotes);
        release.set_release_notes(notes).await?;
    }

    for name in non_blank(&options.store_names) {
        on_step(DeployStep::AddingStore(name));
        let store = client.get_store(name).await?;
        release.add_store(&store).await?;
    }

    for email in non_blank(&options.testers) {
        on_step(DeployStep::AddingTester(email));
        release.add_tester(email, options).await?;
    }

    info!(
        release_id = published.release.id,
        public_groups = public_groups.len(),
        "Deploy finished"
    );

    Ok(DeployOutcome {
        published,
        public_groups,
    })
}
