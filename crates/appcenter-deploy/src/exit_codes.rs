//! Exit codes for the CLI

use appcenter::AppCenterError;

/// Success
pub const SUCCESS: i32 = 0;

/// Deploy failed
pub const ERROR: i32 = 1;

/// Configuration error
pub const CONFIG_ERROR: i32 = 2;

/// Exit code for a failed run
pub fn for_error(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<AppCenterError>().map(AppCenterError::root) {
        Some(
            AppCenterError::Configuration(_)
            | AppCenterError::InvalidHeader(_)
            | AppCenterError::Url(_),
        ) => CONFIG_ERROR,
        _ => ERROR,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_for_error() {
        let err = anyhow::Error::new(AppCenterError::Configuration("API token is required".into()));
        assert_eq!(for_error(&err), CONFIG_ERROR);

        let err = anyhow::Error::new(AppCenterError::ProcessingFailed {
            details: "corrupt".into(),
        });
        assert_eq!(for_error(&err), ERROR);

        let err = anyhow::anyhow!("export file is not writable");
        assert_eq!(for_error(&err), ERROR);
    }
}
