//! Aggregate configuration.

use crate::channels::ChannelConfig;
use crate::error::Result;
use crate::reconcile::ControllerConfig;
use serde::{Deserialize, Serialize};

/// Settings for every component, loadable from JSON.
///
/// Missing fields take their defaults.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub channels: ChannelConfig,
    pub controller: ControllerConfig,
}

impl SyncConfig {
    pub fn from_json_str(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SyncError;
    use crate::reconcile::OrphanPolicy;

    #[test]
    fn test_defaults() {
        let config = SyncConfig::default();
        assert_eq!(config.channels.buffer_size, 1024);
        assert_eq!(config.controller.read_retries, 2);
        assert_eq!(config.controller.mention_prefix, '@');
        assert_eq!(config.controller.projection.orphans, OrphanPolicy::Placeholder);
    }

    #[test]
    fn test_partial_json() {
        let config = SyncConfig::from_json_str(
            r#"{"channels":{"buffer_size":8},"controller":{"projection":{"orphans":"hide"}}}"#,
        )
        .unwrap();
        assert_eq!(config.channels.buffer_size, 8);
        assert_eq!(config.controller.read_retries, 2);
        assert_eq!(config.controller.projection.orphans, OrphanPolicy::Hide);
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(
            SyncConfig::from_json_str("{\"channels\": 3}"),
            Err(SyncError::Deserialization(_))
        ));
    }
}
