//! Onboarded infrastructure provider catalog.

use serde::{Deserialize, Serialize};

use crate::StoreError;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderEndpoints {
    pub upload: String,
    pub inference: String,
}

/// Self-description a provider submits with its onboarding transaction.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProviderInfo {
    pub storage: String,
    pub memory: String,
    pub os: String,
    pub core: String,
    pub gpu: String,
    pub region: String,
    pub platform_name: String,
    pub provider_name: String,
    pub platform_description: String,
    pub platform_image_uri: String,
    pub processor: String,
    pub provider_did: String,
    pub hosting_cost: i64,
    pub training_cost: i64,
    pub endpoints: ProviderEndpoints,
    pub supported_models: String,
}

/// Persistent storage for provider records, keyed by `provider_did`.
pub trait ProviderStore: Send + Sync {
    /// Insert or replace the record for `info.provider_did`.
    /// Returns `true` if an existing record was replaced.
    fn put_provider(&self, info: &ProviderInfo) -> Result<bool, StoreError>;

    fn get_provider(&self, provider_did: &str) -> Result<Option<ProviderInfo>, StoreError>;

    /// All providers, ordered by provider DID.
    fn iter_providers(&self) -> Result<Vec<ProviderInfo>, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_info_uses_camel_case() {
        let json = r#"{
            "providerDid": "did-p",
            "platformName": "edge",
            "hostingCost": 12,
            "endpoints": {"upload": "http://u", "inference": "http://i"}
        }"#;
        let info: ProviderInfo = serde_json::from_str(json).unwrap();
        assert_eq!(info.provider_did, "did-p");
        assert_eq!(info.platform_name, "edge");
        assert_eq!(info.hosting_cost, 12);
        assert_eq!(info.endpoints.inference, "http://i");
        assert_eq!(info.gpu, "");

        let back = serde_json::to_value(&info).unwrap();
        assert_eq!(back["supportedModels"], "");
    }
}
