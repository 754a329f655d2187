//! Credential profiles
//!
//! A credential is a named access-key/secret pair together with the region it
//! signs for and an optional default bucket. Older releases stored profiles
//! with snake_case field names; [`LegacyCredential`] maps those records into
//! the current schema.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default signing region when a record carries none
pub const DEFAULT_REGION: &str = "us-east-1";

/// A named credential profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credential {
    /// Unique name for this profile
    pub name: String,

    /// Access key ID
    pub access_key_id: String,

    /// Secret access key
    pub secret_access_key: String,

    /// Default region used for signing
    #[serde(default = "default_region")]
    pub region: String,

    /// Default bucket opened after selecting this profile
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bucket: Option<String>,

    /// Custom endpoint for S3-compatible services (None for AWS)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

fn default_region() -> String {
    DEFAULT_REGION.to_string()
}

impl Credential {
    /// Create a new credential with required fields
    pub fn new(
        name: impl Into<String>,
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        region: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            region: region.into(),
            bucket: None,
            endpoint: None,
        }
    }

    /// Set the default bucket
    pub fn with_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.bucket = Some(bucket.into());
        self
    }

    /// Set a custom endpoint
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Default bucket, ignoring empty strings left behind by older forms
    pub fn default_bucket(&self) -> Option<&str> {
        self.bucket.as_deref().filter(|b| !b.is_empty())
    }

    /// Check the record before it is persisted
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::Validation("Credential name cannot be empty".into()));
        }
        if self.access_key_id.is_empty() || self.secret_access_key.is_empty() {
            return Err(Error::Validation(format!(
                "Credential '{}' needs both an access key ID and a secret access key",
                self.name
            )));
        }
        if self.region.is_empty() {
            return Err(Error::Validation(format!(
                "Credential '{}' has no region",
                self.name
            )));
        }
        if let Some(endpoint) = &self.endpoint {
            url::Url::parse(endpoint).map_err(|e| {
                Error::Validation(format!("Invalid endpoint '{endpoint}': {e}"))
            })?;
        }
        Ok(())
    }
}

/// Credential record as written by the old single-page front end
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LegacyCredential {
    #[serde(default)]
    pub access_key_id: String,

    #[serde(default)]
    pub secret_access_key: String,

    #[serde(default)]
    pub s3_region: String,

    #[serde(default)]
    pub s3_bucket: Option<String>,

    #[serde(default)]
    pub name: Option<String>,
}

impl LegacyCredential {
    /// Map into the current schema.
    ///
    /// `index` is the zero-based position of the record in the migrated
    /// list; unnamed records become `"Credential {index + 1}"`.
    pub fn into_credential(self, index: usize) -> Credential {
        let name = self
            .name
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| format!("Credential {}", index + 1));

        Credential {
            name,
            access_key_id: self.access_key_id,
            secret_access_key: self.secret_access_key,
            region: self.s3_region,
            bucket: self.s3_bucket.filter(|b| !b.is_empty()),
            endpoint: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_serializes_camel_case() {
        let cred = Credential::new("prod", "AKIA1", "secret", "eu-west-1").with_bucket("data");
        let value = serde_json::to_value(&cred).unwrap();

        assert_eq!(value["accessKeyId"], "AKIA1");
        assert_eq!(value["secretAccessKey"], "secret");
        assert_eq!(value["bucket"], "data");
        assert!(value.get("endpoint").is_none());
    }

    #[test]
    fn test_credential_deserializes_without_optional_fields() {
        let cred: Credential = serde_json::from_str(
            r#"{"name":"dev","accessKeyId":"AKIA2","secretAccessKey":"s"}"#,
        )
        .unwrap();

        assert_eq!(cred.region, DEFAULT_REGION);
        assert!(cred.bucket.is_none());
        assert!(cred.endpoint.is_none());
    }

    #[test]
    fn test_default_bucket_skips_empty() {
        let cred = Credential::new("a", "k", "s", "us-east-1").with_bucket("");
        assert!(cred.default_bucket().is_none());
    }

    #[test]
    fn test_validate() {
        assert!(Credential::new("a", "k", "s", "us-east-1").validate().is_ok());

        let err = Credential::new(" ", "k", "s", "us-east-1").validate().unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        let err = Credential::new("a", "", "s", "us-east-1").validate().unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        let err = Credential::new("a", "k", "s", "us-east-1")
            .with_endpoint("not a url")
            .validate()
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_legacy_conversion_keeps_name() {
        let legacy: LegacyCredential = serde_json::from_str(
            r#"{"access_key_id":"AKIA1","secret_access_key":"s1","s3_region":"us-east-1","s3_bucket":"b","name":"Old Cred"}"#,
        )
        .unwrap();

        let cred = legacy.into_credential(4);
        assert_eq!(
            cred,
            Credential::new("Old Cred", "AKIA1", "s1", "us-east-1").with_bucket("b")
        );
    }

    #[test]
    fn test_legacy_conversion_synthesizes_name() {
        let legacy = LegacyCredential {
            access_key_id: "AKIA1".into(),
            ..Default::default()
        };
        assert_eq!(legacy.clone().into_credential(0).name, "Credential 1");
        assert_eq!(legacy.into_credential(1).name, "Credential 2");
    }
}
