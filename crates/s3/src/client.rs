//! S3 client implementation
//!
//! Wraps aws-sdk-s3 and implements the ObjectStore trait from mys3-core.
//! Clients are built per credential and region; the most recent one is kept
//! so that consecutive calls for the same bucket reuse its connection pool.

use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_s3::config::http::HttpResponse;
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_smithy_types::retry::RetryConfig;
use tokio::sync::Mutex;

use mys3_core::traits::{DEFAULT_CONTENT_TYPE, DELIMITER, PAGE_SIZE, folder_marker_key};
use mys3_core::{
    Bucket, Credential, Error, ListRequest, ListingPage, ObjectLocation, ObjectStore, ProgressFn,
    RawObject, Result,
};

/// Region AWS reports as an empty location constraint
const US_EAST_1: &str = "us-east-1";

/// Error codes that mean the credential itself was rejected
const AUTH_CODES: &[&str] = &[
    "AccessDenied",
    "InvalidAccessKeyId",
    "SignatureDoesNotMatch",
    "ExpiredToken",
    "InvalidToken",
];

/// Error codes for a missing bucket or key
const NOT_FOUND_CODES: &[&str] = &["NoSuchKey", "NoSuchBucket", "NotFound"];

/// Identity of a built SDK client
#[derive(Debug, Clone, PartialEq, Eq)]
struct ClientKey {
    access_key_id: String,
    secret_access_key: String,
    region: String,
    endpoint: Option<String>,
}

/// S3 client wrapper
#[derive(Default)]
pub struct S3Client {
    cached: Mutex<Option<(ClientKey, aws_sdk_s3::Client)>>,
}

impl S3Client {
    pub fn new() -> Self {
        Self::default()
    }

    /// SDK client signing with `credential` for `region`
    ///
    /// The credential's own region is used when `region` is `None`.
    async fn client(&self, credential: &Credential, region: Option<&str>) -> aws_sdk_s3::Client {
        let key = ClientKey {
            access_key_id: credential.access_key_id.clone(),
            secret_access_key: credential.secret_access_key.clone(),
            region: region.unwrap_or(&credential.region).to_string(),
            endpoint: credential.endpoint.clone(),
        };

        let mut cached = self.cached.lock().await;
        if let Some((cached_key, client)) = cached.as_ref() {
            if *cached_key == key {
                return client.clone();
            }
        }

        tracing::debug!(
            "Building S3 client for region {} (endpoint: {})",
            key.region,
            key.endpoint.as_deref().unwrap_or("aws")
        );
        let client = build_client(&key);
        *cached = Some((key, client.clone()));
        client
    }
}

fn build_client(key: &ClientKey) -> aws_sdk_s3::Client {
    let credentials = aws_credential_types::Credentials::new(
        key.access_key_id.clone(),
        key.secret_access_key.clone(),
        None, // session token
        None, // expiry
        "mys3-static-credentials",
    );

    let mut builder = aws_sdk_s3::config::Builder::new()
        .behavior_version(aws_config::BehaviorVersion::latest())
        .credentials_provider(credentials)
        .region(aws_config::Region::new(key.region.clone()))
        .retry_config(RetryConfig::disabled());

    // S3-compatible services rarely support virtual-hosted buckets
    if let Some(endpoint) = &key.endpoint {
        builder = builder.endpoint_url(endpoint).force_path_style(true);
    }

    aws_sdk_s3::Client::from_conf(builder.build())
}

/// Map an SDK failure onto the error kinds the browser distinguishes
fn map_sdk_error<E>(err: SdkError<E, HttpResponse>) -> Error
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
{
    let status = err.raw_response().map(|r| r.status().as_u16());
    let code = err.code().map(str::to_string);
    let message = DisplayErrorContext(&err).to_string();
    classify_error(code.as_deref(), status, &message)
}

/// Classify a service error by code, HTTP status and message text
pub fn classify_error(code: Option<&str>, status: Option<u16>, message: &str) -> Error {
    // Message text is only consulted for errors that carry no code
    let matches = |codes: &[&str]| match code {
        Some(code) => codes.contains(&code),
        None => codes.iter().any(|c| message.contains(c)),
    };

    let detail = match code {
        Some(code) if !message.contains(code) => format!("{code}: {message}"),
        _ => message.to_string(),
    };

    if matches(AUTH_CODES) || matches!(status, Some(401 | 403)) {
        Error::Auth(detail)
    } else if matches(NOT_FOUND_CODES) || status == Some(404) {
        Error::NotFound(detail)
    } else {
        Error::Transport(detail)
    }
}

/// Region name for a GetBucketLocation constraint
pub fn region_from_constraint(constraint: Option<&str>) -> String {
    match constraint {
        None | Some("") => US_EAST_1.to_string(),
        Some("EU") => "eu-west-1".to_string(),
        Some(region) => region.to_string(),
    }
}

fn timestamp(value: &aws_smithy_types::DateTime) -> Option<jiff::Timestamp> {
    jiff::Timestamp::from_second(value.secs()).ok()
}

#[async_trait]
impl ObjectStore for S3Client {
    async fn list_buckets(&self, credential: &Credential) -> Result<Vec<Bucket>> {
        let client = self.client(credential, None).await;
        let response = client.list_buckets().send().await.map_err(map_sdk_error)?;

        let lookups = response.buckets().iter().map(move |b| {
            let name = b.name().unwrap_or_default().to_string();
            let creation_date = b.creation_date().and_then(timestamp);
            async move {
                let region = match self.bucket_region(credential, &name).await {
                    Ok(region) => region,
                    Err(e) => {
                        tracing::warn!(
                            "Could not get location of bucket '{name}', assuming {}: {e}",
                            credential.region
                        );
                        credential.region.clone()
                    }
                };
                Bucket {
                    name,
                    creation_date,
                    region: Some(region),
                }
            }
        });

        Ok(futures::future::join_all(lookups).await)
    }

    async fn bucket_region(&self, credential: &Credential, bucket: &str) -> Result<String> {
        let client = self.client(credential, None).await;
        let response = client
            .get_bucket_location()
            .bucket(bucket)
            .send()
            .await
            .map_err(map_sdk_error)?;

        Ok(region_from_constraint(
            response.location_constraint().map(|c| c.as_str()),
        ))
    }

    async fn list_objects(
        &self,
        credential: &Credential,
        request: ListRequest,
    ) -> Result<ListingPage> {
        let client = self.client(credential, request.region.as_deref()).await;

        let mut call = client
            .list_objects_v2()
            .bucket(&request.bucket)
            .delimiter(DELIMITER)
            .max_keys(PAGE_SIZE);

        if !request.prefix.is_empty() {
            call = call.prefix(&request.prefix);
        }

        if let Some(token) = &request.continuation_token {
            call = call.continuation_token(token);
        }

        let response = call.send().await.map_err(map_sdk_error)?;

        let common_prefixes = response
            .common_prefixes()
            .iter()
            .filter_map(|p| p.prefix().map(str::to_string))
            .collect::<Vec<_>>();

        let contents = response
            .contents()
            .iter()
            .map(|object| RawObject {
                key: object.key().unwrap_or_default().to_string(),
                size: object.size().unwrap_or(0),
                last_modified: object.last_modified().and_then(timestamp),
            })
            .collect::<Vec<_>>();

        let next_token = if response.is_truncated().unwrap_or(false) {
            response.next_continuation_token().map(str::to_string)
        } else {
            None
        };

        Ok(ListingPage::from_raw(
            &request.prefix,
            common_prefixes,
            contents,
            next_token,
        ))
    }

    async fn upload(
        &self,
        credential: &Credential,
        location: ObjectLocation,
        data: Vec<u8>,
        content_type: Option<String>,
        progress: Option<ProgressFn>,
    ) -> Result<()> {
        let client = self.client(credential, location.region.as_deref()).await;

        if let Some(progress) = &progress {
            progress(0);
        }

        client
            .put_object()
            .bucket(&location.bucket)
            .key(&location.key)
            .content_type(content_type.as_deref().unwrap_or(DEFAULT_CONTENT_TYPE))
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(map_sdk_error)?;

        if let Some(progress) = &progress {
            progress(100);
        }

        Ok(())
    }

    async fn delete_object(&self, credential: &Credential, location: ObjectLocation) -> Result<()> {
        let client = self.client(credential, location.region.as_deref()).await;

        client
            .delete_object()
            .bucket(&location.bucket)
            .key(&location.key)
            .send()
            .await
            .map_err(map_sdk_error)?;

        Ok(())
    }

    async fn create_folder(
        &self,
        credential: &Credential,
        location: ObjectLocation,
    ) -> Result<()> {
        let client = self.client(credential, location.region.as_deref()).await;

        client
            .put_object()
            .bucket(&location.bucket)
            .key(folder_marker_key(&location.key))
            .body(ByteStream::from_static(b""))
            .send()
            .await
            .map_err(map_sdk_error)?;

        Ok(())
    }

    async fn download_url(
        &self,
        credential: &Credential,
        location: ObjectLocation,
        expires_in: Duration,
    ) -> Result<String> {
        let config = PresigningConfig::expires_in(expires_in)
            .map_err(|e| Error::Validation(format!("Invalid presign expiry: {e}")))?;

        let client = self.client(credential, location.region.as_deref()).await;
        let presigned = client
            .get_object()
            .bucket(&location.bucket)
            .key(&location.key)
            .presigned(config)
            .await
            .map_err(map_sdk_error)?;

        Ok(presigned.uri().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credential() -> Credential {
        Credential::new("test", "AKIAEXAMPLE", "secret", "us-west-2")
    }

    #[test]
    fn test_classify_auth_errors() {
        for code in AUTH_CODES {
            let err = classify_error(Some(code), Some(400), "request rejected");
            assert!(err.needs_credentials(), "{code} should be an auth error");
        }
        assert!(matches!(
            classify_error(None, Some(403), "Forbidden"),
            Error::Auth(_)
        ));
        assert!(matches!(
            classify_error(None, Some(401), "Unauthorized"),
            Error::Auth(_)
        ));
    }

    #[test]
    fn test_classify_not_found() {
        assert!(matches!(
            classify_error(Some("NoSuchBucket"), Some(404), "bucket missing"),
            Error::NotFound(_)
        ));
        assert!(matches!(
            classify_error(None, None, "service error: NoSuchKey"),
            Error::NotFound(_)
        ));
    }

    #[test]
    fn test_classify_transport() {
        let err = classify_error(None, None, "dispatch failure: connection refused");
        assert!(matches!(err, Error::Transport(_)));
        assert!(err.to_string().contains("connection refused"));

        let err = classify_error(Some("SlowDown"), Some(503), "please reduce your request rate");
        assert_eq!(
            err.to_string(),
            "Transport error: SlowDown: please reduce your request rate"
        );
    }

    #[test]
    fn test_classify_coded_error_ignores_message_text() {
        let err = classify_error(
            Some("InternalError"),
            Some(500),
            "failed to PUT https://host/AccessDenied/NotFound.txt",
        );
        assert!(matches!(err, Error::Transport(_)));
    }

    #[test]
    fn test_region_from_constraint() {
        assert_eq!(region_from_constraint(None), "us-east-1");
        assert_eq!(region_from_constraint(Some("")), "us-east-1");
        assert_eq!(region_from_constraint(Some("EU")), "eu-west-1");
        assert_eq!(region_from_constraint(Some("ap-south-1")), "ap-south-1");
    }

    #[tokio::test]
    async fn test_client_reused_for_same_identity() {
        let s3 = S3Client::new();
        let cred = credential();

        s3.client(&cred, None).await;
        s3.client(&cred, Some("us-west-2")).await;
        let key = s3.cached.lock().await.as_ref().map(|(k, _)| k.clone());
        assert_eq!(key.map(|k| k.region), Some("us-west-2".to_string()));

        s3.client(&cred, Some("eu-central-1")).await;
        let key = s3.cached.lock().await.as_ref().map(|(k, _)| k.clone());
        assert_eq!(key.map(|k| k.region), Some("eu-central-1".to_string()));
    }

    #[tokio::test]
    async fn test_presigned_url_is_local() {
        let s3 = S3Client::new();
        let cred = credential().with_endpoint("http://localhost:9000");

        let url = s3
            .download_url(
                &cred,
                ObjectLocation::new("photos", "2024/beach.jpg", None),
                Duration::from_secs(600),
            )
            .await
            .unwrap();

        assert!(url.starts_with("http://localhost:9000/photos/2024/beach.jpg?"));
        assert!(url.contains("X-Amz-Expires=600"));
        assert!(url.contains("X-Amz-Credential=AKIAEXAMPLE"));
    }
}
