use crate::traits::{
    InitError, ListStream, ObjectBackend, ObjectReader, ObjectStream, StorageError, StorageResult,
};
use crate::StorageBackend;
use async_trait::async_trait;
use aws_config::retry::{RetryConfig, RetryMode};
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::http::HttpResponse;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{
    BucketLocationConstraint, CompletedMultipartUpload, CompletedPart, CreateBucketConfiguration,
    Object,
};
use aws_sdk_s3::Client;
use bytes::BytesMut;
use chrono::{DateTime, Utc};
use futures::{stream, StreamExt};
use mediastore_core::config::endpoint_url;
use mediastore_core::constants::BUCKET_REGION;
use mediastore_core::{MediaDescriptor, StorageConfig};
use tokio::io::AsyncReadExt;
use tokio_util::io::ReaderStream;

/// Uploads are sent in parts of this size; anything shorter goes out as a
/// single `PutObject`. 5 MiB is the smallest part S3 accepts.
const PART_SIZE: usize = 5 * 1024 * 1024;

/// Reads from the caller's stream go through a scratch buffer of this size.
const READ_CHUNK: usize = 64 * 1024;

/// S3-compatible object storage client
///
/// Works against AWS S3 as well as MinIO and other S3-compatible services.
/// Path-style addressing is always used so bare `host:port` endpoints work.
#[derive(Clone)]
pub struct S3Backend {
    client: Client,
    endpoint_url: String,
}

impl S3Backend {
    /// Create a new S3Backend instance
    ///
    /// # Arguments
    /// * `endpoint` - `host[:port]` of the service, without scheme
    /// * `access_key_id` / `secret_access_key` - static credentials; when both
    ///   are empty the default AWS credential chain is used instead
    /// * `use_ssl` - connect over https rather than http
    pub async fn new(
        endpoint: &str,
        access_key_id: &str,
        secret_access_key: &str,
        use_ssl: bool,
    ) -> Result<Self, InitError> {
        let endpoint_url =
            endpoint_url(endpoint, use_ssl).map_err(|e| InitError::Config(e.to_string()))?;

        let mut s3_config_builder = base_config(&endpoint_url);

        match (access_key_id.is_empty(), secret_access_key.is_empty()) {
            (false, false) => {
                let credentials = Credentials::new(
                    access_key_id,
                    secret_access_key,
                    None,
                    None,
                    "mediastore",
                );
                s3_config_builder = s3_config_builder.credentials_provider(credentials);
            }
            (true, true) => {
                let shared = aws_config::defaults(BehaviorVersion::latest()).load().await;
                if let Some(provider) = shared.credentials_provider() {
                    s3_config_builder = s3_config_builder.credentials_provider(provider);
                }
            }
            _ => {
                return Err(InitError::Config(
                    "access key and secret key must be provided together".to_string(),
                ))
            }
        }

        let client = Client::from_conf(s3_config_builder.build());

        tracing::debug!(endpoint = %endpoint_url, "S3 client created");

        Ok(S3Backend {
            client,
            endpoint_url,
        })
    }

    pub async fn from_config(config: &StorageConfig) -> Result<Self, InitError> {
        Self::new(
            &config.endpoint,
            &config.access_key_id,
            &config.secret_access_key,
            config.use_ssl,
        )
        .await
    }

    /// Full endpoint URL, scheme included
    pub fn endpoint_url(&self) -> &str {
        &self.endpoint_url
    }

    async fn upload_parts(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        reader: &mut ObjectReader,
        part: &mut BytesMut,
        scratch: &mut [u8],
    ) -> StorageResult<(u64, i32)> {
        let mut completed = Vec::new();
        let mut total_size = 0u64;
        let mut part_number = 1i32;

        while !part.is_empty() {
            let filled = part.len();
            let body = ByteStream::from(part.split().freeze());

            let output = self
                .client
                .upload_part()
                .bucket(bucket)
                .key(key)
                .upload_id(upload_id)
                .part_number(part_number)
                .body(body)
                .send()
                .await
                .map_err(|e| classify_sdk_error(e, key))?;

            let etag = output.e_tag().ok_or_else(|| {
                StorageError::BackendError(format!("No ETag returned for part {}", part_number))
            })?;

            completed.push(
                CompletedPart::builder()
                    .part_number(part_number)
                    .e_tag(etag)
                    .build(),
            );

            total_size += filled as u64;
            part_number += 1;

            if filled < PART_SIZE {
                break;
            }
            fill_part(reader, part, scratch).await?;
        }

        let parts = completed.len() as i32;
        let completed = CompletedMultipartUpload::builder()
            .set_parts(Some(completed))
            .build();

        self.client
            .complete_multipart_upload()
            .bucket(bucket)
            .key(key)
            .upload_id(upload_id)
            .multipart_upload(completed)
            .send()
            .await
            .map_err(|e| classify_sdk_error(e, key))?;

        Ok((total_size, parts))
    }
}

/// Client settings shared by every backend instance: path-style addressing
/// against `endpoint_url` with adaptive retry.
fn base_config(endpoint_url: &str) -> aws_sdk_s3::config::Builder {
    let retry_config = RetryConfig::standard()
        .with_max_attempts(5)
        .with_retry_mode(RetryMode::Adaptive);

    aws_sdk_s3::Config::builder()
        .behavior_version(BehaviorVersion::latest())
        .endpoint_url(endpoint_url)
        .region(Region::new(BUCKET_REGION))
        .retry_config(retry_config)
        .force_path_style(true)
}

/// Refill `part` with up to `PART_SIZE` bytes, stopping early at EOF.
///
/// The buffer only grows as data arrives, so small uploads stay small.
async fn fill_part(
    reader: &mut ObjectReader,
    part: &mut BytesMut,
    scratch: &mut [u8],
) -> std::io::Result<usize> {
    part.clear();
    while part.len() < PART_SIZE {
        let want = scratch.len().min(PART_SIZE - part.len());
        let bytes_read = reader.read(&mut scratch[..want]).await?;
        if bytes_read == 0 {
            break;
        }
        part.extend_from_slice(&scratch[..bytes_read]);
    }
    Ok(part.len())
}

/// Sort an SDK failure into the storage error contract.
fn classify_sdk_error<E>(err: SdkError<E, HttpResponse>, key: &str) -> StorageError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
{
    let message = format!("{}: {}", key, DisplayErrorContext(&err));

    match &err {
        SdkError::ServiceError(context) => {
            let status = context.raw().status().as_u16();
            match (err.code(), status) {
                (Some("NoSuchKey" | "NoSuchBucket" | "NotFound"), _) | (_, 404) => {
                    StorageError::NotFound(key.to_string())
                }
                (
                    Some(
                        "AccessDenied"
                        | "AllAccessDisabled"
                        | "InvalidAccessKeyId"
                        | "SignatureDoesNotMatch",
                    ),
                    _,
                )
                | (_, 401 | 403) => StorageError::PermissionDenied(message),
                _ => StorageError::BackendError(message),
            }
        }
        SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) | SdkError::ResponseError(_) => {
            StorageError::Transport(message)
        }
        _ => StorageError::BackendError(message),
    }
}

fn descriptor(object: &Object) -> MediaDescriptor {
    let last_modified = object
        .last_modified()
        .and_then(|t| DateTime::<Utc>::from_timestamp(t.secs(), t.subsec_nanos()))
        .unwrap_or_default();

    MediaDescriptor::new(
        object.key().unwrap_or_default(),
        object.size().unwrap_or_default().max(0) as u64,
        last_modified,
    )
}

#[async_trait]
impl ObjectBackend for S3Backend {
    async fn bucket_exists(&self, bucket: &str) -> StorageResult<bool> {
        match self.client.head_bucket().bucket(bucket).send().await {
            Ok(_) => Ok(true),
            Err(e) => match classify_sdk_error(e, bucket) {
                StorageError::NotFound(_) => Ok(false),
                other => Err(other),
            },
        }
    }

    async fn make_bucket(&self, bucket: &str, region: &str) -> StorageResult<()> {
        let mut request = self.client.create_bucket().bucket(bucket);

        // us-east-1 is the default location and S3 rejects it as an explicit constraint
        if region != "us-east-1" {
            let configuration = CreateBucketConfiguration::builder()
                .location_constraint(BucketLocationConstraint::from(region))
                .build();
            request = request.create_bucket_configuration(configuration);
        }

        match request.send().await {
            Ok(_) => Ok(()),
            Err(e) if e.code() == Some("BucketAlreadyOwnedByYou") => Ok(()),
            Err(e) => Err(classify_sdk_error(e, bucket)),
        }
    }

    fn list_objects<'a>(&'a self, bucket: &'a str, prefix: &'a str) -> ListStream<'a> {
        let pages = self
            .client
            .list_objects_v2()
            .bucket(bucket)
            .prefix(prefix)
            .into_paginator()
            .send();

        let stream = stream::unfold(pages, |mut pages| async move {
            let page = pages.next().await?;
            Some((page, pages))
        })
        .flat_map(move |page| {
            let items: Vec<StorageResult<MediaDescriptor>> = match page {
                Ok(output) => output.contents().iter().map(descriptor).map(Ok).collect(),
                Err(e) => vec![Err(classify_sdk_error(e, prefix))],
            };
            stream::iter(items)
        });

        Box::pin(stream)
    }

    async fn get_object(&self, bucket: &str, key: &str) -> StorageResult<ObjectStream> {
        let response = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| classify_sdk_error(e, key))?;

        // Convert ByteStream to Stream<Item = Result<Bytes, StorageError>> via AsyncRead + ReaderStream
        let async_read = response.body.into_async_read();
        let stream = ReaderStream::new(async_read)
            .map(|result| result.map_err(|e| StorageError::Transport(e.to_string())));

        Ok(Box::pin(stream))
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        content_type: &str,
        mut reader: ObjectReader,
    ) -> StorageResult<u64> {
        let mut scratch = vec![0u8; READ_CHUNK];
        let mut part = BytesMut::new();
        let filled = fill_part(&mut reader, &mut part, &mut scratch).await?;

        if filled < PART_SIZE {
            let body = ByteStream::from(part.freeze());

            self.client
                .put_object()
                .bucket(bucket)
                .key(key)
                .body(body)
                .content_type(content_type)
                .send()
                .await
                .map_err(|e| classify_sdk_error(e, key))?;

            return Ok(filled as u64);
        }

        let created = self
            .client
            .create_multipart_upload()
            .bucket(bucket)
            .key(key)
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| classify_sdk_error(e, key))?;

        let upload_id = created
            .upload_id()
            .ok_or_else(|| StorageError::BackendError("No upload ID returned from S3".to_string()))?
            .to_string();

        match self
            .upload_parts(bucket, key, &upload_id, &mut reader, &mut part, &mut scratch)
            .await
        {
            Ok((total_size, parts)) => {
                tracing::debug!(
                    bucket = %bucket,
                    key = %key,
                    size_bytes = total_size,
                    parts = parts,
                    "S3 multipart upload completed"
                );
                Ok(total_size)
            }
            Err(e) => {
                if let Err(abort_err) = self
                    .client
                    .abort_multipart_upload()
                    .bucket(bucket)
                    .key(key)
                    .upload_id(&upload_id)
                    .send()
                    .await
                {
                    tracing::warn!(
                        error = %DisplayErrorContext(&abort_err),
                        bucket = %bucket,
                        key = %key,
                        upload_id = %upload_id,
                        "Failed to abort multipart upload"
                    );
                }
                Err(e)
            }
        }
    }

    async fn remove_object(&self, bucket: &str, key: &str) -> StorageResult<()> {
        self.client
            .delete_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| classify_sdk_error(e, key))?;

        Ok(())
    }

    async fn copy_object(&self, bucket: &str, from_key: &str, to_key: &str) -> StorageResult<()> {
        // URL-encode the copy source per AWS S3 API requirements
        let encoded_key = urlencoding::encode(from_key);
        let copy_source = format!("{}/{}", bucket, encoded_key);

        self.client
            .copy_object()
            .bucket(bucket)
            .copy_source(&copy_source)
            .key(to_key)
            .send()
            .await
            .map_err(|e| classify_sdk_error(e, from_key))?;

        Ok(())
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::S3
    }
}
