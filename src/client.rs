#![doc = "reqwest implementation of the backend contract."]
//
//! # HTTP client
//!
//! [`HttpCmsClient`] maps every [`CmsApi`] method onto one REST call below the
//! configured base URL (`Settings::api_url`). JSON is used for every body
//! except file upload and content replacement, which are multipart.
//!
//! A call succeeds only on 2xx. Transport failures, other statuses and
//! undecodable bodies become [`ApiError`] values carrying the operation name.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{header, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, error, info};

use crate::config::Settings;
use crate::contract::CmsApi;
use crate::errors::ApiError;
use crate::model::{
    Bucket, BucketUpdate, FileDownload, FileRecord, FileUpdate, NewBucket, NewFile,
    NewReleaseNote, ReleaseNote, ReleaseNoteUpdate,
};

pub struct HttpCmsClient {
    http: reqwest::Client,
    base: String,
}

impl HttpCmsClient {
    pub fn new(settings: &Settings) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|source| {
                error!(error = ?source, "Failed to build HTTP client");
                ApiError::Transport {
                    operation: "build http client".to_string(),
                    source,
                }
            })?;
        let base = settings.api_url.trim_end_matches('/').to_string();
        info!(base_url = %base, "Initialized HttpCmsClient");
        Ok(HttpCmsClient { http, base })
    }

    pub fn base_url(&self) -> &str {
        &self.base
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    /// Root of the server, i.e. the base URL without its `/api` suffix.
    fn server_root(&self) -> &str {
        self.base.strip_suffix("/api").unwrap_or(&self.base)
    }

    async fn send(&self, operation: String, req: RequestBuilder) -> Result<Response, ApiError> {
        debug!(operation = %operation, "Sending request");
        let resp = match req.send().await {
            Ok(resp) => resp,
            Err(source) => {
                error!(operation = %operation, error = ?source, "Request failed before a response arrived");
                return Err(ApiError::Transport { operation, source });
            }
        };

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            error!(
                operation = %operation,
                status = %status,
                "Backend returned error. Response body: {body}"
            );
            return Err(ApiError::Status {
                operation,
                status: status.as_u16(),
                body,
            });
        }
        info!(operation = %operation, status = %status, "Request succeeded");
        Ok(resp)
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        operation: String,
        req: RequestBuilder,
    ) -> Result<T, ApiError> {
        let resp = self.send(operation.clone(), req).await?;
        let text = resp.text().await.map_err(|source| ApiError::Transport {
            operation: operation.clone(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| {
            error!(operation = %operation, error = ?source, "Failed to decode response body");
            ApiError::Decode { operation, source }
        })
    }

    async fn send_empty(&self, operation: String, req: RequestBuilder) -> Result<(), ApiError> {
        self.send(operation, req).await.map(|_| ())
    }
}

fn content_part(bytes: Vec<u8>, file_name: Option<String>) -> Part {
    let part = Part::bytes(bytes);
    match file_name {
        Some(name) => part.file_name(name),
        None => part,
    }
}

/// Extracts `filename` from a `Content-Disposition` header value.
fn disposition_file_name(value: &str) -> Option<String> {
    value.split(';').map(str::trim).find_map(|param| {
        param
            .strip_prefix("filename=")
            .map(|name| name.trim_matches('"').to_string())
            .filter(|name| !name.is_empty())
    })
}

#[async_trait]
impl CmsApi for HttpCmsClient {
    async fn list_buckets(&self) -> Result<Vec<Bucket>, ApiError> {
        let req = self.http.get(self.url("/buckets/"));
        self.send_json("list buckets".into(), req).await
    }

    async fn get_bucket(&self, id: i64) -> Result<Bucket, ApiError> {
        let req = self.http.get(self.url(&format!("/buckets/{id}")));
        self.send_json(format!("get bucket {id}"), req).await
    }

    async fn create_bucket(&self, req: NewBucket) -> Result<Bucket, ApiError> {
        info!(title = %req.title, slug = %req.slug, "Creating bucket");
        let req = self.http.post(self.url("/buckets/")).json(&req);
        self.send_json("create bucket".into(), req).await
    }

    async fn update_bucket(&self, id: i64, req: BucketUpdate) -> Result<Bucket, ApiError> {
        let req = self.http.put(self.url(&format!("/buckets/{id}"))).json(&req);
        self.send_json(format!("update bucket {id}"), req).await
    }

    async fn delete_bucket(&self, id: i64) -> Result<(), ApiError> {
        let req = self.http.delete(self.url(&format!("/buckets/{id}")));
        self.send_empty(format!("delete bucket {id}"), req).await
    }

    async fn list_bucket_files(&self, bucket_id: i64) -> Result<Vec<FileRecord>, ApiError> {
        let req = self.http.get(self.url(&format!("/buckets/{bucket_id}/files/")));
        self.send_json(format!("list files of bucket {bucket_id}"), req)
            .await
    }

    async fn list_files(&self) -> Result<Vec<FileRecord>, ApiError> {
        let req = self.http.get(self.url("/files/"));
        self.send_json("list files".into(), req).await
    }

    async fn get_file(&self, id: i64) -> Result<FileRecord, ApiError> {
        let req = self.http.get(self.url(&format!("/files/{id}")));
        self.send_json(format!("get file {id}"), req).await
    }

    async fn create_file(&self, req: NewFile) -> Result<FileRecord, ApiError> {
        info!(
            bucket_id = req.bucket_id,
            name = %req.name,
            size = req.content.len(),
            "Uploading new file"
        );
        let bucket_id = req.bucket_id;
        let form = Form::new()
            .text("bucket_id", bucket_id.to_string())
            .text("name", req.name.clone())
            .text("slug", req.slug)
            .text("description", req.description)
            .text("is_published", req.is_published.to_string())
            .part("file", content_part(req.content.into_bytes(), Some(req.name)));
        let req = self
            .http
            .post(self.url(&format!("/buckets/{bucket_id}/files/")))
            .multipart(form);
        self.send_json(format!("create file in bucket {bucket_id}"), req)
            .await
    }

    async fn update_file(&self, id: i64, req: FileUpdate) -> Result<FileRecord, ApiError> {
        let req = self.http.put(self.url(&format!("/files/{id}"))).json(&req);
        self.send_json(format!("update file {id}"), req).await
    }

    async fn delete_file(&self, id: i64) -> Result<(), ApiError> {
        let req = self.http.delete(self.url(&format!("/files/{id}")));
        self.send_empty(format!("delete file {id}"), req).await
    }

    async fn download_file(&self, id: i64) -> Result<FileDownload, ApiError> {
        let operation = format!("download file {id}");
        let req = self.http.get(self.url(&format!("/files/{id}/download")));
        let resp = self.send(operation.clone(), req).await?;

        let headers = resp.headers();
        let content_type = headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let file_name = headers
            .get(header::CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .and_then(disposition_file_name);

        let bytes = resp
            .bytes()
            .await
            .map_err(|source| ApiError::Transport { operation, source })?;
        Ok(FileDownload {
            bytes: bytes.to_vec(),
            content_type,
            file_name,
        })
    }

    async fn update_file_content(
        &self,
        id: i64,
        content: Vec<u8>,
    ) -> Result<FileRecord, ApiError> {
        info!(file_id = id, size = content.len(), "Replacing file content");
        let form = Form::new().part("file", content_part(content, None));
        let req = self
            .http
            .put(self.url(&format!("/files/{id}/content")))
            .multipart(form);
        self.send_json(format!("update content of file {id}"), req)
            .await
    }

    async fn list_release_notes(&self) -> Result<Vec<ReleaseNote>, ApiError> {
        let req = self.http.get(self.url("/release-notes"));
        self.send_json("list release notes".into(), req).await
    }

    async fn get_release_note(&self, id: i64) -> Result<ReleaseNote, ApiError> {
        let req = self.http.get(self.url(&format!("/release-notes/{id}")));
        self.send_json(format!("get release note {id}"), req).await
    }

    async fn create_release_note(&self, req: NewReleaseNote) -> Result<ReleaseNote, ApiError> {
        info!(title = %req.title, version = %req.version, "Creating release note");
        let req = self.http.post(self.url("/release-notes")).json(&req);
        self.send_json("create release note".into(), req).await
    }

    async fn update_release_note(
        &self,
        id: i64,
        req: ReleaseNoteUpdate,
    ) -> Result<ReleaseNote, ApiError> {
        let req = self
            .http
            .put(self.url(&format!("/release-notes/{id}")))
            .json(&req);
        self.send_json(format!("update release note {id}"), req)
            .await
    }

    async fn delete_release_note(&self, id: i64) -> Result<(), ApiError> {
        let req = self.http.delete(self.url(&format!("/release-notes/{id}")));
        self.send_empty(format!("delete release note {id}"), req)
            .await
    }

    async fn health(&self) -> Result<(), ApiError> {
        let req = self.http.get(format!("{}/health", self.server_root()));
        self.send_empty("health check".into(), req).await
    }
}
