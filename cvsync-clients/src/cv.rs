//! ZKBio CVSecurity REST client.
//!
//! Responses are wrapped in `{code, message, data}`; `code == 0` means
//! success. Every request carries the API key as the `access_token` query
//! parameter. Listing endpoints are paged with `pageNo` (1-based) and
//! `pageSize`; a page shorter than `pageSize` is the last one.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::Instrument;

use cvsync_core::{BusinessCode, CvConfig, TargetDepartment, TargetPerson};
use cvsync_sync::{ServiceResult, TargetDirectory};

use crate::error::{base_url, join, ClientError};

const SERVICE: &str = "CVSecurity";

/// Upper bound on listing pages per call.
const MAX_PAGES: usize = 10_000;

#[derive(Deserialize)]
struct Envelope {
    code: i64,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    data: Value,
}

#[derive(Serialize)]
struct DeletePins<'a> {
    pins: &'a [BusinessCode],
}

pub struct CvClient {
    http: Client,
    base: Url,
    token: String,
    page_size: usize,
}

impl fmt::Debug for CvClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CvClient")
            .field("base", &self.base.as_str())
            .field("page_size", &self.page_size)
            .finish_non_exhaustive()
    }
}

impl CvClient {
    pub fn new(config: &CvConfig) -> Result<Self, ClientError> {
        let host = config.base_url.trim_end_matches('/');
        let base = match config.port {
            Some(port) => base_url(&format!("{host}:{port}"))?,
            None => base_url(host)?,
        };
        let http = Client::builder()
            .danger_accept_invalid_certs(config.ignore_ssl)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(ClientError::Build)?;

        if config.ignore_ssl {
            tracing::warn!(%base, "TLS certificate verification disabled for CVSecurity");
        }

        Ok(Self {
            http,
            base,
            token: config.api_key.clone(),
            page_size: config.page_size.max(1),
        })
    }

    pub async fn departments(&self) -> Result<Vec<TargetDepartment>, ClientError> {
        self.list_paged(Method::GET, "api/department/getDepartmentList", "department list")
            .await
    }

    pub async fn add_department(&self, department: &TargetDepartment) -> Result<(), ClientError> {
        self.send(
            Method::POST,
            self.url("api/department/add")?,
            Some(department),
            "department add",
        )
        .await
        .map(drop)
    }

    pub async fn remove_department(&self, code: &BusinessCode) -> Result<(), ClientError> {
        let mut url = self.url("api/department/delete")?;
        url.path_segments_mut()
            .map_err(|()| ClientError::InvalidUrl {
                url: self.base.to_string(),
                reason: "cannot carry a path".into(),
            })?
            .push(code.as_str());
        self.send::<()>(Method::POST, url, None, "department delete")
            .await
            .map(drop)
    }

    pub async fn persons(&self) -> Result<Vec<TargetPerson>, ClientError> {
        self.list_paged(Method::POST, "api/person/getPersonList", "person list")
            .await
    }

    pub async fn add_persons(&self, persons: &[TargetPerson]) -> Result<(), ClientError> {
        self.send(
            Method::POST,
            self.url("api/person/addPersons")?,
            Some(persons),
            "person bulk add",
        )
        .await
        .map(drop)
    }

    pub async fn delete_persons(&self, pins: &[BusinessCode]) -> Result<(), ClientError> {
        self.send(
            Method::POST,
            self.url("api/person/deletePersons")?,
            Some(&DeletePins { pins }),
            "person bulk delete",
        )
        .await
        .map(drop)
    }

    fn url(&self, endpoint: &str) -> Result<Url, ClientError> {
        join(&self.base, endpoint)
    }

    /// Fetch pages until a short one. A page identical to the previous one
    /// means the server ignores `pageNo`, which would otherwise never end.
    async fn list_paged<T: DeserializeOwned>(
        &self,
        method: Method,
        endpoint: &str,
        operation: &'static str,
    ) -> Result<Vec<T>, ClientError> {
        let mut all = Vec::new();
        let mut previous = Value::Null;
        for page_no in 1..=MAX_PAGES {
            let mut url = self.url(endpoint)?;
            url.query_pairs_mut()
                .append_pair("pageNo", &page_no.to_string())
                .append_pair("pageSize", &self.page_size.to_string());

            let data = self.send::<()>(method.clone(), url, None, operation).await?;
            if page_no > 1 && data == previous {
                return Err(ClientError::Paging {
                    operation,
                    reason: format!("page {page_no} repeats page {}", page_no - 1),
                });
            }
            let page: Vec<T> = if data.is_null() {
                Vec::new()
            } else {
                serde_json::from_value(data.clone())
                    .map_err(|source| ClientError::Decode { operation, source })?
            };

            let len = page.len();
            all.extend(page);
            tracing::debug!(operation, page_no, len, "fetched page");
            if len < self.page_size {
                return Ok(all);
            }
            previous = data;
        }
        Err(ClientError::Paging {
            operation,
            reason: format!("more than {MAX_PAGES} pages"),
        })
    }

    /// Issue one call and unwrap the envelope, returning `data`.
    async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        mut url: Url,
        body: Option<&B>,
        operation: &'static str,
    ) -> Result<Value, ClientError> {
        // Logged and reported without the token.
        let shown = url.to_string();
        url.query_pairs_mut().append_pair("access_token", &self.token);
        let span = tracing::debug_span!("cvsecurity.request", operation, url = %shown);

        async move {
            let mut request = self.http.request(method, url);
            if let Some(body) = body {
                request = request.json(body);
            }

            let response = request
                .send()
                .await
                .map_err(|e| ClientError::http(&shown, e))?;
            let status = response.status();
            if !status.is_success() {
                return Err(ClientError::Status { url: shown, status });
            }
            let bytes = response
                .bytes()
                .await
                .map_err(|e| ClientError::http(&shown, e))?;

            let envelope: Envelope = serde_json::from_slice(&bytes)
                .map_err(|source| ClientError::Decode { operation, source })?;
            if envelope.code != 0 {
                return Err(ClientError::Api {
                    service: SERVICE,
                    operation,
                    message: envelope
                        .message
                        .unwrap_or_else(|| format!("code {}", envelope.code)),
                });
            }
            Ok(envelope.data)
        }
        .instrument(span)
        .await
    }
}

#[async_trait]
impl TargetDirectory for CvClient {
    async fn list_departments(&self) -> ServiceResult<Vec<TargetDepartment>> {
        Ok(self.departments().await?)
    }

    async fn create_or_update_department(
        &self,
        department: &TargetDepartment,
    ) -> ServiceResult<()> {
        Ok(self.add_department(department).await?)
    }

    async fn delete_department(&self, code: &BusinessCode) -> ServiceResult<()> {
        Ok(self.remove_department(code).await?)
    }

    async fn list_persons(&self) -> ServiceResult<Vec<TargetPerson>> {
        Ok(self.persons().await?)
    }

    async fn bulk_create_or_update_persons(&self, persons: &[TargetPerson]) -> ServiceResult<()> {
        Ok(self.add_persons(persons).await?)
    }

    async fn bulk_delete_persons(&self, pins: &[BusinessCode]) -> ServiceResult<()> {
        Ok(self.delete_persons(pins).await?)
    }
}
