//! MetaContrata REST client.
//!
//! Every response is wrapped in `{estado, mensaje, resultado}`; `estado == 1`
//! means success. Calls after login carry the session passkey in a `passkey`
//! header.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::Instrument;

use cvsync_core::{MetaConfig, SourceDepartment, SourceEmployee};
use cvsync_sync::{ServiceResult, SourceDirectory};

use crate::error::{base_url, join, ClientError};

const SERVICE: &str = "MetaContrata";

#[derive(Deserialize)]
struct Envelope {
    estado: i64,
    #[serde(default)]
    mensaje: Option<String>,
    #[serde(default)]
    resultado: Value,
}

#[derive(Deserialize)]
struct Login {
    passkey: String,
}

#[derive(Serialize)]
struct EmployeeQuery {
    #[serde(rename = "SoloEmpleadosActivos")]
    only_active: u8,
}

/// An authenticated MetaContrata session.
pub struct MetaClient {
    http: Client,
    base: Url,
    passkey: String,
    only_active: bool,
}

impl fmt::Debug for MetaClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetaClient")
            .field("base", &self.base.as_str())
            .field("only_active", &self.only_active)
            .finish_non_exhaustive()
    }
}

impl MetaClient {
    /// Build the HTTP client and log in, exchanging credentials for a passkey.
    pub async fn connect(config: &MetaConfig) -> Result<Self, ClientError> {
        let base = base_url(&config.base_url)?;
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(ClientError::Build)?;
        let mut client = Self {
            http,
            base,
            passkey: String::new(),
            only_active: config.only_active,
        };

        let body = json!({ "usuario": config.username, "password": config.password });
        let login: Login = client.post("login/passkey", "login", &body).await?;
        client.passkey = login.passkey;
        tracing::info!(base = %client.base, "authenticated with MetaContrata");
        Ok(client)
    }

    /// Every employee, restricted to active ones when `only_active` is set.
    pub async fn employees(&self) -> Result<Vec<SourceEmployee>, ClientError> {
        let query = EmployeeQuery {
            only_active: u8::from(self.only_active),
        };
        self.post("empleados/listado", "employee list", &query).await
    }

    /// Every subcontractor.
    pub async fn subcontractors(&self) -> Result<Vec<SourceDepartment>, ClientError> {
        self.post("empresas/listado", "subcontractor list", &json!({}))
            .await
    }

    async fn post<B, T>(
        &self,
        endpoint: &str,
        operation: &'static str,
        body: &B,
    ) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = join(&self.base, endpoint)?;
        let span = tracing::debug_span!("metacontrata.request", operation, %url);

        async move {
            let mut request = self.http.post(url.clone()).json(body);
            if !self.passkey.is_empty() {
                request = request.header("passkey", &self.passkey);
            }

            let response = request
                .send()
                .await
                .map_err(|e| ClientError::http(url.as_str(), e))?;
            let status = response.status();
            if !status.is_success() {
                return Err(ClientError::Status {
                    url: url.to_string(),
                    status,
                });
            }
            let bytes = response
                .bytes()
                .await
                .map_err(|e| ClientError::http(url.as_str(), e))?;

            let envelope: Envelope = serde_json::from_slice(&bytes)
                .map_err(|source| ClientError::Decode { operation, source })?;
            if envelope.estado != 1 {
                return Err(ClientError::Api {
                    service: SERVICE,
                    operation,
                    message: envelope
                        .mensaje
                        .unwrap_or_else(|| format!("estado {}", envelope.estado)),
                });
            }
            tracing::debug!("request succeeded");
            serde_json::from_value(envelope.resultado)
                .map_err(|source| ClientError::Decode { operation, source })
        }
        .instrument(span)
        .await
    }
}

#[async_trait]
impl SourceDirectory for MetaClient {
    async fn list_business_units(&self) -> ServiceResult<Vec<SourceDepartment>> {
        Ok(self.subcontractors().await?)
    }

    async fn list_employees(&self) -> ServiceResult<Vec<SourceEmployee>> {
        Ok(self.employees().await?)
    }
}
