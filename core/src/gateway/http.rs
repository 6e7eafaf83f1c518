/// HTTP gateway backed by reqwest
use super::{error_detail, Body, Gateway, Request};
use crate::config::Config;
use crate::credential_store::CredentialStore;
use crate::error::{ClientError, Result};
use crate::models::ProfileUpdate;
use reqwest::header::AUTHORIZATION;
use reqwest::multipart::{Form, Part};
use serde_json::Value;
use tracing::{debug, warn};

pub struct HttpGateway {
    client: reqwest::Client,
    base_url: String,
    credentials: CredentialStore,
}

impl HttpGateway {
    pub fn new(config: &Config, credentials: CredentialStore) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(ClientError::Http)?;
        Ok(Self {
            client,
            base_url: config.api_url.trim_end_matches('/').to_string(),
            credentials,
        })
    }

    fn url(&self, request: &Request) -> String {
        format!("{}{}", self.base_url, request.path())
    }
}

impl Gateway for HttpGateway {
    async fn send(&self, request: &Request) -> Result<Value> {
        let url = self.url(request);
        debug!("→ {} {}", request.method(), url);

        let mut builder = self.client.request(request.method(), &url);
        // Token is read per request so a login/logout takes effect immediately
        if let Some(token) = self.credentials.token()? {
            builder = builder.header(AUTHORIZATION, format!("Token {}", token));
        }
        builder = match request.body() {
            Body::Empty => builder,
            Body::Json(value) => builder.json(&value),
            Body::Multipart(update) => builder.multipart(profile_form(update)?),
        };

        let response = builder.send().await.map_err(ClientError::Http)?;
        let status = response.status();
        let bytes = response.bytes().await.map_err(ClientError::Http)?;
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                debug!("Non-JSON reply body from {} ({} bytes)", url, bytes.len());
                Value::Null
            })
        };

        debug!("← {} {}", status.as_u16(), url);
        if !status.is_success() {
            let detail = error_detail(&body);
            warn!(
                "{} {} failed with {}: {}",
                request.method(),
                url,
                status.as_u16(),
                detail.as_deref().unwrap_or("no detail")
            );
            return Err(ClientError::Api {
                status: status.as_u16(),
                detail,
            });
        }
        Ok(body)
    }
}

fn profile_form(update: &ProfileUpdate) -> Result<Form> {
    let mut form = Form::new();
    for (name, value) in update.text_fields() {
        form = form.text(name, value.to_string());
    }
    if let Some(avatar) = &update.avatar {
        let mime = mime_guess::from_path(&avatar.file_name).first_or_octet_stream();
        let part = Part::bytes(avatar.bytes.clone())
            .file_name(avatar.file_name.clone())
            .mime_str(mime.essence_str())
            .map_err(ClientError::Http)?;
        form = form.part("profile_picture", part);
    }
    Ok(form)
}
