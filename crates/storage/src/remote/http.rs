use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::debug;

use super::{RemoteDocument, RemoteDocumentStore, RemoteError, RemoteErrorCode};

/// JSON document store reached over HTTP.
///
/// `GET {base}/documents/{key}` reads, `PATCH …?merge=true` merges and `PUT`
/// replaces.
#[derive(Clone)]
pub struct HttpDocumentStore {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl HttpDocumentStore {
    /// Build a store rooted at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError` if the HTTP client cannot be constructed.
    pub fn new(
        base_url: impl Into<String>,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, RemoteError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| RemoteError::new(RemoteErrorCode::Other, err.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            token,
        })
    }

    fn document_url(&self, key: &str) -> String {
        format!("{}/documents/{key}", self.base_url.trim_end_matches('/'))
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

/// Map a non-success HTTP status onto a remote error code.
#[must_use]
pub fn code_for_status(status: StatusCode) -> RemoteErrorCode {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => RemoteErrorCode::PermissionDenied,
        StatusCode::REQUEST_TIMEOUT | StatusCode::TOO_MANY_REQUESTS => {
            RemoteErrorCode::Unavailable
        }
        s if s.is_server_error() => RemoteErrorCode::Unavailable,
        _ => RemoteErrorCode::Other,
    }
}

fn transport_error(err: &reqwest::Error) -> RemoteError {
    let code = if err.is_timeout() || err.is_connect() {
        RemoteErrorCode::Unavailable
    } else {
        RemoteErrorCode::Other
    };
    RemoteError::new(code, err.to_string())
}

fn status_error(status: StatusCode) -> RemoteError {
    RemoteError::new(
        code_for_status(status),
        format!("remote store responded with status {status}"),
    )
}

#[async_trait]
impl RemoteDocumentStore for HttpDocumentStore {
    async fn read(&self, key: &str) -> Result<Option<RemoteDocument>, RemoteError> {
        let request = self.authorize(self.client.get(self.document_url(key)));
        let response = request.send().await.map_err(|err| transport_error(&err))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            debug!(key, "remote document not found");
            return Ok(None);
        }
        if !status.is_success() {
            return Err(status_error(status));
        }

        let document = response
            .json::<RemoteDocument>()
            .await
            .map_err(|err| RemoteError::new(RemoteErrorCode::InvalidDocument, err.to_string()))?;
        Ok(Some(document))
    }

    async fn write(
        &self,
        key: &str,
        document: &RemoteDocument,
        merge: bool,
    ) -> Result<(), RemoteError> {
        let url = self.document_url(key);
        let request = if merge {
            self.client.patch(url).query(&[("merge", "true")])
        } else {
            self.client.put(url)
        };
        let response = self
            .authorize(request)
            .json(document)
            .send()
            .await
            .map_err(|err| transport_error(&err))?;

        let status = response.status();
        if !status.is_success() {
            return Err(status_error(status));
        }
        debug!(key, merge, "remote document written");
        Ok(())
    }
}
