use reqwest::header::{ACCEPT, COOKIE};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::session::SpSession;
use crate::types::{map_reqwest_error, ContentRecord, FailureKind, FetchError, FetchSettings, RecordId};

/// ListData.svc wraps every payload in a `d` member.
#[derive(Debug, Deserialize)]
struct Payload<T> {
    d: T,
}

#[derive(Debug, Deserialize)]
struct Collection {
    results: Vec<ContentRecord>,
}

/// The remote store's record surface: one call for the whole collection,
/// one call for a single record with its full body.
#[async_trait::async_trait]
pub trait RecordStore: Send + Sync {
    async fn fetch_collection(&self) -> Result<Vec<ContentRecord>, FetchError>;
    async fn fetch_by_id(&self, id: RecordId) -> Result<ContentRecord, FetchError>;
}

/// `RecordStore` over SharePoint's `_vti_bin/listdata.svc` endpoint.
#[derive(Debug, Clone)]
pub struct ListDataStore {
    client: reqwest::Client,
    session: SpSession,
    library: String,
}

impl ListDataStore {
    pub fn new(
        session: SpSession,
        library: impl Into<String>,
        settings: &FetchSettings,
    ) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| FetchError::new(FailureKind::Network, err.to_string()))?;
        Ok(Self {
            client,
            session,
            library: library.into(),
        })
    }

    fn library_url(&self) -> String {
        format!(
            "{}/_vti_bin/listdata.svc/{}",
            self.session.site_url(),
            self.library
        )
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, FetchError> {
        let response = self
            .client
            .get(url)
            .header(ACCEPT, "application/json;odata=verbose")
            .header(COOKIE, self.session.cookie_header())
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::new(
                FailureKind::HttpStatus(status.as_u16()),
                status.to_string(),
            ));
        }

        let bytes = response.bytes().await.map_err(map_reqwest_error)?;
        let payload: Payload<T> = serde_json::from_slice(&bytes)
            .map_err(|err| FetchError::new(FailureKind::Decode, err.to_string()))?;
        Ok(payload.d)
    }
}

#[async_trait::async_trait]
impl RecordStore for ListDataStore {
    async fn fetch_collection(&self) -> Result<Vec<ContentRecord>, FetchError> {
        let collection: Collection = self.get_json(&self.library_url()).await?;
        Ok(collection.results)
    }

    async fn fetch_by_id(&self, id: RecordId) -> Result<ContentRecord, FetchError> {
        let url = format!("{}({})", self.library_url(), id);
        self.get_json(&url).await
    }
}
