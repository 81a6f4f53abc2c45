use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use futures_util::future;
use reqwest::header::{CONTENT_TYPE, COOKIE};
use url::Url;

use crate::records::RecordStore;
use crate::session::SpSession;
use crate::types::{map_reqwest_error, FailureKind, FetchError, FetchSettings, ImageDescriptor};

/// Retrieves one image as an [`ImageDescriptor`], optionally attaching the
/// store's session cookies.
#[derive(Debug, Clone)]
pub struct ImageFetcher {
    client: reqwest::Client,
}

impl ImageFetcher {
    pub fn new(settings: &FetchSettings) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| FetchError::new(FailureKind::Network, err.to_string()))?;
        Ok(Self { client })
    }

    /// Fetches `src` and returns its content in transportable form.
    ///
    /// A reference without an absolute scheme is qualified against the
    /// session's origin. The cookie header is attached only when
    /// `authenticated` is set; external hosts never see the credentials.
    pub async fn fetch(
        &self,
        session: &SpSession,
        src: &str,
        authenticated: bool,
    ) -> Result<ImageDescriptor, FetchError> {
        let request_url = if src.starts_with("http://") || src.starts_with("https://") {
            src.to_string()
        } else {
            session.qualify(src)
        };
        let request_url = Url::parse(&request_url)
            .map_err(|err| FetchError::new(FailureKind::InvalidUrl, err.to_string()))?;

        let mut request = self.client.get(request_url);
        if authenticated {
            request = request.header(COOKIE, session.cookie_header());
        }

        let response = request.send().await.map_err(map_reqwest_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::new(
                FailureKind::HttpStatus(status.as_u16()),
                status.to_string(),
            ));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = response.bytes().await.map_err(map_reqwest_error)?;

        Ok(ImageDescriptor {
            path: descriptor_path(src),
            content_type,
            content_base64: BASE64.encode(&bytes),
        })
    }
}

/// Path the descriptor is indexed under: the URL path for absolute
/// references, the reference itself when it is already server-relative.
fn descriptor_path(src: &str) -> String {
    match Url::parse(src) {
        Ok(url) => url.path().to_string(),
        Err(_) => src.to_string(),
    }
}

/// Fetches the image library's contents up front for pool correlation.
///
/// Each item's server-relative URL is `{path}/{name}`. A failed fetch only
/// drops that one descriptor from the pool; page references that pointed at
/// it simply stay unresolved.
pub async fn fetch_image_pool(
    store: &dyn RecordStore,
    fetcher: &ImageFetcher,
    session: &SpSession,
) -> Result<Vec<ImageDescriptor>, FetchError> {
    let records = store.fetch_collection().await?;
    let sources: Vec<String> = records
        .iter()
        .filter_map(|record| {
            record
                .path
                .as_deref()
                .map(|path| format!("{}/{}", path, record.name))
        })
        .collect();

    let fetched = future::join_all(
        sources
            .iter()
            .map(|src| fetcher.fetch(session, src, true)),
    )
    .await;

    let mut pool = Vec::new();
    for (src, result) in sources.iter().zip(fetched) {
        match result {
            Ok(descriptor) => pool.push(descriptor),
            Err(err) => log::warn!("could not retrieve pooled image {src}: {err}"),
        }
    }
    Ok(pool)
}
