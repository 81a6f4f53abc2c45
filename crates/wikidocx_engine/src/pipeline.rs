use std::path::PathBuf;

use crate::aggregate::assemble_document;
use crate::convert::{ConvertError, DocumentConverter};
use crate::images::{fetch_image_pool, ImageFetcher};
use crate::inline::{inline_images_direct, inline_images_from_pool};
use crate::persist::{write_output_file, PersistError};
use crate::records::ListDataStore;
use crate::session::{sign_in, AuthError};
use crate::types::{FetchError, FetchSettings};

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub site: String,
    pub library: String,
    /// Pool variant: name of the image library whose contents are matched
    /// against page image references. `None` selects the direct strategy.
    pub image_library: Option<String>,
    pub output: PathBuf,
    /// Optional debug dump of the combined markup after inlining.
    pub combined_html: Option<PathBuf>,
    pub fetch: FetchSettings,
}

#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineReport {
    pub page_count: usize,
    pub pooled_images: usize,
    pub output_path: PathBuf,
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("authentication failed: {0}")]
    Auth(#[from] AuthError),
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),
    #[error("document conversion failed: {0}")]
    Convert(#[from] ConvertError),
    #[error("writing output failed: {0}")]
    Output(#[from] PersistError),
}

/// Runs the whole export once: authenticate, harvest, aggregate, inline,
/// convert, write. The first failing stage short-circuits the rest.
pub async fn run(
    options: &PipelineOptions,
    credentials: &Credentials,
    converter: &dyn DocumentConverter,
) -> Result<PipelineReport, PipelineError> {
    let session = sign_in(
        &options.site,
        &credentials.username,
        &credentials.password,
        &options.fetch,
    )
    .await?;
    log::info!("signed in to {}", session.site_url());

    let fetcher = ImageFetcher::new(&options.fetch)?;

    let pool = match &options.image_library {
        Some(library) => {
            let store = ListDataStore::new(session.clone(), library.clone(), &options.fetch)?;
            let pool = fetch_image_pool(&store, &fetcher, &session).await?;
            log::info!("fetched {} images from library {library}", pool.len());
            pool
        }
        None => Vec::new(),
    };

    let store = ListDataStore::new(session.clone(), options.library.clone(), &options.fetch)?;
    let document = assemble_document(&store).await?;
    log::info!(
        "aggregated {} wiki pages from library {}",
        document.page_count,
        options.library
    );

    let inlined = if options.image_library.is_some() {
        inline_images_from_pool(&document.html, &pool)
    } else {
        inline_images_direct(&document.html, &fetcher, &session).await
    };

    if let Some(path) = &options.combined_html {
        write_output_file(path, inlined.as_bytes())?;
        log::info!("wrote combined markup to {}", path.display());
    }

    let blob = converter.convert(&inlined)?;
    let output_path = write_output_file(&options.output, &blob)?;

    Ok(PipelineReport {
        page_count: document.page_count,
        pooled_images: pool.len(),
        output_path,
    })
}
