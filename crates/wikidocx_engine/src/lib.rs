//! Wikidocx engine: wiki-library harvesting, image inlining, and DOCX
//! packaging.
mod aggregate;
mod convert;
mod images;
mod inline;
mod persist;
mod pipeline;
mod records;
mod session;
mod types;

pub use aggregate::{aggregate_records, assemble_document, AssembledDocument, PAGE_CONTENT_TYPE};
pub use convert::{ConvertError, DocumentConverter, MhtDocxConverter};
pub use images::{fetch_image_pool, ImageFetcher};
pub use inline::{inline_images_direct, inline_images_from_pool};
pub use persist::{ensure_output_dir, write_output_file, AtomicFileWriter, PersistError};
pub use pipeline::{run, Credentials, PipelineError, PipelineOptions, PipelineReport};
pub use records::{ListDataStore, RecordStore};
pub use session::{sign_in, AuthError, SpSession};
pub use types::{
    ContentRecord, FailureKind, FetchError, FetchSettings, ImageDescriptor, RecordId,
};
