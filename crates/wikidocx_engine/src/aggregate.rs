use futures_util::future;

use crate::records::RecordStore;
use crate::types::{ContentRecord, FetchError};

/// Content-type tag marking a record as page content.
pub const PAGE_CONTENT_TYPE: &str = "Wiki Page";

/// Filename suffix stripped from record names for headings.
const PAGE_SUFFIX: &str = ".aspx";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledDocument {
    pub html: String,
    pub page_count: usize,
}

/// Concatenates the qualifying records into one combined HTML document.
///
/// One inner `<div>` per wiki page in input order, each headed by the
/// record's display name, all inside a single wrapper. The result is also
/// normalized so it survives an XML-style round trip: bare `<br>` tags are
/// self-closed.
pub fn aggregate_records(records: &[ContentRecord]) -> String {
    let mut combined = String::from("<div>");
    for record in records {
        if record.content_type != PAGE_CONTENT_TYPE {
            continue;
        }
        let display_name = display_name(&record.name);
        let body = record.body.as_deref().unwrap_or("");
        combined.push_str(&format!(
            r#"<div><h1 style="text-decoration: underline">{display_name}</h1>{body}</div>"#
        ));
    }
    combined.push_str("</div>");
    combined.replace("<br>", "<br/>")
}

fn display_name(name: &str) -> &str {
    match name.rfind(PAGE_SUFFIX) {
        Some(idx) => &name[..idx],
        None => name,
    }
}

/// Fetches every qualifying record's full body and aggregates them.
///
/// The collection listing does not carry bodies, so each wiki page is
/// re-fetched by identifier. All per-record fetches are started before any
/// is awaited and joined in input order; any single failure is fatal since
/// every page is required for the combined document.
pub async fn assemble_document(
    store: &dyn RecordStore,
) -> Result<AssembledDocument, FetchError> {
    let collection = store.fetch_collection().await?;

    let fetches: Vec<_> = collection
        .iter()
        .filter(|record| record.content_type == PAGE_CONTENT_TYPE)
        .map(|record| store.fetch_by_id(record.id))
        .collect();
    let records = future::join_all(fetches)
        .await
        .into_iter()
        .collect::<Result<Vec<_>, _>>()?;

    Ok(AssembledDocument {
        html: aggregate_records(&records),
        page_count: records.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::display_name;

    #[test]
    fn display_name_strips_page_suffix() {
        assert_eq!(display_name("Intro.aspx"), "Intro");
        assert_eq!(display_name("No Suffix"), "No Suffix");
    }
}
