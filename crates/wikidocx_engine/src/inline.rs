use ego_tree::{NodeId, NodeRef};
use futures_util::future;
use scraper::node::Node;
use scraper::Html;

use crate::images::ImageFetcher;
use crate::session::SpSession;
use crate::types::ImageDescriptor;

/// Rewrites every resolvable image reference to an inline data URI by
/// fetching each one directly from its source.
///
/// References under the store's own site path are fetched with the session
/// cookies, everything else anonymously. All fetches are started before any
/// is awaited; a failed fetch leaves that one reference untouched and is
/// only reported as a diagnostic, it never aborts the others.
pub async fn inline_images_direct(
    html: &str,
    fetcher: &ImageFetcher,
    session: &SpSession,
) -> String {
    let mut document = Html::parse_fragment(html);
    let references = collect_image_refs(&document);
    if references.is_empty() {
        return html.to_string();
    }

    let fetches = references.iter().map(|(_, src)| {
        let authenticated = src.starts_with(&session.site_path);
        fetcher.fetch(session, src, authenticated)
    });
    let results = future::join_all(fetches).await;

    let mut rewrites = Vec::new();
    for ((id, src), result) in references.into_iter().zip(results) {
        match result {
            Ok(descriptor) => rewrites.push((id, descriptor.data_uri())),
            Err(err) => log::warn!("could not retrieve image {src}: {err}"),
        }
    }
    for (id, data_uri) in rewrites {
        set_image_src(&mut document, id, &data_uri);
    }

    serialize(&document)
}

/// Rewrites image references by correlating them against a pre-fetched pool.
///
/// The first descriptor whose recorded path equals the reference's `src`
/// wins; a reference with no match is left as-is, which is not an error.
/// An empty pool short-circuits to the unchanged input.
pub fn inline_images_from_pool(html: &str, pool: &[ImageDescriptor]) -> String {
    if pool.is_empty() {
        return html.to_string();
    }

    let mut document = Html::parse_fragment(html);
    for (id, src) in collect_image_refs(&document) {
        if let Some(descriptor) = pool.iter().find(|descriptor| descriptor.path == src) {
            set_image_src(&mut document, id, &descriptor.data_uri());
        }
    }

    serialize(&document)
}

/// Depth-first collection of every `<img>` carrying a non-empty `src`.
///
/// Wiki bodies nest images arbitrarily deep inside tables and lists, so the
/// whole tree is visited rather than just the section roots.
fn collect_image_refs(document: &Html) -> Vec<(NodeId, String)> {
    let mut references = Vec::new();
    visit(document.tree.root(), &mut references);
    references
}

fn visit(node: NodeRef<'_, Node>, references: &mut Vec<(NodeId, String)>) {
    if let Node::Element(element) = node.value() {
        if element.name().eq_ignore_ascii_case("img") {
            if let Some(src) = element.attr("src") {
                let src = src.trim();
                if !src.is_empty() {
                    references.push((node.id(), src.to_string()));
                }
            }
        }
    }
    for child in node.children() {
        visit(child, references);
    }
}

/// Replaces the `src` attribute value of the element at `id` in place.
fn set_image_src(document: &mut Html, id: NodeId, value: &str) {
    if let Some(mut node) = document.tree.get_mut(id) {
        if let Node::Element(element) = node.value() {
            for (name, attr_value) in element.attrs.iter_mut() {
                if name.local.as_ref() == "src" {
                    *attr_value = value.into();
                }
            }
        }
    }
}

/// Serializes the fragment back to markup, dropping the synthetic root the
/// fragment parser wraps around the input.
///
/// The serializer re-emits void elements in bare form, so line breaks are
/// self-closed again to keep the output well-formed. Literal `<br>` text
/// cannot leak in here: the serializer escapes `<` in text nodes.
fn serialize(document: &Html) -> String {
    document.root_element().inner_html().replace("<br>", "<br/>")
}
