use pretty_assertions::assert_eq;
use wikidocx_engine::{
    inline_images_direct, inline_images_from_pool, FetchSettings, ImageDescriptor, ImageFetcher,
    SpSession,
};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn descriptor(path: &str, content_type: &str, content_base64: &str) -> ImageDescriptor {
    ImageDescriptor {
        path: path.to_string(),
        content_type: content_type.to_string(),
        content_base64: content_base64.to_string(),
    }
}

#[test]
fn pool_match_rewrites_source_to_data_uri() {
    let html = r#"<div><img src="/sites/x/img.png"></div>"#;
    let pool = vec![descriptor("/sites/x/img.png", "image/png", "aGVsbG8=")];
    assert_eq!(
        inline_images_from_pool(html, &pool),
        r#"<div><img src="data:image/png;base64,aGVsbG8="></div>"#
    );
}

#[test]
fn pool_without_match_leaves_reference_unchanged() {
    let html = r#"<div><img src="/sites/x/img.png"></div>"#;
    let pool = vec![descriptor("/sites/x/other.png", "image/png", "aGVsbG8=")];
    assert_eq!(inline_images_from_pool(html, &pool), html);
}

#[test]
fn empty_pool_returns_input_verbatim() {
    let html = r#"<div><img src="/a.png"><p>text & more</p></div>"#;
    assert_eq!(inline_images_from_pool(html, &[]), html);
}

#[test]
fn nested_references_are_discovered() {
    let html = concat!(
        r#"<div><table><tbody><tr><td><ul><li>"#,
        r#"<img src="/deep.png">"#,
        r#"</li></ul></td></tr></tbody></table></div>"#
    );
    let pool = vec![descriptor("/deep.png", "image/gif", "QUJD")];
    let inlined = inline_images_from_pool(html, &pool);
    assert!(inlined.contains(r#"<img src="data:image/gif;base64,QUJD">"#));
}

#[test]
fn image_without_source_is_ignored() {
    let html = r#"<div><img alt="no source"><img src=""></div>"#;
    let pool = vec![descriptor("", "image/png", "QUJD")];
    let inlined = inline_images_from_pool(html, &pool);
    assert!(!inlined.contains("data:"));
}

#[test]
fn line_breaks_stay_self_closed_after_rewrite() {
    let html = r#"<div><p>a<br/>b</p><img src="/x.png"></div>"#;
    let pool = vec![descriptor("/x.png", "image/png", "QUJD")];
    let inlined = inline_images_from_pool(html, &pool);
    assert!(inlined.contains("a<br/>b"));
    assert!(!inlined.contains("<br>"));
}

#[test]
fn unmodified_tree_round_trips_structurally() {
    let html = concat!(
        r#"<div id="wrap"><h1 style="text-decoration: underline">T</h1>"#,
        r#"<p>Hi <b>there</b></p><img src="/y.png"></div>"#
    );
    let pool = vec![descriptor("/absent.png", "image/png", "QUJD")];
    assert_eq!(inline_images_from_pool(html, &pool), html);
}

#[tokio::test]
async fn direct_fetch_rewrites_survivors_and_skips_failures() {
    exporter_logging::initialize_for_tests();

    let server = MockServer::start().await;
    // "png-bytes" base64-encodes to cG5nLWJ5dGVz.
    Mock::given(method("GET"))
        .and(path("/sites/x/one.png"))
        .and(header("Cookie", "FedAuth=fed; rtFa=rt"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(&b"png-bytes"[..], "image/png"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/sites/x/two.png"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let session = SpSession::for_site(&format!("{}/sites/x", server.uri()), "fed", "rt").unwrap();
    let fetcher = ImageFetcher::new(&FetchSettings::default()).unwrap();

    let html = concat!(
        r#"<div><p><img src="/sites/x/one.png"></p>"#,
        r#"<img src="/sites/x/two.png"></div>"#
    );
    let inlined = inline_images_direct(html, &fetcher, &session).await;

    assert!(inlined.contains(r#"<img src="data:image/png;base64,cG5nLWJ5dGVz">"#));
    // The failing reference stays a plain link; resolution still succeeded.
    assert!(inlined.contains(r#"<img src="/sites/x/two.png">"#));
}

#[tokio::test]
async fn direct_fetch_handles_absolute_external_urls() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ext/logo.png"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(&b"png-bytes"[..], "image/png"))
        .mount(&server)
        .await;

    // The session points at a different site; the absolute URL must be
    // fetched as given, not qualified against the session host.
    let session = SpSession::for_site("https://contoso.sharepoint.com/sites/x", "fed", "rt").unwrap();
    let fetcher = ImageFetcher::new(&FetchSettings::default()).unwrap();

    let html = format!(r#"<div><img src="{}/ext/logo.png"></div>"#, server.uri());
    let inlined = inline_images_direct(&html, &fetcher, &session).await;
    assert!(inlined.contains("data:image/png;base64,cG5nLWJ5dGVz"));
}

#[tokio::test]
async fn direct_fetch_without_references_is_a_no_op() {
    let session = SpSession::for_site("https://contoso.sharepoint.com", "fed", "rt").unwrap();
    let fetcher = ImageFetcher::new(&FetchSettings::default()).unwrap();

    let html = "<div><p>No images here</p></div>";
    assert_eq!(inline_images_direct(html, &fetcher, &session).await, html);
}
