use reqwest::header::{CONTENT_TYPE, SET_COOKIE};
use reqwest::redirect::Policy;
use url::Url;

use crate::types::FetchSettings;

/// Microsoft Online security token service used by SharePoint Online.
const STS_ENDPOINT: &str = "https://login.microsoftonline.com/extSTS.srf";

/// An authenticated SharePoint Online session.
///
/// Read-only after sign-in; every fetch that needs the store's origin or
/// its cookies takes this value explicitly instead of sharing an ambient
/// client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpSession {
    pub scheme: String,
    pub host: String,
    /// Server-relative site path, normalized to at least "/".
    pub site_path: String,
    pub fed_auth: String,
    pub rt_fa: String,
}

impl SpSession {
    /// Builds a session for the given site URL with already-known cookies.
    pub fn for_site(
        site: &str,
        fed_auth: impl Into<String>,
        rt_fa: impl Into<String>,
    ) -> Result<Self, AuthError> {
        let url = Url::parse(site).map_err(|err| AuthError::InvalidSite(err.to_string()))?;
        let host = url
            .host_str()
            .ok_or_else(|| AuthError::InvalidSite("site url has no host".into()))?;
        let host = match url.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        };
        let site_path = match url.path().trim_end_matches('/') {
            "" => "/".to_string(),
            path => path.to_string(),
        };
        Ok(Self {
            scheme: url.scheme().to_string(),
            host,
            site_path,
            fed_auth: fed_auth.into(),
            rt_fa: rt_fa.into(),
        })
    }

    /// Origin of the store, without the site path.
    pub fn origin(&self) -> String {
        format!("{}://{}", self.scheme, self.host)
    }

    /// Full URL of the site itself.
    pub fn site_url(&self) -> String {
        if self.site_path == "/" {
            self.origin()
        } else {
            format!("{}{}", self.origin(), self.site_path)
        }
    }

    /// Turns a server-relative reference into an absolute URL on the store.
    pub fn qualify(&self, reference: &str) -> String {
        format!("{}{}", self.origin(), reference)
    }

    /// Value for the `Cookie` header on authenticated requests.
    pub fn cookie_header(&self) -> String {
        format!("FedAuth={}; rtFa={}", self.fed_auth, self.rt_fa)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("invalid site url: {0}")]
    InvalidSite(String),
    #[error("transport failure during sign-in: {0}")]
    Transport(String),
    #[error("sign-in rejected: {0}")]
    Rejected(String),
}

/// Signs in to SharePoint Online and returns the session cookies.
///
/// This is the SAML flow the store expects: request a binary security token
/// from the Microsoft Online STS, then post that token to the site's
/// `wsignin1.0` endpoint and collect the `FedAuth`/`rtFa` cookies it sets.
pub async fn sign_in(
    site: &str,
    username: &str,
    password: &str,
    settings: &FetchSettings,
) -> Result<SpSession, AuthError> {
    let session = SpSession::for_site(site, "", "")?;

    // The signin endpoint answers with a redirect carrying Set-Cookie;
    // following it would lose the headers.
    let client = reqwest::Client::builder()
        .connect_timeout(settings.connect_timeout)
        .timeout(settings.request_timeout)
        .redirect(Policy::none())
        .build()
        .map_err(|err| AuthError::Transport(err.to_string()))?;

    let envelope = token_request_envelope(username, password, &session.origin());
    let response = client
        .post(STS_ENDPOINT)
        .header(CONTENT_TYPE, "application/soap+xml; charset=utf-8")
        .body(envelope)
        .send()
        .await
        .map_err(|err| AuthError::Transport(err.to_string()))?;
    let body = response
        .text()
        .await
        .map_err(|err| AuthError::Transport(err.to_string()))?;

    let token = extract_tag(&body, "wsse:BinarySecurityToken").ok_or_else(|| {
        let reason = extract_tag(&body, "psf:text")
            .unwrap_or_else(|| "no security token in STS response".to_string());
        AuthError::Rejected(reason.trim().to_string())
    })?;

    let signin_url = format!("{}/_forms/default.aspx?wa=wsignin1.0", session.origin());
    let response = client
        .post(&signin_url)
        .body(token)
        .send()
        .await
        .map_err(|err| AuthError::Transport(err.to_string()))?;

    let mut fed_auth = None;
    let mut rt_fa = None;
    for value in response.headers().get_all(SET_COOKIE) {
        let Ok(text) = value.to_str() else { continue };
        if let Some(rest) = text.strip_prefix("FedAuth=") {
            fed_auth = Some(cookie_value(rest));
        } else if let Some(rest) = text.strip_prefix("rtFa=") {
            rt_fa = Some(cookie_value(rest));
        }
    }

    match (fed_auth, rt_fa) {
        (Some(fed_auth), Some(rt_fa)) => Ok(SpSession {
            fed_auth,
            rt_fa,
            ..session
        }),
        _ => Err(AuthError::Rejected(
            "sign-in response did not set session cookies".into(),
        )),
    }
}

fn cookie_value(rest: &str) -> String {
    rest.split(';').next().unwrap_or(rest).to_string()
}

/// WS-Trust request for a binary security token scoped to the site origin.
fn token_request_envelope(username: &str, password: &str, origin: &str) -> String {
    format!(
        concat!(
            r#"<s:Envelope xmlns:s="http://www.w3.org/2003/05/soap-envelope" "#,
            r#"xmlns:a="http://www.w3.org/2005/08/addressing" "#,
            r#"xmlns:u="http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-wssecurity-utility-1.0.xsd">"#,
            r#"<s:Header>"#,
            r#"<a:Action s:mustUnderstand="1">http://schemas.xmlsoap.org/ws/2005/02/trust/RST/Issue</a:Action>"#,
            r#"<a:ReplyTo><a:Address>http://www.w3.org/2005/08/addressing/anonymous</a:Address></a:ReplyTo>"#,
            r#"<a:To s:mustUnderstand="1">https://login.microsoftonline.com/extSTS.srf</a:To>"#,
            r#"<o:Security s:mustUnderstand="1" "#,
            r#"xmlns:o="http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-wssecurity-secext-1.0.xsd">"#,
            r#"<o:UsernameToken>"#,
            r#"<o:Username>{username}</o:Username>"#,
            r#"<o:Password>{password}</o:Password>"#,
            r#"</o:UsernameToken>"#,
            r#"</o:Security>"#,
            r#"</s:Header>"#,
            r#"<s:Body>"#,
            r#"<t:RequestSecurityToken xmlns:t="http://schemas.xmlsoap.org/ws/2005/02/trust">"#,
            r#"<wsp:AppliesTo xmlns:wsp="http://schemas.xmlsoap.org/ws/2004/09/policy">"#,
            r#"<a:EndpointReference><a:Address>{origin}</a:Address></a:EndpointReference>"#,
            r#"</wsp:AppliesTo>"#,
            r#"<t:KeyType>http://schemas.xmlsoap.org/ws/2005/05/identity/NoProofKey</t:KeyType>"#,
            r#"<t:RequestType>http://schemas.xmlsoap.org/ws/2005/02/trust/Issue</t:RequestType>"#,
            r#"<t:TokenType>urn:oasis:names:tc:SAML:1.0:assertion</t:TokenType>"#,
            r#"</t:RequestSecurityToken>"#,
            r#"</s:Body>"#,
            r#"</s:Envelope>"#,
        ),
        username = xml_escape(username),
        password = xml_escape(password),
        origin = xml_escape(origin),
    )
}

fn xml_escape(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Text content of the first `<{tag} ...>...</{tag}>` element, if any.
fn extract_tag(xml: &str, tag: &str) -> Option<String> {
    let open = format!("<{tag}");
    let close = format!("</{tag}>");
    let start = xml.find(&open)?;
    let content_start = start + xml[start..].find('>')? + 1;
    let end = content_start + xml[content_start..].find(&close)?;
    Some(xml[content_start..end].to_string())
}

#[cfg(test)]
mod tests {
    use super::{extract_tag, sign_in, xml_escape, AuthError, SpSession};
    use crate::types::FetchSettings;

    #[test]
    fn session_normalizes_site_path() {
        let root = SpSession::for_site("https://contoso.sharepoint.com", "f", "r").unwrap();
        assert_eq!(root.site_path, "/");
        assert_eq!(root.site_url(), "https://contoso.sharepoint.com");

        let nested =
            SpSession::for_site("https://contoso.sharepoint.com/sites/docs/", "f", "r").unwrap();
        assert_eq!(nested.site_path, "/sites/docs");
        assert_eq!(nested.site_url(), "https://contoso.sharepoint.com/sites/docs");
        assert_eq!(
            nested.qualify("/sites/docs/img.png"),
            "https://contoso.sharepoint.com/sites/docs/img.png"
        );
    }

    #[test]
    fn session_keeps_explicit_port() {
        let session = SpSession::for_site("http://127.0.0.1:8080/site", "f", "r").unwrap();
        assert_eq!(session.origin(), "http://127.0.0.1:8080");
    }

    #[test]
    fn cookie_header_carries_both_tokens() {
        let session = SpSession::for_site("https://contoso.sharepoint.com", "fed", "rt").unwrap();
        assert_eq!(session.cookie_header(), "FedAuth=fed; rtFa=rt");
    }

    #[tokio::test]
    async fn sign_in_validates_site_before_any_request() {
        let err = sign_in("not a url", "user", "pass", &FetchSettings::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidSite(_)));
    }

    #[test]
    fn extract_tag_reads_element_content() {
        let xml = r#"<a><wsse:BinarySecurityToken Id="x">t=abc</wsse:BinarySecurityToken></a>"#;
        assert_eq!(
            extract_tag(xml, "wsse:BinarySecurityToken").as_deref(),
            Some("t=abc")
        );
        assert_eq!(extract_tag(xml, "psf:text"), None);
    }

    #[test]
    fn xml_escape_covers_markup_characters() {
        assert_eq!(xml_escape(r#"a&b<c>"d'"#), "a&amp;b&lt;c&gt;&quot;d&apos;");
    }
}
