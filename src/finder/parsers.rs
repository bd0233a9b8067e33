//! Response parsers of the image finder
//!
//! - [`parse_links`] follows `<a href>` and `<img src>` of HTML pages
//! - [`parse_image`] turns an image response into an item
//!
//! Both only accept `200 OK` responses with a body. Anything else is
//! reported once, by [`parse_links`].

use crate::component::{Data, HttpResponse, Item, Request};
use crate::local::ParseResponse;
use anyhow::{anyhow, bail};
use reqwest::StatusCode;
use scraper::{Html, Selector};
use url::Url;

/// Returns the finder's response parsers, links first
pub fn response_parsers() -> Vec<ParseResponse> {
    vec![
        Box::new(parse_links) as ParseResponse,
        Box::new(parse_image) as ParseResponse,
    ]
}

/// Rejects anything but a `200 OK` response with a body
fn checked_body(resp: &HttpResponse) -> anyhow::Result<&[u8]> {
    if resp.status != StatusCode::OK {
        bail!(
            "unsupported status code {} (request URL: {})",
            resp.status.as_u16(),
            resp.url
        );
    }
    resp.body
        .as_deref()
        .ok_or_else(|| anyhow!("missing HTTP response body (request URL: {})", resp.url))
}

/// Extracts follow-up requests from an HTML page
///
/// Non-HTML responses produce nothing. Request depths are left for the
/// analyzer to set.
pub fn parse_links(resp: &HttpResponse, depth: u32) -> (Vec<Data>, Vec<anyhow::Error>) {
    let body = match checked_body(resp) {
        Ok(body) => body,
        Err(e) => return (Vec::new(), vec![e]),
    };
    let is_html = resp
        .content_type()
        .is_some_and(|ct| ct.starts_with("text/html"));
    if !is_html {
        return (Vec::new(), Vec::new());
    }

    let html = String::from_utf8_lossy(body);
    let data = extract_links(&html, &resp.url)
        .into_iter()
        .map(|url| Data::from(Request::get(url, depth)))
        .collect();
    (data, Vec::new())
}

/// Collects absolute link targets of `<a href>` and `<img src>` in document order
fn extract_links(html: &str, base_url: &Url) -> Vec<Url> {
    let document = Html::parse_document(html);
    let mut links = Vec::new();

    for (selector, attr) in [("a[href]", "href"), ("img[src]", "src")] {
        let Ok(selector) = Selector::parse(selector) else {
            continue;
        };
        for element in document.select(&selector) {
            if let Some(url) = element
                .value()
                .attr(attr)
                .and_then(|target| resolve_link(target, base_url))
            {
                links.push(url);
            }
        }
    }

    links
}

/// Resolves a link target against the page URL
///
/// Returns None if the link should be excluded:
/// - empty or fragment-only targets
/// - javascript:, mailto:, tel: schemes and data: URIs
/// - targets that do not resolve to an HTTP(S) URL
fn resolve_link(target: &str, base_url: &Url) -> Option<Url> {
    let target = target.trim();
    if target.is_empty() || target.starts_with('#') {
        return None;
    }

    let lower = target.to_ascii_lowercase();
    if ["javascript:", "mailto:", "tel:", "data:"]
        .iter()
        .any(|scheme| lower.starts_with(scheme))
    {
        return None;
    }

    let url = base_url.join(target).ok()?;
    matches!(url.scheme(), "http" | "https").then_some(url)
}

/// Turns an image response into an item
///
/// The item carries `name` (last path segment), `ext` (image subtype from the
/// `Content-Type`), `body` and `url`. Non-image responses produce nothing,
/// and so do responses [`parse_links`] already rejects.
pub fn parse_image(resp: &HttpResponse, _depth: u32) -> (Vec<Data>, Vec<anyhow::Error>) {
    let Ok(body) = checked_body(resp) else {
        return (Vec::new(), Vec::new());
    };
    let Some(ext) = resp.content_type().and_then(image_format) else {
        return (Vec::new(), Vec::new());
    };

    let mut item = Item::new();
    item.insert("name", image_name(&resp.url));
    item.insert("ext", ext);
    item.insert("body", body.to_vec());
    item.insert("url", resp.url.as_str());
    (vec![Data::from(item)], Vec::new())
}

/// `image/png; q=1` gives `png`
fn image_format(content_type: &str) -> Option<String> {
    let subtype = content_type.strip_prefix("image/")?;
    let subtype = subtype.split(';').next().unwrap_or_default().trim();
    (!subtype.is_empty()).then(|| subtype.to_string())
}

fn image_name(url: &Url) -> String {
    url.path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
        .unwrap_or("image")
        .to_string()
}
