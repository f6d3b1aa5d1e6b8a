use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::HashMap;

use super::ImageHit;

pub const API_ENDPOINT: &str = "https://commons.wikimedia.org/w/api.php";
/// Width of the rendition the API is asked to produce for cards.
pub const THUMB_WIDTH: u32 = 400;
/// MediaWiki file namespace.
const FILE_NAMESPACE: &str = "6";

/// Fetch one page of file-namespace search results.
///
/// Returns the hits in server rank order plus the continuation offset, if the
/// server reported one. An empty result set is not an error.
pub async fn fetch_page(
    client: &reqwest::Client,
    query: &str,
    offset: u64,
    limit: u32,
) -> Result<(Vec<ImageHit>, Option<u64>)> {
    let limit = limit.to_string();
    let offset = offset.to_string();
    let thumb_width = THUMB_WIDTH.to_string();
    let resp = client
        .get(API_ENDPOINT)
        .query(&[
            ("action", "query"),
            ("format", "json"),
            ("generator", "search"),
            ("gsrsearch", query),
            ("gsrnamespace", FILE_NAMESPACE),
            ("gsrlimit", limit.as_str()),
            ("gsroffset", offset.as_str()),
            ("prop", "imageinfo"),
            ("iiprop", "url|mime|size|timestamp|extmetadata"),
            ("iiurlwidth", thumb_width.as_str()),
            ("origin", "*"),
        ])
        .send()
        .await?;
    let status = resp.status();
    if !status.is_success() {
        let text = resp.text().await.unwrap_or_default();
        anyhow::bail!("search error {}: {}", status, text);
    }
    let body = resp.text().await?;
    parse_page(&body)
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(rename = "continue")]
    cont: Option<ApiContinue>,
    query: Option<ApiQuery>,
}

#[derive(Debug, Deserialize)]
struct ApiContinue {
    gsroffset: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ApiQuery {
    pages: HashMap<String, ApiPage>,
}

#[derive(Debug, Deserialize)]
struct ApiPage {
    pageid: u64,
    title: String,
    /// Search rank within this page of results; defines append order.
    index: Option<i64>,
    #[serde(default)]
    imageinfo: Vec<ApiImageInfo>,
}

#[derive(Debug, Deserialize)]
struct ApiImageInfo {
    url: Option<String>,
    thumburl: Option<String>,
    mime: Option<String>,
    size: Option<u64>,
    timestamp: Option<DateTime<Utc>>,
    extmetadata: Option<HashMap<String, ExtValue>>,
}

#[derive(Debug, Deserialize)]
struct ExtValue {
    value: serde_json::Value,
}

/// Parse a search response body into hits + continuation offset.
///
/// The page map is keyed by page id, so the server's per-record `index` rank
/// restores the order; records without a rank sort last.
pub fn parse_page(body: &str) -> Result<(Vec<ImageHit>, Option<u64>)> {
    let resp: ApiResponse = serde_json::from_str(body)?;
    let next_offset = resp.cont.and_then(|c| c.gsroffset);

    let Some(query) = resp.query else {
        // No result set at all (exhausted offset or zero matches).
        return Ok((Vec::new(), None));
    };

    let mut pages: Vec<ApiPage> = query.pages.into_values().collect();
    pages.sort_by_key(|p| (p.index.unwrap_or(i64::MAX), p.pageid));

    let mut hits = Vec::with_capacity(pages.len());
    for page in pages {
        let Some(info) = page.imageinfo.into_iter().next() else {
            continue;
        };
        // A record without any URL cannot be rendered as a card.
        let Some(url) = info.url else { continue };
        let thumb_url = info.thumburl.unwrap_or_else(|| url.clone());
        let (artist, license) = match &info.extmetadata {
            Some(meta) => (ext_str(meta, "Artist"), ext_str(meta, "LicenseShortName")),
            None => (None, None),
        };
        hits.push(ImageHit {
            page_id: page.pageid,
            title: display_title(&page.title).to_string(),
            url,
            thumb_url,
            mime: info.mime,
            size_bytes: info.size,
            uploaded: info.timestamp,
            artist,
            license,
        });
    }
    Ok((hits, next_offset))
}

fn ext_str(meta: &HashMap<String, ExtValue>, key: &str) -> Option<String> {
    let raw = meta.get(key)?.value.as_str()?;
    let clean = strip_html(raw);
    let clean = clean.trim();
    if clean.is_empty() {
        None
    } else {
        Some(clean.to_string())
    }
}

/// Strip the file-namespace prefix from a page title.
pub fn display_title(title: &str) -> &str {
    title.strip_prefix("File:").unwrap_or(title)
}

/// Drop tags and unescape the handful of entities extmetadata values carry.
/// Attribution strings are frequently wrapped in anchor/span markup.
pub fn strip_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut in_tag = false;
    for ch in input.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            c if !in_tag => out.push(c),
            _ => {}
        }
    }
    out.replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_HITS_WITH_CONTINUE: &str = r#"{
        "continue": { "gsroffset": 24, "continue": "gsroffset||" },
        "query": {
            "pages": {
                "999": {
                    "pageid": 999,
                    "ns": 6,
                    "title": "File:Second sunset.jpg",
                    "index": 2,
                    "imageinfo": [{
                        "url": "https://upload.example/full/second.jpg",
                        "thumburl": "https://upload.example/thumb/second.jpg",
                        "mime": "image/jpeg",
                        "size": 2048,
                        "timestamp": "2021-06-02T08:30:00Z"
                    }]
                },
                "111": {
                    "pageid": 111,
                    "ns": 6,
                    "title": "File:First sunset.jpg",
                    "index": 1,
                    "imageinfo": [{
                        "url": "https://upload.example/full/first.jpg",
                        "thumburl": "https://upload.example/thumb/first.jpg",
                        "mime": "image/jpeg",
                        "size": 1024,
                        "timestamp": "2021-06-01T08:30:00Z",
                        "extmetadata": {
                            "Artist": { "value": "<a href=\"https://example\">Jane &amp; Doe</a>" },
                            "LicenseShortName": { "value": "CC BY-SA 4.0" }
                        }
                    }]
                }
            }
        }
    }"#;

    #[test]
    fn parses_hits_in_rank_order_with_continuation() {
        let (hits, next) = parse_page(TWO_HITS_WITH_CONTINUE).unwrap();
        assert_eq!(next, Some(24));
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].title, "First sunset.jpg");
        assert_eq!(hits[1].title, "Second sunset.jpg");
        assert_eq!(hits[0].artist.as_deref(), Some("Jane & Doe"));
        assert_eq!(hits[0].license.as_deref(), Some("CC BY-SA 4.0"));
        assert_eq!(hits[0].thumb_url, "https://upload.example/thumb/first.jpg");
        assert_eq!(hits[0].size_bytes, Some(1024));
    }

    #[test]
    fn empty_result_set_is_ok_and_final() {
        let (hits, next) = parse_page(r#"{ "batchcomplete": "" }"#).unwrap();
        assert!(hits.is_empty());
        assert_eq!(next, None);
    }

    #[test]
    fn record_without_url_is_skipped() {
        let body = r#"{
            "query": { "pages": {
                "1": { "pageid": 1, "title": "File:Broken.jpg", "index": 1, "imageinfo": [{}] },
                "2": { "pageid": 2, "title": "File:Ok.jpg", "index": 2,
                       "imageinfo": [{ "url": "https://upload.example/ok.jpg" }] }
            } }
        }"#;
        let (hits, next) = parse_page(body).unwrap();
        assert_eq!(next, None);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "Ok.jpg");
        // thumburl falls back to the full URL when absent
        assert_eq!(hits[0].thumb_url, hits[0].url);
    }

    #[test]
    fn garbage_body_is_an_error() {
        assert!(parse_page("<html>rate limited</html>").is_err());
    }

    #[test]
    fn strips_markup_and_entities() {
        assert_eq!(
            strip_html("<a href=\"x\"><span>A &amp; B</span></a>"),
            "A & B"
        );
        assert_eq!(display_title("File:Cat.jpg"), "Cat.jpg");
        assert_eq!(display_title("Already plain"), "Already plain");
    }
}
