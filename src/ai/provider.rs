use anyhow::Result;
use base64::Engine as _;
use futures_util::StreamExt;

/// Hosted generation backend. Gemini is the default; the rest speak the
/// OpenAI Chat Completions shape.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub provider: String, // gemini|openai|grok|groq|openrouter|custom
    pub api_key: Option<String>,
    pub base_url: Option<String>, // for custom; for others we choose defaults
    pub model: String,
}

/// Base64 image payload attached to generation requests. Computed once per
/// viewer selection and reused by every call against that selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub mime: String,
    pub data_b64: String,
}

impl EncodedImage {
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime, self.data_b64)
    }
}

/// Sniff the mime type and base64-encode raw image bytes.
pub fn encode_image_bytes(bytes: &[u8]) -> EncodedImage {
    let mime = infer::get(bytes)
        .map(|t| t.mime_type())
        .unwrap_or("image/jpeg")
        .to_string();
    EncodedImage {
        mime,
        data_b64: base64::engine::general_purpose::STANDARD.encode(bytes),
    }
}

fn default_base_and_header(provider: &str) -> (String, String) {
    match provider {
        "openai" => ("https://api.openai.com/v1".into(), "Authorization".into()),
        "grok" => ("https://api.x.ai/v1".into(), "Authorization".into()),
        "gemini" => (
            "https://generativelanguage.googleapis.com/v1beta".into(),
            "x-goog-api-key".into(),
        ),
        "groq" => ("https://api.groq.com/openai/v1".into(), "Authorization".into()),
        "openrouter" => ("https://openrouter.ai/api/v1".into(), "Authorization".into()),
        _ => ("http://localhost:11434/v1".into(), "Authorization".into()),
    }
}

/// Streamed generation: fragments are handed to `on_token` in arrival order
/// and the full accumulated text is returned at the end.
pub async fn stream_generation(
    cfg: ProviderConfig,
    prompt: &str,
    image: Option<&EncodedImage>,
    on_token: impl FnMut(&str),
) -> Result<String> {
    if cfg.provider == "gemini" {
        return stream_gemini(cfg, prompt, image, on_token).await;
    }
    stream_openai_compatible(cfg, prompt, image, on_token).await
}

/// One-shot generation: the complete reply in a single response body.
pub async fn generate_once(
    cfg: ProviderConfig,
    prompt: &str,
    image: Option<&EncodedImage>,
) -> Result<String> {
    if cfg.provider == "gemini" {
        return gemini_once(cfg, prompt, image).await;
    }
    openai_once(cfg, prompt, image).await
}

fn openai_messages(prompt: &str, image: Option<&EncodedImage>) -> serde_json::Value {
    match image {
        Some(img) => serde_json::json!([
            {"role": "user", "content": [
                {"type": "text", "text": prompt},
                {"type": "image_url", "image_url": {"url": img.data_url()}}
            ]}
        ]),
        None => serde_json::json!([{"role": "user", "content": prompt}]),
    }
}

fn openai_request(
    cfg: &ProviderConfig,
    prompt: &str,
    image: Option<&EncodedImage>,
    stream: bool,
) -> Result<reqwest::RequestBuilder> {
    let (default_base, auth_header) = default_base_and_header(&cfg.provider);
    let base = cfg.base_url.clone().unwrap_or(default_base);
    let url = format!("{}/chat/completions", base.trim_end_matches('/'));
    let client = reqwest::Client::builder().build()?;
    let mut req = client.post(&url);
    if let Some(key) = cfg.api_key.as_deref() {
        if auth_header.eq_ignore_ascii_case("authorization") {
            req = req.header("Authorization", format!("Bearer {}", key));
        } else {
            req = req.header(auth_header, key);
        }
    }
    let body = serde_json::json!({
        "model": cfg.model,
        "stream": stream,
        "messages": openai_messages(prompt, image),
        "temperature": 0.7
    });
    Ok(req.json(&body))
}

/// Text fragment carried by one OpenAI-style SSE payload, streaming delta or
/// full message object, whichever the server sent.
fn openai_fragment(v: &serde_json::Value) -> Option<&str> {
    v.pointer("/choices/0/delta/content")
        .and_then(|x| x.as_str())
        .or_else(|| v.pointer("/choices/0/message/content").and_then(|x| x.as_str()))
}

async fn stream_openai_compatible(
    cfg: ProviderConfig,
    prompt: &str,
    image: Option<&EncodedImage>,
    mut on_token: impl FnMut(&str),
) -> Result<String> {
    let resp = openai_request(&cfg, prompt, image, true)?.send().await?;
    let status = resp.status();
    if !status.is_success() {
        let text = resp.text().await.unwrap_or_default();
        anyhow::bail!("provider error {}: {}", status, text);
    }
    let mut stream = resp.bytes_stream();
    let mut acc = String::new();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        let s = String::from_utf8_lossy(&chunk);
        for line in s.split('\n') {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            // Expect SSE "data: {...}" lines; some servers send bare JSON.
            if let Some(stripped) = line.strip_prefix("data: ").or_else(|| line.strip_prefix("Data: ")) {
                if stripped == "[DONE]" {
                    return Ok(acc);
                }
                if let Ok(v) = serde_json::from_str::<serde_json::Value>(stripped) {
                    if let Some(tok) = openai_fragment(&v) {
                        on_token(tok);
                        acc.push_str(tok);
                    }
                }
            } else if let Ok(v) = serde_json::from_str::<serde_json::Value>(line) {
                if let Some(tok) = openai_fragment(&v) {
                    on_token(tok);
                    acc.push_str(tok);
                }
            }
        }
    }
    Ok(acc)
}

async fn openai_once(
    cfg: ProviderConfig,
    prompt: &str,
    image: Option<&EncodedImage>,
) -> Result<String> {
    let resp = openai_request(&cfg, prompt, image, false)?.send().await?;
    let status = resp.status();
    if !status.is_success() {
        let text = resp.text().await.unwrap_or_default();
        anyhow::bail!("provider error {}: {}", status, text);
    }
    let v: serde_json::Value = resp.json().await?;
    match openai_fragment(&v) {
        Some(text) => Ok(text.to_string()),
        None => anyhow::bail!("provider returned no content"),
    }
}

fn gemini_contents(prompt: &str, image: Option<&EncodedImage>) -> serde_json::Value {
    match image {
        Some(img) => serde_json::json!([{
            "role": "user",
            "parts": [
                {"text": prompt},
                {"inline_data": {"mime_type": img.mime, "data": img.data_b64}}
            ]
        }]),
        None => serde_json::json!([{"role": "user", "parts": [{"text": prompt}]}]),
    }
}

fn gemini_url(cfg: &ProviderConfig, method: &str) -> String {
    let base = cfg
        .base_url
        .clone()
        .unwrap_or_else(|| "https://generativelanguage.googleapis.com/v1beta".into());
    format!(
        "{}/models/{}:{}?key={}",
        base.trim_end_matches('/'),
        cfg.model,
        method,
        cfg.api_key.clone().unwrap_or_default()
    )
}

/// Text fragments inside one Gemini payload (candidates[0].content.parts[].text).
fn gemini_fragments(v: &serde_json::Value) -> Vec<&str> {
    v.pointer("/candidates/0/content/parts")
        .and_then(|x| x.as_array())
        .map(|parts| {
            parts
                .iter()
                .filter_map(|p| p.get("text").and_then(|x| x.as_str()))
                .collect()
        })
        .unwrap_or_default()
}

async fn stream_gemini(
    cfg: ProviderConfig,
    prompt: &str,
    image: Option<&EncodedImage>,
    mut on_token: impl FnMut(&str),
) -> Result<String> {
    // POST /models/{model}:streamGenerateContent?alt=sse&key=API_KEY
    let url = format!("{}&alt=sse", gemini_url(&cfg, "streamGenerateContent"));
    let client = reqwest::Client::builder().build()?;
    let body = serde_json::json!({"contents": gemini_contents(prompt, image)});
    let resp = client.post(&url).json(&body).send().await?;
    let status = resp.status();
    if !status.is_success() {
        let text = resp.text().await.unwrap_or_default();
        anyhow::bail!("gemini error {}: {}", status, text);
    }
    let mut stream = resp.bytes_stream();
    let mut acc = String::new();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        let s = String::from_utf8_lossy(&chunk);
        for line in s.split('\n') {
            let line = line.trim();
            if !line.starts_with("data:") {
                continue;
            }
            let json = line.trim_start_matches("data:").trim();
            if json.is_empty() || json == "[DONE]" {
                continue;
            }
            if let Ok(v) = serde_json::from_str::<serde_json::Value>(json) {
                for t in gemini_fragments(&v) {
                    on_token(t);
                    acc.push_str(t);
                }
            }
        }
    }
    Ok(acc)
}

async fn gemini_once(
    cfg: ProviderConfig,
    prompt: &str,
    image: Option<&EncodedImage>,
) -> Result<String> {
    let url = gemini_url(&cfg, "generateContent");
    let client = reqwest::Client::builder().build()?;
    let body = serde_json::json!({"contents": gemini_contents(prompt, image)});
    let resp = client.post(&url).json(&body).send().await?;
    let status = resp.status();
    if !status.is_success() {
        let text = resp.text().await.unwrap_or_default();
        anyhow::bail!("gemini error {}: {}", status, text);
    }
    let v: serde_json::Value = resp.json().await?;
    let text: String = gemini_fragments(&v).concat();
    if text.is_empty() {
        anyhow::bail!("gemini returned no content");
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_bytes_with_sniffed_mime() {
        // Minimal PNG magic; infer only needs the header.
        let png = [0x89u8, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];
        let enc = encode_image_bytes(&png);
        assert_eq!(enc.mime, "image/png");
        assert!(enc.data_url().starts_with("data:image/png;base64,"));
    }

    #[test]
    fn unknown_bytes_fall_back_to_jpeg() {
        let enc = encode_image_bytes(&[0u8, 1, 2, 3]);
        assert_eq!(enc.mime, "image/jpeg");
    }

    #[test]
    fn openai_fragment_handles_delta_and_full_message() {
        let delta: serde_json::Value =
            serde_json::from_str(r#"{"choices":[{"delta":{"content":"Hel"}}]}"#).unwrap();
        assert_eq!(openai_fragment(&delta), Some("Hel"));
        let full: serde_json::Value =
            serde_json::from_str(r#"{"choices":[{"message":{"content":"Hello"}}]}"#).unwrap();
        assert_eq!(openai_fragment(&full), Some("Hello"));
        let other: serde_json::Value = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert_eq!(openai_fragment(&other), None);
    }

    #[test]
    fn gemini_fragments_collects_all_parts() {
        let v: serde_json::Value = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"Once"},{"text":"upon"}]}}]}"#,
        )
        .unwrap();
        assert_eq!(gemini_fragments(&v), vec!["Once", "upon"]);
        let none: serde_json::Value = serde_json::from_str(r#"{"candidates":[]}"#).unwrap();
        assert!(gemini_fragments(&none).is_empty());
    }

    #[test]
    fn gemini_default_endpoint_and_key() {
        let cfg = ProviderConfig {
            provider: "gemini".into(),
            api_key: Some("k123".into()),
            base_url: None,
            model: "gemini-2.0-flash".into(),
        };
        assert_eq!(
            gemini_url(&cfg, "generateContent"),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent?key=k123"
        );
    }
}
