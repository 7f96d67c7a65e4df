use futures::StreamExt;
use reqwest::Client;
use satchel_common::errors::SatchelError;
use satchel_common::MAX_INLINE_FILE_CHARS;
use serde_json::{json, Value};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;
use uuid::Uuid;

const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_MODEL: &str = "gemini-1.5-flash";
// processing poll: 20 attempts x 500ms
const PROCESSING_POLL_LIMIT: u32 = 20;
const PROCESSING_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Proxy to the generative language API. Questions go out as streaming
/// generation requests; attached files are staged through the provider's
/// file store first.
pub struct ChatbotClient {
    http: Client,
    api_base: String,
    api_key: String,
    model: String,
}

impl ChatbotClient {
    pub fn from_env() -> Self {
        Self {
            http: Client::new(),
            api_base: env::var("CHATBOT_API_BASE")
                .unwrap_or_else(|_| String::from(DEFAULT_API_BASE)),
            api_key: env::var("CHATBOT_API_KEY").unwrap_or_default(),
            model: env::var("CHATBOT_MODEL").unwrap_or_else(|_| String::from(DEFAULT_MODEL)),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Text-only question, no file context.
    pub async fn ask(&self, question: &str) -> Result<String, SatchelError> {
        self.generate(vec![json!({ "text": question })]).await
    }

    /**
     * Question grounded in a remote file. The file is downloaded to a temp
     * path, pushed to the provider file store, and referenced from the
     * generation request. If staging or generation fails, the raw file text
     * is inlined into the prompt instead. The temp file is removed before
     * returning, whichever branch ran.
     *
     * @param question - the student's question
     * @param file_url - public url of the attachment to ground on
     */
    pub async fn ask_about_file(
        &self,
        question: &str,
        file_url: &str,
    ) -> Result<String, SatchelError> {
        let (path, mime) = self.download(file_url).await?;
        let staged = match self.upload(&path, &mime).await {
            Ok(file_uri) => {
                self.generate(vec![
                    json!({ "file_data": { "mime_type": mime, "file_uri": file_uri } }),
                    json!({ "text": question }),
                ])
                .await
            }
            Err(e) => Err(e),
        };
        let answer = match staged {
            Ok(answer) => Ok(answer),
            Err(e) => {
                tracing::warn!("file grounding failed, inlining file text instead: {}", e);
                self.ask_with_inline_text(question, &path).await
            }
        };
        if let Err(e) = tokio::fs::remove_file(&path).await {
            tracing::warn!("could not remove temp file {}: {}", path.display(), e);
        }
        answer
    }

    // fallback path: decode the downloaded bytes as utf-8 (lossily) and ship
    // a bounded slice of them inline
    async fn ask_with_inline_text(
        &self,
        question: &str,
        path: &Path,
    ) -> Result<String, SatchelError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| SatchelError::ChatbotError(format!("temp file reread failed: {}", e)))?;
        let text = truncate_chars(&String::from_utf8_lossy(&bytes), MAX_INLINE_FILE_CHARS);
        let prompt = format!(
            "Here is the content of the file the student attached:\n\n{}\n\nQuestion: {}",
            text, question
        );
        self.generate(vec![json!({ "text": prompt })]).await
    }

    /**
     * Fetch the attachment into a uniquely named temp file
     *
     * @return (temp path, mime type) where the mime comes from the
     *         Content-Type header when usable, else from the url extension
     */
    async fn download(&self, file_url: &str) -> Result<(PathBuf, String), SatchelError> {
        let response = self
            .http
            .get(file_url)
            .send()
            .await
            .map_err(chatbot_err)?;
        if !response.status().is_success() {
            return Err(SatchelError::ChatbotError(format!(
                "file download returned {}",
                response.status()
            )));
        }
        let header_mime = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.split(';').next().unwrap_or(value).trim().to_string())
            .filter(|value| !value.is_empty() && value != "application/octet-stream");
        let mime = header_mime.unwrap_or_else(|| String::from(guess_mime(file_url)));
        let bytes = response.bytes().await.map_err(chatbot_err)?;
        let path = env::temp_dir().join(format!("satchel-upload-{}", Uuid::new_v4()));
        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|e| SatchelError::ChatbotError(format!("temp file write failed: {}", e)))?;
        Ok((path, mime))
    }

    /**
     * Push a local file into the provider file store using the resumable
     * upload protocol, then wait out the PROCESSING state
     *
     * @return the file uri to reference from generation requests
     */
    async fn upload(&self, path: &Path, mime: &str) -> Result<String, SatchelError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| SatchelError::ChatbotError(format!("temp file read failed: {}", e)))?;
        let display_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("attachment");
        let start_url = format!("{}/upload/v1beta/files?key={}", self.api_base, self.api_key);
        let start = self
            .http
            .post(&start_url)
            .header("X-Goog-Upload-Protocol", "resumable")
            .header("X-Goog-Upload-Command", "start")
            .header("X-Goog-Upload-Header-Content-Length", bytes.len().to_string())
            .header("X-Goog-Upload-Header-Content-Type", mime)
            .json(&json!({ "file": { "display_name": display_name } }))
            .send()
            .await
            .map_err(chatbot_err)?;
        if !start.status().is_success() {
            return Err(SatchelError::ChatbotError(format!(
                "file store rejected upload start: {}",
                start.status()
            )));
        }
        let upload_url = start
            .headers()
            .get("x-goog-upload-url")
            .and_then(|value| value.to_str().ok())
            .map(String::from)
            .ok_or_else(|| {
                SatchelError::ChatbotError(String::from("file store sent no upload url"))
            })?;
        let finalize = self
            .http
            .post(&upload_url)
            .header("X-Goog-Upload-Command", "upload, finalize")
            .header("X-Goog-Upload-Offset", "0")
            .body(bytes)
            .send()
            .await
            .map_err(chatbot_err)?;
        if !finalize.status().is_success() {
            return Err(SatchelError::ChatbotError(format!(
                "file store rejected upload: {}",
                finalize.status()
            )));
        }
        let info: Value = finalize.json().await.map_err(chatbot_err)?;
        let uri = info["file"]["uri"]
            .as_str()
            .map(String::from)
            .ok_or_else(|| {
                SatchelError::ChatbotError(String::from("file store response had no uri"))
            })?;
        let mut state = info["file"]["state"].as_str().unwrap_or("ACTIVE").to_string();
        // pdfs and documents process asynchronously before they are usable
        if let Some(name) = info["file"]["name"].as_str() {
            let poll_url = format!("{}/v1beta/{}?key={}", self.api_base, name, self.api_key);
            let mut attempts = 0;
            while state == "PROCESSING" && attempts < PROCESSING_POLL_LIMIT {
                tokio::time::sleep(PROCESSING_POLL_INTERVAL).await;
                let file: Value = self
                    .http
                    .get(&poll_url)
                    .send()
                    .await
                    .map_err(chatbot_err)?
                    .json()
                    .await
                    .map_err(chatbot_err)?;
                state = file["state"].as_str().unwrap_or("ACTIVE").to_string();
                attempts += 1;
            }
        }
        if state == "FAILED" {
            return Err(SatchelError::ChatbotError(String::from(
                "file store failed to process the file",
            )));
        }
        if state == "PROCESSING" {
            return Err(SatchelError::ChatbotError(String::from(
                "file store processing timed out",
            )));
        }
        Ok(uri)
    }

    /**
     * Streaming generation over SSE. Chunks arrive split at arbitrary byte
     * boundaries, so lines are reassembled before parsing; the text parts of
     * every event are concatenated into the final answer.
     */
    async fn generate(&self, parts: Vec<Value>) -> Result<String, SatchelError> {
        let url = format!(
            "{}/v1beta/models/{}:streamGenerateContent?alt=sse&key={}",
            self.api_base, self.model, self.api_key
        );
        let body = json!({ "contents": [{ "role": "user", "parts": parts }] });
        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(chatbot_err)?;
        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(SatchelError::ChatbotError(format!(
                "generation returned {}: {}",
                status,
                truncate_chars(&detail, 300)
            )));
        }
        let mut stream = response.bytes_stream();
        let mut pending = String::new();
        let mut answer = String::new();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(chatbot_err)?;
            feed_sse_chunk(&mut pending, &String::from_utf8_lossy(&chunk), &mut answer);
        }
        flush_sse_tail(&mut pending, &mut answer);
        if answer.is_empty() {
            return Err(SatchelError::ChatbotError(String::from(
                "generation stream contained no text",
            )));
        }
        Ok(answer)
    }
}

fn chatbot_err(e: reqwest::Error) -> SatchelError {
    SatchelError::ChatbotError(e.to_string())
}

// splits complete lines out of the reassembly buffer; partial trailing lines
// stay buffered until the next chunk (or the tail flush) terminates them
fn feed_sse_chunk(pending: &mut String, chunk: &str, answer: &mut String) {
    pending.push_str(chunk);
    while let Some(newline) = pending.find('\n') {
        let line = pending[..newline].trim_end_matches('\r').to_string();
        pending.drain(..=newline);
        consume_sse_line(&line, answer);
    }
}

fn flush_sse_tail(pending: &mut String, answer: &mut String) {
    if !pending.is_empty() {
        let line = std::mem::take(pending);
        consume_sse_line(line.trim_end_matches('\r'), answer);
    }
}

fn consume_sse_line(line: &str, answer: &mut String) {
    let data = match line.strip_prefix("data:") {
        Some(data) => data.trim(),
        None => return, // comments, event names, blank keep-alives
    };
    if data.is_empty() || data == "[DONE]" {
        return;
    }
    if let Ok(event) = serde_json::from_str::<Value>(data) {
        if let Some(parts) = event["candidates"][0]["content"]["parts"].as_array() {
            for part in parts {
                if let Some(text) = part["text"].as_str() {
                    answer.push_str(text);
                }
            }
        }
    }
}

/// Truncate to at most `max` characters, always on a char boundary.
fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((index, _)) => String::from(&text[..index]),
        None => String::from(text),
    }
}

/// Extension-based mime fallback for when the file host sends a useless
/// Content-Type.
fn guess_mime(file_url: &str) -> &'static str {
    let name = file_url
        .split(|c| c == '?' || c == '#')
        .next()
        .unwrap_or(file_url);
    let extension = name.rsplit('.').next().unwrap_or("").to_ascii_lowercase();
    match extension.as_str() {
        "pdf" => "application/pdf",
        "txt" => "text/plain",
        "md" => "text/markdown",
        "csv" => "text/csv",
        "html" | "htm" => "text/html",
        "json" => "application/json",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "ppt" => "application/vnd.ms-powerpoint",
        "pptx" => "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guess_mime_from_extension() {
        assert_eq!(guess_mime("https://x.com/syllabus.pdf"), "application/pdf");
        assert_eq!(guess_mime("https://x.com/notes.TXT"), "text/plain");
        assert_eq!(
            guess_mime("https://x.com/slides.pptx?token=abc#page=2"),
            "application/vnd.openxmlformats-officedocument.presentationml.presentation"
        );
        assert_eq!(guess_mime("https://x.com/photo.jpeg"), "image/jpeg");
        assert_eq!(guess_mime("https://x.com/blob"), "application/octet-stream");
        assert_eq!(guess_mime("https://x.com/archive.zip"), "application/octet-stream");
    }

    #[test]
    fn test_truncate_chars_respects_boundaries() {
        assert_eq!(truncate_chars("hello", 10), "hello");
        assert_eq!(truncate_chars("hello", 3), "hel");
        // 'é' is two bytes; a byte-based cut here would panic
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("", 5), "");
    }

    #[test]
    fn test_sse_lines_parse_text_parts() {
        let mut answer = String::new();
        consume_sse_line(
            r#"data: {"candidates":[{"content":{"parts":[{"text":"Hello "}]}}]}"#,
            &mut answer,
        );
        consume_sse_line(
            r#"data: {"candidates":[{"content":{"parts":[{"text":"world"}]}}]}"#,
            &mut answer,
        );
        assert_eq!(answer, "Hello world");
    }

    #[test]
    fn test_sse_ignores_non_data_lines() {
        let mut answer = String::new();
        consume_sse_line(": keep-alive", &mut answer);
        consume_sse_line("event: done", &mut answer);
        consume_sse_line("data: [DONE]", &mut answer);
        consume_sse_line("data:", &mut answer);
        consume_sse_line("data: not json at all", &mut answer);
        assert!(answer.is_empty());
    }

    #[test]
    fn test_sse_reassembles_split_chunks() {
        // one event arrives split across three network chunks
        let mut pending = String::new();
        let mut answer = String::new();
        feed_sse_chunk(
            &mut pending,
            "data: {\"candidates\":[{\"content\":{\"par",
            &mut answer,
        );
        assert!(answer.is_empty());
        feed_sse_chunk(
            &mut pending,
            "ts\":[{\"text\":\"Integrals\"}]}}]}\r\ndata: {\"candidates\":[{\"content\"",
            &mut answer,
        );
        assert_eq!(answer, "Integrals");
        feed_sse_chunk(
            &mut pending,
            ":{\"parts\":[{\"text\":\" rule\"}]}}]}\n",
            &mut answer,
        );
        assert_eq!(answer, "Integrals rule");
        assert!(pending.is_empty());
    }

    #[test]
    fn test_sse_tail_without_newline_still_counts() {
        let mut pending = String::new();
        let mut answer = String::new();
        feed_sse_chunk(
            &mut pending,
            "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"final\"}]}}]}",
            &mut answer,
        );
        assert!(answer.is_empty());
        flush_sse_tail(&mut pending, &mut answer);
        assert_eq!(answer, "final");
        assert!(pending.is_empty());
    }

    #[test]
    fn test_events_without_text_are_skipped() {
        let mut answer = String::new();
        consume_sse_line(
            r#"data: {"candidates":[{"finishReason":"STOP"}]}"#,
            &mut answer,
        );
        consume_sse_line(r#"data: {"usageMetadata":{"totalTokenCount":42}}"#, &mut answer);
        assert!(answer.is_empty());
    }
}
