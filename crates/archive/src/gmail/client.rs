//! Gmail API HTTP client
//!
//! Searches threads, fetches full threads and downloads attachments.
//! Uses synchronous HTTP (ureq) like the rest of the exporter.

use anyhow::{Context, Result, anyhow};
use log::debug;
use std::collections::HashMap;
use std::sync::Mutex;

use super::GmailAuth;
use super::api::{AttachmentBody, GmailThread, ListThreadsResponse};
use super::normalize::{decode_base64_bytes, normalize_thread};
use crate::models::{Attachment, AttachmentContent, Message, MessageId, Thread, ThreadId};
use crate::source::MailSource;

/// Largest page the threads.list endpoint accepts
const MAX_PAGE_SIZE: usize = 500;

/// Where a page of results starts
#[derive(Debug, Clone, PartialEq, Eq)]
enum Cursor {
    /// Beginning of the result list
    Start,
    /// Page token returned by the previous page
    Token(String),
    /// Past the last result
    Exhausted,
}

/// Gmail API client
///
/// Gmail pages with opaque tokens rather than offsets. The client remembers
/// the token that starts each offset it has reached, so sequential paging
/// costs one request per page.
pub struct GmailClient {
    auth: GmailAuth,
    cursors: Mutex<HashMap<(String, usize), Cursor>>,
}

impl GmailClient {
    /// Gmail API base URL
    const BASE_URL: &'static str = "https://gmail.googleapis.com/gmail/v1";

    /// Create a new Gmail client
    pub fn new(auth: GmailAuth) -> Self {
        Self {
            auth,
            cursors: Mutex::new(HashMap::new()),
        }
    }

    /// List thread IDs matching a Gmail search query
    ///
    /// # Arguments
    /// * `query` - Gmail search syntax, e.g. `from:alice@example.com after:2024/01/01`
    /// * `max_results` - Maximum number of threads to return (1-500)
    /// * `page_token` - Optional page token for pagination
    pub fn list_threads(
        &self,
        query: &str,
        max_results: usize,
        page_token: Option<&str>,
    ) -> Result<ListThreadsResponse> {
        let access_token = self.auth.get_access_token()?;

        let mut url = format!(
            "{}/users/me/threads?q={}&maxResults={}",
            Self::BASE_URL,
            urlencoding::encode(query),
            max_results.clamp(1, MAX_PAGE_SIZE)
        );

        if let Some(token) = page_token {
            url.push_str(&format!("&pageToken={}", urlencoding::encode(token)));
        }

        let mut response = ureq::get(&url)
            .header("Authorization", &format!("Bearer {}", access_token))
            .call()
            .context("Failed to send list threads request")?;

        let list: ListThreadsResponse = response
            .body_mut()
            .read_json()
            .context("Failed to parse list threads response")?;

        Ok(list)
    }

    /// Get a full thread by ID, `None` if Gmail no longer has it
    pub fn fetch_thread(&self, id: &ThreadId) -> Result<Option<GmailThread>> {
        let access_token = self.auth.get_access_token()?;

        let url = format!(
            "{}/users/me/threads/{}?format=full",
            Self::BASE_URL,
            urlencoding::encode(id.as_str())
        );

        let response = ureq::get(&url)
            .header("Authorization", &format!("Bearer {}", access_token))
            .call();

        match response {
            Ok(mut resp) => {
                let thread: GmailThread = resp
                    .body_mut()
                    .read_json()
                    .context("Failed to parse thread response")?;
                Ok(Some(thread))
            }
            Err(ureq::Error::StatusCode(404)) => Ok(None),
            Err(e) => Err(anyhow!("Failed to fetch thread {}: {}", id, e)),
        }
    }

    /// Download the bytes of an attachment
    pub fn get_attachment(&self, message_id: &MessageId, attachment_id: &str) -> Result<Vec<u8>> {
        let access_token = self.auth.get_access_token()?;

        let url = format!(
            "{}/users/me/messages/{}/attachments/{}",
            Self::BASE_URL,
            urlencoding::encode(message_id.as_str()),
            urlencoding::encode(attachment_id)
        );

        let mut response = ureq::get(&url)
            .header("Authorization", &format!("Bearer {}", access_token))
            .call()
            .context("Failed to send get attachment request")?;

        let body: AttachmentBody = response
            .body_mut()
            .read_json()
            .context("Failed to parse attachment response")?;

        decode_base64_bytes(&body.data).context("Attachment data is not valid base64")
    }

    /// Check if the client is authenticated
    pub fn is_authenticated(&self) -> bool {
        self.auth.is_authenticated()
    }

    /// Trigger authentication flow
    pub fn authenticate(&self) -> Result<()> {
        self.auth.get_access_token()?;
        Ok(())
    }

    /// Forget stored tokens
    pub fn logout(&self) -> Result<()> {
        self.auth.logout()
    }

    fn cached_cursor(&self, query: &str, offset: usize) -> Option<Cursor> {
        if offset == 0 {
            return Some(Cursor::Start);
        }
        self.cursors
            .lock()
            .unwrap()
            .get(&(query.to_string(), offset))
            .cloned()
    }

    fn remember_cursor(&self, query: &str, offset: usize, cursor: Cursor) {
        self.cursors
            .lock()
            .unwrap()
            .insert((query.to_string(), offset), cursor);
    }

    /// Find the cursor for `offset`, walking forward from the start if needed
    fn cursor_for(&self, query: &str, offset: usize) -> Result<Cursor> {
        if let Some(cursor) = self.cached_cursor(query, offset) {
            return Ok(cursor);
        }

        debug!("No cursor cached for {:?} at {}, walking from start", query, offset);
        let mut position = 0;
        let mut cursor = Cursor::Start;
        while position < offset {
            let token = match &cursor {
                Cursor::Start => None,
                Cursor::Token(t) => Some(t.as_str()),
                Cursor::Exhausted => break,
            };
            let page = self.list_threads(query, (offset - position).min(MAX_PAGE_SIZE), token)?;
            let received = page.threads.map(|t| t.len()).unwrap_or(0);
            position += received;
            cursor = match page.next_page_token {
                Some(token) if received > 0 => Cursor::Token(token),
                _ => Cursor::Exhausted,
            };
            self.remember_cursor(query, position, cursor.clone());
        }

        if position != offset {
            // Gmail returned a different count than requested; treat as the end
            return Ok(Cursor::Exhausted);
        }
        Ok(cursor)
    }
}

impl MailSource for GmailClient {
    fn search(&self, query: &str, offset: usize, page_size: usize) -> Result<Vec<ThreadId>> {
        let mut ids = Vec::new();
        let mut position = offset;
        let mut cursor = self.cursor_for(query, offset)?;

        // Gmail may return short pages before the end; keep going until the
        // page is full or there is no next token.
        while ids.len() < page_size {
            let token = match &cursor {
                Cursor::Start => None,
                Cursor::Token(t) => Some(t.as_str()),
                Cursor::Exhausted => break,
            };
            let page = self.list_threads(query, page_size - ids.len(), token)?;
            let threads = page.threads.unwrap_or_default();
            let received = threads.len();
            position += received;
            ids.extend(threads.into_iter().map(|t| ThreadId::new(t.id)));

            cursor = match page.next_page_token {
                Some(token) if received > 0 => Cursor::Token(token),
                _ => Cursor::Exhausted,
            };
            self.remember_cursor(query, position, cursor.clone());
        }

        ids.truncate(page_size);
        Ok(ids)
    }

    fn get_thread(&self, id: &ThreadId) -> Result<Option<Thread>> {
        match self.fetch_thread(id)? {
            Some(thread) => normalize_thread(thread),
            None => Ok(None),
        }
    }

    fn attachment_data(&self, message: &Message, attachment: &Attachment) -> Result<Vec<u8>> {
        match &attachment.content {
            AttachmentContent::Inline(data) => Ok(data.clone()),
            AttachmentContent::Remote { attachment_id } => self
                .get_attachment(&message.id, attachment_id)
                .with_context(|| format!("Failed to download attachment {}", attachment.filename)),
        }
    }
}
