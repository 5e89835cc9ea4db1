//! Deterministic archive naming
//!
//! A thread's archive name is derived from its first message only:
//!
//! ```text
//! [2024-03-01]_[Quarterly_numbers_for_the_board]_[Alice_Smith]_[bob@example.com]__TID_b1d2e3f4.pdf
//! ```
//!
//! Every component tolerates missing or malformed header text, and the
//! final name always passes through [`sanitize_filename`], so naming never
//! fails and never produces a path-unsafe name.

use crate::models::{EmailAddress, Message, Thread};

/// Placeholder used when the first message has no subject
pub const NO_SUBJECT: &str = "No Subject";

/// Placeholder used when a sender or recipient cannot be determined
pub const UNKNOWN_PARTY: &str = "Unknown";

/// Smallest usable file name cap: room for the thread suffix plus a short stem
pub const MIN_FILENAME_LEN: usize = 32;

/// Upper bound on a generated name in UTF-8 bytes
///
/// Common file systems cap a name at 255 bytes; the destination also wraps
/// names as `.{name}.tmp` while writing.
pub const MAX_NAME_BYTES: usize = 240;

const ILLEGAL_CHARS: [char; 9] = ['/', '\\', ':', '*', '?', '"', '<', '>', '|'];
const EMPTY_NAME: &str = "untitled";

/// Settings for name generation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamingOptions {
    /// Maximum file name length in characters
    pub max_len: usize,
    /// Number of subject words kept in the name
    pub subject_words: usize,
    /// Number of trailing thread ID characters kept in the name
    pub id_suffix_len: usize,
    /// Extension of the archive document
    pub extension: &'static str,
}

impl Default for NamingOptions {
    fn default() -> Self {
        Self {
            max_len: 180,
            subject_words: 5,
            id_suffix_len: 8,
            extension: "pdf",
        }
    }
}

/// The names derived for one thread
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveName {
    /// Sanitized `[date]_[subject]_[from]_[to]` part, shared with attachments
    pub stem: String,
    /// Full archive document name: stem, thread suffix and extension
    pub file_name: String,
}

/// Derive the archive name for a thread
pub fn name_for(thread: &Thread, options: &NamingOptions) -> ArchiveName {
    let first = thread.first();
    let base = base_name(first, options.subject_words);

    let tail = sanitize_filename(
        &format!(
            "__TID_{}.{}",
            thread.id().short(options.id_suffix_len),
            options.extension
        ),
        usize::MAX,
    );
    let tail_len = tail.chars().count();
    let tail_bytes = tail.len();

    if tail_len >= options.max_len || tail_bytes >= MAX_NAME_BYTES {
        // Thread IDs are expected to be short; degrade to plain truncation.
        let file_name = sanitize_filename(&format!("{base}{tail}"), options.max_len);
        return ArchiveName {
            stem: sanitize_filename(&base, options.max_len),
            file_name,
        };
    }

    let stem = sanitize_bounded(&base, options.max_len - tail_len, MAX_NAME_BYTES - tail_bytes);
    let file_name = format!("{stem}{tail}");
    ArchiveName { stem, file_name }
}

/// Unsanitized `[date]_[subject]_[from]_[to]` for a message
fn base_name(message: &Message, subject_words: usize) -> String {
    let date = message.received_at.format("%Y-%m-%d");
    let subject = if message.subject.trim().is_empty() {
        NO_SUBJECT
    } else {
        message.subject.as_str()
    };
    let subject = first_words(subject, subject_words);
    let from = primary_party(&message.from);
    let to = primary_party(&message.to);

    format!("[{date}]_[{subject}]_[{from}]_[{to}]")
}

/// Name of an attachment copied alongside a thread archive
pub fn attachment_name(
    stem: &str,
    message: &Message,
    index: usize,
    filename: &str,
    max_len: usize,
) -> String {
    let filename = if filename.trim().is_empty() {
        "attachment"
    } else {
        filename
    };
    sanitize_filename(
        &format!(
            "{stem}__msg_{}__att_{}__{filename}",
            short_hash(message.stable_id()),
            index + 1
        ),
        max_len,
    )
}

/// Join the first `n` whitespace-separated words with underscores
pub fn first_words(text: &str, n: usize) -> String {
    text.split_whitespace().take(n).collect::<Vec<_>>().join("_")
}

/// Pick a short human label for the first party in an address header
///
/// Takes the first comma-separated entry (commas inside quotes don't split),
/// then prefers the display name of a `"Name" <addr>` form, then the
/// address, then the raw text. Never returns an empty string.
pub fn primary_party(raw: &str) -> String {
    let first = first_address(raw).trim();
    if first.is_empty() {
        return UNKNOWN_PARTY.to_string();
    }

    let parsed = EmailAddress::parse(first);
    let chosen = parsed
        .name
        .filter(|name| !name.trim().is_empty())
        .unwrap_or(parsed.email);
    let chosen = chosen.trim();

    if chosen.is_empty() {
        UNKNOWN_PARTY.to_string()
    } else {
        chosen.to_string()
    }
}

/// The first entry of a comma-separated address list
fn first_address(raw: &str) -> &str {
    let mut in_quotes = false;
    for (i, c) in raw.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => return &raw[..i],
            _ => {}
        }
    }
    raw
}

/// Make an arbitrary string safe to use as a file name
///
/// Control characters are removed, path-unsafe characters become `_`,
/// whitespace runs collapse to a single `_`, and the result is cut to
/// `max_len` characters and [`MAX_NAME_BYTES`] bytes. The result is never
/// empty and never `.`/`..`.
pub fn sanitize_filename(s: &str, max_len: usize) -> String {
    sanitize_bounded(s, max_len, MAX_NAME_BYTES)
}

/// [`sanitize_filename`] with an explicit UTF-8 byte budget
///
/// Truncation always lands on a character boundary.
fn sanitize_bounded(s: &str, max_len: usize, max_bytes: usize) -> String {
    let max_len = max_len.max(1);
    let max_bytes = max_bytes.max(1);
    let mut out = String::with_capacity(s.len().min(max_bytes));
    let mut count = 0;
    let mut in_whitespace = false;

    for c in s.chars().filter(|c| !c.is_control()) {
        if count >= max_len {
            break;
        }
        let mapped = if c.is_whitespace() {
            if in_whitespace {
                continue;
            }
            in_whitespace = true;
            '_'
        } else {
            in_whitespace = false;
            if ILLEGAL_CHARS.contains(&c) { '_' } else { c }
        };
        if out.len() + mapped.len_utf8() > max_bytes {
            break;
        }
        out.push(mapped);
        count += 1;
    }

    if out.is_empty() {
        return EMPTY_NAME.chars().take(max_len.min(max_bytes)).collect();
    }
    if out.chars().all(|c| c == '.') {
        return "_".repeat(out.chars().count());
    }
    out
}

/// Short deterministic hash used to tell attachments of different messages apart
///
/// 32-bit polynomial rolling hash (×31) over UTF-16 code units, lowercase hex.
pub fn short_hash(s: &str) -> String {
    let hash = s
        .encode_utf16()
        .fold(0u32, |h, unit| h.wrapping_mul(31).wrapping_add(unit as u32));
    format!("{:x}", hash)
}
