//! Mail source trait definition

use anyhow::{Result, bail};

use crate::models::{Attachment, AttachmentContent, Message, Thread, ThreadId};

/// Trait for read access to a remote mail store
pub trait MailSource: Send + Sync {
    /// Search threads matching `query`, returning at most `page_size` IDs
    /// starting at `offset` in the store's result order
    fn search(&self, query: &str, offset: usize, page_size: usize) -> Result<Vec<ThreadId>>;

    /// Fetch a full thread snapshot, `None` if the store no longer has it
    fn get_thread(&self, id: &ThreadId) -> Result<Option<Thread>>;

    /// Resolve the bytes of an attachment
    ///
    /// The default implementation serves inline content and rejects remote
    /// references; stores that hand out references must override it.
    fn attachment_data(&self, message: &Message, attachment: &Attachment) -> Result<Vec<u8>> {
        match &attachment.content {
            AttachmentContent::Inline(data) => Ok(data.clone()),
            AttachmentContent::Remote { attachment_id } => bail!(
                "attachment {} of message {} is not available from this source",
                attachment_id,
                message.id.as_str()
            ),
        }
    }
}
