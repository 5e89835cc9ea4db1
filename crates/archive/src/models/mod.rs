//! Domain models for exported mail

mod message;
mod thread;

pub use message::{Attachment, AttachmentContent, EmailAddress, Message, MessageBuilder, MessageId};
pub use thread::{Thread, ThreadId};
