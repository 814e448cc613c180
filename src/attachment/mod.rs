//! Attaching retrieved content to the host composer
//!
//! This module replays the host's file paste interaction and flags the
//! composer as busy while a run is in progress.

pub mod indicator;
pub mod injector;

pub use indicator::BusyIndicator;
pub use injector::{
    build_paste_sequence, pad_content, AttachmentInjector, SyntheticAttachment, ATTACHMENT_MIME,
    ATTACHMENT_NAME, ATTACHMENT_SOURCE,
};
