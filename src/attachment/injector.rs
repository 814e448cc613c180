//! Synthetic file paste
//!
//! The host only renders pasted text as a file attachment when the paste
//! looks like a real one: a focused composer, a `beforeinput`, a `paste`
//! carrying a data transfer with a file in it, then `input` and `change`.
//! This module builds that sequence and hands it to the host in one go.

use crate::error::InjectionError;
use crate::host::{
    ElementToken, HostPage, SyntheticEvent, TransferFile, TransferItem, TransferPayload,
};
use serde::Serialize;
use std::borrow::Cow;
use std::sync::Arc;
use tracing::{error, instrument, warn};

/// File name shown for injected attachments
pub const ATTACHMENT_NAME: &str = "reader-content.txt";

/// MIME type of injected attachments
pub const ATTACHMENT_MIME: &str = "text/plain";

/// Source tag recorded in the descriptor
pub const ATTACHMENT_SOURCE: &str = "reader-service";

/// Descriptor carried next to the text in the synthetic transfer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyntheticAttachment {
    /// File name
    pub name: String,
    /// MIME type
    #[serde(rename = "type")]
    pub mime_type: String,
    /// Always true
    pub is_attachment: bool,
    /// Length of the unpadded content, in characters
    pub size: usize,
    /// Creation time, epoch milliseconds
    pub timestamp: i64,
    /// Source tag
    pub source: String,
}

impl SyntheticAttachment {
    /// Descriptor for `content` created at `timestamp`
    pub fn for_content(content: &str, timestamp: i64) -> Self {
        Self {
            name: ATTACHMENT_NAME.to_string(),
            mime_type: ATTACHMENT_MIME.to_string(),
            is_attachment: true,
            size: content.chars().count(),
            timestamp,
            source: ATTACHMENT_SOURCE.to_string(),
        }
    }
}

/// Pad with trailing spaces up to `min_len` characters
pub fn pad_content(content: &str, min_len: usize) -> Cow<'_, str> {
    let len = content.chars().count();
    if len >= min_len {
        return Cow::Borrowed(content);
    }
    let mut padded = String::with_capacity(content.len() + (min_len - len));
    padded.push_str(content);
    padded.extend(std::iter::repeat(' ').take(min_len - len));
    Cow::Owned(padded)
}

/// Build the ordered paste sequence for `content`
pub fn build_paste_sequence(
    content: &str,
    min_len: usize,
    timestamp: i64,
) -> Result<Vec<SyntheticEvent>, InjectionError> {
    let padded = pad_content(content, min_len);
    let descriptor = SyntheticAttachment::for_content(content, timestamp);
    let descriptor_json = serde_json::to_string(&descriptor)
        .map_err(|e| InjectionError::Descriptor(e.to_string()))?;

    let transfer = TransferPayload {
        items: vec![
            TransferItem {
                mime: ATTACHMENT_MIME.to_string(),
                data: padded.into_owned(),
            },
            TransferItem {
                mime: "application/json".to_string(),
                data: descriptor_json,
            },
        ],
        file: Some(TransferFile {
            name: descriptor.name,
            mime: descriptor.mime_type,
            content: content.to_string(),
        }),
    };

    Ok(vec![
        SyntheticEvent::Focus,
        SyntheticEvent::BeforeInput {
            data: content.to_string(),
        },
        SyntheticEvent::Paste { transfer },
        SyntheticEvent::Input {
            data: content.to_string(),
        },
        SyntheticEvent::Change,
    ])
}

/// Replays a file paste into the host composer
#[derive(Clone)]
pub struct AttachmentInjector {
    host: Arc<dyn HostPage>,
    min_len: usize,
}

impl AttachmentInjector {
    /// Create an injector padding to `min_len` characters
    pub fn new(host: Arc<dyn HostPage>, min_len: usize) -> Self {
        Self { host, min_len }
    }

    /// Attach `content` to `element`.
    ///
    /// True means the sequence was dispatched, not that the host accepted it.
    #[instrument(skip(self, content), fields(len = content.len()))]
    pub async fn inject(&self, element: Option<ElementToken>, content: &str) -> bool {
        match self.try_inject(element, content).await {
            Ok(()) => true,
            Err(e) => {
                error!("Failed to simulate attachment: {}", e);
                false
            }
        }
    }

    async fn try_inject(
        &self,
        element: Option<ElementToken>,
        content: &str,
    ) -> Result<(), InjectionError> {
        let element = match element {
            Some(el) if !content.is_empty() => el,
            _ => return Err(InjectionError::EmptyContent),
        };

        let timestamp = chrono::Utc::now().timestamp_millis();
        let events = build_paste_sequence(content, self.min_len, timestamp)?;

        self.host.focus(element).await?;
        let results = self.host.dispatch_sequence(element, &events).await?;

        for (event, dispatched) in events.iter().zip(results) {
            if !dispatched {
                warn!("Event {} was cancelled", event.name());
            }
        }
        Ok(())
    }
}
