//! File validation and the asynchronous image ticket protocol.
//!
//! Uploaded files are validated and decoded synchronously. Images named by
//! URL (template images, image presets) are fetched by the host: the editor
//! queues an `ImageRequest`, the host resolves it later by ticket, and the
//! swap lands on the target instance only if it still exists.

use crate::error::EditorError;
use base64::Engine;
use signcraft_core::geometry::FitMode;
use signcraft_render::{DecodedImage, InstanceId};
use std::collections::HashMap;

/// A file handed over by the host's file picker or drop target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn new(name: impl Into<String>, mime: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime: mime.into(),
            bytes,
        }
    }

    /// MIME must be `image/*` and the size at most `max_bytes`.
    pub fn validate(&self, max_bytes: u64) -> Result<(), EditorError> {
        if !self.mime.starts_with("image/") {
            log::warn!("images: rejected {} ({})", self.name, self.mime);
            return Err(EditorError::InvalidFileType(self.name.clone()));
        }
        let size = self.bytes.len() as u64;
        if size > max_bytes {
            log::warn!("images: rejected {} ({size} bytes)", self.name);
            return Err(EditorError::FileTooLarge {
                name: self.name.clone(),
                size,
                limit: max_bytes,
            });
        }
        Ok(())
    }

    /// `data:<mime>;base64,...`, used as the instance's `src`.
    pub fn data_uri(&self) -> String {
        let payload = base64::engine::general_purpose::STANDARD.encode(&self.bytes);
        format!("data:{};base64,{payload}", self.mime)
    }

    /// Validate, then decode.
    pub fn load(&self, max_bytes: u64) -> Result<DecodedImage, EditorError> {
        self.validate(max_bytes)?;
        DecodedImage::decode(&self.bytes).map_err(|e| {
            log::warn!("images: {} failed to decode: {e}", self.name);
            EditorError::ImageDecode(self.name.clone())
        })
    }
}

// ─── Tickets ─────────────────────────────────────────────────────────────

/// What a completed load should do.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ImagePurpose {
    /// Swap a template image placeholder for the loaded image, contain-fit
    /// into the placeholder box.
    TemplateImage,
    /// Swap a region background placeholder, fitted into `region`.
    RegionBackground { region: InstanceId, mode: FitMode },
}

/// A load the host must perform.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageRequest {
    pub ticket: u64,
    pub src: String,
    /// Instance to swap when the load completes.
    pub target: InstanceId,
    pub purpose: ImagePurpose,
}

#[derive(Debug, Default)]
pub struct ImageLoader {
    next_ticket: u64,
    pending: HashMap<u64, ImageRequest>,
    /// Requests not yet handed to the host.
    outbox: Vec<ImageRequest>,
}

impl ImageLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&mut self, src: impl Into<String>, target: InstanceId, purpose: ImagePurpose) -> u64 {
        self.next_ticket += 1;
        let req = ImageRequest {
            ticket: self.next_ticket,
            src: src.into(),
            target,
            purpose,
        };
        log::debug!("images: ticket {} for {target:?}", req.ticket);
        self.pending.insert(req.ticket, req.clone());
        self.outbox.push(req);
        self.next_ticket
    }

    /// Hand queued requests to the host.
    pub fn drain_requests(&mut self) -> Vec<ImageRequest> {
        std::mem::take(&mut self.outbox)
    }

    /// Claim a pending request. Unknown or already-completed tickets give `None`.
    pub fn complete(&mut self, ticket: u64) -> Option<ImageRequest> {
        self.pending.remove(&ticket)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_images_and_oversized_files() {
        let pdf = UploadedFile::new("menu.pdf", "application/pdf", vec![0; 10]);
        assert_eq!(
            pdf.validate(1024),
            Err(EditorError::InvalidFileType("menu.pdf".into()))
        );
        let big = UploadedFile::new("huge.png", "image/png", vec![0; 2048]);
        assert_eq!(
            big.validate(1024),
            Err(EditorError::FileTooLarge {
                name: "huge.png".into(),
                size: 2048,
                limit: 1024,
            })
        );
        assert!(big.validate(4096).is_ok());
    }

    #[test]
    fn undecodable_bytes_are_a_decode_error() {
        let junk = UploadedFile::new("logo.png", "image/png", vec![1, 2, 3]);
        assert_eq!(junk.load(1024), Err(EditorError::ImageDecode("logo.png".into())));
    }

    #[test]
    fn data_uri_encoding() {
        let f = UploadedFile::new("a.png", "image/png", b"hi".to_vec());
        assert_eq!(f.data_uri(), "data:image/png;base64,aGk=");
    }

    #[test]
    fn tickets_complete_once() {
        let mut loader = ImageLoader::new();
        let t = loader.request("logo.png", InstanceId::from_raw(3), ImagePurpose::TemplateImage);
        assert_eq!(loader.drain_requests().len(), 1);
        assert!(loader.drain_requests().is_empty());
        assert_eq!(loader.complete(t).map(|r| r.target), Some(InstanceId::from_raw(3)));
        assert!(loader.complete(t).is_none());
        assert_eq!(loader.pending_count(), 0);
    }
}
