use chrono::{DateTime, Local};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryId(pub u64);

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// An image ready for inline display, kept as a `data:` URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    data_uri: String,
    media_type: &'static str,
    byte_len: usize,
}

impl EncodedImage {
    pub fn new(media_type: &'static str, base64_payload: &str, byte_len: usize) -> Self {
        EncodedImage {
            data_uri: format!("data:{};base64,{}", media_type, base64_payload),
            media_type,
            byte_len,
        }
    }

    pub fn data_uri(&self) -> &str {
        &self.data_uri
    }

    pub fn media_type(&self) -> &'static str {
        self.media_type
    }

    pub fn byte_len(&self) -> usize {
        self.byte_len
    }

    /// Short human-readable description, e.g. `image/png, 2.0 KiB`.
    pub fn summary(&self) -> String {
        format!("{}, {}", self.media_type(), human_size(self.byte_len()))
    }
}

fn human_size(bytes: usize) -> String {
    const KIB: f64 = 1024.0;
    const MIB: f64 = KIB * 1024.0;
    let b = bytes as f64;
    if b >= MIB {
        format!("{:.1} MiB", b / MIB)
    } else if b >= KIB {
        format!("{:.1} KiB", b / KIB)
    } else {
        format!("{} B", bytes)
    }
}

#[derive(Debug, Clone)]
pub struct GratitudeEntry {
    pub id: EntryId,
    pub created_at: DateTime<Local>,
    pub text: String,
    pub image: Option<EncodedImage>,
}

impl GratitudeEntry {
    pub fn new(id: EntryId, text: String, image: Option<EncodedImage>) -> Self {
        GratitudeEntry {
            id,
            created_at: Local::now(),
            text,
            image,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_uri_carries_media_type_and_payload() {
        let image = EncodedImage::new("image/png", "AAAA", 3);
        assert_eq!(image.data_uri(), "data:image/png;base64,AAAA");
        assert_eq!(image.media_type(), "image/png");
        assert_eq!(image.byte_len(), 3);
    }

    #[test]
    fn summary_scales_units() {
        assert_eq!(EncodedImage::new("image/gif", "", 512).summary(), "image/gif, 512 B");
        assert_eq!(EncodedImage::new("image/png", "", 2048).summary(), "image/png, 2.0 KiB");
        assert_eq!(
            EncodedImage::new("image/jpeg", "", 3 * 1024 * 1024).summary(),
            "image/jpeg, 3.0 MiB"
        );
    }
}
