// MetadataProjector - display metadata for the player UI
//
// Independent of format selection. Thumbnail choice favours square artwork
// (common for music releases) and falls back to the largest image.

use super::models::TrackMetadata;
use super::record::{ProviderRecord, RawThumbnail};

/// Max |width - height| for a thumbnail to count as square artwork
const SQUARE_TOLERANCE_PX: u64 = 2;

pub struct MetadataProjector;

impl MetadataProjector {
    pub fn project(record: &ProviderRecord) -> TrackMetadata {
        let title = non_empty(&record.title);
        let artist = non_empty(&record.artist)
            .or_else(|| non_empty(&record.uploader))
            .or_else(|| non_empty(&record.channel));

        let mut metadata = TrackMetadata {
            title,
            artist,
            duration_seconds: record.duration,
            ..Default::default()
        };

        match Self::pick_thumbnail(&record.thumbnails) {
            Some(thumb) => {
                metadata.thumbnail_url = thumb.url.clone();
                metadata.thumbnail_width = thumb.width;
                metadata.thumbnail_height = thumb.height;
                // Reported flag is exact, unlike the selection tolerance
                metadata.thumbnail_is_square = matches!(
                    (thumb.width, thumb.height),
                    (Some(w), Some(h)) if w == h
                );
            }
            None => metadata.thumbnail_url = non_empty(&record.thumbnail),
        }

        metadata
    }

    /// Largest square-ish thumbnail, else largest overall; first wins on ties
    pub fn pick_thumbnail(thumbnails: &[RawThumbnail]) -> Option<&RawThumbnail> {
        largest(thumbnails.iter().filter(|t| is_square(t))).or_else(|| largest(thumbnails.iter()))
    }
}

fn largest<'a>(items: impl Iterator<Item = &'a RawThumbnail>) -> Option<&'a RawThumbnail> {
    items.fold(None, |best, t| match best {
        Some(b) if area(t) <= area(b) => Some(b),
        _ => Some(t),
    })
}

fn dims(t: &RawThumbnail) -> (u64, u64) {
    (t.width.unwrap_or(0), t.height.unwrap_or(0))
}

fn area(t: &RawThumbnail) -> u64 {
    let (w, h) = dims(t);
    w.saturating_mul(h)
}

fn is_square(t: &RawThumbnail) -> bool {
    let (w, h) = dims(t);
    w > 0 && h > 0 && w.abs_diff(h) <= SQUARE_TOLERANCE_PX
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
