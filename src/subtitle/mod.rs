//! Caption track reconstruction
//!
//! Round starts append entries at a running time cursor; round ends fix the
//! entry's end time from the round's reported audio duration.

mod srt;
mod timeline;

pub use srt::format_timestamp;
pub use timeline::{SubtitleEntry, SubtitleTimeline};
