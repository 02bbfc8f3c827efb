pub mod episode;

pub use episode::{validate_reference, Episode, RelatedEpisode};
