pub mod related;
pub mod scoring;

pub use related::{find_related, find_related_at, RelatedQuery};
