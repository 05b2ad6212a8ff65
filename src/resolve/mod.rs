pub mod metadata;
pub mod models;
pub mod stream;
pub mod url;

pub use metadata::MetadataFetcher;
pub use models::{Item, ItemKind, Quality, StreamVariant, SubItem};
pub use stream::{pick_by_label, StreamResolver};
