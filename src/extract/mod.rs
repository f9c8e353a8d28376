//! HTML extraction: listing entries and detail-page bodies.

pub mod cascade;
pub mod classes;
pub mod content;
pub mod listing;

pub use content::{ContentExtractor, ContentSettings};
pub use listing::{ListingExtractor, ListingSource};
