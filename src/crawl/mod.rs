//! Work-queue driven crawl over event, fighter and fight detail pages

pub mod frontier;
pub mod identity;
pub mod pipeline;

pub use frontier::{Frontier, Task};
pub use identity::{IdentityResolver, PersonName};
pub use pipeline::{CrawlReport, Crawler};
