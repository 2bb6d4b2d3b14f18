//! Service layer
//!
//! Contains business logic separated from HTTP handlers.
//! Services orchestrate the database and the ranking store.

mod account;
mod action;
mod feed;
mod graph;
mod image;
pub mod pagination;

#[cfg(test)]
mod test_support;

pub use account::{AccountService, NewAccount, ProfileEdit, UserDetail};
pub use action::ActionRecorder;
pub use feed::{ActorSummary, FeedEntry, FeedService, FeedTarget};
pub use graph::SocialGraphService;
pub use image::{ImageDetail, ImageListItem, ImagePage, ImageService, NewImage, slugify};
pub use pagination::{PageInfo, PageRequest, Paginator};
