//! Persistence layer (local JSON cache file).

pub mod activity_store;

pub use activity_store::ActivityStore;
