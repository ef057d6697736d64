//! Watchlist and favorites: one row per (user, movie) pair that moves
//! between active and soft-deleted.

pub mod lifecycle;

pub use lifecycle::*;
