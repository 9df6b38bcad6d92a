//! Mirrors a YouTube channel's statistics, uploads and live status into a
//! Discord guild.
pub mod bot;
pub mod cache;
pub mod channels;
pub mod config;
pub mod detect;
pub mod discord;
pub mod embed;
pub mod error;
pub mod feed;
pub mod live;
pub mod model;
pub mod queue;
pub mod scheduler;
pub mod state;
pub mod youtube;
