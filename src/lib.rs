pub mod analysis;
pub mod cache;
pub mod capture;
pub mod config;
pub mod decode;
pub mod demux;
pub mod display;
pub mod extraction;
pub mod filter;
pub mod models;
pub mod pipeline;
pub mod render;
pub mod schedule;
pub mod traits;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;
