// src/data/mod.rs
pub mod downloader;

pub use downloader::download_file;
