pub mod archive;
pub mod downloader;
pub mod traits;
