// src/services/mod.rs
pub mod client;
pub mod drive;
pub mod models;
pub mod notify;
pub mod sheets;

pub use drive::DriveClient;
pub use notify::NotifyClient;
pub use sheets::SheetsClient;
