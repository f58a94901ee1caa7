pub mod chat;
pub mod database;
pub mod files;
pub mod modes;
pub mod sessions;
pub mod ws;
