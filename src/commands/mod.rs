pub mod cache;
pub mod config;
pub mod doctor;
pub mod locate;
pub mod sync;
