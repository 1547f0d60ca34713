//! Transfigurr backend
//!
//! Keeps the movie and series library in the database in sync with the
//! library folders on disk, and hands items that need metadata or an encode
//! to the matching background queues.

pub mod config;
pub mod db;
pub mod scan;
pub mod services;
pub mod tasks;
