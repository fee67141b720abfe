//! Common utilities and shared types for aniparty.
//!
//! This crate provides foundational components used across all
//! aniparty crates:
//!
//! - **Configuration**: Application settings via [`Config`]
//! - **Error handling**: Unified error types via [`AppError`] and [`AppResult`]
//! - **Room codes**: Human-shareable session codes via [`RoomCodeGenerator`]
//!
//! # Example
//!
//! ```no_run
//! use aniparty_common::{Config, RoomCodeGenerator, AppResult};
//!
//! fn example() -> AppResult<()> {
//!     let config = Config::load()?;
//!     let codes = RoomCodeGenerator::new(config.party.room_code_length);
//!     println!("Room code: {}", codes.generate());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod id;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use id::RoomCodeGenerator;
