//! 应用层 - 命令（写操作）
//!
//! CQRS 命令侧：驱动 Book 沿流水线前进

mod book_commands;

pub mod handlers;

pub use book_commands::*;
