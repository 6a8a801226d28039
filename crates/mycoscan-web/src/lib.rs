//! # MycoScan Web模块
//!
//! 提供实体服务层、JSON API处理器和Web服务器。

pub mod handlers;
pub mod server;
pub mod services;

pub use server::{AppState, WebServer};
