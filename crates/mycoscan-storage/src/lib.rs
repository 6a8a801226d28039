//! # MycoScan存储模块
//!
//! 负责上传图片文件的落盘存储。

pub mod storage;

pub use storage::*;
