//! Bookvox - 有声书生产流水线
//!
//! 架构设计: DDD + CQRS + Hexagonal Architecture
//!
//! 领域层 (domain/):
//! - Book Context: Book 聚合与状态机、章节、片段、音色映射
//! - 句子切分规则
//!
//! 应用层 (application/):
//! - Ports: Storage, BookRepository, Segmentation/Synthesis/Extraction Provider, DocumentParser
//! - Registry: 按名称选取供应商
//! - Commands: 解析 → 分段 → 音色 → 合成
//! - Queries: 读取、流式播放、打包
//!
//! 基础设施层 (infrastructure/):
//! - HTTP: RESTful API + WebSocket
//! - Persistence: 基于对象存储的仓储 + Sled 对象存储
//! - Adapters: 文件存储、TTS / OCR 客户端、规则分段器、纯文本解析器
//! - Events: 进度事件发布

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::{load_config, AppConfig};
