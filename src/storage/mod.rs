// 存储模块 - 统一的存储抽象层

// 子模块
pub mod cache;
pub mod models;
pub mod repository;

// 重新导出主要类型
pub use cache::CachedRepository;
pub use repository::{CleaningRepository, SheetStatus};

// 重新导出具体实现
pub use repository::memory::MemoryRepository;
pub use repository::sheets::SheetsRepository;
