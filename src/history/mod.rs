//! 历史层：键值存储后端、评估历史账本、历史统计报表

pub mod ledger;
pub mod report;
pub mod sqlite;
pub mod store;

pub use ledger::{HistoryLedger, HistoryRecord};
pub use report::{review_queue, DailyVolume, HistoryReport};
pub use sqlite::SqliteKvStore;
pub use store::{create_store_from_config, FileKvStore, KvStore, MemoryKvStore};
