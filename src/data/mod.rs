//! Data module - CSV loading, period labels and reshaping

mod loader;
mod period;
mod processor;
mod region;
mod table;

pub use loader::{DataLoader, TableSource, DEFAULT_WAGE_FILE};
pub use period::{Month, Period};
pub use processor::CombinedTable;
pub use region::RegionDirectory;
pub use table::{LongRecord, WageRecord, WideTable};
