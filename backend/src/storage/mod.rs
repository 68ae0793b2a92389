pub mod image_store;
pub mod memory_store;
pub mod sqlite_store;

pub use image_store::{ImageStore, NewImage, StoreError};
pub use memory_store::MemoryImageStore;
pub use sqlite_store::SqliteImageStore;
