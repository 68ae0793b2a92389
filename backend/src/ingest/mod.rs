pub mod error;
pub mod handler;
pub mod upload;

pub use error::IngestionError;
pub use handler::IngestionHandler;
pub use upload::read_upload;
