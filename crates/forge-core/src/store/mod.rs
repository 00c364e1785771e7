pub mod archive;
pub mod codec;
pub mod schema;

pub use archive::SuiteArchive;
