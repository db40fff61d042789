pub mod db;
pub mod memory;
pub mod probe;

pub use db::DbAdapter;
pub use memory::MemoryContactStore;
pub use probe::{ClientFacts, RequestProbe};
