pub mod inmemory;

pub use inmemory::store::InMemorySharedStore;
