pub mod inmemory;

pub use inmemory::InMemoryMessageBus;
