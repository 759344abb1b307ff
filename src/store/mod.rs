pub mod memory;
pub mod sweeper;

pub use memory::MemoryCache;
pub use sweeper::spawn_periodic_clear;
