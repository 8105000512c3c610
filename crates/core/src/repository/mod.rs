mod file;
mod memory;

pub use file::FileRepository;
pub use memory::MemoryRepository;
