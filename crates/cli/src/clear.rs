use crate::refs::open_registry;
use symdex_core::{FileRepository, IndexConfig};
use tracing::info;

pub fn run(repository: FileRepository, config: IndexConfig) -> Result<(), Box<dyn std::error::Error>> {
    let registry = open_registry(repository, config)?;
    let index = registry.index()?;
    let count = index.len();

    info!("Clearing {} referenced symbols from {}...", count, index.key());
    index.clear()?;
    registry.shutdown()?;
    info!("Reference index cleared.");
    println!("Cleared {} referenced symbols.", count);
    Ok(())
}
