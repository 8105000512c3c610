use std::sync::Arc;
use symdex_core::{FileRepository, IndexConfig, ReferenceRegistry};
use tabled::{Table, Tabled};

#[derive(Tabled)]
struct ReferenceRow {
    #[tabled(rename = "Symbol")]
    symbol: String,
    #[tabled(rename = "Occurrences")]
    occurrences: usize,
    #[tabled(rename = "Files")]
    files: usize,
}

/// Start a registry over `repository` with tracking forced on, since the
/// persisted index is only read when tracking is enabled.
pub(crate) fn open_registry(
    repository: FileRepository,
    config: IndexConfig,
) -> symdex_core::Result<ReferenceRegistry> {
    let registry = ReferenceRegistry::new(Arc::new(repository), config.with_reference_tracking(true));
    registry.startup()?;
    Ok(registry)
}

pub fn run(
    repository: FileRepository,
    config: IndexConfig,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let registry = open_registry(repository, config)?;
    let index = registry.index()?;

    if json {
        index.dump(&mut std::io::stdout())?;
    } else if index.is_empty() {
        println!("No references recorded.");
    } else {
        let rows: Vec<ReferenceRow> = index
            .referenced_handles()
            .into_iter()
            .map(|handle| ReferenceRow {
                symbol: handle.to_string(),
                occurrences: index.references_for(&handle).len(),
                files: index.files_referencing(&handle).len(),
            })
            .collect();
        println!("{}", Table::new(rows));
    }

    registry.shutdown()?;
    Ok(())
}
