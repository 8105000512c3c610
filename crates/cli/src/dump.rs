use std::sync::Arc;
use symdex_api::{ContainerKey, ContainerKind, HandleLayer, Repository};
use symdex_core::storage::{self, Persistent};
use symdex_core::{
    FileDeclarations, FileIncludes, FileInstantiations, FileRepository, IndexConfig, ObjectTable,
};

fn render<C: Persistent>(
    repository: &FileRepository,
    key: &ContainerKey,
    config: &IndexConfig,
) -> symdex_core::Result<Option<String>> {
    let layer: Arc<dyn HandleLayer> = Arc::new(ObjectTable::new());
    match storage::load::<C>(repository, key, layer, config) {
        Some(container) => storage::dump_json(&container).map(Some),
        None => Ok(None),
    }
}

pub fn run(
    repository: &FileRepository,
    config: &IndexConfig,
    unit: &str,
    file_id: u32,
    kind: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let kind = ContainerKind::parse(kind).ok_or_else(|| format!("unknown container kind: {}", kind))?;
    let key = ContainerKey::new(unit, file_id, kind);

    repository.open_unit(unit)?;
    let rendered = match kind {
        ContainerKind::Declarations => render::<FileDeclarations>(repository, &key, config),
        ContainerKind::Includes => render::<FileIncludes>(repository, &key, config),
        ContainerKind::Instantiations => render::<FileInstantiations>(repository, &key, config),
        ContainerKind::References => Ok(None),
    };
    repository.close_unit(unit)?;

    match rendered? {
        Some(json) => println!("{}", json),
        None => println!("No readable container stored under {}", key),
    }
    Ok(())
}
