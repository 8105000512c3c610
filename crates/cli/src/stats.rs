use std::collections::BTreeMap;
use symdex_api::{ContainerKind, Repository};
use tabled::{Table, Tabled};

#[derive(Tabled)]
struct KindRow {
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Containers")]
    containers: usize,
}

pub fn run(repository: &dyn Repository, unit: &str) -> Result<(), Box<dyn std::error::Error>> {
    repository.open_unit(unit)?;
    let keys = repository.keys(unit);
    repository.close_unit(unit)?;
    let keys = keys?;

    let mut counts: BTreeMap<ContainerKind, usize> = BTreeMap::new();
    for key in &keys {
        *counts.entry(key.kind).or_insert(0) += 1;
    }

    if counts.is_empty() {
        println!("Unit {} holds no containers.", unit);
        return Ok(());
    }

    let rows: Vec<KindRow> = counts
        .into_iter()
        .map(|(kind, containers)| KindRow {
            kind: kind.to_string(),
            containers,
        })
        .collect();
    println!("{}", Table::new(rows));
    Ok(())
}
