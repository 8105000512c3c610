use dashmap::DashSet;
use smol_str::SmolStr;
use std::fs;
use std::path::{Path, PathBuf};
use symdex_api::{ContainerKey, ContainerKind, Repository, RepositoryError, RepositoryResult};

const BLOB_EXTENSION: &str = "bin";

/// Repository storing one zstd-compressed blob per container key,
/// one directory per unit.
#[derive(Debug)]
pub struct FileRepository {
    base_dir: PathBuf,
    open: DashSet<SmolStr>,
}

impl FileRepository {
    pub fn new(base_dir: PathBuf) -> Self {
        Self {
            base_dir,
            open: DashSet::new(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn unit_dir(&self, unit: &str) -> PathBuf {
        let safe: String = unit
            .chars()
            .map(|c| if c == '/' || c == '\\' || c == ':' { '_' } else { c })
            .collect();
        self.base_dir.join(safe)
    }

    fn blob_path(&self, key: &ContainerKey) -> PathBuf {
        self.unit_dir(&key.unit)
            .join(format!("{}-{}.{}", key.kind, key.file_id, BLOB_EXTENSION))
    }

    fn ensure_open(&self, unit: &str) -> RepositoryResult<()> {
        if self.open.contains(unit) {
            Ok(())
        } else {
            Err(RepositoryError::UnitClosed(unit.to_string()))
        }
    }
}

impl Repository for FileRepository {
    fn open_unit(&self, unit: &str) -> RepositoryResult<()> {
        fs::create_dir_all(self.unit_dir(unit))?;
        self.open.insert(SmolStr::new(unit));
        tracing::debug!("Opened repository unit {}", unit);
        Ok(())
    }

    fn close_unit(&self, unit: &str) -> RepositoryResult<()> {
        if self.open.remove(unit).is_some() {
            tracing::debug!("Closed repository unit {}", unit);
        }
        Ok(())
    }

    fn is_open(&self, unit: &str) -> bool {
        self.open.contains(unit)
    }

    fn get(&self, key: &ContainerKey) -> RepositoryResult<Option<Vec<u8>>> {
        self.ensure_open(&key.unit)?;
        let path = self.blob_path(key);
        if !path.exists() {
            return Ok(None);
        }
        let compressed = fs::read(&path)?;
        let bytes = zstd::decode_all(&compressed[..])
            .map_err(|e| RepositoryError::Corrupt(format!("{}: {}", key, e)))?;
        Ok(Some(bytes))
    }

    fn put(&self, key: &ContainerKey, bytes: Vec<u8>) -> RepositoryResult<()> {
        self.ensure_open(&key.unit)?;
        let compressed = zstd::encode_all(&bytes[..], 0)?;

        // Write to file atomically (write to temp, then rename)
        let path = self.blob_path(key);
        let temp_path = path.with_extension("tmp");
        fs::write(&temp_path, compressed)?;
        fs::rename(temp_path, path)?;
        Ok(())
    }

    fn remove(&self, key: &ContainerKey) -> RepositoryResult<()> {
        self.ensure_open(&key.unit)?;
        let path = self.blob_path(key);
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }

    fn keys(&self, unit: &str) -> RepositoryResult<Vec<ContainerKey>> {
        self.ensure_open(unit)?;
        let mut keys = Vec::new();
        for entry in fs::read_dir(self.unit_dir(unit))? {
            let path = entry?.path();
            if path.extension().map_or(true, |ext| ext != BLOB_EXTENSION) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let Some((kind, file_id)) = stem.rsplit_once('-') else {
                continue;
            };
            if let (Some(kind), Ok(file_id)) = (ContainerKind::parse(kind), file_id.parse()) {
                keys.push(ContainerKey::new(unit, file_id, kind));
            }
        }
        keys.sort();
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_put_get_survives_reopen() {
        let temp = TempDir::new().unwrap();
        let key = ContainerKey::new("proj", 7, ContainerKind::Declarations);
        {
            let repo = FileRepository::new(temp.path().to_path_buf());
            repo.open_unit("proj").unwrap();
            repo.put(&key, b"payload".to_vec()).unwrap();
            repo.close_unit("proj").unwrap();
        }

        let repo = FileRepository::new(temp.path().to_path_buf());
        assert!(repo.get(&key).is_err());
        repo.open_unit("proj").unwrap();
        assert_eq!(repo.get(&key).unwrap(), Some(b"payload".to_vec()));
        assert_eq!(repo.keys("proj").unwrap(), vec![key.clone()]);

        repo.remove(&key).unwrap();
        assert_eq!(repo.get(&key).unwrap(), None);
    }

    #[test]
    fn test_garbage_blob_is_corrupt() {
        let temp = TempDir::new().unwrap();
        let repo = FileRepository::new(temp.path().to_path_buf());
        repo.open_unit("proj").unwrap();
        let key = ContainerKey::new("proj", 1, ContainerKind::Includes);
        fs::write(repo.blob_path(&key), b"not zstd").unwrap();
        assert!(matches!(repo.get(&key), Err(RepositoryError::Corrupt(_))));
    }
}
