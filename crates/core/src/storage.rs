//! Binary persistence of index containers.
//!
//! Every payload is a MessagePack envelope `(version, key, payload)`. Structs
//! encode positionally, so the on-disk layout is the field order of the
//! stored types; it is not self-describing.

use crate::config::IndexConfig;
use crate::error::{Result, SymdexError};
use crate::logging::TRACE_TARGET;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use symdex_api::{ContainerKey, HandleLayer, Repository};

pub const FORMAT_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct Envelope<T> {
    version: u32,
    key: ContainerKey,
    payload: T,
}

/// A container that can be written to and rebuilt from a repository entry.
pub trait Persistent: Sized {
    type Stored: Serialize + DeserializeOwned;

    fn container_key(&self) -> ContainerKey;

    /// Consistent copy of the entries, taken under one read-lock acquisition.
    fn to_stored(&self) -> Self::Stored;

    fn from_stored(key: ContainerKey, stored: Self::Stored, layer: Arc<dyn HandleLayer>) -> Self;
}

pub fn encode_payload<T: Serialize>(key: &ContainerKey, payload: &T) -> Result<Vec<u8>> {
    let envelope = Envelope {
        version: FORMAT_VERSION,
        key: key.clone(),
        payload,
    };
    Ok(rmp_serde::to_vec(&envelope)?)
}

pub fn decode_payload<T: DeserializeOwned>(bytes: &[u8], expected: &ContainerKey) -> Result<T> {
    let envelope: Envelope<T> = rmp_serde::from_slice(bytes)?;
    if envelope.version != FORMAT_VERSION {
        return Err(SymdexError::VersionMismatch {
            found: envelope.version,
            expected: FORMAT_VERSION,
        });
    }
    if envelope.key != *expected {
        return Err(SymdexError::Internal(format!(
            "entry stored under {} carries key {}",
            expected, envelope.key
        )));
    }
    Ok(envelope.payload)
}

pub fn encode<C: Persistent>(container: &C) -> Result<Vec<u8>> {
    encode_payload(&container.container_key(), &container.to_stored())
}

pub fn decode<C: Persistent>(
    bytes: &[u8],
    key: &ContainerKey,
    layer: Arc<dyn HandleLayer>,
) -> Result<C> {
    let stored = decode_payload::<C::Stored>(bytes, key)?;
    Ok(C::from_stored(key.clone(), stored, layer))
}

/// Human-readable dump of a container's entries. Not the persisted format.
pub fn dump_json<C: Persistent>(container: &C) -> Result<String> {
    Ok(serde_json::to_string_pretty(&container.to_stored())?)
}

/// Write a container through to the repository. Failures are surfaced:
/// the caller asked for durability and must learn it did not happen.
pub fn store<C: Persistent>(
    repository: &dyn Repository,
    container: &C,
    config: &IndexConfig,
) -> Result<()> {
    let key = container.container_key();
    let stored = container.to_stored();
    if config.trace {
        trace_dump(&key, &stored);
    }
    let bytes = encode_payload(&key, &stored)?;
    repository.put(&key, bytes)?;
    Ok(())
}

/// Read a container back. Absent, unreadable or undecodable entries all
/// come back as `None`; the file will simply be re-indexed on its next parse.
pub fn load<C: Persistent>(
    repository: &dyn Repository,
    key: &ContainerKey,
    layer: Arc<dyn HandleLayer>,
    config: &IndexConfig,
) -> Option<C> {
    let bytes = match repository.get(key) {
        Ok(Some(bytes)) => bytes,
        Ok(None) => return None,
        Err(e) => {
            tracing::warn!("Failed to read {}: {}. Will rebuild.", key, e);
            return None;
        }
    };

    match decode_payload::<C::Stored>(&bytes, key) {
        Ok(stored) => {
            if config.trace {
                trace_dump(key, &stored);
            }
            Some(C::from_stored(key.clone(), stored, layer))
        }
        Err(e) => {
            tracing::warn!("Failed to decode {}: {}. Will rebuild.", key, e);
            None
        }
    }
}

pub(crate) fn trace_dump<T: Serialize>(key: &ContainerKey, stored: &T) {
    match serde_json::to_string(stored) {
        Ok(json) => tracing::debug!(target: TRACE_TARGET, "{}: {}", key, json),
        Err(e) => tracing::debug!(target: TRACE_TARGET, "{}: <unprintable: {}>", key, e),
    }
}
