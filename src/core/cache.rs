//! On-disk JSON files produced by a run
//!
//! Files are written once, fully replacing any previous content, as
//! pretty-printed UTF-8 JSON with non-ASCII characters kept as-is.

use std::io::{BufWriter, Write};
use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::core::aggregator::RouteCache;
use crate::core::error::Result;

/// Serialize `value` to `path`, creating parent directories as needed
pub fn write_json<T: Serialize + ?Sized>(path: impl AsRef<Path>, value: &T) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let file = std::fs::File::create(path)?;
    let mut writer = BufWriter::with_capacity(64 * 1024, file);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.write_all(b"\n")?;
    writer.flush()?;

    Ok(())
}

/// Read a JSON file, returning `None` if it does not exist
pub fn read_json<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<Option<T>> {
    let path = path.as_ref();
    if !path.is_file() {
        return Ok(None);
    }

    let file = std::fs::File::open(path)?;
    let value = serde_json::from_reader(std::io::BufReader::new(file))?;
    Ok(Some(value))
}

pub fn save_route_cache(path: impl AsRef<Path>, routes: &RouteCache) -> Result<()> {
    write_json(path, routes)
}

pub fn load_route_cache(path: impl AsRef<Path>) -> Result<Option<RouteCache>> {
    read_json(path)
}
