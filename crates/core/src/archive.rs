//! Durable directory of stored level maps.
//! This module exists to name, write, and reload map files for the match pool.
//! It does not decide when maps are saved or how candidates are matched.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, warn};

use crate::map::{Map, MapDecodeError};

pub const MAP_FILE_EXTENSION: &str = "bin";

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("map archive io error at {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("failed to decode {path}: {source}")]
    Decode { path: PathBuf, source: MapDecodeError },
}

#[derive(Clone, Debug)]
pub struct MapArchive {
    dir: PathBuf,
}

impl MapArchive {
    pub fn open(dir: impl Into<PathBuf>) -> Self {
        MapArchive { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File for the `map_index`-th level visit of the run owning `archive_id`.
    pub fn path_for(&self, map_index: usize, archive_id: u64) -> PathBuf {
        self.dir.join(format!("{map_index}_{archive_id:016x}.{MAP_FILE_EXTENSION}"))
    }

    /// Writes the encoded map next to its final name, then renames it into place.
    pub fn save(&self, map_index: usize, map: &Map) -> Result<PathBuf, ArchiveError> {
        let path = self.path_for(map_index, map.archive_id());
        let io_err = |source| ArchiveError::Io { path: path.clone(), source };
        fs::create_dir_all(&self.dir).map_err(io_err)?;
        let tmp_path = path.with_extension(format!("{MAP_FILE_EXTENSION}.tmp"));
        fs::write(&tmp_path, map.encode()).map_err(io_err)?;
        fs::rename(&tmp_path, &path).map_err(io_err)?;
        debug!(path = %path.display(), "saved map");
        Ok(path)
    }

    /// Run id encoded in a file name written by `save`, if the name has that shape.
    pub fn archive_id_of(path: &Path) -> Option<u64> {
        let stem = path.file_stem()?.to_str()?;
        let (_, id) = stem.rsplit_once('_')?;
        u64::from_str_radix(id, 16).ok()
    }

    /// Decodes one map file. The run id is recovered from the file name, as the format does not carry it.
    pub fn load(path: &Path) -> Result<Map, ArchiveError> {
        let bytes =
            fs::read(path).map_err(|source| ArchiveError::Io { path: path.to_path_buf(), source })?;
        let mut map =
            Map::decode(&bytes).map_err(|source| ArchiveError::Decode { path: path.to_path_buf(), source })?;
        if let Some(archive_id) = Self::archive_id_of(path) {
            map.set_archive_id(archive_id);
        }
        Ok(map)
    }

    /// Every stored map prepared as a match candidate, in file-name order.
    ///
    /// A missing directory is an empty pool. Files that fail to decode are skipped.
    pub fn load_pool(&self) -> Result<Vec<Map>, ArchiveError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => return Err(ArchiveError::Io { path: self.dir.clone(), source }),
        };

        let mut paths = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| ArchiveError::Io { path: self.dir.clone(), source })?;
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == MAP_FILE_EXTENSION) {
                paths.push(path);
            }
        }
        paths.sort();

        let mut pool = Vec::with_capacity(paths.len());
        for path in paths {
            match Self::load(&path) {
                Ok(map) => pool.push(map.into_match_candidate()),
                Err(err) => warn!(error = %err, "skipping unreadable map file"),
            }
        }
        debug!(dir = %self.dir.display(), maps = pool.len(), "loaded match pool");
        Ok(pool)
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;
    use crate::cell::HistoricalValue;
    use crate::types::{Occupancy, Pos};

    fn small_map(archive_id: u64) -> Map {
        let mut map = Map::new(2);
        map.set_archive_id(archive_id);
        map.update(Pos::new(0, 0), |c| c.occupancy = HistoricalValue::known(Occupancy::Free));
        map.update(Pos::new(1, 0), |c| c.occupancy = HistoricalValue::known(Occupancy::Occupied));
        map
    }

    #[test]
    fn save_names_files_by_index_and_run() {
        let dir = tempdir().unwrap();
        let archive = MapArchive::open(dir.path().join("maps"));

        let path = archive.save(3, &small_map(0xabc)).unwrap();

        assert_eq!(path.file_name().unwrap(), "3_0000000000000abc.bin");
        assert!(path.exists());
        assert!(!path.with_extension("bin.tmp").exists());
    }

    #[test]
    fn pool_is_demoted_and_skips_garbage() {
        let dir = tempdir().unwrap();
        let archive = MapArchive::open(dir.path());
        archive.save(0, &small_map(1)).unwrap();
        archive.save(1, &small_map(1)).unwrap();
        fs::write(dir.path().join("2_broken.bin"), [1, 2, 3]).unwrap();
        fs::write(dir.path().join("notes.txt"), "not a map").unwrap();

        let pool = archive.load_pool().unwrap();

        assert_eq!(pool.len(), 2);
        assert_eq!(pool[0].get(Pos::new(0, 0)).occupancy, HistoricalValue::historical(Occupancy::Free));
        assert_eq!(pool[0].level(), 2);
        assert!(pool.iter().all(|map| map.archive_id() == 1));
    }

    #[test]
    fn load_recovers_the_run_id_from_the_file_name() {
        let dir = tempdir().unwrap();
        let archive = MapArchive::open(dir.path());
        let path = archive.save(4, &small_map(0xfeed_beef_0000_0001)).unwrap();

        let map = MapArchive::load(&path).unwrap();
        assert_eq!(map.archive_id(), 0xfeed_beef_0000_0001);

        let renamed = dir.path().join("hand-copied.bin");
        fs::copy(&path, &renamed).unwrap();
        assert_eq!(MapArchive::archive_id_of(&renamed), None);
        assert_eq!(MapArchive::load(&renamed).unwrap().archive_id(), 0);
    }

    #[test]
    fn missing_directory_is_an_empty_pool() {
        let dir = tempdir().unwrap();
        let archive = MapArchive::open(dir.path().join("never-created"));
        assert!(archive.load_pool().unwrap().is_empty());
    }
}
