//! Archive reader with a hierarchical view.

use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::{BufReader, ErrorKind, Read};
use std::path::Path;

use flate2::read::GzDecoder;

use physgen_types::{PhysgenError, PhysgenResult};

use crate::dataset::Dataset;
use crate::{FORMAT_VERSION, MAGIC, MAX_ENTRY_LEN};

/// A fully loaded archive.
#[derive(Debug, Clone, Default)]
pub struct Archive {
    entries: BTreeMap<String, Dataset>,
}

impl Archive {
    pub fn open(path: &Path) -> PhysgenResult<Self> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
            .map_err(|e| PhysgenError::Archive(format!("{}: {e}", path.display())))
    }

    pub fn from_reader<R: Read>(mut reader: R) -> PhysgenResult<Self> {
        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic)?;
        if &magic != MAGIC {
            return Err(PhysgenError::Archive("not a physgen archive".into()));
        }
        let mut version = [0u8; 4];
        reader.read_exact(&mut version)?;
        let version = u32::from_le_bytes(version);
        if version != FORMAT_VERSION {
            return Err(PhysgenError::Archive(format!(
                "unsupported format version {version}"
            )));
        }

        let mut entries = BTreeMap::new();
        while let Some(len) = read_entry_len(&mut reader)? {
            if len > MAX_ENTRY_LEN {
                return Err(PhysgenError::Archive(format!(
                    "entry length {len} exceeds {MAX_ENTRY_LEN}"
                )));
            }
            let mut compressed = vec![0u8; len];
            reader.read_exact(&mut compressed)?;

            let mut body = Vec::new();
            GzDecoder::new(compressed.as_slice()).read_to_end(&mut body)?;
            let (path, dataset): (String, Dataset) = bincode::deserialize(&body)
                .map_err(|e| PhysgenError::Archive(format!("corrupt entry: {e}")))?;
            entries.insert(path, dataset);
        }
        Ok(Self { entries })
    }

    pub fn get(&self, path: &str) -> Option<&Dataset> {
        self.entries.get(path)
    }

    pub fn require(&self, path: &str) -> PhysgenResult<&Dataset> {
        self.get(path)
            .ok_or_else(|| PhysgenError::Archive(format!("missing dataset '{path}'")))
    }

    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    /// True if any dataset lives under `group`.
    pub fn has_group(&self, group: &str) -> bool {
        let prefix = format!("{}/", group.trim_end_matches('/'));
        self.entries
            .range(prefix.clone()..)
            .next()
            .is_some_and(|(k, _)| k.starts_with(&prefix))
    }

    /// Sorted names of the immediate children (datasets or groups) of `group`.
    pub fn children(&self, group: &str) -> Vec<String> {
        let prefix = if group.is_empty() {
            String::new()
        } else {
            format!("{}/", group.trim_end_matches('/'))
        };
        let names: BTreeSet<String> = self
            .entries
            .range(prefix.clone()..)
            .take_while(|(k, _)| k.starts_with(&prefix))
            .filter_map(|(k, _)| k[prefix.len()..].split('/').next().map(str::to_owned))
            .collect();
        names.into_iter().collect()
    }

    /// All dataset paths, sorted.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Reads an entry length prefix. `None` only at a clean end of file; a
/// prefix cut short is an error.
fn read_entry_len<R: Read>(reader: &mut R) -> PhysgenResult<Option<usize>> {
    let mut len = [0u8; 4];
    let mut filled = 0;
    while filled < len.len() {
        match reader.read(&mut len[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => return Err(e.into()),
        }
    }
    match filled {
        0 => Ok(None),
        4 => Ok(Some(u32::from_le_bytes(len) as usize)),
        n => Err(PhysgenError::Archive(format!(
            "truncated entry length ({n} of 4 bytes)"
        ))),
    }
}
