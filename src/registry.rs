use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use log::info;
use rustc_hash::FxHashMap;
use std::fs::File;
use std::io::{self, BufReader, BufWriter};
use std::path::Path;

/// Assigns dense zero-based indices to external integer identifiers.
///
/// Indices are handed out in first-seen order and, thanks to the persisted
/// mapping file, survive across runs: a stop keeps its index when the feed is
/// re-encoded, so clients can cache by index. The mapping file is a `u32`
/// count followed by the raw ids in index order (position = index) and is
/// rewritten in full at the end of a successful run.
pub struct IdRegistry {
    index_by_id: FxHashMap<i32, u32>,
    ids: Vec<i32>,
}

impl IdRegistry {
    pub fn new() -> Self {
        IdRegistry {
            index_by_id: FxHashMap::default(),
            ids: Vec::new(),
        }
    }

    /// Loads the previous run's mapping. An absent file yields an empty
    /// registry starting at index 0.
    pub fn load<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let file = match File::open(path.as_ref()) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Self::new()),
            Err(e) => return Err(e),
        };
        let mut input = BufReader::new(file);

        let count = input.read_u32::<BigEndian>()?;
        let mut registry = Self::new();
        for index in 0..count {
            let raw = input.read_i32::<BigEndian>()?;
            registry.index_by_id.insert(raw, index);
            registry.ids.push(raw);
        }
        info!(
            "loaded {} persisted identifiers from {}",
            count,
            path.as_ref().display()
        );
        Ok(registry)
    }

    /// Dense index of `raw`, allocating the next free slot on first sight.
    pub fn index_of(&mut self, raw: i32) -> u32 {
        if let Some(&index) = self.index_by_id.get(&raw) {
            return index;
        }
        let index = self.ids.len() as u32;
        self.index_by_id.insert(raw, index);
        self.ids.push(raw);
        index
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Rewrites the full mapping, never appends.
    pub fn persist<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let mut out = BufWriter::new(File::create(path)?);
        out.write_u32::<BigEndian>(self.ids.len() as u32)?;
        for &raw in &self.ids {
            out.write_i32::<BigEndian>(raw)?;
        }
        Ok(())
    }
}

impl Default for IdRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Trip identifiers are one-based and already dense in the source feed, so
/// the "registry" for them is a fixed shift.
pub fn trip_index(raw: i32) -> i32 {
    raw - 1
}

/// Interns repeated free-text strings (trip headsigns) to integer ids.
#[derive(Default)]
pub struct StringPool {
    id_by_value: FxHashMap<String, u32>,
    values: Vec<String>,
}

impl StringPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intern(&mut self, value: &str) -> u32 {
        if let Some(&id) = self.id_by_value.get(value) {
            return id;
        }
        let id = self.values.len() as u32;
        self.id_by_value.insert(value.to_string(), id);
        self.values.push(value.to_string());
        id
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Pool contents in id order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &str)> {
        self.values
            .iter()
            .enumerate()
            .map(|(id, value)| (id as u32, value.as_str()))
    }
}
