use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

/// The samples of one split, ordered by identifier.
#[derive(Debug, Clone, Default)]
pub struct SampleIndex {
    samples: Vec<(String, PathBuf)>,
    lookup: HashMap<String, usize>,
}

impl SampleIndex {
    /// List the sample directories under `split_dir`.
    ///
    /// Every sub-directory is a sample named after the directory. Regular files
    /// are ignored. The samples are sorted by name. A name that is not valid UTF-8
    /// is converted lossily, so every sub-directory is counted.
    ///
    /// # Errors
    ///
    /// The I/O error of the file system, e.g. `NotFound` when `split_dir` does not
    /// exist.
    pub fn from_split_dir(split_dir: impl AsRef<Path>) -> Result<Self, std::io::Error> {
        let mut samples = Vec::new();
        for entry in std::fs::read_dir(split_dir)? {
            let path = entry?.path();
            if !path.is_dir() {
                continue;
            }
            let Some(name) = path.file_name() else {
                continue;
            };
            let id = name.to_string_lossy().into_owned();
            if name.to_str().is_none() {
                log::warn!("sample with a non utf-8 name listed as '{id}'");
            }
            samples.push((id, path));
        }

        samples.sort();
        Ok(Self::from_sorted(samples))
    }

    /// Build an index from `(identifier, root)` pairs.
    ///
    /// Pairs with a repeated identifier are dropped.
    pub fn from_samples(mut samples: Vec<(String, PathBuf)>) -> Self {
        samples.sort_by(|a, b| a.0.cmp(&b.0));
        samples.dedup_by(|a, b| a.0 == b.0);
        Self::from_sorted(samples)
    }

    // lookup by id resolves to the first sample carrying it
    fn from_sorted(samples: Vec<(String, PathBuf)>) -> Self {
        let mut lookup = HashMap::with_capacity(samples.len());
        for (i, (id, _)) in samples.iter().enumerate() {
            lookup.entry(id.clone()).or_insert(i);
        }
        Self { samples, lookup }
    }

    /// The number of samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Check if the index is empty.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// The identifier and root directory of the sample at `index`.
    pub fn get(&self, index: usize) -> Option<(&str, &Path)> {
        self.samples
            .get(index)
            .map(|(id, root)| (id.as_str(), root.as_path()))
    }

    /// The position of the sample named `id`.
    pub fn position(&self, id: &str) -> Option<usize> {
        self.lookup.get(id).copied()
    }

    /// The root directory of the sample named `id`.
    pub fn root_of(&self, id: &str) -> Option<&Path> {
        self.position(id).and_then(|i| self.get(i)).map(|(_, root)| root)
    }

    /// Iterate over the sample identifiers in index order.
    pub fn ids(&self) -> impl Iterator<Item = &str> + '_ {
        self.samples.iter().map(|(id, _)| id.as_str())
    }
}
