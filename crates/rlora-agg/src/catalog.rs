use std::collections::VecDeque;
use std::fmt;
use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use rlora_core::errors::{AggError, ErrorInfo};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use walkdir::WalkDir;

fn pattern_error(code: &str, message: impl fmt::Display) -> AggError {
    AggError::Config(ErrorInfo::new(code, message.to_string()))
}

/// File name filter built from one or more glob patterns.
#[derive(Debug, Clone)]
pub struct NamePattern {
    set: GlobSet,
}

impl NamePattern {
    /// Builds a matcher; an empty list matches every file name.
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self, AggError> {
        let mut builder = GlobSetBuilder::new();
        if patterns.is_empty() {
            builder.add(Glob::new("*").map_err(|err| pattern_error("glob", err))?);
        }
        for pattern in patterns {
            builder.add(Glob::new(pattern.as_ref()).map_err(|err| pattern_error("glob", err))?);
        }
        let set = builder
            .build()
            .map_err(|err| pattern_error("glob-build", err))?;
        Ok(Self { set })
    }

    /// Returns true when the bare file name matches any pattern.
    pub fn is_match(&self, file_name: &str) -> bool {
        self.set.is_match(file_name)
    }
}

/// One `(protocol, dimension)` directory of the data tree.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Partition {
    /// Protocol directory name.
    pub protocol: String,
    /// Dimension directory name.
    pub dimension: String,
}

impl Partition {
    /// Creates a partition descriptor.
    pub fn new(protocol: impl Into<String>, dimension: impl Into<String>) -> Self {
        Self {
            protocol: protocol.into(),
            dimension: dimension.into(),
        }
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.protocol, self.dimension)
    }
}

/// Event emitted while traversing the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogEvent {
    /// A matching file inside the partition.
    File {
        /// Partition the file belongs to.
        partition: Partition,
        /// Full path to the file.
        path: PathBuf,
    },
    /// Every file of the partition has been yielded; flush now.
    PartitionEnd {
        /// Partition that was exhausted.
        partition: Partition,
    },
}

/// Fixed protocol x dimension taxonomy below a data root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    data_root: PathBuf,
    protocols: Vec<String>,
    dimensions: Vec<String>,
}

impl Catalog {
    /// Creates a catalog scanning the given protocols and dimensions in order.
    pub fn new(data_root: impl Into<PathBuf>, protocols: Vec<String>, dimensions: Vec<String>) -> Self {
        Self {
            data_root: data_root.into(),
            protocols,
            dimensions,
        }
    }

    /// Root of the input tree.
    pub fn data_root(&self) -> &Path {
        &self.data_root
    }

    /// Partitions in scan order: protocol-major, then dimension.
    pub fn partitions(&self) -> Vec<Partition> {
        self.protocols
            .iter()
            .flat_map(|protocol| {
                self.dimensions
                    .iter()
                    .map(move |dimension| Partition::new(protocol.clone(), dimension.clone()))
            })
            .collect()
    }

    /// Directory holding the partition's files.
    pub fn partition_dir(&self, partition: &Partition) -> PathBuf {
        self.data_root
            .join(&partition.protocol)
            .join(&partition.dimension)
    }

    /// Lazily walks every existing partition, yielding matching files followed
    /// by one end-of-partition sentinel. Missing partition directories are skipped.
    pub fn iter<'a>(&'a self, pattern: &'a NamePattern) -> CatalogIter<'a> {
        CatalogIter {
            catalog: self,
            pattern,
            pending: self.partitions().into(),
            current: None,
        }
    }
}

/// Iterator returned by [`Catalog::iter`].
pub struct CatalogIter<'a> {
    catalog: &'a Catalog,
    pattern: &'a NamePattern,
    pending: VecDeque<Partition>,
    current: Option<(Partition, walkdir::IntoIter)>,
}

impl Iterator for CatalogIter<'_> {
    type Item = CatalogEvent;

    fn next(&mut self) -> Option<CatalogEvent> {
        loop {
            if let Some((partition, mut walker)) = self.current.take() {
                match walker.next() {
                    Some(Ok(entry)) => {
                        let matched = entry.file_type().is_file()
                            && self.pattern.is_match(&entry.file_name().to_string_lossy());
                        let event = matched.then(|| CatalogEvent::File {
                            partition: partition.clone(),
                            path: entry.into_path(),
                        });
                        self.current = Some((partition, walker));
                        if event.is_some() {
                            return event;
                        }
                    }
                    Some(Err(err)) => {
                        warn!(partition = %partition, error = %err, "unreadable directory entry");
                        self.current = Some((partition, walker));
                    }
                    None => return Some(CatalogEvent::PartitionEnd { partition }),
                }
                continue;
            }

            let partition = self.pending.pop_front()?;
            let dir = self.catalog.partition_dir(&partition);
            if !dir.is_dir() {
                debug!(dir = %dir.display(), "partition directory missing, skipping");
                continue;
            }
            let walker = WalkDir::new(dir)
                .follow_links(true)
                .sort_by_file_name()
                .into_iter();
            self.current = Some((partition, walker));
        }
    }
}

/// Every file below `root` whose name matches `pattern`, in sorted walk order.
pub fn files_under(root: &Path, pattern: &NamePattern) -> Vec<PathBuf> {
    WalkDir::new(root)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(err) => {
                warn!(error = %err, "unreadable directory entry");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| pattern.is_match(&entry.file_name().to_string_lossy()))
        .map(|entry| entry.into_path())
        .collect()
}
