// Directory - maps card scans and typed names to canonical names.
//
// Lookup rules match the roster exports the kiosks run against:
// - "Last, First" names are rewritten to "First Last"
// - card ids are trimmed and lower-cased; card lookup is case-insensitive
// - name lookup is exact (case-sensitive), and card match wins when an
//   entry happens to match both

use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use anyhow::{Context, Result};
use tracing::warn;

/// One identity row before indexing: a display name plus any card ids.
#[derive(Debug, Clone)]
pub struct DirectoryRow {
    pub name: String,
    pub cards: Vec<String>,
}

impl DirectoryRow {
    pub fn new(name: impl Into<String>, cards: Vec<String>) -> Self {
        DirectoryRow {
            name: name.into(),
            cards,
        }
    }
}

/// Where identity rows come from.
///
/// Card columns are optional: an empty `card_columns` list gives a
/// name-only directory, a populated one adds card lookup. Both are the
/// same capability set, selected by configuration.
#[derive(Debug, Clone)]
pub enum DirectorySource {
    /// Roster CSV with a configurable name column and zero or more card
    /// columns.
    CsvFile {
        path: PathBuf,
        name_column: String,
        card_columns: Vec<String>,
    },
    /// Fixed in-memory rows.
    Rows(Vec<DirectoryRow>),
}

/// Immutable index snapshot. Rebuilt wholesale on every reload and swapped
/// in behind the lock, so readers never observe a half-built index.
#[derive(Debug, Default)]
struct DirectoryIndex {
    card_to_name: HashMap<String, String>,
    names: BTreeSet<String>,
}

impl DirectoryIndex {
    fn build(rows: &[DirectoryRow]) -> DirectoryIndex {
        let mut index = DirectoryIndex::default();

        for row in rows {
            let name = normalize_name(&row.name);
            if name.is_empty() {
                continue;
            }
            index.names.insert(name.clone());

            for card in &row.cards {
                let card = card.trim().to_lowercase();
                if !card.is_empty() {
                    // Duplicate card ids across rows: last row wins
                    index.card_to_name.insert(card, name.clone());
                }
            }
        }

        index
    }
}

/// Caches identity information for the kiosk.
pub struct Directory {
    source: DirectorySource,
    index: RwLock<Arc<DirectoryIndex>>,
}

impl Directory {
    /// Builds a directory and performs the initial load.
    pub fn load(source: DirectorySource) -> Result<Self> {
        let directory = Directory {
            source,
            index: RwLock::new(Arc::new(DirectoryIndex::default())),
        };
        directory.reload()?;
        Ok(directory)
    }

    /// Re-reads the source and replaces both indexes atomically. A missing
    /// roster file yields an empty directory, not an error.
    pub fn reload(&self) -> Result<()> {
        let rows = self.read_rows()?;
        let index = Arc::new(DirectoryIndex::build(&rows));

        let mut guard = self.index.write().unwrap();
        *guard = index;
        Ok(())
    }

    /// Maps a raw scan or typed entry to a canonical name. The card index
    /// is checked first with the trimmed, lower-cased input; then the name
    /// set with the trimmed input as-is.
    pub fn resolve(&self, entry: &str) -> Option<String> {
        let index = self.snapshot();
        let trimmed = entry.trim();

        if let Some(name) = index.card_to_name.get(&trimmed.to_lowercase()) {
            return Some(name.clone());
        }
        if index.names.contains(trimmed) {
            return Some(trimmed.to_string());
        }
        None
    }

    /// Card-only lookup (trim + lowercase).
    pub fn find_by_card(&self, card_value: &str) -> Option<String> {
        self.snapshot()
            .card_to_name
            .get(&card_value.trim().to_lowercase())
            .cloned()
    }

    /// Exact membership check against the canonical name set.
    pub fn has_name(&self, name: &str) -> bool {
        self.snapshot().names.contains(name)
    }

    /// Canonical names, sorted.
    pub fn names(&self) -> Vec<String> {
        self.snapshot().names.iter().cloned().collect()
    }

    /// Normalized card ids, sorted.
    pub fn cards(&self) -> Vec<String> {
        let index = self.snapshot();
        let mut cards: Vec<String> = index.card_to_name.keys().cloned().collect();
        cards.sort();
        cards
    }

    fn snapshot(&self) -> Arc<DirectoryIndex> {
        self.index.read().unwrap().clone()
    }

    fn read_rows(&self) -> Result<Vec<DirectoryRow>> {
        match &self.source {
            DirectorySource::Rows(rows) => Ok(rows.clone()),
            DirectorySource::CsvFile {
                path,
                name_column,
                card_columns,
            } => {
                if !path.exists() {
                    warn!(
                        path = %path.display(),
                        "roster CSV not found; directory will be empty"
                    );
                    return Ok(Vec::new());
                }

                let mut reader = csv::Reader::from_path(path)
                    .with_context(|| format!("failed to open roster CSV at {}", path.display()))?;

                let headers = reader.headers()?.clone();
                let name_idx = headers.iter().position(|h| h == name_column);
                if name_idx.is_none() {
                    warn!(
                        column = %name_column,
                        "name column missing from roster CSV; directory will be empty"
                    );
                }
                let card_idx: Vec<usize> = card_columns
                    .iter()
                    .filter_map(|col| headers.iter().position(|h| h == col))
                    .collect();

                let mut rows = Vec::new();
                for record in reader.records() {
                    let record = record.context("failed to read roster CSV record")?;
                    let name = name_idx
                        .and_then(|i| record.get(i))
                        .unwrap_or("")
                        .to_string();
                    let cards = card_idx
                        .iter()
                        .filter_map(|&i| record.get(i))
                        .map(str::to_string)
                        .collect();
                    rows.push(DirectoryRow { name, cards });
                }
                Ok(rows)
            }
        }
    }
}

/// `"Last, First"` becomes `"First Last"` (both parts trimmed); anything
/// else is just trimmed. Applying it twice yields the same result.
pub fn normalize_name(raw: &str) -> String {
    let raw = raw.trim();
    match raw.split_once(',') {
        Some((last, first)) => format!("{} {}", first.trim(), last.trim())
            .trim()
            .to_string(),
        None => raw.to_string(),
    }
}
