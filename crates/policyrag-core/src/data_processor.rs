//! Turns parsed plain-text documents into overlapping chunks.
//!
//! Only `.txt` and `.md` files are read here; richer formats are expected to
//! arrive already extracted. Splitting is recursive over a separator ladder
//! (section rule, paragraph, line, sentence, word, character) so windows end
//! on the most natural boundary that keeps them under `chunk_size` characters.

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::ChunkingSettings;
use crate::error::Result;
use crate::traits::MetadataTagger;
use crate::types::{Chunk, ChunkMetadata, DocumentClass};

const SEPARATORS: &[&str] = &[
    "\n================================================================================\n",
    "\n\n",
    "\n",
    ". ",
    " ",
    "",
];

const SUPPORTED_EXTENSIONS: &[&str] = &["txt", "md"];

/// A document whose text has already been extracted.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    pub filename: String,
    pub path: PathBuf,
    pub text: String,
    pub class: DocumentClass,
}

#[derive(Debug, Clone)]
pub struct TextSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl TextSplitter {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self { chunk_size, chunk_overlap: chunk_overlap.min(chunk_size - 1) }
    }

    pub fn split(&self, text: &str) -> Vec<String> {
        self.split_recursive(text, SEPARATORS)
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }

    fn split_recursive(&self, text: &str, separators: &[&str]) -> Vec<String> {
        let (separator, rest) = pick_separator(text, separators);
        let pieces: Vec<String> = if separator.is_empty() {
            text.chars().map(String::from).collect()
        } else {
            text.split(separator).map(str::to_string).collect()
        };

        let mut out = Vec::new();
        let mut pending: Vec<String> = Vec::new();
        for piece in pieces {
            if char_len(&piece) < self.chunk_size {
                pending.push(piece);
                continue;
            }
            if !pending.is_empty() {
                out.extend(self.merge(&std::mem::take(&mut pending), separator));
            }
            if rest.is_empty() { out.push(piece); } else { out.extend(self.split_recursive(&piece, rest)); }
        }
        if !pending.is_empty() {
            out.extend(self.merge(&pending, separator));
        }
        out
    }

    /// Greedily packs small pieces into windows, carrying up to
    /// `chunk_overlap` characters of trailing pieces into the next window.
    fn merge(&self, pieces: &[String], separator: &str) -> Vec<String> {
        let sep_len = char_len(separator);
        let mut windows = Vec::new();
        let mut current: std::collections::VecDeque<&str> = std::collections::VecDeque::new();
        let mut total = 0usize;

        for piece in pieces {
            let len = char_len(piece);
            let joined_len = |total: usize, current_len: usize| total + len + if current_len > 0 { sep_len } else { 0 };
            if joined_len(total, current.len()) > self.chunk_size && !current.is_empty() {
                let window = current.iter().copied().collect::<Vec<_>>().join(separator);
                if !window.trim().is_empty() { windows.push(window); }
                while total > self.chunk_overlap || (total > 0 && joined_len(total, current.len()) > self.chunk_size) {
                    let Some(front) = current.pop_front() else { break };
                    total = total.saturating_sub(char_len(front) + if current.is_empty() { 0 } else { sep_len });
                }
            }
            if !current.is_empty() { total += sep_len; }
            current.push_back(piece);
            total += len;
        }
        let window = current.iter().copied().collect::<Vec<_>>().join(separator);
        if !window.trim().is_empty() { windows.push(window); }
        windows
    }
}

fn pick_separator<'a>(text: &str, separators: &'a [&'a str]) -> (&'a str, &'a [&'a str]) {
    for (i, &sep) in separators.iter().enumerate() {
        if sep.is_empty() { return (sep, &[]); }
        if text.contains(sep) { return (sep, &separators[i + 1..]); }
    }
    ("", &[])
}

fn char_len(s: &str) -> usize { s.chars().count() }

pub struct DataProcessor {
    splitter: TextSplitter,
}

impl Default for DataProcessor {
    fn default() -> Self { Self::new(&ChunkingSettings::default()) }
}

impl DataProcessor {
    pub fn new(settings: &ChunkingSettings) -> Self {
        Self { splitter: TextSplitter::new(settings.chunk_size, settings.chunk_overlap) }
    }

    /// Read every supported file under `dir` (sorted by path). A missing
    /// directory yields no documents; unreadable files are skipped with a warning.
    pub fn load_documents(&self, dir: &Path, class: DocumentClass) -> Result<Vec<SourceDocument>> {
        if !dir.exists() {
            tracing::warn!(dir = %dir.display(), %class, "document directory does not exist");
            return Ok(vec![]);
        }
        let mut docs = Vec::new();
        for path in list_supported_files(dir) {
            let text = match read_file_content(&path) {
                Ok(text) => text,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping unreadable document");
                    continue;
                }
            };
            let filename = path.file_name().map_or_else(|| path.to_string_lossy().to_string(), |n| n.to_string_lossy().to_string());
            tracing::info!(%filename, %class, "loaded document");
            docs.push(SourceDocument { filename, path, text, class });
        }
        Ok(docs)
    }

    /// Split one document into chunks carrying its class and tags.
    pub fn chunk_document(&self, doc: &SourceDocument, tagger: &dyn MetadataTagger) -> Vec<Chunk> {
        let tags = tagger.tag_document(&doc.text, &doc.filename);
        self.splitter
            .split(&doc.text)
            .into_iter()
            .enumerate()
            .map(|(i, content)| {
                let location = tagger.tag_chunk(&content);
                let metadata = ChunkMetadata {
                    policy_type: tags.policy_type.clone(),
                    policy_number: tags.policy_number.clone(),
                    section: location.section,
                    page: location.page,
                    document_class: doc.class,
                    relevance_score: None,
                    extra: tags.extra.clone(),
                };
                Chunk::new(format!("{}:{}", doc.filename, i), doc.filename.clone(), content, metadata)
            })
            .collect()
    }
}

fn read_file_content(path: &Path) -> Result<String> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(content),
        Err(_) => Ok(String::from_utf8_lossy(&fs::read(path)?).to_string()),
    }
}

fn list_supported_files(root: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(std::result::Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(|e| e.path().to_path_buf())
        .filter(|p| p.extension().and_then(|s| s.to_str()).is_some_and(|ext| SUPPORTED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str())))
        .collect();
    files.sort();
    files
}
