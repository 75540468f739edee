use std::path::Path;
use tracing::{debug, info, warn};

use crate::error::Result;

const DOCUMENT_SEPARATOR: &str = "\n\n---\n\n";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// File stem, e.g. `resume` or `faq`
    pub kind: String,
    pub content: String,
}

/// Text the assistant answers from.
#[derive(Debug, Clone, Default)]
pub struct KnowledgeBase {
    documents: Vec<Document>,
}

impl KnowledgeBase {
    pub fn new(documents: Vec<Document>) -> Self {
        Self { documents }
    }

    /// Read every `.md` and `.txt` file in `dir`, ordered by file name.
    pub fn load_dir(dir: &Path) -> Result<Self> {
        if !dir.is_dir() {
            warn!(path = %dir.display(), "Knowledge directory not found, starting with an empty knowledge base");
            return Ok(Self::default());
        }

        let mut paths: Vec<_> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.is_file()
                    && matches!(
                        path.extension().and_then(|ext| ext.to_str()),
                        Some("md") | Some("txt")
                    )
            })
            .collect();
        paths.sort();

        let mut documents = Vec::with_capacity(paths.len());
        for path in paths {
            let content = std::fs::read_to_string(&path)?;
            let kind = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .unwrap_or_default()
                .to_string();
            debug!(kind = %kind, bytes = content.len(), "Loaded knowledge document");
            documents.push(Document {
                kind,
                content: content.trim().to_string(),
            });
        }

        info!(documents = documents.len(), "Knowledge base loaded");
        Ok(Self { documents })
    }

    #[cfg(test)]
    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn all_content(&self) -> String {
        self.documents
            .iter()
            .map(|doc| doc.content.as_str())
            .collect::<Vec<_>>()
            .join(DOCUMENT_SEPARATOR)
    }
}
