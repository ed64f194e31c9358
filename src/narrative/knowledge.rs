//! Local knowledge base of plain-text documents.
//!
//! Every `*.txt` file in the directory is one document.  A query is split
//! into words and a document scores one point per query word found anywhere
//! in its lowercased text; the best scoring documents become the excerpts
//! handed to [`super::llm::LlmNarrativeSource::with_excerpts`].

use std::fs;
use std::path::Path;

use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;

/// Number of excerpts passed to the model per report.
pub const DEFAULT_EXCERPTS: usize = 6;

static WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\w+").expect("valid word pattern"));

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KnowledgeDocument {
    /// File name, e.g. `frityr.txt`.
    pub title: String,
    pub content: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct KnowledgeBase {
    documents: Vec<KnowledgeDocument>,
}

impl KnowledgeBase {
    /// Reads the `*.txt` files of `dir` in file name order.
    ///
    /// A missing directory gives an empty knowledge base; unreadable files
    /// are logged and skipped.
    pub fn load(dir: &Path) -> Self {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(err) => {
                debug!("no knowledge base at {}: {}", dir.display(), err);
                return Self::default();
            }
        };

        let mut paths: Vec<_> = entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.is_file() && path.extension().map_or(false, |ext| ext == "txt"))
            .collect();
        paths.sort();

        let documents = paths
            .into_iter()
            .filter_map(|path| match fs::read_to_string(&path) {
                Ok(content) => Some(KnowledgeDocument {
                    title: path
                        .file_name()
                        .map(|name| name.to_string_lossy().into_owned())
                        .unwrap_or_default(),
                    content,
                }),
                Err(err) => {
                    warn!("skipping knowledge file {}: {}", path.display(), err);
                    None
                }
            })
            .collect::<Vec<_>>();

        debug!("loaded {} knowledge document(s) from {}", documents.len(), dir.display());
        Self { documents }
    }

    pub fn from_documents(documents: Vec<KnowledgeDocument>) -> Self {
        Self { documents }
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Up to `k` documents matching `query`, best first.  Documents with
    /// equal scores keep their load order; documents scoring zero are left out.
    pub fn top_k(&self, query: &str, k: usize) -> Vec<&KnowledgeDocument> {
        let query = query.to_lowercase();
        let words: Vec<&str> = WORD.find_iter(&query).map(|word| word.as_str()).collect();
        if words.is_empty() {
            return Vec::new();
        }

        let mut scored: Vec<(usize, &KnowledgeDocument)> = self
            .documents
            .iter()
            .filter_map(|document| {
                let text = document.content.to_lowercase();
                let score = words.iter().filter(|word| text.contains(**word)).count();
                (score > 0).then_some((score, document))
            })
            .collect();
        scored.sort_by(|a, b| b.0.cmp(&a.0));

        scored.into_iter().take(k).map(|(_, document)| document).collect()
    }

    /// Contents of [`Self::top_k`], ready for the prompt.
    pub fn excerpts(&self, query: &str, k: usize) -> Vec<String> {
        self.top_k(query, k)
            .into_iter()
            .map(|document| document.content.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, name: &str, content: &str) {
        fs::write(dir.join(name), content).unwrap();
    }

    fn titles<'a>(documents: &[&'a KnowledgeDocument]) -> Vec<&'a str> {
        documents.iter().map(|document| document.title.as_str()).collect()
    }

    #[test]
    fn ranks_by_number_of_query_words_found() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "frityr.txt", "Varm olje i frityrgryta. Brannteppe ved frityr.");
        write(dir.path(), "gulv.txt", "Vått gulv ved oppvasken gir sklifare. Olje på gulv.");
        write(dir.path(), "allergener.txt", "Merking av allergener.");
        write(dir.path(), "notat.md", "olje gulv frityr");

        let kb = KnowledgeBase::load(dir.path());
        assert_eq!(kb.len(), 3);

        let hits = kb.top_k("Sted: Kjøkken\nHendelsestype: Olje på gulv ved frityr", 6);
        assert_eq!(titles(&hits), vec!["gulv.txt", "frityr.txt"]);
    }

    #[test]
    fn equal_scores_keep_file_name_order_and_k_limits() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "b.txt", "kniv");
        write(dir.path(), "a.txt", "kniv");
        write(dir.path(), "c.txt", "kniv");

        let kb = KnowledgeBase::load(dir.path());
        assert_eq!(titles(&kb.top_k("KNIV", 2)), vec!["a.txt", "b.txt"]);
        assert_eq!(kb.excerpts("kniv", 1), vec!["kniv".to_string()]);
    }

    #[test]
    fn missing_directory_and_empty_query_give_nothing() {
        let kb = KnowledgeBase::load(Path::new("/no/such/kb"));
        assert!(kb.is_empty());

        let kb = KnowledgeBase::from_documents(vec![KnowledgeDocument {
            title: "x.txt".into(),
            content: "olje".into(),
        }]);
        assert!(kb.top_k("  ", 3).is_empty());
        assert!(kb.top_k("vann", 3).is_empty());
    }
}
