//! Keyword retrieval from the doc folder.
//!
//! Keywords are a soft input: every failure on this path degrades to an
//! empty list with a warning. The run never stops because of them.

use crate::google::DriveApi;
use crate::output::GOOGLE_DOC_MIME;
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info, warn};

/// Local file the keywords document is exported to.
pub const KEYWORDS_FILE: &str = "keywords.txt";

/// Fetch and parse the keywords document from `doc_folder_id`.
///
/// Only the first Google Doc in the listing is used.
pub async fn get_keywords_from_drive(
    drive: &dyn DriveApi,
    doc_folder_id: &str,
    download_dir: &Path,
) -> Vec<String> {
    let docs = match drive.list_files(doc_folder_id, GOOGLE_DOC_MIME).await {
        Ok(docs) => docs,
        Err(e) => {
            warn!("Keyword documents could not be listed: {}", e);
            return Vec::new();
        }
    };

    let Some(doc) = docs.first() else {
        info!("No keyword document in folder {}; continuing without keywords", doc_folder_id);
        return Vec::new();
    };
    if docs.len() > 1 {
        debug!("{} keyword documents found, using '{}'", docs.len(), doc.name);
    }

    let dest = download_dir.join(KEYWORDS_FILE);
    let path = match drive.download_file(doc, &dest).await {
        Ok(p) => p,
        Err(e) => {
            warn!("Keyword document '{}' could not be downloaded: {}", doc.name, e);
            return Vec::new();
        }
    };

    let text = match tokio::fs::read_to_string(&path).await {
        Ok(t) => t,
        Err(e) => {
            warn!("Keyword file {} unreadable: {}", path.display(), e);
            return Vec::new();
        }
    };

    let keywords = parse_keywords(&text);
    info!("Loaded {} keyword(s) from '{}'", keywords.len(), doc.name);
    keywords
}

/// Split exported document text into a keyword list.
///
/// Items are separated by newlines, commas or semicolons. List bullets are
/// stripped and duplicates (ignoring case) keep their first spelling.
pub fn parse_keywords(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    text.trim_start_matches('\u{feff}')
        .split(['\n', ',', ';'])
        .map(|item| {
            item.trim()
                .trim_start_matches(['-', '*', '•'])
                .trim()
        })
        .filter(|item| !item.is_empty())
        .filter(|item| seen.insert(item.to_lowercase()))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CatalogError;
    use crate::output::DriveFile;
    use async_trait::async_trait;
    use std::path::PathBuf;

    #[test]
    fn splits_on_all_separators() {
        let kw = parse_keywords("linen, summer; breathable\nrelaxed fit\r\n");
        assert_eq!(kw, vec!["linen", "summer", "breathable", "relaxed fit"]);
    }

    #[test]
    fn strips_bullets_and_bom() {
        let kw = parse_keywords("\u{feff}* cotton\n- organic\n• eco-friendly\n");
        assert_eq!(kw, vec!["cotton", "organic", "eco-friendly"]);
    }

    #[test]
    fn dedupes_case_insensitively() {
        let kw = parse_keywords("Linen\nlinen, LINEN; Cotton");
        assert_eq!(kw, vec!["Linen", "Cotton"]);
    }

    #[test]
    fn blank_document_gives_nothing() {
        assert!(parse_keywords("\n\n , ; \n").is_empty());
    }

    struct DocsOnly {
        docs: Vec<DriveFile>,
        body: Option<&'static str>,
    }

    #[async_trait]
    impl DriveApi for DocsOnly {
        async fn list_files(&self, _: &str, _: &str) -> Result<Vec<DriveFile>, CatalogError> {
            Ok(self.docs.clone())
        }

        async fn download_file(
            &self,
            _file: &DriveFile,
            dest: &Path,
        ) -> Result<PathBuf, CatalogError> {
            match self.body {
                Some(body) => {
                    std::fs::write(dest, body).unwrap();
                    Ok(dest.to_path_buf())
                }
                None => Err(CatalogError::DriveApi {
                    operation: "download",
                    status: Some(404),
                    detail: "not found".into(),
                }),
            }
        }

        async fn find_spreadsheet(&self, _: &str) -> Result<Option<String>, CatalogError> {
            Ok(None)
        }

        async fn move_to_folder(&self, _: &str, _: &str) -> Result<(), CatalogError> {
            Ok(())
        }
    }

    fn doc(name: &str) -> DriveFile {
        DriveFile {
            id: format!("{name}-id"),
            name: name.into(),
            mime_type: GOOGLE_DOC_MIME.into(),
        }
    }

    #[tokio::test]
    async fn empty_folder_gives_empty_keywords() {
        let dir = tempfile::TempDir::new().unwrap();
        let drive = DocsOnly {
            docs: vec![],
            body: None,
        };
        assert!(get_keywords_from_drive(&drive, "doc", dir.path()).await.is_empty());
    }

    #[tokio::test]
    async fn download_failure_gives_empty_keywords() {
        let dir = tempfile::TempDir::new().unwrap();
        let drive = DocsOnly {
            docs: vec![doc("keywords")],
            body: None,
        };
        assert!(get_keywords_from_drive(&drive, "doc", dir.path()).await.is_empty());
    }

    #[tokio::test]
    async fn first_document_is_parsed() {
        let dir = tempfile::TempDir::new().unwrap();
        let drive = DocsOnly {
            docs: vec![doc("keywords"), doc("old keywords")],
            body: Some("linen, summer"),
        };
        let kw = get_keywords_from_drive(&drive, "doc", dir.path()).await;
        assert_eq!(kw, vec!["linen", "summer"]);
        assert!(dir.path().join(KEYWORDS_FILE).exists());
    }
}
