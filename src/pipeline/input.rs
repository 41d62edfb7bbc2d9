//! Integrity checks on a downloaded PDF before pdfium sees it.
//!
//! A download can "succeed" and still leave nothing usable: the path may not
//! exist, or Drive may have returned an HTML error page. Checking the `%PDF`
//! magic here turns both into a clear halt instead of a pdfium error.

use crate::error::HaltReason;
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// Confirm `path` exists and starts with the PDF magic bytes.
pub fn verify_downloaded_pdf(path: &Path) -> Result<(), HaltReason> {
    if !path.exists() {
        return Err(HaltReason::MissingLocalFile {
            path: path.to_path_buf(),
        });
    }

    let mut f = std::fs::File::open(path).map_err(|_| HaltReason::MissingLocalFile {
        path: path.to_path_buf(),
    })?;

    let mut magic = [0u8; 4];
    match f.read_exact(&mut magic) {
        Ok(()) if &magic == b"%PDF" => {}
        _ => {
            return Err(HaltReason::NotAPdf {
                path: path.to_path_buf(),
                magic,
            })
        }
    }

    debug!("Verified downloaded PDF: {}", path.display());
    Ok(())
}

/// Local file name for a Drive file name. Drive allows `/` in names; the
/// local copy must stay inside the download directory.
pub fn local_file_name(drive_name: &str) -> String {
    let cleaned: String = drive_name
        .chars()
        .map(|c| if matches!(c, '/' | '\\' | '\0') { '_' } else { c })
        .collect();
    match cleaned.trim() {
        "" | "." | ".." => "download.pdf".to_string(),
        name => name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_file_halts() {
        let err = verify_downloaded_pdf(Path::new("/no/such/test.pdf")).unwrap_err();
        assert!(matches!(err, HaltReason::MissingLocalFile { .. }));
    }

    #[test]
    fn html_error_page_is_not_a_pdf() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"<html>quota exceeded</html>").unwrap();
        match verify_downloaded_pdf(f.path()).unwrap_err() {
            HaltReason::NotAPdf { magic, .. } => assert_eq!(&magic, b"<htm"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn real_pdf_header_passes() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"%PDF-1.7\n%...").unwrap();
        assert!(verify_downloaded_pdf(f.path()).is_ok());
    }

    #[test]
    fn local_names_stay_in_directory() {
        assert_eq!(local_file_name("test.pdf"), "test.pdf");
        assert_eq!(local_file_name("2025/spring.pdf"), "2025_spring.pdf");
        assert_eq!(local_file_name(".."), "download.pdf");
    }
}
