//! Configuration types for a catalog run.
//!
//! Every knob lives in [`CatalogConfig`], built via its
//! [`CatalogConfigBuilder`] or loaded from a TOML file with
//! [`CatalogConfig::from_file`]. The file mirrors the keys operators already
//! know (`drive_folder_ids.pdf`, `.doc`, `.csv`); everything else is optional.
//!
//! ```toml
//! [drive_folder_ids]
//! pdf = "1AbC..."
//! doc = "1DeF..."
//! csv = "1GhI..."
//!
//! [pipeline]
//! target_pdf = "test.pdf"
//!
//! [llm]
//! model = "gpt-4.1-mini"
//! ```

use crate::error::CatalogError;
use crate::progress::ProgressCallback;
use edgequake_llm::LLMProvider;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Default name of the PDF the run looks for.
pub const DEFAULT_TARGET_PDF: &str = "test.pdf";

/// Default location of the service-account key.
pub const DEFAULT_CREDENTIALS_FILE: &str = "credentials.json";

/// The three Drive folders a run reads from and writes to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriveFolders {
    /// Folder holding the source PDFs; the spreadsheet is moved here too.
    pub pdf: String,
    /// Folder holding the keywords Google Doc.
    pub doc: String,
    /// Folder reserved for CSV exports.
    pub csv: String,
}

/// Configuration for a catalog run.
///
/// # Example
/// ```rust
/// use catalog_sheets::{CatalogConfig, DriveFolders};
///
/// let config = CatalogConfig::builder()
///     .folders(DriveFolders {
///         pdf: "pdf-folder".into(),
///         doc: "doc-folder".into(),
///         csv: "csv-folder".into(),
///     })
///     .target_pdf("spring-2025.pdf")
///     .build()
///     .unwrap();
/// assert_eq!(config.spreadsheet_name(), "spring-2025");
/// ```
#[derive(Clone)]
pub struct CatalogConfig {
    /// Drive folder ids. All three are required.
    pub folders: DriveFolders,

    /// Exact file name of the PDF to process. Default: `test.pdf`.
    ///
    /// Matching is literal; no pattern and no "newest file" logic.
    pub target_pdf: String,

    /// Path of the service-account JSON key. Default: `credentials.json`.
    pub credentials_path: PathBuf,

    /// Directory downloads are written to. Default: the working directory.
    pub download_dir: PathBuf,

    /// Regex locating style numbers in page text. The first capture group is
    /// the style number. If None, uses the built-in pattern.
    pub style_pattern: Option<String>,

    /// Embedded images smaller than this on either side are ignored. Default: 64.
    pub min_image_px: u32,

    /// Cap on images sent to the LLM per style number. Default: 4.
    pub max_images_per_entry: usize,

    /// Longest edge of a rasterised page used when a page has no usable
    /// embedded image. Default: 1600.
    pub max_rendered_pixels: u32,

    /// Explicit pdfium library path. Falls back to the working directory,
    /// then the system library path.
    pub pdfium_lib_path: Option<PathBuf>,

    /// LLM model identifier. If None, uses `gpt-4.1-mini`.
    pub model: Option<String>,

    /// LLM provider name (e.g. "openai", "anthropic", "gemini").
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature. Default: 0.3.
    pub temperature: f32,

    /// Maximum tokens per description. Default: 1024.
    pub max_tokens: usize,

    /// Retries on a failed LLM call. Default: 0.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds, doubled after each attempt. Default: 500.
    pub retry_backoff_ms: u64,

    /// Custom system prompt. If None, uses the built-in prompt.
    pub system_prompt: Option<String>,

    /// Write the table to Google Sheets. `false` is a dry run. Default: true.
    pub publish: bool,

    /// Timeout for each Drive/Sheets/OAuth request in seconds. Default: 300.
    pub api_timeout_secs: u64,

    /// Per-entry progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            folders: DriveFolders::default(),
            target_pdf: DEFAULT_TARGET_PDF.to_string(),
            credentials_path: PathBuf::from(DEFAULT_CREDENTIALS_FILE),
            download_dir: PathBuf::from("."),
            style_pattern: None,
            min_image_px: 64,
            max_images_per_entry: 4,
            max_rendered_pixels: 1600,
            pdfium_lib_path: None,
            model: None,
            provider_name: None,
            provider: None,
            temperature: 0.3,
            max_tokens: 1024,
            max_retries: 0,
            retry_backoff_ms: 500,
            system_prompt: None,
            publish: true,
            api_timeout_secs: 300,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for CatalogConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CatalogConfig")
            .field("folders", &self.folders)
            .field("target_pdf", &self.target_pdf)
            .field("credentials_path", &self.credentials_path)
            .field("download_dir", &self.download_dir)
            .field("style_pattern", &self.style_pattern)
            .field("min_image_px", &self.min_image_px)
            .field("max_images_per_entry", &self.max_images_per_entry)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("max_retries", &self.max_retries)
            .field("publish", &self.publish)
            .finish()
    }
}

impl CatalogConfig {
    /// Create a new builder for `CatalogConfig`.
    pub fn builder() -> CatalogConfigBuilder {
        CatalogConfigBuilder {
            config: Self::default(),
        }
    }

    /// Load and validate a TOML config file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| CatalogError::ConfigRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_toml_str(&text).map_err(|e| match e {
            CatalogError::ConfigParse { detail, .. } => CatalogError::ConfigParse {
                path: path.to_path_buf(),
                detail,
            },
            other => other,
        })
    }

    /// Parse and validate config text.
    pub fn from_toml_str(text: &str) -> Result<Self, CatalogError> {
        let file: ConfigFile = toml::from_str(text).map_err(|e| CatalogError::ConfigParse {
            path: PathBuf::new(),
            detail: e.to_string(),
        })?;
        file.into_builder().build()
    }

    /// Spreadsheet name derived from the target PDF: the file name without
    /// its `.pdf` extension.
    pub fn spreadsheet_name(&self) -> String {
        spreadsheet_name_for(&self.target_pdf)
    }
}

/// Strip a trailing `.pdf` (any case) from a Drive file name.
pub fn spreadsheet_name_for(pdf_filename: &str) -> String {
    let lower = pdf_filename.to_ascii_lowercase();
    if lower.ends_with(".pdf") && pdf_filename.len() > 4 {
        pdf_filename[..pdf_filename.len() - 4].to_string()
    } else {
        pdf_filename.to_string()
    }
}

/// Builder for [`CatalogConfig`].
pub struct CatalogConfigBuilder {
    config: CatalogConfig,
}

impl fmt::Debug for CatalogConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CatalogConfigBuilder")
            .field("config", &self.config)
            .finish()
    }
}

impl CatalogConfigBuilder {
    pub fn folders(mut self, folders: DriveFolders) -> Self {
        self.config.folders = folders;
        self
    }

    pub fn target_pdf(mut self, name: impl Into<String>) -> Self {
        self.config.target_pdf = name.into();
        self
    }

    pub fn credentials_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.credentials_path = path.into();
        self
    }

    pub fn download_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.download_dir = dir.into();
        self
    }

    pub fn style_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.config.style_pattern = Some(pattern.into());
        self
    }

    pub fn min_image_px(mut self, px: u32) -> Self {
        self.config.min_image_px = px;
        self
    }

    pub fn max_images_per_entry(mut self, n: usize) -> Self {
        self.config.max_images_per_entry = n.max(1);
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn pdfium_lib_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_lib_path = Some(path.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    pub fn publish(mut self, v: bool) -> Self {
        self.config.publish = v;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs.max(1);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<CatalogConfig, CatalogError> {
        let c = &self.config;
        for (key, value) in [
            ("drive_folder_ids.pdf", &c.folders.pdf),
            ("drive_folder_ids.doc", &c.folders.doc),
            ("drive_folder_ids.csv", &c.folders.csv),
        ] {
            if value.trim().is_empty() {
                return Err(CatalogError::InvalidConfig(format!("{key} must be set")));
            }
        }
        if c.target_pdf.trim().is_empty() {
            return Err(CatalogError::InvalidConfig(
                "target PDF name must not be empty".into(),
            ));
        }
        if let Some(ref pattern) = c.style_pattern {
            let re = Regex::new(pattern).map_err(|e| {
                CatalogError::InvalidConfig(format!("style_pattern is not a valid regex: {e}"))
            })?;
            if re.captures_len() < 2 {
                return Err(CatalogError::InvalidConfig(
                    "style_pattern needs a capture group for the style number".into(),
                ));
            }
        }
        Ok(self.config)
    }
}

// ── File format ──────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    drive_folder_ids: DriveFolders,
    #[serde(default)]
    pipeline: PipelineSection,
    #[serde(default)]
    llm: LlmSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct PipelineSection {
    target_pdf: Option<String>,
    credentials: Option<PathBuf>,
    download_dir: Option<PathBuf>,
    style_pattern: Option<String>,
    min_image_px: Option<u32>,
    max_images_per_entry: Option<usize>,
    max_rendered_pixels: Option<u32>,
    pdfium_lib_path: Option<PathBuf>,
    api_timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct LlmSection {
    provider: Option<String>,
    model: Option<String>,
    temperature: Option<f32>,
    max_tokens: Option<usize>,
    max_retries: Option<u32>,
    system_prompt: Option<String>,
}

impl ConfigFile {
    fn into_builder(self) -> CatalogConfigBuilder {
        let mut b = CatalogConfig::builder().folders(self.drive_folder_ids);

        let p = self.pipeline;
        if let Some(v) = p.target_pdf {
            b = b.target_pdf(v);
        }
        if let Some(v) = p.credentials {
            b = b.credentials_path(v);
        }
        if let Some(v) = p.download_dir {
            b = b.download_dir(v);
        }
        if let Some(v) = p.style_pattern {
            b = b.style_pattern(v);
        }
        if let Some(v) = p.min_image_px {
            b = b.min_image_px(v);
        }
        if let Some(v) = p.max_images_per_entry {
            b = b.max_images_per_entry(v);
        }
        if let Some(v) = p.max_rendered_pixels {
            b = b.max_rendered_pixels(v);
        }
        if let Some(v) = p.pdfium_lib_path {
            b = b.pdfium_lib_path(v);
        }
        if let Some(v) = p.api_timeout_secs {
            b = b.api_timeout_secs(v);
        }

        let l = self.llm;
        if let Some(v) = l.provider {
            b = b.provider_name(v);
        }
        if let Some(v) = l.model {
            b = b.model(v);
        }
        if let Some(v) = l.temperature {
            b = b.temperature(v);
        }
        if let Some(v) = l.max_tokens {
            b = b.max_tokens(v);
        }
        if let Some(v) = l.max_retries {
            b = b.max_retries(v);
        }
        if let Some(v) = l.system_prompt {
            b = b.system_prompt(v);
        }
        b
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
[drive_folder_ids]
pdf = "pdf-id"
doc = "doc-id"
csv = "csv-id"
"#;

    #[test]
    fn minimal_file_uses_defaults() {
        let c = CatalogConfig::from_toml_str(MINIMAL).unwrap();
        assert_eq!(c.folders.pdf, "pdf-id");
        assert_eq!(c.folders.doc, "doc-id");
        assert_eq!(c.folders.csv, "csv-id");
        assert_eq!(c.target_pdf, "test.pdf");
        assert_eq!(c.credentials_path, PathBuf::from("credentials.json"));
        assert_eq!(c.max_retries, 0);
        assert!(c.publish);
    }

    #[test]
    fn optional_sections_override_defaults() {
        let text = format!(
            "{MINIMAL}\n[pipeline]\ntarget_pdf = \"spring.pdf\"\ndownload_dir = \"downloads\"\n\n\
             [llm]\nprovider = \"anthropic\"\nmodel = \"claude-sonnet-4-20250514\"\ntemperature = 5.0\n"
        );
        let c = CatalogConfig::from_toml_str(&text).unwrap();
        assert_eq!(c.target_pdf, "spring.pdf");
        assert_eq!(c.download_dir, PathBuf::from("downloads"));
        assert_eq!(c.provider_name.as_deref(), Some("anthropic"));
        assert_eq!(c.model.as_deref(), Some("claude-sonnet-4-20250514"));
        assert_eq!(c.temperature, 2.0, "temperature is clamped");
    }

    #[test]
    fn missing_folder_section_is_a_parse_error() {
        let err = CatalogConfig::from_toml_str("[llm]\nmodel = \"x\"\n").unwrap_err();
        assert!(matches!(err, CatalogError::ConfigParse { .. }), "got {err:?}");
    }

    #[test]
    fn empty_folder_id_is_rejected() {
        let text = MINIMAL.replace("\"csv-id\"", "\"\"");
        let err = CatalogConfig::from_toml_str(&text).unwrap_err();
        assert!(err.to_string().contains("drive_folder_ids.csv"), "got {err}");
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let text = format!("{MINIMAL}\n[pipeline]\ntarget = \"x.pdf\"\n");
        assert!(CatalogConfig::from_toml_str(&text).is_err());
    }

    #[test]
    fn style_pattern_needs_capture_group() {
        let err = CatalogConfig::builder()
            .folders(DriveFolders {
                pdf: "a".into(),
                doc: "b".into(),
                csv: "c".into(),
            })
            .style_pattern(r"STYLE\s+\w+")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("capture group"));
    }

    #[test]
    fn from_file_reports_path() {
        let err = CatalogConfig::from_file("/definitely/not/here/catalog.toml").unwrap_err();
        assert!(matches!(err, CatalogError::ConfigRead { .. }));
    }

    #[test]
    fn spreadsheet_name_strips_pdf_extension() {
        assert_eq!(spreadsheet_name_for("test.pdf"), "test");
        assert_eq!(spreadsheet_name_for("Spring 2025.PDF"), "Spring 2025");
        assert_eq!(spreadsheet_name_for("notes.txt"), "notes.txt");
        assert_eq!(spreadsheet_name_for(".pdf"), ".pdf");
    }
}
