//! Pipeline stages for turning a line-sheet PDF into a product table.
//!
//! Each submodule implements exactly one step. The steps that talk to the
//! outside world sit behind traits ([`crate::google::DriveApi`],
//! [`extract::PdfExtractor`], [`describe::DescriptionGenerator`]) so the
//! orchestration in [`crate::run`] can be exercised with fakes.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ extract ──▶ entries ──▶ describe ──▶ tabulate ──▶ publish
//! (check)   (pdfium)    (group)     (LLM)        (8 cols)     (Sheets)
//!                                     ▲
//!                         keywords ───┘
//!                         (Drive doc)
//! ```
//!
//! 1. [`input`]: check the downloaded file exists and is a PDF
//! 2. [`extract`]: page text and images; runs in `spawn_blocking` because
//!    pdfium is not async-safe
//! 3. [`encode`]: PNG-encode and base64-wrap each image for the request body
//! 4. [`entries`]: find style numbers and group images under them
//! 5. [`keywords`]: optional brand keywords from the doc folder
//! 6. [`describe`]: one vision request per entry, reply parsed to JSON
//! 7. [`tabulate`]: reindex to the fixed columns, fill gaps with `N/A`
//! 8. [`publish`]: find or create the spreadsheet, clear, write

pub mod describe;
pub mod encode;
pub mod entries;
pub mod extract;
pub mod input;
pub mod keywords;
pub mod publish;
pub mod tabulate;
