//! pdfdiff-export: Pure report serializers (sans-IO)
//!
//! Turns comparison results into shareable artifacts: PNG bytes and data
//! URIs for overlays, heat maps, and masks, and a self-contained HTML
//! report. Every function returns bytes or a `String`; writing them out
//! is the caller's business.

pub mod html;
pub mod png;

pub use html::{HtmlReport, ReportMetadata, html_escape};
pub use png::{ExportError, encode_png, png_data_uri, themed_mask_png};
