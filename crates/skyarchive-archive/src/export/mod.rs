//! Export writers. Both are no-ops when there is nothing to export.

mod csv;
mod html;

pub use self::csv::{write_csv, CSV_COLUMNS};
pub use self::html::{escape_html, render_document, write_html};
