pub mod export;
pub mod synthesize;

pub use export::{export_pdf, REPORT_TITLE};
pub use synthesize::synthesize;
