pub mod field_extractor;
pub mod providers;

pub use field_extractor::{build_field_prompt, StructuredFieldExtractor};
pub use providers::mock::MockProvider;
pub use providers::openai::OpenAiProvider;
