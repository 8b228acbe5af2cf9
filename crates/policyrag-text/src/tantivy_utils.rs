use tantivy::schema::{IndexRecordOption, Schema, TextFieldIndexing, TextOptions, FAST, INDEXED, STORED};
use tantivy::tokenizer::{LowerCaser, TextAnalyzer, WhitespaceTokenizer};
use tantivy::Index;

pub const TOKENIZER_NAME: &str = "lower_whitespace";
pub const TEXT_FIELD: &str = "text";
pub const ORD_FIELD: &str = "ord";

/// `ord` is the chunk's position in the persisted chunk list; `text` carries
/// term frequencies and field norms for BM25 but is not stored.
pub fn build_schema() -> Schema {
    let mut schema_builder = Schema::builder();
    schema_builder.add_u64_field(ORD_FIELD, INDEXED | STORED | FAST);
    let text_field_indexing = TextFieldIndexing::default().set_tokenizer(TOKENIZER_NAME).set_index_option(IndexRecordOption::WithFreqs);
    let text_options = TextOptions::default().set_indexing_options(text_field_indexing);
    schema_builder.add_text_field(TEXT_FIELD, text_options);
    schema_builder.build()
}

/// Whitespace split + lowercase, no stemming and no stop words, so index
/// terms line up exactly with [`crate::tokenize`].
pub fn register_tokenizer(index: &Index) {
    let tokenizer = TextAnalyzer::builder(WhitespaceTokenizer::default()).filter(LowerCaser).build();
    index.tokenizers().register(TOKENIZER_NAME, tokenizer);
}
