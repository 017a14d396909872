/// Number of leading characters of a document sent to the language model.
///
/// Both the field extractor and the compliance analyzer cut the document to
/// this prefix to bound request size. Anything past it is never seen by the
/// model, so long documents are analyzed lossily.
pub const DEFAULT_MAX_INPUT_CHARS: usize = 4000;

/// Return at most `max_chars` leading characters of `text`.
///
/// Counts Unicode scalar values, so the cut never splits a code point.
pub fn document_prefix(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}
