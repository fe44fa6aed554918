use crate::error::ValidationError;
use crate::extractor::{join_pages, PdfExtractor};
use crate::models::{Document, ValidationLimits};

/// Checks page and word limits and returns the extracted text.
///
/// The page limit is checked before any text is extracted, so an oversized
/// upload is rejected without paying for extraction.
pub fn validate_pdf<E>(
    extractor: &E,
    bytes: &[u8],
    limits: ValidationLimits,
) -> Result<Document, ValidationError>
where
    E: PdfExtractor + ?Sized,
{
    let page_count = extractor.page_count(bytes)?;
    if page_count > limits.max_pages {
        return Err(ValidationError::TooManyPages {
            pages: page_count,
            max: limits.max_pages,
        });
    }

    let text = join_pages(&extractor.extract_pages(bytes)?);
    let word_count = count_words(&text);
    if word_count > limits.max_words {
        return Err(ValidationError::TooManyWords {
            words: word_count,
            max: limits.max_words,
        });
    }

    Ok(Document {
        bytes: bytes.to_vec(),
        text,
        page_count,
        word_count,
    })
}

pub fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}
