use crate::error::ValidationError;
use lopdf::Document;

#[derive(Debug, Clone)]
pub struct PageText {
    pub number: u32,
    pub text: String,
}

pub trait PdfExtractor {
    fn page_count(&self, bytes: &[u8]) -> Result<usize, ValidationError>;

    /// Text of every page in page order, blank pages included.
    fn extract_pages(&self, bytes: &[u8]) -> Result<Vec<PageText>, ValidationError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LopdfExtractor;

impl LopdfExtractor {
    fn load(bytes: &[u8]) -> Result<Document, ValidationError> {
        Document::load_mem(bytes).map_err(|error| ValidationError::Unreadable(error.to_string()))
    }
}

impl PdfExtractor for LopdfExtractor {
    fn page_count(&self, bytes: &[u8]) -> Result<usize, ValidationError> {
        Ok(Self::load(bytes)?.get_pages().len())
    }

    fn extract_pages(&self, bytes: &[u8]) -> Result<Vec<PageText>, ValidationError> {
        let document = Self::load(bytes)?;

        let mut pages = Vec::new();
        for (page_no, _page_id) in document.get_pages() {
            let text = document
                .extract_text(&[page_no])
                .map_err(|error| ValidationError::Unreadable(error.to_string()))?;
            pages.push(PageText {
                number: page_no,
                text,
            });
        }

        Ok(pages)
    }
}

pub fn join_pages(pages: &[PageText]) -> String {
    pages.iter().map(|page| page.text.as_str()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn garbage_bytes_are_unreadable() {
        let result = LopdfExtractor.page_count(b"%PDF-1.4\n%broken");
        assert!(matches!(result, Err(ValidationError::Unreadable(_))));
    }

    #[test]
    fn pages_are_joined_in_order_without_separator() {
        let pages = vec![
            PageText {
                number: 1,
                text: "first page\n".to_string(),
            },
            PageText {
                number: 2,
                text: String::new(),
            },
            PageText {
                number: 3,
                text: "third".to_string(),
            },
        ];
        assert_eq!(join_pages(&pages), "first page\nthird");
    }
}
