use docuchat_core::{
    fingerprint, validate_pdf, LopdfExtractor, PdfExtractor, ValidationError, ValidationLimits,
};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};

fn build_pdf(pages: &[&str]) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });

    let mut kids: Vec<Object> = Vec::new();
    for text in pages {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![72.into(), 720.into()]),
                Operation::new("Tj", vec![Object::string_literal(*text)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    let pages_dict = dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => count,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages_dict));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)?;
    Ok(bytes)
}

#[test]
fn five_page_pdf_is_accepted() -> Result<(), Box<dyn std::error::Error>> {
    let bytes = build_pdf(&["page one", "page two", "page three", "page four", "page five"])?;

    let document = validate_pdf(&LopdfExtractor, &bytes, ValidationLimits::default())?;
    assert_eq!(document.page_count, 5);
    assert!(document.word_count > 0);
    assert!(document.text.contains("page"));
    Ok(())
}

#[test]
fn six_page_pdf_is_rejected_with_its_page_count() -> Result<(), Box<dyn std::error::Error>> {
    let bytes = build_pdf(&["a", "b", "c", "d", "e", "f"])?;

    assert_eq!(LopdfExtractor.page_count(&bytes)?, 6);
    let error = validate_pdf(&LopdfExtractor, &bytes, ValidationLimits::default()).unwrap_err();
    assert_eq!(error.to_string(), "PDF has 6 pages. Maximum allowed is 5.");
    Ok(())
}

#[test]
fn word_limit_applies_to_real_extraction() -> Result<(), Box<dyn std::error::Error>> {
    let bytes = build_pdf(&["one two three four five six"])?;
    let limits = ValidationLimits {
        max_pages: 5,
        max_words: 3,
    };

    let error = validate_pdf(&LopdfExtractor, &bytes, limits).unwrap_err();
    assert!(matches!(error, ValidationError::TooManyWords { max: 3, .. }));
    Ok(())
}

#[test]
fn corrupt_upload_is_a_validation_error() {
    let error = validate_pdf(
        &LopdfExtractor,
        b"%PDF-1.4\n%this is not really a pdf",
        ValidationLimits::default(),
    )
    .unwrap_err();
    assert!(matches!(error, ValidationError::Unreadable(_)));
    assert!(error.to_string().starts_with("Error reading PDF: "));
}

#[test]
fn identical_uploads_share_a_fingerprint() -> Result<(), Box<dyn std::error::Error>> {
    let first = build_pdf(&["same content"])?;
    let second = first.clone();
    assert_eq!(fingerprint(&first), fingerprint(&second));
    Ok(())
}
