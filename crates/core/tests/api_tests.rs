//! Library API integration tests
use rstest::rstest;
use siphon_core::*;

fn get_fixture_path(name: &str) -> String {
    format!("../../tests/fixtures/{}", name)
}

fn read_fixture(name: &str) -> String {
    std::fs::read_to_string(get_fixture_path(name)).unwrap()
}

fn extract_fixture(name: &str) -> Result<ExtractionResult> {
    let sanitized = Sanitizer::new().sanitize(&read_fixture(name));
    ContentExtractor::default().extract(&sanitized, "https://www.railreview.example/night-trains", 200)
}

#[test]
fn test_article_fields() {
    let result = extract_fixture("article.html").expect("should extract");

    assert_eq!(result.title, "Night Trains Are Back");
    assert!(result.excerpt.starts_with("Sleeper services are returning"));
    assert_eq!(result.site_name.as_deref(), Some("The Rail Review"));
    assert_eq!(result.lang.as_deref(), Some("en-GB"));
    assert_eq!(result.url, "https://www.railreview.example/night-trains");
    assert_eq!(result.status_code, 200);
    assert!(result.text_content.contains("the overnight train looked like a relic"));
    assert!(!result.text_content.contains("Strike calendar"));
}

#[test]
fn test_article_images_and_cover() {
    let result = extract_fixture("article.html").unwrap();

    assert_eq!(
        result.images,
        vec![
            "https://cdn.railreview.example/photos/platform.jpg",
            "https://cdn.railreview.example/photos/compartment.jpg",
        ]
    );
    assert_eq!(result.cover.as_deref(), Some("https://cdn.railreview.example/covers/night-train.jpg"));
}

#[test]
fn test_article_links_neutralized() {
    let result = extract_fixture("article.html").unwrap();
    let content = Document::parse_fragment(&result.content);

    for anchor in content.select("a").unwrap() {
        let href = anchor.attr("href").unwrap_or_default();
        assert!(sanitize::is_http_url(href), "non-http link survived: {href}");
    }
    assert!(result.content.contains("https://transport.example.eu/reports/2024"));
    assert!(result.text_content.contains("yield management"));
}

#[test]
fn test_article_attributes_stripped() {
    let result = extract_fixture("article.html").unwrap();
    assert!(!result.content.contains("class="));
    assert!(!result.content.contains("data-src"));
    assert!(!result.content.contains("alt="));
}

#[test]
fn test_relative_images_removed() {
    let result = extract_fixture("relative_images.html").unwrap();

    assert!(result.images.is_empty());
    assert_eq!(result.cover, None);
    assert!(!result.content.contains("<img"));
    assert!(result.text_content.contains("broad beans went in early"));
}

#[test]
fn test_empty_content_fails() {
    let result = extract_fixture("empty_content.html");
    assert!(matches!(result, Err(SiphonError::NoContent | SiphonError::NotReadable { .. })));
}

#[rstest]
#[case("article.html", true)]
#[case("relative_images.html", true)]
#[case("empty_content.html", false)]
fn test_is_probably_readable(#[case] fixture: &str, #[case] expected: bool) {
    assert_eq!(is_probably_readable(&read_fixture(fixture)), expected);
}

#[test]
fn test_sanitize_is_idempotent_on_fixture() {
    let sanitizer = Sanitizer::new();
    let once = sanitizer.sanitize(&read_fixture("article.html"));
    let twice = sanitizer.sanitize(&once);
    assert_eq!(once, twice);
}

#[test]
fn test_code_block_tagged_in_fixture() {
    let sanitized = Sanitizer::new().sanitize(&read_fixture("article.html"));
    let doc = Document::parse(&sanitized).unwrap();
    let code = doc.select("pre > code").unwrap();

    assert_eq!(code.len(), 1);
    assert_eq!(code[0].attr("language"), Some("javascript"));
}

#[rstest]
#[case(true)]
#[case(false)]
fn test_extraction_independent_of_detector(#[case] detect_languages: bool) {
    let sanitizer = if detect_languages { Sanitizer::new() } else { Sanitizer::with_detector(NoopDetector) };
    let sanitized = sanitizer.sanitize(&read_fixture("article.html"));
    let result = ContentExtractor::default().extract(&sanitized, "https://example.com/", 200).unwrap();
    assert_eq!(result.title, "Night Trains Are Back");
}

#[test]
fn test_parse_with_url() {
    let article = parse_with_url(&read_fixture("article.html"), "https://www.railreview.example/night-trains")
        .expect("should parse");
    assert_eq!(article.source_url.as_deref(), Some("https://www.railreview.example/night-trains"));
    assert_eq!(article.metadata.byline.as_deref(), Some("Ines Varga"));
}

#[test]
fn test_parse_with_invalid_url() {
    let result = parse_with_url(&read_fixture("article.html"), "not a url");
    assert!(matches!(result, Err(SiphonError::InvalidInput(_))));
}

#[test]
fn test_result_json_shape() {
    let result = extract_fixture("article.html").unwrap();
    let json = serde_json::to_value(&result).unwrap();

    assert_eq!(json["cover"], "https://cdn.railreview.example/covers/night-train.jpg");
    assert_eq!(json["statusCode"], 200);
    assert!(json["textContent"].as_str().unwrap().split("  ").count() == 1);
    assert!(json["images"].as_array().unwrap().iter().all(|i| i.as_str().unwrap().starts_with("https://")));
}
