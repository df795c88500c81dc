// tests/normalize_pages.rs
use admission_monitor::config::NormalizerConfig;
use admission_monitor::normalize::{ContentNormalizer, ExtractionMethod};

const ADIGA_DETAIL: &str = include_str!("fixtures/adiga_detail.html");
const CONTAINER_PAGE: &str = include_str!("fixtures/notice_page_container.html");
const META_ONLY_PAGE: &str = include_str!("fixtures/notice_page_meta_only.html");

#[test]
fn portal_detail_page_uses_hidden_field() {
    let out = ContentNormalizer::default().normalize(ADIGA_DETAIL);
    assert_eq!(out.method, Some(ExtractionMethod::HiddenField));
    assert!(out.text.starts_with("서울음악대학교 실용음악과는 2026학년도 신입생을"));
    assert!(out.text.contains("모집 전공: 보컬, 기타, 베이스, 드럼, 작곡"));
    assert!(out.text.ends_with("9월 12일까지"));
    // embedded script and the popup placeholder never leak into the text
    assert!(!out.text.contains("trackView"));
    assert!(!out.text.contains("자바스크립트"));
    assert!(!out.text.contains('<'));
}

#[test]
fn board_page_uses_container_without_chrome() {
    let out = ContentNormalizer::default().normalize(CONTAINER_PAGE);
    assert_eq!(out.method, Some(ExtractionMethod::Container));
    assert!(out.text.starts_with("2026학년도 국어국문학과 정시 모집 안내"));
    assert!(out.text.contains("수능 100%로 선발합니다."));
    assert!(!out.text.contains("color:red"));
    assert!(!out.text.contains("Copyright"));
    assert!(!out.text.contains("공지사항"));
}

#[test]
fn script_only_page_falls_back_to_metadata() {
    let out = ContentNormalizer::default().normalize(META_ONLY_PAGE);
    assert_eq!(out.method, Some(ExtractionMethod::Metadata));
    assert_eq!(
        out.text,
        "영어영문학과 대학원 입학 설명회 영어영문학과 대학원 신입생 입학 설명회를 10월 15일 인문관 대강당에서 개최합니다. 사전 신청 필수."
    );
}

#[test]
fn custom_container_order_is_respected() {
    let cfg = NormalizerConfig {
        container_selectors: vec!["footer".to_string(), ".board-view".to_string()],
        min_length: 5,
        ..NormalizerConfig::default()
    };
    let out = ContentNormalizer::from_config(&cfg)
        .unwrap()
        .normalize(CONTAINER_PAGE);
    assert_eq!(out.method, Some(ExtractionMethod::Container));
    assert_eq!(out.text, "Copyright 한국대학교");
}

#[test]
fn configured_boilerplate_is_removed() {
    let cfg = NormalizerConfig {
        boilerplate_patterns: vec![r"\s*자세한 사항은 .*$".to_string()],
        ..NormalizerConfig::default()
    };
    let out = ContentNormalizer::from_config(&cfg)
        .unwrap()
        .normalize(CONTAINER_PAGE);
    assert!(out.text.ends_with("수능 100%로 선발합니다."));
}

#[test]
fn plain_preview_passes_through() {
    let preview = "[대학신문=김기자 기자] 2026학년도 음악대학 실용음악과 및 성악과 실기고사 일정을 안내합니다. 수험생은 고사 당일 신분증을 지참하시기 바랍니다.";
    let out = ContentNormalizer::default().normalize(preview);
    assert_eq!(out.method, Some(ExtractionMethod::PassThrough));
    assert!(out.text.starts_with("2026학년도 음악대학"));
}
