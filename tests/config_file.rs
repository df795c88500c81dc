// tests/config_file.rs
use admission_monitor::config::{AppConfig, NotifierKind, SourceKind};
use admission_monitor::classify::CategoryTable;
use serial_test::serial;
use std::path::Path;

fn shipped() -> AppConfig {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("config/monitor.toml");
    AppConfig::load_from(&path).unwrap()
}

#[test]
#[serial]
fn shipped_config_loads() {
    std::env::remove_var("TELEGRAM_BOT_TOKEN");
    std::env::remove_var("TELEGRAM_CHAT_ID");
    let cfg = shipped();

    assert_eq!(cfg.sources.len(), 2);
    assert_eq!(cfg.sources[0].id, "adiga");
    assert_eq!(cfg.sources[0].kind, SourceKind::Board);
    let board = cfg.sources[0].board.as_ref().unwrap();
    assert!(board.fetch_detail);
    assert_eq!(board.id_pattern.as_deref(), Some(r"fnDetailPopup\('(\d+)'\)"));
    assert!(!cfg.sources[1].enabled);

    assert_eq!(cfg.notifier.kind, NotifierKind::Telegram);
    // unresolved secrets leave telegram unconfigured
    assert!(!cfg.notifier.telegram.is_configured());
}

#[test]
#[serial]
fn shipped_categories_classify() {
    let table = CategoryTable::from_config(&shipped());
    assert_eq!(table.len(), 4);
    assert_eq!(table.get("music").unwrap().emoji, "🎵");

    let c = table.classify("[서울음악대학교] 2026학년도 실용음악과 신입생 모집", "보컬 작곡 전공");
    assert_eq!(c.category, "music");
    let c = table.classify("영어영문학과 수시 면접 일정", "");
    assert_eq!(c.category, "english");
    let c = table.classify("기숙사 입사 신청 안내", "");
    assert_eq!(c.category, "general");
}

#[test]
#[serial]
fn env_secrets_are_resolved() {
    std::env::set_var("TELEGRAM_BOT_TOKEN", "123:abc");
    std::env::set_var("TELEGRAM_CHAT_ID", "-1001");
    let cfg = shipped();
    std::env::remove_var("TELEGRAM_BOT_TOKEN");
    std::env::remove_var("TELEGRAM_CHAT_ID");

    assert_eq!(cfg.notifier.telegram.bot_token, "123:abc");
    assert_eq!(cfg.notifier.telegram.chat_id, "-1001");
    assert!(cfg.notifier.telegram.is_configured());
}
