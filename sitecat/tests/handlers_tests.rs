use sitecat::command_argument_builder;
use sitecat::handlers::*;
use sitecat_core::ExportFormat;
use std::collections::VecDeque;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::NamedTempFile;

fn export_args(argv: &[&str]) -> ExportArgs {
    let mut full = vec!["sitecat", "export"];
    full.extend_from_slice(argv);
    let matches = command_argument_builder()
        .try_get_matches_from(full)
        .unwrap();
    let (_, sub_matches) = matches.subcommand().unwrap();
    ExportArgs::from_matches(sub_matches)
}

/// Feeds canned answers to the prompts, in order.
fn answers(list: &[&str]) -> impl FnMut(&str) -> anyhow::Result<String> {
    let mut queue: VecDeque<String> = list.iter().map(|s| s.to_string()).collect();
    move |_question: &str| Ok(queue.pop_front().unwrap_or_default())
}

// ============================================================================
// Argument Parser Tests
// ============================================================================

#[test]
fn test_parse_sitemap_url_with_scheme() {
    assert_eq!(
        parse_sitemap_url("https://shop.nl/sitemap.xml"),
        Ok("https://shop.nl/sitemap.xml".to_string())
    );
}

#[test]
fn test_parse_sitemap_url_without_scheme() {
    assert_eq!(
        parse_sitemap_url("  shop.nl/sitemap_index.xml "),
        Ok("https://shop.nl/sitemap_index.xml".to_string())
    );
}

#[test]
fn test_parse_sitemap_url_invalid() {
    assert!(parse_sitemap_url("").is_err());
    assert!(parse_sitemap_url("ftp://shop.nl/sitemap.xml").is_err());
    assert!(parse_sitemap_url("https://").is_err());
}

#[test]
fn test_parse_delay() {
    assert_eq!(parse_delay("0"), Ok(Duration::ZERO));
    assert_eq!(parse_delay("1.5"), Ok(Duration::from_millis(1500)));
    assert!(parse_delay("-1").is_err());
    assert!(parse_delay("NaN").is_err());
    assert!(parse_delay("inf").is_err());
    assert!(parse_delay("soon").is_err());
}

#[test]
fn test_parse_limit() {
    assert_eq!(parse_limit(""), Ok(None));
    assert_eq!(parse_limit("0"), Ok(None));
    assert_eq!(parse_limit("25"), Ok(Some(25)));
    assert!(parse_limit("-3").is_err());
}

#[test]
fn test_level_for() {
    assert_eq!(level_for(0), "warn");
    assert_eq!(level_for(1), "info");
    assert_eq!(level_for(2), "debug");
    assert_eq!(level_for(7), "debug");
}

#[test]
fn test_init_tracing_twice_keeps_first_subscriber() {
    init_tracing(0);
    init_tracing(2);
    assert!(tracing::dispatcher::has_been_set());
}

// ============================================================================
// Export Argument Tests
// ============================================================================

#[test]
fn test_export_defaults() {
    let args = export_args(&[]);
    assert_eq!(args.sitemap_url, None);
    assert_eq!(args.marker, None);
    assert!(args.include.is_empty());
    assert!(args.keep_only_in_stock);
    assert_eq!(args.delay, Duration::from_secs_f64(0.2));
    assert_eq!(args.limit, None);
    assert_eq!(args.format, ExportFormat::Xlsx);
    assert_eq!(args.output_dir, PathBuf::from("."));
    assert_eq!(args.timeout_secs, 30);
    assert_eq!(args.max_sitemaps, 500);
    assert_eq!(args.max_urls, 500_000);
}

#[test]
fn test_export_flags() {
    let args = export_args(&[
        "-u",
        "shop.nl/sitemap.xml",
        "-m",
        "/product/",
        "-i",
        "frezen, frees",
        "--must-include",
        "VHM",
        "-x",
        "blog,news",
        "--all-stock",
        "-d",
        "1",
        "-l",
        "0",
        "--currency",
        "eur",
        "-f",
        "csv",
    ]);

    assert_eq!(args.sitemap_url.as_deref(), Some("https://shop.nl/sitemap.xml"));
    assert_eq!(args.marker.as_deref(), Some("/product/"));
    assert_eq!(args.include, vec!["frezen", "frees"]);
    assert_eq!(args.must_include, vec!["VHM"]);
    assert_eq!(args.exclude, vec!["blog", "news"]);
    assert!(!args.keep_only_in_stock);
    assert_eq!(args.delay, Duration::from_secs(1));
    assert_eq!(args.limit, None);
    assert_eq!(args.currency.as_deref(), Some("EUR"));
    assert_eq!(args.format, ExportFormat::Csv);
}

#[test]
fn test_export_rejects_negative_delay() {
    let result = command_argument_builder().try_get_matches_from(["sitecat", "export", "-d", "-2"]);
    assert!(result.is_err());
}

#[test]
fn test_export_rejects_unknown_format() {
    let result =
        command_argument_builder().try_get_matches_from(["sitecat", "export", "-f", "pdf"]);
    assert!(result.is_err());
}

#[test]
fn test_filter_must_include_from_args() {
    let args = export_args(&["-i", "frezen", "--must-include", "vhm"]);
    let filter = args.filter();
    assert!(filter.matches("https://shop.nl/product/vhm-frezen"));
    assert!(!filter.matches("https://shop.nl/product/frezen-hss"));
}

#[test]
fn test_filter_from_args() {
    let args = export_args(&["-m", "/product/", "-i", "frezen", "-x", "blog"]);
    let filter = args.filter();
    assert!(filter.matches("https://shop.nl/product/frezen-1"));
    assert!(!filter.matches("https://shop.nl/blog/frezen"));
    assert!(!filter.matches("https://shop.nl/product/other"));
}

// ============================================================================
// Prompt Tests
// ============================================================================

#[test]
fn test_prompt_url_keeps_flag_value_on_empty_answer() {
    let mut args = export_args(&["-u", "https://shop.nl/sitemap.xml"]);
    args.prompt_url(answers(&[""])).unwrap();
    assert_eq!(args.sitemap_url.as_deref(), Some("https://shop.nl/sitemap.xml"));
}

#[test]
fn test_prompt_url_requires_a_value() {
    let mut args = export_args(&[]);
    assert!(args.prompt_url(answers(&[""])).is_err());
}

#[test]
fn test_prompt_all_answers() {
    let mut args = export_args(&[]);
    args.prompt_all(answers(&[
        "https://www.shop.nl/sitemap.xml",
        "/product/",
        "frezen,frees",
        "vhm",
        "blog",
        "n",
        "0.5",
        "10",
        "eur",
    ]))
    .unwrap();

    assert_eq!(args.sitemap_url.as_deref(), Some("https://www.shop.nl/sitemap.xml"));
    assert_eq!(args.marker.as_deref(), Some("/product/"));
    assert_eq!(args.include, vec!["frezen", "frees"]);
    assert_eq!(args.must_include, vec!["vhm"]);
    assert_eq!(args.exclude, vec!["blog"]);
    assert!(!args.keep_only_in_stock);
    assert_eq!(args.delay, Duration::from_millis(500));
    assert_eq!(args.limit, Some(10));
    assert_eq!(args.currency.as_deref(), Some("EUR"));
}

#[test]
fn test_prompt_all_empty_answers_keep_flags() {
    let mut args = export_args(&["-u", "https://shop.nl/sitemap.xml", "-m", "/p/", "-l", "5"]);
    let before = args.clone();
    args.prompt_all(answers(&[])).unwrap();
    assert_eq!(args, before);
}

#[test]
fn test_prompt_all_rejects_bad_delay() {
    let mut args = export_args(&["-u", "https://shop.nl/sitemap.xml"]);
    let result = args.prompt_all(answers(&["", "", "", "", "", "", "later"]));
    assert!(result.is_err());
}

// ============================================================================
// Option Building Tests
// ============================================================================

#[test]
fn test_into_options_requires_url() {
    assert!(export_args(&[]).into_options().is_err());
}

#[test]
fn test_into_options_carries_settings() {
    let args = export_args(&["-u", "https://shop.nl/sitemap.xml", "-l", "3", "--timeout", "5"]);
    let options = args.into_options().unwrap();
    assert_eq!(options.sitemap_url, "https://shop.nl/sitemap.xml");
    assert_eq!(options.max_pages, Some(3));
    assert_eq!(options.timeout_secs, 5);
    assert!(options.keep_only_in_stock);
}

#[test]
fn test_into_options_loads_phrases() -> Result<(), Box<dyn std::error::Error>> {
    let mut file = NamedTempFile::new()?;
    writeln!(file, r#"{{"de": {{"ausverkauft": false, "auf lager": true}}}}"#)?;

    let path = file.path().to_string_lossy().to_string();
    let args = export_args(&["-u", "https://shop.de/sitemap.xml", "--phrases", &path]);
    let options = args.into_options()?;

    assert_eq!(options.phrases.classify("leider ausverkauft"), Some(false));
    assert_eq!(options.phrases.classify("sold out"), None);
    Ok(())
}

#[test]
fn test_into_options_missing_phrase_file() {
    let args = export_args(&[
        "-u",
        "https://shop.nl/sitemap.xml",
        "--phrases",
        "/nonexistent/phrases.json",
    ]);
    let err = args.into_options().unwrap_err();
    assert!(err.to_string().contains("Failed to load stock phrases"));
}
