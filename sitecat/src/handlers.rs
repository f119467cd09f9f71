use anyhow::{Context, Result, anyhow, bail};
use clap::ArgMatches;
use colored::Colorize;
use sitecat_core::sink::ExportFormat;
use sitecat_core::{ExportOptions, ExportSummary, execute_export, generate_export_report};
use sitecat_scanner::filter::parse_keyword_list;
use sitecat_scanner::sitemap::{DEFAULT_MAX_SITEMAPS, DEFAULT_MAX_URLS};
use sitecat_scanner::{StockPhrases, UrlFilter};
use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use url::Url;

// Argument parsers shared by clap and the interactive prompts

/// Accept a full URL or a bare `host/path`, which is assumed to be https.
pub fn parse_sitemap_url(raw: &str) -> Result<String, String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err("No sitemap URL provided".to_string());
    }

    let candidate = if raw.contains("://") {
        raw.to_string()
    } else {
        format!("https://{}", raw)
    };
    let parsed =
        Url::parse(&candidate).map_err(|e| format!("Invalid sitemap URL '{}': {}", raw, e))?;

    if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
        return Err(format!("Invalid sitemap URL '{}': expected http(s)://host/...", raw));
    }
    Ok(parsed.to_string())
}

pub fn parse_delay(raw: &str) -> Result<Duration, String> {
    let seconds: f64 = raw
        .trim()
        .parse()
        .map_err(|_| format!("Invalid delay '{}': expected seconds, e.g. 0.5", raw))?;
    if !seconds.is_finite() || seconds < 0.0 {
        return Err(format!("Invalid delay '{}': must be zero or more seconds", raw));
    }
    Ok(Duration::from_secs_f64(seconds))
}

/// Empty or `0` means no limit.
pub fn parse_limit(raw: &str) -> Result<Option<usize>, String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    let limit: usize = raw
        .parse()
        .map_err(|_| format!("Invalid limit '{}': expected a whole number", raw))?;
    Ok(Some(limit).filter(|l| *l > 0))
}

pub fn level_for(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    }
}

/// Logs go to stderr so they don't interleave with the progress spinner.
/// `RUST_LOG` wins unless `-v` was given.
pub fn init_tracing(verbosity: u8) {
    let filter = if verbosity == 0 {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    } else {
        let level = level_for(verbosity);
        EnvFilter::new(format!(
            "warn,sitecat={level},sitecat_core={level},sitecat_scanner={level}"
        ))
    };

    if let Err(e) = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init()
    {
        debug!("Tracing subscriber already installed: {}", e);
    }
}

/// Export settings as collected from flags and prompts, before any file is read.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportArgs {
    pub sitemap_url: Option<String>,
    pub marker: Option<String>,
    pub include: Vec<String>,
    pub must_include: Vec<String>,
    pub exclude: Vec<String>,
    pub keep_only_in_stock: bool,
    pub delay: Duration,
    pub limit: Option<usize>,
    pub currency: Option<String>,
    pub phrases: Option<PathBuf>,
    pub output_dir: PathBuf,
    pub format: ExportFormat,
    pub timeout_secs: u64,
    pub max_sitemaps: usize,
    pub max_urls: usize,
}

impl ExportArgs {
    pub fn from_matches(args: &ArgMatches) -> Self {
        let expand = |raw: &String| PathBuf::from(shellexpand::tilde(raw).as_ref());

        Self {
            sitemap_url: args.get_one::<String>("url").cloned(),
            marker: args
                .get_one::<String>("marker")
                .map(|m| m.trim().to_string())
                .filter(|m| !m.is_empty()),
            include: args
                .get_one::<String>("include")
                .map(|raw| parse_keyword_list(raw))
                .unwrap_or_default(),
            must_include: args
                .get_one::<String>("must-include")
                .map(|raw| parse_keyword_list(raw))
                .unwrap_or_default(),
            exclude: args
                .get_one::<String>("exclude")
                .map(|raw| parse_keyword_list(raw))
                .unwrap_or_default(),
            keep_only_in_stock: !args.get_flag("all-stock"),
            delay: args.get_one::<Duration>("delay").copied().unwrap_or_default(),
            limit: args.get_one::<usize>("limit").copied().filter(|l| *l > 0),
            currency: args
                .get_one::<String>("currency")
                .map(|c| c.trim().to_uppercase())
                .filter(|c| !c.is_empty()),
            phrases: args.get_one::<String>("phrases").map(expand),
            output_dir: args
                .get_one::<String>("output-dir")
                .map(expand)
                .unwrap_or_else(|| PathBuf::from(".")),
            format: args
                .get_one::<String>("format")
                .and_then(|f| ExportFormat::from_str(f))
                .unwrap_or_default(),
            timeout_secs: args
                .get_one::<u64>("timeout")
                .copied()
                .unwrap_or(sitecat_scanner::fetcher::DEFAULT_TIMEOUT_SECS),
            max_sitemaps: args
                .get_one::<usize>("max-sitemaps")
                .copied()
                .unwrap_or(DEFAULT_MAX_SITEMAPS),
            max_urls: args
                .get_one::<usize>("max-urls")
                .copied()
                .unwrap_or(DEFAULT_MAX_URLS),
        }
    }

    /// Ask for the sitemap URL. An empty answer keeps the current one, if any.
    pub fn prompt_url<F>(&mut self, mut ask: F) -> Result<()>
    where
        F: FnMut(&str) -> Result<String>,
    {
        let answer = ask("Enter sitemap URL (e.g. https://shop.com/sitemap.xml):")?;
        if !answer.is_empty() {
            self.sitemap_url = Some(parse_sitemap_url(&answer).map_err(|e| anyhow!(e))?);
        }
        if self.sitemap_url.is_none() {
            bail!("No sitemap URL provided");
        }
        Ok(())
    }

    /// Ask for every setting in turn. An empty answer keeps the current value.
    pub fn prompt_all<F>(&mut self, mut ask: F) -> Result<()>
    where
        F: FnMut(&str) -> Result<String>,
    {
        self.prompt_url(&mut ask)?;

        let answer = ask("Product URL marker (e.g. /product/ or /a-). Enter to skip:")?;
        if !answer.is_empty() {
            self.marker = Some(answer);
        }

        let answer =
            ask("Include keywords (comma-separated; URL must contain ANY). Enter to skip:")?;
        if !answer.is_empty() {
            self.include = parse_keyword_list(&answer);
        }

        let answer =
            ask("Must ALSO contain ANY of these keywords (comma-separated). Enter to skip:")?;
        if !answer.is_empty() {
            self.must_include = parse_keyword_list(&answer);
        }

        let answer = ask("Exclude keywords (comma-separated, e.g. blog,news,account). Enter to skip:")?;
        if !answer.is_empty() {
            self.exclude = parse_keyword_list(&answer);
        }

        let answer = ask("Keep ONLY in-stock products? [Y/n]:")?.to_lowercase();
        match answer.as_str() {
            "n" | "no" => self.keep_only_in_stock = false,
            "y" | "yes" => self.keep_only_in_stock = true,
            _ => {}
        }

        let answer = ask(&format!(
            "Delay between product page requests in seconds (default {}):",
            self.delay.as_secs_f64()
        ))?;
        if !answer.is_empty() {
            self.delay = parse_delay(&answer).map_err(|e| anyhow!(e))?;
        }

        let answer = ask("Limit the number of product pages to fetch (Enter for no limit):")?;
        if !answer.is_empty() {
            self.limit = parse_limit(&answer).map_err(|e| anyhow!(e))?;
        }

        let answer = ask("Force currency code in output? (e.g. EUR) Enter to auto-detect:")?;
        if !answer.is_empty() {
            self.currency = Some(answer.to_uppercase());
        }

        Ok(())
    }

    pub fn filter(&self) -> UrlFilter {
        UrlFilter::new()
            .with_marker(self.marker.clone())
            .with_include(&self.include)
            .with_must_include(&self.must_include)
            .with_exclude(&self.exclude)
    }

    /// Load the phrase table and build the run configuration.
    pub fn into_options(self) -> Result<ExportOptions> {
        let sitemap_url = self
            .sitemap_url
            .clone()
            .ok_or_else(|| anyhow!("No sitemap URL provided"))?;

        let phrases = match self.phrases {
            Some(ref path) => StockPhrases::load(path)
                .with_context(|| format!("Failed to load stock phrases from {}", path.display()))?,
            None => StockPhrases::default(),
        };

        let mut options = ExportOptions::new(sitemap_url);
        options.filter = self.filter();
        options.keep_only_in_stock = self.keep_only_in_stock;
        options.delay = self.delay;
        options.max_pages = self.limit;
        options.phrases = phrases;
        options.currency_override = self.currency;
        options.output_dir = self.output_dir;
        options.format = self.format;
        options.timeout_secs = self.timeout_secs;
        options.max_sitemaps = self.max_sitemaps;
        options.max_urls = self.max_urls;
        Ok(options)
    }
}

fn print_divider() {
    println!("{}", "═".repeat(60).bright_blue().bold());
}

fn print_prompt(msg: &str) -> Result<String> {
    print!("{} ", msg.bright_cyan().bold());
    io::stdout().flush()?;
    let mut response = String::new();
    io::stdin()
        .read_line(&mut response)
        .context("Failed to read from stdin")?;
    Ok(response.trim().to_string())
}

fn print_sitemap_hints() {
    println!("{}", "How to find a sitemap URL:".bright_white().bold());
    println!("  {} Try: https://example.com/sitemap.xml", "1)".blue());
    println!(
        "  {} Or check: https://example.com/robots.txt (look for 'Sitemap: ...')",
        "2)".blue()
    );
    println!("  {} Some sites use an index: sitemap_index.xml", "3)".blue());
    println!();
}

fn or_none(values: &[String]) -> String {
    if values.is_empty() {
        "none".to_string()
    } else {
        values.join(", ")
    }
}

fn print_export_plan(args: &ExportArgs) {
    print_divider();
    println!("{}", "  SITEMAP CATALOG EXPORT".bright_white().bold());
    print_divider();
    println!();

    let url = args.sitemap_url.as_deref().unwrap_or("-");
    println!("{} Sitemap: {}", "→".blue(), url.bright_white());
    println!("{} Marker: {}", "→".blue(), args.marker.as_deref().unwrap_or("none"));
    println!("{} Include: {}", "→".blue(), or_none(&args.include));
    if !args.must_include.is_empty() {
        println!("{} Must include: {}", "→".blue(), or_none(&args.must_include));
    }
    println!("{} Exclude: {}", "→".blue(), or_none(&args.exclude));
    println!(
        "{} Stock: {}",
        "→".blue(),
        if args.keep_only_in_stock {
            "in-stock and unknown only"
        } else {
            "all"
        }
    );
    println!("{} Delay: {}s", "→".blue(), args.delay.as_secs_f64());
    match args.limit {
        Some(limit) => println!("{} Limit: {} pages", "→".blue(), limit),
        None => println!("{} Limit: none", "→".blue()),
    }
    if let Some(ref currency) = args.currency {
        println!("{} Currency: {}", "→".blue(), currency);
    }
    println!();
}

fn print_export_outcome(summary: &ExportSummary) {
    if !summary.has_candidates() {
        println!();
        println!("{}", "No URLs matched your filters.".yellow().bold());
        println!("Try relaxing filters (remove include keywords, remove product marker, etc.).");
        return;
    }

    println!("\n{} Export complete!\n", "✓".green().bold());
    print!("{}", generate_export_report(summary));

    if let Some(ref path) = summary.output {
        println!(
            "\n{} Catalog saved: {}",
            "✓".green().bold(),
            path.display().to_string().bright_white()
        );
    }
    if summary.page_errors > 0 {
        println!(
            "{} {} pages had errors (run with -v for details)",
            "⚠".yellow().bold(),
            summary.page_errors
        );
    }
}

pub async fn handle_export(sub_matches: &ArgMatches, quiet: bool) -> Result<()> {
    init_tracing(sub_matches.get_count("verbose"));

    let mut export_args = ExportArgs::from_matches(sub_matches);

    if sub_matches.get_flag("interactive") {
        print_sitemap_hints();
        export_args.prompt_all(print_prompt)?;
    } else if export_args.sitemap_url.is_none() {
        if !io::stdin().is_terminal() {
            bail!("--url is required when stdin is not a terminal");
        }
        print_sitemap_hints();
        export_args.prompt_url(print_prompt)?;
    }

    if !quiet {
        print_export_plan(&export_args);
    }

    let mut options = export_args.into_options()?;
    options.show_progress_bars = !quiet;
    info!("Starting export from {}", options.sitemap_url);

    let progress_callback: Option<sitecat_core::ExportProgressCallback> = if quiet {
        None
    } else {
        Some(Arc::new(|msg: String| {
            println!("{} {}", "→".blue(), msg);
        }))
    };

    let summary = execute_export(options, progress_callback)
        .await
        .context("Export failed")?;

    if quiet {
        if let Some(ref path) = summary.output {
            println!("{}", path.display());
        }
    } else {
        print_export_outcome(&summary);
    }

    Ok(())
}
