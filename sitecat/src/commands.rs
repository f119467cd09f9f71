use crate::CLAP_STYLING;
use crate::handlers::{parse_delay, parse_sitemap_url};
use clap::{arg, command};

pub fn command_argument_builder() -> clap::Command {
    clap::Command::new("sitecat")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("sitecat")
        .styles(CLAP_STYLING)
        .arg(
            arg!(-q --"quiet" "Suppress banner and non-essential output")
                .required(false)
                .global(true),
        )
        .arg(
            arg!(-v --"verbose" "Log more detail to stderr (-v info, -vv debug)")
                .required(false)
                .action(clap::ArgAction::Count)
                .global(true),
        )
        .subcommand_required(false)
        .subcommand(
            command!("export")
                .about(
                    "Walk a shop's sitemap, fetch the product pages and export a catalog of \
                title, price, currency and stock status.",
                )
                .arg(
                    arg!(-u --"url" <URL>)
                        .required(false)
                        .help("Sitemap or sitemap index URL (prompted for when omitted)")
                        .value_parser(parse_sitemap_url),
                )
                .arg(
                    arg!(-m --"marker" <TEXT>)
                        .required(false)
                        .help("Case-sensitive text every product URL contains, e.g. /product/"),
                )
                .arg(
                    arg!(-i --"include" <KEYWORDS>)
                        .required(false)
                        .help("Comma-separated keywords; a URL must contain at least one"),
                )
                .arg(
                    arg!(--"must-include" <KEYWORDS>)
                        .required(false)
                        .help("Comma-separated keywords; a URL must also contain one of these"),
                )
                .arg(
                    arg!(-x --"exclude" <KEYWORDS>)
                        .required(false)
                        .help("Comma-separated keywords; a URL must contain none"),
                )
                .arg(
                    arg!(--"all-stock")
                        .required(false)
                        .help("Keep out-of-stock products (default: in-stock and unknown only)")
                        .action(clap::ArgAction::SetTrue),
                )
                .arg(
                    arg!(-d --"delay" <SECONDS>)
                        .required(false)
                        .help("Delay between product page requests")
                        .value_parser(parse_delay)
                        .default_value("0.2"),
                )
                .arg(
                    arg!(-l --"limit" <NUM_PAGES>)
                        .required(false)
                        .help("Maximum number of product pages to fetch (0: no limit)")
                        .value_parser(clap::value_parser!(usize)),
                )
                .arg(
                    arg!(--"currency" <CODE>)
                        .required(false)
                        .help("Force this currency code for every row instead of detecting it"),
                )
                .arg(
                    arg!(--"phrases" <PATH>)
                        .required(false)
                        .help("JSON stock phrase table, e.g. {\"en\": {\"sold out\": false}}"),
                )
                .arg(
                    arg!(-o --"output-dir" <DIR>)
                        .required(false)
                        .help("Directory for the <domain>_catalog file")
                        .default_value("."),
                )
                .arg(
                    arg!(-f --"format" <FORMAT>)
                        .required(false)
                        .help("Output format: xlsx, csv, json")
                        .value_parser(["xlsx", "csv", "json"])
                        .default_value("xlsx"),
                )
                .arg(
                    arg!(--"timeout" <SECONDS>)
                        .required(false)
                        .help("Request timeout in seconds")
                        .value_parser(clap::value_parser!(u64))
                        .default_value("30"),
                )
                .arg(
                    arg!(--"max-sitemaps" <NUM>)
                        .required(false)
                        .help("Stop resolving after this many sitemap documents")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("500"),
                )
                .arg(
                    arg!(--"max-urls" <NUM>)
                        .required(false)
                        .help("Stop resolving after this many sitemap URLs")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("500000"),
                )
                .arg(
                    arg!(--"interactive")
                        .required(false)
                        .help("Prompt for every setting, using the flags as defaults")
                        .action(clap::ArgAction::SetTrue),
                ),
        )
}
