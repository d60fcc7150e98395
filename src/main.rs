use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

use repo_scan::config;
use repo_scan::credentials::{Credentials, CredentialsProvider, StaticCredentials};
use repo_scan::github::GithubClient;
use repo_scan::report::{self, ReportFormat};
use repo_scan::scan::Scanner;
use repo_scan::targets;

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Scan accounts' public repositories for descriptions matching search terms"
)]
struct Args {
    /// Account to scan
    #[arg(required_unless_present = "targets_file", conflicts_with = "targets_file")]
    target: Option<String>,

    /// File listing one account per line (batch mode)
    #[arg(long)]
    targets_file: Option<PathBuf>,

    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    /// Search term; repeat to give several. Replaces the configured terms.
    #[arg(long = "term")]
    terms: Vec<String>,

    /// Directory for the dated report file (overrides scan.report_dir)
    #[arg(long)]
    report_dir: Option<PathBuf>,

    #[arg(long, value_enum, default_value = "text")]
    format: ReportFormat,

    /// Print results only; do not write a report file
    #[arg(long)]
    no_report: bool,

    /// Skip the GET /user token check before scanning
    #[arg(long)]
    skip_auth_check: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let cfg = config::load(Some(&args.config))?;

    let mut credentials = cfg.github.credentials();
    if let Ok(token) = std::env::var("GITHUB_TOKEN") {
        if !token.trim().is_empty() {
            credentials = Credentials::new(credentials.caller, token);
        }
    }

    let client = GithubClient::from_config(&cfg.github)?;
    if !args.skip_auth_check {
        let user = client
            .authenticate(&credentials)
            .await
            .context("authentication failed")?;
        info!(login = %user.login, "authenticated");
    }

    let target_list = match (&args.target, &args.targets_file) {
        (Some(target), _) => vec![target.clone()],
        (None, Some(path)) => targets::load(path).await?,
        (None, None) => bail!("either a target or --targets-file is required"),
    };
    if target_list.is_empty() {
        bail!("no targets to scan");
    }

    let terms = if args.terms.is_empty() {
        cfg.scan.search_terms.clone()
    } else {
        args.terms.clone()
    };

    let scanner = Scanner::new(client, Box::new(StaticCredentials(credentials)));
    let requests = scanner.requests(target_list, &terms);
    let batch = scanner
        .scan_many_with(&requests, |result| print!("{}", report::render_section(result)))
        .await;
    print!("{}", report::render_summary(&batch));

    if !args.no_report {
        let dir = match &args.report_dir {
            Some(dir) => dir.clone(),
            None => {
                cfg.ensure_dirs()?;
                PathBuf::from(&cfg.scan.report_dir)
            }
        };
        let today = chrono::Local::now().date_naive();
        let path = report::write(&dir, &batch, args.format, today)
            .await
            .context("failed to write report")?;
        println!("Report saved to {}", path.display());
    }

    Ok(())
}
