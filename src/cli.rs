use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};

use crate::config;
use crate::digest::{self, collect, format, DigestRules};
use crate::model::issue::RepoRef;
use crate::model::issue_update::IssueUpdate;
use crate::providers::{self, IssueTracker};

#[derive(Debug, Default, PartialEq, Eq)]
pub struct RunArgs {
    pub repo: Option<String>,
    pub label: Option<String>,
    pub json: bool,
    pub skip_invalid: bool,
    pub help: bool,
}

/// Parse `deepdive` arguments.
///
/// Supported forms:
///   deepdive
///   deepdive octo-org/handbook
///   deepdive octo-org/handbook --json
///   deepdive --label "Knowledge share" --skip-invalid
pub fn parse_args(args: &[String]) -> Result<RunArgs> {
    let mut parsed = RunArgs::default();
    let mut i = 0;

    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => parsed.help = true,
            "--json" => parsed.json = true,
            "--skip-invalid" => parsed.skip_invalid = true,
            "-l" | "--label" => {
                i += 1;
                match args.get(i) {
                    Some(label) if !label.trim().is_empty() => {
                        parsed.label = Some(label.clone());
                    }
                    _ => bail!("Missing value for --label flag"),
                }
            }
            flag if flag.starts_with('-') => bail!("Unknown option: {flag}"),
            positional => {
                if parsed.repo.is_some() {
                    bail!("Unexpected argument: {positional}");
                }
                parsed.repo = Some(positional.to_string());
            }
        }
        i += 1;
    }

    Ok(parsed)
}

const NO_REPO: &str =
    "No repository given. Pass OWNER/REPO or set github.repo in ~/.deepdive/config.toml";

pub async fn handle_run(args: RunArgs) -> Result<()> {
    let config = config::load_config()?;

    let repo_spec = args
        .repo
        .as_deref()
        .or(config.github.repo.as_deref())
        .context(NO_REPO)?;
    let repo: RepoRef = repo_spec.parse().map_err(|e: String| anyhow::anyhow!(e))?;

    let mut rules = config.digest.to_rules();
    if let Some(label) = &args.label {
        rules.label = label.clone();
    }

    let tracker = providers::create_tracker(&config.github)?;
    tracing::info!(%repo, label = %rules.label, "building deep dive digest");

    let output = render_output(tracker.as_ref(), &repo, &rules, Utc::now(), &args).await?;
    if !output.is_empty() {
        println!("{output}");
    }

    Ok(())
}

/// Produce what `deepdive` prints: the `<li>` digest, or the updates as JSON.
///
/// Without `--skip-invalid` the first issue that cannot be evaluated fails
/// the run.
pub async fn render_output(
    tracker: &dyn IssueTracker,
    repo: &RepoRef,
    rules: &DigestRules,
    now: DateTime<Utc>,
    args: &RunArgs,
) -> Result<String> {
    if !args.json && !args.skip_invalid {
        return Ok(digest::run(tracker, repo, rules, now).await?);
    }

    let updates: Vec<IssueUpdate> = if args.skip_invalid {
        collect::collect_outcomes(tracker, repo, rules, now)
            .await?
            .into_iter()
            .filter_map(Result::ok)
            .collect()
    } else {
        collect::get_deep_dive_issues(tracker, repo, rules, now).await?
    };

    if args.json {
        Ok(serde_json::to_string_pretty(&updates)?)
    } else {
        Ok(format::render_digest(&updates))
    }
}

pub fn print_help() {
    println!("deepdive — status digest for Deep-dive issues\n");
    println!("USAGE:");
    println!("  deepdive [OWNER/REPO] [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("  -l, --label <name>  Issue label to scan (default: Deep-dive)");
    println!("      --json          Print the issue updates as JSON");
    println!("      --skip-invalid  Leave out issues that cannot be evaluated instead of failing");
    println!("  -h, --help          Show this help");
    println!();
    println!("CONFIG:");
    println!("  ~/.deepdive/config.toml; GITHUB_TOKEN overrides github.token");
}
