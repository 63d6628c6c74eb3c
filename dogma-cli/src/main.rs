// Copyright 2025 Central Dogma Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! `dogma` (SPEC_FULL.md §6 "CLI surface"): a thin HTTP client over the
//! server's `/api/v1` route table. Every subcommand addresses an entry
//! with a single locator string `<proj>/<repo>/<path>@<rev>`; `@<rev>`
//! defaults to `head`. Exit codes: `0` success, `1` client error (4xx, or
//! a malformed locator), `2` server error (5xx, or the request never
//! reached the server).

use clap::{Parser, Subcommand};
use serde::Deserialize;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "dogma", author, version, about, long_about = None)]
struct Cli {
    /// Base URL of the dogma-server instance
    #[arg(long, env = "DOGMA_SERVER", default_value = "http://127.0.0.1:36462")]
    server: String,

    /// Bearer token for authenticated deployments
    #[arg(long, env = "DOGMA_TOKEN")]
    token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List entries under a path
    Ls { locator: String },

    /// Print the content of a single entry
    Cat { locator: String },

    /// Upsert an entry's content
    Put {
        locator: String,
        /// Commit message summary
        #[arg(short, long)]
        message: String,
        /// Read content from this file instead of stdin
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Remove an entry
    Rm {
        locator: String,
        #[arg(short, long)]
        message: Option<String>,
    },

    /// Show commit history touching a path
    Log {
        locator: String,
        #[arg(long)]
        to: Option<i32>,
        #[arg(long = "max-entries")]
        max_entries: Option<usize>,
    },

    /// Diff two revisions of a repository
    Diff {
        /// `<proj>/<repo>/<path>` (revision suffix, if any, is ignored)
        locator: String,
        #[arg(long)]
        from: i32,
        #[arg(long)]
        to: i32,
    },

    /// Long-poll for the next change past `@<rev>`
    Watch {
        locator: String,
        #[arg(long, default_value_t = 60)]
        timeout_secs: u64,
    },
}

/// A parsed `<proj>/<repo>/<path>@<rev>` locator. `path` always starts
/// with `/`; an empty path addresses the repository root.
struct Locator {
    project: String,
    repo: String,
    path: String,
    revision: Option<i32>,
}

fn parse_locator(raw: &str) -> Result<Locator, CliError> {
    let (body, revision) = match raw.rsplit_once('@') {
        Some((body, rev)) if rev.eq_ignore_ascii_case("head") => (body, None),
        Some((body, rev)) => {
            let parsed = rev
                .parse::<i32>()
                .map_err(|_| CliError::Client(format!("invalid revision in locator: {raw}")))?;
            (body, Some(parsed))
        }
        None => (raw, None),
    };

    let mut parts = body.splitn(3, '/');
    let project = parts
        .next()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| CliError::Client(format!("locator missing project: {raw}")))?
        .to_string();
    let repo = parts
        .next()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| CliError::Client(format!("locator missing repository: {raw}")))?
        .to_string();
    let rest = parts.next().unwrap_or("");
    let path = if rest.is_empty() {
        String::new()
    } else if rest.starts_with('/') {
        rest.to_string()
    } else {
        format!("/{rest}")
    };

    Ok(Locator {
        project,
        repo,
        path,
        revision,
    })
}

enum CliError {
    /// Malformed input or a 4xx response.
    Client(String),
    /// A 5xx response, or the request never reached the server.
    Server(String),
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Client(msg) | CliError::Server(msg) => write!(f, "{msg}"),
        }
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

async fn classify(response: reqwest::Response) -> Result<reqwest::Response, CliError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response
        .json::<ErrorBody>()
        .await
        .map(|b| b.message)
        .unwrap_or_else(|_| status.to_string());
    if status.is_client_error() {
        Err(CliError::Client(body))
    } else {
        Err(CliError::Server(body))
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let client = reqwest::Client::new();

    match run(&client, &cli).await {
        Ok(()) => ExitCode::from(0),
        Err(CliError::Client(msg)) => {
            eprintln!("error: {msg}");
            ExitCode::from(1)
        }
        Err(CliError::Server(msg)) => {
            eprintln!("error: {msg}");
            ExitCode::from(2)
        }
    }
}

fn authed(cli: &Cli, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
    match &cli.token {
        Some(token) => builder.bearer_auth(token),
        None => builder,
    }
}

async fn run(client: &reqwest::Client, cli: &Cli) -> Result<(), CliError> {
    match &cli.command {
        Commands::Ls { locator } => ls(client, cli, locator).await,
        Commands::Cat { locator } => cat(client, cli, locator).await,
        Commands::Put {
            locator,
            message,
            file,
        } => put(client, cli, locator, message, file.as_deref()).await,
        Commands::Rm { locator, message } => rm(client, cli, locator, message.as_deref()).await,
        Commands::Log {
            locator,
            to,
            max_entries,
        } => log(client, cli, locator, *to, *max_entries).await,
        Commands::Diff { locator, from, to } => diff(client, cli, locator, *from, *to).await,
        Commands::Watch {
            locator,
            timeout_secs,
        } => watch(client, cli, locator, *timeout_secs).await,
    }
}

fn repo_base(cli: &Cli, loc: &Locator) -> String {
    format!(
        "{}/api/v1/projects/{}/repos/{}",
        cli.server.trim_end_matches('/'),
        loc.project,
        loc.repo
    )
}

fn send_error(e: reqwest::Error) -> CliError {
    CliError::Server(format!("request failed: {e}"))
}

async fn ls(client: &reqwest::Client, cli: &Cli, locator: &str) -> Result<(), CliError> {
    let loc = parse_locator(locator)?;
    let mut url = format!("{}/tree{}", repo_base(cli, &loc), loc.path);
    if let Some(rev) = loc.revision {
        url.push_str(&format!("?revision={rev}"));
    }
    let response = authed(cli, client.get(&url)).send().await.map_err(send_error)?;
    let response = classify(response).await?;
    let body: serde_json::Value = response.json().await.map_err(send_error)?;
    println!("{}", serde_json::to_string_pretty(&body).unwrap());
    Ok(())
}

async fn cat(client: &reqwest::Client, cli: &Cli, locator: &str) -> Result<(), CliError> {
    let loc = parse_locator(locator)?;
    let mut url = format!("{}/contents{}", repo_base(cli, &loc), loc.path);
    if let Some(rev) = loc.revision {
        url.push_str(&format!("?revision={rev}"));
    }
    let response = authed(cli, client.get(&url)).send().await.map_err(send_error)?;
    let response = classify(response).await?;
    let body: serde_json::Value = response.json().await.map_err(send_error)?;
    println!("{}", serde_json::to_string_pretty(&body).unwrap());
    Ok(())
}

async fn put(
    client: &reqwest::Client,
    cli: &Cli,
    locator: &str,
    message: &str,
    file: Option<&std::path::Path>,
) -> Result<(), CliError> {
    let loc = parse_locator(locator)?;
    if loc.path.is_empty() {
        return Err(CliError::Client("put requires a non-empty path".to_string()));
    }
    let raw = match file {
        Some(path) => std::fs::read_to_string(path)
            .map_err(|e| CliError::Client(format!("cannot read {}: {e}", path.display())))?,
        None => std::io::read_to_string(std::io::stdin())
            .map_err(|e| CliError::Client(format!("cannot read stdin: {e}")))?,
    };
    let content: serde_json::Value =
        serde_json::from_str(&raw).unwrap_or(serde_json::Value::String(raw));

    let url = format!("{}/contents", repo_base(cli, &loc));
    let body = serde_json::json!({
        "path": loc.path,
        "content": content,
        "commitMessage": {"summary": message},
    });
    let response = authed(cli, client.post(&url)).json(&body).send().await.map_err(send_error)?;
    let response = classify(response).await?;
    let body: serde_json::Value = response.json().await.map_err(send_error)?;
    println!("{}", serde_json::to_string_pretty(&body).unwrap());
    Ok(())
}

async fn rm(client: &reqwest::Client, cli: &Cli, locator: &str, message: Option<&str>) -> Result<(), CliError> {
    let loc = parse_locator(locator)?;
    if loc.path.is_empty() {
        return Err(CliError::Client("rm requires a non-empty path".to_string()));
    }
    let url = format!("{}/contents{}", repo_base(cli, &loc), loc.path);
    let mut request = authed(cli, client.delete(&url));
    if let Some(summary) = message {
        request = request.json(&serde_json::json!({"commitMessage": {"summary": summary}}));
    }
    let response = request.send().await.map_err(send_error)?;
    classify(response).await?;
    println!("removed {}", loc.path);
    Ok(())
}

async fn log(
    client: &reqwest::Client,
    cli: &Cli,
    locator: &str,
    to: Option<i32>,
    max_entries: Option<usize>,
) -> Result<(), CliError> {
    let loc = parse_locator(locator)?;
    let from = loc.revision.unwrap_or(-1);
    let mut url = format!("{}/commits/{from}", repo_base(cli, &loc));
    let mut params = Vec::new();
    if !loc.path.is_empty() {
        params.push(format!("path={}", loc.path));
    }
    if let Some(to) = to {
        params.push(format!("to={to}"));
    }
    if let Some(max_entries) = max_entries {
        params.push(format!("maxEntries={max_entries}"));
    }
    if !params.is_empty() {
        url.push('?');
        url.push_str(&params.join("&"));
    }
    let response = authed(cli, client.get(&url)).send().await.map_err(send_error)?;
    let response = classify(response).await?;
    let body: serde_json::Value = response.json().await.map_err(send_error)?;
    println!("{}", serde_json::to_string_pretty(&body).unwrap());
    Ok(())
}

async fn diff(client: &reqwest::Client, cli: &Cli, locator: &str, from: i32, to: i32) -> Result<(), CliError> {
    let loc = parse_locator(locator)?;
    let mut url = format!("{}/compare?from={from}&to={to}", repo_base(cli, &loc));
    if !loc.path.is_empty() {
        url.push_str(&format!("&path={}", loc.path));
    }
    let response = authed(cli, client.get(&url)).send().await.map_err(send_error)?;
    let response = classify(response).await?;
    let body: serde_json::Value = response.json().await.map_err(send_error)?;
    println!("{}", serde_json::to_string_pretty(&body).unwrap());
    Ok(())
}

async fn watch(client: &reqwest::Client, cli: &Cli, locator: &str, timeout_secs: u64) -> Result<(), CliError> {
    let loc = parse_locator(locator)?;
    if loc.path.is_empty() {
        return Err(CliError::Client("watch requires a non-empty path".to_string()));
    }
    let last_known = loc.revision.unwrap_or(-1);
    let url = format!("{}/contents{}", repo_base(cli, &loc), loc.path);
    let response = authed(cli, client.get(&url))
        .header("If-None-Match", last_known.to_string())
        .header("Prefer", format!("wait={timeout_secs}"))
        .send()
        .await
        .map_err(send_error)?;

    if response.status() == reqwest::StatusCode::NOT_MODIFIED {
        println!("no change within {timeout_secs}s");
        return Ok(());
    }
    let response = classify(response).await?;
    let body: serde_json::Value = response.json().await.map_err(send_error)?;
    println!("{}", serde_json::to_string_pretty(&body).unwrap());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_locator_with_explicit_revision() {
        let loc = parse_locator("my-project/my-repo/a/b.json@42").unwrap();
        assert_eq!(loc.project, "my-project");
        assert_eq!(loc.repo, "my-repo");
        assert_eq!(loc.path, "/a/b.json");
        assert_eq!(loc.revision, Some(42));
    }

    #[test]
    fn locator_without_revision_suffix_means_head() {
        let loc = parse_locator("proj/repo/file.json").unwrap();
        assert_eq!(loc.revision, None);
        assert_eq!(loc.path, "/file.json");
    }

    #[test]
    fn locator_with_only_project_and_repo_has_empty_path() {
        let loc = parse_locator("proj/repo@head").unwrap();
        assert_eq!(loc.path, "");
    }

    #[test]
    fn rejects_locator_missing_repo() {
        assert!(matches!(parse_locator("proj"), Err(CliError::Client(_))));
    }
}
