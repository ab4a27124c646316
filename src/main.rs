//! QPM action entrypoint.
//!
//! The runner invokes the binary once for the `main` step and once for the
//! `post` step. Both install QPM (the second from the tool cache); `main`
//! restores dependencies and `post` publishes unless publishing is eager.

use clap::Parser;
use qpm_action::cache::{DependencyCache, DirectoryCache};
use qpm_action::cli::{Cli, Step};
use qpm_action::config::{ActionConfig, RunnerEnv};
use qpm_action::download::HttpDownloader;
use qpm_action::error::Result;
use qpm_action::extraction::ZipExtractor;
use qpm_action::github::GitHubClient;
use qpm_action::install::{InstallConfig, InstalledTool, install_qpm};
use qpm_action::platform::Platform;
use qpm_action::process::{Qpm, SystemCommandExecutor};
use qpm_action::publish::{PublishContext, run_publish};
use qpm_action::resolver::{Resolver, qpm_repository};
use qpm_action::restore::run_restore;
use qpm_action::toolcache::ToolCache;
use qpm_action_common::WorkflowLogger;
use qpm_action_common::workflow::{add_mask, end_group, issue, start_group};
use std::io::Write;

struct RunContext<'a> {
    config: &'a ActionConfig,
    env: &'a RunnerEnv,
    client: &'a GitHubClient,
    platform: &'a Platform,
}

fn main() {
    let mut stdout = std::io::stdout();
    if let Err(err) = WorkflowLogger::install() {
        issue(&mut stdout, "warning", &format!("logging unavailable: {err}"));
    }
    let cli = Cli::parse();
    if let Err(err) = run(&cli, &mut stdout) {
        issue(&mut stdout, "error", &err.to_string());
        std::process::exit(1);
    }
}

fn run(cli: &Cli, out: &mut dyn Write) -> Result<()> {
    let config = ActionConfig::from_inputs(&cli.inputs)?;
    for secret in config.secrets() {
        add_mask(out, secret);
    }

    let env = RunnerEnv::from_env();
    let platform = Platform::current();
    let client = GitHubClient::new(&config.workflow_token);
    let context = RunContext {
        config: &config,
        env: &env,
        client: &client,
        platform: &platform,
    };

    start_group(out, "Install QPM");
    let installed = install(&context);
    end_group(out);
    let tool = installed?;

    let executor = SystemCommandExecutor::new(Some(env.workspace().to_owned()));
    let qpm = Qpm::new(&tool.executable, &executor);

    let step = cli.step();
    if step == Step::Main {
        start_group(out, "Restore dependencies");
        let restored = restore(&context, &qpm);
        end_group(out);
        restored?;
    }

    if config.should_publish(step) {
        start_group(out, "Publish");
        let published = publish(&context, &qpm);
        end_group(out);
        published?;
    }

    Ok(())
}

/// Installs QPM into the tool cache and onto `PATH`.
fn install(context: &RunContext<'_>) -> Result<InstalledTool> {
    let tool_cache = ToolCache::new(
        context.env.tool_cache()?.to_owned(),
        context.platform.arch_label(),
    );
    let resolver = Resolver::new(
        context.client,
        qpm_repository(),
        context.config.qpm_source.clone(),
        context.platform.clone(),
    );
    let downloader = HttpDownloader::new(Some(context.config.workflow_token.clone()));
    let install_config = InstallConfig {
        tool_cache: &tool_cache,
        github_path: context.env.github_path.as_deref(),
        temp_root: context.env.temp.as_deref(),
    };
    install_qpm(&resolver, &downloader, &ZipExtractor, &install_config)
}

/// Overwrites the version, restores the dependency cache, and runs `qpm restore`.
fn restore(context: &RunContext<'_>, qpm: &Qpm<'_>) -> Result<()> {
    let cache: Box<dyn DependencyCache> = match &context.config.cache_root {
        Some(root) => Box::new(DirectoryCache::new(root.clone())),
        None => Box::new(DirectoryCache::under_tool_cache(context.env.tool_cache()?)),
    };
    let options = context.config.restore_options(context.platform.os_label());
    run_restore(context.env.workspace(), qpm, cache.as_ref(), &options)?;
    Ok(())
}

/// Runs the publish protocol against the workflow's repository.
fn publish(context: &RunContext<'_>, qpm: &Qpm<'_>) -> Result<()> {
    let repo = context.env.repository()?;
    let publish_context = PublishContext {
        workspace: context.env.workspace(),
        repo: &repo,
        sha: context.env.sha()?,
        releases: context.client,
        git: context.client,
        qpm,
    };
    run_publish(&publish_context, &context.config.publish_options())?;
    Ok(())
}
