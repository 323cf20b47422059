use clap::{Parser, Subcommand};
use crate::cli::error::{user_error, validate_app_name, validate_config_path};
use crate::cli::output::{format_two_column_table, get_terminal_width, is_tty};
use crate::pipeline::deploy::{deploy, DeployOptions};
use crate::pipeline::init::{init, InitOptions};
use crate::pipeline::readiness::PollSettings;
use crate::pipeline::sync::{sync, SyncAction};
use crate::pipeline::undeploy::{undeploy, UndeployTarget};
use crate::pipeline::{build, events, logs, status, templates, update_template, watch};
use crate::project::{ConfigStore, ProjectContext, UserRc};
use crate::utils::validate_since;
use anyhow::Result;

/// Retries used by the polling commands when `--retries` is not given
pub const DEFAULT_RETRIES: u32 = 10;

#[derive(Parser)]
#[command(name = "kship")]
#[command(about = "kship - build, push and deploy container workloads to Kubernetes from templates")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a new application from a template
    Init {
        /// Template name for app initialization
        #[arg(long, default_value = "hello-world")]
        template: String,
        /// Git URL or local path of the template repository
        #[arg(long = "template-repo")]
        template_repo: Option<String>,
        /// Container registry to use. If none is set, gcloud is asked for a project
        #[arg(long)]
        registry: Option<String>,
        /// Kubernetes namespace to use. Defaults to your user name
        #[arg(long)]
        namespace: Option<String>,
        /// Do not check the cluster for the CRDs the template needs
        #[arg(long = "skip-crd-check")]
        skip_crd_check: bool,
        /// Prepare the app for `kship sync`
        #[arg(long = "enable-sync")]
        enable_sync: bool,
        /// Application name (also the directory created)
        name: String,
    },
    /// Build the application image
    Build {
        /// Rebuild whenever files change
        #[arg(long)]
        watch: bool,
    },
    /// Push the image and deploy the templates as a new job
    Deploy {
        /// Deploy the last pushed image without building or pushing
        #[arg(long = "no-push")]
        no_push: bool,
        /// Deploy with idle containers and open a shell in the pod
        #[arg(short = 'i', long)]
        interactive: bool,
        /// Tail the job's logs after deploying
        #[arg(short = 'l', long)]
        logs: bool,
        /// Times to poll while waiting for pods
        #[arg(long, default_value_t = DEFAULT_RETRIES)]
        retries: u32,
        /// Only show logs newer than this (e.g. 30s, 5m, 1h)
        #[arg(long, default_value = "1m", value_parser = validate_since)]
        since: String,
        /// Do not check the cluster for the CRDs the template needs
        #[arg(long = "skip-crd-check")]
        skip_crd_check: bool,
        /// Template file to patch in interactive mode
        kube_spec: Option<String>,
    },
    /// Delete deployed jobs from the cluster
    Undeploy {
        /// Undeploy every tracked job
        #[arg(long, conflicts_with = "job_name")]
        all: bool,
        /// Job to undeploy
        #[arg(long = "job-name")]
        job_name: Option<String>,
    },
    /// Show the status of a deployed job
    Status {
        /// Job to inspect (required when several are deployed)
        #[arg(long = "job-name")]
        job_name: Option<String>,
        /// Times to query while the job is not visible yet
        #[arg(long, default_value_t = DEFAULT_RETRIES)]
        retries: u32,
    },
    /// Tail the logs of a deployed job
    Logs {
        /// Job to tail (required when several are deployed)
        #[arg(long = "job-name")]
        job_name: Option<String>,
        /// Times to poll while waiting for pods
        #[arg(long, default_value_t = DEFAULT_RETRIES)]
        retries: u32,
        /// Only show logs newer than this (e.g. 30s, 5m, 1h)
        #[arg(long, default_value = "1m", value_parser = validate_since)]
        since: String,
    },
    /// Show cluster events of a deployed job
    Events {
        /// Job to inspect (required when several are deployed)
        #[arg(long = "job-name")]
        job_name: Option<String>,
    },
    /// Template repository commands
    #[command(visible_alias = "template")]
    Templates {
        #[command(subcommand)]
        subcommand: TemplateCommands,
    },
    /// Project configuration commands
    Config {
        #[command(subcommand)]
        subcommand: ConfigCommands,
    },
    /// Merge the latest revision of the app's template into the app
    UpdateTemplate {
        /// Git URL or local path of the template repository
        #[arg(long = "template-repo")]
        template_repo: Option<String>,
    },
    /// Sync local changes into running pods
    Sync {
        #[command(subcommand)]
        subcommand: SyncCommands,
    },
}

#[derive(Subcommand)]
pub enum TemplateCommands {
    /// List available templates
    List {
        /// Git URL or local path of the template repository
        #[arg(long = "template-repo")]
        template_repo: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// List configuration values
    List,
    /// Set a configuration value (dotted names reach into template_parameters)
    Set {
        /// Config name (e.g. registry, template_parameters.num_ps)
        name: String,
        /// New value
        value: String,
    },
    /// Remove a configuration value
    Remove {
        /// Config name (e.g. template_parameters.num_ps)
        name: String,
    },
}

#[derive(Subcommand)]
pub enum SyncCommands {
    /// Start syncing local changes to the deployed job
    Create,
    /// Restart the sync agent
    Reload,
    /// Stop syncing
    Delete,
}

pub fn run() -> Result<()> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            e.print()?;
            if e.use_stderr() {
                std::process::exit(1);
            }
            return Ok(());
        }
    };
    handle_command(cli)
}

fn handle_command(cli: Cli) -> Result<()> {
    let ctx = ProjectContext::from_cwd()?;
    match cli.command {
        Commands::Init { template, template_repo, registry, namespace, skip_crd_check, enable_sync, name } => {
            handle_init(&ctx, name, template, template_repo, registry, namespace, skip_crd_check, enable_sync)
        }
        Commands::Build { watch } => handle_build(&ctx, watch),
        Commands::Deploy { no_push, interactive, logs, retries, since, skip_crd_check, kube_spec } => {
            let opts = DeployOptions {
                no_push,
                interactive,
                logs,
                poll: PollSettings::new(retries),
                since,
                skip_crd_check,
                kube_spec,
            };
            deploy(&ctx, &opts)
        }
        Commands::Undeploy { all, job_name } => {
            let target = match (all, job_name) {
                (true, _) => UndeployTarget::All,
                (false, Some(name)) => UndeployTarget::Job(name),
                (false, None) => UndeployTarget::Sole,
            };
            undeploy(&ctx, &target)
        }
        Commands::Status { job_name, retries } => {
            status::status(&ctx, job_name.as_deref(), PollSettings::new(retries))
        }
        Commands::Logs { job_name, retries, since } => {
            logs::logs(&ctx, job_name.as_deref(), PollSettings::new(retries), &since)
        }
        Commands::Events { job_name } => events::events(&ctx, job_name.as_deref()),
        Commands::Templates { subcommand } => match subcommand {
            TemplateCommands::List { template_repo } => {
                let repo = resolve_template_repo(template_repo)?;
                templates::templates(&repo)
            }
        },
        Commands::Config { subcommand } => handle_config(&ctx, subcommand),
        Commands::UpdateTemplate { template_repo } => {
            let repo = resolve_template_repo(template_repo)?;
            update_template::update_template(&ctx, &repo)
        }
        Commands::Sync { subcommand } => {
            let action = match subcommand {
                SyncCommands::Create => SyncAction::Create,
                SyncCommands::Reload => SyncAction::Reload,
                SyncCommands::Delete => SyncAction::Delete,
            };
            sync(&ctx, action)
        }
    }
}

/// `--template-repo`, else the rc file, else the default repository
fn resolve_template_repo(explicit: Option<String>) -> Result<String> {
    match explicit {
        Some(repo) => Ok(repo),
        None => Ok(UserRc::load()?.template_repo().to_string()),
    }
}

#[allow(clippy::too_many_arguments)]
fn handle_init(
    ctx: &ProjectContext,
    name: String,
    template: String,
    template_repo: Option<String>,
    registry: Option<String>,
    namespace: Option<String>,
    skip_crd_check: bool,
    enable_sync: bool,
) -> Result<()> {
    if let Err(e) = validate_app_name(&name) {
        user_error(&e);
    }
    let rc = UserRc::load()?;
    let opts = InitOptions {
        name,
        template,
        template_repo: template_repo.unwrap_or_else(|| rc.template_repo().to_string()),
        registry: registry.or_else(|| rc.registry().map(String::from)),
        namespace: namespace.or_else(|| rc.namespace().map(String::from)),
        skip_crd_check,
        enable_sync,
    };
    let app_dir = init(ctx.root(), &opts)?;
    println!("Created application {} in {}", opts.name, app_dir.display());
    Ok(())
}

fn handle_build(ctx: &ProjectContext, watch_mode: bool) -> Result<()> {
    let config = ConfigStore::load(ctx)?;
    if !watch_mode {
        build::build(ctx, &config)?;
        return Ok(());
    }
    watch::watch(ctx, || {
        // Pick up config edits made while watching
        let config = ConfigStore::load(ctx)?;
        build::build(ctx, &config).map(|_| ())
    })
}

fn handle_config(ctx: &ProjectContext, cmd: ConfigCommands) -> Result<()> {
    match cmd {
        ConfigCommands::List => {
            let config = ConfigStore::load(ctx)?;
            let rows = config.list_entries();
            print!(
                "{}",
                format_two_column_table(("Param", "Value"), &rows, get_terminal_width(), is_tty())
            );
            Ok(())
        }
        ConfigCommands::Set { name, value } => {
            let keys = validate_config_path(&name).unwrap_or_else(|e| user_error(&e));
            ConfigStore::set(ctx, &keys, &value)?;
            println!("Set {} = {}", name, value);
            Ok(())
        }
        ConfigCommands::Remove { name } => {
            let keys = validate_config_path(&name).unwrap_or_else(|e| user_error(&e));
            ConfigStore::remove(ctx, &keys)?;
            println!("Removed {}", name);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_deploy_flags() {
        let cli = Cli::try_parse_from(["kship", "deploy", "-i", "--no-push", "--retries", "3", "job.yaml"]).unwrap();
        match cli.command {
            Commands::Deploy { interactive, no_push, retries, kube_spec, since, logs, .. } => {
                assert!(interactive);
                assert!(no_push);
                assert!(!logs);
                assert_eq!(retries, 3);
                assert_eq!(since, "1m");
                assert_eq!(kube_spec.as_deref(), Some("job.yaml"));
            }
            _ => panic!("expected deploy"),
        }
    }

    #[test]
    fn test_undeploy_all_conflicts_with_job_name() {
        assert!(Cli::try_parse_from(["kship", "undeploy", "--all", "--job-name", "demo-1"]).is_err());
        assert!(Cli::try_parse_from(["kship", "undeploy", "--all"]).is_ok());
    }

    #[test]
    fn test_template_alias() {
        assert!(Cli::try_parse_from(["kship", "template", "list"]).is_ok());
        assert!(Cli::try_parse_from(["kship", "templates", "list", "--template-repo", "/tmp/x"]).is_ok());
    }

    #[test]
    fn test_invalid_since_rejected() {
        assert!(Cli::try_parse_from(["kship", "logs", "--since", "soon"]).is_err());
    }
}
