// Deployment orchestration: build, push, render, patch, apply, track, attach

use anyhow::{Context, Result};
use log::info;
use std::fs;
use uuid::Uuid;

use super::readiness::{PollSettings, Readiness, ReadinessPoller};
use super::{build, crd, custom_target_env, logs, push};
use crate::cli::error::KshipError;
use crate::cli::output::print_warning;
use crate::manifest::{
    documents_to_text, is_validated_template, parse_documents, patch_documents, render, validate_template,
    PatchReport, RenderedManifest, Substitutions,
};
use crate::models::{job_name_for, keys, pod_prefix, AppConfig, PodPhase, Stage};
use crate::project::{ConfigStore, ProjectContext};
use crate::repo::{JobRepo, StageRepo};
use crate::tools::{makefile, Kubectl};

/// Flags of `kship deploy`
#[derive(Debug, Clone)]
pub struct DeployOptions {
    pub no_push: bool,
    pub interactive: bool,
    pub logs: bool,
    pub poll: PollSettings,
    pub since: String,
    pub skip_crd_check: bool,
    /// Template to patch in interactive mode; all of them when `None`
    pub kube_spec: Option<String>,
}

/// A rendered template ready to be written into the job directory
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedManifest {
    pub file_name: String,
    pub text: String,
}

/// Render every template and, in interactive mode, patch the selected ones.
///
/// Nothing is written here, so a rendering or patching failure leaves no trace.
pub fn prepare_manifests(
    ctx: &ProjectContext,
    subs: &Substitutions,
    interactive: bool,
    kube_spec: Option<&str>,
) -> Result<(Vec<PreparedManifest>, PatchReport)> {
    let files = ctx.template_files()?;
    if let Some(spec) = kube_spec {
        if !files.iter().any(|f| f == spec) {
            return Err(KshipError::KubeSpecNotFound(spec.to_string()).into());
        }
    }

    let mut report = PatchReport::default();
    let mut manifests = Vec::with_capacity(files.len());
    for file_name in files {
        let path = ctx.templates_dir().join(&file_name);
        let template = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read template {}", path.display()))?;
        let rendered = render(&template, subs, &file_name)?;

        let patch_this = interactive && kube_spec.map_or(true, |spec| spec == file_name);
        let text = if patch_this {
            let mut docs = match rendered {
                RenderedManifest::Structured(value) => vec![value],
                RenderedManifest::Raw(text) => parse_documents(&text, &file_name)?,
            };
            let file_report = patch_documents(&mut docs, &file_name)?;
            report.merge(&file_report);
            documents_to_text(docs)?
        } else {
            rendered.to_text()?
        };
        manifests.push(PreparedManifest { file_name, text });
    }
    Ok((manifests, report))
}

/// Check the structure of every YAML template in `k8s-templates/`
pub fn validate_templates(ctx: &ProjectContext) -> Result<()> {
    for file_name in ctx.template_files()? {
        if !is_validated_template(&file_name) {
            continue;
        }
        let path = ctx.templates_dir().join(&file_name);
        let text = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read template {}", path.display()))?;
        validate_template(&text, &file_name)?;
    }
    Ok(())
}

/// Run `kship deploy`
pub fn deploy(ctx: &ProjectContext, opts: &DeployOptions) -> Result<()> {
    let config = ConfigStore::load(ctx)?;
    validate_templates(ctx)?;

    if StageRepo::load(ctx, Stage::Build)?.is_none() {
        info!("no build recorded, building first");
        build::build(ctx, &config)?;
    }

    if let Some(spec) = StageRepo::read_str(ctx, Stage::Sync, keys::SYNC_SPEC)? {
        print_warning(&format!(
            "This folder is currently being synced, please run `kship sync delete` to delete sync spec {} manually",
            spec
        ));
    }

    let kubectl = Kubectl::new(&config.namespace);
    if !opts.skip_crd_check {
        crd::check_crds(ctx.root(), &kubectl, crd::CrdPolicy::Fail)?;
    }

    if opts.no_push {
        println!("Skipping image push");
    } else {
        push::push(ctx, &config)?;
    }

    let image = StageRepo::read_str(ctx, Stage::Push, keys::LAST_REMOTE_CONTAINER)?
        .ok_or(KshipError::NoImage)?;

    let run_id = Uuid::new_v4().to_string();
    let job_name = job_name_for(&config.name, &run_id);
    let subs = Substitutions::for_deploy(&config, &image, &run_id);
    let (manifests, report) = prepare_manifests(ctx, &subs, opts.interactive, opts.kube_spec.as_deref())?;

    println!("Deploying {}", image);
    kubectl.ensure_namespace()?;

    let job = JobRepo::create(ctx, &job_name)?;
    for manifest in &manifests {
        let path = job.directory.join(&manifest.file_name);
        fs::write(&path, &manifest.text)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        let output = kubectl.apply(&path)?;
        print!("{}", output);
    }

    if makefile::has_target(ctx, "deploy")? {
        custom_deploy(ctx, &config, &job_name, &image)?;
    }

    StageRepo::set(ctx, Stage::Push, keys::APP_RUN_ID, run_id.as_str())?;
    println!(
        "\nInspect created objects by running:\n$ kubectl get --namespace={} all\nor \n$ kship status\n",
        config.namespace
    );

    if opts.interactive {
        let prefix = pod_prefix(&job_name, &config.name).unwrap_or_else(|| job_name.clone());
        if report.can_attach() {
            attach(&kubectl, &prefix, opts.poll)?;
        } else {
            print_discovery_instructions(&kubectl, "More than one container created.")?;
        }
    }

    if opts.logs {
        logs::tail_job(&kubectl, &config, &job_name, opts.poll, &opts.since)?;
    }
    Ok(())
}

fn custom_deploy(ctx: &ProjectContext, config: &AppConfig, job_name: &str, image: &str) -> Result<()> {
    let env = custom_target_env(config, &[("JOB_NAME", job_name), ("IMAGE", image)]);
    let output = makefile::run_target(ctx, "deploy", &env)?;
    println!("{}", output.trim());
    Ok(())
}

/// Wait for the job's pod to come up, then open a shell in it.
///
/// A pod that is not Running within the retry budget gets the manual
/// instructions instead; the deploy itself already succeeded.
fn attach(kubectl: &Kubectl, prefix: &str, poll: PollSettings) -> Result<()> {
    println!("Connecting to pod...");
    let running = match ReadinessPoller::new(kubectl, poll).wait_for(prefix)? {
        Readiness::Ready(pods) => pods.into_iter().find(|p| p.status_phase == PodPhase::Running),
        Readiness::NotReady { .. } => None,
    };
    match running {
        Some(pod) => kubectl.exec_shell(&pod.pod_name),
        None => print_discovery_instructions(kubectl, &format!("Pod {} is not Running yet.", prefix)),
    }
}

fn print_discovery_instructions(kubectl: &Kubectl, reason: &str) -> Result<()> {
    println!(
        "{}\n\
         Call `kubectl exec -it {{pod_name_here}} --namespace={} /bin/bash` on a `Running` pod NAME below.\n\
         If no pods are running yet, run `kship status` occasionally, or `watch -n1 kship status` \
         to watch until pods are `Running`.\n",
        reason,
        kubectl.namespace()
    );
    for line in kubectl.get_pods_by_start_time()?.lines() {
        println!("{}", line);
    }
    Ok(())
}
