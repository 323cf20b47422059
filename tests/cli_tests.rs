#![cfg(unix)]
mod test_env;
// End-to-end tests of the kship CLI against fake docker/kubectl/git binaries

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const JOB_TEMPLATE: &str = "apiVersion: batch/v1\nkind: Job\nmetadata:\n  name: $app-$run\nspec:\n  template:\n    spec:\n      containers:\n      - name: main\n        image: $image\n";

struct TestEnv {
    temp_dir: TempDir,
    _guard: std::sync::MutexGuard<'static, ()>,
}

impl TestEnv {
    fn new() -> Self {
        let guard = test_env::lock_test_env();
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir_all(temp_dir.path().join("bin")).unwrap();
        fs::create_dir_all(temp_dir.path().join("work")).unwrap();
        TestEnv { temp_dir, _guard: guard }
    }

    fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    fn work_dir(&self) -> PathBuf {
        self.path().join("work")
    }

    fn app_dir(&self) -> PathBuf {
        self.work_dir().join("demo")
    }

    fn log_path(&self, tool: &str) -> PathBuf {
        self.path().join(format!("{}.log", tool))
    }

    /// A stand-in binary that records its arguments and succeeds
    fn fake_tool(&self, tool: &str) -> PathBuf {
        let path = self.path().join("bin").join(tool);
        let script = format!("#!/bin/sh\necho \"$@\" >> \"{}\"\nexit 0\n", self.log_path(tool).display());
        fs::write(&path, script).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    /// kubectl stand-in whose only pod, named after the last applied job, has Completed
    fn kubectl_with_completed_pod(&self) -> PathBuf {
        let path = self.path().join("bin").join("kubectl-completed");
        let job_file = self.path().join("applied-job");
        let script = format!(
            "#!/bin/sh\n\
             echo \"$@\" >> \"{log}\"\n\
             case \"$*\" in\n\
             *\" apply -f \"*) for last; do :; done; basename \"$(dirname \"$last\")\" > \"{job}\" ;;\n\
             \"get pods --namespace alice\"*)\n\
             echo \"NAME READY STATUS RESTARTS AGE\"\n\
             echo \"$(cat \"{job}\")-x7k2p 0/1 Completed 0 5s\" ;;\n\
             esac\n\
             exit 0\n",
            log = self.log_path("kubectl").display(),
            job = job_file.display()
        );
        fs::write(&path, script).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    fn tool_log(&self, tool: &str) -> String {
        fs::read_to_string(self.log_path(tool)).unwrap_or_default()
    }

    /// Template repository with a single `hello-world` template
    fn template_repo(&self) -> PathBuf {
        let repo = self.path().join("template-repo");
        let template = repo.join("templates").join("hello-world");
        fs::create_dir_all(template.join("k8s-templates")).unwrap();
        fs::write(template.join("README.md"), "# Hello World\n\nA single pod that says hello.\n").unwrap();
        fs::write(template.join("Dockerfile"), "FROM busybox\n").unwrap();
        fs::write(
            template.join("parameters.json"),
            r#"{"template_parameters": [{"name": "greeting", "value": "hello"}]}"#,
        )
        .unwrap();
        fs::write(template.join("k8s-templates").join("job.yaml"), JOB_TEMPLATE).unwrap();
        repo
    }

    /// An initialized project written directly, without going through `kship init`
    fn write_project(&self) {
        let app = self.app_dir();
        fs::create_dir_all(app.join("k8s-templates")).unwrap();
        fs::write(app.join("k8s-templates").join("job.yaml"), JOB_TEMPLATE).unwrap();
        fs::write(app.join("kship.json"), r#"{"name": "demo", "namespace": "alice"}"#).unwrap();
    }

    fn cmd(&self, cwd: &Path) -> Command {
        let mut cmd = Command::cargo_bin("kship").unwrap();
        cmd.current_dir(cwd)
            .env("HOME", self.path())
            .env("USER", "Alice")
            .env("KSHIP_GIT", self.fake_tool("git"))
            .env("KSHIP_DOCKER", self.fake_tool("docker"))
            .env("KSHIP_KUBECTL", self.fake_tool("kubectl"))
            .env("KSHIP_MAKE", self.fake_tool("make"))
            .env("KSHIP_GCLOUD", self.path().join("bin").join("no-such-gcloud"))
            .env_remove("RUST_LOG");
        cmd
    }
}

#[test]
fn test_init_from_local_template_repo() {
    let env = TestEnv::new();
    let repo = env.template_repo();

    env.cmd(&env.work_dir())
        .args(["init", "--template-repo", repo.to_str().unwrap(), "demo"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created application demo"))
        .stderr(predicate::str::contains("gcloud was not found"));

    let app = env.app_dir();
    assert!(app.join("k8s-templates").join("job.yaml").is_file());
    assert!(app.join("Dockerfile").is_file());
    assert!(!app.join("parameters.json").exists());

    let config: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(app.join("kship.json")).unwrap()).unwrap();
    assert_eq!(config["name"], "demo");
    assert_eq!(config["namespace"], "alice");
    assert_eq!(config["template_name"], "hello-world");
    assert_eq!(config["template_parameters"]["greeting"], "hello");
    assert!(config.get("registry").is_none());
    assert!(env.tool_log("git").contains("commit"));
}

#[test]
fn test_init_refuses_existing_directory() {
    let env = TestEnv::new();
    let repo = env.template_repo();
    fs::create_dir_all(env.app_dir()).unwrap();

    env.cmd(&env.work_dir())
        .args(["init", "--template-repo", repo.to_str().unwrap(), "demo"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::starts_with("Error:"))
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn test_init_rejects_invalid_name() {
    let env = TestEnv::new();
    env.cmd(&env.work_dir())
        .args(["init", "My_App"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Invalid application name"));
}

#[test]
fn test_init_unknown_template() {
    let env = TestEnv::new();
    let repo = env.template_repo();
    env.cmd(&env.work_dir())
        .args(["init", "--template-repo", repo.to_str().unwrap(), "--template", "missing", "demo"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Template missing not found"));
    assert!(!env.app_dir().exists());
}

#[test]
fn test_templates_list() {
    let env = TestEnv::new();
    let repo = env.template_repo();
    env.cmd(&env.work_dir())
        .args(["templates", "list", "--template-repo", repo.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Template"))
        .stdout(predicate::str::contains("hello-world"))
        .stdout(predicate::str::contains("A single pod that says hello."));
}

#[test]
fn test_build_records_container() {
    let env = TestEnv::new();
    env.write_project();

    env.cmd(&env.app_dir())
        .arg("build")
        .assert()
        .success()
        .stdout(predicate::str::contains("Built demo:"));

    let record: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(env.app_dir().join(".build.json")).unwrap()).unwrap();
    let container = record["last_container"].as_str().unwrap();
    assert!(container.starts_with("demo:"));
    assert!(env.tool_log("docker").contains(&format!("build -t {} .", container)));
}

#[test]
fn test_deploy_no_push_without_image() {
    let env = TestEnv::new();
    env.write_project();
    fs::write(env.app_dir().join(".build.json"), r#"{"last_container": "demo:abc"}"#).unwrap();

    env.cmd(&env.app_dir())
        .args(["deploy", "--no-push", "--skip-crd-check"])
        .assert()
        .failure()
        .code(1)
        .stdout(predicate::str::contains("Skipping image push"))
        .stderr(predicate::str::contains("No image found to deploy with"));

    assert!(env.tool_log("kubectl").is_empty());
    assert!(!env.app_dir().join("k8s").exists());
}

#[test]
fn test_deploy_no_push_applies_rendered_templates() {
    let env = TestEnv::new();
    env.write_project();
    fs::write(env.app_dir().join(".build.json"), r#"{"last_container": "demo:abc"}"#).unwrap();
    fs::write(
        env.app_dir().join(".push.json"),
        r#"{"last_remote_container": "registry.local/demo:abc"}"#,
    )
    .unwrap();

    env.cmd(&env.app_dir())
        .args(["deploy", "--no-push", "--skip-crd-check"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Deploying registry.local/demo:abc"));

    let jobs: Vec<_> = fs::read_dir(env.app_dir().join("k8s")).unwrap().collect();
    assert_eq!(jobs.len(), 1);
    let job_dir = jobs.into_iter().next().unwrap().unwrap().path();
    let applied = fs::read_to_string(job_dir.join("job.yaml")).unwrap();
    assert!(applied.contains("image: registry.local/demo:abc"));
    assert!(!applied.contains("$app"));
    assert!(env.tool_log("kubectl").contains("apply -f"));

    let push: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(env.app_dir().join(".push.json")).unwrap()).unwrap();
    assert!(push["app_run_id"].is_string());
}

#[test]
fn test_interactive_deploy_without_running_pod_prints_instructions() {
    let env = TestEnv::new();
    env.write_project();
    fs::write(env.app_dir().join(".build.json"), r#"{"last_container": "demo:abc"}"#).unwrap();
    fs::write(
        env.app_dir().join(".push.json"),
        r#"{"last_remote_container": "registry.local/demo:abc"}"#,
    )
    .unwrap();

    env.cmd(&env.app_dir())
        .args(["deploy", "--no-push", "--skip-crd-check", "-i", "--retries", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Connecting to pod..."))
        .stdout(predicate::str::contains("is not Running yet."))
        .stdout(predicate::str::contains("kubectl exec -it {pod_name_here} --namespace=alice"));

    let applied = fs::read_dir(env.app_dir().join("k8s")).unwrap().count();
    assert_eq!(applied, 1);
    assert!(env.tool_log("kubectl").contains("--sort-by=.status.startTime"));
}

#[test]
fn test_interactive_deploy_with_completed_pod_prints_instructions() {
    let env = TestEnv::new();
    env.write_project();
    fs::write(env.app_dir().join(".build.json"), r#"{"last_container": "demo:abc"}"#).unwrap();
    fs::write(
        env.app_dir().join(".push.json"),
        r#"{"last_remote_container": "registry.local/demo:abc"}"#,
    )
    .unwrap();

    env.cmd(&env.app_dir())
        .env("KSHIP_KUBECTL", env.kubectl_with_completed_pod())
        .args(["deploy", "--no-push", "--skip-crd-check", "-i", "--retries", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("is not Running yet."))
        .stdout(predicate::str::contains("Completed"));

    assert!(!env.tool_log("kubectl").contains("exec -it"));
}

#[test]
fn test_deploy_rejects_invalid_template() {
    let env = TestEnv::new();
    env.write_project();
    fs::write(
        env.app_dir().join("k8s-templates").join("service.yaml"),
        "apiVersion: v1\nkind: Service\nmetadata:\n  labels:\n    app: $app\nspec: {}\n",
    )
    .unwrap();

    env.cmd(&env.app_dir())
        .args(["deploy", "--no-push", "--skip-crd-check"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Template service.yaml is invalid: metadata.name is required"));

    assert!(env.tool_log("docker").is_empty());
    assert!(env.tool_log("kubectl").is_empty());
}

#[test]
fn test_undeploy_twice() {
    let env = TestEnv::new();
    env.write_project();
    let job_dir = env.app_dir().join("k8s").join("demo-1");
    fs::create_dir_all(&job_dir).unwrap();
    fs::write(job_dir.join("job.yaml"), "kind: Job\n").unwrap();

    env.cmd(&env.app_dir())
        .arg("undeploy")
        .assert()
        .success()
        .stdout(predicate::str::contains("Undeployed demo-1"));
    assert!(!job_dir.exists());
    assert!(env.tool_log("kubectl").contains("--namespace alice delete -f"));

    env.cmd(&env.app_dir())
        .arg("undeploy")
        .assert()
        .success()
        .stdout(predicate::str::contains("nothing deployed"));
}

#[test]
fn test_undeploy_unknown_job() {
    let env = TestEnv::new();
    env.write_project();
    fs::create_dir_all(env.app_dir().join("k8s").join("demo-1")).unwrap();

    env.cmd(&env.app_dir())
        .args(["undeploy", "--job-name", "demo-9"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Job demo-9 not found"))
        .stderr(predicate::str::contains("demo-1"));
}

#[test]
fn test_config_set_list_remove() {
    let env = TestEnv::new();
    env.write_project();
    let app = env.app_dir();

    env.cmd(&app)
        .args(["config", "set", "template_parameters.num_ps", "3"])
        .assert()
        .success();

    env.cmd(&app)
        .args(["config", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Param"))
        .stdout(predicate::str::contains("template_parameters.num_ps"))
        .stdout(predicate::str::contains("alice"));

    env.cmd(&app)
        .args(["config", "remove", "template_parameters.num_ps"])
        .assert()
        .success();

    env.cmd(&app)
        .args(["config", "remove", "template_parameters.num_ps"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Unable to find config 'template_parameters.num_ps'"));
}

#[test]
fn test_commands_require_initialized_project() {
    let env = TestEnv::new();
    for args in [vec!["status"], vec!["build"], vec!["config", "list"], vec!["undeploy"]] {
        env.cmd(&env.work_dir())
            .args(&args)
            .assert()
            .failure()
            .code(1)
            .stderr(predicate::str::contains("This command requires you to be in a `kship init` built directory."));
    }
}

#[test]
fn test_events_without_jobs() {
    let env = TestEnv::new();
    env.write_project();
    env.cmd(&env.app_dir())
        .arg("events")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("No jobs are deployed."));
}

#[test]
fn test_version() {
    let env = TestEnv::new();
    env.cmd(&env.work_dir())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}
