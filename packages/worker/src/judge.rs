use std::path::{Path, PathBuf};

use anyhow::Context;
use common::judge_job::JudgeJob;
use common::judge_result::{JudgeErrorInfo, JudgeResult, TestCaseJudgeResult};
use common::storage::{BlobStore, ContentHash};
use common::CaseVerdict;
use tokio::process::Command;
use tracing::{info, instrument, warn};

use crate::runner;

/// Per-language build and run commands. The source lands in the job
/// workspace under `source_file` before anything runs.
struct LanguageCommands {
    source_file: &'static str,
    compile: Option<&'static [&'static str]>,
    run: &'static [&'static str],
}

fn commands_for(language: &str) -> Option<LanguageCommands> {
    match language {
        "cpp" => Some(LanguageCommands {
            source_file: "main.cpp",
            compile: Some(&["g++", "-O2", "-std=c++17", "-o", "main", "main.cpp"]),
            run: &["./main"],
        }),
        "c" => Some(LanguageCommands {
            source_file: "main.c",
            compile: Some(&["gcc", "-O2", "-std=c11", "-o", "main", "main.c"]),
            run: &["./main"],
        }),
        "python" => Some(LanguageCommands {
            source_file: "main.py",
            compile: None,
            run: &["python3", "main.py"],
        }),
        "shell" => Some(LanguageCommands {
            source_file: "main.sh",
            compile: None,
            run: &["sh", "main.sh"],
        }),
        _ => None,
    }
}

/// Execute a judge job end to end: compile, run every case, aggregate.
///
/// Returns `Err` only for infrastructure failures (blob fetch, workspace IO,
/// spawn errors); those are retried by the caller. Verdicts, including
/// compilation failures, are `Ok` results.
#[instrument(skip(job, storage), fields(submission_id = job.submission_id, job_id = %job.job_id))]
pub async fn handle_judge_job(
    job: &JudgeJob,
    storage: &dyn BlobStore,
    workspace_root: &Path,
) -> anyhow::Result<JudgeResult> {
    let Some(commands) = commands_for(&job.language) else {
        warn!(language = %job.language, "Unsupported language in judge job");
        return Ok(JudgeResult::system_error(
            job.job_id.clone(),
            job.submission_id,
            JudgeErrorInfo::new(
                "UNSUPPORTED_LANGUAGE",
                format!("No toolchain for language {}", job.language),
            ),
        ));
    };

    let workspace = Workspace::create(workspace_root, &job.job_id).await?;

    tokio::fs::write(workspace.path().join(commands.source_file), &job.source)
        .await
        .context("Failed to write source file")?;

    if let Some(compile_cmd) = commands.compile {
        match compile(&workspace, compile_cmd).await? {
            CompileOutcome::Ok => {}
            CompileOutcome::Failed(output) => {
                let case_ids = job
                    .test_cases
                    .iter()
                    .map(|tc| (tc.id, tc.index_no))
                    .collect();
                return Ok(JudgeResult::compilation_error(
                    job.job_id.clone(),
                    job.submission_id,
                    output,
                    case_ids,
                ));
            }
        }
    }

    let mut cases = Vec::with_capacity(job.test_cases.len());
    for tc in &job.test_cases {
        let input = fetch_blob(storage, &tc.input_ref)
            .await
            .with_context(|| format!("Failed to fetch input for test case {}", tc.id))?;
        let expected = fetch_blob(storage, &tc.output_ref)
            .await
            .with_context(|| format!("Failed to fetch expected output for test case {}", tc.id))?;

        let program = commands.run[0];
        let args: Vec<String> = commands.run[1..].iter().map(|s| s.to_string()).collect();

        let execution = runner::run_case(
            program,
            &args,
            workspace.path(),
            &input,
            job.limits.time_limit_ms,
        )
        .await
        .context("Failed to execute test case")?;

        let verdict = runner::classify(&execution, &job.limits, &expected);
        let score = if verdict == CaseVerdict::Passed {
            tc.score
        } else {
            0
        };

        cases.push(TestCaseJudgeResult {
            test_case_id: tc.id,
            index_no: tc.index_no,
            verdict,
            score,
            time_ms: Some(execution.wall_time_ms),
            memory_kb: execution.memory_kb,
        });
    }

    let result = JudgeResult::from_cases(
        job.job_id.clone(),
        job.submission_id,
        None,
        cases,
    );

    info!(
        status = ?result.status,
        passed = result.passed_testcase,
        total = result.total_testcase,
        score = result.score,
        "Judging completed"
    );

    Ok(result)
}

enum CompileOutcome {
    Ok,
    Failed(String),
}

async fn compile(workspace: &Workspace, cmd: &[&str]) -> anyhow::Result<CompileOutcome> {
    let output = Command::new(cmd[0])
        .args(&cmd[1..])
        .current_dir(workspace.path())
        .output()
        .await
        .with_context(|| format!("Failed to spawn compiler {}", cmd[0]))?;

    if output.status.success() {
        Ok(CompileOutcome::Ok)
    } else {
        let mut text = String::from_utf8_lossy(&output.stderr).into_owned();
        if text.is_empty() {
            text = String::from_utf8_lossy(&output.stdout).into_owned();
        }
        Ok(CompileOutcome::Failed(text))
    }
}

async fn fetch_blob(storage: &dyn BlobStore, hex_ref: &str) -> anyhow::Result<Vec<u8>> {
    let hash = ContentHash::from_hex(hex_ref)?;
    Ok(storage.get(&hash).await?)
}

/// Scratch directory for one job, removed on drop.
struct Workspace {
    path: PathBuf,
}

impl Workspace {
    async fn create(root: &Path, job_id: &str) -> anyhow::Result<Self> {
        let path = root.join(job_id);
        tokio::fs::create_dir_all(&path)
            .await
            .context("Failed to create job workspace")?;
        Ok(Self { path })
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.path);
    }
}
