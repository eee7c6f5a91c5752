//! Run command - forward every service of a profile until interrupted.

use std::process::ExitCode;

use anyhow::{Context, Result};
use portfwd_core::{ForwardingOrchestrator, KubectlServiceLister, ShellLauncher, StartOutcome};

use super::{or_current, profiles::print_profile, Globals};

pub async fn run(globals: &Globals, profile: Option<String>) -> Result<ExitCode> {
    let manager = globals.profiles();
    let resolved = manager
        .resolve(profile.as_deref(), &globals.context, &globals.namespace)
        .await
        .with_context(|| {
            format!(
                "unable to load a profile from {}",
                globals.config_path.display()
            )
        })?;

    // With --json, stdout carries only the final session list.
    let status = |line: String| {
        if globals.json {
            eprintln!("{}", line);
        } else {
            println!("{}", line);
        }
    };

    status(format!("Running profile {}", resolved.profile.name));
    status(format!("Context      : {}", or_current(&resolved.context)));
    status(format!("Namespace    : {}", or_current(&resolved.namespace)));
    if !globals.json {
        println!();
        print_profile(&resolved.profile);
    }

    if resolved.profile.services.is_empty() {
        status("Profile has no services. Nothing to forward.".to_string());
        return Ok(ExitCode::SUCCESS);
    }

    let kubectl = KubectlServiceLister::new()
        .kubectl_path()
        .map(|path| path.display().to_string())
        .unwrap_or_else(|| "kubectl".to_string());
    let orchestrator = ForwardingOrchestrator::new(ShellLauncher::with_kubectl(kubectl));

    let outcomes = orchestrator.start(
        &resolved.profile.services,
        &resolved.context,
        &resolved.namespace,
    );
    let failed = report_outcomes(&outcomes);

    if failed < outcomes.len() {
        status("Forwarding. Press Ctrl+C to stop.".to_string());

        tokio::select! {
            _ = orchestrator.wait_all() => {
                status("All sessions ended.".to_string());
            }
            signal = tokio::signal::ctrl_c() => {
                if let Err(e) = signal {
                    tracing::warn!(error = %e, "unable to listen for Ctrl+C");
                }
                status("Stopping sessions...".to_string());
            }
        }

        orchestrator.stop_all().await;
    } else {
        eprintln!("No session could be started.");
    }

    let sessions = orchestrator.sessions();
    if globals.json {
        println!("{}", serde_json::to_string_pretty(&sessions)?);
    } else {
        for session in &sessions {
            println!("  {} : {}", session.key, session.state);
        }
    }

    if failed > 0 {
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

/// Reports one line per start attempt on stderr, returns how many failed.
fn report_outcomes(outcomes: &[StartOutcome]) -> usize {
    let mut failed = 0;
    for outcome in outcomes {
        match &outcome.result {
            Ok(pid) => {
                let pid = pid.map(|p| p.to_string()).unwrap_or_else(|| "?".into());
                eprintln!("[ok] {} (pid {}): {}", outcome.key, pid, outcome.command);
            }
            Err(e) => {
                failed += 1;
                eprintln!("[!!] {}: {}", outcome.key, e);
            }
        }
    }
    failed
}
