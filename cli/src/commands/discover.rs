//! Discover command - list services, report port conflicts, optionally save a profile.

use std::io::Write;
use std::process::ExitCode;

use anyhow::{Context, Result};
use portfwd_core::{
    DiscoveryReport, DiscoveryService, KubectlServiceLister, ProfileManager, ProfileStore,
    SavedProfile, ServiceLister,
};

use super::{or_current, Globals};

/// Flags of the discover command.
#[derive(Debug, Clone, Default)]
pub struct DiscoverOptions {
    pub quiet: bool,
    pub save: bool,
    pub name: Option<String>,
    pub json: bool,
}

/// How a discover invocation ended.
#[derive(Debug)]
pub enum DiscoverOutcome {
    /// Report printed, nothing saved.
    Listed,
    /// Ports conflict and `--quiet` was not given; nothing was saved.
    Conflicts,
    /// `--save` was given but no services were found.
    NothingToSave,
    Saved(SavedProfile),
}

impl DiscoverOutcome {
    pub fn succeeded(&self) -> bool {
        !matches!(self, Self::Conflicts)
    }

    pub fn exit_code(&self) -> ExitCode {
        if self.succeeded() {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        }
    }
}

pub async fn run(
    globals: &Globals,
    quiet: bool,
    save: bool,
    name: Option<String>,
) -> Result<ExitCode> {
    let manager = globals.profiles();
    let (context, namespace) = globals.target(&manager).await;
    let discovery = DiscoveryService::new(KubectlServiceLister::new());
    let options = DiscoverOptions {
        quiet,
        save,
        name,
        json: globals.json,
    };

    let outcome = execute(
        &discovery,
        &manager,
        &context,
        &namespace,
        &options,
        &mut std::io::stdout().lock(),
    )
    .await?;

    Ok(outcome.exit_code())
}

/// Discovers `context`/`namespace`, writes the report to `out` and saves a
/// profile when asked to and no unacknowledged conflict stops it.
pub async fn execute<L, S, W>(
    discovery: &DiscoveryService<L>,
    manager: &ProfileManager<S>,
    context: &str,
    namespace: &str,
    options: &DiscoverOptions,
    out: &mut W,
) -> Result<DiscoverOutcome>
where
    L: ServiceLister,
    S: ProfileStore,
    W: Write,
{
    if !options.json {
        writeln!(out, "Discovering services")?;
        writeln!(out, "Context      : {}", or_current(context))?;
        writeln!(out, "Namespace    : {}", or_current(namespace))?;
        writeln!(out)?;
    }

    let report = discovery
        .discover(context, namespace)
        .await
        .with_context(|| {
            format!(
                "discovery failed for context {} namespace {}",
                or_current(context),
                or_current(namespace)
            )
        })?;

    if options.json {
        writeln!(out, "{}", serde_json::to_string_pretty(&report)?)?;
    } else {
        write_report(out, &report)?;
    }

    if report.has_conflicts() && !options.quiet {
        return Ok(DiscoverOutcome::Conflicts);
    }

    if !options.save {
        return Ok(DiscoverOutcome::Listed);
    }

    if report.services.is_empty() {
        eprintln!("No services found. Skipping profile creation.");
        return Ok(DiscoverOutcome::NothingToSave);
    }

    let name = options
        .name
        .clone()
        .filter(|n| !n.is_empty())
        .unwrap_or_else(generated_profile_name);

    // Skipped ports are logged as warnings during the conversion.
    let saved = manager
        .save_discovered(&name, context, namespace, &report.services)
        .await
        .with_context(|| format!("failed to save profile {}", name))?;

    if !options.json {
        writeln!(out, "---")?;
        writeln!(out, "Created profile {}", saved.profile.name)?;
        writeln!(out, "{} services", saved.profile.services.len())?;
        if !saved.skipped.is_empty() {
            writeln!(out, "{} ports skipped", saved.skipped.len())?;
        }
        writeln!(out, "Saved to {}", manager.store().location())?;
        writeln!(out, "---")?;
    }

    Ok(DiscoverOutcome::Saved(saved))
}

fn write_report(out: &mut impl Write, report: &DiscoveryReport) -> std::io::Result<()> {
    writeln!(out, "---")?;
    for service in &report.services {
        writeln!(out, "{} --> {}", service.name, service.ports_display())?;
    }
    writeln!(out, "---")?;

    if report.has_conflicts() {
        writeln!(out, "[!!] Conflicting ports: {}", report.conflicts.join(" "))
    } else {
        writeln!(out, "[ok] Conflicting ports: none")
    }
}

fn generated_profile_name() -> String {
    let nanos = chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default();
    format!("new-profile-{}", nanos)
}
