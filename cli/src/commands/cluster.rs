//! Contexts and namespaces commands.

use std::process::ExitCode;

use anyhow::{Context, Result};
use portfwd_core::{DiscoveryService, KubectlServiceLister};

use super::{or_current, Globals};

pub async fn contexts(globals: &Globals) -> Result<ExitCode> {
    let discovery = DiscoveryService::new(KubectlServiceLister::new());
    let contexts = discovery
        .contexts()
        .await
        .context("unable to list contexts")?;

    print_names(globals, "Contexts", &contexts)
}

pub async fn namespaces(globals: &Globals) -> Result<ExitCode> {
    let discovery = DiscoveryService::new(KubectlServiceLister::new());
    let namespaces = discovery
        .namespaces(&globals.context)
        .await
        .with_context(|| {
            format!(
                "unable to list namespaces for context {}",
                or_current(&globals.context)
            )
        })?;

    print_names(globals, "Namespaces", &namespaces)
}

fn print_names(globals: &Globals, title: &str, names: &[String]) -> Result<ExitCode> {
    if globals.json {
        println!("{}", serde_json::to_string_pretty(names)?);
        return Ok(ExitCode::SUCCESS);
    }

    println!("{}:", title);
    for name in names {
        println!("  {}", name);
    }
    Ok(ExitCode::SUCCESS)
}
