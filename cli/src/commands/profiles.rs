//! Profiles command - show the profile file or create it.

use std::process::ExitCode;

use anyhow::{Context, Result};
use portfwd_core::{InitOutcome, Profile, ProfileCollection, ProfileStore};

use super::Globals;

pub async fn show(globals: &Globals, init: bool, overwrite: bool) -> Result<ExitCode> {
    let manager = globals.profiles();
    let path = globals.config_path.display();

    if init {
        let outcome = manager
            .init(&globals.context, &globals.namespace, overwrite)
            .await
            .with_context(|| format!("failed to create profile file {}", path))?;

        match outcome {
            InitOutcome::Created => println!("Created profile file {}", path),
            InitOutcome::Overwritten => println!("Overwrote profile file {}", path),
            InitOutcome::AlreadyExists => {
                println!(
                    "Profile file found at {}. Use --init with --overwrite to replace it.",
                    path
                );
            }
        }
        return Ok(ExitCode::SUCCESS);
    }

    if !manager.store().exists() {
        println!("No profiles found at {}. Try the --init flag.", path);
        return Ok(ExitCode::SUCCESS);
    }

    let profiles = manager
        .load()
        .await
        .with_context(|| format!("unable to read profiles from {}", path))?;

    if globals.json {
        println!("{}", serde_json::to_string_pretty(&profiles)?);
    } else {
        println!("Profile file: {}", path);
        print_profiles(&profiles);
    }

    Ok(ExitCode::SUCCESS)
}

fn print_profiles(profiles: &ProfileCollection) {
    println!("Context: {}", profiles.context);
    println!("Namespace: {}", profiles.namespace);
    println!("Default profile: {}", profiles.default_profile);
    println!();

    for profile in &profiles.profiles {
        print_profile(profile);
    }

    for name in profiles.duplicate_names() {
        eprintln!("Warning: profile name '{}' is used more than once", name);
    }
}

pub fn print_profile(profile: &Profile) {
    println!("Profile: {}", profile.name);
    println!(
        "  Context: {}, Namespace: {}",
        profile.context, profile.namespace
    );
    println!("  Services:");
    for service in &profile.services {
        let ports: Vec<String> = service.ports.iter().map(u16::to_string).collect();
        let mut line = format!("    - Name: {}, Ports: [{}]", service.name, ports.join(" "));
        if let Some(context) = service.context_override() {
            line.push_str(&format!(", Context: {}", context));
        }
        if let Some(namespace) = service.namespace_override() {
            line.push_str(&format!(", Namespace: {}", namespace));
        }
        println!("{}", line);
    }
    println!();
}
