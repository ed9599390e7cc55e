//! Entry point for the livestats watcher. Parses args, resolves a profile and
//! prints one line per telemetry update for the chosen resource.

mod display;
mod profiles;

use std::env;
use std::io::{self, Write};

use anyhow::anyhow;
use livestats::{ControllerTask, LifecycleState, TelemetryController, WsChannel};
use profiles::{
    load_profiles, save_profiles, ProfileEntry, ProfileRequest, ProfilesFile, ResolveProfile,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

const USAGE: &str = "[--profile NAME|-P NAME] [--save] [--no-live] [--samples N|-n N] [--dry-run] [ws://HOST:PORT] [RESOURCE_ID]";

struct ParsedArgs {
    url: Option<String>,
    resource: Option<String>,
    profile: Option<String>,
    save: bool,
    live: bool,
    samples: Option<usize>,
    dry_run: bool,
}

fn parse_args<I: IntoIterator<Item = String>>(args: I) -> Result<ParsedArgs, String> {
    let mut it = args.into_iter();
    let prog = it.next().unwrap_or_else(|| "livestats".into());
    let mut parsed = ParsedArgs {
        url: None,
        resource: None,
        profile: None,
        save: false,
        live: true,
        samples: None,
        dry_run: false,
    };

    while let Some(arg) = it.next() {
        match arg.as_str() {
            "-h" | "--help" => return Err(format!("Usage: {prog} {USAGE}")),
            "--profile" | "-P" => parsed.profile = it.next(),
            "--save" => parsed.save = true,
            "--no-live" => parsed.live = false,
            "--dry-run" => parsed.dry_run = true,
            "--samples" | "-n" => {
                let v = it.next().unwrap_or_default();
                parsed.samples = Some(parse_count(&v, &prog)?);
            }
            _ if arg.starts_with("--profile=") => {
                if let Some((_, v)) = arg.split_once('=') {
                    if !v.is_empty() {
                        parsed.profile = Some(v.to_string());
                    }
                }
            }
            _ if arg.starts_with("--samples=") => {
                if let Some((_, v)) = arg.split_once('=') {
                    parsed.samples = Some(parse_count(v, &prog)?);
                }
            }
            _ if arg.contains("://") && parsed.url.is_none() => parsed.url = Some(arg),
            _ if !arg.starts_with('-') && parsed.resource.is_none() => parsed.resource = Some(arg),
            _ => return Err(format!("Unexpected argument '{arg}'. Usage: {prog} {USAGE}")),
        }
    }
    Ok(parsed)
}

fn parse_count(v: &str, prog: &str) -> Result<usize, String> {
    v.parse::<usize>()
        .map_err(|_| format!("--samples expects a number, got '{v}'. Usage: {prog} {USAGE}"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let parsed = match parse_args(env::args()) {
        Ok(v) => v,
        Err(msg) => {
            eprintln!("{msg}");
            return Ok(());
        }
    };

    let Some(target) = resolve_target(&parsed)? else {
        return Ok(());
    };
    let Some(resource) = target.resource.clone() else {
        eprintln!("No resource id given (pass RESOURCE_ID or store one in the profile).");
        return Ok(());
    };

    if parsed.dry_run {
        println!("would watch resource {resource} at {}", target.url);
        return Ok(());
    }

    watch(&target.url, resource, &parsed).await
}

fn init_tracing() {
    // Keep the console for status lines; logs go to stderr and default to warnings
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

/// Work out what to watch, persisting profile changes on the way.
fn resolve_target(parsed: &ParsedArgs) -> anyhow::Result<Option<ProfileEntry>> {
    let mut profiles = load_profiles();
    let req = ProfileRequest {
        profile_name: parsed.profile.clone(),
        url: parsed.url.clone(),
        resource: parsed.resource.clone(),
    };

    let entry = match req.resolve(&profiles) {
        ResolveProfile::Direct(entry) => {
            if let Some(name) = parsed.profile.as_ref() {
                remember(&mut profiles, name, &entry, parsed.save)?;
            }
            entry
        }
        ResolveProfile::Loaded(entry) => entry,
        ResolveProfile::PromptSelect(names) => match prompt_select(&names)? {
            Some(name) => match profiles.profiles.get(&name) {
                Some(entry) => ProfileEntry {
                    url: entry.url.clone(),
                    resource: parsed.resource.clone().or_else(|| entry.resource.clone()),
                },
                None => return Ok(None),
            },
            None => return Ok(None),
        },
        ResolveProfile::PromptCreate(name) => {
            eprintln!("Profile '{name}' does not exist yet.");
            let url = prompt_string("Enter agent URL (ws://HOST:PORT or wss://...): ")?;
            if url.is_empty() {
                return Ok(None);
            }
            let resource = match parsed.resource.clone() {
                Some(r) => Some(r),
                None => Some(prompt_string("Enter resource id (or leave blank): ")?)
                    .filter(|r| !r.is_empty()),
            };
            let entry = ProfileEntry { url, resource };
            profiles.profiles.insert(name, entry.clone());
            save_profiles(&profiles)?;
            entry
        }
        ResolveProfile::None => {
            eprintln!("No URL provided and no profiles to select.");
            return Ok(None);
        }
    };
    Ok(Some(entry))
}

// New profiles are saved right away; changed ones only with --save or after confirmation
fn remember(
    profiles: &mut ProfilesFile,
    name: &str,
    entry: &ProfileEntry,
    force: bool,
) -> io::Result<()> {
    let write = match profiles.profiles.get(name) {
        None => true,
        Some(existing) if existing == entry => false,
        Some(_) => {
            force || prompt_yes_no(&format!("Overwrite existing profile '{name}'? [y/N]: "))
        }
    };
    if write {
        profiles.profiles.insert(name.to_string(), entry.clone());
        save_profiles(profiles)?;
    }
    Ok(())
}

async fn watch(url: &str, resource: String, args: &ParsedArgs) -> anyhow::Result<()> {
    let mut controller = TelemetryController::new(WsChannel::new(url)?);
    controller.select_resource(Some(resource));
    controller.set_live_requested(args.live);
    controller.set_resource_running(true);
    let ControllerTask {
        controls,
        mut view,
        join,
    } = controller.spawn();
    controls.set_viewer_open(true);

    eprintln!("Commands: l + Enter toggles live, q + Enter quits.");
    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let mut last_line = String::new();
    let mut last_sample = None;
    let mut seen = 0usize;
    let mut failure = None;

    loop {
        tokio::select! {
            changed = view.changed() => {
                if changed.is_err() {
                    break;
                }
                let v = view.borrow_and_update().clone();
                let line = display::status_line(&v);
                if line != last_line {
                    println!("{line}");
                    last_line = line;
                }
                let ts = v.latest.as_ref().map(|s| s.timestamp);
                if ts.is_some() && ts != last_sample {
                    last_sample = ts;
                    seen += 1;
                }
                if args.samples.is_some_and(|n| seen >= n) {
                    break;
                }
                // With no stdin nobody can turn live back on
                if v.state == LifecycleState::Errored && !stdin_open {
                    failure = v.last_error.clone();
                    break;
                }
            }
            line = stdin.next_line(), if stdin_open => match line {
                Ok(Some(cmd)) => match cmd.trim() {
                    "l" => {
                        let live = view.borrow().live_requested;
                        controls.set_live_requested(!live);
                    }
                    "q" => break,
                    _ => {}
                },
                _ => {
                    stdin_open = false;
                    let v = view.borrow();
                    if v.state == LifecycleState::Errored {
                        failure = v.last_error.clone();
                        break;
                    }
                }
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    controls.shutdown();
    let _ = join.await;
    match failure {
        Some(err) => Err(anyhow!("stats stream failed: {err}")),
        None => Ok(()),
    }
}

fn prompt_select(names: &[String]) -> io::Result<Option<String>> {
    eprintln!("Select profile:");
    for (i, n) in names.iter().enumerate() {
        eprintln!("  {}. {}", i + 1, n);
    }
    let line = prompt_string("Enter number (or blank to abort): ")?;
    Ok(line
        .parse::<usize>()
        .ok()
        .filter(|idx| (1..=names.len()).contains(idx))
        .map(|idx| names[idx - 1].clone()))
}

fn prompt_yes_no(prompt: &str) -> bool {
    match prompt_string(prompt) {
        Ok(line) => matches!(line.to_ascii_lowercase().as_str(), "y" | "yes"),
        Err(_) => false,
    }
}

fn prompt_string(prompt: &str) -> io::Result<String> {
    eprint!("{prompt}");
    let _ = io::stderr().flush();
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(v: &[&str]) -> Vec<String> {
        std::iter::once("livestats")
            .chain(v.iter().copied())
            .map(String::from)
            .collect()
    }

    #[test]
    fn positional_url_and_resource() {
        let p = parse_args(args(&["ws://agent:3000", "4242", "--no-live", "-n", "3"])).unwrap();
        assert_eq!(p.url.as_deref(), Some("ws://agent:3000"));
        assert_eq!(p.resource.as_deref(), Some("4242"));
        assert!(!p.live);
        assert_eq!(p.samples, Some(3));
    }

    #[test]
    fn bad_sample_count_and_extra_args_are_rejected() {
        assert!(parse_args(args(&["--samples", "many"])).is_err());
        assert!(parse_args(args(&["ws://a", "1", "2"])).is_err());
    }
}
