use anyhow::{Result, anyhow};
use log::info;
use pico_args::Arguments;
use signal_hook::{consts::TERM_SIGNALS, flag};
use std::{
    env, fs,
    io::{self, BufReader},
    path::PathBuf,
    sync::{Arc, atomic::AtomicBool},
};

use crate::config::{Profile, ProfileStore};
use crate::exercise::{ExerciseKind, ExercisePlan};
use crate::session::Session;
use crate::stream;

pub fn run() -> Result<()> {
    let mut pargs = Arguments::from_env();

    // No args -> general help
    if env::args().len() == 1 {
        print_help();
        return Ok(());
    }

    if pargs.contains("-h") || pargs.contains("--help") {
        print_help();
        return Ok(());
    }

    // First free arg is the subcommand
    let subcmd: Option<String> = pargs.free_from_str().ok();

    match subcmd.as_deref() {
        Some("help") => {
            let topic: Option<String> = pargs.free_from_str().ok();
            if let Some(t) = topic {
                print_subcmd_help(&t);
            } else {
                print_help();
            }
            Ok(())
        }

        Some("analyze") => {
            let profile_file: Option<PathBuf> = pargs.opt_value_from_str("--profile")?;
            let input: Option<PathBuf> = pargs.opt_value_from_str("--input")?;
            let strict = pargs.contains("--strict");
            let exercise: String = pargs
                .free_from_str()
                .map_err(|_| anyhow!("usage: formctl analyze <exercise> [--input F] [--profile F]"))?;
            let kind: ExerciseKind = exercise.parse()?;
            analyze(kind, load_profile(profile_file)?, input, strict)
        }

        Some("list") => {
            let store = ProfileStore::open_or_install_default()?;
            for name in store.list_profiles() {
                let mark = if name == store.active_name { "*" } else { " " };
                println!("{mark} {name}");
            }
            Ok(())
        }

        Some("use") => {
            let name: String = pargs
                .free_from_str()
                .map_err(|_| anyhow!("usage: formctl use <profile_name>"))?;
            let mut store = ProfileStore::open_or_install_default()?;
            store.set_active(&name)?;
            println!("ok: active profile is {}", store.active_name);
            Ok(())
        }

        Some("show") => {
            let profile_file: Option<PathBuf> = pargs.opt_value_from_str("--profile")?;
            let exercise: Option<String> = pargs.free_from_str().ok();
            let profile = load_profile(profile_file)?;
            let value = match exercise {
                Some(e) => {
                    let kind: ExerciseKind = e.parse()?;
                    let mut all = serde_json::to_value(&profile)?;
                    all.get_mut(kind.name())
                        .map(serde_json::Value::take)
                        .unwrap_or_default()
                }
                None => serde_json::to_value(&profile)?,
            };
            print_response(&value);
            Ok(())
        }

        Some("check") => {
            let file: Option<PathBuf> = pargs.free_from_str().ok();
            let profile = load_profile(file)?;
            for kind in ExerciseKind::ALL {
                let plan = ExercisePlan::build(kind, &profile)?;
                println!("ok: {} ({} tracker(s))", kind.name(), plan.trackers.len());
            }
            Ok(())
        }

        Some(other) => {
            eprintln!("unknown subcommand: {other}\n");
            print_help();
            Ok(())
        }

        None => {
            print_help();
            Ok(())
        }
    }
}

/// An explicit file wins over the active profile.
fn load_profile(file: Option<PathBuf>) -> Result<Profile> {
    match file {
        Some(path) => Profile::load_file(&path),
        None => {
            let store = ProfileStore::open_or_install_default()?;
            info!("using profile '{}'", store.active_name);
            store.load_active()
        }
    }
}

fn analyze(kind: ExerciseKind, profile: Profile, input: Option<PathBuf>, strict: bool) -> Result<()> {
    let mut session = Session::new(ExercisePlan::build(kind, &profile)?)?;

    // First signal stops between frames; a second one exits immediately.
    let stop = Arc::new(AtomicBool::new(false));
    for sig in TERM_SIGNALS {
        flag::register_conditional_shutdown(*sig, 1, Arc::clone(&stop))?;
        flag::register(*sig, Arc::clone(&stop))?;
    }

    let stdout = io::stdout().lock();
    let stats = match input {
        Some(path) => {
            let f = fs::File::open(&path)
                .map_err(|e| anyhow!("failed to open {}: {e}", path.display()))?;
            stream::run(&mut session, BufReader::new(f), stdout, strict, &stop)?
        }
        None => stream::run(&mut session, io::stdin().lock(), stdout, strict, &stop)?,
    };

    info!(
        "{}: {} frame(s), {} skipped, {} reset(s)",
        kind.name(),
        stats.frames,
        stats.skipped,
        stats.resets
    );
    for side in session.summary() {
        info!(
            "  {:?}: {} rep(s), errors {:?}",
            side.side, side.reps, side.errors
        );
    }
    Ok(())
}

fn print_help() {
    println!(
        r#"formctl — exercise repetition and form analysis

USAGE:
  formctl help [command]                  Show general or command-specific help
  formctl analyze <exercise> [options]    Analyze a JSON-lines landmark stream
  formctl list                            List profiles
  formctl use <name>                      Switch active profile
  formctl show [exercise]                 Print effective thresholds
  formctl check [file]                    Validate a profile

EXERCISES:
  bicep_curl, lunge, squat, plank

TIPS:
  - Profiles: ~/.config/formctl/profiles
  - Active profile pointer: ~/.config/formctl/active
  - RUST_LOG=debug shows stage transitions and form errors
"#
    );
}

fn print_subcmd_help(cmd: &str) {
    match cmd {
        "analyze" => println!(
            "usage: formctl analyze <exercise> [--input FILE] [--profile FILE] [--strict]\n\
             Reads one frame per line (stdin by default) and writes one event per line.\n\
             Frame: {{\"landmarks\": {{\"LEFT_ELBOW\": {{\"x\":..,\"y\":..,\"visibility\":..}}, ..}},\n\
             \x20       \"classification\": {{\"label\": \"correct\", \"probability\": 0.97}}}}\n\
             `landmarks` may also be the raw 33-entry pose array; null means no subject.\n\
             {{\"reset\": true}} zeroes the session. --strict aborts on a malformed line."
        ),
        "list" => {
            println!("usage: formctl list\nLists available profiles; marks active with '*'.")
        }
        "use" => {
            println!("usage: formctl use <name>\nSwitches active profile to <name> if it validates.")
        }
        "show" => println!(
            "usage: formctl show [exercise] [--profile FILE]\nPrints the thresholds in effect as JSON."
        ),
        "check" => println!(
            "usage: formctl check [file]\nValidates a profile file (default: the active profile)."
        ),
        _ => {
            eprintln!("unknown command: {cmd}\n");
            print_help();
        }
    }
}

fn print_response(v: &serde_json::Value) {
    println!("{}", serde_json::to_string_pretty(v).unwrap_or_default());
}
