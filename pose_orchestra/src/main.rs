//! pose_orchestra — conduct a note loop with your arms.

use anyhow::Context;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use pose_orchestra::app::{run, AppConfig, SourceKind, USAGE};

fn main() -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(env_filter)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.iter().any(|a| a == "--help" || a == "-h") {
        println!("{}", USAGE);
        return Ok(());
    }

    let cfg = AppConfig::from_args(args)
        .with_context(|| format!("bad command line\n\n{}", USAGE))?;

    println!();
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║          Pose Orchestra — gesture-conducted note loop        ║");
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();
    match &cfg.source {
        SourceKind::Simulated    => println!("  Source: simulated performer"),
        SourceKind::Replay(path) => println!("  Source: {}", path.display()),
    }
    println!("  Frame:  {}×{}", cfg.frame.width(), cfg.frame.height());
    println!("  Output: {}", if cfg.midi { "MIDI" } else { "none" });
    println!();
    println!("  Raise both arms to start, lower them to stop.");
    println!("  Right hand sets the tempo, left hand the note; clap for percussion.");
    println!();

    let summary = run(cfg).context("session failed")?;

    let t = &summary.tally;
    println!();
    println!("  ── Session summary ─────────────────────────────────────────");
    println!("  Duration:     {:.1} s ({} ticks, {} frames)",
             summary.elapsed.as_secs_f64(), summary.ticks, summary.frames);
    println!("  Loop:         {} start(s), {} stop(s), {} tempo change(s)",
             t.loop_starts, t.loop_stops, t.tempo_changes);
    println!("  Notes:        {}", t.notes);
    println!("  Clap loop:    {} start(s), {} stop(s)", t.clap_loop_starts, t.clap_loop_stops);
    if let Some(bpm) = t.last_bpm {
        println!("  Last tempo:   {} BPM", bpm);
    }
    println!("  Last note:    {}", summary.final_state.current_pitch());
    println!();

    Ok(())
}
