//! Headless front end: decode an audio file, run automatic segmentation and
//! export the result without opening the editor window.

use std::path::PathBuf;
use std::process::ExitCode;

use engine::{Command, Engine, Event, Settings, Snapshot, format_mmss};

const USAGE: &str = "usage: cli <audio-file> [--min-len SECONDS] [--csv PATH] [--png PATH] \
                     [--project PATH]";

#[derive(Debug, Clone, PartialEq)]
struct Args {
    audio: PathBuf,
    min_len: Option<f64>,
    csv: Option<PathBuf>,
    png: Option<PathBuf>,
    project: Option<PathBuf>,
}

fn main() -> ExitCode {
    let _ = tracing_subscriber::fmt::try_init();

    let args = match parse_args(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(message) => {
            eprintln!("{message}");
            eprintln!("{USAGE}");
            return ExitCode::FAILURE;
        }
    };

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("error: {error}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> engine::Result<()> {
    let mut engine = Engine::with_native_backends();
    if let Some(min_len) = args.min_len {
        engine.set_settings(Settings {
            min_segment_len: min_len,
            ..engine.settings()
        });
    }

    engine.handle_command(Command::Load {
        path: args.audio.clone(),
    })?;
    let events = engine.handle_command(Command::Analyze)?;
    if let Some(snapshot) = latest_snapshot(&events) {
        print_segments(snapshot);
    }

    if let Some(path) = args.csv {
        engine.handle_command(Command::ExportCsv { path: path.clone() })?;
        println!("wrote {}", path.display());
    }
    if let Some(path) = args.png {
        engine.handle_command(Command::ExportPng { path: path.clone() })?;
        println!("wrote {}", path.display());
    }
    if let Some(path) = args.project {
        engine.handle_command(Command::SaveProject { path: path.clone() })?;
        println!("wrote {}", path.display());
    }

    Ok(())
}

fn print_segments(snapshot: &Snapshot) {
    for segment in &snapshot.segments {
        println!(
            "{}\t{}\t{}",
            format_mmss(segment.start),
            format_mmss(segment.end),
            segment.label
        );
    }
}

fn latest_snapshot(events: &[Event]) -> Option<&Snapshot> {
    events.iter().rev().find_map(|event| match event {
        Event::SessionChanged(snapshot) => Some(snapshot),
        _ => None,
    })
}

fn parse_args(mut raw: impl Iterator<Item = String>) -> Result<Args, String> {
    let audio = match raw.next() {
        Some(first) if first != "--help" && first != "-h" => PathBuf::from(first),
        _ => return Err(String::from("missing audio file argument")),
    };

    let mut args = Args {
        audio,
        min_len: None,
        csv: None,
        png: None,
        project: None,
    };

    while let Some(flag) = raw.next() {
        let value = raw
            .next()
            .ok_or_else(|| format!("flag {flag} needs a value"))?;
        match flag.as_str() {
            "--min-len" => {
                let parsed: f64 = value
                    .parse()
                    .map_err(|_| format!("invalid --min-len value: {value}"))?;
                if parsed <= 0.0 {
                    return Err(format!("--min-len must be positive, got {value}"));
                }
                args.min_len = Some(parsed);
            }
            "--csv" => args.csv = Some(PathBuf::from(value)),
            "--png" => args.png = Some(PathBuf::from(value)),
            "--project" => args.project = Some(PathBuf::from(value)),
            other => return Err(format!("unknown flag: {other}")),
        }
    }

    Ok(args)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::parse_args;

    fn owned(args: &[&str]) -> impl Iterator<Item = String> {
        args.iter()
            .map(|arg| arg.to_string())
            .collect::<Vec<_>>()
            .into_iter()
    }

    #[test]
    fn parses_the_audio_path_and_all_flags() {
        let args = parse_args(owned(&[
            "song.mp3",
            "--min-len",
            "5.5",
            "--csv",
            "out.csv",
            "--png",
            "out.png",
            "--project",
            "song.json",
        ]))
        .expect("args should parse");

        assert_eq!(args.audio, PathBuf::from("song.mp3"));
        assert_eq!(args.min_len, Some(5.5));
        assert_eq!(args.csv, Some(PathBuf::from("out.csv")));
        assert_eq!(args.png, Some(PathBuf::from("out.png")));
        assert_eq!(args.project, Some(PathBuf::from("song.json")));
    }

    #[test]
    fn rejects_a_missing_audio_argument() {
        assert!(parse_args(owned(&[])).is_err());
        assert!(parse_args(owned(&["--help"])).is_err());
    }

    #[test]
    fn rejects_unknown_flags_and_bad_values() {
        assert!(parse_args(owned(&["song.mp3", "--loudness", "9"])).is_err());
        assert!(parse_args(owned(&["song.mp3", "--min-len", "soon"])).is_err());
        assert!(parse_args(owned(&["song.mp3", "--min-len", "-2"])).is_err());
        assert!(parse_args(owned(&["song.mp3", "--csv"])).is_err());
    }
}
