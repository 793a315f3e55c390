//! Replay driver entry point.
//!
//! ```text
//! tagdeck <script.json> [--config <config.json>] [--state-dir <dir> | --default-state-dir]
//! ```
//!
//! Without a state directory the session history lives in memory only.

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tagdeck_app::{ReplayError, ReplayReport, Replayer, Script};
use tagdeck_core::storage::{FileStorage, MemoryStorage};
use tagdeck_core::{SessionStorage, TagDeckConfig};

/// Command-line arguments for tagdeck
#[derive(Parser, Debug, Default)]
#[command(name = "tagdeck")]
#[command(about = "Replay a TagDeck interaction script and print what it produced")]
#[command(version)]
struct Args {
    /// Interaction script (JSON)
    script: PathBuf,

    /// Session configuration (JSON); defaults apply when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// Persist session history under this directory
    #[arg(long, conflicts_with = "default_state_dir")]
    state_dir: Option<PathBuf>,

    /// Persist session history under the platform data directory
    #[arg(long)]
    default_state_dir: bool,
}

fn open_storage(args: &Args) -> Result<Arc<dyn SessionStorage>, ReplayError> {
    let storage: Arc<dyn SessionStorage> = match (&args.state_dir, args.default_state_dir) {
        (Some(dir), _) => Arc::new(FileStorage::new(dir.clone())?),
        (None, true) => Arc::new(FileStorage::default_location()?),
        (None, false) => Arc::new(MemoryStorage::new()),
    };
    Ok(storage)
}

fn write_report(out: &mut impl Write, report: &ReplayReport) -> Result<(), ReplayError> {
    serde_json::to_writer_pretty(&mut *out, report).map_err(ReplayError::Output)?;
    writeln!(out).map_err(|e| ReplayError::Output(serde_json::Error::io(e)))
}

fn run(args: Args) -> Result<(), ReplayError> {
    let config = match &args.config {
        Some(path) => TagDeckConfig::load(path)?,
        None => TagDeckConfig::default(),
    };
    let json = std::fs::read_to_string(&args.script).map_err(|source| ReplayError::Io {
        path: args.script.clone(),
        source,
    })?;
    let script = Script::from_json_str(&json)?;
    log::info!("Replaying {} steps from {}", script.steps.len(), args.script.display());

    let storage = open_storage(&args)?;
    let report = Replayer::new(config, &script, storage).run(&script.steps)?;
    write_report(&mut std::io::stdout().lock(), &report)
}

fn main() -> ExitCode {
    env_logger::init();

    let args = Args::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    fn parse(list: &[&str]) -> Result<Args, clap::Error> {
        Args::try_parse_from(std::iter::once("tagdeck").chain(list.iter().copied()))
    }

    #[test]
    fn test_parse_args() {
        let parsed = parse(&["script.json", "--config", "cfg.json", "--state-dir", "/tmp/x"]).unwrap();
        assert_eq!(parsed.script, PathBuf::from("script.json"));
        assert_eq!(parsed.config, Some(PathBuf::from("cfg.json")));
        assert_eq!(parsed.state_dir, Some(PathBuf::from("/tmp/x")));
        assert!(!parsed.default_state_dir);

        let parsed = parse(&["--default-state-dir", "script.json"]).unwrap();
        assert!(parsed.default_state_dir);
        assert_eq!(parsed.state_dir, None);
    }

    #[test]
    fn test_parse_args_errors() {
        let kind = |list: &[&str]| parse(list).unwrap_err().kind();
        assert_eq!(kind(&[]), ErrorKind::MissingRequiredArgument);
        assert_eq!(kind(&["a.json", "--config"]), ErrorKind::InvalidValue);
        assert_eq!(kind(&["a.json", "--verbose"]), ErrorKind::UnknownArgument);
        assert_eq!(kind(&["a.json", "b.json"]), ErrorKind::UnknownArgument);
        assert_eq!(
            kind(&["a.json", "--state-dir", "/tmp/x", "--default-state-dir"]),
            ErrorKind::ArgumentConflict
        );
    }

    #[test]
    fn test_report_is_written_as_json() {
        let script = Script::from_json_str(r#"{"tenant": "acme", "items": [{"id": 1}], "steps": []}"#).unwrap();
        let report = Replayer::new(TagDeckConfig::default(), &script, Arc::new(MemoryStorage::new()))
            .run(&script.steps)
            .unwrap();

        let mut out = Vec::new();
        write_report(&mut out, &report).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value["tenant"], "acme");
        assert!(out.ends_with(b"\n"));
    }

    #[test]
    fn test_file_storage_keeps_history() {
        let dir = tempfile::tempdir().unwrap();
        let parsed = Args {
            state_dir: Some(dir.path().to_path_buf()),
            ..Args::default()
        };
        let script = Script::from_json_str(
            r#"{
                "tenant": "acme",
                "items": [{"id": 3}],
                "steps": [
                    {"action": {"type": "configure_target", "target": 1, "keyword": "Birds::Owl"}},
                    {"action": {"type": "drag", "pane": "results", "item_id": 3}},
                    {"action": {"type": "drop_hotspot", "target": 1}}
                ]
            }"#,
        )
        .unwrap();

        let report = Replayer::new(TagDeckConfig::default(), &script, open_storage(&parsed).unwrap())
            .run(&script.steps)
            .unwrap();
        assert_eq!(report.total_history, 1);
        assert!(dir.path().join("hotspot-history").join("acme.json").exists());
    }
}
