use std::path::PathBuf;
use std::time::Duration;

/// Which pretrained voice-cloning backend this worker serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Xtts,
    IndexTts,
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Backend::Xtts => write!(f, "xtts"),
            Backend::IndexTts => write!(f, "indextts"),
        }
    }
}

impl std::str::FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "xtts" => Ok(Backend::Xtts),
            "indextts" => Ok(Backend::IndexTts),
            other => Err(format!(
                "unknown backend '{}' (expected 'xtts' or 'indextts')",
                other
            )),
        }
    }
}

pub struct WorkerConfig {
    pub host: String,
    pub port: u16,
    pub backend: Backend,
    pub model_dir: PathBuf,
    pub checkpoint_dir: PathBuf,
    pub fetch_timeout: Duration,
}

impl WorkerConfig {
    /// Read configuration from the environment, with the defaults the
    /// serving image ships with.
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "8000".to_string())
            .parse()
            .expect("PORT must be a number");
        let backend: Backend = std::env::var("TTS_BACKEND")
            .unwrap_or_else(|_| "xtts".to_string())
            .parse()
            .expect("TTS_BACKEND must be 'xtts' or 'indextts'");
        let model_dir =
            std::env::var("MODEL_DIR").unwrap_or_else(|_| "/model_cache".to_string());
        let checkpoint_dir =
            std::env::var("CHECKPOINT_DIR").unwrap_or_else(|_| "/checkpoints".to_string());
        let fetch_timeout_secs: u64 = std::env::var("FETCH_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".to_string())
            .parse()
            .expect("FETCH_TIMEOUT_SECS must be a number");

        Self {
            host,
            port,
            backend,
            model_dir: model_dir.into(),
            checkpoint_dir: checkpoint_dir.into(),
            fetch_timeout: Duration::from_secs(fetch_timeout_secs),
        }
    }
}
