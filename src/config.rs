//! Startup configuration from environment variables.

use std::env;
use std::path::PathBuf;

/// Fixture to load instead of a fresh game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Setup {
    NearGameOver,
    NearWin,
}

impl Setup {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "near-end" | "near-game-over" | "debug" => Some(Setup::NearGameOver),
            "near-win" | "win" => Some(Setup::NearWin),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub seed: u32,
    pub best_score_path: PathBuf,
    pub setup: Option<Setup>,
}

impl AppConfig {
    /// Read `T2048_SEED`, `T2048_BEST_SCORE_PATH` and `T2048_SETUP`.
    pub fn from_env() -> Self {
        let seed = env::var("T2048_SEED")
            .ok()
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or_else(rand::random);

        let best_score_path = env::var("T2048_BEST_SCORE_PATH")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(default_best_score_path);

        let setup = env::var("T2048_SETUP").ok().and_then(|s| {
            let setup = Setup::from_str(&s);
            if setup.is_none() {
                log::warn!("unknown T2048_SETUP value {:?}", s);
            }
            setup
        });

        Self {
            seed,
            best_score_path,
            setup,
        }
    }
}

fn default_best_score_path() -> PathBuf {
    match env::var_os("HOME").filter(|h| !h.is_empty()) {
        Some(home) => PathBuf::from(home).join(".tui-2048").join("best_score.json"),
        None => PathBuf::from("best_score.json"),
    }
}
