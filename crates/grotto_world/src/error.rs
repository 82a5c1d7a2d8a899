use std::fmt;
use std::path::PathBuf;

use rayon::ThreadPoolBuildError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorldGenError {
    InvalidDimensions { width: u32, height: u32 },
}

impl fmt::Display for WorldGenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidDimensions { width, height } => write!(
                f,
                "invalid world dimensions {width}x{height}: playable area too small or world too large"
            ),
        }
    }
}

impl std::error::Error for WorldGenError {}

#[derive(Debug)]
pub enum ConfigError {
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read { path, source } => {
                write!(f, "failed to read world config {}: {source}", path.display())
            }
            Self::Parse { path, source } => {
                write!(f, "failed to parse world config {}: {source}", path.display())
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Read { source, .. } => Some(source),
            Self::Parse { source, .. } => Some(source),
        }
    }
}

#[derive(Debug)]
pub enum WorldError {
    Generation(WorldGenError),
    Workers(ThreadPoolBuildError),
}

impl fmt::Display for WorldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Generation(err) => write!(f, "world generation failed: {err}"),
            Self::Workers(err) => write!(f, "failed to start light workers: {err}"),
        }
    }
}

impl std::error::Error for WorldError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Generation(err) => Some(err),
            Self::Workers(err) => Some(err),
        }
    }
}

impl From<WorldGenError> for WorldError {
    fn from(value: WorldGenError) -> Self {
        Self::Generation(value)
    }
}

impl From<ThreadPoolBuildError> for WorldError {
    fn from(value: ThreadPoolBuildError) -> Self {
        Self::Workers(value)
    }
}
