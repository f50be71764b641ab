//! Config discovery and command-line overrides.

use std::path::{Path, PathBuf};

use clap::{Args, ValueEnum};
use rollcall_recon::config::ReconConfig;
use rollcall_recon::index::DuplicatePolicy;
use tracing::{debug, info};

use crate::exit_codes::{EXIT_INVALID_CONFIG, EXIT_IO};
use crate::CliError;

/// Config file name looked up in the working directory and the user config dir.
pub const CONFIG_FILE: &str = "rollcall.toml";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OnDuplicate {
    Reject,
    KeepFirst,
    KeepLast,
}

impl From<OnDuplicate> for DuplicatePolicy {
    fn from(value: OnDuplicate) -> Self {
        match value {
            OnDuplicate::Reject => DuplicatePolicy::Reject,
            OnDuplicate::KeepFirst => DuplicatePolicy::KeepFirst,
            OnDuplicate::KeepLast => DuplicatePolicy::KeepLast,
        }
    }
}

/// Flags shared by `run` and `batch`. Each one overrides the config file.
#[derive(Debug, Clone, Default, Args)]
pub struct ReconArgs {
    /// Backend export (default: discovered from the config's backend dir/stem)
    #[arg(long, value_name = "FILE")]
    pub backend: Option<PathBuf>,

    /// Config file (default: ./rollcall.toml, then the user config dir)
    #[arg(long, value_name = "FILE", env = "ROLLCALL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Identity column to key by when a sheet has no "Employee Code" column
    #[arg(long, value_name = "NAME")]
    pub id_column: Option<String>,

    /// Identity column for the backend export only
    #[arg(long, value_name = "NAME")]
    pub backend_id_column: Option<String>,

    /// Identity column for the submitted sheet only
    #[arg(long, value_name = "NAME")]
    pub submission_id_column: Option<String>,

    /// What to do with repeated employee codes
    #[arg(long, value_enum, value_name = "POLICY")]
    pub on_duplicate: Option<OnDuplicate>,

    /// Treat the first unrecognized columns as code and name
    #[arg(long)]
    pub positional_fallback: bool,
}

/// A config plus the directory its relative paths resolve against.
#[derive(Debug, Clone)]
pub struct Settings {
    pub config: ReconConfig,
    pub base_dir: PathBuf,
    pub source: Option<PathBuf>,
}

impl Settings {
    /// Load the config named by `--config`, or the first one found on the
    /// lookup path, or built-in defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self, CliError> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }

        for candidate in lookup_path() {
            debug!(candidate = %candidate.display(), "looking for config");
            if candidate.is_file() {
                return Self::from_file(&candidate);
            }
        }

        debug!("no config file found, using defaults");
        Ok(Self {
            config: ReconConfig::default(),
            base_dir: PathBuf::from("."),
            source: None,
        })
    }

    pub fn from_file(path: &Path) -> Result<Self, CliError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            CliError::new(EXIT_IO, format!("cannot read config {}: {e}", path.display()))
        })?;
        let config = ReconConfig::from_toml(&text)
            .map_err(|e| CliError::new(EXIT_INVALID_CONFIG, format!("{}: {e}", path.display())))?;
        info!(path = %path.display(), name = %config.name, "config loaded");

        Ok(Self {
            config,
            base_dir: path.parent().map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from(".")),
            source: Some(path.to_path_buf()),
        })
    }

    /// Fold command-line flags into the config.
    pub fn apply(&mut self, args: &ReconArgs) {
        let columns = &mut self.config.columns;
        if let Some(id) = &args.id_column {
            columns.identity = Some(id.clone());
            columns.backend_identity = None;
            columns.submission_identity = None;
        }
        if let Some(id) = &args.backend_id_column {
            columns.backend_identity = Some(id.clone());
        }
        if let Some(id) = &args.submission_id_column {
            columns.submission_identity = Some(id.clone());
        }
        if let Some(policy) = args.on_duplicate {
            self.config.policy.on_duplicate = policy.into();
        }
        if args.positional_fallback {
            self.config.policy.positional_fallback = true;
        }
    }

    /// A path from the config, resolved against the config file's directory.
    pub fn resolve(&self, path: impl AsRef<Path>) -> PathBuf {
        let path = path.as_ref();
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    /// The backend export: `--backend`, else `[backend] file`, else discovery.
    pub fn backend_path(&self, flag: Option<&Path>) -> Result<PathBuf, CliError> {
        if let Some(path) = flag {
            return Ok(path.to_path_buf());
        }
        let backend = &self.config.backend;
        match &backend.file {
            Some(file) => Ok(self.resolve(file)),
            None => Ok(rollcall_io::discover_backend(&self.resolve(&backend.dir), &backend.stem)?),
        }
    }
}

fn lookup_path() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(CONFIG_FILE)];
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("rollcall").join(CONFIG_FILE));
    }
    paths
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn explicit_config_resolves_relative_paths() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("march.toml");
        std::fs::write(&path, "[backend]\nfile = \"exports/qandle.xlsx\"\n").unwrap();

        let settings = Settings::load(Some(&path)).unwrap();
        assert_eq!(settings.source.as_deref(), Some(path.as_path()));
        assert_eq!(settings.backend_path(None).unwrap(), dir.path().join("exports/qandle.xlsx"));
    }

    #[test]
    fn backend_flag_wins() {
        let settings = Settings {
            config: ReconConfig::default(),
            base_dir: PathBuf::from("/srv/attendance"),
            source: None,
        };
        let flag = Path::new("elsewhere/backend.csv");
        assert_eq!(settings.backend_path(Some(flag)).unwrap(), flag);
    }

    #[test]
    fn discovers_backend_under_base_dir() {
        let dir = tempdir().unwrap();
        std::fs::create_dir(dir.path().join("backend")).unwrap();
        std::fs::write(dir.path().join("backend/Qandle.csv"), "a,b\n").unwrap();

        let settings = Settings {
            config: ReconConfig::default(),
            base_dir: dir.path().to_path_buf(),
            source: None,
        };
        assert_eq!(settings.backend_path(None).unwrap(), dir.path().join("backend/Qandle.csv"));
    }

    #[test]
    fn invalid_config_maps_to_config_exit_code() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[policy]\non_duplicate = \"merge\"\n").unwrap();

        let err = Settings::load(Some(&path)).unwrap_err();
        assert_eq!(err.code, EXIT_INVALID_CONFIG);
    }

    #[test]
    fn flags_override_config() {
        let mut settings = Settings {
            config: ReconConfig::default(),
            base_dir: PathBuf::from("."),
            source: None,
        };
        settings.apply(&ReconArgs {
            id_column: Some("Staff No".into()),
            on_duplicate: Some(OnDuplicate::KeepLast),
            positional_fallback: true,
            ..Default::default()
        });

        let options = settings.config.run_options();
        assert_eq!(options.reference_identity.as_deref(), Some("Staff No"));
        assert_eq!(options.submission_identity.as_deref(), Some("Staff No"));
        assert_eq!(options.on_duplicate, DuplicatePolicy::KeepLast);
        assert!(options.normalize.positional_fallback);
    }

    #[test]
    fn side_flags_override_shared_identity() {
        let mut config = ReconConfig::default();
        config.columns.submission_identity = Some("From File".into());
        let mut settings = Settings {
            config,
            base_dir: PathBuf::from("."),
            source: None,
        };
        settings.apply(&ReconArgs {
            id_column: Some("Staff No".into()),
            backend_id_column: Some("Backend No".into()),
            ..Default::default()
        });

        let options = settings.config.run_options();
        assert_eq!(options.reference_identity.as_deref(), Some("Backend No"));
        assert_eq!(options.submission_identity.as_deref(), Some("Staff No"));
    }
}
