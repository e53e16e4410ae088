//! Multi-file configuration loading.
//!
//! A config file may pull further files in with `include`. Every top-level
//! section may appear in exactly one file, so splitting `[contracts]` or
//! `[account]` into a separate file never merges silently.

use crate::{resolve_env_vars, Config, ConfigError};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

/// Loads a config file together with its includes.
pub(crate) struct ConfigLoader {
	/// Directory relative includes are resolved against.
	base_dir: PathBuf,
	/// Canonical paths already read, to catch include cycles.
	visited: HashSet<PathBuf>,
	/// Which file each top-level section came from.
	owners: HashMap<String, PathBuf>,
}

impl ConfigLoader {
	pub(crate) fn new(base_dir: impl AsRef<Path>) -> Self {
		Self {
			base_dir: base_dir.as_ref().to_path_buf(),
			visited: HashSet::new(),
			owners: HashMap::new(),
		}
	}

	/// Reads `path`, merges its includes and validates the result.
	pub(crate) async fn load_config(&mut self, path: impl AsRef<Path>) -> Result<Config, ConfigError> {
		let root_path = self.locate(path)?;
		let mut root = self.read_table(&root_path).await?;

		let includes = take_includes(&mut root)?;
		for key in root.keys() {
			self.owners.insert(key.clone(), root_path.clone());
		}

		for include in includes {
			let include_path = self.locate(&include)?;
			let table = self.read_table(&include_path).await?;
			if table.contains_key("include") {
				return Err(ConfigError::Validation(format!(
					"Nested include in {} is not supported",
					include_path.display()
				)));
			}

			for (key, value) in table {
				if let Some(owner) = self.owners.get(&key) {
					return Err(ConfigError::Validation(format!(
						"Duplicate section '{}' found in {} and {}",
						key,
						owner.display(),
						include_path.display()
					)));
				}
				self.owners.insert(key.clone(), include_path.clone());
				root.insert(key, value);
			}
		}

		let config: Config = toml::Value::Table(root).try_into()?;
		config.validate()?;
		Ok(config)
	}

	/// Reads one file, resolving environment variables before parsing.
	async fn read_table(&mut self, path: &Path) -> Result<toml::Table, ConfigError> {
		let canonical = path.canonicalize()?;
		if !self.visited.insert(canonical.clone()) {
			return Err(ConfigError::Validation(format!(
				"Circular include detected: {} was already loaded",
				canonical.display()
			)));
		}

		let raw = tokio::fs::read_to_string(path).await?;
		let resolved = resolve_env_vars(&raw)?;
		Ok(toml::from_str(&resolved)?)
	}

	fn locate(&self, path: impl AsRef<Path>) -> Result<PathBuf, ConfigError> {
		let path = path.as_ref();
		let resolved = if path.is_absolute() {
			path.to_path_buf()
		} else {
			self.base_dir.join(path)
		};

		if !resolved.is_file() {
			return Err(ConfigError::Io(std::io::Error::new(
				std::io::ErrorKind::NotFound,
				format!("Configuration file not found: {}", resolved.display()),
			)));
		}
		Ok(resolved)
	}
}

/// Removes and returns the `include` entry, which may be a string or an array
/// of strings.
fn take_includes(table: &mut toml::Table) -> Result<Vec<PathBuf>, ConfigError> {
	match table.remove("include") {
		None => Ok(Vec::new()),
		Some(toml::Value::String(path)) => Ok(vec![PathBuf::from(path)]),
		Some(toml::Value::Array(items)) => items
			.into_iter()
			.map(|item| match item {
				toml::Value::String(path) => Ok(PathBuf::from(path)),
				_ => Err(ConfigError::Validation(
					"Include array must contain only strings".into(),
				)),
			})
			.collect(),
		Some(_) => Err(ConfigError::Validation(
			"Include must be a string or array of strings".into(),
		)),
	}
}
