// MIT License
//
// Copyright (c) 2019-2021 Tobias Pfeiffer
//
// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to deal
// in the Software without restriction, including without limitation the rights
// to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
// copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in all
// copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
// SOFTWARE.

//! Loader settings, read from the same environment variables as every
//! other OpenXR loader.

use {crate::logger::Severity, std::{fmt, path::PathBuf, sync::Arc}};

pub const ENV_RUNTIME_JSON:      &str = "XR_RUNTIME_JSON";
pub const ENV_API_LAYER_PATH:    &str = "XR_API_LAYER_PATH";
pub const ENV_ENABLE_API_LAYERS: &str = "XR_ENABLE_API_LAYERS";
pub const ENV_LOADER_DEBUG:      &str = "XR_LOADER_DEBUG";

/// Major version used in the manifest search paths.
pub const MAJOR_VERSION: u32 = 1;

#[cfg(windows)]
const LIST_SEPARATOR: char = ';';
#[cfg(not(windows))]
const LIST_SEPARATOR: char = ':';

/// Where variables are read from, the process environment unless replaced.
#[derive(Clone)]
pub struct Environment(Arc<dyn Fn(&str) -> Option<String> + Send + Sync>);

impl Environment {
	pub fn new(var: impl Fn(&str) -> Option<String> + Send + Sync + 'static) -> Self {
		Self(Arc::new(var))
	}
	
	pub fn process() -> Self {
		Self::new(|key| std::env::var_os(key).map(|v| v.to_string_lossy().into_owned()))
	}
	
	pub fn var(&self, key: &str) -> Option<String> {
		(self.0)(key)
	}
	
	/// Set at all, even to an empty value.
	pub fn is_set(&self, key: &str) -> bool {
		self.var(key).is_some()
	}
}

impl Default for Environment {
	fn default() -> Self {
		Self::process()
	}
}

impl fmt::Debug for Environment {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		f.write_str("Environment")
	}
}

#[derive(Clone, Debug)]
pub struct LoaderSettings {
	/// Set when `XR_RUNTIME_JSON` overrides the active runtime.
	pub runtime_override:   Option<PathBuf>,
	/// Runtime manifests to try, in order. The first one that exists wins.
	pub runtime_manifests:  Vec<PathBuf>,
	/// Directories searched for api layer manifests, in order.
	pub api_layer_dirs:     Vec<PathBuf>,
	/// Layers enabled in addition to the ones the application asks for.
	pub enable_api_layers:  Vec<String>,
	/// Minimum severity forwarded to the `log` crate, `None` disables it.
	pub log_level:          Option<Severity>,
	/// Consulted again later for the `disable_environment` of api layers.
	pub environment:        Environment
}

impl Default for LoaderSettings {
	fn default() -> Self {
		Self {
			runtime_override:  None,
			runtime_manifests: Vec::new(),
			api_layer_dirs:    Vec::new(),
			enable_api_layers: Vec::new(),
			log_level:         Some(Severity::Error),
			environment:       Environment::process()
		}
	}
}

impl LoaderSettings {
	pub fn from_env() -> Self {
		Self::from_environment(Environment::process())
	}
	
	/// Builds the settings from a variable lookup, so they can be tested
	/// without touching the process environment.
	pub fn from_vars(var: impl Fn(&str) -> Option<String> + Send + Sync + 'static) -> Self {
		Self::from_environment(Environment::new(var))
	}
	
	pub fn from_environment(environment: Environment) -> Self {
		let mut settings = Self { environment: environment.clone(), ..Self::default() };
		let var = |key: &str| environment.var(key).filter(|v| !v.is_empty());
		
		let home = var("HOME").map(PathBuf::from);
		let config_home = var("XDG_CONFIG_HOME").map(PathBuf::from)
			.or_else(|| home.as_ref().map(|home| home.join(".config")));
		let data_home = var("XDG_DATA_HOME").map(PathBuf::from)
			.or_else(|| home.as_ref().map(|home| home.join(".local/share")));
		
		let openxr = PathBuf::from("openxr").join(MAJOR_VERSION.to_string());
		
		match var(ENV_RUNTIME_JSON) {
			Some(path) => {
				settings.runtime_override = Some(PathBuf::from(&path));
				settings.runtime_manifests.push(PathBuf::from(path));
			}
			None => {
				settings.runtime_manifests.extend(config_home.map(|dir| dir.join(&openxr).join("active_runtime.json")));
				#[cfg(unix)]
				settings.runtime_manifests.push(PathBuf::from("/etc/xdg").join(&openxr).join("active_runtime.json"));
			}
		}
		
		if let Some(paths) = var(ENV_API_LAYER_PATH) {
			settings.api_layer_dirs.extend(split_list(&paths).map(PathBuf::from));
		}
		settings.api_layer_dirs.extend(data_home.map(|dir| dir.join(&openxr).join("api_layers/explicit.d")));
		#[cfg(unix)]
		settings.api_layer_dirs.push(PathBuf::from("/usr/share").join(&openxr).join("api_layers/explicit.d"));
		
		if let Some(layers) = var(ENV_ENABLE_API_LAYERS) {
			settings.enable_api_layers.extend(split_list(&layers).map(str::to_string));
		}
		
		if let Some(level) = var(ENV_LOADER_DEBUG) {
			match parse_log_level(&level) {
				Some(level) => settings.log_level = level,
				None => log::warn!(target: "xrloader", "ignoring unknown {} value `{}`", ENV_LOADER_DEBUG, level)
			}
		}
		
		settings
	}
}

fn split_list(list: &str) -> impl Iterator<Item = &str> {
	list.split(LIST_SEPARATOR).map(str::trim).filter(|s| !s.is_empty())
}

/// `Some(None)` turns logging off, `None` means the value is not recognized.
fn parse_log_level(level: &str) -> Option<Option<Severity>> {
	Some(match level.trim().to_ascii_lowercase().as_str() {
		"none"                => None,
		"error"               => Some(Severity::Error),
		"warn" | "warning"    => Some(Severity::Warning),
		"info"                => Some(Severity::Info),
		"all" | "verbose"     => Some(Severity::Verbose),
		_                     => return None
	})
}
