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

//! Runtime and api layer manifests.

use {
	crate::{config::{Environment, LoaderSettings}, error::{LoaderError, Result}, logger::LoaderLogger},
	serde::{*, de::Error},
	std::{collections::{HashMap, HashSet}, fs, path::{Path, PathBuf}}
};

pub const NEGOTIATE_RUNTIME:   &str = "xrNegotiateLoaderRuntimeInterface";
pub const NEGOTIATE_API_LAYER: &str = "xrNegotiateLoaderApiLayerInterface";

#[derive(Deserialize)]
struct RuntimeManifestFile {
	#[serde(deserialize_with = "deserialize_file_format_version")]
	#[allow(dead_code)]
	file_format_version: (u32, u32, u32),
	runtime:             RuntimeManifest
}

#[derive(Clone, Debug, Deserialize)]
pub struct RuntimeManifest {
	#[serde(skip)]
	pub path:         PathBuf,
	pub library_path: PathBuf,
	#[serde(default)]
	pub name:         Option<String>,
	#[serde(default)]
	pub functions:    HashMap<String, String>
}

impl RuntimeManifest {
	pub fn from_path(path: &Path) -> Result<Self> {
		let file = serde_json::from_str::<RuntimeManifestFile>(&fs::read_to_string(path)?)
			.map_err(|e| LoaderError::Manifest { path: path.to_path_buf(), reason: e.to_string() })?;
		let mut manifest = file.runtime;
		manifest.library_path = resolve_library_path(path, &manifest.library_path);
		manifest.path = path.to_path_buf();
		Ok(manifest)
	}
	
	/// The first runtime manifest of `settings` that exists.
	pub fn discover(settings: &LoaderSettings) -> Result<Self> {
		settings.runtime_manifests.iter()
			.find(|path| path.is_file())
			.ok_or(LoaderError::RuntimeUnavailable)
			.and_then(|path| Self::from_path(path))
	}
	
	pub fn name(&self) -> String {
		self.name.clone().unwrap_or_else(|| self.library_path.display().to_string())
	}
	
	pub fn negotiate_function(&self) -> &str {
		self.functions.get(NEGOTIATE_RUNTIME).map_or(NEGOTIATE_RUNTIME, String::as_str)
	}
}

#[derive(Deserialize)]
struct ApiLayerManifestFile {
	#[serde(deserialize_with = "deserialize_file_format_version")]
	#[allow(dead_code)]
	file_format_version: (u32, u32, u32),
	api_layer:           ApiLayerManifest
}

#[derive(Clone, Debug, Deserialize)]
pub struct ApiLayerManifest {
	#[serde(skip)]
	pub path:                   PathBuf,
	pub name:                   String,
	pub library_path:           PathBuf,
	#[serde(deserialize_with = "deserialize_api_version")]
	pub api_version:            (u32, u32),
	#[serde(deserialize_with = "deserialize_number")]
	pub implementation_version: u32,
	#[serde(default)]
	pub description:            String,
	#[serde(default)]
	pub functions:              HashMap<String, String>,
	#[serde(default)]
	pub instance_extensions:    Vec<ManifestExtension>,
	#[serde(default)]
	pub disable_environment:    Option<String>
}

#[derive(Clone, Debug, Eq, PartialEq, Deserialize)]
pub struct ManifestExtension {
	pub name:              String,
	#[serde(deserialize_with = "deserialize_number")]
	pub extension_version: u32
}

impl ApiLayerManifest {
	pub fn from_path(path: &Path) -> Result<Self> {
		let file = serde_json::from_str::<ApiLayerManifestFile>(&fs::read_to_string(path)?)
			.map_err(|e| LoaderError::Manifest { path: path.to_path_buf(), reason: e.to_string() })?;
		let mut manifest = file.api_layer;
		manifest.library_path = resolve_library_path(path, &manifest.library_path);
		manifest.path = path.to_path_buf();
		Ok(manifest)
	}
	
	/// Every explicit api layer found in the directories of `settings`.
	///
	/// Invalid manifests are reported and skipped, a name seen in an
	/// earlier directory shadows later ones.
	pub fn discover(settings: &LoaderSettings, logger: &LoaderLogger) -> Vec<Self> {
		let mut seen = HashSet::new();
		let mut layers = Vec::new();
		
		for dir in &settings.api_layer_dirs {
			let Ok(entries) = fs::read_dir(dir) else { continue };
			let mut paths = entries
				.filter_map(|entry| entry.ok().map(|entry| entry.path()))
				.filter(|path| path.extension().map_or(false, |ext| ext == "json"))
				.collect::<Vec<_>>();
			paths.sort();
			
			for path in paths {
				match Self::from_path(&path) {
					Ok(manifest) if manifest.is_disabled(&settings.environment) => logger.log_info_message("xrEnumerateApiLayerProperties",
						&format!("api layer `{}` disabled by `{}`", manifest.name, manifest.disable_environment.as_deref().unwrap_or_default())),
					Ok(manifest) => if seen.insert(manifest.name.clone()) {
						layers.push(manifest);
					}
					Err(e) => logger.log_warning_message("xrEnumerateApiLayerProperties",
						&format!("skipping api layer manifest `{}`: {}", path.display(), e))
				}
			}
		}
		
		layers
	}
	
	pub fn is_disabled(&self, environment: &Environment) -> bool {
		self.disable_environment.as_deref()
			.map_or(false, |var| environment.is_set(var))
	}
	
	pub fn negotiate_function(&self) -> &str {
		self.functions.get(NEGOTIATE_API_LAYER).map_or(NEGOTIATE_API_LAYER, String::as_str)
	}
}

/// Relative paths with a directory component are relative to the manifest,
/// bare file names are left to the system library search.
fn resolve_library_path(manifest: &Path, library: &Path) -> PathBuf {
	if library.is_relative() && library.components().count() > 1 {
		manifest.parent().unwrap_or(Path::new("")).join(library)
	} else {
		library.to_path_buf()
	}
}

fn parse_version<const N: usize>(s: &str) -> Option<[u32; N]> {
	let mut parts = s.trim().split('.');
	let mut version = [0; N];
	for part in version.iter_mut() {
		*part = parts.next()?.parse().ok()?;
	}
	parts.next().is_none().then_some(version)
}

fn deserialize_file_format_version<'de, D: Deserializer<'de>>(deserializer: D) -> Result<(u32, u32, u32), D::Error> {
	let s = String::deserialize(deserializer)?;
	match parse_version::<3>(&s) {
		Some([1, minor, patch]) => Ok((1, minor, patch)),
		Some(_) => Err(D::Error::custom(format!("unsupported file_format_version `{}`", s))),
		None => Err(D::Error::custom(format!("invalid file_format_version `{}`", s)))
	}
}

fn deserialize_api_version<'de, D: Deserializer<'de>>(deserializer: D) -> Result<(u32, u32), D::Error> {
	let s = String::deserialize(deserializer)?;
	parse_version::<2>(&s)
		.or_else(|| parse_version::<3>(&s).map(|[major, minor, _]| [major, minor]))
		.map(|[major, minor]| (major, minor))
		.ok_or_else(|| D::Error::custom(format!("invalid api_version `{}`", s)))
}

/// Manifests write numbers both as JSON numbers and as strings.
fn deserialize_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
	#[derive(Deserialize)]
	#[serde(untagged)]
	enum Number {
		Int(u32),
		Text(String)
	}
	
	match Number::deserialize(deserializer)? {
		Number::Int(v) => Ok(v),
		Number::Text(s) => s.trim().parse().map_err(|_| D::Error::custom(format!("invalid number `{}`", s)))
	}
}
