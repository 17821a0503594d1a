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

use {
	xrloader::{*, manifest::{ApiLayerManifest, RuntimeManifest}, trampoline::Effect},
	std::io::Write
};

const HELP: &str = r#"
xrloader-info
Usage: xrloader-info [options]

Prints what the loader would use when an application creates an instance.

Options:
--help, -h                       - display this help page
--entry-points, -e               - list the compiled-in entry points with their extension, fault policy and effect
--load, -l                       - load and negotiate with the active runtime and list its extensions

Environment:
XR_RUNTIME_JSON                  - runtime manifest to use instead of the active runtime
XR_API_LAYER_PATH                - additional api layer manifest directories
XR_ENABLE_API_LAYERS             - api layers enabled for every instance
XR_LOADER_DEBUG                  - none, error, warn, info or all
"#;

fn main() {
	let mut entry_points = false;
	let mut load = false;
	
	for arg in std::env::args().skip(1) {
		match arg.as_str() {
			"-e" | "--entry-points" => entry_points = true,
			"-l" | "--load" => load = true,
			"-h" | "--help" => {
				println!("{}", HELP);
				return;
			}
			_ => println!("ignored unknown option: {}", arg)
		}
	}
	
	let loader = Loader::global();
	let settings = loader.settings();
	
	println!("settings:");
	println!("  runtime override:  {}", settings.runtime_override.as_ref()
		.map_or_else(|| "-".to_string(), |p| p.display().to_string()));
	println!("  enabled layers:    {}", match settings.enable_api_layers.is_empty() {
		true => "-".to_string(),
		false => settings.enable_api_layers.join(", ")
	});
	println!("  log level:         {}", settings.log_level.map_or_else(|| "none".to_string(), |l| format!("{:?}", l)));
	for path in &settings.runtime_manifests {
		println!("  runtime manifest:  {}", path.display());
	}
	for dir in &settings.api_layer_dirs {
		println!("  api layer dir:     {}", dir.display());
	}
	
	print!("\nlooking for the active runtime ... ");
	std::io::stdout().flush().unwrap_or_default();
	match RuntimeManifest::discover(settings) {
		Ok(manifest) => {
			println!("\x1b[32mok\x1b[0m");
			println!("  name:              {}", manifest.name());
			println!("  manifest:          {}", manifest.path.display());
			println!("  library:           {}", manifest.library_path.display());
		}
		Err(e) => println!("\x1b[31mfailed\x1b[0m\nError: {}", e)
	}
	
	if load {
		print!("\nloading the runtime ... ");
		std::io::stdout().flush().unwrap_or_default();
		match loader.instance_extensions(None) {
			Ok(extensions) => {
				println!("\x1b[32mok\x1b[0m");
				for (name, version) in extensions {
					println!("  {:<48} v{}", name, version);
				}
			}
			Err(e) => println!("\x1b[31mfailed\x1b[0m\nError: {}", e)
		}
	}
	
	let layers = ApiLayerManifest::discover(settings, loader.logger());
	println!("\napi layers ({}):", layers.len());
	for layer in &layers {
		println!("  {} v{} ({})", layer.name, layer.implementation_version, layer.path.display());
		if !layer.description.is_empty() {
			println!("    {}", layer.description);
		}
		for ext in &layer.instance_extensions {
			println!("    {:<46} v{}", ext.name, ext.extension_version);
		}
	}
	
	if entry_points {
		println!("\nentry points ({}):", commands::ENTRY_POINTS.len());
		for entry in commands::ENTRY_POINTS {
			println!("  {:<44} {:<28} {:<14} {}",
				entry.name,
				entry.extension.unwrap_or("core"),
				format!("{:?}", entry.policy),
				match entry.effect {
					Effect::None     => "-",
					Effect::Create   => "registers",
					Effect::Destroy  => "unregisters",
					Effect::Teardown => "tears down",
					Effect::Manual   => "manual"
				});
		}
	}
}
