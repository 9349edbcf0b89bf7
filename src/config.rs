//! User configuration: `config.toml` in the platform config dir, or a file
//! given with `--config`.
//!
//! ```toml
//! [layout]
//! name_col = 1
//! unit_col = 2
//! value_col = 3
//! first_data_row = 2
//!
//! [output]
//! suffix = "_optimized"
//! write = true
//!
//! [palette]
//! input = "ADD8E6"
//! ```
//!
//! Problems never stop the program; they come back as warnings and the
//! defaults are used.

use directories::ProjectDirs;
use paramgrid_core::{AnalysisOptions, Palette, SheetLayout};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

const MAX_CONFIG_BYTES: u64 = 64 * 1024;

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
    layout: SheetLayout,
    output: OutputSection,
    palette: Palette,
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct OutputSection {
    suffix: String,
    write: bool,
}

impl Default for OutputSection {
    fn default() -> Self {
        let defaults = AnalysisOptions::default();
        OutputSection {
            suffix: defaults.output_suffix,
            write: defaults.write_output,
        }
    }
}

pub fn user_config_path() -> Option<PathBuf> {
    let proj = ProjectDirs::from("", "", "paramgrid")?;
    let mut path = proj.config_dir().to_path_buf();
    path.push("config.toml");
    Some(path)
}

/// Load options from `explicit` or the user config file. A missing user
/// config is normal; a missing explicit one is a warning.
pub fn load_options(explicit: Option<&Path>) -> (AnalysisOptions, Vec<String>) {
    let mut warnings = Vec::new();
    let path = match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => user_config_path().filter(|p| p.is_file()),
    };
    let Some(path) = path else {
        return (AnalysisOptions::default(), warnings);
    };

    let file = match read_config(&path) {
        Ok(file) => file,
        Err(message) => {
            warnings.push(message);
            return (AnalysisOptions::default(), warnings);
        }
    };
    log::debug!("loaded config from {}", path.display());
    (into_options(file, &mut warnings), warnings)
}

fn read_config(path: &Path) -> Result<ConfigFile, String> {
    let meta = fs::metadata(path).map_err(|err| format!("Failed to read {}: {}", path.display(), err))?;
    if meta.len() > MAX_CONFIG_BYTES {
        return Err(format!(
            "Config file {} is larger than {} bytes; ignoring it",
            path.display(),
            MAX_CONFIG_BYTES
        ));
    }
    let content =
        fs::read_to_string(path).map_err(|err| format!("Failed to read {}: {}", path.display(), err))?;
    toml::from_str::<ConfigFile>(&content).map_err(|err| format!("Failed to parse {}: {}", path.display(), err))
}

fn into_options(file: ConfigFile, warnings: &mut Vec<String>) -> AnalysisOptions {
    let defaults = AnalysisOptions::default();

    let layout = if file.layout.columns().contains(&0) || file.layout.first_data_row == 0 {
        warnings.push("Layout columns and first_data_row are 1-based; using the default layout".to_string());
        defaults.layout
    } else {
        file.layout
    };

    let mut palette = file.palette;
    for (role, colour, fallback) in [
        ("input", &mut palette.input, &defaults.palette.input),
        ("output", &mut palette.output, &defaults.palette.output),
        ("intermediate", &mut palette.intermediate, &defaults.palette.intermediate),
        ("circular", &mut palette.circular, &defaults.palette.circular),
        ("replaced", &mut palette.replaced, &defaults.palette.replaced),
    ] {
        let trimmed = colour.trim_start_matches('#').to_ascii_uppercase();
        if trimmed.len() == 6 && trimmed.chars().all(|c| c.is_ascii_hexdigit()) {
            *colour = trimmed;
        } else {
            warnings.push(format!(
                "Palette colour for {} must be RRGGBB, got '{}'; using {}",
                role, colour, fallback
            ));
            *colour = fallback.clone();
        }
    }

    AnalysisOptions {
        layout,
        output_suffix: file.output.suffix,
        palette,
        write_output: file.output.write,
    }
}
