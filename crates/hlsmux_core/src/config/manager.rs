//! Loading and persisting the TOML config file.
//!
//! Writes go through a sibling temp file and a rename, so a crash never
//! leaves a half-written config behind. Single-section updates are done
//! with `toml_edit` and keep whatever the user wrote in other tables.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use toml_edit::{DocumentMut, Item};

use super::settings::{ConfigSection, Settings};

const FILE_HEADER: &str = "# hlsmux configuration\n\
# Generated by hlsmux. Edits are kept unless a table is rewritten.\n";

/// Config file failures.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot access config file: {0}")]
    Io(#[from] io::Error),

    #[error("Malformed config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Cannot serialize settings: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Cannot edit config document: {0}")]
    Edit(#[from] toml_edit::TomlError),

    #[error("No config file at {0}")]
    NotFound(PathBuf),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Owns the settings in memory and the file they come from.
pub struct ConfigManager {
    file: PathBuf,
    settings: Settings,
}

impl ConfigManager {
    /// Point at a config file without touching the disk.
    ///
    /// Settings start at their defaults until `load` or `load_or_create`.
    pub fn new(file: impl Into<PathBuf>) -> Self {
        Self {
            file: file.into(),
            settings: Settings::default(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.file
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// In-memory edits; persist them with `save` or `update_section`.
    pub fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    /// Read and validate an existing file.
    pub fn load(&mut self) -> ConfigResult<()> {
        let text = read_optional(&self.file)?
            .ok_or_else(|| ConfigError::NotFound(self.file.clone()))?;
        self.settings = parse_settings(&text)?;
        Ok(())
    }

    /// Read the file, or write one with defaults when there is none.
    ///
    /// An existing file is rewritten only when it carries tables hlsmux
    /// does not know or misses keys it expects.
    pub fn load_or_create(&mut self) -> ConfigResult<()> {
        match read_optional(&self.file)? {
            Some(text) => {
                self.settings = parse_settings(&text)?;
                let doc: DocumentMut = text.parse()?;
                if needs_rewrite(&doc, &self.settings)? {
                    self.save()?;
                }
            }
            None => {
                self.settings = Settings::default();
                self.save()?;
            }
        }
        Ok(())
    }

    /// Create the logs folder. The workspace is left to each run.
    pub fn ensure_dirs_exist(&self) -> ConfigResult<()> {
        fs::create_dir_all(self.logs_folder())?;
        Ok(())
    }

    pub fn logs_folder(&self) -> PathBuf {
        PathBuf::from(&self.settings.paths.logs_folder)
    }

    /// The full file text `save` would write.
    pub fn render(&self) -> ConfigResult<String> {
        render_settings(&self.settings)
    }

    /// Replace the whole file with the current settings.
    pub fn save(&self) -> ConfigResult<()> {
        let text = self.render()?;
        write_atomically(&self.file, &text)?;
        Ok(())
    }

    /// Rewrite one table from the current settings.
    ///
    /// The file is re-read first so edits made since loading survive in
    /// every other table.
    pub fn update_section(&mut self, section: ConfigSection) -> ConfigResult<()> {
        let mut doc = match read_optional(&self.file)? {
            Some(text) if !text.trim().is_empty() => text.parse::<DocumentMut>()?,
            _ => DocumentMut::new(),
        };

        let fresh: DocumentMut = section_body(&self.settings, section)?.parse()?;
        doc[section.table_name()] = Item::Table(fresh.as_table().clone());

        write_atomically(&self.file, &doc.to_string())?;
        Ok(())
    }
}

fn parse_settings(text: &str) -> ConfigResult<Settings> {
    let settings: Settings = toml::from_str(text)?;
    settings.validate().map_err(ConfigError::Invalid)?;
    Ok(settings)
}

/// Whether `doc` has foreign tables or lacks a key of a known one.
fn needs_rewrite(doc: &DocumentMut, settings: &Settings) -> ConfigResult<bool> {
    let known = |name: &str| ConfigSection::ALL.iter().any(|s| s.table_name() == name);
    if doc.iter().any(|(name, _)| !known(name)) {
        return Ok(true);
    }

    for section in ConfigSection::ALL {
        let Some(table) = doc.get(section.table_name()).and_then(Item::as_table_like) else {
            return Ok(true);
        };
        let expected: DocumentMut = section_body(settings, section)?.parse()?;
        if expected.iter().any(|(key, _)| !table.contains_key(key)) {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Key/value lines of one table, without its header.
fn section_body(settings: &Settings, section: ConfigSection) -> ConfigResult<String> {
    let body = match section {
        ConfigSection::Tool => toml::to_string_pretty(&settings.tool)?,
        ConfigSection::Paths => toml::to_string_pretty(&settings.paths)?,
        ConfigSection::Segments => toml::to_string_pretty(&settings.segments)?,
        ConfigSection::Audio => toml::to_string_pretty(&settings.audio)?,
        ConfigSection::Logging => toml::to_string_pretty(&settings.logging)?,
        ConfigSection::Cleanup => toml::to_string_pretty(&settings.cleanup)?,
    };
    Ok(body)
}

fn render_settings(settings: &Settings) -> ConfigResult<String> {
    let mut text = String::from(FILE_HEADER);
    for section in ConfigSection::ALL {
        let body = section_body(settings, section)?;
        text.push_str(&format!(
            "\n# {}\n[{}]\n{}",
            section.comment(),
            section.table_name(),
            body
        ));
        if !body.ends_with('\n') {
            text.push('\n');
        }
    }
    Ok(text)
}

fn read_optional(path: &Path) -> io::Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

/// Write to `<file>.toml.tmp`, fsync, then rename over `file`.
fn write_atomically(file: &Path, text: &str) -> io::Result<()> {
    if let Some(dir) = file.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }

    // Same directory keeps the rename on one filesystem
    let staging = file.with_extension("toml.tmp");
    let mut out = fs::File::create(&staging)?;
    out.write_all(text.as_bytes())?;
    out.sync_all()?;
    drop(out);

    fs::rename(&staging, file)
}
