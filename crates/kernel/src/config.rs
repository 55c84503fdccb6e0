use std::any::Any;
use std::cell::Cell;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use glam::{DVec2, UVec2};
use playfield_common::{Rect, StatValue, Stats};
use serde_yaml::Value;
use tracing::{debug, error, info, warn};

use crate::app::App;
use crate::error::ServiceError;
use crate::service::{Service, ServiceKey};

/// Canonical configuration keys.
pub mod keys {
    pub const CONFIG_FILE: &str = "app.config";
    pub const DEBUG_LEVEL: &str = "app.debug.level";
    pub const LOOP_COUNTER: &str = "app.debug.counter";
    pub const SCENES_LIST: &str = "app.scenes.list";
    pub const SCENES_DEFAULT: &str = "app.scenes.default";
    pub const WINDOW_TITLE: &str = "app.window.title";
    pub const BUFFER_SIZE: &str = "app.render.buffer.size";
    pub const WINDOW_SIZE: &str = "app.render.window.size";
    pub const MAX_BUFFERS: &str = "app.render.window.max.buffers";
    pub const GRAVITY: &str = "app.physic.world.gravity";
    pub const PLAY_AREA: &str = "app.physic.world.play.area";
    pub const UPDATE_RATE: &str = "app.physics.update.rate";
}

const DEFAULT_CONFIG_FILE: &str = "playfield.yaml";

/// Errors raised while reading configuration values or files.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value `{value}` for `{key}`: expected {expected}")]
    InvalidValue {
        key: String,
        value: String,
        expected: &'static str,
    },
    #[error("unable to read configuration file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid YAML in {}: {source}", path.display())]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("configuration file {} must hold a mapping at its root", .0.display())]
    NotAMapping(PathBuf),
}

/// A typed configuration value.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValue {
    Int(i64),
    Float(f64),
    Text(String),
    List(Vec<String>),
    Vec2(DVec2),
    Size(UVec2),
    Area(Rect),
}

fn canonical_key(key: &str) -> Option<&'static str> {
    let key = match key {
        "app.config" | "config" | "c" => keys::CONFIG_FILE,
        "app.debug.level" | "debuglevel" | "dl" => keys::DEBUG_LEVEL,
        "app.debug.counter" | "testcounter" | "tc" => keys::LOOP_COUNTER,
        "app.scenes.list" | "scenes" => keys::SCENES_LIST,
        "app.scenes.default" | "scene" => keys::SCENES_DEFAULT,
        "app.window.title" | "title" => keys::WINDOW_TITLE,
        "app.render.buffer.size" => keys::BUFFER_SIZE,
        "app.render.window.size" => keys::WINDOW_SIZE,
        "app.render.window.max.buffers" => keys::MAX_BUFFERS,
        "app.physic.world.gravity" | "gravity" => keys::GRAVITY,
        "app.physic.world.play.area" | "playarea" => keys::PLAY_AREA,
        "app.physics.update.rate" | "ups" => keys::UPDATE_RATE,
        _ => return None,
    };
    Some(key)
}

fn invalid(key: &str, value: &str, expected: &'static str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
        expected,
    }
}

fn parse_int(key: &str, raw: &str) -> Result<i64, ConfigError> {
    raw.parse().map_err(|_| invalid(key, raw, "an integer"))
}

fn parse_float(key: &str, raw: &str) -> Result<f64, ConfigError> {
    raw.parse().map_err(|_| invalid(key, raw, "a number"))
}

fn parse_pair(key: &str, raw: &str, sep: char, expected: &'static str) -> Result<(f64, f64), ConfigError> {
    let (a, b) = raw.split_once(sep).ok_or_else(|| invalid(key, raw, expected))?;
    let a = a.trim().parse().map_err(|_| invalid(key, raw, expected))?;
    let b = b.trim().parse().map_err(|_| invalid(key, raw, expected))?;
    Ok((a, b))
}

fn parse_size(key: &str, raw: &str) -> Result<UVec2, ConfigError> {
    let (w, h) = raw
        .split_once('x')
        .ok_or_else(|| invalid(key, raw, "a size like 320x200"))?;
    let w = w.trim().parse().map_err(|_| invalid(key, raw, "a size like 320x200"))?;
    let h = h.trim().parse().map_err(|_| invalid(key, raw, "a size like 320x200"))?;
    Ok(UVec2::new(w, h))
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn yaml_scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Flatten nested mappings into dotted keys; sequences become `;` lists.
fn flatten_yaml(prefix: &str, value: &Value, out: &mut Vec<(String, String)>) {
    match value {
        Value::Mapping(map) => {
            for (k, v) in map {
                let Some(k) = yaml_scalar(k) else {
                    continue;
                };
                let key = if prefix.is_empty() {
                    k
                } else {
                    format!("{prefix}.{k}")
                };
                flatten_yaml(&key, v, out);
            }
        }
        Value::Sequence(items) => {
            let joined = items
                .iter()
                .filter_map(yaml_scalar)
                .collect::<Vec<_>>()
                .join(";");
            out.push((prefix.to_string(), joined));
        }
        other => {
            if let Some(s) = yaml_scalar(other) {
                out.push((prefix.to_string(), s));
            }
        }
    }
}

/// Configuration provider (priority 0).
///
/// Values come from `key=value` arguments, then from a YAML file, then from
/// the arguments again so the command line always wins. Every other service
/// reads its settings through the typed getters at `init`.
#[derive(Debug)]
pub struct ConfigurationService {
    values: BTreeMap<String, ConfigValue>,
    config_file: PathBuf,
    config_file_explicit: bool,
    file_entries: usize,
    gets: Cell<u64>,
}

impl Default for ConfigurationService {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceKey for ConfigurationService {
    const NAME: &'static str = "ConfigurationService";
}

impl ConfigurationService {
    pub fn new() -> Self {
        Self {
            values: BTreeMap::new(),
            config_file: PathBuf::from(DEFAULT_CONFIG_FILE),
            config_file_explicit: false,
            file_entries: 0,
            gets: Cell::new(0),
        }
    }

    /// Use a specific configuration file instead of `playfield.yaml`.
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_file = path.into();
        self.config_file_explicit = true;
        self
    }

    pub fn config_file(&self) -> &Path {
        &self.config_file
    }

    /// Parse `key=value` tokens. Tokens without `=` are ignored; bad values
    /// are logged and skipped.
    pub fn parse_args(&mut self, args: &[String]) {
        for arg in args {
            let Some((key, value)) = arg.split_once('=') else {
                debug!(arg = %arg, "ignoring argument without '='");
                continue;
            };
            if let Err(err) = self.apply(key, value) {
                warn!(error = %err, "configuration argument ignored");
            }
        }
    }

    /// Parse and store a single raw value under its canonical key.
    /// Unknown keys are kept verbatim as text.
    pub fn apply(&mut self, key: &str, raw: &str) -> Result<(), ConfigError> {
        let key = key.trim();
        let raw = raw.trim();
        let Some(canonical) = canonical_key(&key.to_lowercase()) else {
            warn!(key, value = raw, "unknown configuration key");
            self.values
                .insert(key.to_string(), ConfigValue::Text(raw.to_string()));
            return Ok(());
        };

        let value = match canonical {
            keys::CONFIG_FILE => {
                self.config_file = PathBuf::from(raw);
                self.config_file_explicit = true;
                ConfigValue::Text(raw.to_string())
            }
            keys::DEBUG_LEVEL | keys::LOOP_COUNTER | keys::MAX_BUFFERS => {
                ConfigValue::Int(parse_int(canonical, raw)?)
            }
            keys::SCENES_LIST => ConfigValue::List(parse_list(raw)),
            keys::BUFFER_SIZE | keys::WINDOW_SIZE => ConfigValue::Size(parse_size(canonical, raw)?),
            keys::GRAVITY => {
                let (x, y) = parse_pair(canonical, raw, ',', "a vector like 0,-0.981")?;
                ConfigValue::Vec2(DVec2::new(x, y))
            }
            keys::PLAY_AREA => {
                let (w, h) = parse_pair(canonical, raw, 'x', "a size like 320x200")?;
                ConfigValue::Area(Rect::new(0.0, 0.0, w, h))
            }
            keys::UPDATE_RATE => ConfigValue::Float(parse_float(canonical, raw)?),
            _ => ConfigValue::Text(raw.to_string()),
        };
        info!(key = canonical, value = raw, "configuration value set");
        self.values.insert(canonical.to_string(), value);
        Ok(())
    }

    /// Store an already typed value.
    pub fn set(&mut self, key: impl Into<String>, value: ConfigValue) {
        self.values.insert(key.into(), value);
    }

    /// Read the configured YAML file and apply every entry. Returns the
    /// number of entries read.
    pub fn load_file(&mut self) -> Result<usize, ConfigError> {
        let path = self.config_file.clone();
        let text = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        let root: Value = serde_yaml::from_str(&text).map_err(|source| ConfigError::Yaml {
            path: path.clone(),
            source,
        })?;
        if !root.is_mapping() {
            return Err(ConfigError::NotAMapping(path));
        }

        let mut entries = Vec::new();
        flatten_yaml("", &root, &mut entries);
        for (key, value) in &entries {
            if let Err(err) = self.apply(key, value) {
                warn!(error = %err, file = %path.display(), "configuration entry ignored");
            }
        }
        self.file_entries = entries.len();
        Ok(entries.len())
    }

    fn load_configuration(&mut self) {
        match self.load_file() {
            Ok(count) => {
                info!(file = %self.config_file.display(), entries = count, "configuration file loaded");
            }
            Err(ConfigError::Io { ref source, .. })
                if source.kind() == std::io::ErrorKind::NotFound && !self.config_file_explicit =>
            {
                debug!(file = %self.config_file.display(), "no configuration file, using arguments only");
            }
            Err(err) => {
                error!(error = %err, "configuration file ignored");
            }
        }
    }

    pub fn value(&self, key: &str) -> Option<&ConfigValue> {
        self.gets.set(self.gets.get() + 1);
        self.values.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn int(&self, key: &str) -> Option<i64> {
        match self.value(key)? {
            ConfigValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn float(&self, key: &str) -> Option<f64> {
        match self.value(key)? {
            ConfigValue::Float(v) => Some(*v),
            ConfigValue::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        match self.value(key)? {
            ConfigValue::Text(v) => Some(v.as_str()),
            _ => None,
        }
    }

    pub fn list(&self, key: &str) -> Option<&[String]> {
        match self.value(key)? {
            ConfigValue::List(v) => Some(v.as_slice()),
            _ => None,
        }
    }

    pub fn vec2(&self, key: &str) -> Option<DVec2> {
        match self.value(key)? {
            ConfigValue::Vec2(v) => Some(*v),
            _ => None,
        }
    }

    pub fn size(&self, key: &str) -> Option<UVec2> {
        match self.value(key)? {
            ConfigValue::Size(v) => Some(*v),
            _ => None,
        }
    }

    pub fn area(&self, key: &str) -> Option<Rect> {
        match self.value(key)? {
            ConfigValue::Area(v) => Some(*v),
            _ => None,
        }
    }

    pub fn float_or(&self, key: &str, default: f64) -> f64 {
        self.float(key).unwrap_or_else(|| {
            warn!(key, default, "configuration value missing, using default");
            default
        })
    }

    pub fn vec2_or(&self, key: &str, default: DVec2) -> DVec2 {
        self.vec2(key).unwrap_or_else(|| {
            warn!(key, default = %default, "configuration value missing, using default");
            default
        })
    }

    pub fn area_or(&self, key: &str, default: Rect) -> Rect {
        self.area(key).unwrap_or_else(|| {
            warn!(key, default = %default, "configuration value missing, using default");
            default
        })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl Service for ConfigurationService {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn priority(&self) -> i32 {
        0
    }

    fn init(&mut self, app: &mut App, args: &[String]) -> Result<(), ServiceError> {
        self.parse_args(args);
        self.load_configuration();
        self.parse_args(args);

        if let Some(ConfigValue::Int(level)) = self.values.get(keys::DEBUG_LEVEL) {
            app.set_debug_level((*level).clamp(0, i64::from(u8::MAX)) as u8);
        }
        if let Some(ConfigValue::Int(counter)) = self.values.get(keys::LOOP_COUNTER) {
            if *counter >= 0 {
                app.set_test_loop_counter(*counter as u64);
                info!(max_loop = counter, "test mode: loop counter set");
            }
        }
        if let Some(ConfigValue::Text(title)) = self.values.get(keys::WINDOW_TITLE) {
            app.set_name(title.clone());
        }
        Ok(())
    }

    fn stats(&self) -> Stats {
        let mut stats = Stats::new();
        stats.insert(
            "service.configuration.counter.values".into(),
            StatValue::from(self.values.len()),
        );
        stats.insert(
            "service.configuration.counter.get".into(),
            StatValue::from(self.gets.get()),
        );
        stats.insert(
            "service.configuration.counter.file.entries".into(),
            StatValue::from(self.file_entries),
        );
        stats
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
