use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use directories::BaseDirs;
use reqwest::Url;
use serde::de::Deserializer;
use serde::Deserialize;

const CONFIG_FILE_NAME: &str = "config.toml";
const APP_NAME: &str = "fnreview";

pub const DEFAULT_DESCRIPTION_WIDTH: usize = 47;
pub const DEFAULT_PATH_WIDTH: usize = 87;

#[derive(Debug, Clone)]
pub struct Config {
    pub config_path: PathBuf,
    pub backend: BackendConfig,
    pub view: ViewConfig,
    pub log: LogConfig,
    pub ui: UiConfig,
    pub keys: Keys,
    /// Unknown-key messages found while parsing, reported once logging is up
    pub warnings: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_path: PathBuf::from(CONFIG_FILE_NAME),
            backend: BackendConfig::default(),
            view: ViewConfig::default(),
            log: LogConfig::default(),
            ui: UiFile::default().into(),
            keys: KeysFile::default().into(),
            warnings: Vec::new(),
        }
    }
}

// =============================================================================
// Backend Configuration
// =============================================================================

/// Where the review service lives and which routes it exposes
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub base_url: String,
    pub query_endpoint: String,
    pub update_endpoint: String,
    pub delete_endpoint: String,
    pub timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5000".to_string(),
            query_endpoint: "/buscard/query/review_filenode".to_string(),
            update_endpoint: "/buscard/node/update".to_string(),
            delete_endpoint: "/buscard/node/delete".to_string(),
            timeout_secs: 30,
        }
    }
}

impl BackendConfig {
    pub fn validate(&self) -> Result<()> {
        Url::parse(&self.base_url)
            .with_context(|| format!("backend.base_url is not a valid URL: {}", self.base_url))?;
        if self.timeout_secs == 0 {
            bail!("backend.timeout_secs must be greater than zero");
        }
        Ok(())
    }
}

// =============================================================================
// View Configuration
// =============================================================================

/// Presentation settings consumed by the view model
#[derive(Debug, Clone)]
pub struct ViewConfig {
    /// Default query root; also stripped from displayed file paths
    pub root_path: String,
    pub description_width: usize,
    pub path_width: usize,
    /// How long deleted rows stay visible (faded) before removal
    pub fade_delay: Duration,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            root_path: String::new(),
            description_width: DEFAULT_DESCRIPTION_WIDTH,
            path_width: DEFAULT_PATH_WIDTH,
            fade_delay: Duration::from_millis(300),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
struct ViewFile {
    root_path: String,
    description_width: usize,
    path_width: usize,
    fade_delay_ms: u64,
}

impl Default for ViewFile {
    fn default() -> Self {
        Self {
            root_path: String::new(),
            description_width: DEFAULT_DESCRIPTION_WIDTH,
            path_width: DEFAULT_PATH_WIDTH,
            fade_delay_ms: 300,
        }
    }
}

impl ViewFile {
    fn into_config(self) -> Result<ViewConfig> {
        // room for at least one character plus the ellipsis
        if self.description_width <= 3 {
            bail!("view.description_width must be greater than 3");
        }
        if self.path_width <= 3 {
            bail!("view.path_width must be greater than 3");
        }
        Ok(ViewConfig {
            root_path: self.root_path,
            description_width: self.description_width,
            path_width: self.path_width,
            fade_delay: Duration::from_millis(self.fade_delay_ms),
        })
    }
}

// =============================================================================
// Log Configuration
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Default filter directive; `RUST_LOG` wins when set
    pub level: String,
    /// Log file used by the terminal UI
    pub file: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

// =============================================================================
// UI Configuration
// =============================================================================

#[derive(Debug, Clone)]
pub struct UiConfig {
    pub colors: UiColors,
}

#[derive(Debug, Clone)]
pub struct UiColors {
    pub border: RgbColor,
    pub selection_bg: RgbColor,
    pub selection_fg: RgbColor,
    pub separator: RgbColor,
    pub status_fg: RgbColor,
    pub status_bg: RgbColor,
    pub edited: RgbColor,
    pub saved: RgbColor,
    pub error: RgbColor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RgbColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct UiFile {
    colors: UiColorsFile,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
struct UiColorsFile {
    border: RgbColor,
    selection_bg: RgbColor,
    selection_fg: RgbColor,
    separator: RgbColor,
    status_fg: RgbColor,
    status_bg: RgbColor,
    edited: RgbColor,
    saved: RgbColor,
    error: RgbColor,
}

impl Default for UiColorsFile {
    fn default() -> Self {
        Self {
            border: RgbColor::new(255, 165, 0),
            selection_bg: RgbColor::new(255, 165, 0),
            selection_fg: RgbColor::new(0, 0, 0),
            separator: RgbColor::new(255, 165, 0),
            status_fg: RgbColor::new(255, 165, 0),
            status_bg: RgbColor::new(0, 0, 0),
            edited: RgbColor::new(230, 200, 60),
            saved: RgbColor::new(90, 200, 120),
            error: RgbColor::new(230, 80, 80),
        }
    }
}

impl From<UiFile> for UiConfig {
    fn from(file: UiFile) -> Self {
        let c = file.colors;
        Self {
            colors: UiColors {
                border: c.border,
                selection_bg: c.selection_bg,
                selection_fg: c.selection_fg,
                separator: c.separator,
                status_fg: c.status_fg,
                status_bg: c.status_bg,
                edited: c.edited,
                saved: c.saved,
                error: c.error,
            },
        }
    }
}

impl RgbColor {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

impl<'de> serde::Deserialize<'de> for RgbColor {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Helper {
            Array([u8; 3]),
            Map { r: u8, g: u8, b: u8 },
        }

        let helper = Helper::deserialize(deserializer)?;
        let (r, g, b) = match helper {
            Helper::Array(values) => (values[0], values[1], values[2]),
            Helper::Map { r, g, b } => (r, g, b),
        };
        Ok(RgbColor { r, g, b })
    }
}

// =============================================================================
// Key bindings
// =============================================================================

#[derive(Debug, Clone)]
pub struct Keys {
    pub quit: Vec<String>,
    pub next: Vec<String>,
    pub prev: Vec<String>,
    pub tab_next: Vec<String>,
    pub tab_prev: Vec<String>,
    pub panel_next: Vec<String>,
    pub panel_prev: Vec<String>,
    pub toggle: Vec<String>,
    pub select_all: Vec<String>,
    pub edit: Vec<String>,
    pub save: Vec<String>,
    pub reset: Vec<String>,
    pub delete: Vec<String>,
    pub execute: Vec<String>,
    pub cycle_action: Vec<String>,
    pub submit: Vec<String>,
    pub confirm: Vec<String>,
    pub cancel: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum KeyList {
    Single(String),
    Multiple(Vec<String>),
}

impl KeyList {
    fn into_vec(self) -> Vec<String> {
        match self {
            KeyList::Single(key) => vec![key],
            KeyList::Multiple(keys) => keys,
        }
    }
}

fn keys(list: &[&str]) -> KeyList {
    KeyList::Multiple(list.iter().map(|k| k.to_string()).collect())
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct KeysFile {
    quit: KeyList,
    next: KeyList,
    prev: KeyList,
    tab_next: KeyList,
    tab_prev: KeyList,
    panel_next: KeyList,
    panel_prev: KeyList,
    toggle: KeyList,
    select_all: KeyList,
    edit: KeyList,
    save: KeyList,
    reset: KeyList,
    delete: KeyList,
    execute: KeyList,
    cycle_action: KeyList,
    submit: KeyList,
    confirm: KeyList,
    cancel: KeyList,
}

impl Default for KeysFile {
    fn default() -> Self {
        Self {
            quit: keys(&["q"]),
            next: keys(&["j", "down"]),
            prev: keys(&["k", "up"]),
            tab_next: keys(&["tab"]),
            tab_prev: keys(&["backtab"]),
            panel_next: keys(&["l", "right"]),
            panel_prev: keys(&["h", "left"]),
            toggle: keys(&["space"]),
            select_all: keys(&["a"]),
            edit: keys(&["e", "enter"]),
            save: keys(&["s"]),
            reset: keys(&["r"]),
            delete: keys(&["x"]),
            execute: keys(&["g"]),
            cycle_action: keys(&["c"]),
            submit: keys(&["enter"]),
            confirm: keys(&["y", "enter"]),
            cancel: keys(&["n", "esc"]),
        }
    }
}

impl From<KeysFile> for Keys {
    fn from(file: KeysFile) -> Self {
        Self {
            quit: file.quit.into_vec(),
            next: file.next.into_vec(),
            prev: file.prev.into_vec(),
            tab_next: file.tab_next.into_vec(),
            tab_prev: file.tab_prev.into_vec(),
            panel_next: file.panel_next.into_vec(),
            panel_prev: file.panel_prev.into_vec(),
            toggle: file.toggle.into_vec(),
            select_all: file.select_all.into_vec(),
            edit: file.edit.into_vec(),
            save: file.save.into_vec(),
            reset: file.reset.into_vec(),
            delete: file.delete.into_vec(),
            execute: file.execute.into_vec(),
            cycle_action: file.cycle_action.into_vec(),
            submit: file.submit.into_vec(),
            confirm: file.confirm.into_vec(),
            cancel: file.cancel.into_vec(),
        }
    }
}

/// Bindings that are live at the same time must not overlap.
fn validate_key_bindings(keys: &Keys) -> Result<()> {
    let list_context: [(&str, &Vec<String>); 10] = [
        ("quit", &keys.quit),
        ("next", &keys.next),
        ("prev", &keys.prev),
        ("tab_next", &keys.tab_next),
        ("tab_prev", &keys.tab_prev),
        ("toggle", &keys.toggle),
        ("select_all", &keys.select_all),
        ("delete", &keys.delete),
        ("execute", &keys.execute),
        ("cycle_action", &keys.cycle_action),
    ];
    let update_context: [(&str, &Vec<String>); 11] = [
        ("quit", &keys.quit),
        ("next", &keys.next),
        ("prev", &keys.prev),
        ("tab_next", &keys.tab_next),
        ("tab_prev", &keys.tab_prev),
        ("panel_next", &keys.panel_next),
        ("panel_prev", &keys.panel_prev),
        ("toggle", &keys.toggle),
        ("edit", &keys.edit),
        ("save", &keys.save),
        ("reset", &keys.reset),
    ];

    check_context("list", &list_context)?;
    check_context("update", &update_context)?;
    Ok(())
}

fn check_context(context: &str, bindings: &[(&str, &Vec<String>)]) -> Result<()> {
    let mut seen: Vec<(String, &str)> = Vec::new();
    for &(action, keys) in bindings {
        for key in keys.iter() {
            let normalized = key.trim().to_string();
            if let Some((_, other)) = seen.iter().find(|(k, _)| *k == normalized) {
                bail!(
                    "key `{}` is bound to both `{}` and `{}` in the {} view",
                    normalized,
                    other,
                    action,
                    context
                );
            }
            seen.push((normalized, action));
        }
    }
    Ok(())
}

// =============================================================================
// Loading
// =============================================================================

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ConfigFile {
    backend: BackendConfig,
    view: ViewFile,
    log: LogConfig,
    ui: UiFile,
    keys: KeysFile,
}

fn config_root() -> Result<PathBuf> {
    let base = BaseDirs::new().context("unable to determine configuration directory")?;
    Ok(base.config_dir().join(APP_NAME))
}

/// Directory for the log file and other runtime data
pub fn data_dir() -> Result<PathBuf> {
    let base = BaseDirs::new().context("unable to determine data directories")?;
    Ok(base.data_dir().join(APP_NAME))
}

pub fn config_path() -> Result<PathBuf> {
    Ok(config_root()?.join(CONFIG_FILE_NAME))
}

/// Load configuration from `explicit`, or from the default location.
///
/// A missing default file means "use defaults"; a missing explicit file is an
/// error.
pub fn load(explicit: Option<&Path>) -> Result<Config> {
    let path = match explicit {
        Some(path) => {
            if !path.exists() {
                bail!("configuration file not found at {}", path.display());
            }
            path.to_path_buf()
        }
        None => {
            let path = config_path()?;
            if !path.exists() {
                return Ok(Config {
                    config_path: path,
                    ..Config::default()
                });
            }
            path
        }
    };

    let raw = fs::read_to_string(&path)
        .with_context(|| format!("failed to read configuration file at {}", path.display()))?;
    parse(&raw, path)
}

/// Parse configuration text; `path` is only recorded for display.
pub fn parse(raw: &str, path: PathBuf) -> Result<Config> {
    let value: toml::Value = toml::from_str(raw)
        .with_context(|| format!("failed to parse {} as TOML", path.display()))?;

    let warnings = unknown_keys(&value);

    let cfg_file: ConfigFile = value
        .try_into()
        .with_context(|| format!("failed to deserialize config from {}", path.display()))?;

    cfg_file.backend.validate()?;
    let view = cfg_file.view.into_config()?;
    let keys: Keys = cfg_file.keys.into();
    validate_key_bindings(&keys)?;

    Ok(Config {
        config_path: path,
        backend: cfg_file.backend,
        view,
        log: cfg_file.log,
        ui: cfg_file.ui.into(),
        keys,
        warnings,
    })
}

// =============================================================================
// Unknown key warnings
// =============================================================================

fn unknown_keys(value: &toml::Value) -> Vec<String> {
    let mut warnings = Vec::new();
    let Some(table) = value.as_table() else {
        return warnings;
    };

    collect_unknown(
        &mut warnings,
        "",
        value,
        &["backend", "view", "log", "ui", "keys"],
    );

    if let Some(v) = table.get("backend") {
        collect_unknown(
            &mut warnings,
            "backend.",
            v,
            &[
                "base_url",
                "query_endpoint",
                "update_endpoint",
                "delete_endpoint",
                "timeout_secs",
            ],
        );
    }
    if let Some(v) = table.get("view") {
        collect_unknown(
            &mut warnings,
            "view.",
            v,
            &["root_path", "description_width", "path_width", "fade_delay_ms"],
        );
    }
    if let Some(v) = table.get("log") {
        collect_unknown(&mut warnings, "log.", v, &["level", "file"]);
    }
    if let Some(v) = table.get("ui") {
        collect_unknown(&mut warnings, "ui.", v, &["colors"]);
        if let Some(colors) = v.get("colors") {
            collect_unknown(
                &mut warnings,
                "ui.colors.",
                colors,
                &[
                    "border",
                    "selection_bg",
                    "selection_fg",
                    "separator",
                    "status_fg",
                    "status_bg",
                    "edited",
                    "saved",
                    "error",
                ],
            );
        }
    }
    if let Some(v) = table.get("keys") {
        collect_unknown(
            &mut warnings,
            "keys.",
            v,
            &[
                "quit",
                "next",
                "prev",
                "tab_next",
                "tab_prev",
                "panel_next",
                "panel_prev",
                "toggle",
                "select_all",
                "edit",
                "save",
                "reset",
                "delete",
                "execute",
                "cycle_action",
                "submit",
                "confirm",
                "cancel",
            ],
        );
    }

    warnings
}

fn collect_unknown(warnings: &mut Vec<String>, prefix: &str, value: &toml::Value, known: &[&str]) {
    let Some(table) = value.as_table() else {
        return;
    };
    let known: HashSet<&str> = known.iter().copied().collect();
    for key in table.keys() {
        if !known.contains(key.as_str()) {
            warnings.push(format!("unknown configuration key `{}{}`", prefix, key));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_str(raw: &str) -> Result<Config> {
        parse(raw, PathBuf::from("test.toml"))
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = parse_str("").unwrap();
        assert_eq!(config.backend.base_url, "http://127.0.0.1:5000");
        assert_eq!(config.backend.update_endpoint, "/buscard/node/update");
        assert_eq!(config.view.description_width, 47);
        assert_eq!(config.view.path_width, 87);
        assert_eq!(config.view.fade_delay, Duration::from_millis(300));
        assert_eq!(config.log.level, "info");
        assert_eq!(config.keys.quit, vec!["q".to_string()]);
    }

    #[test]
    fn test_sections_override_defaults() {
        let config = parse_str(
            r#"
            [backend]
            base_url = "http://review.local:8080"
            timeout_secs = 5

            [view]
            root_path = 'C:\Users\termi\Dropbox\'
            fade_delay_ms = 0

            [ui.colors]
            edited = [1, 2, 3]
            saved = { r = 4, g = 5, b = 6 }

            [keys]
            quit = "Q"
            "#,
        )
        .unwrap();
        assert_eq!(config.backend.base_url, "http://review.local:8080");
        assert_eq!(config.backend.timeout_secs, 5);
        assert_eq!(config.backend.query_endpoint, "/buscard/query/review_filenode");
        assert_eq!(config.view.root_path, "C:\\Users\\termi\\Dropbox\\");
        assert_eq!(config.view.fade_delay, Duration::ZERO);
        assert_eq!(config.ui.colors.edited, RgbColor::new(1, 2, 3));
        assert_eq!(config.ui.colors.saved, RgbColor::new(4, 5, 6));
        assert_eq!(config.keys.quit, vec!["Q".to_string()]);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(parse_str("[backend]\nbase_url = \"nope\"").is_err());
        assert!(parse_str("[backend]\ntimeout_secs = 0").is_err());
        assert!(parse_str("[view]\npath_width = 3").is_err());
    }

    #[test]
    fn test_colliding_keys_are_rejected() {
        let err = parse_str("[keys]\nsave = \"r\"").unwrap_err();
        assert!(err.to_string().contains("`r`"));
    }

    #[test]
    fn test_unknown_keys_are_reported() {
        let value: toml::Value = toml::from_str(
            r#"
            colour = "red"
            [backend]
            base_url = "http://x"
            retries = 3
            [ui.colors]
            accent = [1, 1, 1]
            "#,
        )
        .unwrap();
        let warnings = unknown_keys(&value);
        assert!(warnings.contains(&"unknown configuration key `colour`".to_string()));
        assert!(warnings.contains(&"unknown configuration key `backend.retries`".to_string()));
        assert!(warnings.contains(&"unknown configuration key `ui.colors.accent`".to_string()));
        assert_eq!(warnings.len(), 3);
    }

    #[test]
    fn test_parse_keeps_unknown_key_warnings() {
        let config = parse("colour = \"red\"\n", PathBuf::from("fnreview.toml")).unwrap();
        assert_eq!(
            config.warnings,
            vec!["unknown configuration key `colour`".to_string()]
        );
        assert!(parse("", PathBuf::from("fnreview.toml")).unwrap().warnings.is_empty());
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let missing = dir.path().join("absent.toml");
        assert!(load(Some(&missing)).is_err());
    }

    #[test]
    fn test_load_explicit_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[view]\nroot_path = \"/srv/cards/\"\n").unwrap();
        let config = load(Some(&path)).unwrap();
        assert_eq!(config.view.root_path, "/srv/cards/");
        assert_eq!(config.config_path, path);
    }
}
