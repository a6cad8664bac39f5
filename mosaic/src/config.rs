use mosaic_core::config::CoreConfig;

const DOCUMENTATION: &str = r#"# Mosaic configuration. You may edit this file, but be aware that formatting and comments will not
# be preserved. Any missing key takes its default.

# [history]
# undo_levels = 5           # Entries always kept.
# undo_size = 67108864      # Bytes of history kept beyond that.
# [tiles]
# tile_size = 64
# [trace]
# threshold = 0.5
# bound_type = "WithinBounds" # or "IgnoreBounds"
# format = "Alpha"            # or "Luminance"
# simplify = true

"#;

#[must_use]
pub fn preferences_dir() -> Option<std::path::PathBuf> {
    let mut base_dir = dirs::preference_dir()?;
    base_dir.push(env!("CARGO_PKG_NAME"));
    Some(base_dir)
}

pub struct Config {
    pub core: CoreConfig,
}
impl Config {
    const FILENAME: &'static str = "config.toml";
    /// Load from user preferences, or defaults if unavailable for some reason.
    #[must_use]
    pub fn load() -> Self {
        match preferences_dir() {
            None => Self::no_path(),
            Some(mut dir) => {
                dir.push(Self::FILENAME);
                Self::load_or_default(&dir)
            }
        }
    }
    #[must_use]
    pub fn no_path() -> Self {
        log::warn!("Config wasn't available, defaulting.");
        Self {
            core: CoreConfig::default(),
        }
    }
    #[must_use]
    fn load_or_default(path: &std::path::Path) -> Self {
        let core: anyhow::Result<CoreConfig> = try_block::try_block! {
            let string = std::fs::read_to_string(path)?;
            let core = parse(&string)?;
            Ok(core)
        };
        match core {
            Ok(core) => {
                log::debug!("Loaded config from {}", path.display());
                Self { core }
            }
            Err(err) => {
                log::debug!("Reading {}: {err:#}", path.display());
                Self::no_path()
            }
        }
    }
    pub fn save(&self) -> anyhow::Result<std::path::PathBuf> {
        let mut preferences =
            preferences_dir().ok_or_else(|| anyhow::anyhow!("No preferences dir found"))?;
        // Explicity do *not* create recursively. If not found, the user probably has a good reason.
        // Ignore errors (could already exist). Any real errors will be emitted by file access below.
        let _ = std::fs::DirBuilder::new().create(&preferences);

        preferences.push(Self::FILENAME);
        let string = DOCUMENTATION.to_owned() + &toml::ser::to_string_pretty(&self.core)?;
        std::fs::write(&preferences, string)?;
        Ok(preferences)
    }
}

fn parse(string: &str) -> anyhow::Result<CoreConfig> {
    let core: CoreConfig = toml::from_str(string)?;
    anyhow::ensure!(core.tiles.tile_size > 0, "tile_size must be nonzero");
    anyhow::ensure!(
        (0.0..=1.0).contains(&core.trace.threshold),
        "threshold must be between 0 and 1"
    );
    Ok(core)
}
