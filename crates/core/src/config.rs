use serde::{Deserialize, Serialize};
use storage::DEFAULT_SIDECAR_NAME;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub batch: BatchConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// File name of the per-directory tag file.
    #[serde(default = "default_sidecar_name")]
    pub sidecar_name: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            sidecar_name: default_sidecar_name(),
        }
    }
}

fn default_sidecar_name() -> String {
    DEFAULT_SIDECAR_NAME.to_string()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchConfig {
    #[serde(default)]
    pub on_parse_error: ParseErrorPolicy,
}

/// What to do with a batch line that does not parse.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParseErrorPolicy {
    /// Report the line, count it as failed, keep assembling.
    #[default]
    Skip,
    /// Refuse to run anything.
    Abort,
}

pub fn load(path: Option<&str>) -> anyhow::Result<AppConfig> {
    let mut settings = config::Config::builder();
    if let Some(p) = path {
        settings = settings.add_source(config::File::with_name(p));
    } else {
        settings = settings.add_source(config::File::with_name("config/default").required(false));
    }
    let cfg: AppConfig = settings.build()?.try_deserialize()?;
    validate(&cfg)?;
    Ok(cfg)
}

fn validate(cfg: &AppConfig) -> anyhow::Result<()> {
    let name = &cfg.store.sidecar_name;
    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
        anyhow::bail!("store.sidecar_name must be a plain file name, got {:?}", name);
    }
    Ok(())
}
