//! Emulator configuration.
//!
//! Read from environment variables only:
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `APISTACK_BIND` | `127.0.0.1:3000` | Listen address. |
//! | `APISTACK_API_KEY` | *(generated)* | Value clients send in `x-api-key`. |
//! | `APISTACK_STACK_FILE` | *(none)* | Stack declarations (JSON) to synthesize. |
//! | `APISTACK_MANIFEST_FILE` | *(none)* | Pre-synthesized manifest; wins over the stack file. |
//! | `APISTACK_LOG_JSON` | `false` | Emit JSON log lines. |
//! | `APISTACK_DISPLAY_NAME` | `sam.leung` | Name the greeting addresses. |
//!
//! With neither file set the bundled demo stack is served.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use apistack_core::declare::StackDeclaration;
use apistack_core::model::Manifest;
use apistack_core::pipeline::synth::Synthesizer;
use apistack_core::config::StackConfig;
use apistack_handler::DEFAULT_DISPLAY_NAME;

pub const DEFAULT_BIND: &str = "127.0.0.1:3000";

#[derive(Clone)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    pub api_key: String,
    /// True when no key was configured and one was minted at startup.
    pub api_key_generated: bool,
    pub stack_file: Option<PathBuf>,
    pub manifest_file: Option<PathBuf>,
    pub log_json: bool,
    pub display_name: String,
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("bind", &self.bind)
            .field("api_key_generated", &self.api_key_generated)
            .field("stack_file", &self.stack_file)
            .field("manifest_file", &self.manifest_file)
            .field("log_json", &self.log_json)
            .field("display_name", &self.display_name)
            .finish_non_exhaustive()
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    /// Build from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |k: &str| lookup(k).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let bind_raw = get("APISTACK_BIND").unwrap_or_else(|| DEFAULT_BIND.to_string());
        let bind: SocketAddr = bind_raw
            .parse()
            .with_context(|| format!("APISTACK_BIND is not a socket address: {bind_raw}"))?;

        let (api_key, api_key_generated) = match get("APISTACK_API_KEY") {
            Some(k) => (k, false),
            None => (uuid::Uuid::new_v4().simple().to_string(), true),
        };

        let log_json = match get("APISTACK_LOG_JSON").as_deref() {
            None => false,
            Some("1" | "true" | "TRUE" | "yes") => true,
            Some("0" | "false" | "FALSE" | "no") => false,
            Some(other) => anyhow::bail!("APISTACK_LOG_JSON must be a boolean, got {other}"),
        };

        Ok(Self {
            bind,
            api_key,
            api_key_generated,
            stack_file: get("APISTACK_STACK_FILE").map(PathBuf::from),
            manifest_file: get("APISTACK_MANIFEST_FILE").map(PathBuf::from),
            log_json,
            display_name: get("APISTACK_DISPLAY_NAME").unwrap_or_else(|| DEFAULT_DISPLAY_NAME.to_string()),
        })
    }

    /// The manifest to serve: the manifest file, else the synthesized stack file, else the demo stack.
    pub fn load_manifest(&self) -> Result<Manifest> {
        if let Some(path) = &self.manifest_file {
            let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
            return Manifest::from_json_bytes(&bytes).with_context(|| format!("loading manifest {}", path.display()));
        }

        let declaration = match &self.stack_file {
            Some(path) => {
                let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
                StackDeclaration::from_json_bytes(&bytes)
                    .with_context(|| format!("parsing stack declarations {}", path.display()))?
            }
            None => StackDeclaration::demo(),
        };

        let manifest = Synthesizer::new(StackConfig::default())?
            .synthesize(&declaration)
            .with_context(|| format!("synthesizing stack {}", declaration.stack))?;
        Ok(manifest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn defaults_apply() {
        let cfg = ServerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(cfg.bind.to_string(), DEFAULT_BIND);
        assert!(cfg.api_key_generated);
        assert_eq!(cfg.api_key.len(), 32);
        assert!(!cfg.log_json);
        assert_eq!(cfg.display_name, DEFAULT_DISPLAY_NAME);
    }

    #[test]
    fn explicit_values_win() {
        let cfg = ServerConfig::from_lookup(lookup(&[
            ("APISTACK_BIND", "0.0.0.0:8080"),
            ("APISTACK_API_KEY", "secret"),
            ("APISTACK_LOG_JSON", "true"),
            ("APISTACK_DISPLAY_NAME", "ada"),
        ]))
        .unwrap();
        assert_eq!(cfg.bind.port(), 8080);
        assert_eq!(cfg.api_key, "secret");
        assert!(!cfg.api_key_generated);
        assert!(cfg.log_json);
        assert_eq!(cfg.display_name, "ada");
    }

    #[test]
    fn bad_values_rejected() {
        assert!(ServerConfig::from_lookup(lookup(&[("APISTACK_BIND", "nowhere")])).is_err());
        assert!(ServerConfig::from_lookup(lookup(&[("APISTACK_LOG_JSON", "maybe")])).is_err());
    }

    #[test]
    fn debug_hides_api_key() {
        let cfg = ServerConfig::from_lookup(lookup(&[("APISTACK_API_KEY", "hunter2")])).unwrap();
        assert!(!format!("{cfg:?}").contains("hunter2"));
    }

    #[test]
    fn demo_manifest_by_default() {
        let cfg = ServerConfig::from_lookup(lookup(&[])).unwrap();
        let m = cfg.load_manifest().unwrap();
        assert_eq!(m.stack, "deno-api-stack");
    }
}
