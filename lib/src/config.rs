//! Optimizer configuration, read from a JSON file
//!
//! Only the settings relevant to reference checking are understood: the checking context
//! (`min_sdk`, `store`, `api_levels`) and lists of annotations and methods that other passes
//! consult. Any other keys are ignored.

use crate::api::ApiLevel;
use crate::dex::{BinaryName, ClassData, ClassGraph, MemberRef, MethodData, ParseDescriptor};
use crate::store::{StoreIdx, XStoreRefs, ROOT_STORE_NAME};
use crate::Error;
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize)]
pub struct ConfigJson {
    #[serde(default)]
    pub min_sdk: u32,

    /// Name of the store whose code is being optimized
    #[serde(default = "default_store")]
    pub store: String,

    /// API levels listing (relative paths are relative to the config file)
    #[serde(default)]
    pub api_levels: Option<PathBuf>,

    #[serde(default)]
    pub no_optimizations_annotations: Vec<String>,

    #[serde(default)]
    pub pure_methods: Vec<String>,

    #[serde(default)]
    pub inliner: Option<InlinerJson>,

    /// Older name for `inliner`
    #[serde(default, rename = "MethodInlinePass")]
    pub method_inline_pass: Option<InlinerJson>,
}

fn default_store() -> String {
    String::from(ROOT_STORE_NAME)
}

impl Default for ConfigJson {
    fn default() -> Self {
        ConfigJson {
            min_sdk: 0,
            store: default_store(),
            api_levels: None,
            no_optimizations_annotations: vec![],
            pure_methods: vec![],
            inliner: None,
            method_inline_pass: None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct InlinerJson {
    #[serde(default)]
    pub no_inline_annos: Vec<String>,

    #[serde(default)]
    pub force_inline_annos: Vec<String>,
}

/// Something in the configuration which doesn't match the program
///
/// These are not errors: configurations are routinely shared between apps.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum ConfigWarning {
    UnknownType { key: &'static str, name: String },
    UnknownMethod { key: &'static str, name: String },
    NoInlinerConfig,
}

impl fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigWarning::UnknownType { key, name } => {
                write!(f, "cannot find {} type {}", key, name)
            }
            ConfigWarning::UnknownMethod { key, name } => {
                write!(f, "cannot find {} method {}", key, name)
            }
            ConfigWarning::NoInlinerConfig => f.write_str("no inliner config"),
        }
    }
}

/// Configuration with names looked up in the class graph
pub struct ResolvedConfig<'g> {
    pub no_optimizations_annos: Vec<&'g ClassData<'g>>,
    pub pure_methods: Vec<&'g MethodData<'g>>,
    pub no_inline_annos: Vec<&'g ClassData<'g>>,
    pub force_inline_annos: Vec<&'g ClassData<'g>>,
    pub warnings: Vec<ConfigWarning>,
}

pub struct ConfigFiles {
    json: ConfigJson,

    /// Directory against which relative paths are resolved
    base_dir: Option<PathBuf>,
}

impl ConfigFiles {
    pub fn new(json: ConfigJson) -> ConfigFiles {
        ConfigFiles {
            json,
            base_dir: None,
        }
    }

    pub fn parse<P: AsRef<Path>>(path: P) -> Result<ConfigFiles, Error> {
        let path = path.as_ref();
        log::debug!("Reading config {}", path.display());
        let contents = fs::read_to_string(path)?;
        let mut config = Self::from_json_str(&contents)?;
        config.base_dir = path.parent().map(Path::to_path_buf);
        Ok(config)
    }

    pub fn from_json_str(json: &str) -> Result<ConfigFiles, Error> {
        Ok(ConfigFiles::new(serde_json::from_str(json)?))
    }

    pub fn min_sdk(&self) -> ApiLevel {
        ApiLevel(self.json.min_sdk)
    }

    pub fn store_name(&self) -> &str {
        &self.json.store
    }

    /// Index of the configured store
    pub fn store_idx(&self, xstores: &XStoreRefs) -> Result<StoreIdx, Error> {
        xstores
            .get_store_idx_by_name(&self.json.store)
            .ok_or_else(|| Error::UnknownStore(self.json.store.clone()))
    }

    pub fn api_levels_path(&self) -> Option<PathBuf> {
        let path = self.json.api_levels.as_ref()?;
        match &self.base_dir {
            Some(base_dir) if path.is_relative() => Some(base_dir.join(path)),
            _ => Some(path.clone()),
        }
    }

    fn inliner_config(&self) -> Option<&InlinerJson> {
        self.json
            .inliner
            .as_ref()
            .or(self.json.method_inline_pass.as_ref())
    }

    /// Look up every type and method the configuration mentions
    ///
    /// Names that can't be found are dropped, with a warning.
    pub fn resolve<'g>(&self, graph: &'g ClassGraph<'g>) -> ResolvedConfig<'g> {
        let mut warnings = vec![];

        let no_optimizations_annos = resolve_types(
            graph,
            "no_optimizations_annotations",
            &self.json.no_optimizations_annotations,
            &mut warnings,
        );
        let pure_methods = resolve_methods(
            graph,
            "pure_methods",
            &self.json.pure_methods,
            &mut warnings,
        );
        let (no_inline_annos, force_inline_annos) = match self.inliner_config() {
            None => {
                warnings.push(ConfigWarning::NoInlinerConfig);
                (vec![], vec![])
            }
            Some(inliner) => (
                resolve_types(
                    graph,
                    "no_inline_annos",
                    &inliner.no_inline_annos,
                    &mut warnings,
                ),
                resolve_types(
                    graph,
                    "force_inline_annos",
                    &inliner.force_inline_annos,
                    &mut warnings,
                ),
            ),
        };

        for warning in &warnings {
            log::warn!("{}", warning);
        }
        ResolvedConfig {
            no_optimizations_annos,
            pure_methods,
            no_inline_annos,
            force_inline_annos,
            warnings,
        }
    }
}

fn resolve_types<'g>(
    graph: &'g ClassGraph<'g>,
    key: &'static str,
    names: &[String],
    warnings: &mut Vec<ConfigWarning>,
) -> Vec<&'g ClassData<'g>> {
    let mut found = vec![];
    for name in names {
        let class = BinaryName::parse(name)
            .ok()
            .and_then(|name| graph.lookup_class(&name));
        match class {
            Some(class) => found.push(class),
            None => warnings.push(ConfigWarning::UnknownType {
                key,
                name: name.clone(),
            }),
        }
    }
    found
}

fn resolve_methods<'g>(
    graph: &'g ClassGraph<'g>,
    key: &'static str,
    names: &[String],
    warnings: &mut Vec<ConfigWarning>,
) -> Vec<&'g MethodData<'g>> {
    let mut found = vec![];
    for name in names {
        let method = MemberRef::parse(name)
            .ok()
            .and_then(|method| graph.lookup_method(&method));
        match method {
            Some(method) => found.push(method),
            None => warnings.push(ConfigWarning::UnknownMethod {
                key,
                name: name.clone(),
            }),
        }
    }
    found
}
