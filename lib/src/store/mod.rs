//! Stores: independently deployable groups of dex files
//!
//! The program being optimized is split into stores. The root store (named `classes`) is always
//! installed; every other store declares which stores it `requires`. Code in one store may only
//! refer to classes defined in stores it can see.

use crate::dex::{ClassData, ClassId};
use crate::Error;
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::Path;

mod xdex_refs;
mod xstore_refs;

pub use xdex_refs::*;
pub use xstore_refs::*;

/// Name of the store holding the primary dex
pub const ROOT_STORE_NAME: &str = "classes";

/// Store metadata, as written to `<store>.json` files
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct DexMetadata {
    /// Store name (empty if the file doesn't say)
    #[serde(default)]
    pub id: String,

    /// Names of the stores which must be installed for this one to work
    #[serde(default, rename = "requires")]
    pub dependencies: Vec<String>,

    #[serde(default)]
    pub files: Vec<String>,
}

impl DexMetadata {
    /// Read store metadata from a JSON file
    pub fn parse<P: AsRef<Path>>(path: P) -> Result<DexMetadata, Error> {
        let contents = fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    pub fn from_json_str(json: &str) -> Result<DexMetadata, Error> {
        Ok(serde_json::from_str(json)?)
    }
}

/// One store: its metadata along with the classes in each of its dex files
pub struct DexStore<'g> {
    metadata: DexMetadata,
    dexen: Vec<Vec<&'g ClassData<'g>>>,
}

impl<'g> DexStore<'g> {
    pub fn new(name: impl Into<String>) -> DexStore<'g> {
        DexStore {
            metadata: DexMetadata {
                id: name.into(),
                ..DexMetadata::default()
            },
            dexen: vec![],
        }
    }

    pub fn from_metadata(metadata: DexMetadata) -> DexStore<'g> {
        DexStore {
            metadata,
            dexen: vec![],
        }
    }

    pub fn get_name(&self) -> &str {
        &self.metadata.id
    }

    pub fn is_root_store(&self) -> bool {
        self.metadata.id == ROOT_STORE_NAME
    }

    pub fn get_metadata(&self) -> &DexMetadata {
        &self.metadata
    }

    pub fn get_dexen(&self) -> &[Vec<&'g ClassData<'g>>] {
        &self.dexen
    }

    pub fn get_dependencies(&self) -> &[String] {
        &self.metadata.dependencies
    }

    pub fn add_dependency(&mut self, dependency: impl Into<String>) {
        self.metadata.dependencies.push(dependency.into());
    }

    /// Append a dex file with these classes
    pub fn add_classes(&mut self, classes: Vec<&'g ClassData<'g>>) {
        self.dexen.push(classes);
    }

    /// Remove classes from whichever dex files they are in (empty dex files are kept)
    pub fn remove_classes(&mut self, classes: &[&'g ClassData<'g>]) {
        let to_remove: HashSet<ClassId> = classes.iter().map(|cls| cls.id).collect();
        for dex in &mut self.dexen {
            dex.retain(|cls| !to_remove.contains(&cls.id));
        }
    }

    pub fn num_classes(&self) -> usize {
        self.dexen.iter().map(Vec::len).sum()
    }
}

/// Move every class of every store into the primary dex of the root store, dropping all other
/// dex files and stores
pub fn squash_into_one_dex(stores: &mut Vec<DexStore<'_>>) {
    if stores.is_empty() {
        return;
    }
    let other_stores: Vec<DexStore<'_>> = stores.drain(1..).collect();
    let root_store = &mut stores[0];
    if root_store.dexen.is_empty() {
        if other_stores.iter().all(|store| store.num_classes() == 0) {
            return;
        }
        root_store.dexen.push(vec![]);
    }

    let mut secondary_dexen = root_store.dexen.split_off(1);
    let primary_dex = &mut root_store.dexen[0];
    for dex in &mut secondary_dexen {
        primary_dex.append(dex);
    }
    for other_store in other_stores {
        for mut dex in other_store.dexen {
            primary_dex.append(&mut dex);
        }
    }
}
