use super::DexStore;
use crate::dex::{ClassData, ClassId, RenderDescriptor};
use crate::Error;
use fixedbitset::FixedBitSet;
use std::collections::HashMap;

/// Index of a store as seen by `XStoreRefs`
///
/// Index 0 is the primary dex of the root store. When the root store has secondary dexes, they
/// are all lumped into index 1. The other stores follow, in order.
pub type StoreIdx = usize;

/// Which store defines a class, and which stores can see each other
///
/// This is what the reference checker needs to know about the store layout. All queries must be
/// pure: the store layout is fixed while checking.
pub trait StoreVisibility: Sync {
    /// Store defining the class, if the class is defined in any store
    fn store_of(&self, class: ClassId) -> Option<StoreIdx>;

    /// Can code in store `from` refer to classes defined in store `to`?
    fn is_reachable(&self, from: StoreIdx, to: StoreIdx) -> bool;
}

/// Cross-store reference index
pub struct XStoreRefs {
    /// Store index of every class defined in some store
    class_stores: HashMap<ClassId, StoreIdx>,

    /// Name of the store behind each store index
    store_names: Vec<String>,

    /// Number of store indices taken by the root store (1 or 2)
    root_stores: usize,

    /// For each store index, the non-root store indices it transitively depends on
    dependencies: Vec<FixedBitSet>,
}

impl XStoreRefs {
    /// Index a list of stores, the first of which is taken to be the root store
    pub fn new(stores: &[DexStore<'_>]) -> Result<XStoreRefs, Error> {
        let mut index = XStoreRefs {
            class_stores: HashMap::new(),
            store_names: vec![],
            root_stores: 0,
            dependencies: vec![],
        };

        // Store index of each `DexStore` in `stores` (the root store has one or two)
        let mut indices_of_store: Vec<Vec<StoreIdx>> = vec![];

        for (store_pos, store) in stores.iter().enumerate() {
            let dex_groups: Vec<Vec<&Vec<&ClassData<'_>>>> = if store_pos == 0 {
                let dexen = store.get_dexen();
                let mut groups = vec![dexen.iter().take(1).collect::<Vec<_>>()];
                if dexen.len() > 1 {
                    groups.push(dexen.iter().skip(1).collect());
                }
                groups
            } else {
                vec![store.get_dexen().iter().collect()]
            };

            let mut indices = vec![];
            for dexen in dex_groups {
                let store_idx = index.store_names.len();
                index.store_names.push(store.get_name().to_owned());
                for class in dexen.into_iter().flatten() {
                    if !class.is_defined() {
                        return Err(Error::ClassNotInStore(class.render()));
                    }
                    if index.class_stores.insert(class.id, store_idx).is_some() {
                        return Err(Error::DuplicateClass(class.render()));
                    }
                }
                indices.push(store_idx);
            }
            if store_pos == 0 {
                index.root_stores = indices.len();
            }
            indices_of_store.push(indices);
        }

        // Resolve direct dependencies by name
        let mut store_by_name: HashMap<&str, usize> = HashMap::new();
        for (store_pos, store) in stores.iter().enumerate() {
            store_by_name.entry(store.get_name()).or_insert(store_pos);
        }
        let num_indices = index.store_names.len();
        let mut direct: Vec<FixedBitSet> = vec![FixedBitSet::with_capacity(num_indices); num_indices];
        for (store_pos, store) in stores.iter().enumerate() {
            for dependency in store.get_dependencies() {
                match store_by_name.get(dependency.as_str()) {
                    None => log::warn!(
                        "Store '{}' requires unknown store '{}'",
                        store.get_name(),
                        dependency
                    ),
                    Some(dep_pos) => {
                        for &from in &indices_of_store[store_pos] {
                            for &to in &indices_of_store[*dep_pos] {
                                direct[from].insert(to);
                            }
                        }
                    }
                }
            }
        }

        // Transitive closure, one depth-first walk per store index
        for from in 0..num_indices {
            let mut reachable = FixedBitSet::with_capacity(num_indices);
            let mut to_visit: Vec<StoreIdx> = direct[from].ones().collect();
            while let Some(store_idx) = to_visit.pop() {
                if reachable.put(store_idx) {
                    continue;
                }
                to_visit.extend(direct[store_idx].ones());
            }
            index.dependencies.push(reachable);
        }

        log::debug!(
            "Indexed {} classes across {} store indices ({} for the root store)",
            index.class_stores.len(),
            num_indices,
            index.root_stores
        );
        Ok(index)
    }

    /// Store index of the class, if it is defined in one of the stores
    pub fn get_store_idx(&self, class: &ClassData<'_>) -> Option<StoreIdx> {
        self.class_stores.get(&class.id).copied()
    }

    /// Name of the store behind a store index
    pub fn get_store_name(&self, store_idx: StoreIdx) -> Option<&str> {
        self.store_names.get(store_idx).map(String::as_str)
    }

    /// Store index from a store name (the primary dex index for the root store)
    pub fn get_store_idx_by_name(&self, name: &str) -> Option<StoreIdx> {
        self.store_names.iter().position(|store| store == name)
    }

    /// Number of store indices
    pub fn num_stores(&self) -> usize {
        self.store_names.len()
    }

    /// Number of store indices used by the root store
    pub fn root_stores(&self) -> usize {
        self.root_stores
    }

    pub fn is_in_root_store(&self, class: &ClassData<'_>) -> bool {
        matches!(self.get_store_idx(class), Some(idx) if idx < self.root_stores)
    }

    pub fn is_in_primary_dex(&self, class: &ClassData<'_>) -> bool {
        self.get_store_idx(class) == Some(0)
    }

    /// Is a reference from store `caller` to a class defined in store `callee` disallowed?
    pub fn illegal_ref_between_stores(&self, caller: StoreIdx, callee: StoreIdx) -> bool {
        !self.is_reachable(caller, callee)
    }

    /// Is a reference from store `caller` to the class disallowed?
    ///
    /// Only classes defined in the stores are ever illegal. Whether library classes are available
    /// is a question for the platform API surface.
    pub fn illegal_ref(&self, caller: StoreIdx, callee: &ClassData<'_>) -> bool {
        match self.get_store_idx(callee) {
            None => false,
            Some(callee) => self.illegal_ref_between_stores(caller, callee),
        }
    }

    /// Would loading the class from `location`'s store cause any illegal reference?
    pub fn illegal_ref_load_types<'g>(
        &self,
        location: &ClassData<'_>,
        class: &'g ClassData<'g>,
    ) -> Result<bool, Error> {
        let caller = self
            .get_store_idx(location)
            .ok_or_else(|| Error::MissingClass(location.render()))?;
        Ok(class
            .gather_load_types()
            .into_iter()
            .any(|load_type| self.illegal_ref(caller, load_type)))
    }
}

impl StoreVisibility for XStoreRefs {
    fn store_of(&self, class: ClassId) -> Option<StoreIdx> {
        self.class_stores.get(&class).copied()
    }

    fn is_reachable(&self, from: StoreIdx, to: StoreIdx) -> bool {
        if from >= self.store_names.len() || to >= self.store_names.len() {
            return false;
        }
        from == to || to < self.root_stores || self.dependencies[from].contains(to)
    }
}
