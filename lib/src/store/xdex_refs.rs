use super::DexStore;
use crate::dex::{ClassData, ClassId, MethodData, RenderDescriptor};
use crate::Error;
use std::collections::HashMap;

/// Cross-dex reference index
///
/// Dex files are numbered consecutively across all stores, starting with the primary dex of the
/// root store.
pub struct XDexRefs {
    dexes: HashMap<ClassId, usize>,
    num_dexes: usize,
}

impl XDexRefs {
    pub fn new(stores: &[DexStore<'_>]) -> XDexRefs {
        let mut dexes = HashMap::new();
        let mut dex_nr = 0;
        for store in stores {
            for dex in store.get_dexen() {
                for class in dex {
                    dexes.insert(class.id, dex_nr);
                }
                dex_nr += 1;
            }
        }
        XDexRefs {
            dexes,
            num_dexes: dex_nr,
        }
    }

    /// Dex file containing the class
    pub fn get_dex_idx(&self, class: &ClassData<'_>) -> Result<usize, Error> {
        self.dexes
            .get(&class.id)
            .copied()
            .ok_or_else(|| Error::MissingClass(class.render()))
    }

    pub fn num_dexes(&self) -> usize {
        self.num_dexes
    }

    pub fn is_in_primary_dex(&self, method: &MethodData<'_>) -> Result<bool, Error> {
        Ok(self.get_dex_idx(method.class)? == 0)
    }

    /// Are the caller and callee declared in different dex files?
    pub fn cross_dex_ref(
        &self,
        caller: &MethodData<'_>,
        callee: &MethodData<'_>,
    ) -> Result<bool, Error> {
        Ok(self.get_dex_idx(callee.class)? != self.get_dex_idx(caller.class)?)
    }

    /// Does some class between the overriding method's class and the overridden method's class
    /// (walking up superclasses) live in a different dex than the overriding method's class?
    pub fn cross_dex_ref_override(
        &self,
        overridden: &MethodData<'_>,
        overriding: &MethodData<'_>,
    ) -> Result<bool, Error> {
        let mut class: &ClassData<'_> = overriding.class;
        let idx = self.get_dex_idx(class)?;
        loop {
            class = class.superclass.ok_or_else(|| {
                Error::MissingClass(format!(
                    "superclass of {} (looking for {})",
                    class.render(),
                    overridden.class.render()
                ))
            })?;
            if idx != self.get_dex_idx(class)? {
                return Ok(true);
            }
            if class.id == overridden.class.id {
                return Ok(false);
            }
        }
    }
}
