//! Decide whether it is safe to use a type, method, or field
//!
//! A symbol is safe to use when optimizing code in some store, with some minimum API level, if
//! everything it drags in is resolvable at run time. Types directly in the platform API surface
//! for the minimum API level are fine. Otherwise the defining store must be visible, and all super
//! types, interfaces, array element types, declaring types, parameter types, return types, and
//! field types must themselves be fine.

use crate::api::{ApiLevel, ApiSurface};
use crate::dex::{ClassData, ClassId, FieldData, FieldId, FieldType, MethodData, MethodId};
use crate::store::{StoreIdx, StoreVisibility};

mod cache;

pub use cache::*;

/// Number of verdicts memoized so far, per kind of symbol
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
pub struct CacheStats {
    pub types: usize,
    pub methods: usize,
    pub fields: usize,
}

/// Checks if it's safe to use a type/method/field in the context of a particular store and
/// minimum API level
///
/// All methods are thread-safe. Verdicts are memoized for the lifetime of the checker, so one
/// checker should be shared by everything operating in the same context.
pub struct RefChecker<'a> {
    xstores: &'a dyn StoreVisibility,
    store_idx: StoreIdx,
    min_sdk: ApiLevel,
    min_sdk_api: &'a dyn ApiSurface,

    type_cache: VerdictCache<ClassId>,
    method_cache: VerdictCache<MethodId>,
    field_cache: VerdictCache<FieldId>,
}

impl<'a> RefChecker<'a> {
    pub fn new(
        xstores: &'a dyn StoreVisibility,
        store_idx: StoreIdx,
        min_sdk: ApiLevel,
        min_sdk_api: &'a dyn ApiSurface,
    ) -> RefChecker<'a> {
        log::debug!(
            "New reference checker for store {} at min SDK {}",
            store_idx,
            min_sdk
        );
        RefChecker {
            xstores,
            store_idx,
            min_sdk,
            min_sdk_api,
            type_cache: VerdictCache::new(),
            method_cache: VerdictCache::new(),
            field_cache: VerdictCache::new(),
        }
    }

    pub fn store_idx(&self) -> StoreIdx {
        self.store_idx
    }

    pub fn min_sdk(&self) -> ApiLevel {
        self.min_sdk
    }

    pub fn cache_stats(&self) -> CacheStats {
        CacheStats {
            types: self.type_cache.len(),
            methods: self.method_cache.len(),
            fields: self.field_cache.len(),
        }
    }

    /// Is the type safe to use?
    ///
    /// Primitives always are, and arrays are whenever their element type is.
    pub fn check_type(&self, typ: &FieldType<&ClassData<'_>>) -> bool {
        match typ.element_class() {
            None => true,
            Some(class) => self.check_class(class),
        }
    }

    /// Is the class or interface safe to use?
    pub fn check_class(&self, class: &ClassData<'_>) -> bool {
        if let Some(verdict) = self.type_cache.get(&class.id) {
            return verdict;
        }
        let verdict = self.check_class_internal(class);
        self.type_cache.put(class.id, verdict);
        verdict
    }

    /// Is the method safe to use?
    pub fn check_method(&self, method: &MethodData<'_>) -> bool {
        if let Some(verdict) = self.method_cache.get(&method.id) {
            return verdict;
        }
        let verdict = self.check_method_internal(method);
        self.method_cache.put(method.id, verdict);
        verdict
    }

    /// Is the field safe to use?
    pub fn check_field(&self, field: &FieldData<'_>) -> bool {
        if let Some(verdict) = self.field_cache.get(&field.id) {
            return verdict;
        }
        let verdict = self.check_field_internal(field);
        self.field_cache.put(field.id, verdict);
        verdict
    }

    fn check_class_internal(&self, class: &ClassData<'_>) -> bool {
        if self.min_sdk_api.has_type(&class.name, self.min_sdk) {
            return true;
        }

        let defining_store = match self.xstores.store_of(class.id) {
            Some(defining_store) => defining_store,
            None => {
                log::trace!(
                    "{:?} ({:?}) is in no store and not in the API surface at {}",
                    class,
                    class.kind,
                    self.min_sdk
                );
                return false;
            }
        };
        if !self.xstores.is_reachable(self.store_idx, defining_store) {
            log::trace!(
                "{:?} is in store {}, which store {} can't see",
                class,
                defining_store,
                self.store_idx
            );
            return false;
        }

        // Note: super types are recursively checked through the cache
        if let Some(superclass) = class.superclass {
            if !self.check_class(superclass) {
                return false;
            }
        }
        class
            .interfaces
            .iter()
            .all(|interface| self.check_class(interface))
    }

    fn check_method_internal(&self, method: &MethodData<'_>) -> bool {
        if !self.check_class(method.class) {
            return false;
        }
        if !method.class.is_defined() && !self.min_sdk_api.has_method(method, self.min_sdk) {
            log::trace!("{:?} is not in the API surface at {}", method, self.min_sdk);
            return false;
        }
        method
            .descriptor
            .types()
            .all(|typ| self.check_type(typ))
    }

    fn check_field_internal(&self, field: &FieldData<'_>) -> bool {
        if !self.check_class(field.class) {
            return false;
        }
        if !field.class.is_defined() && !self.min_sdk_api.has_field(field, self.min_sdk) {
            log::trace!("{:?} is not in the API surface at {}", field, self.min_sdk);
            return false;
        }
        self.check_type(&field.descriptor)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::api::ApiLevelsDatabase;
    use crate::dex::{
        BinaryName, ClassAccessFlags, ClassGraph, ClassGraphArenas, ClassKind, FieldAccessFlags,
        MethodAccessFlags, MethodDescriptor, Name, ParseDescriptor, UnqualifiedName,
    };
    use crate::testing::{defined, external};
    use std::collections::{HashMap, HashSet};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Store layout given class by class, counting lookups
    #[derive(Default)]
    struct FakeStores {
        stores: HashMap<ClassId, StoreIdx>,
        edges: HashSet<(StoreIdx, StoreIdx)>,
        lookups: AtomicUsize,
    }

    impl FakeStores {
        fn put(&mut self, class: &ClassData<'_>, store: StoreIdx) {
            self.stores.insert(class.id, store);
        }

        fn lookups(&self) -> usize {
            self.lookups.load(Ordering::SeqCst)
        }
    }

    impl StoreVisibility for FakeStores {
        fn store_of(&self, class: ClassId) -> Option<StoreIdx> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            self.stores.get(&class).copied()
        }

        fn is_reachable(&self, from: StoreIdx, to: StoreIdx) -> bool {
            from == to || self.edges.contains(&(from, to))
        }
    }

    /// Platform types with the level they were introduced in, counting queries
    #[derive(Default)]
    struct FakeSurface {
        types: HashMap<BinaryName, u32>,
        queries: AtomicUsize,
    }

    impl FakeSurface {
        fn with(types: &[(&str, u32)]) -> FakeSurface {
            FakeSurface {
                types: types
                    .iter()
                    .map(|(name, level)| (name_of(name), *level))
                    .collect(),
                queries: AtomicUsize::new(0),
            }
        }

        fn queries(&self) -> usize {
            self.queries.load(Ordering::SeqCst)
        }
    }

    impl ApiSurface for FakeSurface {
        fn has_type(&self, name: &BinaryName, level: ApiLevel) -> bool {
            self.queries.fetch_add(1, Ordering::SeqCst);
            self.types
                .get(name)
                .map_or(false, |introduced| *introduced <= level.0)
        }
    }

    fn name_of(name: &str) -> BinaryName {
        BinaryName::from_string(name.to_owned()).unwrap()
    }

    fn unqualified(name: &str) -> UnqualifiedName {
        UnqualifiedName::from_string(name.to_owned()).unwrap()
    }

    #[test]
    fn platform_types_skip_store_lookups() {
        let arenas = ClassGraphArenas::new();
        let graph = ClassGraph::new(&arenas);
        let object = external(&graph, "java/lang/Object", None);
        let string = external(&graph, "java/lang/String", Some(object));

        let stores = FakeStores::default();
        let surface = FakeSurface::with(&[("java/lang/Object", 1), ("java/lang/String", 1)]);
        let checker = RefChecker::new(&stores, 0, ApiLevel(21), &surface);

        assert!(checker.check_class(string));
        assert!(checker.check_type(&FieldType::object(object)));
        assert_eq!(stores.lookups(), 0);
    }

    #[test]
    fn primitives_and_arrays() {
        let arenas = ClassGraphArenas::new();
        let graph = ClassGraph::new(&arenas);
        let hidden = defined(&graph, "b/Hidden", None);
        let shown = defined(&graph, "a/Shown", None);

        let mut stores = FakeStores::default();
        stores.put(hidden, 2);
        stores.put(shown, 0);
        let surface = FakeSurface::default();
        let checker = RefChecker::new(&stores, 0, ApiLevel(21), &surface);

        assert!(checker.check_type(&FieldType::int()));
        assert!(checker.check_type(&FieldType::array(FieldType::array(FieldType::long()))));
        assert!(checker.check_type(&FieldType::array(FieldType::object(shown))));
        assert!(!checker.check_type(&FieldType::array(FieldType::object(hidden))));
        assert!(!checker.check_type(&FieldType::array(FieldType::array(
            FieldType::object(hidden)
        ))));
    }

    #[test]
    fn hierarchies_must_be_visible_all_the_way_up() {
        let arenas = ClassGraphArenas::new();
        let graph = ClassGraph::new(&arenas);
        let object = external(&graph, "java/lang/Object", None);
        let base = defined(&graph, "a/Base", Some(object));
        let listener = graph
            .add_class(
                ClassKind::Defined,
                name_of("c/Listener"),
                None,
                vec![],
                ClassAccessFlags::PUBLIC | ClassAccessFlags::INTERFACE,
            )
            .unwrap();
        let derived = graph
            .add_class(
                ClassKind::Defined,
                name_of("b/Derived"),
                Some(base),
                vec![listener],
                ClassAccessFlags::PUBLIC,
            )
            .unwrap();

        let mut stores = FakeStores::default();
        stores.put(base, 0);
        stores.put(derived, 1);
        stores.put(listener, 2);
        stores.edges.insert((1, 0));
        let surface = FakeSurface::with(&[("java/lang/Object", 1)]);

        let checker = RefChecker::new(&stores, 1, ApiLevel(21), &surface);
        assert!(checker.check_class(base));
        assert!(!checker.check_class(listener));
        assert!(!checker.check_class(derived));

        // Base's own store can't see Derived's
        let checker = RefChecker::new(&stores, 0, ApiLevel(21), &surface);
        assert!(checker.check_class(base));
        assert!(!checker.check_class(derived));

        stores.edges.insert((1, 2));
        let checker = RefChecker::new(&stores, 1, ApiLevel(21), &surface);
        assert!(checker.check_class(derived));
    }

    #[test]
    fn methods_need_every_type_in_their_signature() {
        let arenas = ClassGraphArenas::new();
        let graph = ClassGraph::new(&arenas);
        let object = external(&graph, "java/lang/Object", None);
        let here = defined(&graph, "a/Here", Some(object));
        let there = defined(&graph, "b/There", Some(object));

        let mut stores = FakeStores::default();
        stores.put(here, 0);
        stores.put(there, 1);
        let surface = FakeSurface::with(&[("java/lang/Object", 1)]);
        let checker = RefChecker::new(&stores, 0, ApiLevel(21), &surface);

        let method = |class, parameters, return_type| {
            graph.add_method(
                class,
                unqualified("m"),
                MethodDescriptor {
                    parameters,
                    return_type,
                },
                MethodAccessFlags::PUBLIC,
            )
        };
        let only_primitives = method(here, vec![FieldType::int(), FieldType::boolean()], None);
        let returns_there = method(here, vec![], Some(FieldType::object(there)));
        let takes_there = method(
            here,
            vec![FieldType::int(), FieldType::array(FieldType::object(there))],
            Some(FieldType::object(object)),
        );
        let declared_there = method(there, vec![], None);

        assert!(checker.check_method(only_primitives));
        assert!(!checker.check_method(returns_there));
        assert!(!checker.check_method(takes_there));
        assert!(!checker.check_method(declared_there));
    }

    #[test]
    fn fields_need_their_class_and_type() {
        let arenas = ClassGraphArenas::new();
        let graph = ClassGraph::new(&arenas);
        let object = external(&graph, "java/lang/Object", None);
        let here = defined(&graph, "a/Here", Some(object));
        let there = defined(&graph, "b/There", Some(object));

        let mut stores = FakeStores::default();
        stores.put(here, 0);
        stores.put(there, 1);
        let surface = FakeSurface::with(&[("java/lang/Object", 1)]);
        let checker = RefChecker::new(&stores, 0, ApiLevel(21), &surface);

        let field = |class, name: &str, typ| {
            graph.add_field(class, unqualified(name), typ, FieldAccessFlags::PUBLIC)
        };
        assert!(checker.check_field(field(here, "count", FieldType::int())));
        assert!(checker.check_field(field(here, "self", FieldType::object(here))));
        assert!(!checker.check_field(field(here, "other", FieldType::object(there))));
        assert!(!checker.check_field(field(there, "count", FieldType::int())));
    }

    #[test]
    fn verdicts_are_memoized() {
        let arenas = ClassGraphArenas::new();
        let graph = ClassGraph::new(&arenas);
        let object = external(&graph, "java/lang/Object", None);
        let base = defined(&graph, "a/Base", Some(object));
        let derived = defined(&graph, "a/Derived", Some(base));
        let run = graph.add_method(
            derived,
            unqualified("run"),
            MethodDescriptor {
                parameters: vec![FieldType::object(base)],
                return_type: None,
            },
            MethodAccessFlags::PUBLIC,
        );

        let mut stores = FakeStores::default();
        stores.put(base, 0);
        stores.put(derived, 0);
        let surface = FakeSurface::with(&[("java/lang/Object", 1)]);
        let checker = RefChecker::new(&stores, 0, ApiLevel(21), &surface);

        assert!(checker.check_method(run));
        let lookups = stores.lookups();
        let queries = surface.queries();
        assert_eq!(lookups, 2);
        assert_eq!(queries, 3);
        assert_eq!(
            checker.cache_stats(),
            CacheStats {
                types: 3,
                methods: 1,
                fields: 0,
            }
        );

        for _ in 0..10 {
            assert!(checker.check_method(run));
            assert!(checker.check_class(derived));
            assert!(checker.check_type(&FieldType::object(base)));
        }
        assert_eq!(stores.lookups(), lookups);
        assert_eq!(surface.queries(), queries);
    }

    #[test]
    fn contexts_do_not_share_verdicts() {
        let arenas = ClassGraphArenas::new();
        let graph = ClassGraph::new(&arenas);
        let channel = external(&graph, "android/app/NotificationChannel", None);

        let stores = FakeStores::default();
        let surface = FakeSurface::with(&[("android/app/NotificationChannel", 26)]);
        let old_devices = RefChecker::new(&stores, 0, ApiLevel(21), &surface);
        let new_devices = RefChecker::new(&stores, 0, ApiLevel(26), &surface);

        assert!(!old_devices.check_class(channel));
        assert!(new_devices.check_class(channel));
        assert!(!old_devices.check_class(channel));
        assert_eq!(old_devices.cache_stats().types, 1);
        assert_eq!(new_devices.cache_stats().types, 1);
        assert_eq!(old_devices.min_sdk(), ApiLevel(21));
        assert_eq!(new_devices.store_idx(), 0);
    }

    #[test]
    fn absent_symbols_are_invalid() {
        let arenas = ClassGraphArenas::new();
        let graph = ClassGraph::new(&arenas);
        let object = external(&graph, "java/lang/Object", None);
        let missing = graph.class_ref(&name_of("a/Missing"));
        let newer = external(&graph, "android/app/Newer", Some(object));
        let orphan = defined(&graph, "a/Orphan", Some(object));
        let child = defined(&graph, "a/Child", Some(missing));

        let mut stores = FakeStores::default();
        stores.put(child, 0);
        let surface = FakeSurface::with(&[("java/lang/Object", 1), ("android/app/Newer", 30)]);
        let checker = RefChecker::new(&stores, 0, ApiLevel(21), &surface);

        assert!(!checker.check_class(missing));
        assert!(!checker.check_class(newer));
        assert!(!checker.check_class(orphan));
        assert!(!checker.check_class(child));
        assert!(!checker.check_type(&FieldType::array(FieldType::object(missing))));
    }

    #[test]
    fn library_members_must_be_on_the_surface() {
        let arenas = ClassGraphArenas::new();
        let graph = ClassGraph::new(&arenas);
        let object = external(&graph, "java/lang/Object", None);
        let app = defined(&graph, "a/App", Some(object));
        let method = |class, name: &str, descriptor: &str| {
            let descriptor = MethodDescriptor::<BinaryName>::parse(descriptor)
                .unwrap()
                .try_map(|name| Ok::<_, ()>(graph.class_ref(name)))
                .unwrap();
            graph.add_method(class, unqualified(name), descriptor, MethodAccessFlags::PUBLIC)
        };
        let hash_code = method(object, "hashCode", "()I");
        let wait = method(object, "wait", "(J)V");
        let app_hash_code = method(app, "hashCode", "()I");
        let klass = graph.add_field(
            object,
            unqualified("shadow$_klass_"),
            FieldType::object(graph.class_ref(&BinaryName::CLASS)),
            FieldAccessFlags::PRIVATE,
        );

        let mut stores = FakeStores::default();
        stores.put(app, 0);
        let db = ApiLevelsDatabase::parse_str(
            "T Ljava/lang/Object; 1\n\
             T Ljava/lang/Class; 1\n\
             M Ljava/lang/Object;.hashCode:()I 1\n\
             F Ljava/lang/Object;.shadow$_klass_:Ljava/lang/Class; 24\n",
        )
        .unwrap();

        let checker = RefChecker::new(&stores, 0, ApiLevel(21), &db);
        assert!(checker.check_method(hash_code));
        assert!(!checker.check_method(wait));
        assert!(checker.check_method(app_hash_code));
        assert!(!checker.check_field(klass));

        let checker = RefChecker::new(&stores, 0, ApiLevel(24), &db);
        assert!(checker.check_field(klass));

        // Type-only surfaces accept any member of a platform type
        let types_only = ApiLevelsDatabase::from_types(vec![BinaryName::OBJECT]);
        let checker = RefChecker::new(&stores, 0, ApiLevel(21), &types_only);
        assert!(checker.check_method(wait));
    }
}
