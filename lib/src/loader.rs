//! Populate a class graph and its stores from a JSON symbol manifest
//!
//! ```json
//! {
//!   "stores": [
//!     {
//!       "id": "classes",
//!       "requires": [],
//!       "dexes": [[
//!         {
//!           "name": "Lcom/example/Main;",
//!           "super": "Ljava/lang/Object;",
//!           "interfaces": ["Ljava/lang/Runnable;"],
//!           "access": ["public"],
//!           "methods": [{ "name": "run", "descriptor": "()V", "access": ["public"] }],
//!           "fields": [{ "name": "count", "type": "I", "access": ["private", "static"] }]
//!         }
//!       ]]
//!     }
//!   ],
//!   "external": [{ "name": "Ljava/lang/Object;" }]
//! }
//! ```
//!
//! Classes can be listed in any order. Names which are referenced but never declared become
//! unresolved classes.

use crate::dex::{
    AccessKeywords, BinaryName, ClassAccessFlags, ClassData, ClassGraph, ClassKind,
    FieldAccessFlags, FieldType, MethodAccessFlags, MethodDescriptor, Name, ParseDescriptor,
    RenderDescriptor, UnqualifiedName,
};
use crate::store::{DexStore, ROOT_STORE_NAME};
use crate::Error;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

#[derive(Debug, Default, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub stores: Vec<StoreManifest>,

    /// Library classes (not part of any store)
    #[serde(default)]
    pub external: Vec<ClassManifest>,
}

#[derive(Debug, Deserialize)]
pub struct StoreManifest {
    pub id: String,

    #[serde(default)]
    pub requires: Vec<String>,

    /// Classes in each dex file of the store
    #[serde(default)]
    pub dexes: Vec<Vec<ClassManifest>>,
}

#[derive(Debug, Deserialize)]
pub struct ClassManifest {
    /// Class descriptor, eg. `Lcom/example/Main;`
    pub name: String,

    #[serde(default, rename = "super")]
    pub superclass: Option<String>,

    #[serde(default)]
    pub interfaces: Vec<String>,

    #[serde(default)]
    pub access: Vec<String>,

    #[serde(default)]
    pub methods: Vec<MethodManifest>,

    #[serde(default)]
    pub fields: Vec<FieldManifest>,
}

#[derive(Debug, Deserialize)]
pub struct MethodManifest {
    pub name: String,
    pub descriptor: String,

    #[serde(default)]
    pub access: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct FieldManifest {
    pub name: String,

    #[serde(rename = "type")]
    pub field_type: String,

    #[serde(default)]
    pub access: Vec<String>,
}

impl Manifest {
    pub fn parse<P: AsRef<Path>>(path: P) -> Result<Manifest, Error> {
        let path = path.as_ref();
        log::debug!("Reading symbol manifest {}", path.display());
        let contents = fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    pub fn from_json_str(json: &str) -> Result<Manifest, Error> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Add every class in the manifest to the graph, returning the stores
///
/// If the manifest has no root store, an empty one is put first. Otherwise the root store is
/// moved to the front (other stores keep their relative order).
pub fn load_manifest<'g>(
    graph: &'g ClassGraph<'g>,
    manifest: &Manifest,
) -> Result<Vec<DexStore<'g>>, Error> {
    let mut linker = Linker {
        graph,
        declarations: HashMap::new(),
        in_progress: vec![],
    };

    // Gather declarations, in order
    let mut declared: Vec<(BinaryName, &ClassManifest)> = vec![];
    let stores_classes = manifest
        .stores
        .iter()
        .flat_map(|store| store.dexes.iter().flatten())
        .map(|class| (ClassKind::Defined, class));
    let external_classes = manifest
        .external
        .iter()
        .map(|class| (ClassKind::External, class));
    for (kind, class) in stores_classes.chain(external_classes) {
        let name = parse_class_name(&class.name)?;
        if linker.declarations.insert(name.clone(), (kind, class)).is_some() {
            return Err(Error::DuplicateClass(class.name.clone()));
        }
        declared.push((name, class));
    }

    // Classes, super types first
    for (name, _) in &declared {
        linker.link(name)?;
    }

    // Members
    for (name, class) in &declared {
        let class_data = linker.link(name)?;
        for method in &class.methods {
            let method_name = UnqualifiedName::from_string(method.name.clone())
                .map_err(Error::MalformedName)?;
            let descriptor = MethodDescriptor::<BinaryName>::parse(&method.descriptor)
                .map_err(|err| Error::bad_descriptor(&method.descriptor, err))?
                .try_map(|class_name| Ok::<_, Error>(graph.class_ref(class_name)))?;
            let access_flags =
                MethodAccessFlags::from_keywords(&method.access).map_err(Error::BadAccessFlags)?;
            graph.add_method(class_data, method_name, descriptor, access_flags);
        }
        for field in &class.fields {
            let field_name =
                UnqualifiedName::from_string(field.name.clone()).map_err(Error::MalformedName)?;
            let field_type = FieldType::<BinaryName>::parse(&field.field_type)
                .map_err(|err| Error::bad_descriptor(&field.field_type, err))?;
            let access_flags =
                FieldAccessFlags::from_keywords(&field.access).map_err(Error::BadAccessFlags)?;
            graph.add_field(
                class_data,
                field_name,
                graph.resolve_type(&field_type),
                access_flags,
            );
        }
    }

    // Stores
    let mut stores: Vec<DexStore<'g>> = vec![];
    for store_manifest in &manifest.stores {
        let mut store = DexStore::new(store_manifest.id.clone());
        for dependency in &store_manifest.requires {
            store.add_dependency(dependency.clone());
        }
        for dex in &store_manifest.dexes {
            let classes = dex
                .iter()
                .map(|class| linker.link(&parse_class_name(&class.name)?))
                .collect::<Result<Vec<_>, Error>>()?;
            store.add_classes(classes);
        }
        stores.push(store);
    }
    match stores.iter().position(DexStore::is_root_store) {
        Some(0) => (),
        Some(root_pos) => {
            let root = stores.remove(root_pos);
            stores.insert(0, root);
        }
        None => stores.insert(0, DexStore::new(ROOT_STORE_NAME)),
    }

    log::debug!(
        "Loaded {} classes into {} stores",
        graph.num_classes(),
        stores.len()
    );
    Ok(stores)
}

/// Read a manifest file and load it into the graph
pub fn load_manifest_file<'g, P: AsRef<Path>>(
    graph: &'g ClassGraph<'g>,
    path: P,
) -> Result<Vec<DexStore<'g>>, Error> {
    load_manifest(graph, &Manifest::parse(path)?)
}

fn parse_class_name(descriptor: &str) -> Result<BinaryName, Error> {
    BinaryName::parse(descriptor).map_err(|err| Error::bad_descriptor(descriptor, err))
}

/// Adds declared classes to the graph on demand, making sure super types get added first
struct Linker<'m, 'g> {
    graph: &'g ClassGraph<'g>,
    declarations: HashMap<BinaryName, (ClassKind, &'m ClassManifest)>,

    /// Classes whose super types are being linked
    in_progress: Vec<BinaryName>,
}

impl<'m, 'g> Linker<'m, 'g> {
    fn link(&mut self, name: &BinaryName) -> Result<&'g ClassData<'g>, Error> {
        if let Some(class) = self.graph.lookup_class(name) {
            return Ok(class);
        }
        let (kind, manifest) = match self.declarations.get(name) {
            Some(declaration) => *declaration,
            None => return Ok(self.graph.class_ref(name)),
        };
        if let Some(start) = self.in_progress.iter().position(|other| other == name) {
            let mut cycle: Vec<String> = self.in_progress[start..]
                .iter()
                .map(RenderDescriptor::render)
                .collect();
            cycle.push(name.render());
            return Err(Error::CyclicHierarchy(cycle));
        }

        self.in_progress.push(name.clone());
        let superclass = match &manifest.superclass {
            None => None,
            Some(superclass) => Some(self.link(&parse_class_name(superclass)?)?),
        };
        let interfaces = manifest
            .interfaces
            .iter()
            .map(|interface| self.link(&parse_class_name(interface)?))
            .collect::<Result<Vec<_>, Error>>()?;
        self.in_progress.pop();

        let access_flags =
            ClassAccessFlags::from_keywords(&manifest.access).map_err(Error::BadAccessFlags)?;
        self.graph
            .add_class(kind, name.clone(), superclass, interfaces, access_flags)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::dex::{ClassGraphArenas, MemberRef};

    const MANIFEST: &str = r#"{
        "stores": [
            {
                "id": "feature",
                "requires": ["classes"],
                "dexes": [[
                    {
                        "name": "Lf/Feature;",
                        "super": "La/Base;",
                        "interfaces": ["La/Listener;", "Lmissing/Iface;"],
                        "methods": [
                            { "name": "onEvent", "descriptor": "(La/Base;[I)Lf/Feature;" }
                        ],
                        "fields": [
                            { "name": "INSTANCE", "type": "Lf/Feature;", "access": ["static"] }
                        ]
                    }
                ]]
            },
            {
                "id": "classes",
                "dexes": [
                    [{ "name": "La/Base;", "super": "Ljava/lang/Object;", "access": ["public"] }],
                    [{ "name": "La/Listener;", "access": ["public", "interface", "abstract"] }]
                ]
            }
        ],
        "external": [{ "name": "Ljava/lang/Object;" }]
    }"#;

    #[test]
    fn loads_classes_members_and_stores() {
        let arenas = ClassGraphArenas::new();
        let graph = ClassGraph::new(&arenas);
        let manifest = Manifest::from_json_str(MANIFEST).unwrap();
        let stores = load_manifest(&graph, &manifest).unwrap();

        // Root store comes first
        let store_names: Vec<&str> = stores.iter().map(DexStore::get_name).collect();
        assert_eq!(store_names, vec!["classes", "feature"]);
        assert_eq!(stores[0].get_dexen().len(), 2);
        assert_eq!(stores[1].get_dependencies(), &[String::from("classes")]);

        let lookup = |name: &str| {
            graph
                .lookup_class(&BinaryName::from_string(name.to_owned()).unwrap())
                .unwrap()
        };
        let object = lookup("java/lang/Object");
        let base = lookup("a/Base");
        let listener = lookup("a/Listener");
        let feature = lookup("f/Feature");
        let missing = lookup("missing/Iface");

        assert_eq!(object.kind, ClassKind::External);
        assert_eq!(base.kind, ClassKind::Defined);
        assert_eq!(missing.kind, ClassKind::Unresolved);
        assert!(listener.is_interface());
        assert_eq!(base.superclass.map(|c| c.id), Some(object.id));
        assert_eq!(feature.superclass.map(|c| c.id), Some(base.id));
        let interfaces: Vec<_> = feature.interfaces.iter().map(|c| c.id).collect();
        assert_eq!(interfaces, vec![listener.id, missing.id]);

        let on_event = MemberRef::parse("Lf/Feature;.onEvent:(La/Base;[I)Lf/Feature;").unwrap();
        let on_event = graph.lookup_method(&on_event).unwrap();
        assert_eq!(on_event.class.id, feature.id);
        assert_eq!(on_event.descriptor.parameters.len(), 2);

        let instance = MemberRef::parse("Lf/Feature;.INSTANCE:Lf/Feature;").unwrap();
        assert!(graph.lookup_field(&instance).unwrap().is_static());
    }

    #[test]
    fn missing_root_store_is_added() {
        let arenas = ClassGraphArenas::new();
        let graph = ClassGraph::new(&arenas);
        let manifest = Manifest::from_json_str(r#"{"stores": [{"id": "lonely"}]}"#).unwrap();
        let stores = load_manifest(&graph, &manifest).unwrap();
        assert!(stores[0].is_root_store());
        assert_eq!(stores[1].get_name(), "lonely");
    }

    #[test]
    fn cyclic_hierarchies_are_rejected() {
        let arenas = ClassGraphArenas::new();
        let graph = ClassGraph::new(&arenas);
        let manifest = Manifest::from_json_str(
            r#"{"stores": [{"id": "classes", "dexes": [[
                {"name": "La/A;", "super": "La/B;"},
                {"name": "La/B;", "interfaces": ["La/C;"]},
                {"name": "La/C;", "super": "La/A;"}
            ]]}]}"#,
        )
        .unwrap();
        match load_manifest(&graph, &manifest) {
            Err(Error::CyclicHierarchy(cycle)) => {
                assert_eq!(cycle, vec!["La/A;", "La/B;", "La/C;", "La/A;"])
            }
            Err(other) => panic!("unexpected error {:?}", other),
            Ok(_) => panic!("cycle should have been detected"),
        }
    }

    #[test]
    fn bad_manifests() {
        let load = |json: &str| {
            let arenas = ClassGraphArenas::new();
            let graph = ClassGraph::new(&arenas);
            let manifest = Manifest::from_json_str(json).unwrap();
            load_manifest(&graph, &manifest).map(|stores| stores.len())
        };

        assert!(matches!(
            load(r#"{"external": [{"name": "La/A;"}, {"name": "La/A;"}]}"#),
            Err(Error::DuplicateClass(_))
        ));
        assert!(matches!(
            load(r#"{"external": [{"name": "a/A"}]}"#),
            Err(Error::BadDescriptor { .. })
        ));
        assert!(matches!(
            load(r#"{"external": [{"name": "La/A;", "access": ["sparkly"]}]}"#),
            Err(Error::BadAccessFlags(_))
        ));
        assert!(matches!(
            load(r#"{"external": [{"name": "La/A;", "methods": [{"name": "m", "descriptor": "(V"}]}]}"#),
            Err(Error::BadDescriptor { .. })
        ));
        assert!(Manifest::from_json_str(r#"{"stores": [{}]}"#).is_err());
    }
}
