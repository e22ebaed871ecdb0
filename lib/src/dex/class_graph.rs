use super::{
    BinaryName, ClassAccessFlags, FieldAccessFlags, FieldType, MemberKind, MemberRef,
    MethodAccessFlags, MethodDescriptor, RenderDescriptor, UnqualifiedName,
};
use crate::Error;
use elsa::map::FrozenMap;
use std::cell::Cell;
use std::collections::HashSet;
use std::fmt;
use std::fmt::Debug;
use typed_arena::Arena;

pub struct ClassGraphArenas<'g> {
    class_arena: Arena<ClassData<'g>>,
    method_arena: Arena<MethodData<'g>>,
    field_arena: Arena<FieldData<'g>>,
}

impl<'g> ClassGraphArenas<'g> {
    pub fn new() -> Self {
        ClassGraphArenas {
            class_arena: Arena::new(),
            method_arena: Arena::new(),
            field_arena: Arena::new(),
        }
    }
}

impl<'g> Default for ClassGraphArenas<'g> {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle for a class, unique within one class graph
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct ClassId(pub u32);

/// Handle for a method, unique within one class graph
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct MethodId(pub u32);

/// Handle for a field, unique within one class graph
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct FieldId(pub u32);

/// Where the definition of a class comes from
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum ClassKind {
    /// Defined in the program being optimized (so it belongs to some store)
    Defined,

    /// Declared by a library the program is compiled against (eg. the platform)
    External,

    /// Only ever referenced: there is no definition anywhere
    Unresolved,
}

/// Universe of all the classes and members in a program
///
/// Symbols are allocated once in the arenas and never mutated or freed afterwards. Since super
/// types must already be in the graph when a class is added, the class hierarchy is acyclic by
/// construction.
pub struct ClassGraph<'g> {
    arenas: &'g ClassGraphArenas<'g>,
    classes: FrozenMap<&'g BinaryName, &'g ClassData<'g>>,
    methods: FrozenMap<String, &'g MethodData<'g>>,
    fields: FrozenMap<String, &'g FieldData<'g>>,
    next_class_id: Cell<u32>,
    next_method_id: Cell<u32>,
    next_field_id: Cell<u32>,
}

impl<'g> ClassGraph<'g> {
    /// New empty graph
    pub fn new(arenas: &'g ClassGraphArenas<'g>) -> Self {
        ClassGraph {
            arenas,
            classes: FrozenMap::new(),
            methods: FrozenMap::new(),
            fields: FrozenMap::new(),
            next_class_id: Cell::new(0),
            next_method_id: Cell::new(0),
            next_field_id: Cell::new(0),
        }
    }

    /// Number of classes (of any kind) in the graph
    pub fn num_classes(&self) -> usize {
        self.next_class_id.get() as usize
    }

    pub fn lookup_class(&'g self, name: &BinaryName) -> Option<&'g ClassData<'g>> {
        self.classes.get(name)
    }

    pub fn lookup_method(&'g self, method: &MemberRef) -> Option<&'g MethodData<'g>> {
        match method.kind {
            MemberKind::Method(_) => self.methods.get(&method.render()),
            MemberKind::Field(_) => None,
        }
    }

    pub fn lookup_field(&'g self, field: &MemberRef) -> Option<&'g FieldData<'g>> {
        match field.kind {
            MemberKind::Field(_) => self.fields.get(&field.render()),
            MemberKind::Method(_) => None,
        }
    }

    /// Add a new class to the class graph
    ///
    /// Unresolved placeholders should be made with `class_ref` instead.
    pub fn add_class(
        &self,
        kind: ClassKind,
        name: BinaryName,
        superclass: Option<&'g ClassData<'g>>,
        interfaces: Vec<&'g ClassData<'g>>,
        access_flags: ClassAccessFlags,
    ) -> Result<&'g ClassData<'g>, Error> {
        if self.classes.get(&name).is_some() {
            return Err(Error::DuplicateClass(name.render()));
        }
        Ok(self.insert_class(ClassData {
            id: ClassId(self.next_class_id.get()),
            name,
            superclass,
            interfaces,
            access_flags,
            kind,
        }))
    }

    fn insert_class(&self, data: ClassData<'g>) -> &'g ClassData<'g> {
        self.next_class_id.set(data.id.0 + 1);
        let data = &*self.arenas.class_arena.alloc(data);
        self.classes.insert(&data.name, data);
        data
    }

    /// Find a class by name, making an unresolved placeholder for it if there is no such class
    pub fn class_ref(&'g self, name: &BinaryName) -> &'g ClassData<'g> {
        if let Some(class) = self.lookup_class(name) {
            return class;
        }
        log::trace!("Class {:?} has no definition", name);
        self.insert_class(ClassData {
            id: ClassId(self.next_class_id.get()),
            name: name.clone(),
            superclass: None,
            interfaces: vec![],
            access_flags: ClassAccessFlags::empty(),
            kind: ClassKind::Unresolved,
        })
    }

    /// Resolve every class mentioned in a type (see `class_ref`)
    pub fn resolve_type(&'g self, typ: &FieldType<BinaryName>) -> FieldType<&'g ClassData<'g>> {
        typ.map(|name| self.class_ref(name))
    }

    /// Add a method to the class graph
    ///
    /// If the class already has a method with the same name and descriptor, that is returned.
    pub fn add_method(
        &'g self,
        class: &'g ClassData<'g>,
        name: UnqualifiedName,
        descriptor: MethodDescriptor<&'g ClassData<'g>>,
        access_flags: MethodAccessFlags,
    ) -> &'g MethodData<'g> {
        let data = MethodData {
            id: MethodId(self.next_method_id.get()),
            class,
            name,
            descriptor,
            access_flags,
        };
        let key = data.render();
        if let Some(existing) = self.methods.get(&key) {
            return existing;
        }
        self.next_method_id.set(data.id.0 + 1);
        let data = &*self.arenas.method_arena.alloc(data);
        self.methods.insert(key, data);
        data
    }

    /// Add a field to the class graph
    ///
    /// If the class already has a field with the same name and type, that is returned.
    pub fn add_field(
        &'g self,
        class: &'g ClassData<'g>,
        name: UnqualifiedName,
        descriptor: FieldType<&'g ClassData<'g>>,
        access_flags: FieldAccessFlags,
    ) -> &'g FieldData<'g> {
        let data = FieldData {
            id: FieldId(self.next_field_id.get()),
            class,
            name,
            descriptor,
            access_flags,
        };
        let key = data.render();
        if let Some(existing) = self.fields.get(&key) {
            return existing;
        }
        self.next_field_id.set(data.id.0 + 1);
        let data = &*self.arenas.field_arena.alloc(data);
        self.fields.insert(key, data);
        data
    }
}

pub struct ClassData<'g> {
    pub id: ClassId,

    /// Name of the class
    pub name: BinaryName,

    /// Superclass is only ever missing for `java/lang/Object` and unresolved classes
    pub superclass: Option<&'g ClassData<'g>>,

    /// Interfaces implemented (or super-interfaces)
    pub interfaces: Vec<&'g ClassData<'g>>,

    pub access_flags: ClassAccessFlags,

    pub kind: ClassKind,
}

impl<'g> ClassData<'g> {
    pub fn is_interface(&self) -> bool {
        self.access_flags.contains(ClassAccessFlags::INTERFACE)
    }

    pub fn is_defined(&self) -> bool {
        self.kind == ClassKind::Defined
    }

    /// Classes that the runtime loads when this class is loaded
    ///
    /// This is the class itself followed by all of its super classes and super interfaces that are
    /// defined in the program. Classes outside the program (and their super types) are left out.
    pub fn gather_load_types(&'g self) -> Vec<&'g ClassData<'g>> {
        let mut load_types = vec![];
        let mut to_visit: Vec<&'g ClassData<'g>> = vec![self];
        let mut seen: HashSet<ClassId> = HashSet::new();

        while let Some(class) = to_visit.pop() {
            if !class.is_defined() || !seen.insert(class.id) {
                continue;
            }
            load_types.push(class);
            to_visit.extend(class.interfaces.iter().rev());
            to_visit.extend(class.superclass);
        }

        load_types
    }
}

impl<'g> PartialEq for ClassData<'g> {
    fn eq(&self, other: &ClassData<'g>) -> bool {
        self.id == other.id
    }
}

impl<'g> Eq for ClassData<'g> {}

impl<'g> RenderDescriptor for ClassData<'g> {
    fn render_to(&self, write_to: &mut String) {
        self.name.render_to(write_to)
    }
}

impl<'a, 'g> RenderDescriptor for &'a ClassData<'g> {
    fn render_to(&self, write_to: &mut String) {
        self.name.render_to(write_to)
    }
}

impl<'g> Debug for ClassData<'g> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name.render())
    }
}

#[derive(PartialEq, Eq)]
pub struct MethodData<'g> {
    pub id: MethodId,

    /// Class
    pub class: &'g ClassData<'g>,

    /// Name of the method
    pub name: UnqualifiedName,

    /// Type of the method
    pub descriptor: MethodDescriptor<&'g ClassData<'g>>,

    pub access_flags: MethodAccessFlags,
}

impl<'g> MethodData<'g> {
    pub fn is_static(&self) -> bool {
        self.access_flags.contains(MethodAccessFlags::STATIC)
    }

    /// Textual reference to this method
    pub fn member_ref(&self) -> MemberRef {
        MemberRef {
            class: self.class.name.clone(),
            name: self.name.clone(),
            kind: MemberKind::Method(MethodDescriptor {
                parameters: self
                    .descriptor
                    .parameters
                    .iter()
                    .map(|param| param.map(|class| class.name.clone()))
                    .collect(),
                return_type: self
                    .descriptor
                    .return_type
                    .map(|ret| ret.map(|class| class.name.clone())),
            }),
        }
    }
}

impl<'g> RenderDescriptor for MethodData<'g> {
    fn render_to(&self, write_to: &mut String) {
        self.class.render_to(write_to);
        write_to.push('.');
        write_to.push_str(self.name.as_ref());
        write_to.push(':');
        self.descriptor.render_to(write_to);
    }
}

impl<'g> Debug for MethodData<'g> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

#[derive(PartialEq, Eq)]
pub struct FieldData<'g> {
    pub id: FieldId,

    /// Class
    ///
    /// Note: this is a pointer back to the class (so don't derive `Debug`)
    pub class: &'g ClassData<'g>,

    /// Name of the field
    pub name: UnqualifiedName,

    /// Type of the field
    pub descriptor: FieldType<&'g ClassData<'g>>,

    pub access_flags: FieldAccessFlags,
}

impl<'g> FieldData<'g> {
    pub fn is_static(&self) -> bool {
        self.access_flags.contains(FieldAccessFlags::STATIC)
    }

    /// Textual reference to this field
    pub fn member_ref(&self) -> MemberRef {
        MemberRef {
            class: self.class.name.clone(),
            name: self.name.clone(),
            kind: MemberKind::Field(self.descriptor.map(|class| class.name.clone())),
        }
    }
}

impl<'g> RenderDescriptor for FieldData<'g> {
    fn render_to(&self, write_to: &mut String) {
        self.class.render_to(write_to);
        write_to.push('.');
        write_to.push_str(self.name.as_ref());
        write_to.push(':');
        self.descriptor.render_to(write_to);
    }
}

impl<'g> Debug for FieldData<'g> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}
