//! Shorthands for building small class graphs in unit tests

use crate::dex::{BinaryName, ClassAccessFlags, ClassData, ClassGraph, ClassKind, Name};

fn add<'g>(
    graph: &'g ClassGraph<'g>,
    kind: ClassKind,
    name: &str,
    superclass: Option<&'g ClassData<'g>>,
) -> &'g ClassData<'g> {
    let name = BinaryName::from_string(name.to_owned()).unwrap();
    graph
        .add_class(kind, name, superclass, vec![], ClassAccessFlags::PUBLIC)
        .unwrap()
}

pub fn defined<'g>(
    graph: &'g ClassGraph<'g>,
    name: &str,
    superclass: Option<&'g ClassData<'g>>,
) -> &'g ClassData<'g> {
    add(graph, ClassKind::Defined, name, superclass)
}

pub fn external<'g>(
    graph: &'g ClassGraph<'g>,
    name: &str,
    superclass: Option<&'g ClassData<'g>>,
) -> &'g ClassData<'g> {
    add(graph, ClassKind::External, name, superclass)
}
