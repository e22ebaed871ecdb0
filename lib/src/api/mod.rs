//! Platform API surface: which symbols are guaranteed to exist on every device running at least
//! some API level

use crate::dex::{
    BinaryName, FieldData, MemberKind, MemberRef, MethodData, ParseDescriptor, RenderDescriptor,
};
use crate::Error;
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;

/// Platform version number
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Default)]
pub struct ApiLevel(pub u32);

impl fmt::Display for ApiLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Symbols guaranteed present on devices
///
/// At the very least, types must be classified. Surfaces that also know about individual
/// methods and fields override `has_method` and `has_field`, which otherwise accept any member
/// of a present type.
pub trait ApiSurface: Sync {
    /// Is the type present on every device at or above this API level?
    fn has_type(&self, name: &BinaryName, level: ApiLevel) -> bool;

    /// Is the method present on every device at or above this API level?
    fn has_method(&self, _method: &MethodData<'_>, _level: ApiLevel) -> bool {
        true
    }

    /// Is the field present on every device at or above this API level?
    fn has_field(&self, _field: &FieldData<'_>, _level: ApiLevel) -> bool {
        true
    }
}

/// Range of API levels in which a symbol exists
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct Availability {
    pub introduced: ApiLevel,
    pub removed: Option<ApiLevel>,
}

impl Availability {
    /// Will a device running `level` or any later version have the symbol?
    pub fn guaranteed_at(&self, level: ApiLevel) -> bool {
        self.introduced <= level && self.removed.is_none()
    }
}

/// API levels listing, read from a line-oriented text file
///
/// Each line has a kind (`T` for types, `M` for methods, `F` for fields), a symbol, the level
/// the symbol was introduced in, and optionally the level it was removed in:
///
/// ```text
/// # comment
/// T Ljava/lang/Object; 1
/// T Landroid/app/Fragment; 11 28
/// M Ljava/lang/Object;.hashCode:()I 1
/// F Landroid/os/Build;.SERIAL:Ljava/lang/String; 9
/// ```
///
/// Methods are only tracked if there is at least one `M` line, and fields only if there is at
/// least one `F` line. Untracked members of present types are assumed present.
#[derive(Default)]
pub struct ApiLevelsDatabase {
    types: HashMap<BinaryName, Availability>,
    methods: HashMap<String, Availability>,
    fields: HashMap<String, Availability>,
}

impl ApiLevelsDatabase {
    /// Surface which only has types, all of them available from the very first API level
    pub fn from_types(types: impl IntoIterator<Item = BinaryName>) -> ApiLevelsDatabase {
        let always = Availability {
            introduced: ApiLevel(0),
            removed: None,
        };
        ApiLevelsDatabase {
            types: types.into_iter().map(|name| (name, always)).collect(),
            methods: HashMap::new(),
            fields: HashMap::new(),
        }
    }

    pub fn parse<P: AsRef<Path>>(path: P) -> Result<ApiLevelsDatabase, Error> {
        let path = path.as_ref();
        log::debug!("Reading API levels from {}", path.display());
        let contents = fs::read_to_string(path)?;
        Self::parse_str(&contents)
    }

    pub fn parse_str(contents: &str) -> Result<ApiLevelsDatabase, Error> {
        let mut database = ApiLevelsDatabase::default();

        for (line_idx, line) in contents.lines().enumerate() {
            let line_no = line_idx + 1;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let bad = |message: String| Error::BadApiLevels {
                line: line_no,
                message,
            };

            let parts: Vec<&str> = line.split_whitespace().collect();
            let (kind, symbol, introduced, removed) = match parts.as_slice() {
                [kind, symbol, introduced] => (*kind, *symbol, *introduced, None),
                [kind, symbol, introduced, removed] => (*kind, *symbol, *introduced, Some(*removed)),
                _ => return Err(bad(format!("expected 3 or 4 columns, found {}", parts.len()))),
            };
            let parse_level = |level: &str| {
                level
                    .parse::<u32>()
                    .map(ApiLevel)
                    .map_err(|err| bad(format!("bad API level '{}': {}", level, err)))
            };
            let availability = Availability {
                introduced: parse_level(introduced)?,
                removed: removed.map(parse_level).transpose()?,
            };
            if let Some(removed) = availability.removed {
                if removed <= availability.introduced {
                    return Err(bad(format!(
                        "'{}' removed in {} before being introduced in {}",
                        symbol, removed, availability.introduced
                    )));
                }
            }

            match kind {
                "T" => {
                    let name = BinaryName::parse(symbol)
                        .map_err(|err| bad(format!("bad type '{}': {}", symbol, err)))?;
                    database.types.insert(name, availability);
                }
                "M" | "F" => {
                    let member = MemberRef::parse(symbol)
                        .map_err(|err| bad(format!("bad member '{}': {}", symbol, err)))?;
                    match (&member.kind, kind) {
                        (MemberKind::Method(_), "M") => {
                            database.methods.insert(member.render(), availability);
                        }
                        (MemberKind::Field(_), "F") => {
                            database.fields.insert(member.render(), availability);
                        }
                        _ => {
                            return Err(bad(format!("'{}' is not a {} entry", symbol, kind)));
                        }
                    }
                }
                other => return Err(bad(format!("unknown entry kind '{}'", other))),
            }
        }

        log::debug!(
            "Loaded API levels for {} types, {} methods, {} fields",
            database.types.len(),
            database.methods.len(),
            database.fields.len()
        );
        Ok(database)
    }

    /// Does the listing have entries for individual methods?
    pub fn tracks_methods(&self) -> bool {
        !self.methods.is_empty()
    }

    /// Does the listing have entries for individual fields?
    pub fn tracks_fields(&self) -> bool {
        !self.fields.is_empty()
    }

    pub fn type_availability(&self, name: &BinaryName) -> Option<Availability> {
        self.types.get(name).copied()
    }

    /// Availability of a method or field
    pub fn member_availability(&self, member: &MemberRef) -> Option<Availability> {
        let key = member.render();
        match member.kind {
            MemberKind::Method(_) => self.methods.get(&key).copied(),
            MemberKind::Field(_) => self.fields.get(&key).copied(),
        }
    }
}

impl ApiSurface for ApiLevelsDatabase {
    fn has_type(&self, name: &BinaryName, level: ApiLevel) -> bool {
        self.types
            .get(name)
            .map_or(false, |availability| availability.guaranteed_at(level))
    }

    fn has_method(&self, method: &MethodData<'_>, level: ApiLevel) -> bool {
        if !self.tracks_methods() {
            return true;
        }
        self.methods
            .get(&method.render())
            .map_or(false, |availability| availability.guaranteed_at(level))
    }

    fn has_field(&self, field: &FieldData<'_>, level: ApiLevel) -> bool {
        if !self.tracks_fields() {
            return true;
        }
        self.fields
            .get(&field.render())
            .map_or(false, |availability| availability.guaranteed_at(level))
    }
}
