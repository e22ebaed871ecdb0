use std::borrow::Cow;
use std::fmt;

/// Name of a method or field (a dex `MemberName`)
///
/// Either a simple name or one of the two initializer names, `<init>` and `<clinit>`.
#[derive(Clone, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct UnqualifiedName(Cow<'static, str>);

/// Name of a class or interface: simple names joined by `/` (eg. `java/lang/Object`)
///
/// The descriptor form (`Ljava/lang/Object;`) is produced by `RenderDescriptor`.
#[derive(Clone, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct BinaryName(Cow<'static, str>);

pub trait Name: Sized {
    /// Check if a string would be a valid name
    fn check_valid(name: impl AsRef<str>) -> Result<(), String>;

    /// Underlying string
    fn as_cow(&self) -> &Cow<'static, str>;

    fn as_str(&self) -> &str {
        self.as_cow().as_ref()
    }

    /// Try to construct a name from a string
    fn from_string(name: String) -> Result<Self, String>;
}

/// Can the character appear in a dex `SimpleName`?
///
/// See <https://source.android.com/docs/core/runtime/dex-format#simplename>
fn is_simple_name_char(c: char) -> bool {
    matches!(c,
        'A'..='Z' | 'a'..='z' | '0'..='9' | ' ' | '$' | '-' | '_'
        | '\u{a0}'..='\u{200a}'
        | '\u{2010}'..='\u{2027}'
        | '\u{202f}'
        | '\u{2030}'..='\u{d7ff}'
        | '\u{e000}'..='\u{ffef}'
        | '\u{10000}'..='\u{10ffff}')
}

fn check_simple_name(what: &str, name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err(format!("{} '{}' has an empty part", what, name));
    }
    match name.chars().find(|c| !is_simple_name_char(*c)) {
        Some(c) => Err(format!("{} '{}' contains illegal character {:?}", what, name, c)),
        None => Ok(()),
    }
}

macro_rules! name_type {
    ($name:ident) => {
        impl Name for $name {
            fn check_valid(name: impl AsRef<str>) -> Result<(), String> {
                $name::check(name.as_ref())
            }

            fn as_cow(&self) -> &Cow<'static, str> {
                &self.0
            }

            fn from_string(name: String) -> Result<Self, String> {
                $name::check(&name)?;
                Ok($name(Cow::Owned(name)))
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                self.0.as_ref()
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

name_type!(UnqualifiedName);
name_type!(BinaryName);

impl UnqualifiedName {
    const fn name(value: &'static str) -> UnqualifiedName {
        UnqualifiedName(Cow::Borrowed(value))
    }

    fn check(name: &str) -> Result<(), String> {
        if name == Self::INIT.as_str() || name == Self::CLINIT.as_str() {
            Ok(())
        } else {
            check_simple_name("Member name", name)
        }
    }

    /// Is this a constructor or static initializer name?
    pub fn is_initializer(&self) -> bool {
        *self == Self::INIT || *self == Self::CLINIT
    }

    pub const INIT: Self = Self::name("<init>");
    pub const CLINIT: Self = Self::name("<clinit>");

    pub const EQUALS: Self = Self::name("equals");
    pub const HASHCODE: Self = Self::name("hashCode");
    pub const TOSTRING: Self = Self::name("toString");
}

impl BinaryName {
    const fn name(value: &'static str) -> BinaryName {
        BinaryName(Cow::Borrowed(value))
    }

    fn check(name: &str) -> Result<(), String> {
        name.split('/')
            .try_for_each(|part| check_simple_name("Class name", part))
    }

    pub const CLASS: Self = Self::name("java/lang/Class");
    pub const OBJECT: Self = Self::name("java/lang/Object");
    pub const STRING: Self = Self::name("java/lang/String");
}

#[cfg(test)]
mod test {
    use super::*;

    fn binary(name: &str) -> Result<BinaryName, String> {
        BinaryName::from_string(name.to_owned())
    }

    fn member(name: &str) -> Result<UnqualifiedName, String> {
        UnqualifiedName::from_string(name.to_owned())
    }

    #[test]
    fn binary_names() {
        assert!(binary("com/foo/Bar").is_ok());
        assert!(binary("Bar").is_ok());
        assert!(binary("com/foo/Bar$Inner").is_ok());
        assert!(binary("").is_err());
        assert!(binary("com//Bar").is_err());
        assert!(binary("com/foo;/Bar").is_err());
        assert!(binary("com/foo/<init>").is_err());
        assert!(binary("com.foo.Bar").is_err());
    }

    #[test]
    fn member_names() {
        assert!(member("run").is_ok());
        assert!(member("shadow$_klass_").is_ok());
        assert!(member("access$000").is_ok());
        assert!(member("caf\u{e9}").is_ok());
        assert!(member("a.b").is_err());
        assert!(member("x:I").is_err());
        assert!(member("").is_err());
    }

    #[test]
    fn only_initializers_have_angle_brackets() {
        assert_eq!(member("<init>"), Ok(UnqualifiedName::INIT));
        assert!(member("<clinit>").unwrap().is_initializer());
        assert!(!UnqualifiedName::HASHCODE.is_initializer());
        assert!(member("foo<bar>").is_err());
        assert!(member("<foo>").is_err());
        assert!(member("<init").is_err());
    }
}
