use bitflags::bitflags;

bitflags! {
    /// Access flags on classes
    ///
    /// [0]: https://source.android.com/docs/core/runtime/dex-format#access-flags
    pub struct ClassAccessFlags: u32 {
        const PUBLIC = 0x0001;
        const PRIVATE = 0x0002;
        const PROTECTED = 0x0004;
        const STATIC = 0x0008;
        const FINAL = 0x0010;
        const INTERFACE = 0x0200;
        const ABSTRACT = 0x0400;
        const SYNTHETIC = 0x1000;
        const ANNOTATION = 0x2000;
        const ENUM = 0x4000;
    }
}

bitflags! {
    /// Access flags on methods
    ///
    /// [0]: https://source.android.com/docs/core/runtime/dex-format#access-flags
    pub struct MethodAccessFlags: u32 {
        const PUBLIC = 0x0001;
        const PRIVATE = 0x0002;
        const PROTECTED = 0x0004;
        const STATIC = 0x0008;
        const FINAL = 0x0010;
        const SYNCHRONIZED = 0x0020;
        const BRIDGE = 0x0040;
        const VARARGS = 0x0080;
        const NATIVE = 0x0100;
        const ABSTRACT = 0x0400;
        const STRICT = 0x0800;
        const SYNTHETIC = 0x1000;
        const CONSTRUCTOR = 0x10000;
        const DECLARED_SYNCHRONIZED = 0x20000;
    }
}

bitflags! {
    /// Access flags on fields
    ///
    /// [0]: https://source.android.com/docs/core/runtime/dex-format#access-flags
    pub struct FieldAccessFlags: u32 {
        const PUBLIC = 0x0001;
        const PRIVATE = 0x0002;
        const PROTECTED = 0x0004;
        const STATIC = 0x0008;
        const FINAL = 0x0010;
        const VOLATILE = 0x0040;
        const TRANSIENT = 0x0080;
        const SYNTHETIC = 0x1000;
        const ENUM = 0x4000;
    }
}

/// Access flags which can be spelled out as lowercase keywords (eg. `public`, `interface`)
pub trait AccessKeywords: Sized {
    /// Flag corresponding to one keyword
    fn from_keyword(keyword: &str) -> Option<Self>;

    /// Combine all of the keywords into one set of flags
    fn from_keywords<S: AsRef<str>>(keywords: &[S]) -> Result<Self, String>;
}

macro_rules! access_keywords {
    ($flags:ident { $($keyword:literal => $flag:ident,)* }) => {
        impl AccessKeywords for $flags {
            fn from_keyword(keyword: &str) -> Option<Self> {
                match keyword {
                    $($keyword => Some($flags::$flag),)*
                    _ => None,
                }
            }

            fn from_keywords<S: AsRef<str>>(keywords: &[S]) -> Result<Self, String> {
                let mut flags = $flags::empty();
                for keyword in keywords {
                    let keyword = keyword.as_ref();
                    match Self::from_keyword(keyword) {
                        Some(flag) => flags |= flag,
                        None => {
                            return Err(format!(
                                "Unknown {} keyword '{}'",
                                stringify!($flags),
                                keyword
                            ))
                        }
                    }
                }
                Ok(flags)
            }
        }
    };
}

access_keywords!(ClassAccessFlags {
    "public" => PUBLIC,
    "private" => PRIVATE,
    "protected" => PROTECTED,
    "static" => STATIC,
    "final" => FINAL,
    "interface" => INTERFACE,
    "abstract" => ABSTRACT,
    "synthetic" => SYNTHETIC,
    "annotation" => ANNOTATION,
    "enum" => ENUM,
});

access_keywords!(MethodAccessFlags {
    "public" => PUBLIC,
    "private" => PRIVATE,
    "protected" => PROTECTED,
    "static" => STATIC,
    "final" => FINAL,
    "synchronized" => SYNCHRONIZED,
    "bridge" => BRIDGE,
    "varargs" => VARARGS,
    "native" => NATIVE,
    "abstract" => ABSTRACT,
    "strict" => STRICT,
    "synthetic" => SYNTHETIC,
    "constructor" => CONSTRUCTOR,
});

access_keywords!(FieldAccessFlags {
    "public" => PUBLIC,
    "private" => PRIVATE,
    "protected" => PROTECTED,
    "static" => STATIC,
    "final" => FINAL,
    "volatile" => VOLATILE,
    "transient" => TRANSIENT,
    "synthetic" => SYNTHETIC,
    "enum" => ENUM,
});

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn keywords() {
        let flags = ClassAccessFlags::from_keywords(&["public", "interface", "abstract"]).unwrap();
        assert_eq!(
            flags,
            ClassAccessFlags::PUBLIC | ClassAccessFlags::INTERFACE | ClassAccessFlags::ABSTRACT
        );
        assert!(MethodAccessFlags::from_keywords(&["public", "volatile"]).is_err());
        assert_eq!(
            FieldAccessFlags::from_keywords::<&str>(&[]).unwrap(),
            FieldAccessFlags::empty()
        );
    }
}
