//! Archive and item metadata.
//!
//! Engines expose metadata through a fixed catalog of [`PropertyId`]s. Each
//! lookup returns a [`RawProperty`] tagged with the engine's native type, or
//! [`RawProperty::Unsupported`] when the handle has no such property.
//! [`enumerate`] walks the catalog in order and converts every supported
//! value into a [`Property`].

use std::fmt;

use crate::archive_path::ItemPath;
use crate::timestamp::filetime_to_unix_secs;

/// The property catalog, in enumeration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum PropertyId {
    /// Compressed size.
    PackSize,
    /// File attributes.
    Attrib,
    /// Creation time.
    CTime,
    /// Last access time.
    ATime,
    /// Last modification time.
    MTime,
    /// Solid compression.
    Solid,
    /// Encrypted content.
    Encrypted,
    /// Owner name.
    User,
    /// Group name.
    Group,
    /// Comment text.
    Comment,
    /// Physical archive size.
    PhySize,
    /// Size of the archive headers.
    HeadersSize,
    /// Content checksum.
    Checksum,
    /// Format characteristics.
    Characts,
    /// Application that created the archive.
    CreatorApp,
    /// Total size of the volume.
    TotalSize,
    /// Free space of the volume.
    FreeSpace,
    /// Cluster size of the volume.
    ClusterSize,
    /// Volume label.
    VolumeName,
    /// Item path.
    Path,
    /// Whether the item is a directory.
    IsDir,
    /// Uncompressed size.
    Size,
}

impl PropertyId {
    /// Every identifier, in catalog order.
    pub const ALL: [PropertyId; 22] = [
        Self::PackSize,
        Self::Attrib,
        Self::CTime,
        Self::ATime,
        Self::MTime,
        Self::Solid,
        Self::Encrypted,
        Self::User,
        Self::Group,
        Self::Comment,
        Self::PhySize,
        Self::HeadersSize,
        Self::Checksum,
        Self::Characts,
        Self::CreatorApp,
        Self::TotalSize,
        Self::FreeSpace,
        Self::ClusterSize,
        Self::VolumeName,
        Self::Path,
        Self::IsDir,
        Self::Size,
    ];

    /// Catalog name of the property.
    pub fn name(self) -> &'static str {
        match self {
            Self::PackSize => "packsize",
            Self::Attrib => "attrib",
            Self::CTime => "ctime",
            Self::ATime => "atime",
            Self::MTime => "mtime",
            Self::Solid => "solid",
            Self::Encrypted => "encrypted",
            Self::User => "user",
            Self::Group => "group",
            Self::Comment => "comment",
            Self::PhySize => "physize",
            Self::HeadersSize => "headerssize",
            Self::Checksum => "checksum",
            Self::Characts => "characts",
            Self::CreatorApp => "creatorapp",
            Self::TotalSize => "totalsize",
            Self::FreeSpace => "freespace",
            Self::ClusterSize => "clustersize",
            Self::VolumeName => "volumename",
            Self::Path => "path",
            Self::IsDir => "isdir",
            Self::Size => "size",
        }
    }

    /// Position in the catalog.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Looks up an identifier by catalog name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|id| id.name() == name)
    }
}

impl fmt::Display for PropertyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A property value as the engine reports it.
///
/// When a backend could report a property in more than one representation
/// it picks the first of UInt64, Bool, WideString, FileTime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawProperty {
    /// Unsigned integer.
    UInt64(u64),
    /// Boolean flag.
    Bool(bool),
    /// UTF-16 text.
    WideString(Vec<u16>),
    /// FILETIME ticks.
    FileTime(u64),
    /// The handle does not have this property.
    Unsupported,
}

impl RawProperty {
    /// Encodes `text` as a wide string.
    pub fn text(text: &str) -> Self {
        Self::WideString(text.encode_utf16().collect())
    }
}

/// Handles that answer property lookups.
pub trait PropertySource {
    /// Looks up one property.
    fn property(&self, id: PropertyId) -> RawProperty;
}

/// A converted property value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyValue {
    /// Unsigned integer.
    UInt(u64),
    /// Boolean flag.
    Bool(bool),
    /// UTF-8 text.
    Text(String),
    /// Unix seconds.
    Time(i64),
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UInt(v) => write!(f, "{v}"),
            Self::Bool(v) => f.write_str(if *v { "1" } else { "0" }),
            Self::Text(v) => f.write_str(v),
            Self::Time(v) => write!(f, "{v}"),
        }
    }
}

/// One named property value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Property {
    /// Which property.
    pub id: PropertyId,
    /// Converted value.
    pub value: PropertyValue,
}

impl Property {
    /// Catalog name of the property.
    pub fn name(&self) -> &'static str {
        self.id.name()
    }
}

/// Converts one raw value.
///
/// Returns `None` for [`RawProperty::Unsupported`]. Path text is normalized.
pub fn convert(id: PropertyId, raw: RawProperty) -> Option<PropertyValue> {
    let value = match raw {
        RawProperty::UInt64(v) => PropertyValue::UInt(v),
        RawProperty::Bool(v) => PropertyValue::Bool(v),
        RawProperty::WideString(wide) if id == PropertyId::Path => {
            PropertyValue::Text(ItemPath::from_wide(&wide).into_string())
        }
        RawProperty::WideString(wide) => PropertyValue::Text(String::from_utf16_lossy(&wide)),
        RawProperty::FileTime(ticks) => PropertyValue::Time(filetime_to_unix_secs(ticks)),
        RawProperty::Unsupported => return None,
    };
    Some(value)
}

/// Walks the catalog and returns every supported property in order.
pub fn enumerate<S: PropertySource + ?Sized>(source: &S) -> Vec<Property> {
    PropertyId::ALL
        .into_iter()
        .filter_map(|id| {
            let value = convert(id, source.property(id));
            if value.is_none() {
                log::trace!("property {id} not supported by handle");
            }
            value.map(|value| Property { id, value })
        })
        .collect()
}

/// Finds a property in an enumerated record.
pub fn find(record: &[Property], id: PropertyId) -> Option<&PropertyValue> {
    record.iter().find(|p| p.id == id).map(|p| &p.value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct Fixture(HashMap<PropertyId, RawProperty>);

    impl PropertySource for Fixture {
        fn property(&self, id: PropertyId) -> RawProperty {
            self.0.get(&id).cloned().unwrap_or(RawProperty::Unsupported)
        }
    }

    #[test]
    fn test_catalog_order_and_names() {
        let names: Vec<_> = PropertyId::ALL.iter().map(|id| id.name()).collect();
        assert_eq!(
            names,
            [
                "packsize",
                "attrib",
                "ctime",
                "atime",
                "mtime",
                "solid",
                "encrypted",
                "user",
                "group",
                "comment",
                "physize",
                "headerssize",
                "checksum",
                "characts",
                "creatorapp",
                "totalsize",
                "freespace",
                "clustersize",
                "volumename",
                "path",
                "isdir",
                "size",
            ]
        );
        for (i, id) in PropertyId::ALL.iter().enumerate() {
            assert_eq!(id.index(), i);
            assert_eq!(PropertyId::from_name(id.name()), Some(*id));
        }
    }

    #[test]
    fn test_enumerate_skips_unsupported_and_keeps_order() {
        let fixture = Fixture(HashMap::from([
            (PropertyId::Size, RawProperty::UInt64(42)),
            (PropertyId::IsDir, RawProperty::Bool(false)),
            (PropertyId::MTime, RawProperty::FileTime(116_444_736_000_000_000 + 50_000_000)),
            (PropertyId::Path, RawProperty::text("dir\\file.txt")),
        ]));

        let record = enumerate(&fixture);
        let names: Vec<_> = record.iter().map(Property::name).collect();
        assert_eq!(names, ["mtime", "path", "isdir", "size"]);
        assert_eq!(find(&record, PropertyId::MTime), Some(&PropertyValue::Time(5)));
        assert_eq!(
            find(&record, PropertyId::Path),
            Some(&PropertyValue::Text("dir/file.txt".into()))
        );
        assert_eq!(find(&record, PropertyId::Size), Some(&PropertyValue::UInt(42)));
        assert!(find(&record, PropertyId::Comment).is_none());
    }

    #[test]
    fn test_non_path_text_is_not_normalized() {
        let value = convert(PropertyId::Comment, RawProperty::text("a\\b")).unwrap();
        assert_eq!(value, PropertyValue::Text("a\\b".into()));
    }

    #[test]
    fn test_empty_source() {
        let fixture = Fixture(HashMap::new());
        assert!(enumerate(&fixture).is_empty());
    }

    #[test]
    fn test_value_display() {
        assert_eq!(PropertyValue::Bool(true).to_string(), "1");
        assert_eq!(PropertyValue::Time(-1).to_string(), "-1");
        assert_eq!(PropertyValue::UInt(7).to_string(), "7");
    }
}
