mod common;

use common::ImageBuilder;
use just_jimage::{Archive, Header, JImageError};

const OBJECT: &[u8] = &[0xca, 0xfe, 0xba, 0xbe, 0, 0, 0, 61];
const MODULE_INFO: &[u8] = &[0xca, 0xfe, 0xba, 0xbe, 0, 0, 0, 53];

fn java_base() -> Vec<u8> {
    ImageBuilder::new()
        .resource("/java.base/java/lang/Object.class", OBJECT)
        .resource("/java.base/java/lang/String.class", b"string")
        .resource("/java.base/module-info.class", MODULE_INFO)
        .resource("/java.base/java/lang/uniName.dat", b"data")
        .build()
}

fn with_archive(buf: &[u8], f: impl FnOnce(Archive)) {
    common::init();
    f(Archive::parse(buf).unwrap());
}

#[test]
fn test_header_display() {
    let header = Header {
        version: (1, 0),
        flags: 0,
        resource_count: 2,
        table_length: 2,
        attributes_size: 20,
        strings_size: 40,
    };

    assert_eq!(
        format!("{}", header),
        " Major Version:  1\n\
         \x20Minor Version:  0\n\
         \x20Flags:          0\n\
         \x20Resource Count: 2\n\
         \x20Table Length:   2\n\
         \x20Offsets Size:   8\n\
         \x20Redirects Size: 8\n\
         \x20Locations Size: 20\n\
         \x20Strings Size:   40\n\
         \x20Index Size:     104\n"
    );
}

#[test]
fn test_parse_archive_header() {
    let buf = java_base();
    with_archive(&buf, |archive| {
        let header = archive.header();
        assert_eq!(header.version, (1, 0));
        assert_eq!(header.resource_count, 4);
        assert_eq!(header.table_length, 4);
        assert_eq!(archive.len(), 4);

        let payload = OBJECT.len() + 6 + MODULE_INFO.len() + 4;
        assert_eq!(header.index_size() + payload, buf.len());
    });
}

#[test]
fn test_read_resource() {
    with_archive(&java_base(), |archive| {
        let object_class = archive
            .by_name("/java.base/java/lang/Object.class")
            .unwrap();

        assert_eq!("java.base", object_class.module());
        assert_eq!("class", object_class.extension());
        assert_eq!("java/lang", object_class.parent());
        assert_eq!("Object", object_class.base());
        assert_eq!(
            "/java.base/java/lang/Object.class",
            object_class.full_name()
        );
        assert!(object_class.is_class());
        assert!(!object_class.is_compressed());
        assert_eq!(object_class.bytes().unwrap(), OBJECT);
    });
}

#[test]
fn test_resource_without_parent() {
    with_archive(&java_base(), |archive| {
        let module_info = archive.by_name("/java.base/module-info.class").unwrap();

        assert_eq!("java.base", module_info.module());
        assert_eq!("class", module_info.extension());
        assert_eq!("", module_info.parent());
        assert_eq!("module-info", module_info.base());
        assert_eq!("/java.base/module-info.class", module_info.full_name());
        assert_eq!(module_info.bytes().unwrap(), MODULE_INFO);
    });
}

#[test]
fn test_missing_resource() {
    with_archive(&java_base(), |archive| {
        assert!(archive.by_name("/java.base/java/lang/Nope.class").is_none());
        assert!(archive.by_name("/java.base/java/lang/Object").is_none());
        assert!(archive.by_name("/java.base/java/lang/Object.classy").is_none());
        assert!(archive.by_name("").is_none());
    });
}

#[test]
fn test_iterate_resources() {
    with_archive(&java_base(), |archive| {
        let mut names = archive
            .resources()
            .map(|r| r.map(|r| r.full_name()))
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        names.sort();

        assert_eq!(
            names,
            vec![
                "/java.base/java/lang/Object.class",
                "/java.base/java/lang/String.class",
                "/java.base/java/lang/uniName.dat",
                "/java.base/module-info.class",
            ]
        );

        let classes = archive
            .resources()
            .filter_map(Result::ok)
            .filter(|r| r.is_class())
            .count();
        assert_eq!(classes, 3);
    });
}

#[test]
fn test_every_name_is_found() {
    let mut builder = ImageBuilder::new();
    let names: Vec<String> = (0..64)
        .map(|i| format!("/m{}/p/q/C{}.class", i % 3, i))
        .collect();
    for (i, name) in names.iter().enumerate() {
        builder.resource(name, &[i as u8]);
    }
    let buf = builder.build();

    with_archive(&buf, |archive| {
        for (i, name) in names.iter().enumerate() {
            let resource = archive.by_name(name).unwrap();
            assert_eq!(&resource.full_name(), name);
            assert_eq!(resource.bytes().unwrap(), &[i as u8]);
        }
    });
}

#[test]
fn test_big_endian_image() {
    let buf = ImageBuilder::new()
        .big_endian()
        .resource("/java.base/java/lang/Object.class", OBJECT)
        .resource("/java.base/module-info.class", MODULE_INFO)
        .build();

    with_archive(&buf, |archive| {
        assert_eq!(archive.header().version, (1, 0));
        let object_class = archive
            .by_name("/java.base/java/lang/Object.class")
            .unwrap();
        assert_eq!(object_class.bytes().unwrap(), OBJECT);
    });
}

#[test]
fn test_compressed_resource() {
    let buf = ImageBuilder::new()
        .compressed("/java.base/java/lang/Object.class", b"zipped")
        .build();

    with_archive(&buf, |archive| {
        let object_class = archive
            .by_name("/java.base/java/lang/Object.class")
            .unwrap();
        assert!(object_class.is_compressed());
        assert_eq!(
            object_class.bytes(),
            Err(JImageError::CompressedResource(
                "/java.base/java/lang/Object.class".to_owned()
            ))
        );
    });
}

#[test]
fn test_truncated_payload() {
    let mut buf = java_base();
    buf.truncate(buf.len() - 2);

    with_archive(&buf, |archive| {
        let resource = archive.by_name("/java.base/java/lang/uniName.dat").unwrap();
        assert!(matches!(
            resource.bytes(),
            Err(JImageError::ResourceOutOfBounds { size: 4, .. })
        ));
    });
}

#[test]
fn test_truncated_index() {
    let buf = java_base();
    let header = Archive::parse(&buf).unwrap().header().clone();

    let err = Archive::parse(&buf[..header.index_size() - 1]).unwrap_err();
    assert!(matches!(err, JImageError::Truncated { what: "strings", .. }));
}

#[test]
fn test_invalid_magic() {
    assert_eq!(
        Archive::parse(&[0xca, 0xfe, 0xba, 0xbe, 0, 0, 0, 0]).unwrap_err(),
        JImageError::InvalidMagicIdentifier(0xCAFEBABE)
    );
}
