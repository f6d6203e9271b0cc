use std::rc::Rc;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use pretty_assertions::assert_eq;
use stblcore::prelude::*;

const ENGLISH: Locale = 0;
const FRENCH: Locale = 2;
const GERMAN: Locale = 3;
const ITALIAN: Locale = 8;

fn init_logging() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// Minimal length-prefixed container used to exercise the container seam
struct TestContainer;

impl ResourceContainer for TestContainer {
    fn build_buffer(&self, rows: &[StringRow]) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        buffer.write_u32::<LittleEndian>(rows.len() as u32)?;
        for row in rows {
            buffer.write_u32::<LittleEndian>(row.key)?;
            buffer.write_u16::<LittleEndian>(row.value.len() as u16)?;
            buffer.extend_from_slice(row.value.as_bytes());
        }
        Ok(buffer)
    }

    fn parse_buffer(&self, mut buffer: &[u8]) -> Result<Vec<StringRow>> {
        let count = buffer.read_u32::<LittleEndian>()?;
        let mut rows = Vec::new();
        for _ in 0..count {
            let key = buffer.read_u32::<LittleEndian>()?;
            let len = usize::from(buffer.read_u16::<LittleEndian>()?);
            let (text, rest) = buffer.split_at(len);
            rows.push(StringRow::new(key, String::from_utf8_lossy(text)));
            buffer = rest;
        }
        Ok(rows)
    }
}

#[test]
fn test_fallback_is_total_for_unknown_locales() {
    let mut stbl = LocalizedStringTable::new(ENGLISH, [FRENCH], []);
    let id = stbl.add_entry(0x1, "Hello").id();
    stbl.set_value(id, "Bonjour", FRENCH).unwrap();

    for locale in 0..=u8::MAX {
        let expected = if locale == FRENCH { "Bonjour" } else { "Hello" };
        assert_eq!(stbl.get_value_with_fallback(id, locale), expected);
    }
}

#[test]
fn test_primary_membership_survives_operation_sequence() {
    let mut stbl = LocalizedStringTable::with_primary(ENGLISH);
    stbl.add_entry(0x1, "One");

    stbl.replace_locales(&[]);
    assert!(stbl.all_locales().contains(&ENGLISH));

    stbl.set_primary_locale(GERMAN);
    stbl.replace_locales(&[FRENCH]);
    assert_eq!(&*stbl.all_locales(), &[GERMAN, FRENCH]);
    assert_eq!(stbl.get_value(0, ENGLISH), None);
    assert_eq!(stbl.get_primary_value(0), Some(""));

    let source = LocalizedStringTable::new(ITALIAN, [], []);
    stbl.import_entries(&source, true);
    assert!(stbl.all_locales().contains(&GERMAN));
}

#[test]
fn test_cache_identity_across_reads() {
    let mut stbl = LocalizedStringTable::with_primary(ENGLISH);
    stbl.add_entry(0x1, "One");

    let locales = stbl.all_locales();
    let ids = stbl.entry_ids();
    stbl.set_key(0, 0x2).unwrap();
    stbl.set_value(0, "Uno", ENGLISH).unwrap();
    assert!(Rc::ptr_eq(&locales, &stbl.all_locales()));
    assert!(Rc::ptr_eq(&ids, &stbl.entry_ids()));

    stbl.import_entries(&LocalizedStringTable::with_primary(FRENCH), false);
    assert!(!Rc::ptr_eq(&locales, &stbl.all_locales()));
    assert!(!Rc::ptr_eq(&ids, &stbl.entry_ids()));
}

#[test]
fn test_resolve_persist_and_reload() {
    init_logging();

    let stbl = resolve_string_tables(
        ENGLISH,
        &[
            ParsedTable::new(ENGLISH, vec![StringRow::new(0x01, "Hi")]),
            ParsedTable::new(
                FRENCH,
                vec![StringRow::new(0x01, "Salut"), StringRow::new(0x02, "Oui")],
            ),
        ],
    );

    let serialized = stbl.serialize().unwrap();
    let reloaded = LocalizedStringTable::deserialize(&serialized).unwrap();

    assert_eq!(reloaded.primary_locale(), ENGLISH);
    assert_eq!(reloaded.get_json(ENGLISH), stbl.get_json(ENGLISH));
    assert_eq!(reloaded.get_json(FRENCH), stbl.get_json(FRENCH));
    assert_eq!(reloaded.get_value(1, FRENCH), Some("Oui"));
    // The synthesized empty primary row is stored as "no value"
    assert_eq!(reloaded.get_value(1, ENGLISH), None);

    let issues = reloaded.get_issues();
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].kind, IssueKind::EmptyString);
    assert_eq!(issues[0].key_list, vec![0x02]);
}

#[test]
fn test_round_trip_after_primary_switch() {
    let mut stbl = LocalizedStringTable::new(ENGLISH, [ITALIAN], []);
    stbl.add_entry(0x10, "First");
    stbl.add_entry(0x20, "Second");
    stbl.set_value(0, "Primo", ITALIAN).unwrap();
    stbl.set_primary_locale(ITALIAN);

    let reloaded = decode_table(&encode_table(&stbl).unwrap()).unwrap();
    assert_eq!(reloaded.primary_locale(), ITALIAN);
    assert_eq!(reloaded.get_value(0, ITALIAN), Some("Primo"));
    assert_eq!(reloaded.get_value(0, ENGLISH), Some("First"));
    assert_eq!(reloaded.get_value(1, ENGLISH), Some("Second"));
    assert_eq!(reloaded.get_value_with_fallback(1, ITALIAN), "");
}

#[test]
fn test_resource_export_through_container() {
    let mut stbl = LocalizedStringTable::new(ENGLISH, [GERMAN], []);
    stbl.add_entry(fnv32("yes"), "Yes");
    stbl.add_entry(fnv32("no"), "No");
    stbl.set_value(0, "Ja", GERMAN).unwrap();

    let buffer = stbl.to_resource(GERMAN, &TestContainer).unwrap();
    let rows = TestContainer.parse_buffer(&buffer).unwrap();
    assert_eq!(
        rows,
        vec![StringRow::new(fnv32("yes"), "Ja"), StringRow::new(fnv32("no"), "No")]
    );

    let reimported = resolve_string_tables(GERMAN, &[ParsedTable::new(GERMAN, rows)]);
    assert_eq!(reimported.get_json(GERMAN), stbl.get_json(GERMAN));
}

#[test]
fn test_import_overwrite_keeps_ids() {
    let mut target = LocalizedStringTable::new(ENGLISH, [FRENCH], []);
    let id = target.add_entry(0xAAAA, "Cat").id();

    let mut source = LocalizedStringTable::new(ENGLISH, [FRENCH], []);
    source.add_entry(0xAAAA, "Cat");
    source.set_value(0, "Chat", FRENCH).unwrap();

    target.import_entries(&source, true);
    assert_eq!(target.num_entries(), 1);
    assert_eq!(target.get_value(id, FRENCH), Some("Chat"));

    target.import_entries(&source, false);
    assert_eq!(target.num_entries(), 2);
    let new_id = target.entry_ids()[1];
    assert_ne!(new_id, id);
    assert_eq!(target.get_entry(new_id).unwrap().key(), 0xAAAA);

    let repeated: Vec<_> = target
        .get_issues()
        .into_iter()
        .filter(|issue| issue.kind == IssueKind::RepeatedKey)
        .collect();
    assert_eq!(repeated.len(), 1);
    assert_eq!(repeated[0].id_list, vec![id, new_id]);
}
