use pretty_assertions::assert_eq;
use stblstudio::Studio;
use stblstudio::project::Project;
use stblstudio::settings::{Settings, UserSettings};
use stblstudio::stblcore::prelude::*;
use stblstudio::storage::{DirectoryStore, MemoryStore, ProjectStore};
use stblstudio::uploads::UploadedFile;

const ENGLISH: Locale = 0;
const FRENCH: Locale = 2;
const GERMAN: Locale = 3;

/// Container reading `key=value` lines, standing in for a binary format
struct LineContainer;

impl ResourceContainer for LineContainer {
    fn build_buffer(&self, rows: &[StringRow]) -> Result<Vec<u8>> {
        let text: String = rows
            .iter()
            .map(|row| format!("{:08X}={}\n", row.key, row.value))
            .collect();
        Ok(text.into_bytes())
    }

    fn parse_buffer(&self, buffer: &[u8]) -> Result<Vec<StringRow>> {
        String::from_utf8_lossy(buffer)
            .lines()
            .map(|line| {
                let (key, value) = line
                    .split_once('=')
                    .ok_or_else(|| Error::Container(format!("bad line: {line}")))?;
                let key = u32::from_str_radix(key, 16)
                    .map_err(|err| Error::Container(err.to_string()))?;
                Ok(StringRow::new(key, value))
            })
            .collect()
    }
}

fn settings() -> Settings {
    Settings::new(UserSettings {
        default_locale: ENGLISH,
        ..UserSettings::default()
    })
}

#[test]
fn test_upload_resolve_save_reload() {
    let dir = tempfile::tempdir().unwrap();
    let mut studio = Studio::new(settings(), DirectoryStore::new(dir.path()));

    let files = [
        UploadedFile::new(
            "220557DA_80000000_0000000012345678.json",
            r#"[{"key": "0000AAAA", "value": "Sword"}, {"key": "0000BBBB", "value": "Shield"}]"#,
        ),
        UploadedFile::new(
            "220557DA!80000000!0200000012345678.stbl",
            "0000AAAA=Epee\n0000CCCC=Casque\n",
        ),
        UploadedFile::new("de.csv", "3\nSchwert\n"),
        UploadedFile::new("notes.json", "{}"),
    ];

    let (project, errors) = studio
        .import_project("Armory", ENGLISH, &files, Some(&LineContainer as &dyn ResourceContainer))
        .unwrap();

    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].filename, "notes.json");
    assert_eq!(project.meta().instance, 0x1234_5678);
    assert_eq!(project.meta().num_entries, 4);
    assert_eq!(project.meta().num_locales, 3);

    let reopened = studio.open_project(project.uuid()).unwrap();
    let stbl = reopened.stbl().unwrap();
    assert_eq!(stbl.primary_locale(), ENGLISH);
    assert_eq!(
        stbl.get_json(FRENCH)
            .into_iter()
            .map(|row| row.value)
            .collect::<Vec<_>>(),
        vec!["Epee", "Shield", "Casque", ""]
    );
    assert!(stbl.all_locales().contains(&GERMAN));
    assert_eq!(stbl.get_value(3, GERMAN), Some("Schwert"));

    // Keys only present in other locales come back with no primary text
    let issues = stbl.get_issues();
    assert!(issues.iter().any(|issue| issue.kind == IssueKind::EmptyString));
}

#[test]
fn test_edit_and_resave() {
    let mut studio = Studio::new(settings(), MemoryStore::new());
    let files = [UploadedFile::new("strings.txt", "Alpha\nBeta\n")];
    let (mut project, errors) = studio.import_project("Greek", ENGLISH, &files, None).unwrap();
    assert!(errors.is_empty());

    let stbl = project.stbl_mut().unwrap();
    stbl.replace_locales(&[ENGLISH, FRENCH]);
    stbl.add_entry(fnv32("gamma"), "Gamma");
    stbl.set_value(0, "Alpha (fr)", FRENCH).unwrap();
    project.set_name("Greek letters");
    studio.save_project(&mut project).unwrap();

    let reopened = studio.open_project(project.uuid()).unwrap();
    assert_eq!(reopened.meta().name, "Greek letters");
    assert_eq!(reopened.meta().num_entries, 3);
    assert_eq!(reopened.stbl().unwrap().get_value(0, FRENCH), Some("Alpha (fr)"));
}

#[test]
fn test_stale_commit_does_not_overwrite() {
    let mut store = ProjectStore::new(MemoryStore::new());
    let mut stbl = LocalizedStringTable::with_primary(ENGLISH);
    stbl.add_entry(0x1, "v1");
    let mut project = Project::create("Race", 0, 0, stbl);

    let older = store.stage_project(&mut project).unwrap();
    project.stbl_mut().unwrap().set_primary_value(0, "v2").unwrap();
    let newer = store.stage_project(&mut project).unwrap();

    store.commit_all(newer).unwrap();
    let results: Vec<_> = older.into_iter().map(|write| store.commit(write)).collect();
    assert!(results
        .iter()
        .all(|result| matches!(result, Err(stblstudio::Error::StaleWrite { .. }))));

    let loaded = store.load_project(project.uuid()).unwrap();
    assert_eq!(loaded.stbl().unwrap().get_primary_value(0), Some("v2"));
}
