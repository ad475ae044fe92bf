use camino::{Utf8Path, Utf8PathBuf};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use subcheck_edit::{ApplyOptions, apply_edits, apply_to_file};
use subcheck_types::edit::TextEdit;
use tempfile::TempDir;

fn temp_root() -> (TempDir, Utf8PathBuf) {
    let temp = TempDir::new().expect("temp dir");
    let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).expect("utf8 path");
    (temp, root)
}

const PROJECT: &str = "<Project>\r\n  <ItemDefinitionGroup>\r\n    <ClCompile>\r\n      <WarningLevel>Level3</WarningLevel>\r\n    </ClCompile>\r\n  </ItemDefinitionGroup>\r\n</Project>\r\n";

#[test]
fn writes_file_once_with_all_edits() {
    let (_temp, root) = temp_root();
    std::fs::write(root.join("Game.vcxproj"), PROJECT).unwrap();

    let start = PROJECT.find("Level3").unwrap();
    let close = PROJECT.find("    </ClCompile>").unwrap();
    let edits = vec![
        TextEdit::replace(start, start + "Level3".len(), "Level4").with_label("WarningLevel=Level4"),
        TextEdit::insert(close, "      <TreatWarningAsError>true</TreatWarningAsError>\r\n")
            .with_label("TreatWarningAsError=true"),
    ];

    let change = apply_to_file(&root, Utf8Path::new("Game.vcxproj"), &edits, &ApplyOptions::default()).unwrap();
    assert!(change.changed);
    assert_eq!(change.edits_applied, 2);
    assert_eq!(change.labels, vec!["WarningLevel=Level4", "TreatWarningAsError=true"]);

    let written = std::fs::read_to_string(root.join("Game.vcxproj")).unwrap();
    assert_eq!(
        written,
        "<Project>\r\n  <ItemDefinitionGroup>\r\n    <ClCompile>\r\n      <WarningLevel>Level4</WarningLevel>\r\n      <TreatWarningAsError>true</TreatWarningAsError>\r\n    </ClCompile>\r\n  </ItemDefinitionGroup>\r\n</Project>\r\n"
    );
}

#[test]
fn dry_run_leaves_file_untouched() {
    let (_temp, root) = temp_root();
    std::fs::write(root.join("Game.vcxproj"), PROJECT).unwrap();
    let start = PROJECT.find("Level3").unwrap();
    let edits = vec![TextEdit::replace(start, start + 6, "Level4")];

    let change = apply_to_file(
        &root,
        Utf8Path::new("Game.vcxproj"),
        &edits,
        &ApplyOptions { dry_run: true },
    )
    .unwrap();
    assert!(change.changed);
    assert_eq!(std::fs::read_to_string(root.join("Game.vcxproj")).unwrap(), PROJECT);
}

#[test]
fn missing_file_is_a_runtime_error() {
    let (_temp, root) = temp_root();
    let err = apply_to_file(&root, Utf8Path::new("Nope.vcxproj"), &[], &ApplyOptions::default()).unwrap_err();
    assert!(!err.is_conflict());
}

proptest! {
    // Text outside the edited range survives byte-for-byte.
    #[test]
    fn untouched_bytes_round_trip(
        prefix in "[ -~]{0,40}",
        old in "[a-z]{0,10}",
        suffix in "[ -~]{0,40}",
        new in "[A-Z]{0,10}",
    ) {
        let text = format!("{prefix}{old}{suffix}");
        let edit = TextEdit::replace(prefix.len(), prefix.len() + old.len(), new.clone());
        let out = apply_edits(&text, &[edit]).unwrap();
        prop_assert_eq!(out, format!("{prefix}{new}{suffix}"));
    }
}
