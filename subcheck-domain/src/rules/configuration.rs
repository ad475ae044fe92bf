use crate::checklist::Checklist;
use crate::policy::RulePolicy;
use crate::project::{ConfigurationView, Property};
use subcheck_types::check::check_ids;
use subcheck_types::edit::TextEdit;
use tracing::{debug, warn};

const DEPTH: u8 = 2;

/// Result of comparing one property against its rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyVerdict {
    Compliant,
    /// Not defined for this configuration, or defined with an empty value.
    Missing,
    WrongValue(String),
}

impl PropertyVerdict {
    pub fn judge(property: Option<&Property>, accept: impl Fn(&str) -> bool) -> Self {
        match property.and_then(|p| p.value.as_deref()) {
            None => PropertyVerdict::Missing,
            Some(v) if accept(v) => PropertyVerdict::Compliant,
            Some(v) => PropertyVerdict::WrongValue(v.to_string()),
        }
    }

    pub fn is_compliant(&self) -> bool {
        matches!(self, PropertyVerdict::Compliant)
    }

    pub fn reason(&self) -> Option<String> {
        match self {
            PropertyVerdict::Compliant => None,
            PropertyVerdict::Missing => Some(" - missing".to_string()),
            PropertyVerdict::WrongValue(found) => Some(format!(" - found '{found}'")),
        }
    }
}

fn report(list: &mut Checklist<'_>, check_id: &str, description: String, verdict: &PropertyVerdict) -> u64 {
    list.assert(check_id, DEPTH, verdict.is_compliant(), description, verdict.reason())
}

/// Compiler settings of one configuration. Remediation edits, when enabled,
/// are appended to `edits`.
pub(crate) fn check_configuration(
    list: &mut Checklist<'_>,
    policy: &RulePolicy,
    view: &ConfigurationView<'_>,
    edits: &mut Vec<TextEdit>,
) -> u64 {
    let mut issues = 0;

    let toolset = PropertyVerdict::judge(view.platform_toolset, |v| v == policy.platform_toolset);
    issues += report(
        list,
        check_ids::TOOLSET,
        format!("Platform toolset version is {}", policy.platform_toolset),
        &toolset,
    );

    let standard =
        PropertyVerdict::judge(view.language_standard, |v| policy.accepts_language_standard(v));
    issues += report(
        list,
        check_ids::LANGUAGE_STANDARD,
        format!("Language standard is {}", policy.language_standards.join(" or ")),
        &standard,
    );

    let level = PropertyVerdict::judge(view.warning_level, |v| policy.accepts_warning_level(v));
    issues += report(
        list,
        check_ids::WARNING_LEVEL,
        policy.warning_level_description(),
        &level,
    );
    if !level.is_compliant() && policy.remediate {
        remediate(
            view,
            view.warning_level,
            "WarningLevel",
            &policy.remediation_warning_level(),
            false,
            edits,
        );
    }

    let as_error = PropertyVerdict::judge(view.treat_warning_as_error, |v| {
        v.eq_ignore_ascii_case("true")
    });
    issues += report(
        list,
        check_ids::WARNINGS_AS_ERRORS,
        "Treat Warning As Error".to_string(),
        &as_error,
    );
    if !as_error.is_compliant() && policy.remediate {
        remediate(
            view,
            view.treat_warning_as_error,
            "TreatWarningAsError",
            "true",
            true,
            edits,
        );
    }

    issues
}

fn remediate(
    view: &ConfigurationView<'_>,
    property: Option<&Property>,
    name: &str,
    value: &str,
    insert_when_absent: bool,
    edits: &mut Vec<TextEdit>,
) {
    let label = format!("{name}={value} ({})", view.key);
    match property {
        Some(p) if p.is_imported() => {
            debug!(property = name, config = %view.key, "inherited from a property sheet; left alone");
        }
        Some(p) => {
            if let Some(edit) = p.rewrite(value) {
                push_unique(edits, edit.with_label(label));
            }
        }
        None if insert_when_absent => match view.clcompile {
            Some(slot) => push_unique(edits, slot.insertion(name, value).with_label(label)),
            None => {
                warn!(property = name, config = %view.key, "no ClCompile item definition to insert into");
            }
        },
        None => {
            debug!(property = name, config = %view.key, "absent; not inserted");
        }
    }
}

// Two solution configurations can map onto the same project definition.
fn push_unique(edits: &mut Vec<TextEdit>, edit: TextEdit) {
    let duplicate = edits.iter().any(|e| {
        e.start == edit.start && e.end == edit.end && e.replacement == edit.replacement
    });
    if !duplicate {
        edits.push(edit);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checklist::NullReporter;
    use crate::project::ProjectModel;
    use crate::solution::ConfigKey;
    use crate::test_support::{MemTree, apply};
    use camino::Utf8Path;
    use pretty_assertions::assert_eq;

    fn project(clcompile: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="utf-8"?>
<Project xmlns="http://schemas.microsoft.com/developer/msbuild/2003">
  <PropertyGroup Condition="'$(Configuration)|$(Platform)'=='Debug|x64'" Label="Configuration">
    <PlatformToolset>v143</PlatformToolset>
  </PropertyGroup>
  <ItemDefinitionGroup Condition="'$(Configuration)|$(Platform)'=='Debug|x64'">
    <ClCompile>
      <LanguageStandard>stdcpp20</LanguageStandard>
{clcompile}    </ClCompile>
  </ItemDefinitionGroup>
</Project>
"#
        )
    }

    fn evaluate(text: &str, remediate: bool) -> (u64, Vec<TextEdit>) {
        let tree = MemTree::new(&[("p.vcxproj", text)]);
        let model = ProjectModel::parse(Utf8Path::new("p.vcxproj"), text, &tree).unwrap();
        let view = model.configuration(&ConfigKey::new("Debug", "x64"));
        let mut policy = RulePolicy::defaults().unwrap();
        policy.remediate = remediate;
        let mut sink = NullReporter;
        let mut list = Checklist::new(&mut sink);
        let mut edits = Vec::new();
        let n = check_configuration(&mut list, &policy, &view, &mut edits);
        (n, edits)
    }

    #[test]
    fn verdict_reasons_distinguish_missing_from_wrong() {
        assert_eq!(PropertyVerdict::Missing.reason().as_deref(), Some(" - missing"));
        assert_eq!(
            PropertyVerdict::WrongValue("Level3".into()).reason().as_deref(),
            Some(" - found 'Level3'")
        );
        assert_eq!(PropertyVerdict::Compliant.reason(), None);
    }

    #[test]
    fn compliant_project_has_no_issues_and_no_edits() {
        let text = project(
            "      <WarningLevel>Level4</WarningLevel>\n      <TreatWarningAsError>true</TreatWarningAsError>\n",
        );
        assert_eq!(evaluate(&text, true), (0, Vec::new()));
    }

    #[test]
    fn all_warnings_alias_is_compliant() {
        let text = project(
            "      <WarningLevel>EnableAllWarnings</WarningLevel>\n      <TreatWarningAsError>true</TreatWarningAsError>\n",
        );
        assert_eq!(evaluate(&text, false).0, 0);
    }

    #[test]
    fn wrong_values_are_rewritten_in_place() {
        let text = project(
            "      <WarningLevel>Level3</WarningLevel>\n      <TreatWarningAsError>false</TreatWarningAsError>\n",
        );
        let (issues, edits) = evaluate(&text, true);
        assert_eq!(issues, 2);
        assert_eq!(edits.len(), 2);

        let fixed = apply(&text, &edits);
        assert_eq!(evaluate(&fixed, true), (0, Vec::new()));
    }

    #[test]
    fn absent_warnings_as_error_is_inserted_but_absent_level_is_not() {
        let text = project("");
        let (issues, edits) = evaluate(&text, true);
        assert_eq!(issues, 2);
        assert_eq!(edits.len(), 1);
        assert!(edits[0].replacement.contains("<TreatWarningAsError>true</TreatWarningAsError>"));

        let (after, _) = evaluate(&apply(&text, &edits), true);
        assert_eq!(after, 1);
    }

    #[test]
    fn nothing_is_edited_without_remediation() {
        let text = project("      <WarningLevel>Level1</WarningLevel>\n");
        let (issues, edits) = evaluate(&text, false);
        assert_eq!(issues, 2);
        assert!(edits.is_empty());
    }

    #[test]
    fn wrong_toolset_is_reported_not_fixed() {
        let text = project(
            "      <WarningLevel>Level4</WarningLevel>\n      <TreatWarningAsError>true</TreatWarningAsError>\n",
        )
        .replace("v143", "v142");
        assert_eq!(evaluate(&text, true), (1, Vec::new()));
    }
}
