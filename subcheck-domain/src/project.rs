//! Narrow `.vcxproj` model.
//!
//! This is not an MSBuild evaluator. It understands unconditional and
//! `$(Configuration)|$(Platform)` conditioned groups, relative property sheet
//! imports, and the four compiler settings the rules care about. Every
//! property remembers where its value sits in the project file so that
//! remediation can be expressed as byte-range edits.

use crate::ports::{TreeView, join_normalized};
use crate::solution::ConfigKey;
use camino::{Utf8Path, Utf8PathBuf};
use regex::Regex;
use roxmltree::{Document, Node};
use std::collections::BTreeSet;
use std::sync::OnceLock;
use subcheck_types::edit::TextEdit;
use tracing::{debug, warn};

const MAX_IMPORT_DEPTH: usize = 8;

#[derive(Debug, thiserror::Error)]
pub enum ProjectParseError {
    #[error("malformed XML: {0}")]
    Xml(#[from] roxmltree::Error),

    #[error("root element is <{0}>, expected <Project>")]
    NotAProject(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyOrigin {
    Project,
    /// Defined in a property sheet pulled in with `<Import>`.
    Imported(Utf8PathBuf),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ValueSlot {
    /// Existing text content, possibly whitespace.
    Text { start: usize, end: usize },
    /// `<X></X>`: insertion point before the closing tag.
    Empty { at: usize },
    /// `<X />`
    SelfClosing { start: usize, end: usize },
}

/// One property definition as seen by a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Property {
    pub name: String,
    /// Trimmed value; `None` when the element is present but empty.
    pub value: Option<String>,
    pub origin: PropertyOrigin,
    slot: ValueSlot,
}

impl Property {
    pub fn is_imported(&self) -> bool {
        matches!(self.origin, PropertyOrigin::Imported(_))
    }

    /// Edit that sets this property to `value` in place.
    ///
    /// Returns `None` for imported properties; the property sheet is not ours
    /// to change.
    pub fn rewrite(&self, value: &str) -> Option<TextEdit> {
        if self.is_imported() {
            return None;
        }
        let edit = match self.slot {
            ValueSlot::Text { start, end } => TextEdit::replace(start, end, value),
            ValueSlot::Empty { at } => TextEdit::insert(at, value),
            ValueSlot::SelfClosing { start, end } => {
                TextEdit::replace(start, end, format!("<{0}>{1}</{0}>", self.name, value))
            }
        };
        Some(edit)
    }
}

/// Where a new child of a `<ClCompile>` item definition can be inserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClCompileSlot {
    insert_at: usize,
    /// Indentation and line ending to use when the closing tag has its own line.
    layout: Option<(String, &'static str)>,
}

impl ClCompileSlot {
    pub fn insertion(&self, name: &str, value: &str) -> TextEdit {
        let element = format!("<{0}>{1}</{0}>", name, value);
        match &self.layout {
            Some((indent, newline)) => {
                TextEdit::insert(self.insert_at, format!("{indent}{element}{newline}"))
            }
            None => TextEdit::insert(self.insert_at, element),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tracked {
    PlatformToolset,
    LanguageStandard,
    WarningLevel,
    TreatWarningAsError,
}

impl Tracked {
    fn in_property_group(name: &str) -> Option<Self> {
        (name == "PlatformToolset").then_some(Tracked::PlatformToolset)
    }

    fn in_clcompile(name: &str) -> Option<Self> {
        match name {
            "LanguageStandard" => Some(Tracked::LanguageStandard),
            "WarningLevel" => Some(Tracked::WarningLevel),
            "TreatWarningAsError" => Some(Tracked::TreatWarningAsError),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
struct Occurrence {
    kind: Tracked,
    conditions: Vec<String>,
    property: Property,
}

/// Everything the rules read for one project configuration.
#[derive(Debug, Clone)]
pub struct ConfigurationView<'p> {
    pub key: ConfigKey,
    pub platform_toolset: Option<&'p Property>,
    pub language_standard: Option<&'p Property>,
    pub warning_level: Option<&'p Property>,
    pub treat_warning_as_error: Option<&'p Property>,
    pub clcompile: Option<&'p ClCompileSlot>,
    /// Header paths relative to the tree root.
    pub headers: Vec<Utf8PathBuf>,
}

#[derive(Debug, Clone)]
pub struct ProjectModel {
    path: Utf8PathBuf,
    configurations: Vec<ConfigKey>,
    own: Vec<Occurrence>,
    imported: Vec<Occurrence>,
    clcompile: Vec<(Vec<String>, ClCompileSlot)>,
    headers: Vec<(Vec<String>, String)>,
}

impl ProjectModel {
    /// Parse the project at `path` (relative to the tree root) from `text`.
    /// Relative property sheet imports are resolved through `tree`.
    pub fn parse(
        path: &Utf8Path,
        text: &str,
        tree: &dyn TreeView,
    ) -> Result<Self, ProjectParseError> {
        let (body, base) = match text.strip_prefix('\u{feff}') {
            Some(rest) => (rest, '\u{feff}'.len_utf8()),
            None => (text, 0),
        };
        let doc = Document::parse(body)?;
        let root = doc.root_element();
        if root.tag_name().name() != "Project" {
            return Err(ProjectParseError::NotAProject(
                root.tag_name().name().to_string(),
            ));
        }

        let mut model = ProjectModel {
            path: path.to_path_buf(),
            configurations: Vec::new(),
            own: Vec::new(),
            imported: Vec::new(),
            clcompile: Vec::new(),
            headers: Vec::new(),
        };

        let mut visited = BTreeSet::new();
        visited.insert(path.to_path_buf());
        let mut walker = Walker {
            tree,
            text: body,
            base,
            file: path,
            origin: PropertyOrigin::Project,
            depth: 0,
            visited: &mut visited,
        };
        walker.visit(root, &[], &mut model);

        debug!(
            project = %path,
            configurations = model.configurations.len(),
            properties = model.own.len(),
            imported = model.imported.len(),
            "parsed project"
        );
        Ok(model)
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Directory holding the project file, relative to the tree root.
    pub fn directory(&self) -> &Utf8Path {
        self.path.parent().unwrap_or(Utf8Path::new(""))
    }

    /// Configurations declared by `ProjectConfiguration` items.
    pub fn configurations(&self) -> &[ConfigKey] {
        &self.configurations
    }

    pub fn declares(&self, key: &ConfigKey) -> bool {
        self.configurations
            .iter()
            .any(|c| c.to_string().eq_ignore_ascii_case(&key.to_string()))
    }

    pub fn configuration(&self, key: &ConfigKey) -> ConfigurationView<'_> {
        let clcompile = self
            .clcompile
            .iter()
            .rev()
            .find(|(conds, _)| conditions_hold(conds, key))
            .map(|(_, slot)| slot);

        let mut headers = Vec::new();
        for (conds, raw) in &self.headers {
            if conditions_hold(conds, key) {
                let resolved = join_normalized(self.directory(), raw);
                if !headers.contains(&resolved) {
                    headers.push(resolved);
                }
            }
        }

        ConfigurationView {
            key: key.clone(),
            platform_toolset: self.lookup(Tracked::PlatformToolset, key),
            language_standard: self.lookup(Tracked::LanguageStandard, key),
            warning_level: self.lookup(Tracked::WarningLevel, key),
            treat_warning_as_error: self.lookup(Tracked::TreatWarningAsError, key),
            clcompile,
            headers,
        }
    }

    // Last definition wins; the project file overrides property sheets.
    fn lookup(&self, kind: Tracked, key: &ConfigKey) -> Option<&Property> {
        self.own
            .iter()
            .rev()
            .chain(self.imported.iter().rev())
            .find(|o| o.kind == kind && conditions_hold(&o.conditions, key))
            .map(|o| &o.property)
    }
}

struct Walker<'a, 't> {
    tree: &'a dyn TreeView,
    text: &'t str,
    base: usize,
    file: &'a Utf8Path,
    origin: PropertyOrigin,
    depth: usize,
    visited: &'a mut BTreeSet<Utf8PathBuf>,
}

impl Walker<'_, '_> {
    fn is_project(&self) -> bool {
        self.origin == PropertyOrigin::Project
    }

    fn visit(&mut self, node: Node<'_, '_>, conds: &[String], model: &mut ProjectModel) {
        for child in node.children().filter(|c| c.is_element()) {
            let conds = with_condition(conds, child);
            match child.tag_name().name() {
                "PropertyGroup" => {
                    for prop in child.children().filter(|c| c.is_element()) {
                        if let Some(kind) = Tracked::in_property_group(prop.tag_name().name()) {
                            self.record(kind, prop, &with_condition(&conds, prop), model);
                        }
                    }
                }
                "ItemDefinitionGroup" => {
                    for item in child.children().filter(|c| c.is_element()) {
                        if item.tag_name().name() != "ClCompile" {
                            continue;
                        }
                        let item_conds = with_condition(&conds, item);
                        if self.is_project()
                            && let Some(slot) = clcompile_slot(item, self.text, self.base)
                        {
                            model.clcompile.push((item_conds.clone(), slot));
                        }
                        for setting in item.children().filter(|c| c.is_element()) {
                            if let Some(kind) = Tracked::in_clcompile(setting.tag_name().name()) {
                                self.record(kind, setting, &with_condition(&item_conds, setting), model);
                            }
                        }
                    }
                }
                "ItemGroup" if self.is_project() => {
                    for item in child.children().filter(|c| c.is_element()) {
                        let Some(include) = item.attribute("Include") else {
                            continue;
                        };
                        match item.tag_name().name() {
                            "ProjectConfiguration" => {
                                if let Some(key) = ConfigKey::parse(include) {
                                    model.configurations.push(key);
                                }
                            }
                            "ClInclude" => {
                                let item_conds = with_condition(&conds, item);
                                for part in include.split(';').map(str::trim) {
                                    if part.is_empty() || part.contains("$(") || part.contains('*') {
                                        continue;
                                    }
                                    model.headers.push((item_conds.clone(), part.to_string()));
                                }
                            }
                            _ => {}
                        }
                    }
                }
                "Import" => self.import(child, &conds, model),
                "ImportGroup" | "Choose" | "When" => self.visit(child, &conds, model),
                _ => {}
            }
        }
    }

    fn record(&self, kind: Tracked, node: Node<'_, '_>, conds: &[String], model: &mut ProjectModel) {
        let (value, slot) = value_slot(node, self.text, self.base);
        let occurrence = Occurrence {
            kind,
            conditions: conds.to_vec(),
            property: Property {
                name: node.tag_name().name().to_string(),
                value,
                origin: self.origin.clone(),
                slot,
            },
        };
        if self.is_project() {
            model.own.push(occurrence);
        } else {
            model.imported.push(occurrence);
        }
    }

    fn import(&mut self, node: Node<'_, '_>, conds: &[String], model: &mut ProjectModel) {
        let Some(raw) = node.attribute("Project") else {
            return;
        };
        if raw.contains("$(") {
            // Toolchain-provided sheets are outside the submission.
            return;
        }
        let dir = self.file.parent().unwrap_or(Utf8Path::new(""));
        let target = join_normalized(dir, raw);

        if self.depth + 1 > MAX_IMPORT_DEPTH || !self.visited.insert(target.clone()) {
            debug!(import = %target, "import skipped (depth or cycle)");
            return;
        }
        if !self.tree.exists(&target) {
            debug!(import = %target, "import not found in submission");
            return;
        }

        let text = match self.tree.read_to_string(&target) {
            Ok(text) => text,
            Err(err) => {
                warn!(import = %target, error = %err, "cannot read property sheet");
                return;
            }
        };
        let (body, base) = match text.strip_prefix('\u{feff}') {
            Some(rest) => (rest, '\u{feff}'.len_utf8()),
            None => (text.as_str(), 0),
        };
        let doc = match Document::parse(body) {
            Ok(doc) => doc,
            Err(err) => {
                warn!(import = %target, error = %err, "cannot parse property sheet");
                return;
            }
        };

        let mut nested = Walker {
            tree: self.tree,
            text: body,
            base,
            file: &target,
            origin: PropertyOrigin::Imported(target.clone()),
            depth: self.depth + 1,
            visited: &mut *self.visited,
        };
        nested.visit(doc.root_element(), conds, model);
    }
}

fn with_condition(conds: &[String], node: Node<'_, '_>) -> Vec<String> {
    let mut out = conds.to_vec();
    if let Some(c) = node.attribute("Condition") {
        out.push(c.to_string());
    }
    out
}

fn conditions_hold(conds: &[String], key: &ConfigKey) -> bool {
    conds.iter().all(|c| condition_holds(c, key))
}

fn and_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\s+and\s+").expect("valid regex"))
}

/// Evaluate the common `'$(Configuration)|$(Platform)'=='Debug|x64'` shapes,
/// including clauses joined with `And`. Clauses that mention neither
/// variable are treated as true.
fn condition_holds(condition: &str, key: &ConfigKey) -> bool {
    let c = condition.to_ascii_lowercase();
    and_re().split(&c).all(|clause| clause_holds(clause, key))
}

fn clause_holds(c: &str, key: &ConfigKey) -> bool {
    let cfg = key.configuration.to_ascii_lowercase();
    let plat = key.platform.to_ascii_lowercase();
    let has_cfg = c.contains("$(configuration)");
    let has_plat = c.contains("$(platform)");

    let needle = match (has_cfg, has_plat) {
        (true, true) => format!("'{cfg}|{plat}'"),
        (true, false) => format!("'{cfg}'"),
        (false, true) => format!("'{plat}'"),
        (false, false) => return true,
    };
    let matched = c.contains(&needle);
    if c.contains("!=") { !matched } else { matched }
}

fn value_slot(node: Node<'_, '_>, text: &str, base: usize) -> (Option<String>, ValueSlot) {
    if let Some(child) = node.children().find(|c| c.is_text()) {
        let r = child.range();
        let value = child
            .text()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string);
        return (
            value,
            ValueSlot::Text {
                start: base + r.start,
                end: base + r.end,
            },
        );
    }

    let r = node.range();
    match text[r.clone()].rfind("</") {
        Some(close) => (
            None,
            ValueSlot::Empty {
                at: base + r.start + close,
            },
        ),
        None => (
            None,
            ValueSlot::SelfClosing {
                start: base + r.start,
                end: base + r.end,
            },
        ),
    }
}

fn clcompile_slot(node: Node<'_, '_>, text: &str, base: usize) -> Option<ClCompileSlot> {
    let r = node.range();
    let close = r.start + text[r.clone()].rfind("</")?;
    let line_start = text[..close].rfind('\n').map(|i| i + 1).unwrap_or(0);
    let closing_indent = &text[line_start..close];

    if line_start <= r.start || !closing_indent.chars().all(|c| c == ' ' || c == '\t') {
        return Some(ClCompileSlot {
            insert_at: base + close,
            layout: None,
        });
    }

    let newline = if text[..line_start].ends_with("\r\n") {
        "\r\n"
    } else {
        "\n"
    };
    let child_indent = node
        .children()
        .find(|c| c.is_element())
        .and_then(|first| {
            let start = first.range().start;
            let ls = text[..start].rfind('\n').map(|i| i + 1)?;
            let indent = &text[ls..start];
            indent
                .chars()
                .all(|c| c == ' ' || c == '\t')
                .then(|| indent.to_string())
        })
        .unwrap_or_else(|| format!("{closing_indent}  "));

    Some(ClCompileSlot {
        insert_at: base + line_start,
        layout: Some((child_indent, newline)),
    })
}
