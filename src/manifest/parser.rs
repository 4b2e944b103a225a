//! Manifest XML parsing.
//!
//! Real-world manifests are inconsistent about namespaces: some declare a
//! default namespace on the root, some declare none, and some carry subtrees
//! under a different namespace entirely. The parser first materializes the
//! document into a small element tree, then resolves every expected child in
//! three tiers: under the namespace the root declared, with no namespace at
//! all, and finally by scanning descendants by local tag name alone.
//!
//! Structural problems with a single action (missing path, missing id) skip
//! that action or package with a warning. Problems that make the whole
//! document untrustworthy (bad encoding, broken XML, an unknown command
//! type) fail the parse.

use log::{debug, info, warn};
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::ResolveResult;
use quick_xml::NsReader;

use crate::constants::SKIP_OUTPUT_SENTINEL;
use crate::error::ManifestError;

use super::model::{
    command_output_name, normalize_team, registry_output_name, sanitize_label,
    sanitize_output_name, strip_trailing_wildcard, ActionSet, CommandAction, CommandKind,
    CommandOutput, EventLogAction, FileAction, Manifest, Package, RegistryAction,
};

// ---------------------------------------------------------------------------
// Element tree
// ---------------------------------------------------------------------------

/// One materialized element: resolved namespace, attributes by local name,
/// accumulated text (including CDATA), and children in document order.
#[derive(Debug)]
struct XmlElement {
    local: String,
    namespace: Option<String>,
    attributes: Vec<(String, String)>,
    text: String,
    children: Vec<XmlElement>,
}

impl XmlElement {
    fn attr(&self, local: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == local)
            .map(|(_, value)| value.as_str())
    }

    fn trimmed_text(&self) -> &str {
        self.text.trim()
    }
}

fn element_from(start: &BytesStart<'_>, ns: ResolveResult<'_>) -> Result<XmlElement, ManifestError> {
    let local = std::str::from_utf8(start.local_name().as_ref())?.to_string();
    let namespace = match ns {
        ResolveResult::Bound(bound) => Some(String::from_utf8_lossy(bound.0).into_owned()),
        _ => None,
    };

    let mut attributes = Vec::new();
    for attr in start.attributes() {
        let attr = attr?;
        let key = std::str::from_utf8(attr.key.local_name().as_ref())?.to_string();
        let value = attr
            .unescape_value()
            .map_err(|err| ManifestError::Malformed(err.to_string()))?
            .into_owned();
        attributes.push((key, value));
    }

    Ok(XmlElement {
        local,
        namespace,
        attributes,
        text: String::new(),
        children: Vec::new(),
    })
}

fn build_tree(text: &str) -> Result<Option<XmlElement>, ManifestError> {
    let mut reader = NsReader::from_str(text);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;

    loop {
        match reader.read_resolved_event()? {
            (ns, Event::Start(ref e)) => stack.push(element_from(e, ns)?),
            (ns, Event::Empty(ref e)) => {
                let element = element_from(e, ns)?;
                attach(element, &mut stack, &mut root);
            }
            (_, Event::Text(ref e)) => {
                if let Some(parent) = stack.last_mut() {
                    let text = e
                        .unescape()
                        .map_err(|err| ManifestError::Malformed(err.to_string()))?;
                    parent.text.push_str(&text);
                }
            }
            (_, Event::CData(ref e)) => {
                if let Some(parent) = stack.last_mut() {
                    parent.text.push_str(std::str::from_utf8(e.as_ref())?);
                }
            }
            (_, Event::End(_)) => {
                if let Some(element) = stack.pop() {
                    attach(element, &mut stack, &mut root);
                }
            }
            (_, Event::Eof) => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(ManifestError::Malformed(
            "unclosed element at end of document".to_string(),
        ));
    }
    Ok(root)
}

fn attach(element: XmlElement, stack: &mut Vec<XmlElement>, root: &mut Option<XmlElement>) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None if root.is_none() => *root = Some(element),
        None => warn!("ignoring extra root element <{}>", element.local),
    }
}

// ---------------------------------------------------------------------------
// Three-tier element lookup
// ---------------------------------------------------------------------------

/// Finds requested elements under `scope`, tolerating namespace drift.
///
/// Direct children under the manifest's namespace win; failing that, direct
/// children with no namespace; failing that, any descendant whose local tag
/// name matches.
fn find_elements<'t>(
    scope: &'t XmlElement,
    local: &str,
    manifest_ns: Option<&str>,
) -> Vec<&'t XmlElement> {
    let namespaced: Vec<&XmlElement> = scope
        .children
        .iter()
        .filter(|el| el.local == local && el.namespace.as_deref() == manifest_ns)
        .collect();
    if !namespaced.is_empty() {
        return namespaced;
    }

    if manifest_ns.is_some() {
        let bare: Vec<&XmlElement> = scope
            .children
            .iter()
            .filter(|el| el.local == local && el.namespace.is_none())
            .collect();
        if !bare.is_empty() {
            debug!("<{local}> resolved without the manifest namespace");
            return bare;
        }
    }

    let mut scanned = Vec::new();
    collect_descendants(scope, local, &mut scanned);
    if !scanned.is_empty() {
        debug!("<{local}> resolved by descendant scan ({} hit(s))", scanned.len());
    }
    scanned
}

fn collect_descendants<'t>(scope: &'t XmlElement, local: &str, out: &mut Vec<&'t XmlElement>) {
    for child in &scope.children {
        if child.local == local {
            out.push(child);
        }
        collect_descendants(child, local, out);
    }
}

// ---------------------------------------------------------------------------
// Manifest assembly
// ---------------------------------------------------------------------------

/// Parses manifest bytes into a [`Manifest`].
///
/// The bytes must be UTF-8; a leading byte-order mark is tolerated. A
/// document without packages parses to an empty manifest rather than an
/// error.
pub fn parse(bytes: &[u8]) -> Result<Manifest, ManifestError> {
    let text = decode(bytes)?;
    let root = build_tree(text)?.ok_or(ManifestError::Empty)?;

    let namespace = root.namespace.clone();
    let manifest_ns = namespace.as_deref();
    if let Some(ns) = manifest_ns {
        debug!("manifest declares namespace {ns}");
    }

    let package_elements = find_elements(&root, "Package", manifest_ns);
    if package_elements.is_empty() {
        info!("manifest contains no packages");
        return Ok(Manifest::default());
    }

    let mut packages = Vec::with_capacity(package_elements.len());
    for element in package_elements {
        if let Some(package) = parse_package(element, manifest_ns)? {
            packages.push(package);
        }
    }
    info!("parsed manifest: {} package(s)", packages.len());
    Ok(Manifest { packages })
}

fn decode(bytes: &[u8]) -> Result<&str, ManifestError> {
    let text = std::str::from_utf8(bytes)?;
    Ok(text.trim_start_matches('\u{feff}'))
}

fn parse_package(
    element: &XmlElement,
    ns: Option<&str>,
) -> Result<Option<Package>, ManifestError> {
    let id = element.attr("Id").map(str::trim).unwrap_or_default();
    if id.is_empty() {
        warn!("skipping package with no Id attribute");
        return Ok(None);
    }
    let id = sanitize_label(id);

    let mut actions = ActionSet::default();
    for group in find_elements(element, "Files", ns) {
        for item in find_elements(group, "File", ns) {
            if let Some((path_pattern, team)) = parse_path_action(item, "file") {
                actions.files.push(FileAction { path_pattern, team });
            }
        }
    }
    for group in find_elements(element, "Registries", ns) {
        for item in find_elements(group, "Registry", ns) {
            if let Some(action) = parse_registry_action(item) {
                actions.registries.push(action);
            }
        }
    }
    for group in find_elements(element, "EventLogs", ns) {
        for item in find_elements(group, "EventLog", ns) {
            if let Some((path_pattern, team)) = parse_path_action(item, "event log") {
                actions.event_logs.push(EventLogAction { path_pattern, team });
            }
        }
    }
    for group in find_elements(element, "Commands", ns) {
        for item in find_elements(group, "Command", ns) {
            if let Some(action) = parse_command_action(item)? {
                actions.commands.push(action);
            }
        }
    }

    debug!("package '{}': {} action(s)", id, actions.len());
    Ok(Some(Package { id, actions }))
}

/// Reads the path pattern for a File or EventLog item: `Path` attribute
/// first, element text as fallback.
fn parse_path_action(item: &XmlElement, what: &str) -> Option<(String, String)> {
    let pattern = item
        .attr("Path")
        .map(str::trim)
        .filter(|path| !path.is_empty())
        .map(str::to_string)
        .or_else(|| {
            let text = item.trimmed_text();
            (!text.is_empty()).then(|| text.to_string())
        });

    match pattern {
        Some(pattern) => Some((pattern, normalize_team(item.attr("Team")))),
        None => {
            warn!("skipping {what} action with no path");
            None
        }
    }
}

fn parse_registry_action(item: &XmlElement) -> Option<RegistryAction> {
    let raw_key = item
        .attr("Key")
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .map(str::to_string)
        .or_else(|| {
            let text = item.trimmed_text();
            (!text.is_empty()).then(|| text.to_string())
        });
    let raw_key = match raw_key {
        Some(key) => key,
        None => {
            warn!("skipping registry action with no key path");
            return None;
        }
    };

    let key_path = strip_trailing_wildcard(&raw_key).to_string();
    if key_path.is_empty() {
        warn!("skipping registry action with wildcard-only key '{raw_key}'");
        return None;
    }

    let output_name = match item.attr("Output").map(str::trim).filter(|v| !v.is_empty()) {
        Some(name) => sanitize_output_name(name),
        None => registry_output_name(&key_path),
    };

    Some(RegistryAction {
        key_path,
        team: normalize_team(item.attr("Team")),
        output_name,
    })
}

fn parse_command_action(item: &XmlElement) -> Result<Option<CommandAction>, ManifestError> {
    let text = item.trimmed_text();
    if text.is_empty() {
        warn!("skipping command action with no command text");
        return Ok(None);
    }

    let kind = CommandKind::from_manifest_attr(item.attr("Type").unwrap_or_default())?;
    let output = match item.attr("Output").map(str::trim) {
        Some(value) if value.eq_ignore_ascii_case(SKIP_OUTPUT_SENTINEL) => CommandOutput::Skip,
        Some(value) if !value.is_empty() => CommandOutput::Named(sanitize_output_name(value)),
        _ => CommandOutput::Named(command_output_name(text)),
    };

    Ok(Some(CommandAction {
        text: text.to_string(),
        kind,
        team: normalize_team(item.attr("Team")),
        output,
    }))
}
