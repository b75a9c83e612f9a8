//! Page fixtures and the in-memory browser driver that serves them.
//!
//! A fixture file (YAML or JSON) lists pages by URL. Each page is either a
//! nested node tree or a raw `Accessibility.getFullAXTree` payload. Clicking
//! an element whose accessible name appears in the page's `links` table moves
//! to that URL; `goto` on a node is shorthand for the same. `failures` are
//! returned, in order, by the next dispatch or navigate calls.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::time::Duration;

use action_primitives::{
    BrowserDriver, DriverError, DriverErrorKind, IdleStatus, PrimitiveAction,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use perceiver_structural::{
    snapshot_from_cdp, AccessibilitySnapshot, NodeId, PerceiverError, SnapshotBuilder,
    SnapshotRecord,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum FixtureError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse fixture: {0}")]
    Parse(String),
    #[error(transparent)]
    Perceiver(#[from] PerceiverError),
    #[error("invalid fixture: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixtureFile {
    /// URL the browser is on when the session starts.
    pub start: String,
    pub pages: Vec<FixturePage>,
    /// Navigations to the key land on the value instead.
    #[serde(default)]
    pub redirects: BTreeMap<String, String>,
    #[serde(default)]
    pub failures: Vec<ScriptedFailure>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixturePage {
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub nodes: Vec<FixtureNode>,
    /// Raw CDP accessibility tree, used instead of `nodes`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cdp: Option<serde_json::Value>,
    /// Accessible name to the URL reached by activating it.
    #[serde(default)]
    pub links: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FixtureNode {
    pub role: String,
    pub name: String,
    pub level: Option<u32>,
    pub description: Option<String>,
    pub value: Option<String>,
    pub focused: bool,
    pub disabled: bool,
    pub hidden: bool,
    pub expanded: Option<bool>,
    pub checked: Option<bool>,
    pub invalid: bool,
    pub goto: Option<String>,
    pub children: Vec<FixtureNode>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptedFailure {
    pub kind: DriverErrorKind,
    #[serde(default)]
    pub message: String,
}

impl FixtureFile {
    pub fn parse(raw: &str) -> Result<Self, FixtureError> {
        serde_yaml::from_str(raw).map_err(|err| FixtureError::Parse(err.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self, FixtureError> {
        let raw = std::fs::read_to_string(path).map_err(|source| FixtureError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let parsed = if path.extension().is_some_and(|ext| ext == "json") {
            serde_json::from_str(&raw).map_err(|err| FixtureError::Parse(err.to_string()))?
        } else {
            Self::parse(&raw)?
        };
        Ok(parsed)
    }
}

struct Navigation {
    current: String,
    back: Vec<String>,
    forward: Vec<String>,
}

/// Serves fixture pages through the driver port.
pub struct FixtureDriver {
    pages: Mutex<HashMap<String, AccessibilitySnapshot>>,
    links: HashMap<String, HashMap<String, String>>,
    redirects: HashMap<String, String>,
    nav: Mutex<Navigation>,
    failures: Mutex<VecDeque<DriverError>>,
    dispatched: Mutex<Vec<String>>,
}

impl FixtureDriver {
    pub fn load(path: &Path) -> Result<Self, FixtureError> {
        Self::from_fixture(FixtureFile::load(path)?)
    }

    pub fn from_fixture(fixture: FixtureFile) -> Result<Self, FixtureError> {
        let mut pages = HashMap::with_capacity(fixture.pages.len());
        let mut links = HashMap::with_capacity(fixture.pages.len());
        for page in &fixture.pages {
            let (snapshot, page_links) = build_page(page)?;
            let key = page_key(&page.url);
            if pages.insert(key.clone(), snapshot).is_some() {
                return Err(FixtureError::Invalid(format!("page {} is listed twice", page.url)));
            }
            links.insert(key, page_links);
        }

        let redirects: HashMap<String, String> = fixture
            .redirects
            .iter()
            .map(|(from, to)| (page_key(from), page_key(to)))
            .collect();

        let start = page_key(&fixture.start);
        let mut targets: Vec<&String> = links.values().flat_map(HashMap::values).collect();
        targets.extend(redirects.values());
        targets.push(&start);
        if let Some(missing) = targets.into_iter().find(|url| !pages.contains_key(*url)) {
            return Err(FixtureError::Invalid(format!("no page for {missing}")));
        }

        info!(pages = pages.len(), start = %start, "fixture loaded");
        Ok(Self {
            pages: Mutex::new(pages),
            links,
            redirects,
            nav: Mutex::new(Navigation {
                current: start,
                back: Vec::new(),
                forward: Vec::new(),
            }),
            failures: Mutex::new(
                fixture
                    .failures
                    .into_iter()
                    .map(|failure| DriverError::new(failure.kind, failure.message))
                    .collect(),
            ),
            dispatched: Mutex::new(Vec::new()),
        })
    }

    pub fn current_url(&self) -> String {
        self.nav.lock().current.clone()
    }

    /// Redacted descriptions of every dispatch and navigate call, in order.
    pub fn dispatched(&self) -> Vec<String> {
        self.dispatched.lock().clone()
    }

    fn next_failure(&self) -> Result<(), DriverError> {
        match self.failures.lock().pop_front() {
            Some(err) => {
                debug!(kind = err.kind.as_str(), "scripted driver failure");
                Err(err)
            }
            None => Ok(()),
        }
    }

    fn visit(&self, url: &str) -> Result<(), DriverError> {
        let key = page_key(url);
        let landing = self.redirects.get(&key).cloned().unwrap_or(key);
        if !self.pages.lock().contains_key(&landing) {
            return Err(DriverError::new(
                DriverErrorKind::Unreachable,
                format!("no fixture page for {landing}"),
            ));
        }
        let mut nav = self.nav.lock();
        let previous = std::mem::replace(&mut nav.current, landing);
        nav.back.push(previous);
        nav.forward.clear();
        Ok(())
    }

    /// Follows the link named like `node`, if the page has one.
    fn activate(&self, node: Option<NodeId>, fallback: &str) -> Result<(), DriverError> {
        let current = self.current_url();
        let name = match node {
            Some(id) => self
                .pages
                .lock()
                .get(&current)
                .and_then(|page| page.node(id))
                .map(|node| node.name.clone())
                .ok_or_else(|| DriverError::stale_element(format!("{id} is not on the page")))?,
            None => fallback.to_string(),
        };
        let target = self
            .links
            .get(&current)
            .and_then(|page_links| page_links.get(&name))
            .cloned();
        match target {
            Some(target) => self.visit(&target),
            None => Ok(()),
        }
    }

    fn set_value(&self, node: Option<NodeId>, text: &str) -> Result<(), DriverError> {
        let current = self.current_url();
        let mut pages = self.pages.lock();
        let (mut record, target) = {
            let page = pages
                .get(&current)
                .ok_or_else(|| DriverError::protocol(format!("no fixture page for {current}")))?;
            let target = node
                .or_else(|| page.focused().map(|focused| focused.id))
                .ok_or_else(|| {
                    DriverError::new(DriverErrorKind::NotAttached, "nothing is focused")
                })?;
            (SnapshotRecord::from(page.clone()), target)
        };
        for entry in record.nodes.iter_mut() {
            entry.states.focused = entry.id == target;
            if entry.id == target {
                entry.text = Some(text.to_string());
            }
        }
        let updated = AccessibilitySnapshot::try_from(record)
            .map_err(|err| DriverError::protocol(err.to_string()))?;
        pages.insert(current, updated);
        Ok(())
    }

    fn step_history(&self, back: bool) {
        let mut nav = self.nav.lock();
        let next = if back { nav.back.pop() } else { nav.forward.pop() };
        if let Some(next) = next {
            let previous = std::mem::replace(&mut nav.current, next);
            if back {
                nav.forward.push(previous);
            } else {
                nav.back.push(previous);
            }
        }
    }
}

#[async_trait]
impl BrowserDriver for FixtureDriver {
    async fn get_snapshot(&self) -> Result<AccessibilitySnapshot, DriverError> {
        let current = self.current_url();
        self.pages
            .lock()
            .get(&current)
            .cloned()
            .ok_or_else(|| DriverError::protocol(format!("no fixture page for {current}")))
    }

    async fn dispatch(&self, action: &PrimitiveAction) -> Result<(), DriverError> {
        self.dispatched.lock().push(format!(
            "{} {}",
            action.kind_name(),
            action.redacted_target()
        ));
        self.next_failure()?;
        match action {
            PrimitiveAction::Navigate { url } => self.visit(url),
            PrimitiveAction::Click { node, label } => self.activate(Some(*node), label),
            PrimitiveAction::Type {
                node, text, submit, ..
            } => {
                self.set_value(*node, text.as_str())?;
                if *submit {
                    self.activate(None, "form")?;
                }
                Ok(())
            }
            PrimitiveAction::Submit { node, .. } => self.activate(*node, "form"),
            PrimitiveAction::Scroll { .. } => Ok(()),
            PrimitiveAction::Back => {
                self.step_history(true);
                Ok(())
            }
            PrimitiveAction::Forward => {
                self.step_history(false);
                Ok(())
            }
        }
    }

    async fn navigate(&self, url: &str) -> Result<(), DriverError> {
        self.dispatched
            .lock()
            .push(format!("navigate {}", lighthouse_state_center::redact_url(url)));
        self.next_failure()?;
        self.visit(url)
    }

    async fn wait_idle(&self, _timeout: Duration) -> Result<IdleStatus, DriverError> {
        Ok(IdleStatus::Idle)
    }
}

fn page_key(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

fn build_page(page: &FixturePage) -> Result<(AccessibilitySnapshot, HashMap<String, String>), FixtureError> {
    let mut links: HashMap<String, String> = page
        .links
        .iter()
        .map(|(name, url)| (name.clone(), page_key(url)))
        .collect();
    let snapshot = match &page.cdp {
        Some(raw) => snapshot_from_cdp(&page.title, &page.url, raw)?,
        None => {
            let mut builder = SnapshotBuilder::new(page.url.clone(), page.title.clone());
            let root = builder.root();
            for node in &page.nodes {
                add_node(&mut builder, root, node, &mut links);
            }
            builder.build()
        }
    };
    Ok((snapshot, links))
}

fn add_node(
    builder: &mut SnapshotBuilder,
    parent: NodeId,
    node: &FixtureNode,
    links: &mut HashMap<String, String>,
) {
    let id = builder.child_with(parent, |ax| {
        ax.role = node.role.clone();
        ax.name = node.name.clone();
        ax.level = node.level;
        ax.description = node.description.clone();
        ax.text = node.value.clone();
        ax.states.focused = node.focused;
        ax.states.disabled = node.disabled;
        ax.states.hidden = node.hidden;
        ax.states.expanded = node.expanded;
        ax.states.checked = node.checked;
        ax.states.invalid = node.invalid;
    });
    if let Some(goto) = &node.goto {
        links.insert(node.name.clone(), page_key(goto));
    }
    for child in &node.children {
        add_node(builder, id, child, links);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use action_primitives::TypedText;

    const SHOP: &str = r#"
start: https://example.com/
pages:
  - url: https://example.com/
    title: Shop
    nodes:
      - role: main
        children:
          - role: heading
            name: Shop
            level: 1
          - role: textbox
            name: Search
          - role: link
            name: Deals
            goto: https://example.com/deals
  - url: https://example.com/deals
    title: Deals
    nodes:
      - role: heading
        name: Deals
        level: 1
failures:
  - kind: stale_element
    message: node detached
"#;

    fn driver() -> FixtureDriver {
        FixtureDriver::from_fixture(FixtureFile::parse(SHOP).expect("fixture parses"))
            .expect("fixture is valid")
    }

    fn node_named(snapshot: &AccessibilitySnapshot, name: &str) -> NodeId {
        snapshot
            .perceivable()
            .find(|node| node.name == name)
            .map(|node| node.id)
            .expect("node exists")
    }

    #[tokio::test]
    async fn clicks_follow_links_and_back_returns() {
        let driver = driver();
        let page = driver.get_snapshot().await.unwrap();
        assert_eq!(page.title, "Shop");
        let deals = PrimitiveAction::Click {
            node: node_named(&page, "Deals"),
            label: "link Deals".into(),
        };

        // first call consumes the scripted failure
        let err = driver.dispatch(&deals).await.unwrap_err();
        assert_eq!(err.kind, DriverErrorKind::StaleElement);
        driver.dispatch(&deals).await.unwrap();
        assert_eq!(driver.current_url(), "https://example.com/deals");

        driver.dispatch(&PrimitiveAction::Back).await.unwrap();
        assert_eq!(driver.current_url(), "https://example.com");
        driver.dispatch(&PrimitiveAction::Forward).await.unwrap();
        assert_eq!(driver.current_url(), "https://example.com/deals");
        assert_eq!(driver.dispatched().len(), 4);
    }

    #[tokio::test]
    async fn typing_sets_the_value_and_focus() {
        let driver = driver();
        let page = driver.get_snapshot().await.unwrap();
        let search = node_named(&page, "Search");
        driver.failures.lock().clear();

        driver
            .dispatch(&PrimitiveAction::Type {
                node: Some(search),
                label: "text field Search".into(),
                text: TypedText::from("blue mug"),
                submit: false,
            })
            .await
            .unwrap();

        let after = driver.get_snapshot().await.unwrap();
        let field = after.node(search).unwrap();
        assert_eq!(field.text.as_deref(), Some("blue mug"));
        assert_eq!(after.focused().map(|node| node.id), Some(search));
        assert_ne!(after.content_hash, page.content_hash);
        assert!(driver.dispatched().iter().all(|entry| !entry.contains("blue mug")));
    }

    #[tokio::test]
    async fn unknown_destinations_are_unreachable() {
        let driver = driver();
        let err = driver.navigate("https://nowhere.test").await;
        // scripted failure first
        assert!(err.is_err());
        let err = driver.navigate("https://nowhere.test").await.unwrap_err();
        assert_eq!(err.kind, DriverErrorKind::Unreachable);
        assert!(!err.is_transient());
    }

    #[test]
    fn links_to_missing_pages_are_rejected() {
        let raw = r#"
start: https://example.com/
pages:
  - url: https://example.com/
    links:
      Away: https://missing.test/
"#;
        let fixture = FixtureFile::parse(raw).unwrap();
        assert!(matches!(
            FixtureDriver::from_fixture(fixture),
            Err(FixtureError::Invalid(_))
        ));
    }
}
