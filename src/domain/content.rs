//! Payload shared by every clone of a node.

use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;

use crate::errors::{MapError, MapResult};

static MARKUP_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").expect("markup tag pattern"));
static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern"));

/// What a node displays: plain text or a markup document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserObject {
    Text(String),
    Markup(String),
}

impl Default for UserObject {
    fn default() -> Self {
        UserObject::Text(String::new())
    }
}

impl fmt::Display for UserObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserObject::Text(s) | UserObject::Markup(s) => f.write_str(s),
        }
    }
}

impl From<&str> for UserObject {
    fn from(value: &str) -> Self {
        UserObject::Text(value.to_string())
    }
}

impl From<String> for UserObject {
    fn from(value: String) -> Self {
        UserObject::Text(value)
    }
}

/// Icon identifier. Clones of the same name compare equal; the document
/// registry hands out one interned instance per name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MindIcon(Rc<str>);

impl MindIcon {
    pub fn new(name: &str) -> Self {
        Self(Rc::from(name))
    }

    pub fn name(&self) -> &str {
        &self.0
    }

    pub(crate) fn shares_storage_with(&self, other: &MindIcon) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Display for MindIcon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Creation and modification timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryInformation {
    created_at: DateTime<Utc>,
    last_modified_at: DateTime<Utc>,
}

impl Default for HistoryInformation {
    fn default() -> Self {
        Self::new()
    }
}

impl HistoryInformation {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            created_at: now,
            last_modified_at: now,
        }
    }

    pub fn with_times(created_at: DateTime<Utc>, last_modified_at: DateTime<Utc>) -> Self {
        Self {
            created_at,
            last_modified_at,
        }
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn last_modified_at(&self) -> DateTime<Utc> {
        self.last_modified_at
    }

    pub(crate) fn touch(&mut self) {
        self.last_modified_at = Utc::now();
    }
}

/// Typed extension container: at most one value per type.
#[derive(Default)]
pub struct Extensions {
    map: HashMap<TypeId, Box<dyn Any>>,
}

impl fmt::Debug for Extensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Extensions")
            .field("len", &self.map.len())
            .finish()
    }
}

impl Extensions {
    pub fn get<T: Any>(&self) -> Option<&T> {
        self.map
            .get(&TypeId::of::<T>())
            .and_then(|b| b.downcast_ref::<T>())
    }

    pub fn get_mut<T: Any>(&mut self) -> Option<&mut T> {
        self.map
            .get_mut(&TypeId::of::<T>())
            .and_then(|b| b.downcast_mut::<T>())
    }

    pub fn contains<T: Any>(&self) -> bool {
        self.map.contains_key(&TypeId::of::<T>())
    }

    /// Adds a value for a capability that must not be present yet.
    pub fn add<T: Any>(&mut self, value: T) -> MapResult<()> {
        if self.contains::<T>() {
            return Err(MapError::ExtensionAlreadyPresent(type_name::<T>()));
        }
        self.map.insert(TypeId::of::<T>(), Box::new(value));
        Ok(())
    }

    /// Stores a value, returning the one it replaced.
    pub fn put<T: Any>(&mut self, value: T) -> Option<T> {
        self.map
            .insert(TypeId::of::<T>(), Box::new(value))
            .and_then(|old| old.downcast::<T>().ok())
            .map(|old| *old)
    }

    pub fn remove<T: Any>(&mut self) -> Option<T> {
        self.map
            .remove(&TypeId::of::<T>())
            .and_then(|old| old.downcast::<T>().ok())
            .map(|old| *old)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// Text, icons, extensions and history shared by all members of a clone set.
#[derive(Debug, Default)]
pub struct SharedContent {
    user_object: UserObject,
    xml_text: Option<String>,
    icons: Vec<MindIcon>,
    extensions: Extensions,
    history: HistoryInformation,
}

impl SharedContent {
    pub fn with_text(text: impl Into<String>) -> Self {
        let mut content = Self::default();
        content.set_text(text.into());
        content
    }

    pub fn user_object(&self) -> &UserObject {
        &self.user_object
    }

    pub fn text(&self) -> String {
        self.user_object.to_string()
    }

    pub fn xml_text(&self) -> Option<&str> {
        self.xml_text.as_deref()
    }

    /// Display text with markup removed.
    pub fn plain_text(&self) -> String {
        markup_to_plain(&self.text())
    }

    pub fn icons(&self) -> &[MindIcon] {
        &self.icons
    }

    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    pub fn history(&self) -> &HistoryInformation {
        &self.history
    }

    pub(crate) fn set_text(&mut self, text: String) {
        self.xml_text = is_markup(&text).then(|| text.clone());
        self.user_object = UserObject::Text(text);
        self.history.touch();
    }

    pub(crate) fn set_xml_text(&mut self, markup: String) {
        self.user_object = UserObject::Markup(markup.clone());
        self.xml_text = Some(markup);
        self.history.touch();
    }

    pub(crate) fn set_user_object(&mut self, object: UserObject) {
        self.xml_text = match &object {
            UserObject::Markup(m) => Some(m.clone()),
            UserObject::Text(t) => is_markup(t).then(|| t.clone()),
        };
        self.user_object = object;
        self.history.touch();
    }

    pub(crate) fn set_history(&mut self, history: HistoryInformation) {
        self.history = history;
    }

    pub(crate) fn icons_mut(&mut self) -> &mut Vec<MindIcon> {
        &mut self.icons
    }

    pub(crate) fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.extensions
    }
}

pub fn is_markup(text: &str) -> bool {
    text.trim_start()
        .get(..5)
        .is_some_and(|head| head.eq_ignore_ascii_case("<html"))
}

/// Strips tags, decodes the common entities and collapses whitespace.
pub fn markup_to_plain(text: &str) -> String {
    if !is_markup(text) {
        return text.to_string();
    }
    let stripped = MARKUP_TAG.replace_all(text, " ");
    let decoded = stripped
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&");
    WHITESPACE.replace_all(decoded.trim(), " ").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Note(&'static str);

    #[test]
    fn given_markup_when_converting_to_plain_then_tags_are_removed() {
        let plain = markup_to_plain("<html><body><p>Tom &amp; Jerry</p>\n<p>x</p></body></html>");
        assert_eq!(plain, "Tom & Jerry x");
    }

    #[test]
    fn given_plain_text_when_converting_then_unchanged() {
        assert_eq!(markup_to_plain("a <b> c"), "a <b> c");
    }

    #[test]
    fn given_text_when_setting_markup_then_xml_text_is_kept() {
        let mut content = SharedContent::with_text("plain");
        assert_eq!(content.xml_text(), None);

        content.set_xml_text("<html><b>bold</b></html>".into());
        assert_eq!(content.xml_text(), Some("<html><b>bold</b></html>"));
        assert_eq!(content.plain_text(), "bold");
    }

    #[test]
    fn given_extension_when_adding_twice_then_errors() {
        let mut ext = Extensions::default();
        ext.add(Note("a")).unwrap();
        assert!(matches!(
            ext.add(Note("b")),
            Err(MapError::ExtensionAlreadyPresent(_))
        ));
        assert_eq!(ext.put(Note("c")), Some(Note("a")));
        assert_eq!(ext.get::<Note>(), Some(&Note("c")));
        assert_eq!(ext.remove::<Note>(), Some(Note("c")));
        assert!(ext.is_empty());
    }
}
