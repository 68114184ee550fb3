use crate::codec::{Codable, Codec};
use crate::error::{ErrorKind, Result};
use crate::object::{Obj, TypeInfo};
use std::fmt;
use std::rc::Rc;

/// Builds a codec for a type chosen by a [`TypeMatcher`].
pub type CodecFactory = Rc<dyn Fn(&TypeInfo) -> Rc<dyn Codec>>;

/// Factory returning `T`'s own codec.
pub fn codable_factory<T: Codable>() -> CodecFactory {
    Rc::new(|_| T::codec())
}

/// Selects the types a default codec applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeMatcher {
    /// Exactly one type.
    Exact(TypeInfo),
    /// Every type whose fully qualified name starts with the prefix,
    /// e.g. `"my_app::events::"` or `"alloc::vec::Vec<"`.
    Family(String),
}

impl TypeMatcher {
    /// Returns true if the matcher applies to `info`.
    pub fn matches(&self, info: &TypeInfo) -> bool {
        match self {
            Self::Exact(exact) => exact == info,
            Self::Family(prefix) => info.name().starts_with(prefix.as_str()),
        }
    }

    /// Higher is more specific. Exact beats any family; longer prefixes beat shorter ones.
    fn specificity(&self) -> (u8, usize) {
        match self {
            Self::Exact(_) => (1, 0),
            Self::Family(prefix) => (0, prefix.len()),
        }
    }
}

struct Entry {
    matcher: TypeMatcher,
    factory: CodecFactory,
    user: bool,
}

impl Entry {
    fn rank(&self) -> (u8, usize, bool) {
        let (kind, len) = self.matcher.specificity();
        (kind, len, self.user)
    }
}

/// Ordered table choosing a codec for types registered without one.
///
/// Entries are kept most-specific first: exact types, then families by prefix
/// length, user entries ahead of built-ins of equal specificity, and insertion
/// order among the rest. The first matching entry wins.
pub struct DefaultCodecs {
    entries: Vec<Entry>,
    fallback: Option<CodecFactory>,
}

impl fmt::Debug for DefaultCodecs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DefaultCodecs")
            .field(
                "entries",
                &self.entries.iter().map(|e| &e.matcher).collect::<Vec<_>>(),
            )
            .field("fallback", &self.fallback.is_some())
            .finish()
    }
}

impl Default for DefaultCodecs {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl DefaultCodecs {
    /// A table with no entries.
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
            fallback: None,
        }
    }

    /// A table holding the built-in codecs for primitives, `String`, `()` and `Vec<Obj>`.
    pub fn with_builtins() -> Self {
        let mut defaults = Self::empty();
        defaults.add_codable::<bool>();
        defaults.add_codable::<char>();
        defaults.add_codable::<i8>();
        defaults.add_codable::<i16>();
        defaults.add_codable::<i32>();
        defaults.add_codable::<i64>();
        defaults.add_codable::<isize>();
        defaults.add_codable::<u8>();
        defaults.add_codable::<u16>();
        defaults.add_codable::<u32>();
        defaults.add_codable::<u64>();
        defaults.add_codable::<usize>();
        defaults.add_codable::<f32>();
        defaults.add_codable::<f64>();
        defaults.add_codable::<String>();
        defaults.add_codable::<()>();
        defaults.add_codable::<Vec<Obj>>();
        defaults
    }

    fn insert(&mut self, entry: Entry) {
        let rank = entry.rank();
        let index = self
            .entries
            .iter()
            .position(|existing| existing.rank() < rank)
            .unwrap_or(self.entries.len());
        self.entries.insert(index, entry);
    }

    /// Adds a user entry.
    pub fn add(&mut self, matcher: TypeMatcher, factory: CodecFactory) {
        self.insert(Entry {
            matcher,
            factory,
            user: true,
        });
    }

    /// Adds `T`'s own codec as a built-in exact entry.
    ///
    /// User entries for `T` still take precedence.
    pub fn add_codable<T: Codable>(&mut self) {
        self.insert(Entry {
            matcher: TypeMatcher::Exact(TypeInfo::of::<T>()),
            factory: codable_factory::<T>(),
            user: false,
        });
    }

    /// Sets the factory used when no entry matches.
    pub fn set_fallback(&mut self, fallback: Option<CodecFactory>) {
        self.fallback = fallback;
    }

    /// The most specific matching entry's codec, or the fallback's.
    pub fn find(&self, info: &TypeInfo) -> Option<Rc<dyn Codec>> {
        self.entries
            .iter()
            .find(|entry| entry.matcher.matches(info))
            .map(|entry| &entry.factory)
            .or(self.fallback.as_ref())
            .map(|factory| factory(info))
    }

    /// Like [`Self::find`], failing when nothing applies.
    pub fn codec_for(&self, info: &TypeInfo) -> Result<Rc<dyn Codec>> {
        self.find(info)
            .ok_or_else(|| ErrorKind::NoCodec(info.name().to_string()).into())
    }

    /// Types with an exact entry.
    pub fn exact_types(&self) -> impl Iterator<Item = TypeInfo> + '_ {
        self.entries.iter().filter_map(|entry| match &entry.matcher {
            TypeMatcher::Exact(info) => Some(*info),
            TypeMatcher::Family(_) => None,
        })
    }

    /// Matchers in lookup order.
    pub fn matchers(&self) -> impl Iterator<Item = &TypeMatcher> + '_ {
        self.entries.iter().map(|entry| &entry.matcher)
    }

    /// Number of entries, not counting the fallback.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if there are no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
