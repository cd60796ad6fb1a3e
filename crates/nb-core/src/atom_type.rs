use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Whether a type tags atoms (nodes) or links (hyperedges).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeKind {
    Node,
    Link,
}

impl TypeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TypeKind::Node => "node",
            TypeKind::Link => "link",
        }
    }
}

macro_rules! builtin_types {
    ($( $variant:ident => $kind:ident ),+ $(,)?) => {
        /// Atom and link type tag. Built-ins are enumerated; anything else is an
        /// index into the owning registry's extension table.
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub enum AtomType {
            $( $variant, )+
            Extension(u32),
        }

        const BUILTINS: &[AtomType] = &[ $( AtomType::$variant, )+ ];

        impl AtomType {
            /// Canonical name of a built-in type; `None` for extensions.
            pub fn builtin_name(&self) -> Option<&'static str> {
                match self {
                    $( AtomType::$variant => Some(stringify!($variant)), )+
                    AtomType::Extension(_) => None,
                }
            }

            fn builtin_kind(&self) -> Option<TypeKind> {
                match self {
                    $( AtomType::$variant => Some(TypeKind::$kind), )+
                    AtomType::Extension(_) => None,
                }
            }
        }
    };
}

builtin_types! {
    ConceptNode => Node,
    PredicateNode => Node,
    NumberNode => Node,
    VariableNode => Node,
    SchemaNode => Node,
    GroundedSchemaNode => Node,
    TypeNode => Node,
    AnchorNode => Node,
    ListLink => Link,
    SetLink => Link,
    AndLink => Link,
    OrLink => Link,
    NotLink => Link,
    InheritanceLink => Link,
    SimilarityLink => Link,
    ImplicationLink => Link,
    EvaluationLink => Link,
    ExecutionLink => Link,
    BindLink => Link,
    MemberLink => Link,
    ContextLink => Link,
    DefineLink => Link,
    LambdaLink => Link,
    PutLink => Link,
    GetLink => Link,
    EquivalenceLink => Link,
    SatisfactionLink => Link,
    StateLink => Link,
    AtTimeLink => Link,
}

impl AtomType {
    pub fn is_builtin(&self) -> bool {
        !matches!(self, AtomType::Extension(_))
    }
}

impl fmt::Display for AtomType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AtomType::Extension(idx) => write!(f, "Extension#{idx}"),
            builtin => f.write_str(builtin.builtin_name().unwrap_or("Unknown")),
        }
    }
}

#[derive(Clone, Debug)]
struct ExtensionType {
    name: String,
    kind: TypeKind,
}

/// Name <-> tag table. Built-ins resolve without allocation; unknown names
/// are appended to the extension table once and keep their tag forever.
#[derive(Clone, Debug)]
pub struct TypeRegistry {
    by_name: HashMap<String, AtomType>,
    extensions: Vec<ExtensionType>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        let by_name = BUILTINS
            .iter()
            .filter_map(|t| t.builtin_name().map(|n| (n.to_string(), *t)))
            .collect();
        Self {
            by_name,
            extensions: Vec::new(),
        }
    }

    /// Look a name up without registering it.
    pub fn resolve(&self, name: &str) -> Option<AtomType> {
        self.by_name.get(name).copied()
    }

    /// Kind `name` has, or would get if interned now: an unseen name ending
    /// in `Link` is a link type, anything else a node type.
    pub fn kind_of_name(&self, name: &str) -> TypeKind {
        match self.resolve(name) {
            Some(t) => self.kind(&t),
            None if name.ends_with("Link") => TypeKind::Link,
            None => TypeKind::Node,
        }
    }

    /// Resolve `name`, registering it as an extension if unseen. The kind of a
    /// new extension is inferred from a `Link` suffix.
    pub fn intern(&mut self, name: &str) -> AtomType {
        if let Some(t) = self.resolve(name) {
            return t;
        }
        let kind = self.kind_of_name(name);
        self.register(name, kind)
    }

    /// Register an extension with an explicit kind. Re-registering an existing
    /// name returns the existing tag unchanged.
    pub fn register(&mut self, name: &str, kind: TypeKind) -> AtomType {
        if let Some(t) = self.resolve(name) {
            return t;
        }
        let tag = AtomType::Extension(self.extensions.len() as u32);
        self.extensions.push(ExtensionType {
            name: name.to_string(),
            kind,
        });
        self.by_name.insert(name.to_string(), tag);
        tag
    }

    pub fn name<'a>(&'a self, t: &AtomType) -> &'a str {
        match t {
            AtomType::Extension(idx) => self
                .extensions
                .get(*idx as usize)
                .map(|e| e.name.as_str())
                .unwrap_or("Unknown"),
            builtin => builtin.builtin_name().unwrap_or("Unknown"),
        }
    }

    /// Kind of a tag. Extension tags foreign to this registry count as nodes.
    pub fn kind(&self, t: &AtomType) -> TypeKind {
        match t {
            AtomType::Extension(idx) => self
                .extensions
                .get(*idx as usize)
                .map(|e| e.kind)
                .unwrap_or(TypeKind::Node),
            builtin => builtin.builtin_kind().unwrap_or(TypeKind::Node),
        }
    }

    pub fn extension_count(&self) -> usize {
        self.extensions.len()
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtins_resolve() {
        let reg = TypeRegistry::new();
        assert_eq!(reg.resolve("ConceptNode"), Some(AtomType::ConceptNode));
        assert_eq!(reg.resolve("InheritanceLink"), Some(AtomType::InheritanceLink));
        assert_eq!(reg.kind(&AtomType::ConceptNode), TypeKind::Node);
        assert_eq!(reg.kind(&AtomType::AtTimeLink), TypeKind::Link);
        assert_eq!(reg.resolve("NoSuchNode"), None);
    }

    #[test]
    fn test_intern_registers_once() {
        let mut reg = TypeRegistry::new();
        let a = reg.intern("EmotionNode");
        let b = reg.intern("EmotionNode");
        assert_eq!(a, b);
        assert_eq!(a, AtomType::Extension(0));
        assert_eq!(reg.name(&a), "EmotionNode");
        assert_eq!(reg.kind(&a), TypeKind::Node);
        assert_eq!(reg.extension_count(), 1);

        let link = reg.intern("ResonanceLink");
        assert_eq!(reg.kind(&link), TypeKind::Link);
    }

    #[test]
    fn test_register_explicit_kind() {
        let mut reg = TypeRegistry::new();
        let t = reg.register("Hyperedge", TypeKind::Link);
        assert_eq!(reg.kind(&t), TypeKind::Link);
        assert_eq!(reg.register("ConceptNode", TypeKind::Link), AtomType::ConceptNode);
    }

    #[test]
    fn test_kind_of_name_does_not_register() {
        let mut reg = TypeRegistry::new();
        assert_eq!(reg.kind_of_name("InheritanceLink"), TypeKind::Link);
        assert_eq!(reg.kind_of_name("MoodLink"), TypeKind::Link);
        assert_eq!(reg.kind_of_name("MoodNode"), TypeKind::Node);
        assert_eq!(reg.extension_count(), 0);
        reg.register("Hyperedge", TypeKind::Link);
        assert_eq!(reg.kind_of_name("Hyperedge"), TypeKind::Link);
    }

    #[test]
    fn test_display() {
        assert_eq!(AtomType::PredicateNode.to_string(), "PredicateNode");
        assert_eq!(AtomType::Extension(3).to_string(), "Extension#3");
    }
}
