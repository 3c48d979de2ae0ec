//! Semantic values: the resolved entities names refer to.
//!
//! A [`Value`] is a closed tagged variant. Object values carry a class name,
//! an ordered list of prototypes (JavaScript prototype or C++ base classes)
//! and an ordered membership table. Values live in an arena owned by their
//! [`Document`](crate::document::Document) and refer to each other by
//! [`ValueId`]; prototypes declared in other documents are referenced by
//! name and resolved through the scope chain at lookup time.

use serde::{Deserialize, Serialize};

// ============================================================================
// ID Types
// ============================================================================

/// Index of a value inside its document's value arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct ValueId(pub u32);

impl ValueId {
    /// Create a new value ID.
    pub fn new(id: u32) -> Self {
        ValueId(id)
    }

    /// Arena index.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for ValueId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "val_{}", self.0)
    }
}

// ============================================================================
// Type References
// ============================================================================

/// A type named in source, resolved lazily against a scope chain.
///
/// Segments are separated by `::` (C++) or `.` (QML/JS). A leading `::`
/// anchors the lookup at the global scope.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeRef(pub String);

impl TypeRef {
    /// Create a new type reference.
    pub fn new(name: impl Into<String>) -> Self {
        TypeRef(name.into())
    }

    /// The raw spelling.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the reference is anchored at the global scope (`::Foo`).
    pub fn is_global(&self) -> bool {
        self.0.starts_with("::")
    }

    /// Name segments, with template arguments and pointer/reference
    /// decorations stripped (`const ns::List<int> *` yields `["ns", "List"]`).
    pub fn segments(&self) -> Vec<&str> {
        let mut text = self.0.trim();
        for qualifier in ["const ", "volatile ", "struct ", "class "] {
            if let Some(rest) = text.strip_prefix(qualifier) {
                text = rest.trim_start();
            }
        }
        loop {
            let trimmed = text.trim_end_matches(|c: char| c == '*' || c == '&' || c.is_whitespace());
            let trimmed = match trimmed.strip_suffix("const") {
                Some(rest) if rest.ends_with(|c: char| !(c.is_alphanumeric() || c == '_')) => rest,
                _ => trimmed,
            };
            if trimmed.len() == text.len() {
                break;
            }
            text = trimmed;
        }
        let text = match text.find('<') {
            Some(lt) => &text[..lt],
            None => text,
        };
        text.split("::")
            .flat_map(|part| part.split('.'))
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect()
    }
}

impl std::fmt::Display for TypeRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Value Variants
// ============================================================================

/// A resolved semantic entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Value {
    /// Class, namespace, QML object type, JS object or scope object.
    Object(ObjectValue),
    /// Function or method signature.
    Function(FunctionValue),
    /// Enumeration type or one of its constants.
    Enumerator(EnumeratorValue),
    /// Built-in scalar type.
    Primitive { primitive: PrimitiveKind },
    /// Nothing is known about the value.
    Unknown,
}

impl Value {
    /// The object payload, if this is an object.
    pub fn as_object(&self) -> Option<&ObjectValue> {
        match self {
            Value::Object(object) => Some(object),
            _ => None,
        }
    }

    /// The function payload, if this is a function.
    pub fn as_function(&self) -> Option<&FunctionValue> {
        match self {
            Value::Function(function) => Some(function),
            _ => None,
        }
    }

    /// The enumerator payload, if this is an enumerator.
    pub fn as_enumerator(&self) -> Option<&EnumeratorValue> {
        match self {
            Value::Enumerator(enumerator) => Some(enumerator),
            _ => None,
        }
    }

    /// Short tag used in output.
    pub fn kind_str(&self) -> &'static str {
        match self {
            Value::Object(_) => "object",
            Value::Function(_) => "function",
            Value::Enumerator(_) => "enumerator",
            Value::Primitive { .. } => "primitive",
            Value::Unknown => "unknown",
        }
    }
}

/// Built-in scalar types of both languages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrimitiveKind {
    Boolean,
    Number,
    String,
    Char,
    Null,
    Undefined,
    Void,
}

impl PrimitiveKind {
    /// Map a builtin type spelling (`int`, `bool`, `string`, ...) to a primitive.
    pub fn from_type_name(name: &str) -> Option<Self> {
        let kind = match name {
            "bool" | "boolean" => PrimitiveKind::Boolean,
            "int" | "unsigned" | "signed" | "long" | "short" | "float" | "double" | "real"
            | "number" | "size_t" | "qreal" => PrimitiveKind::Number,
            "string" | "url" => PrimitiveKind::String,
            "char" | "wchar_t" => PrimitiveKind::Char,
            "null" | "nullptr_t" => PrimitiveKind::Null,
            "undefined" | "var" | "variant" => PrimitiveKind::Undefined,
            "void" => PrimitiveKind::Void,
            _ => return None,
        };
        Some(kind)
    }

    /// Name of the global constructor a script engine boxes this primitive
    /// into when a member is accessed on it.
    pub fn boxing_class(self) -> Option<&'static str> {
        match self {
            PrimitiveKind::Boolean => Some("Boolean"),
            PrimitiveKind::Number => Some("Number"),
            PrimitiveKind::String | PrimitiveKind::Char => Some("String"),
            PrimitiveKind::Null | PrimitiveKind::Undefined | PrimitiveKind::Void => None,
        }
    }
}

// ============================================================================
// Objects
// ============================================================================

/// Reference from an object to one of its prototypes / base classes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Prototype {
    /// A value in the same document.
    Value(ValueId),
    /// A type resolved by name through the scope chain.
    Named(TypeRef),
}

/// An object value: class, namespace, QML type or scope object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectValue {
    /// Class name (`QQuickItem`, `Derived`, `Math`, or empty for anonymous objects).
    pub class_name: String,
    /// Prototypes / base classes, searched depth-first in order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub prototypes: Vec<Prototype>,
    /// Membership table in declaration order. Overloads repeat a name.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub members: Vec<Member>,
    /// QML type used only as a grouped property (`anchors`, `font`); such
    /// properties complete as `name.` instead of `name: `.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub grouped: bool,
}

impl ObjectValue {
    /// Create an empty object with the given class name.
    pub fn new(class_name: impl Into<String>) -> Self {
        ObjectValue {
            class_name: class_name.into(),
            ..Default::default()
        }
    }

    /// Own members (no prototype walk) with the given name, in declaration order.
    pub fn own_members<'a, 'n>(&'a self, name: &'n str) -> impl Iterator<Item = &'a Member> + 'n
    where
        'a: 'n,
    {
        self.members.iter().filter(move |m| m.name == name)
    }
}

/// How a member was declared; drives enumeration policy and icons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum MemberCategory {
    /// Declared property or data member.
    Property,
    /// Script variable or local declaration (`var x`, `int x`).
    Variable,
    /// Method or free function.
    Function,
    /// Signal declaration (no value of its own).
    Signal,
    /// Slot or invokable method.
    Slot,
    /// Accessor a framework synthesizes for a declared property
    /// (`onWidthChanged`, key handlers).
    GeneratedSlot,
    /// Enumeration constant.
    Enumerator,
    /// Nested type (class, struct, enum, QML component).
    Type,
    /// Namespace.
    Namespace,
}

impl MemberCategory {
    /// Returns the string representation used in output.
    pub fn as_str(&self) -> &'static str {
        match self {
            MemberCategory::Property => "property",
            MemberCategory::Variable => "variable",
            MemberCategory::Function => "function",
            MemberCategory::Signal => "signal",
            MemberCategory::Slot => "slot",
            MemberCategory::GeneratedSlot => "generated_slot",
            MemberCategory::Enumerator => "enumerator",
            MemberCategory::Type => "type",
            MemberCategory::Namespace => "namespace",
        }
    }

    /// Whether the member names something callable.
    pub fn is_callable(&self) -> bool {
        matches!(
            self,
            MemberCategory::Function
                | MemberCategory::Signal
                | MemberCategory::Slot
                | MemberCategory::GeneratedSlot
        )
    }
}

impl std::fmt::Display for MemberCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Access control of a member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    #[default]
    Public,
    Protected,
    Private,
}

/// One entry of an object's membership table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    /// Member name.
    pub name: String,
    /// Declaration category.
    pub category: MemberCategory,
    /// Access control.
    #[serde(default)]
    pub visibility: Visibility,
    /// Value the member is bound to (functions, nested types, enum values,
    /// grouped objects).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<ValueId>,
    /// Declared type of a variable or property, resolved lazily.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_ref: Option<TypeRef>,
}

impl Member {
    /// Create a member bound to a value.
    pub fn with_value(name: impl Into<String>, category: MemberCategory, value: ValueId) -> Self {
        Member {
            name: name.into(),
            category,
            visibility: Visibility::Public,
            value: Some(value),
            type_ref: None,
        }
    }

    /// Create a member with a declared type.
    pub fn typed(name: impl Into<String>, category: MemberCategory, type_ref: TypeRef) -> Self {
        Member {
            name: name.into(),
            category,
            visibility: Visibility::Public,
            value: None,
            type_ref: Some(type_ref),
        }
    }

    /// Set the visibility.
    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }
}

// ============================================================================
// Functions and Enumerators
// ============================================================================

/// One formal parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Param {
    /// Parameter name; empty when the declaration omits it.
    #[serde(default)]
    pub name: String,
    /// Declared type, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_ref: Option<TypeRef>,
    /// Whether the parameter has a default argument.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub has_default: bool,
}

impl Param {
    /// Create an untyped parameter.
    pub fn named(name: impl Into<String>) -> Self {
        Param {
            name: name.into(),
            type_ref: None,
            has_default: false,
        }
    }

    /// Create a typed parameter.
    pub fn typed(name: impl Into<String>, type_ref: TypeRef) -> Self {
        Param {
            name: name.into(),
            type_ref: Some(type_ref),
            has_default: false,
        }
    }
}

/// A function signature.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionValue {
    /// Function name.
    pub name: String,
    /// Formal parameters.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<Param>,
    /// Declared return type; `None` means unknown / not declared.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub returns: Option<TypeRef>,
    /// Constructors evaluate to their class when called.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub constructor: bool,
}

impl FunctionValue {
    /// Create a function with no parameters and unknown return type.
    pub fn new(name: impl Into<String>) -> Self {
        FunctionValue {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Number of declared parameters.
    pub fn argument_count(&self) -> usize {
        self.params.len()
    }

    /// Name of parameter `index`, or `argN` (1-based) when unnamed.
    pub fn argument_name(&self, index: usize) -> String {
        match self.params.get(index) {
            Some(param) if !param.name.is_empty() => param.name.clone(),
            _ => format!("arg{}", index + 1),
        }
    }

    /// Human-readable signature, e.g. `int count(const QString &key)`.
    pub fn signature(&self) -> String {
        let params: Vec<String> = self
            .params
            .iter()
            .map(|p| match (&p.type_ref, p.name.is_empty()) {
                (Some(ty), true) => ty.to_string(),
                (Some(ty), false) => format!("{ty} {}", p.name),
                (None, _) => p.name.clone(),
            })
            .collect();
        match &self.returns {
            Some(ret) => format!("{ret} {}({})", self.name, params.join(", ")),
            None => format!("{}({})", self.name, params.join(", ")),
        }
    }
}

/// An enumeration, or one constant of it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumeratorValue {
    /// Enumeration name.
    pub enum_name: String,
    /// All keys of the enumeration in declaration order.
    #[serde(default)]
    pub keys: Vec<String>,
}

// ============================================================================
// Tests
// ============================================================================
