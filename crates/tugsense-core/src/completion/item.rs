//! Completion items and their category priorities.

use serde::{Deserialize, Serialize};

use crate::value::MemberCategory;

// ============================================================================
// Orders
// ============================================================================

/// Category priority of an item. Higher sorts first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionOrder {
    EnumValue,
    Snippet,
    Property,
    Symbol,
    Keyword,
    Type,
}

impl CompletionOrder {
    /// Numeric priority.
    pub fn value(self) -> i32 {
        match self {
            CompletionOrder::EnumValue => -5,
            CompletionOrder::Snippet => -10,
            CompletionOrder::Property => -15,
            CompletionOrder::Symbol => -20,
            CompletionOrder::Keyword => -25,
            CompletionOrder::Type => -30,
        }
    }
}

impl From<CompletionOrder> for i32 {
    fn from(order: CompletionOrder) -> i32 {
        order.value()
    }
}

// ============================================================================
// Icons
// ============================================================================

/// Icon tag for the host's theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IconKind {
    #[default]
    Symbol,
    Class,
    Enum,
    Enumerator,
    Function,
    Signal,
    Slot,
    Variable,
    Property,
    Namespace,
    Keyword,
    Macro,
    Include,
    Snippet,
}

impl IconKind {
    /// Icon for a member of the given category.
    pub fn for_category(category: MemberCategory) -> IconKind {
        match category {
            MemberCategory::Property => IconKind::Property,
            MemberCategory::Variable => IconKind::Variable,
            MemberCategory::Function | MemberCategory::GeneratedSlot => IconKind::Function,
            MemberCategory::Signal => IconKind::Signal,
            MemberCategory::Slot => IconKind::Slot,
            MemberCategory::Enumerator => IconKind::Enumerator,
            MemberCategory::Type => IconKind::Class,
            MemberCategory::Namespace => IconKind::Namespace,
        }
    }
}

// ============================================================================
// Items
// ============================================================================

/// What committing an item inserts beyond its display text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Payload {
    /// Snippet body with U+FFFC-delimited placeholders.
    Snippet { body: String },
    /// A callable; `()` is appended on commit.
    Call { has_params: bool },
}

/// Payload discriminant used for deduplication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PayloadKind {
    None,
    Snippet,
    Call,
}

/// One ranked, displayable, insertable suggestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionItem {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Payload>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    pub order: i32,
    #[serde(default)]
    pub icon: IconKind,
}

impl CompletionItem {
    /// A plain item.
    pub fn new(text: impl Into<String>, order: impl Into<i32>, icon: IconKind) -> Self {
        CompletionItem {
            text: text.into(),
            payload: None,
            details: None,
            order: order.into(),
            icon,
        }
    }

    /// Attach a payload.
    pub fn with_payload(mut self, payload: Payload) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Attach details (signature, snippet preview).
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Payload discriminant.
    pub fn payload_kind(&self) -> PayloadKind {
        match self.payload {
            None => PayloadKind::None,
            Some(Payload::Snippet { .. }) => PayloadKind::Snippet,
            Some(Payload::Call { .. }) => PayloadKind::Call,
        }
    }

    /// Whether committing inserts a snippet.
    pub fn is_snippet(&self) -> bool {
        self.payload_kind() == PayloadKind::Snippet
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orders_descend_from_enum_values_to_types() {
        let orders = [
            CompletionOrder::EnumValue,
            CompletionOrder::Snippet,
            CompletionOrder::Property,
            CompletionOrder::Symbol,
            CompletionOrder::Keyword,
            CompletionOrder::Type,
        ];
        assert!(orders.windows(2).all(|w| w[0].value() > w[1].value()));
    }

    #[test]
    fn item_serializes_without_empty_fields() {
        let item = CompletionItem::new("width", CompletionOrder::Property, IconKind::Property);
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"text": "width", "order": -15, "icon": "property"})
        );

        let call = CompletionItem::new("f", CompletionOrder::Symbol, IconKind::Function)
            .with_payload(Payload::Call { has_params: true });
        let json = serde_json::to_value(&call).unwrap();
        assert_eq!(json["payload"]["kind"], "call");
    }
}
