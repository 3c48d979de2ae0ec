//! Function-hint state: the argument tooltip shown after `(`.
//!
//! The hint is plain state owned by the session. The host renders it and
//! reports cursor movement ([`FunctionHint::update`]) and focus loss
//! ([`FunctionHint::dismiss`]); there is no ambient event hook.

use serde::Serialize;

/// Argument hint for one call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FunctionHint {
    pub function_name: String,
    /// Parameters of the shown overload (`argN` for unnamed parameters).
    pub signature: Vec<String>,
    /// Every overload's parameters; the host pages through them.
    #[serde(skip_serializing_if = "has_single_overload")]
    pub overloads: Vec<Vec<String>>,
    pub current_overload: usize,
    /// Offset just after the opening parenthesis.
    pub start_position: usize,
    /// Zero-based index of the argument under the cursor.
    pub current_argument: usize,
    visible: bool,
}

impl FunctionHint {
    /// A hint, visible when the signature has at least `min_parameters`
    /// entries.
    pub fn new(
        function_name: impl Into<String>,
        signature: Vec<String>,
        start_position: usize,
        min_parameters: usize,
    ) -> Self {
        FunctionHint::overloaded(function_name, vec![signature], start_position, min_parameters)
    }

    /// A hint over several overloads, opened on the first one with at least
    /// `min_parameters` entries. Invisible when no overload qualifies.
    pub fn overloaded(
        function_name: impl Into<String>,
        overloads: Vec<Vec<String>>,
        start_position: usize,
        min_parameters: usize,
    ) -> Self {
        let min = min_parameters.max(1);
        let shown = overloads.iter().position(|sig| sig.len() >= min);
        let current_overload = shown.unwrap_or(0);
        FunctionHint {
            function_name: function_name.into(),
            signature: overloads.get(current_overload).cloned().unwrap_or_default(),
            overloads,
            current_overload,
            start_position,
            current_argument: 0,
            visible: shown.is_some(),
        }
    }

    /// Show the next overload, wrapping around.
    pub fn next_overload(&mut self) {
        if self.overloads.len() < 2 {
            return;
        }
        self.current_overload = (self.current_overload + 1) % self.overloads.len();
        self.signature = self.overloads[self.current_overload].clone();
    }

    /// Whether the host should show the hint.
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Hide the hint (focus left the editor, escape pressed).
    pub fn dismiss(&mut self) {
        self.visible = false;
    }

    /// Track the cursor. `text` is the buffer and `cursor` the new cursor
    /// offset. The hint closes when the cursor moves before the call or
    /// the call's parenthesis closes.
    pub fn update(&mut self, text: &str, cursor: usize) {
        if !self.visible {
            return;
        }
        let Some(typed) = text.get(self.start_position..cursor) else {
            self.dismiss();
            return;
        };
        let mut depth: i32 = 0;
        let mut argument = 0;
        for ch in typed.chars() {
            match ch {
                '(' | '[' | '{' => depth += 1,
                ')' | ']' | '}' => depth -= 1,
                ',' if depth == 0 => argument += 1,
                _ => {}
            }
            if depth < 0 {
                self.dismiss();
                return;
            }
        }
        self.current_argument = argument;
    }

    /// `name(a, b)` with the current argument bracketed.
    pub fn label(&self) -> String {
        let arguments: Vec<String> = self
            .signature
            .iter()
            .enumerate()
            .map(|(i, arg)| {
                if i == self.current_argument {
                    format!("[{arg}]")
                } else {
                    arg.clone()
                }
            })
            .collect();
        format!("{}({})", self.function_name, arguments.join(", "))
    }
}

fn has_single_overload(overloads: &[Vec<String>]) -> bool {
    overloads.len() <= 1
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hint() -> FunctionHint {
        FunctionHint::new(
            "setValue",
            vec!["key".to_string(), "arg2".to_string()],
            9,
            1,
        )
    }

    #[test]
    fn zero_parameter_functions_are_not_shown() {
        assert!(!FunctionHint::new("reset", Vec::new(), 6, 1).is_visible());
        assert!(!FunctionHint::new("reset", Vec::new(), 6, 0).is_visible());
        assert!(hint().is_visible());
    }

    #[test]
    fn overloads_open_on_first_with_parameters() {
        let mut hint = FunctionHint::overloaded(
            "resize",
            vec![Vec::new(), vec!["w".to_string(), "h".to_string()], vec!["size".to_string()]],
            7,
            1,
        );
        assert!(hint.is_visible());
        assert_eq!(hint.current_overload, 1);
        assert_eq!(hint.label(), "resize([w], h)");
        hint.next_overload();
        assert_eq!(hint.signature, vec!["size".to_string()]);
        hint.next_overload();
        assert!(hint.signature.is_empty());

        let empty = FunctionHint::overloaded("clear", vec![Vec::new(), Vec::new()], 6, 1);
        assert!(!empty.is_visible());
    }

    #[test]
    fn commas_at_top_level_advance_the_argument() {
        let mut hint = hint();
        let text = "setValue(f(a, b), ";
        hint.update(text, text.len());
        assert_eq!(hint.current_argument, 1);
        assert!(hint.is_visible());
        assert_eq!(hint.label(), "setValue(key, [arg2])");
    }

    #[test]
    fn closing_paren_or_moving_back_dismisses() {
        let mut closed = hint();
        let text = "setValue(1)";
        closed.update(text, text.len());
        assert!(!closed.is_visible());

        let mut moved = hint();
        moved.update("setValue(", 3);
        assert!(!moved.is_visible());

        let mut dismissed = hint();
        dismissed.dismiss();
        assert!(!dismissed.is_visible());
    }
}
